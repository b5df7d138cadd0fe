//! Developer CLI for hdkit.
//!
//! Operates on a checkpoint file in a data directory: mutating commands
//! load the store, apply the operation, and write a fresh checkpoint;
//! `daemon` runs the retention worker until ctrl-c.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use eyre::WrapErr;
use secrecy::SecretString;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hdkit_core::{get_account, AccountIndex, AccountRegistry, RootId, Sha256AddressDeriver};
use hdkit_store::{
    CheckpointManager, CheckpointTarget, RetentionWorker, StoreError, WalletStore,
    CHECKPOINT_FILE,
};

#[derive(Parser)]
#[command(name = "hdkit", about = "Wallet account registry tooling", version)]
struct Cli {
    /// Data directory holding the checkpoint and archive.
    #[arg(long, env = "HDKIT_DATA_DIR", default_value = ".hdkit")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account under a wallet root and derive its first address.
    Create {
        /// Wallet root identifier (64 hex characters).
        root: String,
        /// Account name.
        name: String,
        /// Spending passphrase.
        #[arg(long, env = "HDKIT_PASSPHRASE", hide_env_values = true)]
        passphrase: String,
    },
    /// Show an account.
    Get {
        /// Wallet root identifier.
        root: String,
        /// Account index.
        index: AccountIndex,
    },
    /// Delete an account and all its addresses.
    Delete {
        /// Wallet root identifier.
        root: String,
        /// Account index.
        index: AccountIndex,
    },
    /// List the account indices under a wallet root.
    List {
        /// Wallet root identifier.
        root: String,
    },
    /// Run the checkpoint/archive/retention worker until ctrl-c.
    Daemon {
        /// Seconds between retention cycles.
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
}

fn load_or_init_store(data_dir: &std::path::Path) -> eyre::Result<Arc<WalletStore>> {
    let checkpoint = data_dir.join(CHECKPOINT_FILE);
    match WalletStore::load(&checkpoint) {
        Ok(store) => Ok(Arc::new(store)),
        Err(StoreError::CheckpointMissing { .. }) => Ok(Arc::new(WalletStore::new())),
        Err(err) => Err(err).wrap_err("loading checkpoint"),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let store = load_or_init_store(&cli.data_dir)?;
    let manager = CheckpointManager::new(Arc::clone(&store), cli.data_dir.clone());

    match cli.command {
        Command::Create {
            root,
            name,
            passphrase,
        } => {
            let registry = AccountRegistry::new(Arc::clone(&store), Sha256AddressDeriver);
            let account = registry
                .create_account(&root, &name, &SecretString::from(passphrase))
                .await?;
            manager.checkpoint()?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::Get { root, index } => {
            let account = get_account(&store.snapshot(), &root, index)?;
            println!("{}", serde_json::to_string_pretty(&account)?);
        }
        Command::Delete { root, index } => {
            let registry = AccountRegistry::new(Arc::clone(&store), Sha256AddressDeriver);
            registry.delete_account(&root, index)?;
            manager.checkpoint()?;
            println!("deleted {root}/{index}");
        }
        Command::List { root } => {
            let decoded = RootId::decode(&root).wrap_err("decoding wallet root")?;
            let indices = store.snapshot().account_indices(&decoded);
            println!("{}", serde_json::to_string_pretty(&indices)?);
        }
        Command::Daemon { interval_secs } => {
            let archive_dir = manager.archive_dir();
            let worker = RetentionWorker::new(
                Arc::new(manager),
                archive_dir,
                Duration::from_secs(interval_secs),
            );
            let (shutdown, rx) = watch::channel(false);
            let handle = worker.spawn(rx);
            info!(interval_secs, "retention worker running; ctrl-c to stop");

            tokio::signal::ctrl_c().await.wrap_err("waiting for ctrl-c")?;
            shutdown.send(true).ok();
            handle.await.wrap_err("joining retention worker")?;
        }
    }

    Ok(())
}
