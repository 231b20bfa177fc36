//! MedicalCor vault CLI - inspect and maintain the durable secure store
//!
//! Operates on the durable medium only; session-scoped records live in the
//! app process and are not reachable from here.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use secure_store::{FileMedium, SecureStore, SettingsManager, StoragePolicy};

/// MedicalCor vault - encrypted local storage maintenance
#[derive(Parser, Debug)]
#[command(name = "medicalcor-vault")]
#[command(author = "MedicalCor")]
#[command(version = "0.1.0")]
#[command(about = "MedicalCor vault - inspect, write and sweep the secure local store")]
struct Args {
    /// Directory holding the durable store file
    #[arg(long, env = "MEDICALCOR_STORE_DIR")]
    data_dir: Option<PathBuf>,

    /// Settings file (default: <data-dir>/settings.json)
    #[arg(long, env = "MEDICALCOR_STORE_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a JSON value under a key
    Put {
        key: String,
        /// Value as JSON (e.g. '{"openai":"sk-..."}')
        value: String,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Print the value under a key as JSON
    Get {
        key: String,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    /// Delete a key
    Rm { key: String },
    /// Remove expired and corrupt entries
    Sweep {
        /// Entries older than this are removed
        #[arg(long)]
        max_age_secs: Option<u64>,
    },
    /// List stored keys
    Keys,
}

#[derive(ClapArgs, Debug)]
struct PolicyArgs {
    /// Store the value unencrypted
    #[arg(long)]
    plain: bool,

    /// Discard the value after this many seconds
    #[arg(long)]
    max_age_secs: Option<u64>,

    /// Share one derived key across every key in this domain
    #[arg(long)]
    key_domain: Option<String>,
}

impl PolicyArgs {
    fn to_policy(&self) -> StoragePolicy {
        let mut policy = StoragePolicy::durable();
        if !self.plain {
            policy = policy.encrypted();
        }
        if let Some(secs) = self.max_age_secs {
            policy = policy.with_max_age(Duration::from_secs(secs));
        }
        if let Some(domain) = &self.key_domain {
            policy = policy.with_key_domain(domain.clone());
        }
        policy
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays clean JSON
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => FileMedium::default_dir()?,
    };

    let settings = match args.settings {
        Some(path) => SettingsManager::from_file(path),
        None => SettingsManager::new(&data_dir),
    }
    .map_err(|e| format!("Failed to load settings: {}", e))?;

    let medium = FileMedium::with_dir(&data_dir)
        .map_err(|e| format!("Failed to open store at {:?}: {}", data_dir, e))?;

    let store = SecureStore::builder()
        .durable(Arc::new(medium))
        .key_provider(settings.get().key_source.to_provider())
        .namespace(settings.get().namespace.clone())
        .build();

    match args.command {
        Command::Put { key, value, policy } => {
            let value: serde_json::Value =
                serde_json::from_str(&value).map_err(|e| format!("Value is not JSON: {}", e))?;
            store.save(&key, &value, &policy.to_policy()).await?;
            info!("Saved {}", key);
        }
        Command::Get { key, policy } => {
            let value: Option<serde_json::Value> = store.load(&key, &policy.to_policy(), None).await;
            match value {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => return Err(format!("No value for {}", key).into()),
            }
        }
        Command::Rm { key } => {
            store.remove(&key).await?;
            info!("Removed {}", key);
        }
        Command::Sweep { max_age_secs } => {
            let mut policy = StoragePolicy::durable();
            if let Some(secs) = max_age_secs {
                policy = policy.with_max_age(Duration::from_secs(secs));
            }
            let report = store.clear_expired(&policy).await?;
            println!(
                "{}",
                serde_json::json!({
                    "scanned": report.scanned,
                    "expired": report.expired,
                    "corrupt": report.corrupt,
                })
            );
        }
        Command::Keys => {
            for key in store.keys(&StoragePolicy::durable()).await? {
                println!("{}", key);
            }
        }
    }

    Ok(())
}
