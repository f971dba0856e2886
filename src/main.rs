use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use argus_cart::diagnostics::FsDiagnostics;
use argus_cart::models::Account;
use argus_cart::repository::SqliteProductRepository;
use argus_cart::{AddAllOptions, AppConfig, CartManager};

#[derive(Parser)]
#[command(name = "argus-cart", about = "Cart-driven SKU price monitoring")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add every purchasable variant of a product to the account's cart
    AddAll {
        /// JSON file holding the account record and its cookie jar
        #[arg(long)]
        account: PathBuf,
        #[arg(long)]
        product_id: String,
        /// Launch-mode browsers run headless unless told otherwise
        #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
        headless: bool,
    },
    /// Re-scrape the cart and reconcile prices into the store
    SyncCart {
        #[arg(long)]
        account: PathBuf,
    },
}

fn load_account(path: &PathBuf) -> Result<Account> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading account file {}", path.display()))?;
    let account: Account = serde_json::from_str(&raw)
        .with_context(|| format!("parsing account file {}", path.display()))?;
    Ok(account)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("argus_cart=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let repository = SqliteProductRepository::connect(&config.database).await?;
    repository.ensure_schema().await?;

    let manager = CartManager::new(
        config,
        Arc::new(repository),
        Arc::new(FsDiagnostics::new("data/diagnostics")),
    );

    match cli.command {
        Commands::AddAll {
            account,
            product_id,
            headless,
        } => {
            let account = load_account(&account)?;
            let result = manager
                .add_all_skus(&account, &product_id, &AddAllOptions { headless })
                .await?;

            info!(
                total = result.total_skus,
                succeeded = result.success_count,
                failed = result.failed_count,
                "run complete"
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::SyncCart { account } => {
            let account = load_account(&account)?;
            manager.sync_cart(&account).await?;
            info!("cart snapshot reconciled");
        }
    }

    Ok(())
}
