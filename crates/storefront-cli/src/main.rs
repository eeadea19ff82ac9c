mod db;
mod list;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "storefront-cli")]
#[command(about = "Storefront operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Query a collection the way the list endpoints do
    List {
        /// Collection name (products, categories, subcategories, brands, coupons, reviews)
        collection: String,
        /// Query parameters as key=value, e.g. `price[gte]=10 sort=-price`
        #[arg(value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Upsert the catalog file into the database
    Seed {
        /// Catalog file; defaults to `STOREFRONT_CATALOG_PATH`
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Validate the catalog and print counts without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete all products, brands, and categories
    Purge {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

/// Split `key=value`; the value may itself contain `=`.
fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("storefront-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = storefront_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // A dry-run seed only reads the catalog file.
    if let Commands::Db {
        command:
            DbCommands::Seed {
                catalog,
                dry_run: true,
            },
    } = &command
    {
        let path = catalog.clone().unwrap_or_else(|| config.catalog_path.clone());
        println!("{}", db::preview_seed(&path)?);
        return Ok(());
    }

    let pool_config = storefront_db::PoolConfig::from_app_config(&config);
    let pool = storefront_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_ping(&pool).await?,
            DbCommands::Migrate => db::run_migrate(&pool).await?,
            DbCommands::Seed { catalog, .. } => {
                let path = catalog.unwrap_or_else(|| config.catalog_path.clone());
                db::run_seed(&pool, &path).await?;
            }
            DbCommands::Purge { yes } => db::run_purge(&pool, yes).await?,
        },
        Commands::List { collection, params } => {
            list::run_list(&pool, &collection, &params, config.default_page_limit).await?;
        }
    }

    pool.close().await;
    Ok(())
}
