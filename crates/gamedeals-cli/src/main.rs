//! Operational entry points for running the pipeline by hand: a full
//! catalog crawl (chaining time-boxed passes until the catalog is
//! exhausted) and the expired-discount refresh. Both run against the
//! configured Postgres store.

use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gamedeals_scraper::{Crawler, StopReason};
use gamedeals_store::{GameStore, PgStore};

#[derive(Debug, Parser)]
#[command(name = "gamedeals-cli")]
#[command(about = "Game price tracker command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl the catalog, chaining passes until it is exhausted
    Crawl {
        /// Page number to start from
        #[arg(long, default_value_t = 1)]
        start_page: u32,

        /// Restrict the crawl to one catalog segment
        #[arg(long)]
        segment: Option<String>,
    },
    /// Re-price every game whose discount window has lapsed
    RefreshExpired,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(gamedeals_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = gamedeals_store::PoolConfig::from_app_config(&config);
    let pool = gamedeals_store::connect_pool(&config.database_url, pool_config).await?;
    gamedeals_store::run_migrations(&pool).await?;
    let store = PgStore::new(pool);
    let crawler = Crawler::from_app_config(&config)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Crawl {
            start_page,
            segment,
        } => crawl_to_exhaustion(&store, &crawler, start_page, segment.as_deref()).await,
        Commands::RefreshExpired => {
            let considered = crawler.refresh_expired(&store, Utc::now()).await?;
            tracing::info!(considered, "expired-discount refresh complete");
            Ok(())
        }
    }
}

/// Run time-boxed crawl passes back to back, resuming from each returned
/// cursor, until the catalog reports exhaustion or a pass makes no
/// progress.
async fn crawl_to_exhaustion(
    store: &dyn GameStore,
    crawler: &Crawler,
    start_page: u32,
    segment: Option<&str>,
) -> anyhow::Result<()> {
    let mut page = start_page;
    let mut pass = 0u32;
    loop {
        pass += 1;
        let outcome = crawler.crawl(store, page, segment).await?;
        tracing::info!(
            pass,
            stop = ?outcome.stop,
            pages_crawled = outcome.pages_crawled,
            products_seen = outcome.products_seen,
            games_written = outcome.games_written,
            discount_records_written = outcome.discount_records_written,
            "crawl pass finished"
        );

        match outcome.next_page {
            Some(next) => {
                if outcome.stop == StopReason::FetchFailed && outcome.pages_crawled == 0 {
                    anyhow::bail!("crawl made no progress at page {next}; giving up");
                }
                page = next;
            }
            None => return Ok(()),
        }
    }
}
