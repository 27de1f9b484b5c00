//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the two
//! recurring jobs: the catalog crawl and the expired-discount refresh.
//! Schedules are 6-field cron expressions from `AppConfig`.

use std::sync::Arc;

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use gamedeals_core::AppConfig;
use gamedeals_scraper::{Crawler, StopReason};
use gamedeals_store::GameStore;

/// Upper bound on chained crawl passes within one scheduled run. Each pass
/// is time-boxed, so this caps a run at roughly `passes * budget` seconds
/// even if the catalog keeps growing under the crawler.
const MAX_CRAWL_PASSES: u32 = 40;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    store: Arc<dyn GameStore>,
    crawler: Arc<Crawler>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_crawl_job(&scheduler, Arc::clone(&store), Arc::clone(&crawler), &config).await?;
    register_refresh_job(&scheduler, store, crawler, &config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring catalog crawl.
///
/// One scheduled run chains time-boxed passes: each pass returns a
/// resumption cursor when cut short, and the run re-invokes the crawl from
/// that cursor until the catalog is exhausted or the pass cap is hit.
async fn register_crawl_job(
    scheduler: &JobScheduler,
    store: Arc<dyn GameStore>,
    crawler: Arc<Crawler>,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(config.crawl_schedule.as_str(), move |_uuid, _lock| {
        let store = Arc::clone(&store);
        let crawler = Arc::clone(&crawler);

        Box::pin(async move {
            tracing::info!("scheduler: starting catalog crawl run");
            run_crawl_to_exhaustion(store.as_ref(), &crawler).await;
            tracing::info!("scheduler: catalog crawl run complete");
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Chain crawl passes from the returned cursors until the catalog is done.
async fn run_crawl_to_exhaustion(store: &dyn GameStore, crawler: &Crawler) {
    let mut page = 1u32;
    for pass in 1..=MAX_CRAWL_PASSES {
        let outcome = match crawler.crawl(store, page, None).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, pass, "scheduler: crawl pass failed");
                return;
            }
        };

        tracing::info!(
            pass,
            stop = ?outcome.stop,
            pages_crawled = outcome.pages_crawled,
            games_written = outcome.games_written,
            discount_records_written = outcome.discount_records_written,
            "scheduler: crawl pass finished"
        );

        match outcome.next_page {
            Some(next) => {
                // A failed fetch that made no progress would loop on the
                // same cursor forever without the pass cap.
                if outcome.stop == StopReason::FetchFailed && outcome.pages_crawled == 0 {
                    tracing::warn!(page = next, "scheduler: no progress this pass, giving up");
                    return;
                }
                page = next;
            }
            None => return,
        }
    }
    tracing::warn!(
        passes = MAX_CRAWL_PASSES,
        "scheduler: crawl pass cap reached before exhaustion"
    );
}

/// Register the daily refresh of games whose discount window has lapsed.
async fn register_refresh_job(
    scheduler: &JobScheduler,
    store: Arc<dyn GameStore>,
    crawler: Arc<Crawler>,
    config: &AppConfig,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(config.refresh_schedule.as_str(), move |_uuid, _lock| {
        let store = Arc::clone(&store);
        let crawler = Arc::clone(&crawler);

        Box::pin(async move {
            tracing::info!("scheduler: starting expired-discount refresh");
            match crawler.refresh_expired(store.as_ref(), Utc::now()).await {
                Ok(considered) => {
                    tracing::info!(considered, "scheduler: expired-discount refresh complete");
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: expired-discount refresh failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
