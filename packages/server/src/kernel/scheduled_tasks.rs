//! Background jobs on tokio-cron-scheduler.
//!
//! ```text
//! Scheduler (every minute)
//!     └─► process_scheduled_notifications()
//!             └─► claim due rows → resolve tokens → push gateway
//! ```
//!
//! The same action is reachable over HTTP at
//! `POST /functions/process-scheduled-notifications`.

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::notifications::actions::process_scheduled_notifications;
use crate::kernel::ServerDeps;

pub async fn start_scheduler(deps: ServerDeps) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job_deps = deps.clone();
    let dispatch_job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let deps = job_deps.clone();
        Box::pin(async move {
            match process_scheduled_notifications(&deps).await {
                Ok(processed) if !processed.is_empty() => {
                    tracing::info!(count = processed.len(), "scheduled notifications processed");
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Scheduled notification task failed: {}", e),
            }
        })
    })?;
    scheduler.add(dispatch_job).await?;

    // Drop SSE channels whose subscribers went away
    let hub = deps.stream_hub.clone();
    let cleanup_job = Job::new_async("0 */10 * * * *", move |_uuid, _lock| {
        let hub = hub.clone();
        Box::pin(async move {
            hub.cleanup().await;
        })
    })?;
    scheduler.add(cleanup_job).await?;

    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (notification dispatch every minute)");
    Ok(scheduler)
}
