use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::sync::reconciler::Reconciler;
use crate::utils::timezone;

/// Spawn the periodic background sync on the actix runtime. Each tick
/// re-syncs yesterday and today (display dates) so late provider sessions
/// for the previous day are picked up without a manual trigger.
pub fn spawn(reconciler: Arc<Reconciler>, interval_secs: u64) {
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(Duration::from_secs(interval_secs.max(60)));
        loop {
            ticker.tick().await;

            let today = timezone::display_today(Utc::now());
            let mut dates = Vec::with_capacity(2);
            if let Some(yesterday) = today.pred_opt() {
                dates.push(yesterday);
            }
            dates.push(today);

            for date in dates {
                let run = reconciler.run(date).await;
                log::info!(
                    "Scheduled sync for {}: {}/{} synced, {} errors (run {})",
                    date,
                    run.synced_count,
                    run.total_external_users,
                    run.error_count,
                    run.run_id
                );
            }
        }
    });
}
