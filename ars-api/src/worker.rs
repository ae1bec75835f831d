use std::sync::Arc;

use ars_booking::ReservationService;
use chrono::Utc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Releases expired holds every `every`. Runs until the task is dropped.
pub async fn start_hold_expiry_worker(reservations: Arc<ReservationService>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Hold expiry worker started, sweeping every {:?}", every);

    loop {
        ticker.tick().await;
        match reservations.expire_holds(Utc::now()).await {
            Ok(0) => {}
            Ok(released) => info!("Released {} expired holds", released),
            Err(e) => error!("Hold sweep failed: {}", e),
        }
    }
}
