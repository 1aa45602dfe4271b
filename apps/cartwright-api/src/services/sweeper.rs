//! Background removal of carts nobody has touched for a while, and of the
//! session records that pointed at them.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::cart::{CartValidator, ServiceResult};
use super::store::{CartStore, Catalog};
use crate::middleware::SessionBackend;

/// Runs one sweep: carts whose newest line is older than `ttl` are deleted.
pub async fn sweep_once<C: Catalog, S: CartStore>(
    cart: &CartValidator<C, S>,
    ttl: chrono::Duration,
) -> ServiceResult<u64> {
    let cutoff = Utc::now() - ttl;
    let removed = cart.purge_idle(cutoff).await?;

    if removed > 0 {
        info!(removed, cutoff = %cutoff, "Swept idle carts");
    } else {
        debug!(cutoff = %cutoff, "No idle carts to sweep");
    }
    Ok(removed)
}

/// Spawns the sweeper loop. The first sweep runs immediately.
///
/// Failures are logged and the loop carries on; abort the handle to stop it.
pub fn spawn<C: Catalog, S: CartStore>(
    cart: Arc<CartValidator<C, S>>,
    sessions: SessionBackend,
    ttl: chrono::Duration,
    every: Duration,
) -> JoinHandle<()> {
    info!(ttl_hours = ttl.num_hours(), every_secs = every.as_secs(), "Starting idle cart sweeper");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(err) = sweep_once(&cart, ttl).await {
                error!(error = %err, "Idle cart sweep failed");
            }
            if let Err(err) = sessions.delete_expired().await {
                error!(error = %err, "Expired session sweep failed");
            }
        }
    })
}
