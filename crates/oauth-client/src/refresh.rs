//! Proactive token refresh timer
//!
//! One-shot task armed after each token store: sleeps until the stored
//! token enters the refresh buffer, then invokes the refresh operation. A
//! successful refresh re-arms the timer through the store path, so the
//! schedule is self-sustaining while refreshes keep succeeding. Failures
//! are logged and leave the stored tokens untouched; the next
//! `access_token` call retries reactively.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::OAuthClient;

/// Spawn the one-shot refresh task. The caller keeps the handle and aborts
/// it on re-arm or logout, so at most one timer is outstanding per client.
pub(crate) fn spawn_refresh_task(client: OAuthClient, fire_in: Duration) -> JoinHandle<()> {
    debug!(fire_in_ms = fire_in.as_millis() as u64, "arming refresh timer");
    tokio::spawn(async move {
        tokio::time::sleep(fire_in).await;
        match client.refresh_access_token().await {
            Ok(_) => debug!("scheduled token refresh succeeded"),
            Err(e) => warn!(
                error = %e,
                code = e.code(),
                "scheduled token refresh failed, keeping previous tokens"
            ),
        }
    })
}
