//! Identity verification at startup
//!
//! Waits for a name to show up on the name queue, then keeps asking the
//! face-verification service until that person is confirmed in front of
//! the camera. There is no failure path: the loop returns a verified name
//! or runs until the process is interrupted.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::client::{Lookup, Services};

/// Delay between queue polls and between verification attempts
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Service locations used by the verification loop
#[derive(Debug, Clone)]
pub struct IdentityEndpoints {
    pub queue_url: String,
    pub face_verification_url: String,
}

/// Block until a queued name has been verified, returning the verified subject
pub async fn verify_identity<S: Services + ?Sized>(
    services: &S,
    endpoints: &IdentityEndpoints,
    interval: Duration,
) -> String {
    let name = await_name(services, &endpoints.queue_url, interval).await;
    info!(%name, "name received, verifying identity");
    await_verification(services, &endpoints.face_verification_url, &name, interval).await
}

async fn await_name<S: Services + ?Sized>(services: &S, queue_url: &str, interval: Duration) -> String {
    info!("waiting for name from the queue");
    loop {
        if let Some(name) = services.fetch_queued_name(queue_url).await {
            return name;
        }
        tokio::time::sleep(interval).await;
    }
}

async fn await_verification<S: Services + ?Sized>(
    services: &S,
    verify_url: &str,
    name: &str,
    interval: Duration,
) -> String {
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match services.verify_face(verify_url, name).await {
            Ok(Lookup::Found(subject)) => {
                info!(%subject, attempt, "identity verified");
                return subject;
            }
            Ok(Lookup::NotFound) => {
                warn!(%name, attempt, "verification failed, retrying detection");
            }
            Err(e) => {
                error!(%name, attempt, error = %e, "verification request failed");
            }
        }
        tokio::time::sleep(interval).await;
    }
}
