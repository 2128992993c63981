//! Membership propagator: one long-lived task per instance reading the
//! reserved membership topic and handing updates to the hub actor.
//!
//! The instance that persists a new membership announces it on the same
//! topic ([`HubHandle::announce_membership`]), so every instance — the
//! originator included — applies it uniformly off the bus.
//!
//! [`HubHandle::announce_membership`]: crate::hub::HubHandle::announce_membership

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bus::BusSubscription;
use crate::models::Membership;

pub(crate) async fn run(mut subscription: BusSubscription, updates: mpsc::Sender<Membership>) {
    while let Some(payload) = subscription.recv().await {
        let membership: Membership = match serde_json::from_str(&payload) {
            Ok(membership) => membership,
            Err(e) => {
                warn!(error = %e, "dropping malformed membership payload");
                continue;
            }
        };
        if updates.send(membership).await.is_err() {
            break;
        }
    }

    debug!("membership propagator stopped");
}
