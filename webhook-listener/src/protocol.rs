//! Hub callback handling: verification handshakes and notification dispatch.

use async_trait::async_trait;
use callback_server::{
    HookRouter, NotificationPayload, NotificationReply, VerificationReply, VerificationRequest,
};
use tracing::{debug, info, warn};

use crate::registry::SubscriptionRegistry;

/// Routes hub callbacks to the registered subscriptions.
///
/// Registry presence is the only authority: a known id is served whatever
/// its status, an unknown id is answered `410 Gone` so the hub stops calling.
pub(crate) struct HookProtocol {
    registry: SubscriptionRegistry,
}

impl HookProtocol {
    pub(crate) fn new(registry: SubscriptionRegistry) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl HookRouter for HookProtocol {
    async fn verify(&self, subscription_id: &str, request: VerificationRequest) -> VerificationReply {
        let Some(subscription) = self.registry.lookup(subscription_id).await else {
            debug!(id = %subscription_id, "Verification for unknown subscription");
            return VerificationReply::Gone;
        };

        if request.is_subscribe() {
            subscription.verify().await;
            debug!(
                id = %subscription_id,
                lease_seconds = ?request.lease_seconds,
                "Answering verification challenge"
            );
            return VerificationReply::Accepted {
                challenge: request.challenge.unwrap_or_default(),
            };
        }

        self.registry.remove(subscription_id).await;
        subscription.mark_stopped().await;
        info!(
            id = %subscription_id,
            mode = ?request.mode,
            reason = ?request.reason,
            "Hub ended subscription"
        );
        VerificationReply::Removed
    }

    async fn notify(&self, payload: NotificationPayload) -> NotificationReply {
        let Some(subscription) = self.registry.lookup(&payload.subscription_id).await else {
            debug!(id = %payload.subscription_id, "Notification for unknown subscription");
            return NotificationReply::Gone;
        };

        if let Err(e) = subscription
            .handle_data(&payload.body, payload.signature.as_deref())
            .await
        {
            warn!(id = %payload.subscription_id, error = %e, "Dropping notification");
        }

        NotificationReply::Accepted
    }
}
