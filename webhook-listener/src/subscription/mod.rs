//! Webhook subscriptions and their lifecycle.
//!
//! A [`Subscription`] moves through [`SubscriptionStatus`]:
//!
//! ```text
//! Created ──start()──▶ Subscribing ──verify()──▶ Verified
//!    ▲                     │                        │
//!    │                     └──────stop()────────────┤
//!    │                                              ▼
//!    └───────────────── start() again ─────────── Stopped
//! ```
//!
//! Subscriptions are created by the [`Listener`](crate::Listener), which keeps
//! them in its registry. Callers receive a shared handle and may stop them.

pub mod kind;
pub mod signature;

use std::sync::Arc;
use std::time::Duration;

use helix_api::{HubOptions, HubTopic, PlatformClient};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ListenerSettings;
use crate::error::{ListenerError, ListenerResult, SubscriptionError};
use crate::registry::RegistryHandle;

pub use kind::{HookEvent, SubscriptionKind};

/// Callback receiving decoded notifications
pub type EventHandler = Arc<dyn Fn(HookEvent) + Send + Sync>;

/// Lifecycle state of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    /// Constructed, not yet registered with the hub
    Created,
    /// Subscribe call issued, awaiting verification
    Subscribing,
    /// The hub completed the verification handshake
    Verified,
    /// Unsubscribed, or the subscribe call failed
    Stopped,
}

impl SubscriptionStatus {
    /// Whether `start()` is allowed from this state
    pub fn can_start(&self) -> bool {
        matches!(self, SubscriptionStatus::Created | SubscriptionStatus::Stopped)
    }
}

/// A single hub registration.
pub struct Subscription {
    id: RwLock<String>,
    topic: HubTopic,
    kind: SubscriptionKind,
    options: HubOptions,
    status: RwLock<SubscriptionStatus>,
    handler: EventHandler,
    client: Arc<dyn PlatformClient>,
    registry: RegistryHandle,
    stop_timeout: Duration,
}

impl Subscription {
    /// Build a subscription with a fresh provisional identifier and secret.
    pub(crate) fn new(
        topic: HubTopic,
        handler: EventHandler,
        client: Arc<dyn PlatformClient>,
        registry: RegistryHandle,
        settings: &ListenerSettings,
    ) -> Arc<Self> {
        let id = Uuid::new_v4().simple().to_string();
        let secret = Uuid::new_v4().simple().to_string();
        let options = HubOptions::new(settings.build_hook_url(&id), secret, settings.lease_seconds);

        Arc::new(Self {
            id: RwLock::new(id),
            kind: SubscriptionKind::of(&topic),
            topic,
            options,
            status: RwLock::new(SubscriptionStatus::Created),
            handler,
            client,
            registry,
            stop_timeout: settings.stop_timeout,
        })
    }

    /// Current identifier. Changes once if the hub assigns its own.
    pub async fn id(&self) -> String {
        self.id.read().await.clone()
    }

    pub fn topic(&self) -> &HubTopic {
        &self.topic
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.kind
    }

    /// The URL registered with the hub
    pub fn callback_url(&self) -> &str {
        &self.options.callback_url
    }

    pub fn lease_seconds(&self) -> u32 {
        self.options.lease_seconds
    }

    pub async fn status(&self) -> SubscriptionStatus {
        *self.status.read().await
    }

    pub async fn is_verified(&self) -> bool {
        self.status().await == SubscriptionStatus::Verified
    }

    /// Register with the hub.
    ///
    /// Allowed from `Created` or `Stopped`. If the hub answers with an
    /// identifier other than the provisional one, the registry entry is
    /// moved to it.
    ///
    /// The callback URL keeps ending in the provisional identifier, so after
    /// such a move requests to that URL are answered `410 Gone`. Deliveries
    /// must then address the hub's identifier.
    ///
    /// A subscription stopped while the subscribe call is in flight is
    /// withdrawn from the hub again once the call returns, and the start
    /// fails with [`ListenerError::StartInterrupted`].
    pub async fn start(&self) -> ListenerResult<()> {
        let provisional = {
            let mut status = self.status.write().await;
            if !status.can_start() {
                return Err(ListenerError::AlreadyStarted { id: self.id().await });
            }
            *status = SubscriptionStatus::Subscribing;
            self.id().await
        };

        debug!(id = %provisional, topic = %self.topic, "Subscribing");

        match self.client.subscribe(&self.topic, &self.options).await {
            Ok(assigned) => {
                if assigned != provisional {
                    if !self.registry.rekey(&provisional, &assigned).await {
                        // Not registered (anymore); keep our own id in step anyway
                        self.set_id(assigned.clone()).await;
                    }
                    debug!(from = %provisional, to = %assigned, "Hub assigned a new subscription id");
                }

                if self.status().await == SubscriptionStatus::Stopped {
                    self.withdraw(&assigned).await;
                    return Err(ListenerError::StartInterrupted { id: assigned });
                }

                info!(id = %assigned, topic = %self.topic, "Subscribed");
                Ok(())
            }
            Err(e) => {
                *self.status.write().await = SubscriptionStatus::Stopped;
                warn!(id = %provisional, topic = %self.topic, error = %e, "Subscribe failed");
                Err(e.into())
            }
        }
    }

    /// Undo a subscribe call that completed after the subscription was stopped.
    async fn withdraw(&self, id: &str) {
        debug!(id = %id, topic = %self.topic, "Stopped while subscribing, withdrawing");

        let call = self.client.unsubscribe(&self.topic, &self.options);
        match tokio::time::timeout(self.stop_timeout, call).await {
            Ok(Ok(())) => info!(id = %id, topic = %self.topic, "Withdrew subscription"),
            Ok(Err(e)) if e.is_stale_subscription() => {}
            Ok(Err(e)) => warn!(id = %id, topic = %self.topic, error = %e, "Withdrawing subscription failed"),
            Err(_) => warn!(id = %id, timeout = ?self.stop_timeout, "Withdrawing subscription timed out"),
        }
    }

    /// Unregister from the hub and drop out of the listener.
    ///
    /// The entry is dropped once the hub no longer holds the registration,
    /// or when the call timed out. Other upstream failures leave it in place
    /// so the stop can be retried.
    pub async fn stop(&self) -> ListenerResult<()> {
        let result = self.suspend().await;
        if matches!(result, Ok(()) | Err(ListenerError::StopTimedOut { .. })) {
            self.registry.drop_entry(&self.id().await).await;
        }
        result
    }

    /// Unregister from the hub but stay registered locally, so a later
    /// `listen()` starts the subscription again.
    pub(crate) async fn suspend(&self) -> ListenerResult<()> {
        let id = self.id().await;

        // Stopped up front so a start still awaiting the hub sees it
        let previous = {
            let mut status = self.status.write().await;
            let previous = *status;
            *status = SubscriptionStatus::Stopped;
            match previous {
                SubscriptionStatus::Created | SubscriptionStatus::Stopped => return Ok(()),
                SubscriptionStatus::Subscribing | SubscriptionStatus::Verified => previous,
            }
        };

        debug!(id = %id, topic = %self.topic, "Unsubscribing");

        let call = self.client.unsubscribe(&self.topic, &self.options);
        match tokio::time::timeout(self.stop_timeout, call).await {
            Ok(Ok(())) => {
                info!(id = %id, topic = %self.topic, "Unsubscribed");
                Ok(())
            }
            Ok(Err(e)) if e.is_stale_subscription() => {
                debug!(id = %id, "Hub no longer knows subscription, treating as stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                {
                    let mut status = self.status.write().await;
                    if *status == SubscriptionStatus::Stopped {
                        *status = previous;
                    }
                }
                warn!(id = %id, topic = %self.topic, error = %e, "Unsubscribe failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(id = %id, timeout = ?self.stop_timeout, "Unsubscribe timed out, abandoning");
                Err(ListenerError::StopTimedOut {
                    id,
                    timeout: self.stop_timeout,
                })
            }
        }
    }

    /// Record a completed verification handshake.
    pub async fn verify(&self) {
        *self.status.write().await = SubscriptionStatus::Verified;
        let id = self.id().await;
        info!(id = %id, topic = %self.topic, "Subscription verified");
    }

    /// The hub ended the subscription on its side.
    pub(crate) async fn mark_stopped(&self) {
        *self.status.write().await = SubscriptionStatus::Stopped;
    }

    /// Validate, decode and dispatch one notification body.
    ///
    /// The handler runs at most once, and only for an authentic body that
    /// decodes for this subscription's kind.
    pub async fn handle_data(
        &self,
        raw: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), SubscriptionError> {
        signature::verify(&self.options.secret, raw, signature_header)?;
        let event = self.kind.transform(raw)?;
        (self.handler)(event);
        Ok(())
    }

    /// Only called by the registry, under its write lock.
    pub(crate) async fn set_id(&self, id: String) {
        *self.id.write().await = id;
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("kind", &self.kind)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
