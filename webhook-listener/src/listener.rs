//! The webhook listener: one callback server, many subscriptions.

use std::sync::Arc;

use callback_server::CallbackServer;
use futures::future::join_all;
use helix_api::{Follow, HubTopic, PlatformClient, Stream, User, UserIdResolvable};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::{ListenerConfig, ListenerSettings};
use crate::error::{ListenerError, ListenerResult};
use crate::protocol::HookProtocol;
use crate::registry::SubscriptionRegistry;
use crate::subscription::{EventHandler, HookEvent, Subscription};

/// Outcome of starting or stopping every subscription at once.
///
/// One failing subscription never prevents the others from being processed.
#[derive(Debug, Default)]
pub struct LifecycleReport {
    /// Identifiers processed successfully
    pub succeeded: Vec<String>,
    /// Identifiers that failed, with the reason
    pub failed: Vec<(String, ListenerError)>,
}

impl LifecycleReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn collect(results: Vec<(String, ListenerResult<()>)>) -> Self {
        let mut report = Self::default();
        for (id, result) in results {
            match result {
                Ok(()) => report.succeeded.push(id),
                Err(e) => report.failed.push((id, e)),
            }
        }
        report
    }
}

/// Receives hub callbacks and manages webhook subscriptions.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use helix_webhooks::{Listener, ListenerConfig};
/// # use helix_webhooks::PlatformClient;
/// # async fn run(client: Arc<dyn PlatformClient>) -> helix_webhooks::ListenerResult<()> {
///
/// let listener = Listener::create(client, ListenerConfig::new().with_port(8090))?;
/// listener.listen().await?;
///
/// let subscription = listener
///     .subscribe_to_stream_changes("1234", |stream| match stream {
///         Some(stream) => println!("{} is live: {}", stream.user_name, stream.title),
///         None => println!("stream went offline"),
///     })
///     .await?;
///
/// // ...
///
/// subscription.stop().await?;
/// listener.unlisten().await?;
/// # Ok(())
/// # }
/// ```
pub struct Listener {
    settings: ListenerSettings,
    client: Arc<dyn PlatformClient>,
    registry: SubscriptionRegistry,
    server: Mutex<Option<CallbackServer>>,
}

impl Listener {
    /// Create a listener, resolving configuration defaults.
    ///
    /// Host and port are discovered when not configured. Nothing is bound
    /// until [`listen`](Self::listen).
    pub fn create(client: Arc<dyn PlatformClient>, config: ListenerConfig) -> ListenerResult<Self> {
        Ok(Self::with_settings(client, config.resolve()?))
    }

    /// Create a listener from already resolved settings.
    pub fn with_settings(client: Arc<dyn PlatformClient>, settings: ListenerSettings) -> Self {
        Self {
            settings,
            client,
            registry: SubscriptionRegistry::new(),
            server: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ListenerSettings {
        &self.settings
    }

    /// Public callback URL for a subscription identifier
    pub fn build_hook_url(&self, id: &str) -> String {
        self.settings.build_hook_url(id)
    }

    pub async fn is_listening(&self) -> bool {
        self.server.lock().await.is_some()
    }

    /// Local address of the running callback server
    pub async fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.server.lock().await.as_ref().map(CallbackServer::local_addr)
    }

    /// Start the callback server, then every subscription not yet active.
    ///
    /// Subscriptions are started concurrently. Their failures are reported,
    /// not returned; only a server failure is an error.
    pub async fn listen(&self) -> ListenerResult<LifecycleReport> {
        {
            let mut server = self.server.lock().await;
            if server.is_some() {
                return Err(ListenerError::AlreadyListening);
            }

            let router = Arc::new(HookProtocol::new(self.registry.clone()));
            let started = CallbackServer::start(self.settings.server_config(), router).await?;
            info!(
                addr = %started.local_addr(),
                tls = started.is_tls(),
                "Webhook listener started"
            );
            *server = Some(started);
        }

        let mut pending = Vec::new();
        for subscription in self.registry.snapshot().await {
            if subscription.status().await.can_start() {
                pending.push(subscription);
            }
        }

        let results = join_all(pending.into_iter().map(|subscription| async move {
            let result = subscription.start().await;
            (subscription.id().await, result)
        }))
        .await;

        let report = LifecycleReport::collect(results);
        log_report("start", &report);
        Ok(report)
    }

    /// Stop the callback server, then unsubscribe everything.
    ///
    /// Subscriptions stay registered and are started again by the next
    /// [`listen`](Self::listen).
    pub async fn unlisten(&self) -> ListenerResult<LifecycleReport> {
        let server = self
            .server
            .lock()
            .await
            .take()
            .ok_or(ListenerError::NotListening)?;
        server.shutdown().await;
        info!("Webhook listener stopped");

        let subscriptions = self.registry.snapshot().await;
        let results = join_all(subscriptions.into_iter().map(|subscription| async move {
            let result = subscription.suspend().await;
            (subscription.id().await, result)
        }))
        .await;

        let report = LifecycleReport::collect(results);
        log_report("stop", &report);
        Ok(report)
    }

    /// Subscribe to any hub topic with a raw event handler.
    ///
    /// The subscription is registered before the hub is contacted, so an
    /// early verification request finds it. When listening, the call waits
    /// for the hub to accept the subscription; otherwise it is started by the
    /// next [`listen`](Self::listen), as it is when an
    /// [`unlisten`](Self::unlisten) overlaps the call.
    pub async fn subscribe(
        &self,
        topic: HubTopic,
        handler: EventHandler,
    ) -> ListenerResult<Arc<Subscription>> {
        let subscription = Subscription::new(
            topic,
            handler,
            self.client.clone(),
            self.registry.handle(),
            &self.settings,
        );
        self.registry.insert(subscription.clone()).await;

        if self.is_listening().await {
            match subscription.start().await {
                // A concurrent listen() got there first
                Ok(()) | Err(ListenerError::AlreadyStarted { .. }) => {}
                // A concurrent unlisten() suspended it; the next listen() resumes it
                Err(ListenerError::StartInterrupted { .. }) => {}
                Err(e) => {
                    self.registry.remove(&subscription.id().await).await;
                    return Err(e);
                }
            }
        }

        Ok(subscription)
    }

    /// Get notified when a user changes their profile.
    ///
    /// `with_email` includes the email address, which needs the
    /// `user:read:email` scope on the platform client's credentials.
    pub async fn subscribe_to_user_changes<U, F>(
        &self,
        user: U,
        handler: F,
        with_email: bool,
    ) -> ListenerResult<Arc<Subscription>>
    where
        U: UserIdResolvable,
        F: Fn(User) + Send + Sync + 'static,
    {
        let topic = HubTopic::UserChange {
            user_id: user.user_id(),
            with_email,
        };
        self.subscribe(
            topic,
            Arc::new(move |event: HookEvent| {
                if let HookEvent::UserChanged(user) = event {
                    handler(user)
                }
            }),
        )
        .await
    }

    /// Get notified when a stream goes live, changes, or goes offline (`None`).
    pub async fn subscribe_to_stream_changes<U, F>(
        &self,
        user: U,
        handler: F,
    ) -> ListenerResult<Arc<Subscription>>
    where
        U: UserIdResolvable,
        F: Fn(Option<Stream>) + Send + Sync + 'static,
    {
        let topic = HubTopic::StreamChange {
            user_id: user.user_id(),
        };
        self.subscribe(
            topic,
            Arc::new(move |event: HookEvent| {
                if let HookEvent::StreamChanged(stream) = event {
                    handler(stream)
                }
            }),
        )
        .await
    }

    /// Get notified when someone follows the user.
    pub async fn subscribe_to_follows_to_user<U, F>(
        &self,
        user: U,
        handler: F,
    ) -> ListenerResult<Arc<Subscription>>
    where
        U: UserIdResolvable,
        F: Fn(Follow) + Send + Sync + 'static,
    {
        let topic = HubTopic::FollowsToUser {
            user_id: user.user_id(),
        };
        self.subscribe(
            topic,
            Arc::new(move |event: HookEvent| {
                if let HookEvent::FollowsToUser(follow) = event {
                    handler(follow)
                }
            }),
        )
        .await
    }

    /// Get notified when the user follows someone.
    pub async fn subscribe_to_follows_from_user<U, F>(
        &self,
        user: U,
        handler: F,
    ) -> ListenerResult<Arc<Subscription>>
    where
        U: UserIdResolvable,
        F: Fn(Follow) + Send + Sync + 'static,
    {
        let topic = HubTopic::FollowsFromUser {
            user_id: user.user_id(),
        };
        self.subscribe(
            topic,
            Arc::new(move |event: HookEvent| {
                if let HookEvent::FollowsFromUser(follow) = event {
                    handler(follow)
                }
            }),
        )
        .await
    }

    pub async fn subscription(&self, id: &str) -> Option<Arc<Subscription>> {
        self.registry.lookup(id).await
    }

    pub async fn subscriptions(&self) -> Vec<Arc<Subscription>> {
        self.registry.snapshot().await
    }

    pub async fn subscription_count(&self) -> usize {
        self.registry.len().await
    }
}

fn log_report(action: &str, report: &LifecycleReport) {
    for (id, error) in &report.failed {
        warn!(id = %id, error = %error, "Failed to {action} subscription");
    }
    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Bulk {action} finished"
    );
}
