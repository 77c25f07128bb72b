//! Shared fixtures for unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use helix_api::{ApiError, HubOptions, HubTopic, PlatformClient, Result, UserId};

use crate::config::{ListenerConfig, ListenerSettings};
use crate::registry::SubscriptionRegistry;
use crate::subscription::{EventHandler, HookEvent, Subscription};

pub(crate) type Recorded = Arc<Mutex<Vec<HookEvent>>>;

#[derive(Clone)]
pub(crate) enum UnsubscribeBehavior {
    Succeed,
    Fail(ApiError),
    Hang,
}

struct State {
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    fail_subscribe: bool,
    assigned_id: Option<String>,
    unsubscribe: UnsubscribeBehavior,
    last_options: Option<HubOptions>,
    subscribe_delay: Option<Duration>,
    registered: bool,
}

/// Recording platform client with scripted answers.
pub(crate) struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                subscribe_calls: 0,
                unsubscribe_calls: 0,
                fail_subscribe: false,
                assigned_id: None,
                unsubscribe: UnsubscribeBehavior::Succeed,
                last_options: None,
                subscribe_delay: None,
                registered: false,
            }),
        })
    }

    pub(crate) fn fail_subscribe(&self, fail: bool) {
        self.state.lock().unwrap().fail_subscribe = fail;
    }

    /// Answer subscribe calls with this id instead of the callback URL's
    pub(crate) fn assign_id(&self, id: &str) {
        self.state.lock().unwrap().assigned_id = Some(id.to_string());
    }

    pub(crate) fn set_unsubscribe(&self, behavior: UnsubscribeBehavior) {
        self.state.lock().unwrap().unsubscribe = behavior;
    }

    /// Hold every subscribe call for `delay` before answering
    pub(crate) fn delay_subscribe(&self, delay: Duration) {
        self.state.lock().unwrap().subscribe_delay = Some(delay);
    }

    /// Whether the hub holds a registration after the calls seen so far
    pub(crate) fn is_registered(&self) -> bool {
        self.state.lock().unwrap().registered
    }

    pub(crate) fn subscribe_calls(&self) -> usize {
        self.state.lock().unwrap().subscribe_calls
    }

    pub(crate) fn unsubscribe_calls(&self) -> usize {
        self.state.lock().unwrap().unsubscribe_calls
    }

    pub(crate) fn last_options(&self) -> Option<HubOptions> {
        self.state.lock().unwrap().last_options.clone()
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn subscribe(&self, _topic: &HubTopic, options: &HubOptions) -> Result<String> {
        let delay = self.state.lock().unwrap().subscribe_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.subscribe_calls += 1;
        state.last_options = Some(options.clone());
        if state.fail_subscribe {
            return Err(ApiError::Rejected {
                status: 400,
                message: "invalid topic".to_string(),
            });
        }
        state.registered = true;
        let id = match &state.assigned_id {
            Some(id) => id.clone(),
            None => options.callback_url.rsplit('/').next().unwrap_or_default().to_string(),
        };
        Ok(id)
    }

    async fn unsubscribe(&self, _topic: &HubTopic, _options: &HubOptions) -> Result<()> {
        let behavior = {
            let mut state = self.state.lock().unwrap();
            state.unsubscribe_calls += 1;
            state.unsubscribe.clone()
        };
        match behavior {
            UnsubscribeBehavior::Succeed => {
                self.state.lock().unwrap().registered = false;
                Ok(())
            }
            UnsubscribeBehavior::Fail(e) => Err(e),
            UnsubscribeBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Settings for `http://example.com:8080`, no discovery
pub(crate) fn settings() -> ListenerSettings {
    ListenerConfig::new()
        .with_host_name("example.com")
        .with_port(8080)
        .resolve()
        .unwrap()
}

/// A port the OS just handed out and released again
pub(crate) fn free_port() -> u16 {
    std::net::TcpListener::bind("0.0.0.0:0")
        .and_then(|listener| listener.local_addr())
        .unwrap()
        .port()
}

/// Settings for a free localhost port
pub(crate) fn ephemeral_settings() -> ListenerSettings {
    ListenerConfig::new()
        .with_host_name("127.0.0.1")
        .with_port(free_port())
        .resolve()
        .unwrap()
}

pub(crate) fn recording_handler() -> (EventHandler, Recorded) {
    let events: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let handler: EventHandler = Arc::new(move |event| sink.lock().unwrap().push(event));
    (handler, events)
}

/// A stream subscription attached to (but not inserted into) `registry`
pub(crate) fn subscription(
    platform: Arc<FakePlatform>,
    registry: &SubscriptionRegistry,
) -> Arc<Subscription> {
    let (handler, _) = recording_handler();
    Subscription::new(
        HubTopic::StreamChange {
            user_id: UserId::new("1234"),
        },
        handler,
        platform,
        registry.handle(),
        &settings(),
    )
}

/// A registered user-change subscription recording its events
pub(crate) async fn recording_subscription(
    platform: Arc<FakePlatform>,
    registry: &SubscriptionRegistry,
) -> (Arc<Subscription>, Recorded) {
    let (handler, events) = recording_handler();
    let subscription = Subscription::new(
        HubTopic::UserChange {
            user_id: UserId::new("1234"),
            with_email: false,
        },
        handler,
        platform,
        registry.handle(),
        &settings(),
    );
    registry.insert(subscription.clone()).await;
    (subscription, events)
}
