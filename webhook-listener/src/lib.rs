//! # helix-webhooks
//!
//! Receive Twitch Helix webhook notifications over a WebSub-style handshake.
//!
//! A [`Listener`] runs one HTTP(S) callback server and any number of
//! [`Subscription`]s behind it:
//!
//! 1. `subscribe_to_*` builds a subscription with a provisional id, a
//!    callback URL and a random secret, and registers it.
//! 2. [`Subscription::start`] asks the hub (through a [`PlatformClient`]) to
//!    deliver to that URL. If the hub assigns its own id the registry follows.
//! 3. The hub sends `GET /{id}` with `hub.mode=subscribe`; the challenge is
//!    echoed and the subscription becomes verified.
//! 4. The hub POSTs bodies signed with `X-Hub-Signature: sha256=...`. Valid
//!    bodies are decoded and handed to the subscriber's handler.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use helix_webhooks::{Listener, ListenerConfig, ReverseProxyConfig};
//! # use helix_webhooks::PlatformClient;
//! # async fn run(client: Arc<dyn PlatformClient>) -> helix_webhooks::ListenerResult<()> {
//!
//! let config = ListenerConfig::new()
//!     .with_host_name("hooks.example.com")
//!     .with_port(8090)
//!     .with_reverse_proxy(
//!         ReverseProxyConfig::new()
//!             .with_port(443)
//!             .with_ssl(true)
//!             .with_path_prefix("/twitch"),
//!     );
//!
//! let listener = Listener::create(client, config)?;
//! listener.listen().await?;
//!
//! listener
//!     .subscribe_to_follows_to_user("1234", |follow| {
//!         println!("{} followed {}", follow.from_name, follow.to_name);
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Logging goes through `tracing`; see [`logging`] for a ready-made subscriber.

pub mod config;
pub mod error;
mod listener;
pub mod logging;
mod protocol;
pub mod registry;
pub mod subscription;

#[cfg(test)]
mod test_support;

pub use config::{ListenerConfig, ListenerSettings, PublicAddress, ReverseProxyConfig, SslConfig};
pub use error::{ListenerError, ListenerResult, SignatureError, SubscriptionError};
pub use listener::{LifecycleReport, Listener};
pub use registry::{RegistryHandle, SubscriptionRegistry};
pub use subscription::{
    signature, EventHandler, HookEvent, Subscription, SubscriptionKind, SubscriptionStatus,
};

pub use helix_api::{
    ApiError, Follow, HubOptions, HubTopic, PlatformClient, Stream, User, UserId, UserIdResolvable,
};
