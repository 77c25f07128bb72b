//! The platform client seam.

use async_trait::async_trait;

use crate::error::Result;
use crate::hub::{HubOptions, HubTopic};

/// Issues hub subscribe and unsubscribe calls on behalf of the listener.
///
/// Implementations own transport, authentication and retry policy. The
/// listener only cares about the identifier the hub assigns to a new
/// registration and whether an unsubscribe went through.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use helix_api::{HubOptions, HubTopic, PlatformClient, Result};
///
/// struct NoopClient;
///
/// #[async_trait]
/// impl PlatformClient for NoopClient {
///     async fn subscribe(&self, _topic: &HubTopic, options: &HubOptions) -> Result<String> {
///         // The identifier is the last path segment of the callback URL
///         Ok(options.callback_url.rsplit('/').next().unwrap_or_default().to_string())
///     }
///
///     async fn unsubscribe(&self, _topic: &HubTopic, _options: &HubOptions) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Register `options.callback_url` for `topic`.
    ///
    /// Returns the identifier the hub will use for this registration.
    async fn subscribe(&self, topic: &HubTopic, options: &HubOptions) -> Result<String>;

    /// Remove the registration created with the same `topic` and `options`.
    ///
    /// Implementations should return [`ApiError::SubscriptionNotFound`] when
    /// the hub no longer knows the registration.
    ///
    /// [`ApiError::SubscriptionNotFound`]: crate::ApiError::SubscriptionNotFound
    async fn unsubscribe(&self, topic: &HubTopic, options: &HubOptions) -> Result<()>;
}
