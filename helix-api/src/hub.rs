//! Hub topics and subscribe-time options.

use crate::models::UserId;

/// Base URL of the Helix API, used to render topic URLs
pub const HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";

/// The resource a webhook subscription watches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HubTopic {
    /// Changes to a user's profile
    UserChange {
        user_id: UserId,
        /// Request the user's email address in notifications
        with_email: bool,
    },
    /// A user's stream going live, changing or going offline
    StreamChange { user_id: UserId },
    /// New follows of a user
    FollowsToUser { user_id: UserId },
    /// New follows made by a user
    FollowsFromUser { user_id: UserId },
}

impl HubTopic {
    /// Get the name of this topic kind as a string
    pub fn name(&self) -> &'static str {
        match self {
            HubTopic::UserChange { .. } => "user.change",
            HubTopic::StreamChange { .. } => "stream.change",
            HubTopic::FollowsToUser { .. } => "follows.to",
            HubTopic::FollowsFromUser { .. } => "follows.from",
        }
    }

    /// The user this topic is about
    pub fn user_id(&self) -> &UserId {
        match self {
            HubTopic::UserChange { user_id, .. }
            | HubTopic::StreamChange { user_id }
            | HubTopic::FollowsToUser { user_id }
            | HubTopic::FollowsFromUser { user_id } => user_id,
        }
    }

    /// The `hub.topic` URL the platform expects for this topic
    pub fn topic_url(&self) -> String {
        match self {
            HubTopic::UserChange { user_id, .. } => {
                format!("{HELIX_BASE_URL}/users?id={user_id}")
            }
            HubTopic::StreamChange { user_id } => {
                format!("{HELIX_BASE_URL}/streams?user_id={user_id}")
            }
            HubTopic::FollowsToUser { user_id } => {
                format!("{HELIX_BASE_URL}/users/follows?first=1&to_id={user_id}")
            }
            HubTopic::FollowsFromUser { user_id } => {
                format!("{HELIX_BASE_URL}/users/follows?first=1&from_id={user_id}")
            }
        }
    }

    /// Whether subscribing to this topic needs the `user:read:email` scope
    pub fn requires_email_scope(&self) -> bool {
        matches!(self, HubTopic::UserChange { with_email: true, .. })
    }
}

impl std::fmt::Display for HubTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name(), self.user_id())
    }
}

/// Subscribe-time parameters for a hub registration.
///
/// The same value is passed to subscribe and unsubscribe so the hub can match
/// the unsubscription to the exact registration.
#[derive(Clone, PartialEq, Eq)]
pub struct HubOptions {
    /// Public URL the hub calls for verification and notifications
    pub callback_url: String,
    /// Shared secret the hub signs notification bodies with
    pub secret: String,
    /// Requested lease duration
    pub lease_seconds: u32,
}

impl HubOptions {
    /// Create a new set of hub options
    pub fn new(callback_url: impl Into<String>, secret: impl Into<String>, lease_seconds: u32) -> Self {
        Self {
            callback_url: callback_url.into(),
            secret: secret.into(),
            lease_seconds,
        }
    }
}

impl std::fmt::Debug for HubOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubOptions")
            .field("callback_url", &self.callback_url)
            .field("secret", &"<redacted>")
            .field("lease_seconds", &self.lease_seconds)
            .finish()
    }
}
