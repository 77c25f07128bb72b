//! Resource models delivered in webhook notification bodies.
//!
//! Every notification body is a [`HelixResponse`] envelope whose `data` array
//! holds zero or more resources of the kind the topic describes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical identifier of a platform user.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new user ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the user ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything that can be resolved to a [`UserId`].
///
/// Subscribe calls accept a bare id, a [`UserId`] or a full [`User`] so callers
/// can pass whatever they already have at hand.
pub trait UserIdResolvable {
    /// Resolve to the canonical user id.
    fn user_id(&self) -> UserId;
}

impl UserIdResolvable for UserId {
    fn user_id(&self) -> UserId {
        self.clone()
    }
}

impl UserIdResolvable for User {
    fn user_id(&self) -> UserId {
        UserId::new(self.id.clone())
    }
}

impl UserIdResolvable for str {
    fn user_id(&self) -> UserId {
        UserId::from(self)
    }
}

impl UserIdResolvable for String {
    fn user_id(&self) -> UserId {
        UserId::new(self.clone())
    }
}

impl<T: UserIdResolvable + ?Sized> UserIdResolvable for &T {
    fn user_id(&self) -> UserId {
        (**self).user_id()
    }
}

/// Response envelope wrapping every notification body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelixResponse<T> {
    /// Resources carried by the notification
    pub data: Vec<T>,
}

impl<T> HelixResponse<T> {
    /// Consume the envelope and return its first resource, if any.
    pub fn into_first(self) -> Option<T> {
        self.data.into_iter().next()
    }
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    pub display_name: String,
    /// Staff/admin marker; empty for regular users
    #[serde(rename = "type", default)]
    pub user_type: String,
    /// Partner/affiliate marker; empty for regular broadcasters
    #[serde(default)]
    pub broadcaster_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub offline_image_url: String,
    #[serde(default)]
    pub view_count: u64,
    /// Only present when the subscription was created with email access
    #[serde(default)]
    pub email: Option<String>,
}

/// A live stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub game_id: String,
    /// `"live"` for live streams; empty on error
    #[serde(rename = "type", default)]
    pub stream_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

impl Stream {
    /// Thumbnail URL with the `{width}`/`{height}` placeholders filled in.
    pub fn thumbnail_url_sized(&self, width: u32, height: u32) -> String {
        self.thumbnail_url
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
    }
}

/// A follow relationship between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub from_id: String,
    #[serde(default)]
    pub from_name: String,
    pub to_id: String,
    #[serde(default)]
    pub to_name: String,
    pub followed_at: DateTime<Utc>,
}
