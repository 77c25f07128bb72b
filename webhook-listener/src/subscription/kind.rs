//! Notification kinds and their payload transforms.

use helix_api::{Follow, HelixResponse, HubTopic, Stream, User};
use serde::de::DeserializeOwned;

use crate::error::SubscriptionError;

/// What a subscription watches, and therefore how its notifications decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    UserChange,
    StreamChange,
    FollowsToUser,
    FollowsFromUser,
}

/// A decoded notification, handed to the subscriber's handler.
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    UserChanged(User),
    /// `None` when the stream went offline
    StreamChanged(Option<Stream>),
    FollowsToUser(Follow),
    FollowsFromUser(Follow),
}

impl SubscriptionKind {
    pub fn of(topic: &HubTopic) -> Self {
        match topic {
            HubTopic::UserChange { .. } => SubscriptionKind::UserChange,
            HubTopic::StreamChange { .. } => SubscriptionKind::StreamChange,
            HubTopic::FollowsToUser { .. } => SubscriptionKind::FollowsToUser,
            HubTopic::FollowsFromUser { .. } => SubscriptionKind::FollowsFromUser,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SubscriptionKind::UserChange => "user.change",
            SubscriptionKind::StreamChange => "stream.change",
            SubscriptionKind::FollowsToUser => "follows.to",
            SubscriptionKind::FollowsFromUser => "follows.from",
        }
    }

    /// Decode a raw notification body into the event for this kind.
    ///
    /// Bodies are `{"data": [...]}` envelopes. Only the first resource is
    /// used. An empty envelope means "stream offline" for stream changes and
    /// is an error for every other kind.
    pub fn transform(&self, raw: &[u8]) -> Result<HookEvent, SubscriptionError> {
        match self {
            SubscriptionKind::UserChange => self.first::<User>(raw).map(HookEvent::UserChanged),
            SubscriptionKind::StreamChange => {
                let response: HelixResponse<Stream> = serde_json::from_slice(raw)?;
                Ok(HookEvent::StreamChanged(response.into_first()))
            }
            SubscriptionKind::FollowsToUser => self.first::<Follow>(raw).map(HookEvent::FollowsToUser),
            SubscriptionKind::FollowsFromUser => {
                self.first::<Follow>(raw).map(HookEvent::FollowsFromUser)
            }
        }
    }

    fn first<T: DeserializeOwned>(&self, raw: &[u8]) -> Result<T, SubscriptionError> {
        let response: HelixResponse<T> = serde_json::from_slice(raw)?;
        response
            .into_first()
            .ok_or(SubscriptionError::EmptyPayload { kind: self.name() })
    }
}

impl std::fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
