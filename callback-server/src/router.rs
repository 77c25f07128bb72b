//! Request routing contracts for hub callbacks.
//!
//! The server translates each inbound request into a [`VerificationRequest`] or
//! a [`NotificationPayload`] and hands it to a [`HookRouter`]. The router
//! decides what happens to the subscription and answers with a reply that maps
//! directly onto an HTTP status code.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use warp::http::StatusCode;

/// Query parameter carrying the verification mode
pub const MODE_PARAM: &str = "hub.mode";
/// Query parameter carrying the challenge to echo back
pub const CHALLENGE_PARAM: &str = "hub.challenge";
/// Query parameter carrying the topic URL
pub const TOPIC_PARAM: &str = "hub.topic";
/// Query parameter carrying the granted lease
pub const LEASE_SECONDS_PARAM: &str = "hub.lease_seconds";
/// Query parameter carrying the reason for a denial
pub const REASON_PARAM: &str = "hub.reason";
/// Header carrying the notification body signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature";

/// Verification mode sent by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubMode {
    /// The hub is confirming a subscribe request
    Subscribe,
    /// The hub is confirming an unsubscribe request
    Unsubscribe,
    /// The hub refused or terminated the subscription
    Denied,
    /// Any other mode value
    Other(String),
}

impl HubMode {
    /// Parse a `hub.mode` value.
    pub fn parse(value: &str) -> Self {
        match value {
            "subscribe" => HubMode::Subscribe,
            "unsubscribe" => HubMode::Unsubscribe,
            "denied" => HubMode::Denied,
            other => HubMode::Other(other.to_string()),
        }
    }

    /// Get the mode as it appears on the wire.
    pub fn as_str(&self) -> &str {
        match self {
            HubMode::Subscribe => "subscribe",
            HubMode::Unsubscribe => "unsubscribe",
            HubMode::Denied => "denied",
            HubMode::Other(other) => other,
        }
    }
}

impl std::fmt::Display for HubMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound verification request (`GET /{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationRequest {
    /// Value of `hub.mode`, if present
    pub mode: Option<HubMode>,
    /// Value of `hub.challenge`, if present
    pub challenge: Option<String>,
    /// Value of `hub.topic`, if present
    pub topic: Option<String>,
    /// Value of `hub.lease_seconds`, if present and numeric
    pub lease_seconds: Option<u32>,
    /// Value of `hub.reason`, if present
    pub reason: Option<String>,
}

impl VerificationRequest {
    /// Build a request from decoded query parameters.
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            mode: query.get(MODE_PARAM).map(|mode| HubMode::parse(mode)),
            challenge: query.get(CHALLENGE_PARAM).cloned(),
            topic: query.get(TOPIC_PARAM).cloned(),
            lease_seconds: query
                .get(LEASE_SECONDS_PARAM)
                .and_then(|lease| lease.parse().ok()),
            reason: query.get(REASON_PARAM).cloned(),
        }
    }

    /// Whether the hub is confirming a subscribe request.
    pub fn is_subscribe(&self) -> bool {
        self.mode == Some(HubMode::Subscribe)
    }
}

/// Outcome of a verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationReply {
    /// Subscription confirmed; the challenge is echoed as the body
    Accepted { challenge: String },
    /// The hub ended the subscription and it was removed
    Removed,
    /// No such subscription
    Gone,
}

impl VerificationReply {
    /// HTTP status for this reply.
    pub fn status(&self) -> StatusCode {
        match self {
            VerificationReply::Accepted { .. } => StatusCode::ACCEPTED,
            VerificationReply::Removed => StatusCode::OK,
            VerificationReply::Gone => StatusCode::GONE,
        }
    }

    /// Response body for this reply.
    pub fn into_body(self) -> String {
        match self {
            VerificationReply::Accepted { challenge } => challenge,
            VerificationReply::Removed | VerificationReply::Gone => String::new(),
        }
    }
}

/// An inbound notification (`POST /{id}`).
#[derive(Debug, Clone)]
pub struct NotificationPayload {
    /// The subscription ID from the request path
    pub subscription_id: String,
    /// The raw, unparsed request body
    pub body: Bytes,
    /// The `X-Hub-Signature` header, if present
    pub signature: Option<String>,
}

/// Outcome of a notification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationReply {
    /// Delivery acknowledged
    Accepted,
    /// No such subscription
    Gone,
}

impl NotificationReply {
    /// HTTP status for this reply.
    pub fn status(&self) -> StatusCode {
        match self {
            NotificationReply::Accepted => StatusCode::ACCEPTED,
            NotificationReply::Gone => StatusCode::GONE,
        }
    }
}

/// Decides what happens to hub callbacks.
///
/// Implemented by the layer that owns the subscriptions. The server never
/// interprets subscription state itself.
#[async_trait]
pub trait HookRouter: Send + Sync {
    /// Handle a verification request for `subscription_id`.
    async fn verify(&self, subscription_id: &str, request: VerificationRequest) -> VerificationReply;

    /// Handle a notification.
    async fn notify(&self, payload: NotificationPayload) -> NotificationReply;
}
