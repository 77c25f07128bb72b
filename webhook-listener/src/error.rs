//! Error types for the helix-webhooks crate.

use std::time::Duration;

use callback_server::ServerError;
use helix_api::ApiError;

/// Errors from listener lifecycle and subscription management.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// `listen()` was called while the listener was already listening
    #[error("Trying to listen while already listening")]
    AlreadyListening,

    /// `unlisten()` was called while the listener was not listening
    #[error("Trying to unlisten while not listening")]
    NotListening,

    /// `start()` was called on a subscription that is already active
    #[error("Subscription {id} has already been started")]
    AlreadyStarted {
        /// The subscription identifier
        id: String,
    },

    /// The subscription was stopped before the hub accepted it; the
    /// registration has been withdrawn again
    #[error("Subscription {id} was stopped while subscribing")]
    StartInterrupted {
        /// The subscription identifier
        id: String,
    },

    /// The platform did not answer an unsubscribe call in time
    #[error("Unsubscribing {id} timed out after {timeout:?}")]
    StopTimedOut {
        /// The subscription identifier
        id: String,
        /// The configured stop timeout
        timeout: Duration,
    },

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The callback server failed
    #[error("Callback server error: {0}")]
    Server(#[from] ServerError),

    /// The platform rejected a subscribe or unsubscribe call
    #[error("Platform error: {0}")]
    Api(#[from] ApiError),
}

/// Reasons a notification signature is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The request carried no signature header
    #[error("Missing signature header")]
    Missing,

    /// The header is not `<algorithm>=<hex digest>`
    #[error("Malformed signature header")]
    Malformed,

    /// The header names an algorithm other than sha256
    #[error("Unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The digest does not match the body
    #[error("Signature mismatch")]
    Mismatch,
}

/// Errors from processing a notification body.
#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    /// The body failed authenticity validation
    #[error("Signature rejected: {0}")]
    Signature(#[from] SignatureError),

    /// The body is not a valid response envelope for the subscription kind
    #[error("Failed to decode notification body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The envelope held no resource where one is required
    #[error("Notification for {kind} carried no data")]
    EmptyPayload {
        /// The subscription kind name
        kind: &'static str,
    },
}

/// Convenience type alias for Results using ListenerError.
pub type ListenerResult<T> = std::result::Result<T, ListenerError>;
