use thiserror::Error;

/// Errors reported by a [`PlatformClient`](crate::PlatformClient) implementation
///
/// These abstract away the transport used to reach the hub so the listener can
/// decide how to react (propagate, ignore a stale unsubscribe, etc.) without
/// knowing anything about HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// The hub could not be reached: connection refused, DNS failure, timeout.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response parsing error
    ///
    /// The hub answered but the response could not be interpreted.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The hub rejected the request
    #[error("Hub rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the hub
        status: u16,
        /// Message returned by the hub
        message: String,
    },

    /// The hub has no record of the subscription
    ///
    /// Returned by unsubscribe calls for subscriptions the hub already forgot.
    /// Callers that only want the subscription gone treat this as success.
    #[error("Subscription not found on hub")]
    SubscriptionNotFound,

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    /// Whether this error means the hub already forgot the subscription
    pub fn is_stale_subscription(&self) -> bool {
        matches!(self, ApiError::SubscriptionNotFound)
            || matches!(self, ApiError::Rejected { status: 404 | 410, .. })
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::ParseError(error.to_string())
    }
}
