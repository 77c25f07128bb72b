//! Error types for the callback server.

use std::net::SocketAddr;

/// Errors that can occur while starting the callback server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No free port was found in the requested range
    #[error("No available port found in range {start}-{end}")]
    NoAvailablePort {
        /// First port tried
        start: u16,
        /// Last port tried
        end: u16,
    },

    /// The requested address is already in use
    #[error("Address {0} is not available")]
    AddressUnavailable(SocketAddr),

    /// Binding the HTTP server failed
    #[error("Failed to bind {addr}: {message}")]
    Bind {
        /// Address the server tried to bind
        addr: SocketAddr,
        /// Underlying error message
        message: String,
    },

    /// The server task exited before signalling readiness
    #[error("Server failed to start: {0}")]
    StartupFailed(String),
}
