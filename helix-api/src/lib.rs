//! Helix webhook hub vocabulary.
//!
//! This crate describes everything the webhook listener needs to know about the
//! remote platform without talking to it directly:
//!
//! - [`HubTopic`]: the resource a subscription watches (user changes, stream
//!   changes, follows to or from a user) and the topic URL the hub expects.
//! - [`HubOptions`]: subscribe-time parameters (callback URL, shared secret,
//!   lease) passed verbatim to both the subscribe and unsubscribe calls.
//! - [`PlatformClient`]: the async trait a REST client implements to issue
//!   those calls.
//! - Resource models ([`User`], [`Stream`], [`Follow`]) and the
//!   [`HelixResponse`] envelope that notification bodies are wrapped in.
//!
//! # Example
//!
//! ```rust
//! use helix_api::{HubOptions, HubTopic, UserId};
//!
//! let topic = HubTopic::StreamChange { user_id: UserId::from("1234") };
//! assert_eq!(
//!     topic.topic_url(),
//!     "https://api.twitch.tv/helix/streams?user_id=1234"
//! );
//!
//! let options = HubOptions::new("https://hooks.example.com/abc", "s3cr3t", 100_000);
//! assert_eq!(options.lease_seconds, 100_000);
//! ```

pub mod client;
pub mod error;
pub mod hub;
pub mod models;

pub use client::PlatformClient;
pub use error::{ApiError, Result};
pub use hub::{HubOptions, HubTopic, HELIX_BASE_URL};
pub use models::{Follow, HelixResponse, Stream, User, UserId, UserIdResolvable};
