//! Generic hub callback server for receiving WebSub-style requests.
//!
//! This crate provides a lightweight HTTP server for the two requests a webhook
//! hub sends to a subscriber. It is deliberately ignorant of subscriptions: it
//! parses requests, hands them to a router and writes the router's answer back.
//!
//! # Overview
//!
//! - [`CallbackServer`]: HTTP(S) server bound to a local address, exposing
//!   `GET /{id}` (verification) and `POST /{id}` (notification).
//! - [`HookRouter`]: trait implemented by the consuming crate to decide what a
//!   verification or notification means for the subscription `id`.
//! - [`VerificationRequest`] / [`VerificationReply`] and
//!   [`NotificationPayload`] / [`NotificationReply`]: the request and reply
//!   values exchanged with the router.
//! - [`discovery`]: free-port and local-address helpers used to compute
//!   defaults for the public callback address.
//!
//! # Status codes
//!
//! | Reply | Status |
//! |---|---|
//! | `VerificationReply::Accepted` | `202`, body is the challenge |
//! | `VerificationReply::Removed` | `200`, empty |
//! | `VerificationReply::Gone` | `410`, empty |
//! | `NotificationReply::Accepted` | `202`, empty |
//! | `NotificationReply::Gone` | `410`, empty |
//!
//! # Private Workspace Crate
//!
//! This crate is intended for internal use within the workspace and is not published
//! to crates.io.

pub mod discovery;
mod error;
pub mod router;
mod server;

pub use discovery::{detect_local_ip, find_available_port};
pub use error::ServerError;
pub use router::{
    HookRouter, HubMode, NotificationPayload, NotificationReply, VerificationReply,
    VerificationRequest, SIGNATURE_HEADER,
};
pub use server::{CallbackServer, ServerConfig, TlsConfig, DEFAULT_MAX_BODY_BYTES};
