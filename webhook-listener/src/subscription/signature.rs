//! `X-Hub-Signature` validation.
//!
//! The hub signs every notification body with HMAC-SHA256 keyed by the
//! subscription secret and sends `sha256=<lowercase hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm tag accepted in the signature header
pub const ALGORITHM: &str = "sha256";

fn mac(secret: &str, body: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    mac
}

/// Compute the header value the hub would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    format!("{ALGORITHM}={}", hex::encode(mac(secret, body).finalize().into_bytes()))
}

/// Check a signature header against `body`.
///
/// The digest comparison is constant-time.
pub fn verify(secret: &str, body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let (algorithm, digest) = header.trim().split_once('=').ok_or(SignatureError::Malformed)?;

    if !algorithm.eq_ignore_ascii_case(ALGORITHM) {
        return Err(SignatureError::UnsupportedAlgorithm(algorithm.to_string()));
    }

    let expected = hex::decode(digest).map_err(|_| SignatureError::Malformed)?;
    mac(secret, body)
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}
