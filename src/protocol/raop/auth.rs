//! Apple-Challenge / Apple-Response header support
//!
//! RAOP senders probe a receiver's authenticity by sending a random
//! `Apple-Challenge` header on OPTIONS. A receiver configured with an RSA
//! signing key answers with an `Apple-Response` header: a PKCS#1 v1.5
//! signature over the challenge concatenated with the receiver's IP and MAC
//! address, padded to 32 bytes.

use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD as BASE64};

use super::super::crypto::CryptoError;
#[cfg(feature = "raop")]
use super::super::crypto::RaopRsaPrivateKey;

/// Challenge size in bytes (128 bits)
pub const CHALLENGE_SIZE: usize = 16;

/// Decode the `Apple-Challenge` header value.
///
/// # Errors
/// Returns `CryptoError::DecryptionFailed` if the header is not valid base64.
pub fn decode_challenge(header: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(header.trim())
        .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {e}")))
}

/// Build the message to sign for `Apple-Response`:
/// `challenge || ip_address || mac_address`, zero-padded to 32 bytes.
#[must_use]
pub fn build_response_message(
    challenge: &[u8],
    ip_address: &std::net::IpAddr,
    mac_address: &[u8; 6],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(32);

    message.extend_from_slice(challenge);

    match ip_address {
        std::net::IpAddr::V4(addr) => message.extend_from_slice(&addr.octets()),
        std::net::IpAddr::V6(addr) => message.extend_from_slice(&addr.octets()),
    }

    message.extend_from_slice(mac_address);

    while message.len() < 32 {
        message.push(0);
    }

    message
}

/// Generate the `Apple-Response` header value for a given challenge.
///
/// # Errors
/// Returns `CryptoError` if signing fails.
#[cfg(feature = "raop")]
pub fn generate_response(
    private_key: &RaopRsaPrivateKey,
    challenge: &[u8],
    ip_address: &std::net::IpAddr,
    mac_address: &[u8; 6],
) -> Result<String, CryptoError> {
    let message = build_response_message(challenge, ip_address, mac_address);
    let signature = private_key.sign_pkcs1(&message)?;
    Ok(BASE64.encode(&signature))
}
