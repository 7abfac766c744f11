//! RAOP (`AirPlay` 1) protocol support: Apple-Challenge auth and the
//! AES-128-CBC session cipher used for audio packets.

mod auth;
mod encryption;

#[cfg(test)]
mod encryption_tests;

pub use auth::{CHALLENGE_SIZE, build_response_message, decode_challenge};
#[cfg(feature = "raop")]
pub use auth::generate_response;

pub use encryption::{AES_IV_SIZE, AES_KEY_SIZE, AesSession};
