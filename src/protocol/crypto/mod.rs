//! Cryptographic primitives for RAOP authentication and key unwrapping

mod error;
#[cfg(feature = "raop")]
mod rsa;
#[cfg(all(test, feature = "raop"))]
mod rsa_tests;

pub use self::error::CryptoError;
#[cfg(feature = "raop")]
pub use self::rsa::RaopRsaPrivateKey;
