//! RSA signing for RAOP Apple-Challenge/Apple-Response authentication

use super::CryptoError;

/// RSA private key used by a receiver to sign the Apple-Response header.
///
/// RAOP senders probe receivers with an `Apple-Challenge` header on OPTIONS;
/// a receiver configured with a signing key answers with a PKCS#1 v1.5
/// signature over the challenge plus the receiver's IP and MAC address.
#[derive(Clone)]
pub struct RaopRsaPrivateKey {
    inner: rsa::RsaPrivateKey,
}

impl RaopRsaPrivateKey {
    /// Load a PKCS#8 PEM-encoded private key.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyEncoding` if the PEM is malformed.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        use rsa::pkcs8::DecodePrivateKey;

        let inner = rsa::RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Load a PKCS#8 DER-encoded private key.
    ///
    /// # Errors
    /// Returns `CryptoError::InvalidKeyEncoding` if the DER is malformed.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        use rsa::pkcs8::DecodePrivateKey;

        let inner = rsa::RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidKeyEncoding(e.to_string()))?;

        Ok(Self { inner })
    }

    /// Sign a message with PKCS#1 v1.5 / SHA-1, as RAOP's Apple-Response expects.
    ///
    /// # Errors
    /// Returns `CryptoError::SigningFailed` on a signing failure.
    pub fn sign_pkcs1(&self, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        use rsa::pkcs1v15::SigningKey;
        use rsa::signature::{SignatureEncoding, Signer};
        use sha1::Sha1;

        let signing_key = SigningKey::<Sha1>::new(self.inner.clone());
        let signature = signing_key.sign(message);

        Ok(signature.to_vec())
    }
}
