//! AES-128-CBC session cipher for RAOP audio payloads
//!
//! The key and IV are taken verbatim from the ANNOUNCE SDP (`rsaaeskey`,
//! RSA-unwrapped, and `aesiv`). Unlike ordinary CBC, the IV is reset to the
//! SDP value for *every* packet rather than chained from the previous
//! packet's last ciphertext block, matching each sender's own per-packet
//! encrypt call with a freshly copied IV. Only whole 16-byte blocks are
//! decrypted; a trailing partial block is passed through as cleartext.

use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, KeyInit};

/// AES key size (128 bits)
pub const AES_KEY_SIZE: usize = 16;
/// AES IV size (128 bits)
pub const AES_IV_SIZE: usize = 16;

/// Per-session AES-128-CBC decryptor for RAOP audio packets.
pub struct AesSession {
    cipher: Aes128,
    iv: [u8; AES_IV_SIZE],
}

impl AesSession {
    /// Create a session cipher from the SDP-delivered key and IV.
    #[must_use]
    pub fn new(key: [u8; AES_KEY_SIZE], iv: [u8; AES_IV_SIZE]) -> Self {
        let cipher = Aes128::new(GenericArray::from_slice(&key));
        Self { cipher, iv }
    }

    /// Decrypt an audio packet payload in place.
    ///
    /// The IV is reset to the session IV for every call. Whole 16-byte
    /// blocks are decrypted with CBC chaining within the packet; a trailing
    /// partial block (fewer than 16 bytes) is left untouched.
    pub fn decrypt(&self, payload: &mut [u8]) {
        let whole_blocks = payload.len() / 16;
        let mut prev_ciphertext = self.iv;

        for block in payload[..whole_blocks * 16].chunks_exact_mut(16) {
            let ciphertext: [u8; 16] = block.try_into().expect("chunk is 16 bytes");

            let mut buf = GenericArray::clone_from_slice(block);
            self.cipher.decrypt_block(&mut buf);

            for i in 0..16 {
                block[i] = buf[i] ^ prev_ciphertext[i];
            }

            prev_ciphertext = ciphertext;
        }
    }
}

/// Encryption mode advertised in a RAOP TXT record's `et=` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMode {
    /// No encryption (et=0)
    None,
    /// RSA-wrapped AES-128-CBC (et=1)
    Rsa,
    /// `FairPlay` encryption (et=3, not supported)
    FairPlay,
    /// MFi-SAP encryption (et=4, not supported)
    MfiSap,
    /// `FairPlay` SAPv2.5 (et=5, not supported)
    FairPlaySap25,
}

impl EncryptionMode {
    /// Parse from TXT record value
    #[must_use]
    pub fn from_txt(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Rsa),
            3 => Some(Self::FairPlay),
            4 => Some(Self::MfiSap),
            5 => Some(Self::FairPlaySap25),
            _ => None,
        }
    }

    /// Check if this mode is supported
    #[must_use]
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::None | Self::Rsa)
    }
}
