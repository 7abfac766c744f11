use super::encryption::*;
use aes::Aes128;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};

fn cbc_encrypt(key: [u8; AES_KEY_SIZE], iv: [u8; AES_IV_SIZE], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes128::new(GenericArray::from_slice(&key));
    let mut out = plaintext.to_vec();
    let whole_blocks = out.len() / 16;
    let mut prev = iv;

    for block in out[..whole_blocks * 16].chunks_exact_mut(16) {
        for i in 0..16 {
            block[i] ^= prev[i];
        }
        let mut buf = GenericArray::clone_from_slice(block);
        cipher.encrypt_block(&mut buf);
        block.copy_from_slice(&buf);
        prev.copy_from_slice(block);
    }

    out
}

#[test]
fn decrypt_roundtrips_whole_blocks() {
    let key = [0x42u8; AES_KEY_SIZE];
    let iv = [0x00u8; AES_IV_SIZE];

    let plaintext = vec![0xAAu8; 352 * 4];
    let ciphertext = cbc_encrypt(key, iv, &plaintext);
    assert_ne!(ciphertext, plaintext);

    let session = AesSession::new(key, iv);
    let mut decrypted = ciphertext.clone();
    session.decrypt(&mut decrypted);

    assert_eq!(decrypted, plaintext);
}

#[test]
fn decrypt_leaves_partial_trailing_block_untouched() {
    let key = [0x11u8; AES_KEY_SIZE];
    let iv = [0x22u8; AES_IV_SIZE];

    let mut payload = vec![0xAAu8; 16 * 3];
    payload.extend_from_slice(&[1, 2, 3]); // trailing partial block

    let tail = payload[48..].to_vec();
    let session = AesSession::new(key, iv);
    session.decrypt(&mut payload);

    assert_eq!(&payload[48..], tail.as_slice());
}

#[test]
fn decrypt_resets_iv_per_call() {
    let key = [0x33u8; AES_KEY_SIZE];
    let iv = [0x44u8; AES_IV_SIZE];

    let plaintext = vec![0x55u8; 32];
    let ciphertext = cbc_encrypt(key, iv, &plaintext);

    let session = AesSession::new(key, iv);

    let mut first = ciphertext.clone();
    session.decrypt(&mut first);
    let mut second = ciphertext.clone();
    session.decrypt(&mut second);

    assert_eq!(first, plaintext);
    assert_eq!(first, second);
}

#[test]
fn encryption_mode_parsing() {
    assert_eq!(EncryptionMode::from_txt(0), Some(EncryptionMode::None));
    assert_eq!(EncryptionMode::from_txt(1), Some(EncryptionMode::Rsa));
    assert_eq!(EncryptionMode::from_txt(3), Some(EncryptionMode::FairPlay));
    assert_eq!(EncryptionMode::from_txt(99), None);

    assert!(EncryptionMode::None.is_supported());
    assert!(EncryptionMode::Rsa.is_supported());
    assert!(!EncryptionMode::FairPlay.is_supported());
}
