//! Credential encryption at rest — AES-256-GCM, spec §6.
//!
//! Ciphertext is serialised as `iv:authTag:ciphertext`, all base64, with a
//! random 16-byte IV and a 16-byte auth tag per invocation.

use aes_gcm::aead::generic_array::typenum::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{aes::Aes256, AesGcm};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::DbError;

type Cipher = AesGcm<Aes256, U16>;

const IV_LEN: usize = 16;
const TAG_LEN: usize = 16;

/// Derive a 32-byte AES-256 key from the `ENCRYPTION_KEY` environment
/// variable: accepted as 64-char hex, 44-char base64, 32 raw bytes, or
/// else SHA-256-hashed down to 32 bytes.
pub fn derive_key(raw: &str) -> [u8; 32] {
    if raw.len() == 64 {
        if let Ok(bytes) = hex::decode(raw) {
            if let Ok(key) = bytes.try_into() {
                return key;
            }
        }
    }
    if raw.len() == 44 {
        if let Ok(bytes) = STANDARD.decode(raw) {
            if let Ok(key) = bytes.try_into() {
                return key;
            }
        }
    }
    if raw.len() == 32 {
        if let Ok(key) = raw.as_bytes().try_into() {
            return key;
        }
    }
    Sha256::digest(raw.as_bytes()).into()
}

/// Encrypt `plaintext`, returning the `iv:authTag:ciphertext` blob.
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> String {
    let cipher = Cipher::new_from_slice(key).expect("32-byte AES-256 key");

    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let nonce = GenericArray::from_slice(&iv);

    let combined = cipher.encrypt(nonce, plaintext).expect("AES-GCM encryption cannot fail");
    let (ciphertext, tag) = combined.split_at(combined.len() - TAG_LEN);

    format!(
        "{}:{}:{}",
        STANDARD.encode(iv),
        STANDARD.encode(tag),
        STANDARD.encode(ciphertext),
    )
}

/// Decrypt an `iv:authTag:ciphertext` blob. Tampering any one of the three
/// segments causes this to fail.
pub fn decrypt(blob: &str, key: &[u8; 32]) -> Result<Vec<u8>, DbError> {
    let segments: Vec<&str> = blob.split(':').collect();
    let [iv_b64, tag_b64, ct_b64] = match segments.as_slice() {
        [a, b, c] => [*a, *b, *c],
        _ => return Err(DbError::Crypto),
    };

    let iv = STANDARD.decode(iv_b64).map_err(|_| DbError::Crypto)?;
    let tag = STANDARD.decode(tag_b64).map_err(|_| DbError::Crypto)?;
    let ciphertext = STANDARD.decode(ct_b64).map_err(|_| DbError::Crypto)?;

    if iv.len() != IV_LEN || tag.len() != TAG_LEN {
        return Err(DbError::Crypto);
    }

    let cipher = Cipher::new_from_slice(key).map_err(|_| DbError::Crypto)?;
    let nonce = GenericArray::from_slice(&iv);

    let mut combined = ciphertext;
    combined.extend_from_slice(&tag);

    cipher
        .decrypt(nonce, combined.as_slice())
        .map_err(|_| DbError::Crypto)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_including_empty_plaintext() {
        let key = derive_key("a-passphrase-of-any-length");
        for plaintext in [&b""[..], b"hello", b"binary\x00\x01\x02"] {
            let blob = encrypt(plaintext, &key);
            let decrypted = decrypt(&blob, &key).unwrap();
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn tampering_any_segment_breaks_decryption() {
        let key = derive_key("another-passphrase");
        let blob = encrypt(b"secret value", &key);
        let parts: Vec<&str> = blob.split(':').collect();

        // flip a byte in the IV
        let mut bad_iv = STANDARD.decode(parts[0]).unwrap();
        bad_iv[0] ^= 0xFF;
        let tampered = format!("{}:{}:{}", STANDARD.encode(bad_iv), parts[1], parts[2]);
        assert!(decrypt(&tampered, &key).is_err());

        // flip a byte in the tag
        let mut bad_tag = STANDARD.decode(parts[1]).unwrap();
        bad_tag[0] ^= 0xFF;
        let tampered = format!("{}:{}:{}", parts[0], STANDARD.encode(bad_tag), parts[2]);
        assert!(decrypt(&tampered, &key).is_err());

        // flip a byte in the ciphertext
        let mut bad_ct = STANDARD.decode(parts[2]).unwrap();
        bad_ct[0] ^= 0xFF;
        let tampered = format!("{}:{}:{}", parts[0], parts[1], STANDARD.encode(bad_ct));
        assert!(decrypt(&tampered, &key).is_err());
    }

    #[test]
    fn key_derivation_accepts_all_four_shapes() {
        let raw32 = "0".repeat(32);
        assert_eq!(derive_key(&raw32).len(), 32);

        let hex64 = "0".repeat(64);
        assert_eq!(derive_key(&hex64).len(), 32);

        let b64_32_bytes = STANDARD.encode([0u8; 32]);
        assert_eq!(b64_32_bytes.len(), 44);
        assert_eq!(derive_key(&b64_32_bytes).len(), 32);

        assert_eq!(derive_key("short").len(), 32);
    }
}
