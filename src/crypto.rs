//! Session-scoped encryption for values at rest.
//!
//! The key is derived per request from the secret half of the client's
//! token; nothing durable ever holds it. A sealed blob is `nonce || ct`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::Result;
use hkdf::Hkdf;
use rand::RngCore as _;
use sha2::Sha256;

pub const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// An AES-256 key scoped to one session. Deliberately not `Debug`.
#[derive(Clone)]
pub struct SessionKey([u8; KEY_LEN]);

impl SessionKey {
    /// Derive the session key from the client-held secret, salted with the
    /// session ID so equal secrets in different sessions diverge.
    #[must_use]
    pub fn derive(secret: &[u8], session_id: &str) -> Self {
        let hk = Hkdf::<Sha256>::new(Some(session_id.as_bytes()), secret);
        let mut key = [0u8; KEY_LEN];
        hk.expand(b"bridge-session-v1", &mut key)
            .expect("32 bytes is a valid hkdf output length");
        Self(key)
    }
}

/// Encrypt a value for storage.
pub fn seal(key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(&key.0).expect("aes key");

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| anyhow::anyhow!("aes-gcm encrypt: {e}"))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a stored blob. Returns `None` on any failure — truncated blob,
/// wrong key, tampered ciphertext — so callers cannot tell them apart.
#[must_use]
pub fn open(key: &SessionKey, blob: &[u8]) -> Option<Vec<u8>> {
    if blob.len() < NONCE_LEN {
        return None;
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(&key.0).expect("aes key");
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher.decrypt(nonce, ciphertext).ok()
}

/// Decrypt a stored blob into a string.
#[must_use]
pub fn open_string(key: &SessionKey, blob: &[u8]) -> Option<String> {
    String::from_utf8(open(key, blob)?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_round_trip() {
        let key = SessionKey::derive(b"secret", "session-1");
        let blob = seal(&key, b"an opaque cursor").unwrap();
        assert_eq!(open(&key, &blob).as_deref(), Some(&b"an opaque cursor"[..]));
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let key = SessionKey::derive(b"secret", "session-1");
        let other = SessionKey::derive(b"other", "session-1");
        let blob = seal(&key, b"an opaque cursor").unwrap();
        assert_eq!(open(&other, &blob), None);
    }

    #[test]
    fn test_session_id_salts_the_key() {
        let a = SessionKey::derive(b"secret", "session-1");
        let b = SessionKey::derive(b"secret", "session-2");
        let blob = seal(&a, b"x").unwrap();
        assert_eq!(open(&b, &blob), None);
    }

    #[test]
    fn test_garbage_blob() {
        let key = SessionKey::derive(b"secret", "session-1");
        assert_eq!(open(&key, b""), None);
        assert_eq!(open(&key, b"short"), None);
        assert_eq!(open(&key, &[0u8; 64]), None);
    }

    #[test]
    fn test_nonces_are_fresh() {
        let key = SessionKey::derive(b"secret", "session-1");
        let a = seal(&key, b"x").unwrap();
        let b = seal(&key, b"x").unwrap();
        assert_ne!(a, b);
    }
}
