//! At-rest encryption for the settings file.
//!
//! The settings document is stored as `{iv, authTag, content}` where
//! `content` is the AES-256-GCM ciphertext of the plaintext settings JSON
//! and all three fields are base64. The key is derived from machine-specific
//! identifiers, which keeps credentials away from casual disk inspection but
//! is no defense against an attacker with code execution on the same box.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Domain separator mixed into the key derivation.
const KEY_CONTEXT: &str = "chat-sentry.settings.v1";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretEnvelope {
    pub iv: String,
    pub auth_tag: String,
    pub content: String,
}

/// SHA-256 over a service constant plus whatever stable machine
/// identifiers this host offers.
pub fn derive_machine_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KEY_CONTEXT.as_bytes());
    for id in machine_identifiers() {
        hasher.update(id.as_bytes());
    }
    hasher.finalize().into()
}

fn machine_identifiers() -> Vec<String> {
    let mut ids = Vec::new();
    for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
        if let Ok(raw) = std::fs::read_to_string(path) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                ids.push(trimmed.to_string());
            }
        }
    }
    for var in ["HOSTNAME", "COMPUTERNAME"] {
        if let Ok(v) = std::env::var(var) {
            if !v.is_empty() {
                ids.push(v);
            }
        }
    }
    if ids.is_empty() {
        // Last resort: a fixed salt. Still opaque on disk, just portable.
        ids.push("chat-sentry-fallback-id".to_string());
    }
    ids
}

pub fn seal(plaintext: &str, key: &[u8; 32]) -> Result<SecretEnvelope> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| anyhow!("key must be 32 bytes"))?;

    let mut iv = [0u8; IV_LEN];
    use rand::Rng;
    rand::thread_rng().fill(&mut iv);
    let nonce = Nonce::from_slice(&iv);

    // aes-gcm appends the 16-byte tag to the ciphertext; the envelope
    // carries it as a separate field.
    let mut sealed = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| anyhow!("encryption failed: {e}"))?;
    if sealed.len() < TAG_LEN {
        return Err(anyhow!("ciphertext shorter than auth tag"));
    }
    let tag = sealed.split_off(sealed.len() - TAG_LEN);

    Ok(SecretEnvelope {
        iv: B64.encode(iv),
        auth_tag: B64.encode(tag),
        content: B64.encode(sealed),
    })
}

pub fn open(envelope: &SecretEnvelope, key: &[u8; 32]) -> Result<String> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| anyhow!("key must be 32 bytes"))?;

    let iv = B64.decode(&envelope.iv).context("bad iv encoding")?;
    if iv.len() != IV_LEN {
        return Err(anyhow!("iv must be {IV_LEN} bytes"));
    }
    let tag = B64.decode(&envelope.auth_tag).context("bad authTag encoding")?;
    let mut sealed = B64.decode(&envelope.content).context("bad content encoding")?;
    sealed.extend_from_slice(&tag);

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&iv), sealed.as_slice())
        .map_err(|_| anyhow!("decryption failed: wrong key or corrupted envelope"))?;
    String::from_utf8(plaintext).context("decrypted settings are not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_roundtrip() {
        let key = derive_machine_key();
        let envelope = seal(r#"{"hello":"world"}"#, &key).expect("seal");
        let plain = open(&envelope, &key).expect("open");
        assert_eq!(plain, r#"{"hello":"world"}"#);
    }

    #[test]
    fn tampered_tag_fails() {
        let key = derive_machine_key();
        let mut envelope = seal("secret", &key).expect("seal");
        envelope.auth_tag = B64.encode([0u8; 16]);
        assert!(open(&envelope, &key).is_err());
    }

    #[test]
    fn key_derivation_is_stable() {
        assert_eq!(derive_machine_key(), derive_machine_key());
    }
}
