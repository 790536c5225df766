//! Symmetric cipher stages: guard (encrypt) and reveal (decrypt)

use crate::stage::{Stage, Unit};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use rand_core::{OsRng, RngCore};
use serde_json::Value;
use sluice_core::{Record, Result, SluiceError};

const NONCE_LEN: usize = 12;

/// Symmetric field cipher.
///
/// The key is derived from a passphrase and salt with Argon2id. Each
/// encryption generates a fresh random nonce and transmits it with the
/// ciphertext as `hex(nonce || ciphertext)`, so both directions need only
/// the shared derived key and no nonce is ever reused across records.
pub struct Cipher {
    key: [u8; 32],
}

impl Cipher {
    /// Derive a cipher from a passphrase and salt.
    pub fn derive(passphrase: &[u8], salt: &[u8]) -> Result<Self> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase, salt, &mut key)
            .map_err(|err| SluiceError::Crypto(format!("key derivation failed: {}", err)))?;
        Ok(Self { key })
    }

    /// Encrypt a string field value.
    pub fn cipher(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| SluiceError::Crypto("encryption failed".to_string()))?;

        let mut wire = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        wire.extend_from_slice(&nonce_bytes);
        wire.extend_from_slice(&ciphertext);
        Ok(hex::encode(wire))
    }

    /// Decrypt a string field value produced by [`cipher`](Self::cipher).
    ///
    /// Tampered or truncated input fails authentication and is fatal.
    pub fn decipher(&self, wire: &str) -> Result<String> {
        let raw = hex::decode(wire)
            .map_err(|_| SluiceError::Crypto("ciphertext is not valid hex".to_string()))?;
        if raw.len() < NONCE_LEN {
            return Err(SluiceError::Crypto("ciphertext too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| SluiceError::Crypto("ciphertext rejected".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| SluiceError::Crypto("plaintext is not valid UTF-8".to_string()))
    }
}

/// Encrypts a configured set of string fields and wraps the record in a
/// provenance envelope: `{ "meta": { "source": <label> }, "payload": ... }`.
pub struct GuardStage {
    cipher: Cipher,
    fields: Vec<String>,
    source: String,
}

impl GuardStage {
    /// Create a guard stage ciphering the named fields.
    ///
    /// `source` labels the upstream producer in the envelope metadata for
    /// downstream auditability.
    pub fn new(cipher: Cipher, fields: Vec<String>, source: impl Into<String>) -> Self {
        Self {
            cipher,
            fields,
            source: source.into(),
        }
    }
}

impl Stage for GuardStage {
    fn process(&mut self, unit: Unit) -> Result<Vec<Unit>> {
        let mut payload = unit.into_record()?;

        for field in &self.fields {
            let plain = payload
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| {
                    SluiceError::Crypto(format!("field '{}' is not a string", field))
                })?;
            payload.insert(field.clone(), Value::String(self.cipher.cipher(&plain)?));
        }

        let mut meta = Record::new();
        meta.insert("source".to_string(), Value::String(self.source.clone()));

        let mut envelope = Record::new();
        envelope.insert("meta".to_string(), Value::Object(meta));
        envelope.insert("payload".to_string(), Value::Object(payload));
        Ok(vec![Unit::Record(envelope)])
    }
}

/// Accepts guarded envelopes, deciphers the configured fields, and emits
/// the bare payload record.
pub struct RevealStage {
    cipher: Cipher,
    fields: Vec<String>,
}

impl RevealStage {
    /// Create a reveal stage deciphering the named fields.
    pub fn new(cipher: Cipher, fields: Vec<String>) -> Self {
        Self { cipher, fields }
    }
}

impl Stage for RevealStage {
    fn process(&mut self, unit: Unit) -> Result<Vec<Unit>> {
        let envelope = unit.into_record()?;
        let mut payload = envelope
            .get("payload")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| {
                SluiceError::Validation("Envelope is missing a payload object".to_string())
            })?;

        for field in &self.fields {
            let wire = payload
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| {
                    SluiceError::Crypto(format!("field '{}' is not a string", field))
                })?;
            payload.insert(field.clone(), Value::String(self.cipher.decipher(&wire)?));
        }

        Ok(vec![Unit::Record(payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cipher() -> Cipher {
        Cipher::derive(b"random_pass", b"random_salt").unwrap()
    }

    fn customer() -> Record {
        json!({
            "name": "Pitter Black",
            "email": "pblack@email.com",
            "password": "pblack_123"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn guarded_fields() -> Vec<String> {
        vec!["email".to_string(), "password".to_string()]
    }

    #[test]
    fn test_cipher_round_trip() {
        let cipher = cipher();
        for text in ["", "a", "pblack@email.com", "späßchen \u{1F600}"] {
            let wire = cipher.cipher(text).unwrap();
            assert_ne!(wire, text);
            assert_eq!(cipher.decipher(&wire).unwrap(), text);
        }
    }

    #[test]
    fn test_nonce_is_fresh_per_message() {
        let cipher = cipher();
        let first = cipher.cipher("same input").unwrap();
        let second = cipher.cipher("same input").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let cipher = cipher();
        let mut wire = cipher.cipher("secret").unwrap().into_bytes();
        let last = wire.len() - 1;
        wire[last] = if wire[last] == b'0' { b'1' } else { b'0' };
        let wire = String::from_utf8(wire).unwrap();
        assert!(matches!(
            cipher.decipher(&wire).unwrap_err(),
            SluiceError::Crypto(_)
        ));
    }

    #[test]
    fn test_guard_wraps_and_ciphers_designated_fields() {
        let mut guard = GuardStage::new(cipher(), guarded_fields(), "UI");
        let out = guard.process(Unit::Record(customer())).unwrap();
        assert_eq!(out.len(), 1);

        let envelope = out[0].clone().into_record().unwrap();
        assert_eq!(envelope["meta"]["source"], json!("UI"));
        let payload = envelope["payload"].as_object().unwrap();
        assert_eq!(payload["name"], json!("Pitter Black"));
        assert_ne!(payload["email"], json!("pblack@email.com"));
        assert_ne!(payload["password"], json!("pblack_123"));
    }

    #[test]
    fn test_guard_then_reveal_restores_the_record() {
        let mut guard = GuardStage::new(cipher(), guarded_fields(), "UI");
        let mut reveal = RevealStage::new(cipher(), guarded_fields());

        let guarded = guard.process(Unit::Record(customer())).unwrap();
        let revealed = reveal.process(guarded[0].clone()).unwrap();
        assert_eq!(revealed, vec![Unit::Record(customer())]);
    }

    #[test]
    fn test_guard_requires_string_fields() {
        let mut guard = GuardStage::new(cipher(), guarded_fields(), "UI");
        let mut rec = customer();
        rec.insert("email".to_string(), json!(42));
        assert!(matches!(
            guard.process(Unit::Record(rec)).unwrap_err(),
            SluiceError::Crypto(_)
        ));
    }

    #[test]
    fn test_reveal_requires_envelope_shape() {
        let mut reveal = RevealStage::new(cipher(), guarded_fields());
        assert!(matches!(
            reveal.process(Unit::Record(customer())).unwrap_err(),
            SluiceError::Validation(_)
        ));
    }
}
