//! Signature stages: sign and verify

use crate::stage::{Stage, Unit};
use p256::ecdsa::signature::{Signer as _, Verifier as _};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde_json::Value;
use sluice_core::{canonical_json, Record, Result, SluiceError};

/// Generate a fresh P-256 signing key.
pub fn generate_signing_key() -> SigningKey {
    SigningKey::random(&mut OsRng)
}

/// ECDSA P-256 signer over the canonical serialization of a payload.
///
/// The canonical serialization is the sorted-key, whitespace-free JSON text
/// of the record, so signer and verifier agree on the exact bytes signed.
pub struct Signer;

impl Signer {
    /// Sign a payload with a private key, returning the hex signature.
    pub fn sign(payload: &Record, key: &SigningKey) -> Result<String> {
        let data = canonical_json(payload)?;
        let signature: Signature = key.sign(data.as_bytes());
        Ok(hex::encode(signature.to_bytes()))
    }

    /// Check a hex signature against a public key.
    ///
    /// Any mismatch, including malformed signature encoding, is
    /// [`SluiceError::SignatureInvalid`] and aborts the pipeline.
    pub fn verify(payload: &Record, signature_hex: &str, key: &VerifyingKey) -> Result<()> {
        let data = canonical_json(payload)?;
        let raw = hex::decode(signature_hex).map_err(|_| SluiceError::SignatureInvalid)?;
        let signature =
            Signature::from_slice(&raw).map_err(|_| SluiceError::SignatureInvalid)?;
        key.verify(data.as_bytes(), &signature)
            .map_err(|_| SluiceError::SignatureInvalid)
    }
}

/// Signs each record and wraps it in a signed envelope:
/// `{ "meta": { "source": <label> }, "sign": <hex>, "payload": ... }`.
pub struct SignStage {
    key: SigningKey,
    source: String,
}

impl SignStage {
    /// Create a signing stage owning the private key.
    pub fn new(key: SigningKey, source: impl Into<String>) -> Self {
        Self {
            key,
            source: source.into(),
        }
    }
}

impl Stage for SignStage {
    fn process(&mut self, unit: Unit) -> Result<Vec<Unit>> {
        let payload = unit.into_record()?;
        let signature = Signer::sign(&payload, &self.key)?;

        let mut meta = Record::new();
        meta.insert("source".to_string(), Value::String(self.source.clone()));

        let mut envelope = Record::new();
        envelope.insert("meta".to_string(), Value::Object(meta));
        envelope.insert("sign".to_string(), Value::String(signature));
        envelope.insert("payload".to_string(), Value::Object(payload));
        Ok(vec![Unit::Record(envelope)])
    }
}

/// Checks the signature on each signed envelope and emits the payload.
///
/// Verification failure is fatal to the pipeline, never a soft warning.
pub struct VerifyStage {
    key: VerifyingKey,
}

impl VerifyStage {
    /// Create a verification stage holding the public key.
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }
}

impl Stage for VerifyStage {
    fn process(&mut self, unit: Unit) -> Result<Vec<Unit>> {
        let envelope = unit.into_record()?;
        let payload = envelope
            .get("payload")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| {
                SluiceError::Validation("Envelope is missing a payload object".to_string())
            })?;
        let signature = envelope
            .get("sign")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SluiceError::Validation("Envelope is missing a signature".to_string())
            })?;

        Signer::verify(&payload, signature, &self.key)?;
        Ok(vec![Unit::Record(payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Record {
        json!({"name": "Oliver White", "email": "owhite@email.com"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let key = generate_signing_key();
        let signature = Signer::sign(&payload(), &key).unwrap();
        Signer::verify(&payload(), &signature, key.verifying_key()).unwrap();
    }

    #[test]
    fn test_mutated_payload_fails_verification() {
        let key = generate_signing_key();
        let signature = Signer::sign(&payload(), &key).unwrap();

        let mut tampered = payload();
        tampered.insert("email".to_string(), json!("evil@email.com"));
        assert!(matches!(
            Signer::verify(&tampered, &signature, key.verifying_key()).unwrap_err(),
            SluiceError::SignatureInvalid
        ));
    }

    #[test]
    fn test_garbage_signature_fails_verification() {
        let key = generate_signing_key();
        assert!(matches!(
            Signer::verify(&payload(), "not-hex", key.verifying_key()).unwrap_err(),
            SluiceError::SignatureInvalid
        ));
    }

    #[test]
    fn test_sign_stage_envelope_shape() {
        let key = generate_signing_key();
        let mut stage = SignStage::new(key.clone(), "UI");
        let out = stage.process(Unit::Record(payload())).unwrap();
        let envelope = out[0].clone().into_record().unwrap();

        assert_eq!(envelope["meta"]["source"], json!("UI"));
        assert!(envelope["sign"].is_string());
        assert_eq!(envelope["payload"].as_object().unwrap(), &payload());
    }

    #[test]
    fn test_sign_then_verify_stage_pipeline() {
        let key = generate_signing_key();
        let verifying = *key.verifying_key();
        let mut sign = SignStage::new(key, "UI");
        let mut verify = VerifyStage::new(verifying);

        let signed = sign.process(Unit::Record(payload())).unwrap();
        let verified = verify.process(signed[0].clone()).unwrap();
        assert_eq!(verified, vec![Unit::Record(payload())]);
    }

    #[test]
    fn test_tampered_envelope_payload_is_fatal() {
        let key = generate_signing_key();
        let verifying = *key.verifying_key();
        let mut sign = SignStage::new(key, "UI");
        let mut verify = VerifyStage::new(verifying);

        let signed = sign.process(Unit::Record(payload())).unwrap();
        let mut envelope = signed[0].clone().into_record().unwrap();
        let mut tampered = envelope["payload"].as_object().cloned().unwrap();
        tampered.insert("email".to_string(), json!("evil@email.com"));
        envelope.insert("payload".to_string(), Value::Object(tampered));

        assert!(matches!(
            verify.process(Unit::Record(envelope)).unwrap_err(),
            SluiceError::SignatureInvalid
        ));
    }
}
