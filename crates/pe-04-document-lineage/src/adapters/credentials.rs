//! Digest-sealed credentials.
//!
//! Produces W3C-shaped credentials and presentations whose proof is a
//! SHA-256 digest of the document body. Good enough to detect tampering in
//! tests and local runs; it is not a signature scheme.

use crate::ports::{CredentialHelper, DidMaterial, SubjectVerification};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use shared_types::{CollaboratorError, Envelope, EnvelopeKind};
use uuid::Uuid;

pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";
pub const PROOF_TYPE: &str = "Sha256DigestSeal";

fn digest(value: &Value) -> String {
    hex::encode(Sha256::digest(value.to_string().as_bytes()))
}

fn fingerprint(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))[..16].to_string()
}

fn seal(mut body: Map<String, Value>, issuer: &str, key: &str) -> Value {
    let digest_value = digest(&Value::Object(body.clone()));
    body.insert(
        "proof".to_string(),
        json!({
            "type": PROOF_TYPE,
            "created": Utc::now().to_rfc3339(),
            "verificationMethod": format!("{issuer}#key-1"),
            "keyFingerprint": fingerprint(key),
            "digestValue": digest_value,
        }),
    );
    Value::Object(body)
}

fn envelope(kind: EnvelopeKind, id: String, issuer: &str, document: Value) -> Envelope {
    Envelope {
        hash: digest(&document),
        id,
        kind,
        issuer: issuer.to_string(),
        document,
    }
}

fn require_key(issuer_key: &str) -> Result<(), CollaboratorError> {
    if issuer_key.is_empty() {
        return Err(CollaboratorError::Credential("empty issuer key".to_string()));
    }
    Ok(())
}

fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DigestCredentialHelper;

#[async_trait]
impl CredentialHelper for DigestCredentialHelper {
    async fn create_vc(
        &self,
        issuer: &str,
        issuer_key: &str,
        subject: Value,
    ) -> Result<Envelope, CollaboratorError> {
        require_key(issuer_key)?;
        let id = format!("urn:uuid:{}", Uuid::new_v4());
        let body = json!({
            "@context": [CREDENTIALS_CONTEXT],
            "id": id,
            "type": ["VerifiableCredential"],
            "issuer": issuer,
            "issuanceDate": Utc::now().to_rfc3339(),
            "credentialSubject": [subject],
        });
        let document = seal(as_object(body), issuer, issuer_key);
        Ok(envelope(EnvelopeKind::Vc, id, issuer, document))
    }

    async fn create_vp(
        &self,
        issuer: &str,
        issuer_key: &str,
        envelopes: &[Envelope],
        id: &str,
    ) -> Result<Envelope, CollaboratorError> {
        require_key(issuer_key)?;
        if envelopes.is_empty() {
            return Err(CollaboratorError::Credential(
                "a presentation needs at least one credential".to_string(),
            ));
        }
        let id = format!("urn:uuid:{id}");
        let credentials: Vec<Value> = envelopes.iter().map(|e| e.document.clone()).collect();
        let body = json!({
            "@context": [CREDENTIALS_CONTEXT],
            "id": id,
            "type": ["VerifiablePresentation"],
            "holder": issuer,
            "verifiableCredential": credentials,
        });
        let document = seal(as_object(body), issuer, issuer_key);
        Ok(envelope(EnvelopeKind::Vp, id, issuer, document))
    }

    async fn verify_subject(&self, subject: &Value) -> SubjectVerification {
        let Some(fields) = subject.as_object() else {
            return SubjectVerification::invalid("subject must be an object");
        };
        match fields.get("type") {
            Some(Value::String(t)) if !t.is_empty() => {}
            _ => return SubjectVerification::invalid("subject has no type"),
        }
        match fields.get("id") {
            None | Some(Value::Null) => {}
            Some(Value::String(id)) if !id.is_empty() => {}
            Some(_) => return SubjectVerification::invalid("subject id must be a non-empty string"),
        }
        SubjectVerification::valid()
    }

    async fn verify_document(&self, document: &Value) -> bool {
        let Some(fields) = document.as_object() else {
            return false;
        };
        let Some(expected) = fields
            .get("proof")
            .and_then(|proof| proof.get("digestValue"))
            .and_then(Value::as_str)
        else {
            return false;
        };
        let mut body = fields.clone();
        body.remove("proof");
        digest(&Value::Object(body)) == expected
    }

    async fn generate_did(&self) -> Result<DidMaterial, CollaboratorError> {
        let private_key = hex::encode(Sha256::digest(
            format!("{}{}", Uuid::new_v4(), Uuid::new_v4()).as_bytes(),
        ));
        let public_key = hex::encode(Sha256::digest(private_key.as_bytes()));
        let did = format!("did:key:z{}", &public_key[..32]);
        let document = json!({
            "@context": DID_CONTEXT,
            "id": did,
            "verificationMethod": [{
                "id": format!("{did}#key-1"),
                "type": "Sha256DigestKey",
                "controller": did,
                "publicKeyHex": public_key,
            }],
        });
        Ok(DidMaterial {
            envelope: envelope(EnvelopeKind::Did, did.clone(), &did, document),
            did,
            private_key,
        })
    }
}
