//! # Credential Envelope
//!
//! The signed wrapping of a document as produced by the credential helper.
//!
//! ## Properties
//!
//! - **Opaque proof**: the engine never inspects or produces signatures; the
//!   `document` is whatever JSON the credential helper sealed.
//! - **Content hash**: `hash` identifies the sealed content and becomes the
//!   `hash` of the persisted `DocumentRecord`.
//! - **Kinds**: a VC carries one claim, a VP encloses VCs, a DID envelope
//!   carries a DID document.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What an envelope wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeKind {
    /// Verifiable credential (content).
    Vc,
    /// Verifiable presentation (aggregate).
    Vp,
    /// Decentralized identity document.
    Did,
}

/// A signed credential document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Envelope id (`urn:uuid:...` for VC/VP, the DID itself for DID envelopes).
    pub id: String,
    /// Kind of envelope.
    pub kind: EnvelopeKind,
    /// Issuer DID.
    pub issuer: String,
    /// Sealed JSON document.
    pub document: Value,
    /// Content hash of `document`.
    pub hash: String,
}

impl Envelope {
    /// First credential subject of a VC envelope.
    pub fn subject(&self) -> Option<&Value> {
        first_subject(&self.document)
    }
}

/// First element of `credentialSubject`, which may be an object or an array.
pub fn first_subject(document: &Value) -> Option<&Value> {
    match document.get("credentialSubject")? {
        Value::Array(items) => items.first(),
        other @ Value::Object(_) => Some(other),
        _ => None,
    }
}

/// Resolve a dotted field path (`a.b.0.c`) inside a JSON value.
///
/// Numeric segments index into arrays.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(fields) => fields.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_from_array() {
        let envelope = Envelope {
            id: "urn:uuid:1".into(),
            kind: EnvelopeKind::Vc,
            issuer: "did:example:root".into(),
            document: json!({ "credentialSubject": [{ "amount": 5 }] }),
            hash: "h".into(),
        };
        assert_eq!(envelope.subject().unwrap()["amount"], 5);
    }

    #[test]
    fn test_subject_from_object() {
        let document = json!({ "credentialSubject": { "amount": 7 } });
        assert_eq!(first_subject(&document).unwrap()["amount"], 7);
    }

    #[test]
    fn test_lookup_path() {
        let subject = json!({ "site": { "meters": [{ "reading": 12.5 }] }, "owner": "x" });
        assert_eq!(lookup_path(&subject, "owner").unwrap(), "x");
        assert_eq!(lookup_path(&subject, "site.meters.0.reading").unwrap(), 12.5);
        assert!(lookup_path(&subject, "site.meters.1.reading").is_none());
        assert!(lookup_path(&subject, "owner.name").is_none());
    }

    #[test]
    fn test_missing_subject() {
        assert!(first_subject(&json!({ "type": "VerifiablePresentation" })).is_none());
    }
}
