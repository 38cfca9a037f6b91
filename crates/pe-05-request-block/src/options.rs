//! Typed options and payload of the request block.

use pe_03_validation::{OptionRule, ReferenceKind, RuleSet};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the credential subject gets its `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdType {
    /// A fresh random id per request.
    Uuid,
    /// A new DID, put on the ledger, key kept in the actor's wallet.
    Did,
    /// The actor's own DID.
    Owner,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBlockOptions {
    /// Schema IRI the subject is built against.
    pub schema: String,
    #[serde(default)]
    pub id_type: IdType,
    /// Document type recorded on the produced record. Defaults to the
    /// schema's name.
    #[serde(default)]
    pub entity_type: Option<String>,
}

/// What an actor submits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPayload {
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Id or message id of an earlier document this one relates to.
    #[serde(default)]
    pub reference: Option<String>,
}

impl RequestPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            reference: None,
        }
    }

    #[must_use]
    pub fn referencing(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

pub fn rules() -> RuleSet {
    RuleSet::typed::<RequestBlockOptions>()
        .rule(OptionRule::Required("schema"))
        .rule(OptionRule::NonEmptyString("schema"))
        .rule(OptionRule::ResolvesTo("schema", ReferenceKind::Schema))
        .rule(OptionRule::OneOf("idType", &["UUID", "DID", "OWNER", "NONE"]))
        .rule(OptionRule::NonEmptyString("entityType"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_type_defaults_to_none() {
        let options: RequestBlockOptions =
            serde_json::from_value(json!({ "schema": "#report" })).unwrap();
        assert_eq!(options.id_type, IdType::None);

        let options: RequestBlockOptions =
            serde_json::from_value(json!({ "schema": "#report", "idType": "DID" })).unwrap();
        assert_eq!(options.id_type, IdType::Did);
    }

    #[test]
    fn test_payload_from_json() {
        let payload: RequestPayload = serde_json::from_value(json!({
            "fields": { "amount": 3 },
            "reference": "urn:uuid:prior"
        }))
        .unwrap();
        assert_eq!(payload.fields["amount"], 3);
        assert_eq!(payload.reference.as_deref(), Some("urn:uuid:prior"));
    }
}
