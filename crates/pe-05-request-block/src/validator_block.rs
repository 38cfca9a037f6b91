//! # Document Validator Block
//!
//! Child of a request block. Checks the document its parent produced before
//! anything is emitted: an optional expected document type and a list of
//! conditions over credential subject fields.
//!
//! ```json
//! {
//!   "documentType": "report",
//!   "conditions": [
//!     { "field": "unit", "type": "equal", "value": "kWh" },
//!     { "field": "site.country", "type": "in", "value": ["NO", "SE"] }
//!   ]
//! }
//! ```

use pe_01_block_tree::BlockInstance;
use pe_03_validation::{OptionRule, RuleSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{
    lookup_path, ActionErrorKind, BlockActionError, BlockDescriptor, BlockRef, ControlKind,
    DocumentRecord,
};

pub const DOCUMENT_VALIDATOR_BLOCK: &str = "documentValidatorBlock";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionKind {
    Equal,
    NotEqual,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path into the credential subject.
    pub field: String,
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    /// A scalar for `equal`/`notEqual`, an array for `in`/`notIn`.
    pub value: Value,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Equal as JSON, or equal as text for scalars (`5` matches `"5"`).
fn loosely_equal(a: &Value, b: &Value) -> bool {
    a == b || matches!((scalar_text(a), scalar_text(b)), (Some(x), Some(y)) if x == y)
}

impl Condition {
    /// `None` if the subject satisfies the condition, else the reason.
    pub fn check(&self, subject: &Value) -> Option<String> {
        let actual = lookup_path(subject, &self.field);
        let listed = |actual: &Value| {
            self.value
                .as_array()
                .is_some_and(|values| values.iter().any(|v| loosely_equal(actual, v)))
        };
        let satisfied = match (self.kind, actual) {
            (ConditionKind::Equal, Some(actual)) => loosely_equal(actual, &self.value),
            (ConditionKind::NotEqual, Some(actual)) => !loosely_equal(actual, &self.value),
            (ConditionKind::In, Some(actual)) => listed(actual),
            (ConditionKind::NotIn, Some(actual)) => !listed(actual),
            (ConditionKind::Equal | ConditionKind::In, None) => false,
            (ConditionKind::NotEqual | ConditionKind::NotIn, None) => true,
        };
        if satisfied {
            return None;
        }
        Some(match actual {
            None => format!("field \"{}\" is missing", self.field),
            Some(actual) => format!(
                "field \"{}\" = {actual} does not satisfy {:?} {}",
                self.field, self.kind, self.value
            ),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentValidatorOptions {
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

pub fn descriptor() -> BlockDescriptor {
    BlockDescriptor::new(DOCUMENT_VALIDATOR_BLOCK)
        .validator()
        .control(ControlKind::Server)
        .describe("Rejects documents of its parent that do not satisfy its conditions")
}

fn list_conditions_have_arrays(options: &Value) -> Option<String> {
    let conditions = options.get("conditions")?.as_array()?;
    conditions.iter().find_map(|condition| {
        let kind = condition.get("type").and_then(Value::as_str)?;
        let is_list = matches!(kind, "in" | "notIn");
        let has_array = condition.get("value").is_some_and(Value::is_array);
        (is_list && !has_array).then(|| {
            format!(
                "condition on \"{}\" needs an array value",
                condition.get("field").and_then(Value::as_str).unwrap_or("?")
            )
        })
    })
}

pub fn rules() -> RuleSet {
    RuleSet::typed::<DocumentValidatorOptions>()
        .rule(OptionRule::NonEmptyString("documentType"))
        .rule(OptionRule::Custom("conditions", list_conditions_have_arrays))
}

#[derive(Debug, Clone)]
pub struct DocumentValidatorBlock {
    block: BlockRef,
    options: DocumentValidatorOptions,
}

impl DocumentValidatorBlock {
    pub fn from_instance(instance: &BlockInstance) -> Result<Self, BlockActionError> {
        let block = instance.block_ref();
        let options = serde_json::from_value(instance.options.clone()).map_err(|e| {
            BlockActionError::new(&block, ActionErrorKind::Configuration, e.to_string())
        })?;
        Ok(Self { block, options })
    }

    pub fn block(&self) -> &BlockRef {
        &self.block
    }

    /// Every reason the document is rejected; empty if it passes.
    pub fn check(&self, record: &DocumentRecord) -> Vec<String> {
        let mut reasons = Vec::new();
        if let Some(expected) = &self.options.document_type {
            if &record.doc_type != expected {
                reasons.push(format!(
                    "document type \"{}\" is not \"{expected}\"",
                    record.doc_type
                ));
            }
        }

        let Some(subject) = record.subject() else {
            if !self.options.conditions.is_empty() {
                reasons.push("document has no credential subject".to_string());
            }
            return reasons;
        };
        reasons.extend(
            self.options
                .conditions
                .iter()
                .filter_map(|condition| condition.check(subject)),
        );
        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::{DocumentStatus, PolicyId};
    use std::collections::BTreeMap;

    fn record(doc_type: &str, subject: Value) -> DocumentRecord {
        DocumentRecord {
            id: "urn:uuid:1".into(),
            hash: "h".into(),
            document: json!({ "credentialSubject": [subject] }),
            owner: "did:example:alice".into(),
            doc_type: doc_type.into(),
            policy_id: PolicyId::new("p"),
            tag: "request".into(),
            schema: None,
            message_id: None,
            topic_id: None,
            relationships: Vec::new(),
            status: DocumentStatus::New,
            accounts: BTreeMap::new(),
        }
    }

    fn condition(field: &str, kind: ConditionKind, value: Value) -> Condition {
        Condition {
            field: field.into(),
            kind,
            value,
        }
    }

    fn validator(options: DocumentValidatorOptions) -> DocumentValidatorBlock {
        DocumentValidatorBlock {
            block: BlockRef {
                id: "v".into(),
                block_type: DOCUMENT_VALIDATOR_BLOCK.into(),
                tag: "check".into(),
                policy_id: PolicyId::new("p"),
                topic_id: None,
            },
            options,
        }
    }

    #[test]
    fn test_conditions() {
        let subject = json!({ "unit": "kWh", "amount": 5, "site": { "country": "NO" } });

        assert!(condition("unit", ConditionKind::Equal, json!("kWh")).check(&subject).is_none());
        assert!(condition("amount", ConditionKind::Equal, json!("5")).check(&subject).is_none());
        assert!(condition("unit", ConditionKind::NotEqual, json!("kWh")).check(&subject).is_some());
        assert!(condition("site.country", ConditionKind::In, json!(["NO", "SE"]))
            .check(&subject)
            .is_none());
        assert!(condition("site.country", ConditionKind::NotIn, json!(["NO"]))
            .check(&subject)
            .is_some());
        assert!(condition("missing", ConditionKind::NotEqual, json!(1)).check(&subject).is_none());

        let reason = condition("missing", ConditionKind::Equal, json!(1))
            .check(&subject)
            .unwrap();
        assert!(reason.contains("missing"));
    }

    #[test]
    fn test_collects_every_reason() {
        let validator = validator(DocumentValidatorOptions {
            document_type: Some("report".into()),
            conditions: vec![
                condition("unit", ConditionKind::Equal, json!("MWh")),
                condition("amount", ConditionKind::In, json!([1, 2])),
            ],
        });

        let reasons = validator.check(&record("invoice", json!({ "unit": "kWh", "amount": 5 })));
        assert_eq!(reasons.len(), 3);

        assert!(validator
            .check(&record("report", json!({ "unit": "MWh", "amount": 2 })))
            .is_empty());
    }

    #[test]
    fn test_options_parse_from_json() {
        let options: DocumentValidatorOptions = serde_json::from_value(json!({
            "conditions": [{ "field": "unit", "type": "notIn", "value": ["x"] }]
        }))
        .unwrap();
        assert_eq!(options.conditions[0].kind, ConditionKind::NotIn);
        assert!(options.document_type.is_none());
    }

    #[test]
    fn test_list_condition_needs_array() {
        let options = json!({ "conditions": [{ "field": "unit", "type": "in", "value": "x" }] });
        assert!(list_conditions_have_arrays(&options).is_some());
        let options = json!({ "conditions": [{ "field": "unit", "type": "equal", "value": "x" }] });
        assert!(list_conditions_have_arrays(&options).is_none());
    }
}
