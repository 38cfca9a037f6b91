//! # Declarative Option Rules
//!
//! Most block types validate their options the same way: the options must
//! deserialize into the block's typed options struct, a few fields must be
//! present, some must be one of a fixed set, some must name an existing
//! record. A `RuleSet` states those checks as data.
//!
//! ```rust,ignore
//! let rules = RuleSet::typed::<MintBlockOptions>()
//!     .rule(OptionRule::Required("tokenId"))
//!     .rule(OptionRule::ResolvesTo("tokenId", ReferenceKind::Token))
//!     .rule(OptionRule::OneOf("accountType", &["default", "custom"]));
//! ```

use crate::ports::ReferenceKind;
use crate::validator::{BlockValidator, ValidationContext};
use async_trait::async_trait;
use pe_01_block_tree::BlockInstance;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Check over the whole options object. Returns an error message on failure.
pub type OptionsCheck = fn(&Value) -> Option<String>;

/// One declarative check on a top-level option field.
#[derive(Debug, Clone)]
pub enum OptionRule {
    /// Field present and not null.
    Required(&'static str),
    /// If present, a non-empty string.
    NonEmptyString(&'static str),
    /// If present, one of the listed strings.
    OneOf(&'static str, &'static [&'static str]),
    /// If present, a number or a numeric string.
    Numeric(&'static str),
    /// If present, names an existing record.
    ResolvesTo(&'static str, ReferenceKind),
    /// Arbitrary check, labelled for diagnostics.
    Custom(&'static str, OptionsCheck),
}

/// An ordered list of option rules, optionally preceded by a typed
/// deserialization check.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    typed: Option<OptionsCheck>,
    rules: Vec<OptionRule>,
}

fn deserializes_as<T: DeserializeOwned>(options: &Value) -> Option<String> {
    serde_json::from_value::<T>(options.clone())
        .err()
        .map(|e| format!("Invalid options: {e}"))
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a check that the options deserialize into `T`.
    #[must_use]
    pub fn typed<T: DeserializeOwned>() -> Self {
        Self {
            typed: Some(deserializes_as::<T>),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn rule(mut self, rule: OptionRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len() + usize::from(self.typed.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every rule against `options`.
    pub async fn check(
        &self,
        options: &Value,
        ctx: &ValidationContext<'_>,
    ) -> anyhow::Result<Vec<String>> {
        let mut errors = Vec::new();
        if let Some(message) = self.typed.and_then(|typed| typed(options)) {
            errors.push(message);
        }

        for rule in &self.rules {
            match rule {
                OptionRule::Required(field) => {
                    if options.get(field).map_or(true, Value::is_null) {
                        errors.push(format!("Option \"{field}\" is not set"));
                    }
                }
                OptionRule::NonEmptyString(field) => match options.get(field) {
                    None | Some(Value::Null) => {}
                    Some(Value::String(s)) if !s.trim().is_empty() => {}
                    Some(_) => errors.push(format!("Option \"{field}\" must be a non-empty string")),
                },
                OptionRule::OneOf(field, allowed) => match options.get(field) {
                    None | Some(Value::Null) => {}
                    Some(Value::String(s)) if allowed.iter().any(|a| *a == s.as_str()) => {}
                    Some(other) => errors.push(format!(
                        "Option \"{field}\" must be one of [{}], got {other}",
                        allowed.join(", ")
                    )),
                },
                OptionRule::Numeric(field) => match options.get(field) {
                    None | Some(Value::Null) | Some(Value::Number(_)) => {}
                    Some(Value::String(s)) if s.trim().parse::<f64>().is_ok() => {}
                    Some(other) => {
                        errors.push(format!("Option \"{field}\" must be numeric, got {other}"))
                    }
                },
                OptionRule::ResolvesTo(field, kind) => {
                    let Some(id) = options.get(field).and_then(Value::as_str) else {
                        continue;
                    };
                    if !ctx.references.exists(*kind, id).await? {
                        errors.push(format!("{kind} \"{id}\" referenced by \"{field}\" does not exist"));
                    }
                }
                OptionRule::Custom(label, check) => {
                    if let Some(message) = check(options) {
                        errors.push(format!("{label}: {message}"));
                    }
                }
            }
        }
        Ok(errors)
    }
}

#[async_trait]
impl BlockValidator for RuleSet {
    async fn validate(
        &self,
        instance: &BlockInstance,
        ctx: &ValidationContext<'_>,
    ) -> anyhow::Result<Vec<String>> {
        self.check(&instance.options, ctx).await
    }
}
