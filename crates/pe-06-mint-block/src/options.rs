//! Typed options of the mint block and conversion to on-ledger units.

use crate::error::{MintError, MintResult};
use crate::rule::AggregationRule;
use pe_03_validation::{OptionRule, ReferenceKind, RuleSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{TokenRecord, TokenType};

/// Where the recipient account comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountType {
    /// The input document owner's ledger account.
    #[default]
    Default,
    /// A named account field of the input documents (`accountId`).
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintBlockOptions {
    pub token_id: String,
    /// Aggregation rule evaluated over every input document.
    pub rule: String,
    #[serde(default)]
    pub account_type: AccountType,
    /// Account field read when `account_type` is `custom`.
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

fn rule_parses(options: &Value) -> Option<String> {
    let rule = options.get("rule")?.as_str()?;
    AggregationRule::parse(rule).err().map(|e| e.to_string())
}

fn custom_account_is_named(options: &Value) -> Option<String> {
    let custom = options.get("accountType").and_then(Value::as_str) == Some("custom");
    let named = options
        .get("accountId")
        .and_then(Value::as_str)
        .is_some_and(|field| !field.trim().is_empty());
    (custom && !named).then(|| "a custom account type needs an accountId field".to_string())
}

pub fn rules() -> RuleSet {
    RuleSet::typed::<MintBlockOptions>()
        .rule(OptionRule::Required("tokenId"))
        .rule(OptionRule::NonEmptyString("tokenId"))
        .rule(OptionRule::ResolvesTo("tokenId", ReferenceKind::Token))
        .rule(OptionRule::Required("rule"))
        .rule(OptionRule::Custom("rule", rule_parses))
        .rule(OptionRule::OneOf("accountType", &["default", "custom"]))
        .rule(OptionRule::Custom("accountId", custom_account_is_named))
}

/// Convert an aggregate amount into the token's on-ledger units.
///
/// Fungible tokens are scaled by their decimals and rounded; non-fungible
/// tokens mint `floor(amount)` serials.
pub fn to_ledger_units(amount: f64, token: &TokenRecord) -> MintResult<u64> {
    if !amount.is_finite() {
        return Err(MintError::InvalidAmount(format!("{amount} is not a finite number")));
    }
    let units = match token.token_type {
        TokenType::Fungible => {
            let scale = i32::try_from(token.decimals)
                .map_err(|_| MintError::InvalidAmount(format!("{} decimals", token.decimals)))?;
            (amount * 10f64.powi(scale)).round()
        }
        TokenType::NonFungible => amount.floor(),
    };
    // u64::MAX as f64 rounds up to 2^64, which does not fit.
    if !units.is_finite() || units < 1.0 || units >= u64::MAX as f64 {
        return Err(MintError::InvalidAmount(format!(
            "{amount} converts to {units} units of {}",
            token.token_id
        )));
    }
    Ok(units as u64)
}
