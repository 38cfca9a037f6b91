//! # Aggregation Rules
//!
//! The mint amount is an arithmetic expression over credential subject
//! fields, evaluated once per input document and summed.
//!
//! ```text
//! "meter.kwh * 0.5 - losses"
//!     │ Lexer    → tokens
//!     │ Parser   → Expr
//!     └ evaluate → f64 per document, summed
//! ```
//!
//! Evaluation never fails. A missing or non-numeric field is NaN and
//! division by zero is infinite; the mint block rejects such amounts.

pub mod lexer;
pub mod parser;

pub use parser::{BinaryOp, Expr};

use crate::error::RuleResult;
use parser::Parser;
use serde_json::Value;
use shared_types::{lookup_path, DocumentRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationRule {
    source: String,
    expr: Expr,
}

impl AggregationRule {
    pub fn parse(source: &str) -> RuleResult<Self> {
        Ok(Self {
            source: source.to_string(),
            expr: Parser::parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Value of the rule for one credential subject.
    pub fn evaluate(&self, subject: &Value) -> f64 {
        eval(&self.expr, subject)
    }

    /// Sum of the rule over the subjects of `documents`. A document without a
    /// subject contributes NaN.
    pub fn sum(&self, documents: &[DocumentRecord]) -> f64 {
        documents
            .iter()
            .map(|doc| doc.subject().map_or(f64::NAN, |subject| self.evaluate(subject)))
            .sum()
    }
}

fn field_value(subject: &Value, path: &str) -> f64 {
    match lookup_path(subject, path) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn eval(expr: &Expr, subject: &Value) -> f64 {
    match expr {
        Expr::Number(n) => *n,
        Expr::Field(path) => field_value(subject, path),
        Expr::Neg(inner) => -eval(inner, subject),
        Expr::Binary(left, op, right) => {
            let (l, r) = (eval(left, subject), eval(right, subject));
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuleError;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_evaluate_fields() {
        let rule = AggregationRule::parse("(meter.kwh - losses) * 2").unwrap();
        let subject = json!({ "meter": { "kwh": 10 }, "losses": "1.5" });
        assert_eq!(rule.evaluate(&subject), 17.0);
        assert_eq!(rule.source(), "(meter.kwh - losses) * 2");
    }

    #[test]
    fn test_missing_or_textual_field_is_nan() {
        let rule = AggregationRule::parse("amount + 1").unwrap();
        assert!(rule.evaluate(&json!({})).is_nan());
        assert!(rule.evaluate(&json!({ "amount": "lots" })).is_nan());
        assert!(rule.evaluate(&json!({ "amount": true })).is_nan());
    }

    #[test]
    fn test_division_by_zero_is_infinite() {
        let rule = AggregationRule::parse("amount / 0").unwrap();
        assert!(rule.evaluate(&json!({ "amount": 4 })).is_infinite());
    }

    #[test]
    fn test_empty_rule() {
        assert_eq!(AggregationRule::parse(""), Err(RuleError::Empty));
    }

    proptest! {
        #[test]
        fn prop_matches_f64_arithmetic(x in -1.0e6f64..1.0e6, a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
            let rule = AggregationRule::parse(&format!("x * {b} + {a}")).unwrap();
            prop_assert_eq!(rule.evaluate(&json!({ "x": x })), x * b + a);
        }

        #[test]
        fn prop_parse_never_panics(input in "[a-z0-9+*/(). -]{0,24}") {
            let _ = AggregationRule::parse(&input);
        }
    }
}
