//! # Mint Block
//!
//! Mints tokens for documents that reached the ledger. The amount comes from
//! an aggregation rule evaluated over the documents, the recipient from the
//! documents' accounts, and every mint is recorded as a credential and an
//! enclosing presentation before the ledger mint runs.
//!
//! ## Modules
//!
//! - `mint`: the block, recipient resolution and the run outcome
//! - `rule`: lexer, parser and evaluator of aggregation rules
//! - `options`: typed options, option rules and unit conversion

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod mint;
pub mod options;
pub mod rule;

pub use error::{MintError, MintResult, RuleError, RuleResult};
pub use mint::{resolve_recipient, MintBlock, MintOutcome, Recipient, MINT_BLOCK};
pub use options::{to_ledger_units, AccountType, MintBlockOptions};
pub use rule::AggregationRule;
