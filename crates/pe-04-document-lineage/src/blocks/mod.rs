//! Blocks built directly on the lineage protocol.

pub mod send_to_ledger;

pub use send_to_ledger::{SendToLedgerBlock, SendToLedgerOptions, SEND_TO_LEDGER_BLOCK};
