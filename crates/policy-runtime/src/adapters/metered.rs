use async_trait::async_trait;
use pe_04_document_lineage::LedgerAdapter;
use policy_telemetry::{LEDGER_SUBMISSIONS, TOKENS_MINTED};
use shared_types::{CollaboratorError, Envelope, LedgerMessage, MintReceipt, Topic, TokenRecord};
use std::sync::Arc;
use tracing::debug;

/// Ledger adapter that counts submissions and minted units.
///
/// Wraps the ledger handed to the engine, so every block that talks to the
/// ledger is measured without knowing about metrics.
pub struct MeteredLedger {
    inner: Arc<dyn LedgerAdapter>,
}

impl MeteredLedger {
    pub fn new(inner: Arc<dyn LedgerAdapter>) -> Self {
        Self { inner }
    }
}

fn outcome<T>(result: &Result<T, CollaboratorError>) -> &'static str {
    if result.is_ok() {
        "ok"
    } else {
        "error"
    }
}

#[async_trait]
impl LedgerAdapter for MeteredLedger {
    async fn send(&self, topic: &Topic, envelope: &Envelope) -> Result<LedgerMessage, CollaboratorError> {
        let result = self.inner.send(topic, envelope).await;
        LEDGER_SUBMISSIONS.with_label_values(&[outcome(&result)]).inc();
        result
    }

    async fn mint(
        &self,
        token: &TokenRecord,
        amount: u64,
        recipient: &str,
        memo: &str,
    ) -> Result<MintReceipt, CollaboratorError> {
        let result = self.inner.mint(token, amount, recipient, memo).await;
        if let Ok(receipt) = &result {
            debug!(token_id = %receipt.token_id, amount = receipt.amount, "Mint recorded");
            #[allow(clippy::cast_precision_loss)]
            TOKENS_MINTED
                .with_label_values(&[receipt.token_id.as_str()])
                .inc_by(receipt.amount as f64);
        }
        result
    }
}
