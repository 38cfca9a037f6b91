//! # Mint Block
//!
//! Server-side block that turns the documents it receives into tokens.
//!
//! ```text
//! RunEvent(documents)
//!   1. token          load_token                 → BadTokenId
//!   2. documents      non-empty, sealed, on ledger → BadDocument
//!   3. recipient      accounts / owner account    → NoRecipient
//!   4. amount         rule summed over documents  → InvalidAmount
//!   5. units          decimals / serials          → InvalidAmount
//!   6. submission     Mint VC, then enclosing VP
//!   7. mint           LedgerAdapter::mint
//!   8. events         Run(vp), Refresh
//! ```
//!
//! Nothing is emitted unless steps 1 to 7 all succeed. Steps 1 to 5 write
//! nothing to the ledger or the repository.

use crate::error::{MintError, MintResult};
use crate::options::{to_ledger_units, AccountType, MintBlockOptions};
use crate::rule::AggregationRule;
use async_trait::async_trait;
use pe_01_block_tree::BlockInstance;
use pe_04_document_lineage::{DocumentLineage, RecordMetadata, TopicKind};
use serde_json::{json, Value};
use shared_bus::{BlockEventHandler, Dispatcher, Handled};
use shared_types::{
    lookup_path, ActionErrorKind, Actor, BlockActionError, BlockDescriptor, BlockRef,
    ControlKind, DocumentRecord, EventState, EventType, MessageId, MintReceipt, PolicyEvent,
    TokenRecord, DEFAULT_ACCOUNT,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const MINT_BLOCK: &str = "mintDocumentBlock";

/// Subject type of the credential describing a mint.
pub const MINT_SUBJECT_TYPE: &str = "MintToken";

pub fn descriptor() -> BlockDescriptor {
    BlockDescriptor::new(MINT_BLOCK)
        .event()
        .external_events()
        .default_event()
        .inputs([EventType::RunEvent])
        .outputs([EventType::RunEvent, EventType::RefreshEvent])
        .control(ControlKind::Server)
        .describe("Mints tokens for the documents it receives")
}

/// Result of a successful mint run.
#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub vc: DocumentRecord,
    /// Enclosing presentation, status `Minted`.
    pub vp: DocumentRecord,
    /// Amount in on-ledger units.
    pub amount: u64,
    pub recipient: String,
    pub receipt: MintReceipt,
    /// Non-fatal findings, such as disagreeing recipient accounts.
    pub warnings: Vec<String>,
}

/// Recipient chosen for a set of documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub account: String,
    pub warnings: Vec<String>,
}

/// Pick the recipient account of `documents`.
///
/// With a custom account field the first non-empty value wins and every
/// document that names a different account adds a warning.
pub fn resolve_recipient(
    documents: &[DocumentRecord],
    account_type: AccountType,
    field: Option<&str>,
) -> MintResult<Recipient> {
    let field = match (account_type, field) {
        (AccountType::Custom, Some(field)) => field,
        _ => {
            return documents
                .first()
                .and_then(DocumentRecord::owner_account)
                .map(|account| Recipient {
                    account: account.to_string(),
                    warnings: Vec::new(),
                })
                .ok_or(MintError::NoRecipient)
        }
    };

    let account_of = |doc: &DocumentRecord| -> Option<String> {
        let named = doc.accounts.get(field).cloned().or_else(|| {
            doc.subject()
                .and_then(|subject| lookup_path(subject, field))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        named.filter(|account| !account.trim().is_empty())
    };

    let mut chosen: Option<String> = None;
    let mut warnings = Vec::new();
    for doc in documents {
        let Some(account) = account_of(doc) else {
            continue;
        };
        match &chosen {
            None => chosen = Some(account),
            Some(first) if *first != account => warnings.push(format!(
                "document {} names account {account}, using {first}",
                doc.id
            )),
            Some(_) => {}
        }
    }

    chosen
        .map(|account| Recipient { account, warnings })
        .ok_or(MintError::NoRecipient)
}

pub struct MintBlock {
    block: BlockRef,
    options: MintBlockOptions,
    rule: AggregationRule,
    lineage: Arc<DocumentLineage>,
}

impl MintBlock {
    pub fn from_instance(
        instance: &BlockInstance,
        lineage: Arc<DocumentLineage>,
    ) -> Result<Self, BlockActionError> {
        let block = instance.block_ref();
        let configuration =
            |message: String| BlockActionError::new(&block, ActionErrorKind::Configuration, message);
        let options: MintBlockOptions = serde_json::from_value(instance.options.clone())
            .map_err(|e| configuration(e.to_string()))?;
        let rule = AggregationRule::parse(&options.rule).map_err(|e| configuration(e.to_string()))?;
        Ok(Self {
            block,
            options,
            rule,
            lineage,
        })
    }

    pub fn block(&self) -> &BlockRef {
        &self.block
    }

    pub fn options(&self) -> &MintBlockOptions {
        &self.options
    }

    pub fn rule(&self) -> &AggregationRule {
        &self.rule
    }

    async fn token(&self) -> MintResult<TokenRecord> {
        self.lineage
            .load_token(&self.options.token_id)
            .await?
            .ok_or_else(|| MintError::BadTokenId(self.options.token_id.clone()))
    }

    /// Message ids of the input documents, after checking their seals.
    async fn check_documents(&self, documents: &[DocumentRecord]) -> MintResult<Vec<MessageId>> {
        if documents.is_empty() {
            return Err(MintError::BadDocument("no input documents".into()));
        }
        let credentials = &self.lineage.collaborators().credentials;
        let mut relationships = Vec::with_capacity(documents.len());
        for doc in documents {
            if !credentials.verify_document(&doc.document).await {
                return Err(MintError::BadDocument(format!("{} has an invalid proof", doc.id)));
            }
            match &doc.message_id {
                Some(id) if !id.is_empty() => relationships.push(id.clone()),
                _ => {
                    return Err(MintError::BadDocument(format!(
                        "{} is not on the ledger",
                        doc.id
                    )))
                }
            }
        }
        Ok(relationships)
    }

    fn mint_subject(&self, token: &TokenRecord, amount: u64) -> Value {
        json!({
            "type": MINT_SUBJECT_TYPE,
            "tokenId": token.token_id,
            "amount": amount.to_string(),
            "date": chrono::Utc::now().to_rfc3339(),
            "policyId": self.lineage.policy_id().as_str(),
        })
    }

    fn metadata(&self, owner: &str, doc_type: &str, recipient: &str) -> RecordMetadata {
        RecordMetadata {
            owner: owner.to_string(),
            doc_type: doc_type.to_string(),
            tag: self.block.tag.clone(),
            schema: None,
            accounts: BTreeMap::from([(DEFAULT_ACCOUNT.to_string(), recipient.to_string())]),
        }
    }

    /// Run the mint for `documents` triggered by `actor`.
    #[instrument(skip_all, fields(block_id = %self.block.id, actor = %actor.state_key(), documents = documents.len()))]
    pub async fn run(&self, actor: &Actor, documents: &[DocumentRecord]) -> MintResult<MintOutcome> {
        let token = self.token().await?;
        let relationships = self.check_documents(documents).await?;
        let Recipient { account, warnings } = resolve_recipient(
            documents,
            self.options.account_type,
            self.options.account_id.as_deref(),
        )?;
        for warning in &warnings {
            warn!(warning = %warning, "Recipient accounts disagree");
        }

        let total = self.rule.sum(documents);
        let amount = to_ledger_units(total, &token)?;

        let topic = self.lineage.topic_for(TopicKind::Root, actor, &self.block).await?;
        let vc = self
            .lineage
            .create_document(self.mint_subject(&token, amount))
            .await?;
        let owner = documents
            .first()
            .map_or(self.lineage.root().did.as_str(), |doc| doc.owner.as_str());
        let submission = self
            .lineage
            .submit_aggregate(
                &topic,
                vc,
                relationships,
                self.metadata(owner, "mint", &account),
                self.metadata(owner, "vp", &account),
            )
            .await?;

        let memo = self
            .options
            .memo
            .clone()
            .unwrap_or_else(|| submission.vp.message_id().to_string());
        let receipt = self
            .lineage
            .collaborators()
            .ledger
            .mint(&token, amount, &account, &memo)
            .await
            .map_err(MintError::Mint)?;
        let vp = self.lineage.mark_minted(submission.vp.record()).await?;

        info!(
            token_id = %token.token_id,
            amount,
            recipient = %account,
            transaction_id = %receipt.transaction_id,
            "Tokens minted"
        );
        Ok(MintOutcome {
            vc: submission.vc.into_record(),
            vp,
            amount,
            recipient: account,
            receipt,
            warnings,
        })
    }
}

#[async_trait]
impl BlockEventHandler for MintBlock {
    async fn on_event(
        &self,
        event: PolicyEvent,
        dispatcher: &Dispatcher,
    ) -> Result<Handled, BlockActionError> {
        let outcome = self
            .run(&event.actor, &event.payload.documents)
            .await
            .map_err(|e| e.into_action_error(&self.block))?;

        let mut report = dispatcher
            .trigger(
                &self.block.id,
                EventType::RunEvent,
                &event.actor,
                EventState::with_documents(vec![outcome.vp]),
            )
            .await;
        report.merge(
            dispatcher
                .trigger(&self.block.id, EventType::RefreshEvent, &event.actor, EventState::empty())
                .await,
        );
        Ok(Handled::from(report).with_warnings(outcome.warnings))
    }
}
