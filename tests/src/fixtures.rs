//! # Test Fixtures
//!
//! An engine over in-memory collaborators, seeded with one schema and two
//! tokens, plus the issuance policy most flows run against:
//!
//! ```text
//! issuance (interfaceContainerBlock)
//! ├── submit_report (requestVcDocumentBlock)
//! │   └── check_report (documentValidatorBlock, optional)
//! ├── send_report (sendToLedgerBlock)
//! └── mint_tokens (mintDocumentBlock)
//! ```

use pe_01_block_tree::PolicyConfig;
use pe_04_document_lineage::{
    Collaborators, Collection, DigestCredentialHelper, DocumentLineage, InMemoryLedger,
    InMemoryRepository, InMemoryWallet, KeyType, RecordMetadata, StaticTopicResolver,
};
use pe_05_request_block::RequestPayload;
use policy_runtime::{EngineConfig, PolicyEngine, INTERFACE_CONTAINER_BLOCK};
use serde_json::{json, Value};
use shared_types::{
    Actor, BlockId, DocumentRecord, PolicyId, RootAuthority, Schema, Topic, TokenRecord, TokenType,
};
use std::sync::Arc;

pub const ROOT_DID: &str = "did:example:root";
pub const ROOT_WALLET: &str = "wallet:root";
pub const CARBON_TOKEN: &str = "0.0.7";
pub const CERTIFICATE_TOKEN: &str = "0.0.8";

pub const REQUEST_ID: &str = "request";
pub const CHECK_ID: &str = "check";
pub const SEND_ID: &str = "send";
pub const MINT_ID: &str = "mint";

pub const SUBMIT_TAG: &str = "submit_report";
pub const POLICY_ID: &str = "issuance-policy";

pub struct Harness {
    pub engine: PolicyEngine,
    pub repository: Arc<InMemoryRepository>,
    pub ledger: Arc<InMemoryLedger>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let repository = Arc::new(InMemoryRepository::new());
        repository
            .insert(Collection::Schemas, &report_schema())
            .expect("schema fixture");
        for token in [carbon_token(), certificate_token()] {
            repository
                .insert(Collection::Tokens, &token)
                .expect("token fixture");
        }
        let ledger = Arc::new(InMemoryLedger::new());
        let collaborators = collaborators(&repository, &ledger);
        Self {
            engine: PolicyEngine::new(config, collaborators, root_authority()).expect("engine"),
            repository,
            ledger,
        }
    }

    /// Signed, unsubmitted report documents owned by `actor`, one per
    /// subject, as the request block would draft them.
    pub async fn drafts(&self, actor: &Actor, subjects: Vec<Value>) -> Vec<DocumentRecord> {
        let lineage = DocumentLineage::new(
            collaborators(&self.repository, &self.ledger),
            root_authority(),
            PolicyId::new(POLICY_ID),
        );
        let mut drafts = Vec::new();
        for subject in subjects {
            let envelope = lineage.create_document(subject).await.expect("sealed draft");
            let metadata = RecordMetadata {
                owner: actor.did.clone().unwrap_or_default(),
                doc_type: "report".into(),
                tag: SUBMIT_TAG.into(),
                ..RecordMetadata::default()
            };
            drafts.push(lineage.draft(&envelope, Vec::new(), metadata));
        }
        drafts
    }
}

fn collaborators(repository: &Arc<InMemoryRepository>, ledger: &Arc<InMemoryLedger>) -> Collaborators {
    Collaborators {
        repository: repository.clone(),
        ledger: ledger.clone(),
        credentials: Arc::new(DigestCredentialHelper),
        wallet: Arc::new(InMemoryWallet::new().with_key(
            ROOT_WALLET,
            KeyType::Key,
            ROOT_DID,
            "root-secret",
        )),
        topics: Arc::new(StaticTopicResolver::new(Topic::new("0.0.100", ROOT_DID))),
    }
}

fn root_authority() -> RootAuthority {
    RootAuthority {
        did: ROOT_DID.into(),
        account_id: "0.0.2".into(),
        wallet_token: ROOT_WALLET.into(),
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn report_schema() -> Schema {
    Schema {
        iri: "#report".into(),
        name: "report".into(),
        context_url: "https://example.org/report".into(),
        entity_type: "EmissionReport".into(),
        topic_id: None,
        required_fields: vec!["amount".into()],
    }
}

pub fn carbon_token() -> TokenRecord {
    TokenRecord {
        token_id: CARBON_TOKEN.into(),
        token_name: "Carbon".into(),
        token_symbol: "CO2".into(),
        token_type: TokenType::Fungible,
        decimals: 2,
    }
}

pub fn certificate_token() -> TokenRecord {
    TokenRecord {
        token_id: CERTIFICATE_TOKEN.into(),
        token_name: "Certificate".into(),
        token_symbol: "CERT".into(),
        token_type: TokenType::NonFungible,
        decimals: 0,
    }
}

/// An actor with a DID and a ledger account.
pub fn actor(name: &str, account: &str) -> Actor {
    Actor::new(name)
        .with_did(format!("did:example:{name}"))
        .with_account(account)
}

pub fn alice() -> Actor {
    actor("alice", "0.0.1001")
}

pub fn bob() -> Actor {
    actor("bob", "0.0.1002")
}

pub fn report(amount: Value) -> RequestPayload {
    RequestPayload::new(
        json!({ "amount": amount, "site": "north" })
            .as_object()
            .cloned()
            .expect("object literal"),
    )
}

pub fn block(id: &str) -> BlockId {
    BlockId::new(id)
}

/// Builder for the issuance policy.
#[derive(Debug, Clone)]
pub struct IssuancePolicy {
    pub request: Value,
    pub validator: Option<Value>,
    pub send: Value,
    pub mint: Value,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            request: json!({ "schema": "#report" }),
            validator: None,
            send: json!({}),
            mint: json!({ "tokenId": CARBON_TOKEN, "rule": "amount * 2" }),
        }
    }
}

impl IssuancePolicy {
    #[must_use]
    pub fn request(mut self, options: Value) -> Self {
        self.request = options;
        self
    }

    #[must_use]
    pub fn validator(mut self, options: Value) -> Self {
        self.validator = Some(options);
        self
    }

    #[must_use]
    pub fn mint(mut self, options: Value) -> Self {
        self.mint = options;
        self
    }

    pub fn to_json(&self) -> Value {
        let mut request = json!({
            "id": REQUEST_ID,
            "blockType": "requestVcDocumentBlock",
            "tag": SUBMIT_TAG,
            "options": self.request,
        });
        if let Some(validator) = &self.validator {
            request["children"] = json!([{
                "id": CHECK_ID,
                "blockType": "documentValidatorBlock",
                "tag": "check_report",
                "options": validator,
            }]);
        }
        json!({
            "id": POLICY_ID,
            "name": "Emission issuance",
            "root": {
                "id": "issuance",
                "blockType": INTERFACE_CONTAINER_BLOCK,
                "tag": "issuance",
                "children": [
                    request,
                    {
                        "id": SEND_ID,
                        "blockType": "sendToLedgerBlock",
                        "tag": "send_report",
                        "options": self.send,
                    },
                    {
                        "id": MINT_ID,
                        "blockType": "mintDocumentBlock",
                        "tag": "mint_tokens",
                        "options": self.mint,
                    }
                ]
            }
        })
    }

    pub fn build(&self) -> PolicyConfig {
        PolicyConfig::from_value(self.to_json()).expect("policy fixture")
    }
}
