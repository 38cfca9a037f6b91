//! # Core Domain Entities
//!
//! Identifiers and the identities on whose behalf blocks act.
//!
//! ## Clusters
//!
//! - **Identifiers**: `BlockId`, `PolicyId`, `MessageId`, `TopicId`
//! - **Identities**: `Actor`, `RootAuthority`
//! - **Block context**: `BlockRef`

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Unique identifier of a block instance within a policy.
    BlockId
);

string_id!(
    /// Identifier of a compiled policy.
    PolicyId
);

string_id!(
    /// Ledger message identifier returned by a successful submission.
    MessageId
);

string_id!(
    /// Ledger topic identifier.
    TopicId
);

impl BlockId {
    /// Generate a fresh random block identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// The authenticated identity on whose behalf a block action executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Login name. Unique per deployment.
    pub username: String,
    /// Decentralized identifier. Absent until the actor has registered one.
    pub did: Option<String>,
    /// Ledger account receiving tokens on the actor's behalf.
    pub account_id: Option<String>,
    /// Opaque token used to address the actor's keys in the wallet.
    pub wallet_token: String,
}

impl Actor {
    /// Create an actor with only a username. It has no stable identity yet.
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            wallet_token: format!("wallet:{username}"),
            username,
            did: None,
            account_id: None,
        }
    }

    /// Attach a decentralized identifier.
    pub fn with_did(mut self, did: impl Into<String>) -> Self {
        self.did = Some(did.into());
        self
    }

    /// Attach a ledger account.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// An actor has a stable identity once it owns a non-empty DID.
    pub fn has_identity(&self) -> bool {
        self.did.as_deref().is_some_and(|did| !did.is_empty())
    }

    /// Key under which per-actor state is partitioned.
    ///
    /// DID keys always start with `did:`, username keys with `user:`.
    pub fn state_key(&self) -> String {
        match self.did.as_deref().filter(|did| !did.is_empty()) {
            Some(did) if did.starts_with("did:") => did.to_string(),
            Some(did) => format!("did:{did}"),
            None => format!("user:{}", self.username),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.did {
            Some(did) => write!(f, "{} ({})", self.username, did),
            None => write!(f, "{}", self.username),
        }
    }
}

/// The policy owner. Issues and signs the documents blocks create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootAuthority {
    /// Issuer DID.
    pub did: String,
    /// Ledger account of the owner (token treasury).
    pub account_id: String,
    /// Wallet token under which the issuer key is stored.
    pub wallet_token: String,
}

/// Identifying context of a block instance, passed to collaborators and
/// carried by every block-scoped error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRef {
    pub id: BlockId,
    pub block_type: String,
    pub tag: String,
    pub policy_id: PolicyId,
    pub topic_id: Option<TopicId>,
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.block_type, self.id, self.tag)
    }
}
