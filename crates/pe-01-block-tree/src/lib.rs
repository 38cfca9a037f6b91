//! # pe-01-block-tree
//!
//! Block descriptor registry and the runtime block tree of a policy.
//!
//! ## Overview
//!
//! - **Registry**: block type name → `BlockDescriptor`. Built once at startup
//!   and frozen behind an `Arc`.
//! - **Block Tree**: the instances of one compiled policy. Built once per
//!   publish and immutable afterwards.
//! - **Routes**: explicit event links and default-event hand-overs resolved
//!   into `EventRoute`s for the dispatcher.
//!
//! ```text
//! PolicyConfig (JSON) ──compile──→ BlockTree ──resolve_routes──→ RouteResolution
//!                         ▲                                        ├── routes   → Dispatcher
//!                         │                                        └── problems → Validation
//!                   BlockRegistry
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let policy = PolicyConfig::from_json(&json)?;
//! let tree = BlockTree::compile(&policy, &registry)?;
//! let validators = tree.find_children_of(&request_id, |c| c.is_validator)?;
//! ```

pub mod domain;
pub mod error;

pub use domain::{
    BlockConfig, BlockInstance, BlockRegistry, BlockTree, BlockTreeBuilder, Descendants,
    EventLink, LinkProblem, PolicyConfig, RouteResolution,
};
pub use error::{RegistryError, TreeError, TreeResult};
