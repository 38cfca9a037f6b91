//! # pe-02-actor-state
//!
//! Mutable state a block keeps per actor.
//!
//! ## Model
//!
//! - Blobs are keyed by (block uuid, actor state key). Actor A never sees
//!   actor B's blob.
//! - A blob is created lazily as `{"active": true}`.
//! - `active: false` means the block is *Busy* for the actor. A second action
//!   is rejected, not queued.
//! - The map is sharded (`dashmap`): updates to one key are serialized,
//!   different actors do not contend.
//!
//! ## Example
//!
//! ```rust,ignore
//! let store = ActorStateStore::new();
//! let mut guard = store.try_acquire(&block_id, &actor)?;
//! match do_work().await {
//!     Ok(_) => guard.complete(),
//!     Err(e) => guard.fail(e.to_string()),
//! }
//! // guard dropped: block is Active again
//! ```

pub mod error;
pub mod guard;
pub mod store;

pub use error::StateError;
pub use guard::BusyGuard;
pub use store::{default_state, ActorStateStore};
