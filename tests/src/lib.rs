//! # Policy Engine Test Suite
//!
//! Cross-crate flows driven through the `PolicyEngine` facade.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs          # In-memory collaborators, actors, policies
//! └── integration/
//!     ├── request_flow.rs        # request → send → mint
//!     ├── mint_flow.rs           # mint outcomes seen from the flow
//!     ├── publish_validation.rs  # publish-time validation
//!     └── concurrency.rs         # busy gate, actor isolation, deadlines
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p policy-tests
//! cargo test -p policy-tests integration::request_flow
//!
//! # Benchmarks
//! cargo bench -p policy-tests
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
