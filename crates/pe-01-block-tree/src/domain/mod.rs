//! Domain layer: registry, authored policy documents, the compiled block
//! tree and route resolution.

pub mod config;
pub mod registry;
pub mod routes;
pub mod tree;

pub use config::{BlockConfig, EventLink, PolicyConfig};
pub use registry::BlockRegistry;
pub use routes::{LinkProblem, RouteResolution};
pub use tree::{BlockInstance, BlockTree, BlockTreeBuilder, Descendants};
