//! The entity-graph projection: a petgraph
//! `DiGraph<GraphNode, GraphEdge>` over Developer/File/Commit/Issue/
//! PullRequest/CodeBlock entities, persisted to sled so the process can
//! restart without a full rebuild, and always rebuildable from scratch out
//! of `relational-store` since that crate — not this one — is authoritative.

pub mod build;
pub mod consistency;
pub mod errors;
pub mod export;
pub mod model;
pub mod store;

pub use errors::{GraphStoreError, Result};
pub use model::{EdgeKind, GraphEdge, GraphNode, NodeKind};
pub use store::GraphStore;
