//! The authoritative relational store: a 13-table(+)
//! Postgres schema, idempotent upserts keyed on the unique constraints the
//! Stager/Grapher/Atomizer/Risk Indexer rely on for resumability, and the
//! DLQ/ingestion-job bookkeeping the resilience substrate reads.
//!
//! `graph-store` is a derived projection of what lives here; nothing in
//! this crate ever reads from the graph store.

pub mod block_changes;
pub mod code_blocks;
pub mod comments;
pub mod commits;
pub mod developers;
pub mod dlq;
pub mod errors;
pub mod file_identities;
pub mod issues;
pub mod jobs;
pub mod links;
pub mod pool;
pub mod pr_files;
pub mod pull_requests;
pub mod repositories;
pub mod risk;
pub mod timeline;

pub use errors::{Result, StoreError};
pub use pool::connect;

pub type Pool = sqlx::PgPool;
