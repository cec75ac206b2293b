//! Cross-cutting resilience substrate shared by every pipeline stage
//!: the four-kind failure taxonomy, the DLQ's retry
//! schedule, the relational-first/graph-best-effort dual-write protocol,
//! the consistency validator's exit-code contract, force-push detection,
//! and the Atomizer's topological-order guard.
//!
//! Nothing in here talks to a provider or parses a diff; it wraps
//! `relational-store` and `graph-store` with the policy every stage needs
//! to apply consistently rather than reinventing per stage.

pub mod backoff;
pub mod backpressure;
pub mod consistency;
pub mod dlq;
pub mod dual_write;
pub mod errors;
pub mod force_push;
pub mod topo;

pub use errors::{classify_store_error, classify_upstream, FailureKind, ResilienceError, Result};
