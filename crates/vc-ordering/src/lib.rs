//! # Transaction Ordering
//!
//! Derives a correct partial order over pending transactions:
//!
//! 1. [`analyzer`] approximates each transaction's read/write footprint.
//! 2. [`conflict`] decides whether two footprints may not run concurrently.
//! 3. [`graph`] integrates conflicts as edges of a DAG and decomposes the
//!    DAG into execution levels; every level is a set of mutually
//!    independent transactions.
//!
//! The advertised footprint is always a superset of what execution may
//! touch. Over-approximation only costs parallelism; under-approximation
//! would break serializability and is treated as a bug.

pub mod access;
pub mod analyzer;
pub mod conflict;
pub mod errors;
pub mod graph;

pub use access::{AccessSet, SlotAccess};
pub use analyzer::{analyze, Footprint};
pub use conflict::{conflict_between, AdmissionConflict, ConflictKind, FootprintRef};
pub use errors::OrderingError;
pub use graph::{DependencyGraph, GraphNode};
