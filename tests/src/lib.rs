//! # VeloChain Test Suite
//!
//! Unified test crate for cross-subsystem behaviour:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Shared fixtures (keys, transactions, chains)
//! └── integration/      # Cross-subsystem scenarios and invariants
//!     ├── scenarios.rs  # End-to-end flows A–F
//!     └── invariants.rs # Properties that must hold in every state
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p vc-tests
//!
//! # By category
//! cargo test -p vc-tests integration::scenarios::
//! cargo test -p vc-tests integration::invariants::
//! ```

#[cfg(test)]
mod integration;
#[cfg(test)]
mod support;
