//! Slashing rules and events.
//!
//! Violations map to a basis-point stake debit plus a jail term. Byzantine
//! violations jail permanently (sentinel `u64::MAX`).

use serde::{Deserialize, Serialize};
use shared_types::{Address, Timestamp};

/// Violation classification carried by evidence submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Missed liveness obligations.
    Downtime,
    /// Signed two conflicting blocks at one height.
    DoubleSign,
    /// Proposed a block that failed validation.
    InvalidProposal,
    /// Arbitrary protocol subversion.
    Byzantine,
}

/// Punishment parameters for one violation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlashRule {
    /// Stake fraction debited, in basis points.
    pub fraction_bps: u64,
    /// Jail duration in milliseconds; ignored when `permanent`.
    pub jail_ms: u64,
    /// Permanent jailing (Byzantine).
    pub permanent: bool,
}

/// Rule table.
pub fn rule_for(kind: ViolationKind) -> SlashRule {
    match kind {
        ViolationKind::Downtime => SlashRule {
            fraction_bps: 100,
            jail_ms: 60 * 60 * 1000,
            permanent: false,
        },
        ViolationKind::InvalidProposal => SlashRule {
            fraction_bps: 200,
            jail_ms: 24 * 60 * 60 * 1000,
            permanent: false,
        },
        ViolationKind::DoubleSign => SlashRule {
            fraction_bps: 500,
            jail_ms: 7 * 24 * 60 * 60 * 1000,
            permanent: false,
        },
        ViolationKind::Byzantine => SlashRule {
            fraction_bps: 10_000,
            jail_ms: 0,
            permanent: true,
        },
    }
}

/// An applied slashing, appended to the registry's event log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashingEvent {
    /// Punished validator.
    pub validator: Address,
    /// Violation kind.
    pub kind: ViolationKind,
    /// Height the violation was observed at.
    pub height: u64,
    /// Stake debited.
    pub slashed_amount: u128,
    /// Raw evidence bytes as submitted.
    pub evidence: Vec<u8>,
    /// Jail expiry (sentinel `u64::MAX` = never).
    pub jailed_until: Timestamp,
}
