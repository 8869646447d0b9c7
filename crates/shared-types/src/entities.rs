//! # Core Domain Entities
//!
//! Defines the chain entities consumed across subsystems.
//!
//! ## Clusters
//!
//! - **Transactions**: `SignedTransaction`, `Receipt`, `LogEntry`
//! - **Chain**: `Block`, `BlockHeader`
//! - **State**: `AccountState`

use crate::hashing::content_hash;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// A 32-byte Keccak-256 hash.
pub type Hash = primitive_types::H256;

/// A 20-byte account address (last 20 bytes of the Keccak-256 of the
/// owner's public key).
pub type Address = primitive_types::H160;

/// A 256-bit unsigned integer for balances and gas prices.
pub type U256 = primitive_types::U256;

/// A 32-byte Ed25519 public key.
pub type PublicKey = [u8; 32];

/// A 64-byte Ed25519 signature.
pub type Signature = [u8; 64];

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Intrinsic gas charged for any transaction, and the exact gas-used value
/// of a runtime-conflict abort.
pub const INTRINSIC_GAS: u64 = 21_000;

/// A signed transaction as received from the network.
///
/// Immutable once admitted; the content hash covers the whole signed
/// payload, signature included.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// Sender's public key.
    pub from: PublicKey,
    /// Recipient address (`None` for account creation payloads).
    pub to: Option<Address>,
    /// Transferred value in base units.
    pub value: U256,
    /// Sender's nonce to prevent replay.
    pub nonce: u64,
    /// Price per unit of gas the sender is willing to pay.
    pub gas_price: U256,
    /// Gas ceiling declared by the sender.
    pub gas_limit: u64,
    /// Opaque payload bytes (contract call data, etc.).
    pub data: Vec<u8>,
    /// Ed25519 signature over the unsigned payload.
    #[serde_as(as = "Bytes")]
    pub signature: Signature,
}

impl SignedTransaction {
    /// The bytes the sender signed: the canonical encoding of everything
    /// except the signature itself.
    pub fn signing_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct Unsigned<'a> {
            from: &'a PublicKey,
            to: &'a Option<Address>,
            value: &'a U256,
            nonce: u64,
            gas_price: &'a U256,
            gas_limit: u64,
            data: &'a [u8],
        }
        let unsigned = Unsigned {
            from: &self.from,
            to: &self.to,
            value: &self.value,
            nonce: self.nonce,
            gas_price: &self.gas_price,
            gas_limit: self.gas_limit,
            data: &self.data,
        };
        // Entity types always encode.
        bincode::serialize(&unsigned).unwrap_or_default()
    }

    /// Deterministic content hash of the whole signed payload.
    pub fn hash(&self) -> Hash {
        content_hash(self).unwrap_or_default()
    }
}

/// Outcome status of an executed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    /// Executed and committed.
    Success,
    /// Failed in the engine, or aborted by runtime-conflict arbitration.
    /// Aborted receipts carry a gas-used of exactly [`INTRINSIC_GAS`].
    Failed,
}

impl ReceiptStatus {
    /// Numeric wire form: 1 for success, 0 for failure.
    pub fn as_u8(self) -> u8 {
        match self {
            ReceiptStatus::Success => 1,
            ReceiptStatus::Failed => 0,
        }
    }
}

/// A log record emitted during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emitting account.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<Hash>,
    /// Unindexed payload.
    pub data: Vec<u8>,
}

/// Per-transaction execution receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Hash of the executed transaction.
    pub tx_hash: Hash,
    /// Execution outcome.
    pub status: ReceiptStatus,
    /// Gas consumed by the execution.
    pub gas_used: u64,
    /// Gas price the transaction committed to (used for fee accounting).
    pub gas_price: U256,
    /// Logs emitted during execution.
    pub logs: Vec<LogEntry>,
    /// Dependency level the transaction executed at.
    pub level: usize,
    /// Position within the level, priority-descending.
    pub index: usize,
}

impl Receipt {
    /// Fee paid for this execution.
    pub fn fee(&self) -> U256 {
        self.gas_price * U256::from(self.gas_used)
    }
}

/// Account record in a state snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Spendable balance in base units.
    pub balance: U256,
    /// Next expected transaction nonce.
    pub nonce: u64,
    /// Hash of the account's code (zero for plain accounts).
    pub code_hash: Hash,
    /// Root of the account's storage.
    pub storage_root: Hash,
}

impl AccountState {
    /// A plain account holding `balance` with a fresh nonce.
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }
}

/// The header of a finalised block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height in the chain.
    pub height: u64,
    /// Hash of the parent block (creates the chain linkage).
    pub parent_hash: Hash,
    /// Root of the state snapshot after applying this block.
    pub state_root: Hash,
    /// The validator that proposed this block.
    pub proposer: Address,
    /// Unix timestamp (ms) when the block was produced.
    pub timestamp: Timestamp,
    /// Total gas consumed by all included transactions.
    pub gas_used: u64,
}

/// A finalised block: header plus receipts ordered by
/// (level ascending, intra-level priority descending).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
    /// One receipt per included transaction, in execution order.
    pub receipts: Vec<Receipt>,
}

impl Block {
    /// Deterministic hash of the block header.
    pub fn hash(&self) -> Hash {
        content_hash(&self.header).unwrap_or_default()
    }

    /// Hashes of every included transaction, in receipt order.
    pub fn included_hashes(&self) -> Vec<Hash> {
        self.receipts.iter().map(|r| r.tx_hash).collect()
    }
}
