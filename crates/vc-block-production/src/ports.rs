//! Consumed interfaces: the ledger and the proposer-selection hook.

use shared_types::{Address, Block, Hash};
use thiserror::Error;
use vc_staking::ValidatorRecord;

/// Ledger append failure. Fatal to the block loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger refused the block.
    #[error("Ledger append failed: {0}")]
    AppendFailed(String),
}

/// Append-only block ledger consumed by the loop.
pub trait Ledger: Send {
    /// Append a finalised block.
    fn append(&mut self, block: Block) -> Result<(), LedgerError>;
}

/// Pluggable proposer selection over the sorted active set.
pub trait ProposerSelector: Send + Sync {
    /// Choose the proposer for `height`. `validators` arrive stake
    /// descending with address tiebreak.
    fn select(&self, height: u64, validators: &[ValidatorRecord]) -> Option<Address>;
}

/// Default rotation: `validators[height mod len]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StakeOrderedSelector;

impl ProposerSelector for StakeOrderedSelector {
    fn select(&self, height: u64, validators: &[ValidatorRecord]) -> Option<Address> {
        if validators.is_empty() {
            return None;
        }
        let index = (height % validators.len() as u64) as usize;
        Some(validators[index].address)
    }
}

/// In-process ledger keeping the chain in memory. Verifies height
/// monotonicity and parent linkage on append.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    blocks: Vec<Block>,
}

impl InMemoryLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True before the first block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// All appended blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Hash of the latest block.
    pub fn head_hash(&self) -> Option<Hash> {
        self.blocks.last().map(Block::hash)
    }
}

impl Ledger for InMemoryLedger {
    fn append(&mut self, block: Block) -> Result<(), LedgerError> {
        let expected_height = self.blocks.last().map(|b| b.header.height + 1).unwrap_or(1);
        if block.header.height != expected_height {
            return Err(LedgerError::AppendFailed(format!(
                "height {} does not extend head {}",
                block.header.height,
                expected_height - 1
            )));
        }
        if let Some(head) = self.blocks.last() {
            if block.header.parent_hash != head.hash() {
                return Err(LedgerError::AppendFailed(
                    "parent hash does not match head".into(),
                ));
            }
        }
        self.blocks.push(block);
        Ok(())
    }
}
