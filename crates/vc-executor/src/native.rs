//! Native value-transfer engine.
//!
//! The built-in [`ExecutionEngine`]: moves value between plain accounts,
//! bumps the sender nonce, charges intrinsic gas, and mirrors the static
//! analyser's heuristic by writing the first-32-byte payload slot on the
//! recipient. Contract execution backends replace this engine behind the
//! same trait.

use crate::engine::{BlockContext, EngineError, Execution, ExecutionEngine};
use crate::view::WorkerView;
use shared_types::{keccak256, Address, SignedTransaction, INTRINSIC_GAS, U256};
use vc_ordering::analyzer::heuristic_slot;

/// Gas charged per payload byte on top of [`INTRINSIC_GAS`].
pub const GAS_PER_PAYLOAD_BYTE: u64 = 16;

/// Plain value-transfer execution.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeTransferEngine;

impl NativeTransferEngine {
    /// Intrinsic gas of a payload.
    pub fn intrinsic_gas(data: &[u8]) -> u64 {
        INTRINSIC_GAS + GAS_PER_PAYLOAD_BYTE * data.len() as u64
    }
}

impl ExecutionEngine for NativeTransferEngine {
    fn run(
        &self,
        tx: &SignedTransaction,
        view: &mut WorkerView,
        _ctx: &BlockContext,
    ) -> Result<Execution, EngineError> {
        let sender = Address::from(shared_crypto::derive_address(&tx.from));
        let gas_used = Self::intrinsic_gas(&tx.data);

        if gas_used > tx.gas_limit {
            return Err(EngineError::GasLimitTooLow {
                required: gas_used,
                limit: tx.gas_limit,
            });
        }

        let mut sender_account = view.account(&sender);
        if sender_account.nonce != tx.nonce {
            return Err(EngineError::NonceMismatch {
                expected: sender_account.nonce,
                got: tx.nonce,
            });
        }

        let fee = tx.gas_price.saturating_mul(U256::from(gas_used));
        let required = tx.value.saturating_add(fee);
        if sender_account.balance < required {
            return Err(EngineError::InsufficientBalance {
                required,
                available: sender_account.balance,
            });
        }

        sender_account.balance -= required;
        sender_account.nonce += 1;
        view.set_account(sender, sender_account);

        if let Some(recipient) = tx.to {
            view.create_account(recipient);
            let mut recipient_account = view.account(&recipient);
            recipient_account.balance = recipient_account.balance.saturating_add(tx.value);
            view.set_account(recipient, recipient_account);

            if !tx.data.is_empty() {
                // Stays inside the advertised footprint: the analyser
                // declared exactly this slot (plus the wildcard).
                let slot = heuristic_slot(&tx.data);
                view.set_storage(recipient, slot, keccak256(&tx.data));
            }
        }

        Ok(Execution {
            gas_used,
            logs: vec![],
        })
    }
}
