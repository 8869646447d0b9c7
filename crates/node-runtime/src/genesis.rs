//! Genesis state construction.
//!
//! A [`GenesisSpec`] names the initial account balances and the founding
//! validator set. Building it yields the height-0 snapshot and a seeded
//! registry.

use serde::Deserialize;
use shared_types::{Address, U256};
use vc_executor::StateSnapshot;
use vc_staking::{StakingConfig, StakingError, ValidatorRegistry};

/// One pre-funded account.
#[derive(Clone, Debug, Deserialize)]
pub struct GenesisAccount {
    /// Account address.
    pub address: Address,
    /// Initial balance in base units.
    pub balance: U256,
}

/// One founding validator.
#[derive(Clone, Debug, Deserialize)]
pub struct GenesisValidator {
    /// Validator address.
    pub address: Address,
    /// Self-stake in chain units.
    pub stake: u128,
    /// Commission in basis points.
    pub commission_bps: u64,
}

/// The chain's initial allocation.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenesisSpec {
    /// Pre-funded accounts.
    pub accounts: Vec<GenesisAccount>,
    /// Founding validators.
    pub validators: Vec<GenesisValidator>,
}

impl GenesisSpec {
    /// Deterministic single-machine development genesis: four funded
    /// accounts derived from fixed seeds, the first three validating.
    pub fn dev() -> Self {
        let addresses: Vec<Address> = (1..=4u8)
            .map(|seed| {
                let keypair = shared_crypto::Ed25519KeyPair::from_seed([seed; 32]);
                Address::from(shared_crypto::derive_address(
                    keypair.public_key().as_bytes(),
                ))
            })
            .collect();

        GenesisSpec {
            accounts: addresses
                .iter()
                .map(|address| GenesisAccount {
                    address: *address,
                    balance: U256::from(10u64).pow(U256::from(21u64)),
                })
                .collect(),
            validators: addresses
                .iter()
                .take(3)
                .enumerate()
                .map(|(idx, address)| GenesisValidator {
                    address: *address,
                    stake: 10_000 - idx as u128 * 1_000,
                    commission_bps: 500,
                })
                .collect(),
        }
    }

    /// Height-0 state snapshot.
    pub fn build_snapshot(&self) -> StateSnapshot {
        StateSnapshot::genesis(self.accounts.iter().map(|a| (a.address, a.balance)))
    }

    /// Registry seeded with the founding validators.
    pub fn build_registry(&self, config: StakingConfig) -> Result<ValidatorRegistry, StakingError> {
        let mut registry = ValidatorRegistry::new(config);
        for validator in &self.validators {
            registry.register(validator.address, validator.stake, validator.commission_bps)?;
        }
        Ok(registry)
    }

    /// Initial circulating supply (sum of genesis balances, saturating).
    pub fn initial_supply(&self) -> u128 {
        self.accounts
            .iter()
            .map(|a| {
                if a.balance > U256::from(u128::MAX) {
                    u128::MAX
                } else {
                    a.balance.as_u128()
                }
            })
            .sum()
    }
}
