//! Validator registry.
//!
//! All stake is modelled as delegations; a validator's self-stake is its
//! delegation to itself. `total_stake` of a record therefore equals the
//! sum of its delegation amounts, and the registry-wide total equals the
//! sum over all records.

use crate::config::StakingConfig;
use crate::errors::StakingError;
use crate::slashing::{rule_for, SlashingEvent, ViolationKind};
use serde::{Deserialize, Serialize};
use shared_types::{Address, Timestamp};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Jail sentinel for permanent (Byzantine) violations.
pub const JAILED_FOREVER: Timestamp = u64::MAX;

/// Fixed-point precision of `acc_rewards_per_share`.
const ACC_PRECISION: u128 = 1_000_000_000_000;

/// Basis-point denominator.
const BPS: u128 = 10_000;

/// Lifecycle state of a validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorStatus {
    /// Eligible for proposer rotation.
    Active,
    /// Registered but not rotating (displaced or below minimum).
    Inactive,
    /// Punished; excluded until `jailed_until`.
    Jailed,
    /// Winding down; stake in the unbonding queue.
    Unbonding,
}

/// One validator's registry record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Validator address.
    pub address: Address,
    /// Sum of all delegations to this validator, self-stake included.
    pub total_stake: u128,
    /// Commission on distributed rewards, in basis points.
    pub commission_bps: u64,
    /// Lifecycle state.
    pub status: ValidatorStatus,
    /// Jail expiry; [`JAILED_FOREVER`] for permanent jailing.
    pub jailed_until: Timestamp,
    /// Cumulative performance score in [0, 1].
    pub performance: f64,
    /// Reward accumulator per stake unit, fixed-point `ACC_PRECISION`.
    pub acc_rewards_per_share: u128,
    /// Commission earnings claimable by the validator itself.
    pub commission_rewards: u128,
}

/// One delegation position.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Delegation {
    amount: u128,
    reward_debt: u128,
    unclaimed: u128,
}

/// An undelegation waiting out the unbonding period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingEntry {
    /// Validator the stake leaves.
    pub validator: Address,
    /// Owner of the released funds.
    pub delegator: Address,
    /// Amount released at expiry.
    pub amount: u128,
    /// Release timestamp.
    pub release_at: Timestamp,
}

/// Periodic performance inputs for one validator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PerformanceMetrics {
    /// Fraction of expected liveness, in [0, 1].
    pub uptime: f64,
    /// Responsiveness score, in [0, 1].
    pub response_score: f64,
    /// Count of downtime incidents in the window.
    pub downtime_events: u32,
}

/// Stake table, delegations, unbonding queue and event log.
#[derive(Debug, Default)]
pub struct ValidatorRegistry {
    config: StakingConfig,
    validators: BTreeMap<Address, ValidatorRecord>,
    delegations: BTreeMap<(Address, Address), Delegation>,
    unbonding: Vec<UnbondingEntry>,
    events: Vec<SlashingEvent>,
    epoch: u64,
}

impl ValidatorRegistry {
    /// Empty registry.
    pub fn new(config: StakingConfig) -> Self {
        Self {
            config,
            validators: BTreeMap::new(),
            delegations: BTreeMap::new(),
            unbonding: Vec::new(),
            events: Vec::new(),
            epoch: 0,
        }
    }

    /// Current epoch counter.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Record lookup.
    pub fn get(&self, address: &Address) -> Option<&ValidatorRecord> {
        self.validators.get(address)
    }

    /// Registry-wide total stake.
    pub fn total_stake(&self) -> u128 {
        self.validators.values().map(|v| v.total_stake).sum()
    }

    /// Sum of all delegation amounts (invariant checks).
    pub fn delegation_total(&self) -> u128 {
        self.delegations.values().map(|d| d.amount).sum()
    }

    /// Slashing events so far.
    pub fn slashing_events(&self) -> &[SlashingEvent] {
        &self.events
    }

    /// Register a validator with `self_stake`.
    ///
    /// Requires `self_stake ≥ MinValidatorStake`. At capacity, the lowest
    /// staked active validator is displaced iff the arriving stake is
    /// strictly greater; otherwise registration is refused.
    pub fn register(
        &mut self,
        address: Address,
        self_stake: u128,
        commission_bps: u64,
    ) -> Result<(), StakingError> {
        if self_stake < self.config.min_validator_stake {
            return Err(StakingError::StakeBelowMinimum {
                got: self_stake,
                min: self.config.min_validator_stake,
            });
        }

        let active: Vec<(Address, u128)> = self
            .validators
            .values()
            .filter(|v| v.status == ValidatorStatus::Active)
            .map(|v| (v.address, v.total_stake))
            .collect();

        if active.len() >= self.config.max_validators {
            let (lowest_addr, lowest_stake) = active
                .iter()
                .min_by_key(|(address, stake)| (*stake, *address))
                .copied()
                .expect("non-empty active set");
            if self_stake <= lowest_stake {
                return Err(StakingError::CapacityFull {
                    lowest: lowest_stake,
                });
            }
            if let Some(displaced) = self.validators.get_mut(&lowest_addr) {
                displaced.status = ValidatorStatus::Inactive;
                info!(displaced = ?lowest_addr, "validator displaced by higher stake");
            }
        }

        self.validators.insert(
            address,
            ValidatorRecord {
                address,
                total_stake: 0,
                commission_bps,
                status: ValidatorStatus::Active,
                jailed_until: 0,
                performance: 1.0,
                acc_rewards_per_share: 0,
                commission_rewards: 0,
            },
        );
        // Self-stake is a delegation like any other.
        self.bond(address, address, self_stake)?;
        info!(validator = ?address, stake = self_stake, "validator registered");
        Ok(())
    }

    /// Delegate `amount` to a validator.
    pub fn bond(
        &mut self,
        validator: Address,
        delegator: Address,
        amount: u128,
    ) -> Result<(), StakingError> {
        let record = self
            .validators
            .get_mut(&validator)
            .ok_or(StakingError::UnknownValidator(validator))?;
        if record.status == ValidatorStatus::Jailed {
            return Err(StakingError::Jailed(validator));
        }

        let acc = record.acc_rewards_per_share;
        let delegation = self
            .delegations
            .entry((validator, delegator))
            .or_default();
        // Settle what is pending before the position changes size.
        delegation.unclaimed += pending_of(delegation, acc);
        delegation.amount += amount;
        delegation.reward_debt = delegation.amount * acc / ACC_PRECISION;

        record.total_stake += amount;
        debug!(validator = ?validator, delegator = ?delegator, amount, "stake bonded");
        Ok(())
    }

    /// Start undelegating `amount`; funds release after the unbonding
    /// period.
    pub fn unbond(
        &mut self,
        validator: Address,
        delegator: Address,
        amount: u128,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        let record = self
            .validators
            .get_mut(&validator)
            .ok_or(StakingError::UnknownValidator(validator))?;

        let delegation = self
            .delegations
            .get_mut(&(validator, delegator))
            .ok_or(StakingError::UnknownDelegation {
                validator,
                delegator,
            })?;
        if delegation.amount < amount {
            return Err(StakingError::InsufficientDelegation {
                have: delegation.amount,
                requested: amount,
            });
        }

        let acc = record.acc_rewards_per_share;
        delegation.unclaimed += pending_of(delegation, acc);
        delegation.amount -= amount;
        delegation.reward_debt = delegation.amount * acc / ACC_PRECISION;
        record.total_stake -= amount;

        self.unbonding.push(UnbondingEntry {
            validator,
            delegator,
            amount,
            release_at: now + self.config.unbonding_period_ms,
        });

        // A validator whose self-stake fell below the minimum stops
        // rotating.
        if validator == delegator {
            let self_left = self
                .delegations
                .get(&(validator, validator))
                .map(|d| d.amount)
                .unwrap_or(0);
            if self_left < self.config.min_validator_stake {
                if let Some(record) = self.validators.get_mut(&validator) {
                    record.status = ValidatorStatus::Unbonding;
                    warn!(validator = ?validator, "self-stake below minimum, unbonding");
                }
            }
        }
        Ok(())
    }

    /// Release matured unbonding entries. Returns (delegator, amount)
    /// pairs whose funds are liquid again.
    pub fn process_unbonding(&mut self, now: Timestamp) -> Vec<(Address, u128)> {
        let (ready, waiting): (Vec<UnbondingEntry>, Vec<UnbondingEntry>) = self
            .unbonding
            .drain(..)
            .partition(|entry| entry.release_at <= now);
        self.unbonding = waiting;
        ready
            .into_iter()
            .map(|entry| (entry.delegator, entry.amount))
            .collect()
    }

    /// Apply violation evidence: debit stake, jail, log the event.
    pub fn slash(
        &mut self,
        address: Address,
        kind: ViolationKind,
        evidence: Vec<u8>,
        height: u64,
        now: Timestamp,
    ) -> Result<(), StakingError> {
        let record = self
            .validators
            .get_mut(&address)
            .ok_or(StakingError::UnknownValidator(address))?;

        let rule = rule_for(kind);
        let slashed = record.total_stake * rule.fraction_bps as u128 / BPS;
        let jailed_until = if rule.permanent {
            JAILED_FOREVER
        } else {
            now + rule.jail_ms
        };

        record.status = ValidatorStatus::Jailed;
        record.jailed_until = jailed_until;

        // Debit pro-rata across the validator's delegations so the stake
        // table and delegation table stay consistent.
        let total = record.total_stake;
        if total > 0 && slashed > 0 {
            let mut debited = 0u128;
            let keys: Vec<(Address, Address)> = self
                .delegations
                .range((address, Address::zero())..)
                .take_while(|((v, _), _)| *v == address)
                .map(|(k, _)| *k)
                .collect();
            for key in &keys {
                if let Some(delegation) = self.delegations.get_mut(key) {
                    let cut = delegation.amount * slashed / total;
                    delegation.amount -= cut;
                    debited += cut;
                }
            }
            // Rounding remainder lands on the self-delegation.
            if debited < slashed {
                if let Some(own) = self.delegations.get_mut(&(address, address)) {
                    let rest = (slashed - debited).min(own.amount);
                    own.amount -= rest;
                    debited += rest;
                }
            }
            if let Some(record) = self.validators.get_mut(&address) {
                record.total_stake -= debited;
            }
        }

        warn!(validator = ?address, ?kind, slashed, "validator slashed");
        self.events.push(SlashingEvent {
            validator: address,
            kind,
            height,
            slashed_amount: slashed,
            evidence,
            jailed_until,
        });
        Ok(())
    }

    /// Reactivate validators whose jail expired.
    pub fn unjail_expired(&mut self, now: Timestamp) {
        for record in self.validators.values_mut() {
            if record.status == ValidatorStatus::Jailed
                && record.jailed_until != JAILED_FOREVER
                && record.jailed_until <= now
            {
                record.status = ValidatorStatus::Active;
                record.jailed_until = 0;
                info!(validator = ?record.address, "jail expired, reactivated");
            }
        }
    }

    /// Update a validator's performance score:
    /// `clamp(0.7·uptime + 0.3·response − 0.05·downtime_events, 0, 1)`.
    pub fn performance(
        &mut self,
        address: Address,
        metrics: PerformanceMetrics,
    ) -> Result<(), StakingError> {
        let record = self
            .validators
            .get_mut(&address)
            .ok_or(StakingError::UnknownValidator(address))?;
        let score = 0.7 * metrics.uptime + 0.3 * metrics.response_score
            - 0.05 * metrics.downtime_events as f64;
        record.performance = score.clamp(0.0, 1.0);
        Ok(())
    }

    /// Active validators, stake descending with address tiebreak.
    ///
    /// Deep copies: proposer selection iterates without registry access.
    pub fn active_validators(&self) -> Vec<ValidatorRecord> {
        let mut active: Vec<ValidatorRecord> = self
            .validators
            .values()
            .filter(|v| v.status == ValidatorStatus::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            b.total_stake
                .cmp(&a.total_stake)
                .then(a.address.cmp(&b.address))
        });
        active
    }

    /// Distribute a reward pool to one validator: commission to the
    /// validator, remainder to its delegators through the accumulator.
    pub fn distribute(&mut self, reward_pool: u128, validator: Address) -> Result<(), StakingError> {
        let record = self
            .validators
            .get_mut(&validator)
            .ok_or(StakingError::UnknownValidator(validator))?;

        let commission = reward_pool * record.commission_bps as u128 / BPS;
        let to_delegators = reward_pool - commission;

        if record.total_stake == 0 {
            // No shares to spread over; everything becomes commission.
            record.commission_rewards += reward_pool;
            return Ok(());
        }

        record.commission_rewards += commission;
        record.acc_rewards_per_share += to_delegators * ACC_PRECISION / record.total_stake;
        debug!(validator = ?validator, reward_pool, commission, "rewards distributed");
        Ok(())
    }

    /// Distribute a pool across all active validators, weighted by
    /// stake × performance (the epoch treasury payout).
    pub fn distribute_weighted(&mut self, reward_pool: u128) {
        let weights: Vec<(Address, f64)> = self
            .validators
            .values()
            .filter(|v| v.status == ValidatorStatus::Active)
            .map(|v| (v.address, v.total_stake as f64 * v.performance))
            .collect();
        let total_weight: f64 = weights.iter().map(|(_, w)| w).sum();
        if total_weight <= 0.0 {
            return;
        }

        for (address, weight) in weights {
            let share = (reward_pool as f64 * weight / total_weight) as u128;
            if share > 0 {
                // Active validators always exist here.
                let _ = self.distribute(share, address);
            }
        }
    }

    /// Advance the epoch counter (performance rollup hook).
    pub fn epoch_rollup(&mut self) -> u64 {
        self.epoch += 1;
        info!(epoch = self.epoch, "epoch rolled up");
        self.epoch
    }

    /// Pending (unclaimed) rewards of one delegation.
    pub fn pending_rewards(&self, validator: &Address, delegator: &Address) -> u128 {
        let Some(record) = self.validators.get(validator) else {
            return 0;
        };
        let Some(delegation) = self.delegations.get(&(*validator, *delegator)) else {
            return 0;
        };
        delegation.unclaimed + pending_of(delegation, record.acc_rewards_per_share)
    }

    /// Claim a delegation's rewards; resets the reward debt.
    pub fn claim(
        &mut self,
        validator: Address,
        delegator: Address,
    ) -> Result<u128, StakingError> {
        let record = self
            .validators
            .get(&validator)
            .ok_or(StakingError::UnknownValidator(validator))?;
        let acc = record.acc_rewards_per_share;
        let delegation = self
            .delegations
            .get_mut(&(validator, delegator))
            .ok_or(StakingError::UnknownDelegation {
                validator,
                delegator,
            })?;

        let payout = delegation.unclaimed + pending_of(delegation, acc);
        delegation.unclaimed = 0;
        delegation.reward_debt = delegation.amount * acc / ACC_PRECISION;
        Ok(payout)
    }

    /// Validator's own commission earnings, claimable separately from its
    /// self-delegation.
    pub fn commission_rewards(&self, validator: &Address) -> u128 {
        self.validators
            .get(validator)
            .map(|v| v.commission_rewards)
            .unwrap_or(0)
    }
}

/// `amount × acc − reward_debt`, the accumulator scheme's pending value.
fn pending_of(delegation: &Delegation, acc: u128) -> u128 {
    (delegation.amount * acc / ACC_PRECISION).saturating_sub(delegation.reward_debt)
}
