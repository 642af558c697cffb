// 5.0 store.rs: protected positions and time-locked balances.
// 5.1 positions: ids are monotonic and never reused, amounts only shrink.
// 5.2 locked balances: per provider list, removal keeps the order of the rest.

use crate::math::{self, Fraction, MathError};
use crate::types::{serde_u256, AccountId, Amount, PositionId, Timestamp, TokenId, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Position amounts and rate must be non-zero")]
    ZeroAmount,

    #[error("Position {0} cannot grow")]
    AmountIncrease(PositionId),

    #[error("Position {0} does not exist")]
    InvalidId(PositionId),

    #[error("Locked balance {index} of {provider} does not exist")]
    InvalidIndex { provider: AccountId, index: usize },

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedPosition {
    pub id: PositionId,
    pub provider: AccountId,
    pub pool_token: TokenId,
    pub reserve_token: TokenId,
    #[serde(with = "serde_u256")]
    pub pool_amount: Amount,
    #[serde(with = "serde_u256")]
    pub reserve_amount: Amount,
    // spot rate of the reserve token at add time
    pub reserve_rate: Fraction,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedBalance {
    #[serde(with = "serde_u256")]
    pub amount: Amount,
    pub expiration_time: Timestamp,
}

impl LockedBalance {
    pub fn is_claimable(&self, now: Timestamp) -> bool {
        self.expiration_time <= now
    }
}

/// Fields of a new position. The store assigns the id.
#[derive(Debug, Clone, Copy)]
pub struct NewPosition {
    pub provider: AccountId,
    pub pool_token: TokenId,
    pub reserve_token: TokenId,
    pub pool_amount: Amount,
    pub reserve_amount: Amount,
    pub reserve_rate: Fraction,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone)]
pub struct PositionStore {
    positions: HashMap<PositionId, ProtectedPosition>,
    provider_positions: BTreeMap<AccountId, Vec<PositionId>>,
    locked_balances: HashMap<AccountId, Vec<LockedBalance>>,
    next_position_id: u64,
}

impl Default for PositionStore {
    fn default() -> Self {
        Self {
            positions: HashMap::new(),
            provider_positions: BTreeMap::new(),
            locked_balances: HashMap::new(),
            next_position_id: 1,
        }
    }
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    // 5.1: positions

    pub fn add_position(&mut self, new: NewPosition) -> Result<PositionId, StoreError> {
        if new.pool_amount.is_zero() || new.reserve_amount.is_zero() || new.reserve_rate.d.is_zero() {
            return Err(StoreError::ZeroAmount);
        }

        let id = PositionId(self.next_position_id);
        self.next_position_id += 1;

        self.positions.insert(
            id,
            ProtectedPosition {
                id,
                provider: new.provider,
                pool_token: new.pool_token,
                reserve_token: new.reserve_token,
                pool_amount: new.pool_amount,
                reserve_amount: new.reserve_amount,
                reserve_rate: new.reserve_rate,
                timestamp: new.timestamp,
            },
        );
        self.provider_positions.entry(new.provider).or_default().push(id);

        tracing::debug!(%id, provider = %new.provider, pool = %new.pool_token, "position stored");
        Ok(id)
    }

    pub fn position(&self, id: PositionId) -> Option<&ProtectedPosition> {
        self.positions.get(&id)
    }

    pub fn update_amounts(
        &mut self,
        id: PositionId,
        pool_amount: Amount,
        reserve_amount: Amount,
    ) -> Result<(), StoreError> {
        let position = self.positions.get(&id).ok_or(StoreError::InvalidId(id))?;
        if pool_amount.is_zero() || reserve_amount.is_zero() {
            return Err(StoreError::ZeroAmount);
        }
        if pool_amount > position.pool_amount || reserve_amount > position.reserve_amount {
            return Err(StoreError::AmountIncrease(id));
        }

        if let Some(position) = self.positions.get_mut(&id) {
            position.pool_amount = pool_amount;
            position.reserve_amount = reserve_amount;
        }
        Ok(())
    }

    pub fn remove_position(&mut self, id: PositionId) -> Result<ProtectedPosition, StoreError> {
        let position = self.positions.remove(&id).ok_or(StoreError::InvalidId(id))?;

        if let Some(ids) = self.provider_positions.get_mut(&position.provider) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.provider_positions.remove(&position.provider);
            }
        }
        Ok(position)
    }

    pub fn provider_position_ids(&self, provider: AccountId) -> &[PositionId] {
        self.provider_positions
            .get(&provider)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn provider_positions(&self, provider: AccountId) -> impl Iterator<Item = &ProtectedPosition> {
        self.provider_position_ids(provider)
            .iter()
            .filter_map(|id| self.positions.get(id))
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    // totals per pool and reserve live in ProtectionStats
    pub fn positions(&self) -> impl Iterator<Item = &ProtectedPosition> {
        self.positions.values()
    }

    // 5.2: locked balances

    pub fn add_locked_balance(
        &mut self,
        provider: AccountId,
        amount: Amount,
        expiration_time: Timestamp,
    ) -> Result<usize, StoreError> {
        if amount.is_zero() {
            return Err(StoreError::ZeroAmount);
        }
        let balances = self.locked_balances.entry(provider).or_default();
        balances.push(LockedBalance {
            amount,
            expiration_time,
        });
        Ok(balances.len() - 1)
    }

    pub fn locked_balance(&self, provider: AccountId, index: usize) -> Option<&LockedBalance> {
        self.locked_balances.get(&provider)?.get(index)
    }

    pub fn locked_balance_count(&self, provider: AccountId) -> usize {
        self.locked_balances.get(&provider).map_or(0, Vec::len)
    }

    pub fn locked_balances(&self, provider: AccountId) -> &[LockedBalance] {
        self.locked_balances
            .get(&provider)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // [start, end) with end clamped to the list length. an empty slice when start >= end.
    pub fn locked_balance_range(&self, provider: AccountId, start: usize, end: usize) -> &[LockedBalance] {
        let balances = self.locked_balances(provider);
        let end = end.min(balances.len());
        if start >= end {
            return &[];
        }
        &balances[start..end]
    }

    pub fn remove_locked_balance(
        &mut self,
        provider: AccountId,
        index: usize,
    ) -> Result<LockedBalance, StoreError> {
        let balances = self
            .locked_balances
            .get_mut(&provider)
            .filter(|balances| index < balances.len())
            .ok_or(StoreError::InvalidIndex { provider, index })?;
        let removed = balances.remove(index);
        if balances.is_empty() {
            self.locked_balances.remove(&provider);
        }
        Ok(removed)
    }

    pub fn total_locked(&self, provider: AccountId) -> Result<Amount, StoreError> {
        self.locked_balances(provider)
            .iter()
            .try_fold(U256::zero(), |acc, balance| math::add(acc, balance.amount))
            .map_err(StoreError::from)
    }
}
