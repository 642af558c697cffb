// 5.4 stats.rs: protected totals per pool, per reserve and per provider.
// kept apart from the position store so reporting never walks positions.

use crate::math::{self, MathError};
use crate::types::{AccountId, Amount, TokenId, U256};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct ProtectionStats {
    pool_amounts: HashMap<TokenId, Amount>,
    reserve_amounts: HashMap<(TokenId, TokenId), Amount>,
    provider_amounts: HashMap<(AccountId, TokenId, TokenId), Amount>,
    provider_pools: HashMap<AccountId, BTreeSet<TokenId>>,
}

impl ProtectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increase_total_amounts(
        &mut self,
        provider: AccountId,
        pool: TokenId,
        reserve: TokenId,
        pool_amount: Amount,
        reserve_amount: Amount,
    ) -> Result<(), MathError> {
        let pool_total = math::add(self.total_pool_amount(pool), pool_amount)?;
        let reserve_total = math::add(self.total_reserve_amount(pool, reserve), reserve_amount)?;
        let provider_total = math::add(self.total_provider_amount(provider, pool, reserve), reserve_amount)?;

        self.pool_amounts.insert(pool, pool_total);
        self.reserve_amounts.insert((pool, reserve), reserve_total);
        self.provider_amounts.insert((provider, pool, reserve), provider_total);
        Ok(())
    }

    pub fn decrease_total_amounts(
        &mut self,
        provider: AccountId,
        pool: TokenId,
        reserve: TokenId,
        pool_amount: Amount,
        reserve_amount: Amount,
    ) -> Result<(), MathError> {
        let pool_total = math::sub(self.total_pool_amount(pool), pool_amount)?;
        let reserve_total = math::sub(self.total_reserve_amount(pool, reserve), reserve_amount)?;
        let provider_total = math::sub(self.total_provider_amount(provider, pool, reserve), reserve_amount)?;

        self.pool_amounts.insert(pool, pool_total);
        self.reserve_amounts.insert((pool, reserve), reserve_total);
        self.provider_amounts.insert((provider, pool, reserve), provider_total);
        Ok(())
    }

    // returns false when the pool was already listed
    pub fn add_provider_pool(&mut self, provider: AccountId, pool: TokenId) -> bool {
        self.provider_pools.entry(provider).or_default().insert(pool)
    }

    pub fn total_pool_amount(&self, pool: TokenId) -> Amount {
        self.pool_amounts.get(&pool).copied().unwrap_or_else(U256::zero)
    }

    pub fn total_reserve_amount(&self, pool: TokenId, reserve: TokenId) -> Amount {
        self.reserve_amounts.get(&(pool, reserve)).copied().unwrap_or_else(U256::zero)
    }

    pub fn total_provider_amount(&self, provider: AccountId, pool: TokenId, reserve: TokenId) -> Amount {
        self.provider_amounts
            .get(&(provider, pool, reserve))
            .copied()
            .unwrap_or_else(U256::zero)
    }

    pub fn provider_pools(&self, provider: AccountId) -> Vec<TokenId> {
        self.provider_pools
            .get(&provider)
            .map(|pools| pools.iter().copied().collect())
            .unwrap_or_default()
    }
}
