// 5.3 system_store.rs: pool tokens owned by the protocol and network tokens it minted, per pool.
// neither counter may go negative.

use crate::math::{self, MathError};
use crate::types::{Amount, TokenId, U256};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SystemStoreError {
    #[error("System balance of {pool} is {available}, cannot take {requested}")]
    InsufficientSystemBalance {
        pool: TokenId,
        requested: Amount,
        available: Amount,
    },

    #[error("Network tokens minted for {pool} is {minted}, cannot retire {requested}")]
    MintedUnderflow {
        pool: TokenId,
        requested: Amount,
        minted: Amount,
    },

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, Default)]
pub struct SystemStore {
    system_balances: HashMap<TokenId, Amount>,
    network_tokens_minted: HashMap<TokenId, Amount>,
}

impl SystemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system_balance(&self, pool: TokenId) -> Amount {
        self.system_balances.get(&pool).copied().unwrap_or_else(U256::zero)
    }

    pub fn inc_system_balance(&mut self, pool: TokenId, amount: Amount) -> Result<Amount, SystemStoreError> {
        let balance = math::add(self.system_balance(pool), amount)?;
        self.system_balances.insert(pool, balance);
        Ok(balance)
    }

    pub fn dec_system_balance(&mut self, pool: TokenId, amount: Amount) -> Result<Amount, SystemStoreError> {
        let available = self.system_balance(pool);
        if amount > available {
            return Err(SystemStoreError::InsufficientSystemBalance {
                pool,
                requested: amount,
                available,
            });
        }
        let balance = available - amount;
        self.system_balances.insert(pool, balance);
        Ok(balance)
    }

    pub fn network_tokens_minted(&self, pool: TokenId) -> Amount {
        self.network_tokens_minted.get(&pool).copied().unwrap_or_else(U256::zero)
    }

    pub fn inc_network_tokens_minted(&mut self, pool: TokenId, amount: Amount) -> Result<Amount, SystemStoreError> {
        let minted = math::add(self.network_tokens_minted(pool), amount)?;
        self.network_tokens_minted.insert(pool, minted);
        Ok(minted)
    }

    pub fn dec_network_tokens_minted(&mut self, pool: TokenId, amount: Amount) -> Result<Amount, SystemStoreError> {
        let minted = self.network_tokens_minted(pool);
        if amount > minted {
            return Err(SystemStoreError::MintedUnderflow {
                pool,
                requested: amount,
                minted,
            });
        }
        let remaining = minted - amount;
        self.network_tokens_minted.insert(pool, remaining);
        Ok(remaining)
    }
}
