// 7.0 ledger.rs: token balances. the engine only sees the trait;
// InMemoryLedger backs tests and the simulator.

use crate::types::{AccountId, Amount, TokenId};
use std::collections::HashMap;
use std::fmt::Debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient {token} balance for {owner}: requested {requested}, available {available}")]
    InsufficientBalance {
        token: TokenId,
        owner: AccountId,
        requested: Amount,
        available: Amount,
    },

    #[error("Supply of {0} would overflow")]
    SupplyOverflow(TokenId),
}

/// Token balances across every token the engine touches.
///
/// `box_clone` lets the engine snapshot the ledger before a mutation and
/// restore it if the mutation fails part way.
pub trait TokenLedger: Debug {
    fn balance_of(&self, token: TokenId, owner: AccountId) -> Amount;

    fn total_supply(&self, token: TokenId) -> Amount;

    fn transfer(
        &mut self,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    // raw issuance. authority checks belong to TokenGovernance / converters
    fn mint(&mut self, token: TokenId, to: AccountId, amount: Amount) -> Result<(), LedgerError>;

    fn burn(&mut self, token: TokenId, from: AccountId, amount: Amount) -> Result<(), LedgerError>;

    fn box_clone(&self) -> Box<dyn TokenLedger>;
}

impl Clone for Box<dyn TokenLedger> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: HashMap<(TokenId, AccountId), Amount>,
    supplies: HashMap<TokenId, Amount>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn debit(&mut self, token: TokenId, owner: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let available = self.balance_of(token, owner);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                token,
                owner,
                requested: amount,
                available,
            });
        }
        self.balances.insert((token, owner), available - amount);
        Ok(())
    }

    fn credit(&mut self, token: TokenId, owner: AccountId, amount: Amount) {
        // bounded by total supply, which is checked on mint
        let entry = self.balances.entry((token, owner)).or_default();
        *entry = *entry + amount;
    }
}

impl TokenLedger for InMemoryLedger {
    fn balance_of(&self, token: TokenId, owner: AccountId) -> Amount {
        self.balances.get(&(token, owner)).copied().unwrap_or_default()
    }

    fn total_supply(&self, token: TokenId) -> Amount {
        self.supplies.get(&token).copied().unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: TokenId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.debit(token, from, amount)?;
        self.credit(token, to, amount);
        Ok(())
    }

    fn mint(&mut self, token: TokenId, to: AccountId, amount: Amount) -> Result<(), LedgerError> {
        let supply = self
            .total_supply(token)
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow(token))?;
        self.supplies.insert(token, supply);
        self.credit(token, to, amount);
        Ok(())
    }

    fn burn(&mut self, token: TokenId, from: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.debit(token, from, amount)?;
        let supply = self.total_supply(token);
        self.supplies.insert(token, supply - amount);
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn TokenLedger> {
        Box::new(self.clone())
    }
}
