// 7.1 governance.rs: mint/burn authority over a single token.
// the engine holds one of these for the network token and one for the governance token.

use crate::ledger::{LedgerError, TokenLedger};
use crate::ownership::{Ownable, OwnershipError};
use crate::types::{AccountId, Amount, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GovernanceError {
    #[error("{caller} may not mint {token}")]
    NotMinter { caller: AccountId, token: TokenId },

    #[error("Ownership error: {0}")]
    Ownership(#[from] OwnershipError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGovernance {
    token: TokenId,
    ownership: Ownable,
    minters: BTreeSet<AccountId>,
}

impl TokenGovernance {
    pub fn new(token: TokenId, owner: AccountId) -> Self {
        Self {
            token,
            ownership: Ownable::new(owner),
            minters: BTreeSet::new(),
        }
    }

    pub fn token(&self) -> TokenId {
        self.token
    }

    pub fn ownership(&self) -> &Ownable {
        &self.ownership
    }

    pub fn ownership_mut(&mut self) -> &mut Ownable {
        &mut self.ownership
    }

    pub fn is_minter(&self, account: AccountId) -> bool {
        self.minters.contains(&account)
    }

    pub fn add_minter(&mut self, caller: AccountId, minter: AccountId) -> Result<(), GovernanceError> {
        self.ownership.only_owner(caller)?;
        self.minters.insert(minter);
        Ok(())
    }

    pub fn remove_minter(&mut self, caller: AccountId, minter: AccountId) -> Result<(), GovernanceError> {
        self.ownership.only_owner(caller)?;
        self.minters.remove(&minter);
        Ok(())
    }

    pub fn mint(
        &self,
        ledger: &mut dyn TokenLedger,
        caller: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), GovernanceError> {
        if !self.is_minter(caller) {
            return Err(GovernanceError::NotMinter {
                caller,
                token: self.token,
            });
        }
        ledger.mint(self.token, to, amount)?;
        Ok(())
    }

    // holders burn their own tokens, no authority needed
    pub fn burn(
        &self,
        ledger: &mut dyn TokenLedger,
        holder: AccountId,
        amount: Amount,
    ) -> Result<(), GovernanceError> {
        ledger.burn(self.token, holder, amount)?;
        Ok(())
    }
}
