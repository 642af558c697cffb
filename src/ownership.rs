//! Two-phase ownership.
//!
//! The current owner proposes a successor and the successor accepts. Until
//! acceptance the old owner keeps full control, so a mistyped account can
//! never lock a resource.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OwnershipError {
    #[error("{caller} is not the owner")]
    NotOwner { caller: AccountId },

    #[error("{caller} is not the pending owner")]
    NotPendingOwner { caller: AccountId },

    #[error("{0} already owns this resource")]
    SameOwner(AccountId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownable {
    owner: AccountId,
    pending_owner: Option<AccountId>,
}

impl Ownable {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            pending_owner: None,
        }
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn pending_owner(&self) -> Option<AccountId> {
        self.pending_owner
    }

    pub fn only_owner(&self, caller: AccountId) -> Result<(), OwnershipError> {
        if caller != self.owner {
            return Err(OwnershipError::NotOwner { caller });
        }
        Ok(())
    }

    /// Propose `new_owner`. Replaces any earlier proposal.
    pub fn transfer_ownership(
        &mut self,
        caller: AccountId,
        new_owner: AccountId,
    ) -> Result<(), OwnershipError> {
        self.only_owner(caller)?;
        if new_owner == self.owner {
            return Err(OwnershipError::SameOwner(new_owner));
        }
        self.pending_owner = Some(new_owner);
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: AccountId) -> Result<(), OwnershipError> {
        if self.pending_owner != Some(caller) {
            return Err(OwnershipError::NotPendingOwner { caller });
        }
        self.owner = caller;
        self.pending_owner = None;
        Ok(())
    }
}
