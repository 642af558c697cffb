// 11.0.2: result types and errors for engine operations.

use crate::converter::ConverterError;
use crate::governance::GovernanceError;
use crate::ledger::LedgerError;
use crate::math::MathError;
use crate::ownership::OwnershipError;
use crate::rates::RateError;
use crate::settings::SettingsError;
use crate::store::StoreError;
use crate::system_store::SystemStoreError;
use crate::types::{AccountId, Amount, PositionId, Ppm, TokenId};

/// What a removal paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOutcome {
    pub pool_amount: Amount,
    pub reserve_amount: Amount,
    pub target_amount: Amount,
    // reserve tokens sent to the provider right away
    pub paid_amount: Amount,
    // network tokens placed under lock (or paid directly when the lock duration is zero)
    pub locked_amount: Amount,
}

/// Preview of a removal, computed without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveReturn {
    pub target_amount: Amount,
    pub base_amount: Amount,
    pub network_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Portion {0} is outside (0, 100%]")]
    InvalidPortion(Ppm),

    #[error("{token} is not a reserve of pool {pool}")]
    InvalidReserveToken { pool: TokenId, token: TokenId },

    #[error("Both ids are {0}")]
    SameId(PositionId),

    #[error("Positions {0} and {1} are not a matching pair")]
    ProtectionsMismatch(PositionId, PositionId),

    #[error("Removal time precedes the position")]
    InvalidTimestamp,

    #[error("{caller} does not own {id}")]
    AccessDenied { caller: AccountId, id: PositionId },

    #[error("Pool {0} is not registered")]
    UnknownPool(TokenId),

    #[error("Pool {0} is not supported")]
    PoolNotSupported(TokenId),

    #[error("Pool {0} is not whitelisted")]
    PoolNotWhitelisted(TokenId),

    #[error("Adding {reserve} to pool {pool} is disabled")]
    AddLiquidityDisabled { pool: TokenId, reserve: TokenId },

    #[error("Pool {pool} holds {available} network tokens, minting needs {required}")]
    InsufficientLiquidityForMinting {
        pool: TokenId,
        available: Amount,
        required: Amount,
    },

    #[error("Minting {requested} on pool {pool} exceeds limit {limit} ({minted} minted)")]
    MintingLimitExceeded {
        pool: TokenId,
        minted: Amount,
        requested: Amount,
        limit: Amount,
    },

    #[error("{0} cannot be removed in the block it was added")]
    TooEarly(PositionId),

    #[error("Operation already in progress")]
    Reentrancy,

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Rate error: {0}")]
    Rate(#[from] RateError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("System store error: {0}")]
    SystemStore(#[from] SystemStoreError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Ownership error: {0}")]
    Ownership(#[from] OwnershipError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Governance error: {0}")]
    Governance(#[from] GovernanceError),

    #[error("Converter error: {0}")]
    Converter(#[from] ConverterError),
}
