//! Engine configuration options.

use crate::types::{AccountId, TokenId};

/// Identities the engine works with and how much history it keeps.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reserve token every supported pool pairs against.
    pub network_token: TokenId,
    /// Token minted to providers of network token liquidity.
    pub gov_token: TokenId,
    /// Account the engine acts as on the ledger and on converters.
    pub protection_account: AccountId,
    /// Custody account for protocol-owned pool tokens and locked network tokens.
    pub wallet: AccountId,
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
}

impl EngineConfig {
    pub fn new(network_token: TokenId, gov_token: TokenId, protection_account: AccountId, wallet: AccountId) -> Self {
        Self {
            network_token,
            gov_token,
            protection_account,
            wallet,
            max_events: 100_000,
        }
    }
}
