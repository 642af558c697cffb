// 12.0 sandbox.rs: a ready engine around one seeded base/network pool.
// drives the simulator and the integration tests. ids are fixed so scenarios read the same everywhere.

use crate::config::ProtectionParams;
use crate::converter::{LiquidityPoolConverter, StandardPoolConverter};
use crate::engine::{Collaborators, Engine, EngineConfig, EngineError};
use crate::governance::TokenGovernance;
use crate::ledger::{InMemoryLedger, LedgerError, TokenLedger};
use crate::registry::ConverterRegistry;
use crate::settings::Settings;
use crate::types::{AccountId, Timestamp, TokenId, U256};

pub const NETWORK_TOKEN: TokenId = TokenId(1);
pub const GOV_TOKEN: TokenId = TokenId(2);
pub const BASE_TOKEN: TokenId = TokenId(3);
pub const POOL_TOKEN: TokenId = TokenId(10);

pub const OWNER: AccountId = AccountId(1);
pub const PROTECTION_ACCOUNT: AccountId = AccountId(100);
pub const WALLET: AccountId = AccountId(101);
pub const CONVERTER_ACCOUNT: AccountId = AccountId(200);
// supplies the initial pool liquidity
pub const SEED_PROVIDER: AccountId = AccountId(300);

pub const GENESIS: Timestamp = Timestamp(1_700_000_000);

#[derive(Debug, Clone)]
pub struct Sandbox {
    params: ProtectionParams,
    base_reserve: u64,
    network_reserve: u64,
    start_time: Timestamp,
}

impl Sandbox {
    pub fn new(params: ProtectionParams, base_reserve: u64, network_reserve: u64) -> Self {
        Self {
            params,
            base_reserve,
            network_reserve,
            start_time: GENESIS,
        }
    }

    pub fn development(base_reserve: u64, network_reserve: u64) -> Self {
        Self::new(ProtectionParams::development(), base_reserve, network_reserve)
    }

    pub fn start_time(mut self, start_time: Timestamp) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn build(&self) -> Result<Engine, EngineError> {
        let base = U256::from(self.base_reserve);
        let network = U256::from(self.network_reserve);

        let mut ledger = InMemoryLedger::new();
        ledger.mint(BASE_TOKEN, SEED_PROVIDER, base)?;
        ledger.mint(NETWORK_TOKEN, SEED_PROVIDER, network)?;

        let mut converter = StandardPoolConverter::new(POOL_TOKEN, CONVERTER_ACCOUNT, [BASE_TOKEN, NETWORK_TOKEN]);
        converter.add_liquidity(
            &mut ledger,
            SEED_PROVIDER,
            &[BASE_TOKEN, NETWORK_TOKEN],
            &[base, network],
            U256::one(),
        )?;
        let mut converters = ConverterRegistry::new();
        converters.register(Box::new(converter));

        let mut network_governance = TokenGovernance::new(NETWORK_TOKEN, OWNER);
        network_governance.add_minter(OWNER, PROTECTION_ACCOUNT)?;
        let mut gov_governance = TokenGovernance::new(GOV_TOKEN, OWNER);
        gov_governance.add_minter(OWNER, PROTECTION_ACCOUNT)?;

        let settings = Settings::new(OWNER, NETWORK_TOKEN, self.params.clone())?;
        let config = EngineConfig::new(NETWORK_TOKEN, GOV_TOKEN, PROTECTION_ACCOUNT, WALLET);
        let mut engine = Engine::new(
            config,
            settings,
            Collaborators {
                ledger: Box::new(ledger),
                converters,
                network_governance,
                gov_governance,
            },
        );
        engine.set_time(self.start_time);
        engine.whitelist_pool(OWNER, POOL_TOKEN)?;
        Ok(engine)
    }
}

/// Mints `amount` of `token` straight to `account`.
pub fn fund(engine: &mut Engine, account: AccountId, token: TokenId, amount: u64) -> Result<(), LedgerError> {
    engine.ledger_mut().mint(token, account, U256::from(amount))
}
