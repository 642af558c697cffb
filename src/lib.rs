// liquidity-protection: impermanent loss protection for AMM liquidity providers.
// providers deposit one side of a base/network pool, the protocol co-invests the other
// side, and on removal the provider is compensated for impermanent loss over time.
// all computation is integer fraction math over 256 bits, deterministic, no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, TokenId, PositionId, Ppm, Timestamp, U256
//   2.x  math.rs: Fraction, checked arithmetic, square roots, ratio reduction
//   3.x  rates.rs: spot/average rates, deviation check, pool token rate, packing
//   4.x  compensation.rs: protected amount, impermanent loss, protection level, target amount
//   5.x  store.rs: protected positions and locked balances
//   5.3  system_store.rs: protocol owned pool tokens, network tokens minted
//   5.4  stats.rs: protected totals per pool, reserve and provider
//   6.x  settings.rs: whitelist, minting limits, schedule, add switches
//   6.5  ownership.rs: two-phase ownership
//   7.x  ledger.rs: token balances (trait + in-memory)
//   7.1  governance.rs: mint/burn authority
//   8.x  converter.rs: AMM pool interface + standard pool
//   8.1  registry.rs: pool anchor → converter
//   9.x  events.rs: audit log and subscriber notices
//   10.x config.rs: protection params, env presets, json loading
//   11.x engine/: add, remove, unprotect, claim, atomic execution
//   12.x sandbox.rs: seeded single pool engine for the simulator and tests

// core protection modules
pub mod compensation;
pub mod engine;
pub mod math;
pub mod rates;
pub mod types;

// state
pub mod settings;
pub mod stats;
pub mod store;
pub mod system_store;

// collaborators
pub mod converter;
pub mod governance;
pub mod ledger;
pub mod ownership;
pub mod registry;

// integration modules
pub mod config;
pub mod events;
pub mod sandbox;

// re exports for convenience
pub use compensation::{ProtectionSchedule, RemovalInputs, TargetBreakdown};
pub use config::{ConfigError, Environment, ProtectionParams};
pub use converter::{
    ConverterCapabilities, ConverterError, ConverterType, LiquidityPoolConverter, StandardPoolConverter,
};
pub use engine::*;
pub use events::*;
pub use governance::{GovernanceError, TokenGovernance};
pub use ledger::{InMemoryLedger, LedgerError, TokenLedger};
pub use math::{Fraction, MathError};
pub use ownership::{Ownable, OwnershipError};
pub use rates::{PackedRates, RateError, ReserveRates};
pub use registry::{ConverterRegistry, RegisteredPool};
pub use settings::{Settings, SettingsError};
pub use stats::ProtectionStats;
pub use store::{LockedBalance, NewPosition, PositionStore, ProtectedPosition, StoreError};
pub use system_store::{SystemStore, SystemStoreError};
pub use types::*;
