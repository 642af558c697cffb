// 11.0 engine/core.rs: main engine. holds the stores, the collaborators and the audit log.
// 11.1 host clock, 11.2 atomic execution, 11.3 administration, 11.4 queries,
// 11.5 token movements shared by the add and remove paths.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::converter::{ConverterCapabilities, LiquidityPoolConverter};
use crate::events::{
    BalanceLockedEvent, Event, EventLog, EventPayload, LiquidityEventSubscriber, NetworkTokensEvent,
    Notification,
};
use crate::governance::TokenGovernance;
use crate::ledger::TokenLedger;
use crate::math::{self, Fraction};
use crate::rates::{self, ReserveRates};
use crate::registry::ConverterRegistry;
use crate::settings::Settings;
use crate::stats::ProtectionStats;
use crate::store::{LockedBalance, PositionStore, ProtectedPosition};
use crate::system_store::SystemStore;
use crate::types::{AccountId, Amount, PositionId, Timestamp, TokenId};

/// External systems the engine drives. Handed over once at construction.
#[derive(Debug)]
pub struct Collaborators {
    pub ledger: Box<dyn TokenLedger>,
    pub converters: ConverterRegistry,
    pub network_governance: TokenGovernance,
    pub gov_governance: TokenGovernance,
}

// everything an operation may change. cloned before each operation, restored on failure.
#[derive(Debug, Clone)]
pub(super) struct TxState {
    pub(super) store: PositionStore,
    pub(super) system: SystemStore,
    pub(super) stats: ProtectionStats,
    pub(super) ledger: Box<dyn TokenLedger>,
    pub(super) converters: ConverterRegistry,
}

/** 11.0: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) settings: Settings,
    pub(super) state: TxState,
    pub(super) network_governance: TokenGovernance,
    pub(super) gov_governance: TokenGovernance,
    pub(super) subscribers: Vec<Box<dyn LiquidityEventSubscriber>>,
    pub(super) events: EventLog,
    pub(super) pending_events: Vec<EventPayload>,
    pub(super) pending_notifications: Vec<Notification>,
    pub(super) current_time: Timestamp,
    pub(super) in_flight: bool,
}

impl Engine {
    pub fn new(config: EngineConfig, settings: Settings, collaborators: Collaborators) -> Self {
        let events = EventLog::new(config.max_events);
        Self {
            config,
            settings,
            state: TxState {
                store: PositionStore::new(),
                system: SystemStore::new(),
                stats: ProtectionStats::new(),
                ledger: collaborators.ledger,
                converters: collaborators.converters,
            },
            network_governance: collaborators.network_governance,
            gov_governance: collaborators.gov_governance,
            subscribers: Vec::new(),
            events,
            pending_events: Vec::new(),
            pending_notifications: Vec::new(),
            current_time: Timestamp::from_secs(0),
            in_flight: false,
        }
    }

    // 11.1: host clock

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.current_time = self.current_time.plus(secs);
    }

    // 11.2: runs `op` against a snapshot. any error restores the snapshot and drops
    // the operation's events. events and subscriber notices go out only on success.
    pub(super) fn atomic<T>(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        if self.in_flight {
            return Err(EngineError::Reentrancy);
        }
        self.in_flight = true;
        let snapshot = self.state.clone();

        let result = op(self);
        self.in_flight = false;

        match result {
            Ok(value) => {
                self.commit();
                Ok(value)
            }
            Err(err) => {
                self.state = snapshot;
                self.pending_events.clear();
                self.pending_notifications.clear();
                tracing::warn!(operation = name, error = %err, "operation rolled back");
                Err(err)
            }
        }
    }

    fn commit(&mut self) {
        for payload in std::mem::take(&mut self.pending_events) {
            self.events.emit(self.current_time, payload);
        }
        for notification in std::mem::take(&mut self.pending_notifications) {
            for subscriber in self.subscribers.iter_mut() {
                notification.deliver(subscriber.as_mut());
            }
        }
    }

    pub(super) fn record(&mut self, payload: EventPayload) {
        self.pending_events.push(payload);
    }

    pub(super) fn notify(&mut self, notification: Notification) {
        self.pending_notifications.push(notification);
    }

    // 11.3: administration

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // setters on Settings check the caller themselves
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn register_pool(
        &mut self,
        caller: AccountId,
        converter: Box<dyn LiquidityPoolConverter>,
    ) -> Result<ConverterCapabilities, EngineError> {
        self.settings.ownership().only_owner(caller)?;
        Ok(self.state.converters.register(converter))
    }

    pub fn whitelist_pool(&mut self, caller: AccountId, pool: TokenId) -> Result<(), EngineError> {
        let registered = self.state.converters.get(pool).ok_or(EngineError::UnknownPool(pool))?;
        let reserves = registered.converter.reserve_tokens();
        let capabilities = registered.capabilities;
        self.settings
            .add_pool_to_whitelist(caller, pool, &capabilities, &reserves)?;
        Ok(())
    }

    pub fn add_subscriber(
        &mut self,
        caller: AccountId,
        subscriber: Box<dyn LiquidityEventSubscriber>,
    ) -> Result<(), EngineError> {
        self.settings.ownership().only_owner(caller)?;
        self.subscribers.push(subscriber);
        Ok(())
    }

    pub fn clear_subscribers(&mut self, caller: AccountId) -> Result<(), EngineError> {
        self.settings.ownership().only_owner(caller)?;
        self.subscribers.clear();
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    // 11.4: queries

    pub fn position(&self, id: PositionId) -> Option<&ProtectedPosition> {
        self.state.store.position(id)
    }

    pub fn provider_positions(&self, provider: AccountId) -> Vec<ProtectedPosition> {
        self.state.store.provider_positions(provider).copied().collect()
    }

    pub fn position_count(&self) -> usize {
        self.state.store.position_count()
    }

    pub fn locked_balances(&self, provider: AccountId) -> &[LockedBalance] {
        self.state.store.locked_balances(provider)
    }

    pub fn locked_balance_range(&self, provider: AccountId, start: usize, end: usize) -> &[LockedBalance] {
        self.state.store.locked_balance_range(provider, start, end)
    }

    pub fn system_balance(&self, pool: TokenId) -> Amount {
        self.state.system.system_balance(pool)
    }

    pub fn network_tokens_minted(&self, pool: TokenId) -> Amount {
        self.state.system.network_tokens_minted(pool)
    }

    pub fn store(&self) -> &PositionStore {
        &self.state.store
    }

    pub fn stats(&self) -> &ProtectionStats {
        &self.state.stats
    }

    pub fn ledger(&self) -> &dyn TokenLedger {
        self.state.ledger.as_ref()
    }

    // host side funding and trading. not part of any protected operation.
    pub fn ledger_mut(&mut self) -> &mut dyn TokenLedger {
        self.state.ledger.as_mut()
    }

    pub fn converter(&self, pool: TokenId) -> Option<&dyn LiquidityPoolConverter> {
        self.state.converters.converter(pool)
    }

    /// Runs `f` against a pool and the ledger, e.g. to trade or to let the average rate catch up.
    pub fn with_pool<T>(
        &mut self,
        pool: TokenId,
        f: impl FnOnce(&mut dyn LiquidityPoolConverter, &mut dyn TokenLedger) -> Result<T, crate::converter::ConverterError>,
    ) -> Result<T, EngineError> {
        let converter = self
            .state
            .converters
            .converter_mut(pool)
            .ok_or(EngineError::UnknownPool(pool))?;
        Ok(f(converter, self.state.ledger.as_mut())?)
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.events.recent(count)
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    // shared checks

    pub(super) fn registered_converter(&self, pool: TokenId) -> Result<&dyn LiquidityPoolConverter, EngineError> {
        self.state
            .converters
            .converter(pool)
            .ok_or(EngineError::UnknownPool(pool))
    }

    // registered, supported and whitelisted. returns the reserve tokens.
    pub(super) fn verify_pool(&self, pool: TokenId) -> Result<Vec<TokenId>, EngineError> {
        let registered = self.state.converters.get(pool).ok_or(EngineError::UnknownPool(pool))?;
        let reserves = registered.converter.reserve_tokens();
        if !self.settings.is_pool_supported(&registered.capabilities, &reserves) {
            return Err(EngineError::PoolNotSupported(pool));
        }
        if !self.settings.is_pool_whitelisted(pool) {
            return Err(EngineError::PoolNotWhitelisted(pool));
        }
        Ok(reserves)
    }

    // reserve rates plus the pool token rate of `reserve`
    pub(super) fn pool_rates(
        &self,
        pool: TokenId,
        reserve: TokenId,
        validate_average_rate: bool,
    ) -> Result<(ReserveRates, Fraction), EngineError> {
        let converter = self.registered_converter(pool)?;
        let reserve_rates = rates::reserve_token_rates(
            converter,
            reserve,
            self.settings.average_rate_max_deviation(),
            validate_average_rate,
        )?;
        let supply = self.state.ledger.total_supply(pool);
        let pool_rate = rates::pool_token_rate(converter, supply, reserve)?;
        Ok((reserve_rates, pool_rate))
    }

    // 11.5: token movements

    pub(super) fn mint_network_tokens(&mut self, to: AccountId, pool: TokenId, amount: Amount) -> Result<(), EngineError> {
        self.state.system.inc_network_tokens_minted(pool, amount)?;
        self.network_governance
            .mint(self.state.ledger.as_mut(), self.config.protection_account, to, amount)?;
        self.record(EventPayload::NetworkTokensMinted(NetworkTokensEvent { pool, amount }));
        Ok(())
    }

    // burns network tokens held by the engine. the minted counter only drops by what it
    // tracked, network tokens deposited by providers were never minted here.
    pub(super) fn burn_network_tokens(&mut self, pool: TokenId, amount: Amount) -> Result<(), EngineError> {
        let retired = math::min(amount, self.state.system.network_tokens_minted(pool));
        if !retired.is_zero() {
            self.state.system.dec_network_tokens_minted(pool, retired)?;
        }
        self.network_governance
            .burn(self.state.ledger.as_mut(), self.config.protection_account, amount)?;
        self.record(EventPayload::NetworkTokensBurned(NetworkTokensEvent { pool, amount }));
        Ok(())
    }

    // network tokens already sit in the wallet. with a zero lock duration the
    // balance is claimable right away.
    pub(super) fn lock_tokens(&mut self, provider: AccountId, amount: Amount) -> Result<(), EngineError> {
        if amount.is_zero() {
            return Ok(());
        }
        let expiration_time = self.current_time.plus(self.settings.lock_duration());
        self.state.store.add_locked_balance(provider, amount, expiration_time)?;
        self.record(EventPayload::BalanceLocked(BalanceLockedEvent {
            provider,
            amount,
            expiration_time,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSubscriber;
    use crate::sandbox::{self, Sandbox, BASE_TOKEN, OWNER, POOL_TOKEN};
    use crate::types::U256;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine() -> Engine {
        Sandbox::development(10_000, 5_000).build().unwrap()
    }

    #[test]
    fn nested_operations_are_rejected() {
        let mut engine = engine();
        let result = engine.atomic("outer", |engine| engine.atomic("inner", |_| Ok(())));
        assert_eq!(result, Err(EngineError::Reentrancy));
        assert!(!engine.in_flight);
    }

    #[test]
    fn failed_operation_restores_state() {
        let mut engine = engine();
        let provider = AccountId(7);
        let before = engine.ledger().balance_of(BASE_TOKEN, provider);

        let result: Result<(), EngineError> = engine.atomic("failing", |engine| {
            engine.state.ledger.mint(BASE_TOKEN, provider, U256::from(5u64))?;
            engine.state.system.inc_system_balance(POOL_TOKEN, U256::from(9u64))?;
            engine.record(EventPayload::NetworkTokensBurned(NetworkTokensEvent {
                pool: POOL_TOKEN,
                amount: U256::one(),
            }));
            Err(EngineError::InvalidAmount)
        });

        assert_eq!(result, Err(EngineError::InvalidAmount));
        assert_eq!(engine.ledger().balance_of(BASE_TOKEN, provider), before);
        assert_eq!(engine.system_balance(POOL_TOKEN), U256::zero());
        assert!(engine.events().is_empty());
    }

    #[test]
    fn subscribers_hear_only_committed_operations() {
        let mut engine = engine();
        let recorder = Rc::new(RefCell::new(RecordingSubscriber::default()));
        engine.add_subscriber(OWNER, Box::new(recorder.clone())).unwrap();
        assert!(engine.add_subscriber(AccountId(99), Box::new(RecordingSubscriber::default())).is_err());

        let provider = AccountId(7);
        sandbox::fund(&mut engine, provider, BASE_TOKEN, 1_000).unwrap();
        engine.add_liquidity(provider, POOL_TOKEN, BASE_TOKEN, U256::from(1_000u64)).unwrap();
        assert_eq!(recorder.borrow().added.len(), 1);

        // unfunded provider fails part way, nobody hears about it
        let broke = AccountId(8);
        assert!(engine.add_liquidity(broke, POOL_TOKEN, BASE_TOKEN, U256::from(1_000u64)).is_err());
        assert_eq!(recorder.borrow().added.len(), 1);
    }

    #[test]
    fn clock_moves_forward() {
        let mut engine = engine();
        let start = engine.time();
        engine.advance_time(30);
        assert_eq!(engine.time().elapsed_since(start), Some(30));
    }
}
