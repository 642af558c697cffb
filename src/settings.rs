// 6.0 settings.rs: owner controlled knobs of the protection program.
// 6.1 pool whitelist and support check, 6.2 minting limits, 6.3 protection schedule setters,
// 6.4 per reserve add switch.

use crate::config::{self, ConfigError, ProtectionParams};
use crate::converter::{ConverterCapabilities, ConverterType};
use crate::ownership::{Ownable, OwnershipError};
use crate::types::{AccountId, Amount, Ppm, TokenId};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Pool {0} is already whitelisted")]
    AlreadyWhitelisted(TokenId),

    #[error("Pool {0} is not whitelisted")]
    NotWhitelisted(TokenId),

    #[error("Pool {0} is not supported")]
    PoolNotSupported(TokenId),

    #[error("Ownership error: {0}")]
    Ownership(#[from] OwnershipError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct Settings {
    ownership: Ownable,
    network_token: TokenId,
    params: ProtectionParams,
    whitelist: BTreeSet<TokenId>,
    minting_limits: HashMap<TokenId, Amount>,
    add_liquidity_disabled: HashSet<(TokenId, TokenId)>,
}

impl Settings {
    pub fn new(owner: AccountId, network_token: TokenId, params: ProtectionParams) -> Result<Self, SettingsError> {
        params.validate()?;
        Ok(Self {
            ownership: Ownable::new(owner),
            network_token,
            params,
            whitelist: BTreeSet::new(),
            minting_limits: HashMap::new(),
            add_liquidity_disabled: HashSet::new(),
        })
    }

    pub fn ownership(&self) -> &Ownable {
        &self.ownership
    }

    pub fn ownership_mut(&mut self) -> &mut Ownable {
        &mut self.ownership
    }

    pub fn network_token(&self) -> TokenId {
        self.network_token
    }

    pub fn params(&self) -> &ProtectionParams {
        &self.params
    }

    // 6.1: whitelist

    pub fn add_pool_to_whitelist(
        &mut self,
        caller: AccountId,
        pool: TokenId,
        capabilities: &ConverterCapabilities,
        reserves: &[TokenId],
    ) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        if !self.is_pool_supported(capabilities, reserves) {
            return Err(SettingsError::PoolNotSupported(pool));
        }
        if !self.whitelist.insert(pool) {
            return Err(SettingsError::AlreadyWhitelisted(pool));
        }
        tracing::info!(%pool, "pool whitelisted");
        Ok(())
    }

    pub fn remove_pool_from_whitelist(&mut self, caller: AccountId, pool: TokenId) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        if !self.whitelist.remove(&pool) {
            return Err(SettingsError::NotWhitelisted(pool));
        }
        tracing::info!(%pool, "pool removed from whitelist");
        Ok(())
    }

    pub fn is_pool_whitelisted(&self, pool: TokenId) -> bool {
        self.whitelist.contains(&pool)
    }

    // standard pool, two reserves with equal weights, one of them the network token
    pub fn is_pool_supported(&self, capabilities: &ConverterCapabilities, reserves: &[TokenId]) -> bool {
        capabilities.converter_type == ConverterType::StandardPool
            && capabilities.has_average_rate
            && capabilities.reserve_count == 2
            && capabilities.balanced_weights
            && reserves.len() == 2
            && reserves.contains(&self.network_token)
    }

    // 6.2: minting limits. zero means no override.

    pub fn set_network_token_minting_limit(
        &mut self,
        caller: AccountId,
        pool: TokenId,
        limit: Amount,
    ) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        if limit.is_zero() {
            self.minting_limits.remove(&pool);
        } else {
            self.minting_limits.insert(pool, limit);
        }
        Ok(())
    }

    pub fn set_default_network_token_minting_limit(
        &mut self,
        caller: AccountId,
        limit: Amount,
    ) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        self.params.default_network_token_minting_limit = limit;
        Ok(())
    }

    pub fn network_token_minting_limit(&self, pool: TokenId) -> Amount {
        self.minting_limits
            .get(&pool)
            .copied()
            .unwrap_or(self.params.default_network_token_minting_limit)
    }

    pub fn set_min_network_token_liquidity_for_minting(
        &mut self,
        caller: AccountId,
        amount: Amount,
    ) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        self.params.min_network_token_liquidity_for_minting = amount;
        Ok(())
    }

    pub fn min_network_token_liquidity_for_minting(&self) -> Amount {
        self.params.min_network_token_liquidity_for_minting
    }

    // 6.3: schedule

    pub fn set_protection_delays(
        &mut self,
        caller: AccountId,
        min_delay: u64,
        max_delay: u64,
    ) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        config::validate_delays(min_delay, max_delay)?;
        self.params.min_protection_delay = min_delay;
        self.params.max_protection_delay = max_delay;
        Ok(())
    }

    pub fn min_protection_delay(&self) -> u64 {
        self.params.min_protection_delay
    }

    pub fn max_protection_delay(&self) -> u64 {
        self.params.max_protection_delay
    }

    pub fn set_lock_duration(&mut self, caller: AccountId, duration: u64) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        self.params.lock_duration = duration;
        Ok(())
    }

    pub fn lock_duration(&self) -> u64 {
        self.params.lock_duration
    }

    pub fn set_average_rate_max_deviation(&mut self, caller: AccountId, deviation: Ppm) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        config::validate_deviation(deviation)?;
        self.params.average_rate_max_deviation = deviation;
        Ok(())
    }

    pub fn average_rate_max_deviation(&self) -> Ppm {
        self.params.average_rate_max_deviation
    }

    pub fn set_min_network_compensation(&mut self, caller: AccountId, amount: Amount) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        self.params.min_network_compensation = amount;
        Ok(())
    }

    pub fn min_network_compensation(&self) -> Amount {
        self.params.min_network_compensation
    }

    // 6.4
    pub fn disable_add_liquidity(
        &mut self,
        caller: AccountId,
        pool: TokenId,
        reserve: TokenId,
        disable: bool,
    ) -> Result<(), SettingsError> {
        self.ownership.only_owner(caller)?;
        if disable {
            self.add_liquidity_disabled.insert((pool, reserve));
        } else {
            self.add_liquidity_disabled.remove(&(pool, reserve));
        }
        Ok(())
    }

    pub fn add_liquidity_disabled(&self, pool: TokenId, reserve: TokenId) -> bool {
        self.add_liquidity_disabled.contains(&(pool, reserve))
    }
}
