// 11.6 engine/add.rs: adding protected liquidity.
// network token deposits are matched with pool tokens the protocol already owns,
// base token deposits are matched with freshly minted network tokens.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, LiquidityAddedEvent, LiquidityNotice, Notification};
use crate::math::{self, Fraction};
use crate::store::NewPosition;
use crate::types::{AccountId, Amount, PositionId, TokenId, U256};

impl Engine {
    /// Deposits `amount` of `reserve` into `pool` under protection.
    pub fn add_liquidity(
        &mut self,
        provider: AccountId,
        pool: TokenId,
        reserve: TokenId,
        amount: Amount,
    ) -> Result<PositionId, EngineError> {
        self.atomic("add_liquidity", |engine| {
            engine.verify_add(pool, reserve, amount)?;
            if reserve == engine.config.network_token {
                engine.add_network_token_liquidity(provider, pool, amount)
            } else {
                engine.add_base_token_liquidity(provider, pool, reserve, amount)
            }
        })
    }

    fn verify_add(&self, pool: TokenId, reserve: TokenId, amount: Amount) -> Result<(), EngineError> {
        if amount.is_zero() {
            return Err(EngineError::InvalidAmount);
        }
        let reserves = self.verify_pool(pool)?;
        if !reserves.contains(&reserve) {
            return Err(EngineError::InvalidReserveToken { pool, token: reserve });
        }
        if self.settings.add_liquidity_disabled(pool, reserve) {
            return Err(EngineError::AddLiquidityDisabled { pool, reserve });
        }
        Ok(())
    }

    // 11.6.1: pool tokens come out of the system balance
    fn add_network_token_liquidity(
        &mut self,
        provider: AccountId,
        pool: TokenId,
        amount: Amount,
    ) -> Result<PositionId, EngineError> {
        let network_token = self.config.network_token;
        let (rates, pool_rate) = self.pool_rates(pool, network_token, true)?;

        let pool_amount = math::mul_div(amount, pool_rate.d, pool_rate.n)?;
        if pool_amount.is_zero() {
            return Err(EngineError::InvalidAmount);
        }
        self.state.system.dec_system_balance(pool, pool_amount)?;

        let id = self.add_protected_position(provider, pool, network_token, pool_amount, amount, rates.spot)?;

        self.state
            .ledger
            .transfer(network_token, provider, self.config.protection_account, amount)?;
        self.burn_network_tokens(pool, amount)?;

        self.gov_governance
            .mint(self.state.ledger.as_mut(), self.config.protection_account, provider, amount)?;

        tracing::info!(%id, %provider, %pool, %amount, %pool_amount, "network token liquidity protected");
        Ok(id)
    }

    // 11.6.2: mint the matching network tokens, add both sides to the pool,
    // split the pool tokens between the provider's position and the system balance
    fn add_base_token_liquidity(
        &mut self,
        provider: AccountId,
        pool: TokenId,
        base_token: TokenId,
        amount: Amount,
    ) -> Result<PositionId, EngineError> {
        let network_token = self.config.network_token;
        let (network_balance, base_balance) = {
            let converter = self.registered_converter(pool)?;
            (
                converter.reserve_balance(network_token)?,
                converter.reserve_balance(base_token)?,
            )
        };

        let required = self.settings.min_network_token_liquidity_for_minting();
        if network_balance < required {
            return Err(EngineError::InsufficientLiquidityForMinting {
                pool,
                available: network_balance,
                required,
            });
        }

        let new_network_amount = math::mul_div(amount, network_balance, base_balance)?;
        let minted = self.state.system.network_tokens_minted(pool);
        let limit = self.settings.network_token_minting_limit(pool);
        if math::add(minted, new_network_amount)? > limit {
            return Err(EngineError::MintingLimitExceeded {
                pool,
                minted,
                requested: new_network_amount,
                limit,
            });
        }

        let protection_account = self.config.protection_account;
        self.mint_network_tokens(protection_account, pool, new_network_amount)?;
        self.state
            .ledger
            .transfer(base_token, provider, protection_account, amount)?;

        let converter = self
            .state
            .converters
            .converter_mut(pool)
            .ok_or(EngineError::UnknownPool(pool))?;
        converter.add_liquidity(
            self.state.ledger.as_mut(),
            protection_account,
            &[base_token, network_token],
            &[amount, new_network_amount],
            U256::one(),
        )?;

        // every pool token the engine holds now goes to the wallet
        let pool_amount = self.state.ledger.balance_of(pool, protection_account);
        self.state
            .ledger
            .transfer(pool, protection_account, self.config.wallet, pool_amount)?;

        let provider_share = pool_amount / U256::from(2u8);
        self.state.system.inc_system_balance(pool, pool_amount - provider_share)?;

        // the stored rate is the spot rate after the deposit
        let (rates, _) = self.pool_rates(pool, base_token, true)?;
        let id = self.add_protected_position(provider, pool, base_token, provider_share, amount, rates.spot)?;
        tracing::info!(
            %id,
            %provider,
            %pool,
            %amount,
            minted = %new_network_amount,
            %pool_amount,
            "base token liquidity protected"
        );
        Ok(id)
    }

    pub(super) fn add_protected_position(
        &mut self,
        provider: AccountId,
        pool: TokenId,
        reserve: TokenId,
        pool_amount: Amount,
        reserve_amount: Amount,
        reserve_rate: Fraction,
    ) -> Result<PositionId, EngineError> {
        self.state
            .stats
            .increase_total_amounts(provider, pool, reserve, pool_amount, reserve_amount)?;
        self.state.stats.add_provider_pool(provider, pool);

        let id = self.state.store.add_position(NewPosition {
            provider,
            pool_token: pool,
            reserve_token: reserve,
            pool_amount,
            reserve_amount,
            reserve_rate,
            timestamp: self.current_time,
        })?;

        self.record(EventPayload::LiquidityAdded(LiquidityAddedEvent {
            position_id: id,
            provider,
            pool,
            reserve,
            pool_amount,
            reserve_amount,
        }));
        self.notify(Notification::Adding(LiquidityNotice {
            position_id: id,
            provider,
            pool,
            reserve,
            pool_amount,
            reserve_amount,
        }));
        Ok(id)
    }

    /// Puts pool tokens the provider already holds under protection, one position per reserve.
    pub fn protect_liquidity(
        &mut self,
        provider: AccountId,
        pool: TokenId,
        pool_amount: Amount,
    ) -> Result<(PositionId, PositionId), EngineError> {
        self.atomic("protect_liquidity", |engine| {
            if pool_amount < U256::from(2u8) {
                return Err(EngineError::InvalidAmount);
            }
            let reserves = engine.verify_pool(pool)?;

            engine
                .state
                .ledger
                .transfer(pool, provider, engine.config.wallet, pool_amount)?;

            let first_share = pool_amount / U256::from(2u8);
            let shares = [first_share, pool_amount - first_share];
            let mut ids = [PositionId(0); 2];

            for (i, (reserve, share)) in reserves.iter().zip(shares).enumerate() {
                let (rates, pool_rate) = engine.pool_rates(pool, *reserve, true)?;
                let reserve_amount = math::mul_div(share, pool_rate.n, pool_rate.d)?;

                ids[i] = engine.add_protected_position(provider, pool, *reserve, share, reserve_amount, rates.spot)?;

                if *reserve == engine.config.network_token {
                    engine.gov_governance.mint(
                        engine.state.ledger.as_mut(),
                        engine.config.protection_account,
                        provider,
                        reserve_amount,
                    )?;
                }
            }

            tracing::info!(%provider, %pool, %pool_amount, "pool tokens protected");
            Ok((ids[0], ids[1]))
        })
    }

    /// Room left on a pool: (base tokens that can still be added, network tokens that can still be added).
    pub fn pool_available_space(&self, pool: TokenId) -> Result<(Amount, Amount), EngineError> {
        let reserves = self.verify_pool(pool)?;
        let network_token = self.config.network_token;
        let base_token = reserves
            .iter()
            .copied()
            .find(|token| *token != network_token)
            .ok_or(EngineError::PoolNotSupported(pool))?;

        let converter = self.registered_converter(pool)?;
        let network_balance = converter.reserve_balance(network_token)?;
        let base_balance = converter.reserve_balance(base_token)?;

        // base side: network tokens that can still be minted, priced in base tokens.
        // rounded up by one since the matching network amount is floored on add.
        let minted = self.state.system.network_tokens_minted(pool);
        let limit = self.settings.network_token_minting_limit(pool);
        let mintable = if limit > minted { limit - minted } else { U256::zero() };
        let base_space = math::add(math::mul_div(mintable, base_balance, network_balance)?, U256::one())?;

        // network side: system owned pool tokens at the pool token rate, rounded up
        let (_, pool_rate) = self.pool_rates(pool, network_token, false)?;
        let system_value = math::mul(self.state.system.system_balance(pool), pool_rate.n)?;
        let network_space = math::div(math::add(system_value, pool_rate.n)?.saturating_sub(U256::one()), pool_rate.d)?;

        Ok((base_space, network_space))
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::EngineError;
    use crate::math::Fraction;
    use crate::sandbox::{self, Sandbox, BASE_TOKEN, GOV_TOKEN, NETWORK_TOKEN, OWNER, POOL_TOKEN, WALLET};
    use crate::settings::SettingsError;
    use crate::system_store::SystemStoreError;
    use crate::types::{AccountId, Ppm, TokenId, U256};

    const ALICE: AccountId = AccountId(7);

    fn u(x: u64) -> U256 {
        U256::from(x)
    }

    #[test]
    fn base_deposit_splits_pool_tokens() {
        let mut engine = Sandbox::development(10_000, 5_000).build().unwrap();
        sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 1_000).unwrap();

        let id = engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, u(1_000)).unwrap();
        let position = *engine.position(id).unwrap();

        assert_eq!(engine.network_tokens_minted(POOL_TOKEN), u(500));
        assert_eq!(position.pool_amount, u(353));
        assert_eq!(position.reserve_amount, u(1_000));
        assert_eq!(engine.system_balance(POOL_TOKEN), u(354));
        assert_eq!(engine.ledger().balance_of(POOL_TOKEN, WALLET), u(707));
        assert_eq!(engine.ledger().balance_of(BASE_TOKEN, ALICE), U256::zero());
        // spot rate of base in network units at add time
        assert!(position.reserve_rate.same_value(&Fraction::new(u(1), u(2)).unwrap()));
    }

    #[test]
    fn stored_rate_is_read_after_the_deposit() {
        // 1000 * 3333 / 10000 floors to 333, so the deposit nudges the spot rate
        let mut engine = Sandbox::development(10_000, 3_333).build().unwrap();
        sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 1_000).unwrap();
        let id = engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, u(1_000)).unwrap();

        let rate = engine.position(id).unwrap().reserve_rate;
        assert!(rate.same_value(&Fraction::new(u(3_666), u(11_000)).unwrap()));
        assert!(!rate.same_value(&Fraction::new(u(3_333), u(10_000)).unwrap()));
    }

    #[test]
    fn network_deposit_draws_on_system_balance() {
        let mut engine = Sandbox::development(10_000, 5_000).build().unwrap();
        sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 1_000).unwrap();
        engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, u(1_000)).unwrap();

        let bob = AccountId(8);
        sandbox::fund(&mut engine, bob, NETWORK_TOKEN, 100).unwrap();
        let id = engine.add_liquidity(bob, POOL_TOKEN, NETWORK_TOKEN, u(100)).unwrap();

        // 100 * 7778 / (2 * 5500) = 70
        assert_eq!(engine.position(id).unwrap().pool_amount, u(70));
        assert_eq!(engine.system_balance(POOL_TOKEN), u(284));
        assert_eq!(engine.ledger().balance_of(GOV_TOKEN, bob), u(100));
        // deposited network tokens retire minted ones
        assert_eq!(engine.network_tokens_minted(POOL_TOKEN), u(400));
        assert_eq!(engine.ledger().balance_of(NETWORK_TOKEN, bob), U256::zero());
    }

    #[test]
    fn network_deposit_needs_system_balance() {
        let mut engine = Sandbox::development(10_000, 5_000).build().unwrap();
        sandbox::fund(&mut engine, ALICE, NETWORK_TOKEN, 100).unwrap();
        let err = engine.add_liquidity(ALICE, POOL_TOKEN, NETWORK_TOKEN, u(100)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::SystemStore(SystemStoreError::InsufficientSystemBalance { .. })
        ));
        assert_eq!(engine.ledger().balance_of(NETWORK_TOKEN, ALICE), u(100));
    }

    #[test]
    fn minting_limit_and_liquidity_floor() {
        let mut engine = Sandbox::development(10_000, 5_000).build().unwrap();
        sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 10_000).unwrap();
        engine
            .settings_mut()
            .set_network_token_minting_limit(OWNER, POOL_TOKEN, u(499))
            .unwrap();
        assert!(matches!(
            engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, u(1_000)),
            Err(EngineError::MintingLimitExceeded { .. })
        ));

        engine
            .settings_mut()
            .set_min_network_token_liquidity_for_minting(OWNER, u(5_001))
            .unwrap();
        assert!(matches!(
            engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, u(1)),
            Err(EngineError::InsufficientLiquidityForMinting { .. })
        ));
        assert_eq!(engine.position_count(), 0);
    }

    #[test]
    fn add_validation() {
        let mut engine = Sandbox::development(10_000, 5_000).build().unwrap();
        sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 1_000).unwrap();

        assert_eq!(
            engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, U256::zero()),
            Err(EngineError::InvalidAmount)
        );
        assert_eq!(
            engine.add_liquidity(ALICE, TokenId(99), BASE_TOKEN, u(10)),
            Err(EngineError::UnknownPool(TokenId(99)))
        );
        assert_eq!(
            engine.add_liquidity(ALICE, POOL_TOKEN, TokenId(4), u(10)),
            Err(EngineError::InvalidReserveToken {
                pool: POOL_TOKEN,
                token: TokenId(4)
            })
        );

        engine
            .settings_mut()
            .disable_add_liquidity(OWNER, POOL_TOKEN, BASE_TOKEN, true)
            .unwrap();
        assert!(matches!(
            engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, u(10)),
            Err(EngineError::AddLiquidityDisabled { .. })
        ));

        engine
            .settings_mut()
            .remove_pool_from_whitelist(OWNER, POOL_TOKEN)
            .unwrap();
        assert_eq!(
            engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, u(10)),
            Err(EngineError::PoolNotWhitelisted(POOL_TOKEN))
        );
        assert!(matches!(
            engine.settings_mut().remove_pool_from_whitelist(OWNER, POOL_TOKEN),
            Err(SettingsError::NotWhitelisted(_))
        ));
    }

    #[test]
    fn protect_existing_pool_tokens() {
        let mut engine = Sandbox::development(10_000, 5_000).build().unwrap();
        // seed provider holds all 7071 pool tokens
        let (first, second) = engine
            .protect_liquidity(sandbox::SEED_PROVIDER, POOL_TOKEN, u(1_000))
            .unwrap();

        let base = *engine.position(first).unwrap();
        let network = *engine.position(second).unwrap();
        assert_eq!((base.reserve_token, network.reserve_token), (BASE_TOKEN, NETWORK_TOKEN));
        assert_eq!(base.pool_amount + network.pool_amount, u(1_000));
        // each pool token is worth 2 * reserve / supply: 500 * 20000 / 7071, 500 * 10000 / 7071
        assert_eq!(base.reserve_amount, u(1_414));
        assert_eq!(network.reserve_amount, u(707));
        assert_eq!(engine.ledger().balance_of(GOV_TOKEN, sandbox::SEED_PROVIDER), u(707));

        // an immediate removal targets what the position recorded
        engine.advance_time(1);
        let preview = engine.remove_liquidity_return(first, Ppm::FULL, engine.time()).unwrap();
        assert_eq!(preview.target_amount, base.reserve_amount);
        assert_eq!(engine.ledger().balance_of(POOL_TOKEN, WALLET), u(1_000));
    }

    #[test]
    fn available_space() {
        let mut engine = Sandbox::development(10_000, 5_000).build().unwrap();
        engine
            .settings_mut()
            .set_network_token_minting_limit(OWNER, POOL_TOKEN, u(1_000))
            .unwrap();
        sandbox::fund(&mut engine, ALICE, BASE_TOKEN, 1_000).unwrap();
        engine.add_liquidity(ALICE, POOL_TOKEN, BASE_TOKEN, u(1_000)).unwrap();

        let (base_space, network_space) = engine.pool_available_space(POOL_TOKEN).unwrap();
        // 500 mintable * 11000 / 5500 + 1
        assert_eq!(base_space, u(1_001));
        // (354 * 11000 + 10999) / 7778
        assert_eq!(network_space, u(502));

        // with the limit used up only the rounding unit is left
        engine
            .settings_mut()
            .set_network_token_minting_limit(OWNER, POOL_TOKEN, u(500))
            .unwrap();
        assert_eq!(engine.pool_available_space(POOL_TOKEN).unwrap().0, u(1));
    }
}
