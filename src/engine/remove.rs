// 11.7 engine/remove.rs: removing protected liquidity and paying compensation.
// 11.7.1 validation and bookkeeping, 11.7.2 target amount, 11.7.3 network token payout,
// 11.7.4 base token payout, 11.7.5 read-only preview, 11.7.6 unprotecting a pair.

use super::core::Engine;
use super::results::{EngineError, RemoveOutcome, RemoveReturn};
use crate::compensation::{self, RemovalInputs, TargetBreakdown};
use crate::events::{
    EventPayload, LiquidityNotice, LiquidityRemovedEvent, LiquidityUnprotectedEvent, Notification,
};
use crate::math::{self, Fraction};
use crate::rates::PackedRates;
use crate::store::{ProtectedPosition, StoreError};
use crate::types::{AccountId, Amount, PositionId, Ppm, Timestamp, U256, PPM_RESOLUTION};

impl Engine {
    /// Removes `portion` of a protected position and pays the provider its target amount.
    pub fn remove_liquidity(
        &mut self,
        provider: AccountId,
        id: PositionId,
        portion: Ppm,
    ) -> Result<RemoveOutcome, EngineError> {
        self.atomic("remove_liquidity", |engine| engine.remove_liquidity_inner(provider, id, portion))
    }

    fn remove_liquidity_inner(
        &mut self,
        provider: AccountId,
        id: PositionId,
        portion: Ppm,
    ) -> Result<RemoveOutcome, EngineError> {
        // 11.7.1: the order of these checks is part of the contract
        if !portion.is_valid_portion() {
            return Err(EngineError::InvalidPortion(portion));
        }
        let position = self.state.store.position(id).copied().ok_or(StoreError::InvalidId(id))?;
        if position.provider != provider {
            return Err(EngineError::AccessDenied { caller: provider, id });
        }
        if !self.settings.is_pool_whitelisted(position.pool_token) {
            return Err(EngineError::PoolNotWhitelisted(position.pool_token));
        }
        if position.timestamp >= self.current_time {
            return Err(EngineError::TooEarly(id));
        }

        let (pool_amount, reserve_amount) = removed_amounts(&position, portion)?;
        if portion.is_full() {
            self.state.store.remove_position(id)?;
        } else {
            self.state.store.update_amounts(
                id,
                position.pool_amount - pool_amount,
                position.reserve_amount - reserve_amount,
            )?;
        }

        let pool = position.pool_token;
        let reserve = position.reserve_token;
        self.state
            .stats
            .decrease_total_amounts(provider, pool, reserve, pool_amount, reserve_amount)?;
        self.notify(Notification::Removing(LiquidityNotice {
            position_id: id,
            provider,
            pool,
            reserve,
            pool_amount,
            reserve_amount,
        }));

        // removed pool tokens return to the protocol
        self.state.system.inc_system_balance(pool, pool_amount)?;

        let protection_account = self.config.protection_account;
        if reserve == self.config.network_token {
            self.state
                .ledger
                .transfer(self.config.gov_token, provider, protection_account, reserve_amount)?;
            self.gov_governance
                .burn(self.state.ledger.as_mut(), protection_account, reserve_amount)?;
        }

        // 11.7.2
        let (rates, pool_rate) = self.pool_rates(pool, reserve, true)?;
        let packed = PackedRates::pack(position.reserve_rate, rates.spot, rates.average)?;
        let breakdown = self.target_amount(&position, pool_amount, reserve_amount, pool_rate, packed, self.current_time)?;
        let target_amount = breakdown.target;

        let (paid_amount, locked_amount) = if reserve == self.config.network_token {
            // 11.7.3: the whole target is minted and locked
            let wallet = self.config.wallet;
            self.mint_network_tokens(wallet, pool, target_amount)?;
            self.lock_tokens(provider, target_amount)?;
            (U256::zero(), target_amount)
        } else {
            self.pay_base_token_target(provider, &position, target_amount, pool_rate, &packed.remove_average)?
        };

        self.record(EventPayload::LiquidityRemoved(LiquidityRemovedEvent {
            position_id: id,
            provider,
            pool,
            reserve,
            portion,
            pool_amount,
            reserve_amount,
            target_amount,
            paid_amount,
            locked_amount,
        }));
        tracing::info!(
            %id,
            %provider,
            %portion,
            target = %target_amount,
            paid = %paid_amount,
            locked = %locked_amount,
            "protected liquidity removed"
        );

        Ok(RemoveOutcome {
            pool_amount,
            reserve_amount,
            target_amount,
            paid_amount,
            locked_amount,
        })
    }

    fn target_amount(
        &self,
        position: &ProtectedPosition,
        pool_amount: Amount,
        reserve_amount: Amount,
        pool_rate: Fraction,
        rates: PackedRates,
        remove_timestamp: Timestamp,
    ) -> Result<TargetBreakdown, EngineError> {
        let inputs = RemovalInputs {
            pool_amount,
            reserve_amount,
            pool_rate,
            rates,
            add_timestamp: position.timestamp,
            remove_timestamp,
        };
        let breakdown = compensation::remove_liquidity_target_amount(&inputs, &self.settings.params().schedule())?;
        tracing::debug!(
            id = %position.id,
            total = %breakdown.total,
            loss = ?breakdown.loss.to_decimal(),
            level = ?breakdown.level.to_decimal(),
            target = %breakdown.target,
            "target amount"
        );
        Ok(breakdown)
    }

    // 11.7.4: liquidate protocol owned pool tokens worth the target, capped by the system
    // balance. a shortfall is made up in network tokens at the average rate.
    fn pay_base_token_target(
        &mut self,
        provider: AccountId,
        position: &ProtectedPosition,
        target_amount: Amount,
        pool_rate: Fraction,
        average_rate: &Fraction,
    ) -> Result<(Amount, Amount), EngineError> {
        let pool = position.pool_token;
        let base_token = position.reserve_token;
        let network_token = self.config.network_token;
        let protection_account = self.config.protection_account;
        let wallet = self.config.wallet;

        let wanted = math::mul_div(target_amount, pool_rate.d, pool_rate.n / U256::from(2u8))?;
        let pool_amount = math::min(wanted, self.state.system.system_balance(pool));

        if !pool_amount.is_zero() {
            self.state.system.dec_system_balance(pool, pool_amount)?;
            self.state.ledger.transfer(pool, wallet, protection_account, pool_amount)?;

            let converter = self
                .state
                .converters
                .converter_mut(pool)
                .ok_or(EngineError::UnknownPool(pool))?;
            converter.remove_liquidity(
                self.state.ledger.as_mut(),
                protection_account,
                pool_amount,
                &[base_token, network_token],
                &[U256::zero(), U256::zero()],
            )?;
        }

        let base_amount = self.state.ledger.balance_of(base_token, protection_account);
        self.state
            .ledger
            .transfer(base_token, protection_account, provider, base_amount)?;

        let delta = compensation::network_compensation(
            target_amount,
            base_amount,
            average_rate,
            self.settings.min_network_compensation(),
        )?;

        if !delta.is_zero() {
            let held = self.state.ledger.balance_of(network_token, protection_account);
            if held < delta {
                self.mint_network_tokens(protection_account, pool, delta - held)?;
            }
            self.state
                .ledger
                .transfer(network_token, protection_account, wallet, delta)?;
            self.lock_tokens(provider, delta)?;
        }

        let leftover = self.state.ledger.balance_of(network_token, protection_account);
        if !leftover.is_zero() {
            self.burn_network_tokens(pool, leftover)?;
        }

        Ok((base_amount, delta))
    }

    /// What removing `portion` of `id` at `remove_timestamp` would pay, without validating rates.
    pub fn remove_liquidity_return(
        &self,
        id: PositionId,
        portion: Ppm,
        remove_timestamp: Timestamp,
    ) -> Result<RemoveReturn, EngineError> {
        if !portion.is_valid_portion() {
            return Err(EngineError::InvalidPortion(portion));
        }
        let position = self.state.store.position(id).copied().ok_or(StoreError::InvalidId(id))?;
        if remove_timestamp < position.timestamp {
            return Err(EngineError::InvalidTimestamp);
        }

        let (pool_amount, reserve_amount) = removed_amounts(&position, portion)?;
        let pool = position.pool_token;
        let (rates, pool_rate) = self.pool_rates(pool, position.reserve_token, false)?;
        let packed = PackedRates::pack(position.reserve_rate, rates.spot, rates.average)?;
        let target_amount = self
            .target_amount(&position, pool_amount, reserve_amount, pool_rate, packed, remove_timestamp)?
            .target;

        if position.reserve_token == self.config.network_token {
            return Ok(RemoveReturn {
                target_amount,
                base_amount: target_amount,
                network_amount: U256::zero(),
            });
        }

        // a real removal credits the removed pool tokens to the system balance first
        let available = math::add(self.state.system.system_balance(pool), pool_amount)?;
        let wanted = math::mul_div(target_amount, pool_rate.d, pool_rate.n / U256::from(2u8))?;
        let liquidated = math::min(wanted, available);
        let base_amount = math::mul_div(liquidated, pool_rate.n / U256::from(2u8), pool_rate.d)?;
        let network_amount = compensation::network_compensation(
            target_amount,
            base_amount,
            &packed.remove_average,
            self.settings.min_network_compensation(),
        )?;

        Ok(RemoveReturn {
            target_amount,
            base_amount,
            network_amount,
        })
    }

    /// Gives back the pool tokens behind a pair of positions created together, without compensation.
    pub fn unprotect_liquidity(
        &mut self,
        provider: AccountId,
        id1: PositionId,
        id2: PositionId,
    ) -> Result<(), EngineError> {
        self.atomic("unprotect_liquidity", |engine| {
            if id1 == id2 {
                return Err(EngineError::SameId(id1));
            }
            let first = engine.state.store.position(id1).copied().ok_or(StoreError::InvalidId(id1))?;
            let second = engine.state.store.position(id2).copied().ok_or(StoreError::InvalidId(id2))?;
            for position in [&first, &second] {
                if position.provider != provider {
                    return Err(EngineError::AccessDenied {
                        caller: provider,
                        id: position.id,
                    });
                }
            }
            if !engine.is_matching_pair(&first, &second) {
                return Err(EngineError::ProtectionsMismatch(id1, id2));
            }
            if first.timestamp >= engine.current_time {
                return Err(EngineError::TooEarly(id1));
            }

            let protection_account = engine.config.protection_account;
            let network_side = if first.reserve_token == engine.config.network_token {
                &first
            } else {
                &second
            };
            engine.state.ledger.transfer(
                engine.config.gov_token,
                provider,
                protection_account,
                network_side.reserve_amount,
            )?;
            engine
                .gov_governance
                .burn(engine.state.ledger.as_mut(), protection_account, network_side.reserve_amount)?;

            for position in [&first, &second] {
                engine.state.store.remove_position(position.id)?;
                engine.state.stats.decrease_total_amounts(
                    provider,
                    position.pool_token,
                    position.reserve_token,
                    position.pool_amount,
                    position.reserve_amount,
                )?;
                engine.notify(Notification::Removing(LiquidityNotice {
                    position_id: position.id,
                    provider,
                    pool: position.pool_token,
                    reserve: position.reserve_token,
                    pool_amount: position.pool_amount,
                    reserve_amount: position.reserve_amount,
                }));
            }

            let pool_amount = math::add(first.pool_amount, second.pool_amount)?;
            let wallet = engine.config.wallet;
            engine
                .state
                .ledger
                .transfer(first.pool_token, wallet, provider, pool_amount)?;

            engine.record(EventPayload::LiquidityUnprotected(LiquidityUnprotectedEvent {
                provider,
                pool: first.pool_token,
                position_ids: (id1, id2),
                pool_amount,
            }));
            tracing::info!(%provider, %id1, %id2, %pool_amount, "liquidity unprotected");
            Ok(())
        })
    }

    // same pool, opposite reserves with one on the network side, added together,
    // pool amounts at most one unit apart (the odd unit of a split)
    fn is_matching_pair(&self, first: &ProtectedPosition, second: &ProtectedPosition) -> bool {
        let network_token = self.config.network_token;
        let pool_diff = if first.pool_amount > second.pool_amount {
            first.pool_amount - second.pool_amount
        } else {
            second.pool_amount - first.pool_amount
        };

        first.pool_token == second.pool_token
            && first.reserve_token != second.reserve_token
            && (first.reserve_token == network_token || second.reserve_token == network_token)
            && first.timestamp == second.timestamp
            && pool_diff <= U256::one()
    }
}

// amounts covered by `portion` of a position. a full removal takes everything.
fn removed_amounts(position: &ProtectedPosition, portion: Ppm) -> Result<(Amount, Amount), EngineError> {
    if portion.is_full() {
        return Ok((position.pool_amount, position.reserve_amount));
    }
    let resolution = U256::from(PPM_RESOLUTION);
    Ok((
        math::mul_div(position.pool_amount, portion.as_u256(), resolution)?,
        math::mul_div(position.reserve_amount, portion.as_u256(), resolution)?,
    ))
}
