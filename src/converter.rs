// 8.0 converter.rs: the AMM pool seen through the narrow interface the engine needs:
// reserve balances, add/remove liquidity, recent average rate.
// StandardPoolConverter is an in-memory 50/50 pool for tests and the simulator,
// swap fees and bonding curves are not modeled.

use crate::ledger::{LedgerError, TokenLedger};
use crate::math::{self, Fraction, MathError};
use crate::types::{AccountId, Amount, Ppm, TokenId, U256, PPM_RESOLUTION};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConverterError {
    #[error("{token} is not a reserve of pool {pool}")]
    UnknownReserve { pool: TokenId, token: TokenId },

    #[error("Reserve list does not match pool {pool}")]
    ReserveMismatch { pool: TokenId },

    #[error("Return {actual} below minimum {minimum}")]
    ReturnTooLow { actual: Amount, minimum: Amount },

    #[error("Zero amount")]
    ZeroAmount,

    #[error("Pool {0} has no liquidity")]
    EmptyPool(TokenId),

    #[error("Math error: {0}")]
    Math(#[from] MathError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Converter families. Legacy liquidity pools never tracked an average rate,
/// standard pools are the only ones liquidity protection supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConverterType {
    LiquidityPool,
    StandardPool,
}

/// Capabilities resolved once when a converter is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterCapabilities {
    pub converter_type: ConverterType,
    pub version: u16,
    pub reserve_count: usize,
    pub has_average_rate: bool,
    pub balanced_weights: bool,
}

// converters from this version on expose recent_average_rate
pub const AVERAGE_RATE_MIN_VERSION: u16 = 28;

pub trait LiquidityPoolConverter: Debug {
    /// Pool token (anchor) issued by this converter.
    fn anchor(&self) -> TokenId;

    /// Account holding the reserves on the ledger.
    fn account(&self) -> AccountId;

    fn converter_type(&self) -> ConverterType;

    fn version(&self) -> u16;

    fn reserve_tokens(&self) -> Vec<TokenId>;

    fn reserve_weight(&self, token: TokenId) -> Result<Ppm, ConverterError>;

    fn reserve_balance(&self, token: TokenId) -> Result<Amount, ConverterError>;

    /// Pull `amounts` of `tokens` from `caller` and issue pool tokens to it.
    fn add_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: AccountId,
        tokens: &[TokenId],
        amounts: &[Amount],
        min_return: Amount,
    ) -> Result<Amount, ConverterError>;

    /// Burn `pool_amount` pool tokens held by `caller` and send it the reserves.
    fn remove_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: AccountId,
        pool_amount: Amount,
        tokens: &[TokenId],
        min_returns: &[Amount],
    ) -> Result<Vec<Amount>, ConverterError>;

    /// Trade `amount` of `source` for the other reserve. Moves the spot rate only.
    fn convert(
        &mut self,
        ledger: &mut dyn TokenLedger,
        trader: AccountId,
        source: TokenId,
        amount: Amount,
    ) -> Result<Amount, ConverterError>;

    /// Recent average rate of 1 `token` in units of the other reserve.
    fn recent_average_rate(&self, token: TokenId) -> Result<Fraction, ConverterError>;

    /// Lets the average rate catch up with the spot rate.
    fn sync_average_rate(&mut self) -> Result<(), ConverterError>;

    fn box_clone(&self) -> Box<dyn LiquidityPoolConverter>;

    fn capabilities(&self) -> ConverterCapabilities {
        let reserves = self.reserve_tokens();
        let half = Ppm::new(PPM_RESOLUTION / 2);
        let balanced_weights = reserves
            .iter()
            .all(|token| matches!(self.reserve_weight(*token), Ok(weight) if weight == half));
        ConverterCapabilities {
            converter_type: self.converter_type(),
            version: self.version(),
            reserve_count: reserves.len(),
            has_average_rate: self.version() >= AVERAGE_RATE_MIN_VERSION,
            balanced_weights,
        }
    }
}

impl Clone for Box<dyn LiquidityPoolConverter> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// In-memory standard pool: two reserves at 50/50 weight.
#[derive(Debug, Clone)]
pub struct StandardPoolConverter {
    anchor: TokenId,
    account: AccountId,
    reserves: [TokenId; 2],
    balances: [Amount; 2],
    // rate of reserves[0] in reserves[1] units
    average_rate: Fraction,
}

impl StandardPoolConverter {
    pub fn new(anchor: TokenId, account: AccountId, reserves: [TokenId; 2]) -> Self {
        Self {
            anchor,
            account,
            reserves,
            balances: [U256::zero(), U256::zero()],
            average_rate: Fraction::one(),
        }
    }

    fn index_of(&self, token: TokenId) -> Result<usize, ConverterError> {
        self.reserves
            .iter()
            .position(|t| *t == token)
            .ok_or(ConverterError::UnknownReserve {
                pool: self.anchor,
                token,
            })
    }

    // maps caller-ordered (tokens, amounts) onto reserve order
    fn ordered(&self, tokens: &[TokenId], amounts: &[Amount]) -> Result<[Amount; 2], ConverterError> {
        if tokens.len() != 2 || amounts.len() != 2 {
            return Err(ConverterError::ReserveMismatch { pool: self.anchor });
        }
        let mut ordered = [U256::zero(), U256::zero()];
        let first = self.index_of(tokens[0])?;
        let second = self.index_of(tokens[1])?;
        if first == second {
            return Err(ConverterError::ReserveMismatch { pool: self.anchor });
        }
        ordered[first] = amounts[0];
        ordered[second] = amounts[1];
        Ok(ordered)
    }

    pub fn spot_rate(&self, token: TokenId) -> Result<Fraction, ConverterError> {
        let i = self.index_of(token)?;
        Ok(Fraction::new(self.balances[1 - i], self.balances[i])?)
    }

    /// Overrides the tracked average rate of `token`.
    pub fn set_average_rate(&mut self, token: TokenId, rate: Fraction) -> Result<(), ConverterError> {
        let i = self.index_of(token)?;
        self.average_rate = if i == 0 { rate } else { rate.inverse()? };
        Ok(())
    }
}

impl LiquidityPoolConverter for StandardPoolConverter {
    fn anchor(&self) -> TokenId {
        self.anchor
    }

    fn account(&self) -> AccountId {
        self.account
    }

    fn converter_type(&self) -> ConverterType {
        ConverterType::StandardPool
    }

    fn version(&self) -> u16 {
        46
    }

    fn reserve_tokens(&self) -> Vec<TokenId> {
        self.reserves.to_vec()
    }

    fn reserve_weight(&self, token: TokenId) -> Result<Ppm, ConverterError> {
        self.index_of(token)?;
        Ok(Ppm::new(PPM_RESOLUTION / 2))
    }

    fn reserve_balance(&self, token: TokenId) -> Result<Amount, ConverterError> {
        Ok(self.balances[self.index_of(token)?])
    }

    fn add_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: AccountId,
        tokens: &[TokenId],
        amounts: &[Amount],
        min_return: Amount,
    ) -> Result<Amount, ConverterError> {
        let amounts = self.ordered(tokens, amounts)?;
        if amounts.iter().any(|a| a.is_zero()) {
            return Err(ConverterError::ZeroAmount);
        }

        let supply = ledger.total_supply(self.anchor);
        let pool_amount = if supply.is_zero() {
            // first deposit: geometric mean
            math::floor_sqrt(math::mul(amounts[0], amounts[1])?)
        } else {
            let first = math::mul_div(amounts[0], supply, self.balances[0])?;
            let second = math::mul_div(amounts[1], supply, self.balances[1])?;
            math::min(first, second)
        };
        if pool_amount.is_zero() || pool_amount < min_return {
            return Err(ConverterError::ReturnTooLow {
                actual: pool_amount,
                minimum: min_return,
            });
        }

        for (i, amount) in amounts.iter().enumerate() {
            ledger.transfer(self.reserves[i], caller, self.account, *amount)?;
            self.balances[i] = math::add(self.balances[i], *amount)?;
        }
        ledger.mint(self.anchor, caller, pool_amount)?;
        if supply.is_zero() {
            self.sync_average_rate()?;
        }
        Ok(pool_amount)
    }

    fn remove_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: AccountId,
        pool_amount: Amount,
        tokens: &[TokenId],
        min_returns: &[Amount],
    ) -> Result<Vec<Amount>, ConverterError> {
        if pool_amount.is_zero() {
            return Err(ConverterError::ZeroAmount);
        }
        let minimums = self.ordered(tokens, min_returns)?;
        let supply = ledger.total_supply(self.anchor);
        if supply.is_zero() {
            return Err(ConverterError::EmptyPool(self.anchor));
        }

        let mut returns = [U256::zero(), U256::zero()];
        for i in 0..2 {
            returns[i] = math::mul_div(pool_amount, self.balances[i], supply)?;
            if returns[i] < minimums[i] {
                return Err(ConverterError::ReturnTooLow {
                    actual: returns[i],
                    minimum: minimums[i],
                });
            }
        }

        ledger.burn(self.anchor, caller, pool_amount)?;
        for (i, amount) in returns.iter().enumerate() {
            ledger.transfer(self.reserves[i], self.account, caller, *amount)?;
            self.balances[i] = math::sub(self.balances[i], *amount)?;
        }

        // hand back in the caller's token order
        tokens
            .iter()
            .map(|token| Ok(returns[self.index_of(*token)?]))
            .collect()
    }

    // constant product, no fee
    fn convert(
        &mut self,
        ledger: &mut dyn TokenLedger,
        trader: AccountId,
        source: TokenId,
        amount: Amount,
    ) -> Result<Amount, ConverterError> {
        if amount.is_zero() {
            return Err(ConverterError::ZeroAmount);
        }
        let s = self.index_of(source)?;
        let t = 1 - s;
        let target_amount = math::mul_div(
            amount,
            self.balances[t],
            math::add(self.balances[s], amount)?,
        )?;

        ledger.transfer(source, trader, self.account, amount)?;
        ledger.transfer(self.reserves[t], self.account, trader, target_amount)?;
        self.balances[s] = math::add(self.balances[s], amount)?;
        self.balances[t] = math::sub(self.balances[t], target_amount)?;
        Ok(target_amount)
    }

    fn sync_average_rate(&mut self) -> Result<(), ConverterError> {
        self.average_rate = Fraction::new(self.balances[1], self.balances[0])?;
        Ok(())
    }

    fn recent_average_rate(&self, token: TokenId) -> Result<Fraction, ConverterError> {
        let i = self.index_of(token)?;
        if i == 0 {
            Ok(self.average_rate)
        } else {
            Ok(self.average_rate.inverse()?)
        }
    }

    fn box_clone(&self) -> Box<dyn LiquidityPoolConverter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;

    const POOL: TokenId = TokenId(10);
    const BASE: TokenId = TokenId(3);
    const NETWORK: TokenId = TokenId(1);
    const CONVERTER: AccountId = AccountId(200);
    const LP: AccountId = AccountId(5);

    fn u(x: u64) -> U256 {
        U256::from(x)
    }

    fn seeded() -> (StandardPoolConverter, InMemoryLedger) {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(BASE, LP, u(1_000_000)).unwrap();
        ledger.mint(NETWORK, LP, u(1_000_000)).unwrap();
        let mut converter = StandardPoolConverter::new(POOL, CONVERTER, [BASE, NETWORK]);
        converter
            .add_liquidity(&mut ledger, LP, &[BASE, NETWORK], &[u(10_000), u(5_000)], u(1))
            .unwrap();
        (converter, ledger)
    }

    #[test]
    fn initial_supply_is_geometric_mean() {
        let (converter, ledger) = seeded();
        assert_eq!(ledger.total_supply(POOL), u(7071)); // floor(sqrt(5e7))
        assert_eq!(converter.reserve_balance(BASE).unwrap(), u(10_000));
        assert_eq!(ledger.balance_of(BASE, CONVERTER), u(10_000));
    }

    #[test]
    fn spot_and_average_rates() {
        let (converter, _) = seeded();
        let spot = converter.spot_rate(BASE).unwrap();
        assert_eq!((spot.n, spot.d), (u(5_000), u(10_000)));

        let average = converter.recent_average_rate(NETWORK).unwrap();
        assert!(average.same_value(&Fraction::new(u(2), u(1)).unwrap()));
    }

    #[test]
    fn proportional_add_and_remove() {
        let (mut converter, mut ledger) = seeded();
        let issued = converter
            .add_liquidity(&mut ledger, LP, &[NETWORK, BASE], &[u(500), u(1_000)], u(1))
            .unwrap();
        assert_eq!(issued, u(707));

        let returns = converter
            .remove_liquidity(&mut ledger, LP, issued, &[BASE, NETWORK], &[u(1), u(1)])
            .unwrap();
        assert_eq!(returns, vec![u(999), u(499)]);
        assert_eq!(ledger.total_supply(POOL), u(7071));
    }

    #[test]
    fn convert_moves_spot_but_not_average() {
        let (mut converter, mut ledger) = seeded();
        let out = converter.convert(&mut ledger, LP, NETWORK, u(5_000)).unwrap();
        assert_eq!(out, u(5_000)); // 5000 * 10000 / 10000

        let spot = converter.spot_rate(BASE).unwrap();
        assert_eq!((spot.n, spot.d), (u(10_000), u(5_000)));
        let average = converter.recent_average_rate(BASE).unwrap();
        assert_eq!((average.n, average.d), (u(5_000), u(10_000)));
    }

    #[test]
    fn capabilities_of_standard_pool() {
        let (converter, _) = seeded();
        let caps = converter.capabilities();
        assert_eq!(caps.converter_type, ConverterType::StandardPool);
        assert_eq!(caps.reserve_count, 2);
        assert!(caps.has_average_rate);
        assert!(caps.balanced_weights);
    }

    #[test]
    fn unknown_reserve_rejected() {
        let (converter, _) = seeded();
        assert!(matches!(
            converter.reserve_balance(TokenId(99)),
            Err(ConverterError::UnknownReserve { .. })
        ));
    }
}
