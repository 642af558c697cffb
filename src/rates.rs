// 3.0 rates.rs: spot and average reserve rates read from a pool, the deviation circuit
// breaker, and the pool token rate. 3.3 bounds rates before they enter the compensation math.

use crate::converter::{ConverterError, LiquidityPoolConverter};
use crate::math::{self, Fraction, MathError, MAX_U128};
use crate::types::{Amount, Ppm, TokenId, U256, PPM_RESOLUTION};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("Average rate of {token} deviates from spot by more than {max_deviation}")]
    RateDeviation { token: TokenId, max_deviation: Ppm },

    #[error("Rate cannot be bounded to 128 bits")]
    RateTooLarge,

    #[error("Pool {0} does not have exactly two reserves")]
    NotTwoReserves(TokenId),

    #[error("Converter error: {0}")]
    Converter(#[from] ConverterError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRates {
    pub spot: Fraction,
    pub average: Fraction,
}

pub fn other_reserve(
    converter: &dyn LiquidityPoolConverter,
    reserve: TokenId,
) -> Result<TokenId, RateError> {
    let reserves = converter.reserve_tokens();
    if reserves.len() != 2 {
        return Err(RateError::NotTwoReserves(converter.anchor()));
    }
    if reserves[0] == reserve {
        Ok(reserves[1])
    } else if reserves[1] == reserve {
        Ok(reserves[0])
    } else {
        Err(ConverterError::UnknownReserve {
            pool: converter.anchor(),
            token: reserve,
        }
        .into())
    }
}

// 3.1: spot rate of `reserve` = other balance / reserve balance.
pub fn reserve_token_rates(
    converter: &dyn LiquidityPoolConverter,
    reserve: TokenId,
    max_deviation: Ppm,
    validate_average_rate: bool,
) -> Result<ReserveRates, RateError> {
    let other = other_reserve(converter, reserve)?;
    let spot = Fraction::new(
        converter.reserve_balance(other)?,
        converter.reserve_balance(reserve)?,
    )?;
    let average = converter.recent_average_rate(reserve)?;

    if validate_average_rate && !average_rate_in_range(&spot, &average, max_deviation)? {
        tracing::warn!(
            token = %reserve,
            spot = ?spot.to_decimal(),
            average = ?average.to_decimal(),
            "average rate outside allowed deviation"
        );
        return Err(RateError::RateDeviation {
            token: reserve,
            max_deviation,
        });
    }
    Ok(ReserveRates { spot, average })
}

// 3.2: average / spot must sit in [1 - dev, 1 / (1 - dev)].
// cross multiplied so no division rounds the bounds.
pub fn average_rate_in_range(
    spot: &Fraction,
    average: &Fraction,
    max_deviation: Ppm,
) -> Result<bool, MathError> {
    let resolution = U256::from(PPM_RESOLUTION);
    let ppm_delta = math::sub(resolution, max_deviation.as_u256())?;

    let spot_n_avg_d = math::mul(spot.n, average.d)?;
    let spot_d_avg_n = math::mul(spot.d, average.n)?;

    let min = math::mul(math::mul(spot_n_avg_d, ppm_delta)?, ppm_delta)?;
    let mid = math::mul(math::mul(spot_d_avg_n, ppm_delta)?, resolution)?;
    let max = math::mul(math::mul(spot_n_avg_d, resolution)?, resolution)?;
    Ok(min <= mid && mid <= max)
}

// 3.4: reserve units per pool token. a 50/50 pool's supply is worth twice either reserve.
pub fn pool_token_rate(
    converter: &dyn LiquidityPoolConverter,
    pool_token_supply: Amount,
    reserve: TokenId,
) -> Result<Fraction, RateError> {
    let reserve_balance = converter.reserve_balance(reserve)?;
    Ok(Fraction::new(
        math::mul(reserve_balance, U256::from(2u8))?,
        pool_token_supply,
    )?)
}

/// Rates captured for a removal. Each component fits in 128 bits so products
/// of two components never overflow 256 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedRates {
    pub add_spot: Fraction,
    pub remove_spot: Fraction,
    pub remove_average: Fraction,
}

impl PackedRates {
    pub fn pack(
        add_spot: Fraction,
        remove_spot: Fraction,
        remove_average: Fraction,
    ) -> Result<Self, RateError> {
        Ok(Self {
            add_spot: bound_to_u128(add_spot)?,
            remove_spot: bound_to_u128(remove_spot)?,
            remove_average: bound_to_u128(remove_average)?,
        })
    }
}

fn bound_to_u128(rate: Fraction) -> Result<Fraction, RateError> {
    let (n, d) = math::reduced_ratio(rate.n, rate.d, MAX_U128);
    if d.is_zero() {
        return Err(RateError::RateTooLarge);
    }
    Ok(Fraction { n, d })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::StandardPoolConverter;
    use crate::ledger::{InMemoryLedger, TokenLedger};
    use crate::types::AccountId;

    const POOL: TokenId = TokenId(10);
    const BASE: TokenId = TokenId(3);
    const NETWORK: TokenId = TokenId(1);

    fn u(x: u64) -> U256 {
        U256::from(x)
    }

    fn frac(n: u64, d: u64) -> Fraction {
        Fraction::new(u(n), u(d)).unwrap()
    }

    fn pool() -> (StandardPoolConverter, InMemoryLedger) {
        let mut ledger = InMemoryLedger::new();
        let lp = AccountId(5);
        ledger.mint(BASE, lp, u(10_000)).unwrap();
        ledger.mint(NETWORK, lp, u(5_000)).unwrap();
        let mut converter = StandardPoolConverter::new(POOL, AccountId(200), [BASE, NETWORK]);
        converter
            .add_liquidity(&mut ledger, lp, &[BASE, NETWORK], &[u(10_000), u(5_000)], u(1))
            .unwrap();
        (converter, ledger)
    }

    #[test]
    fn spot_rate_is_other_over_self() {
        let (converter, _) = pool();
        let rates = reserve_token_rates(&converter, BASE, Ppm::new(5_000), true).unwrap();
        assert_eq!((rates.spot.n, rates.spot.d), (u(5_000), u(10_000)));

        let rates = reserve_token_rates(&converter, NETWORK, Ppm::new(5_000), true).unwrap();
        assert_eq!((rates.spot.n, rates.spot.d), (u(10_000), u(5_000)));
    }

    #[test]
    fn deviation_bounds_are_inclusive() {
        let spot = frac(1_000_000, 1_000_000);
        let dev = Ppm::new(10_000); // 1%

        assert!(average_rate_in_range(&spot, &frac(990_000, 1_000_000), dev).unwrap());
        assert!(!average_rate_in_range(&spot, &frac(989_999, 1_000_000), dev).unwrap());
        // upper bound is 1 / 0.99, not 1.01
        assert!(average_rate_in_range(&spot, &frac(1_000_000, 990_000), dev).unwrap());
        assert!(!average_rate_in_range(&spot, &frac(1_000_001, 990_000), dev).unwrap());
    }

    #[test]
    fn stale_average_trips_breaker() {
        let (mut converter, _) = pool();
        converter.set_average_rate(BASE, frac(6_000, 10_000)).unwrap();

        let result = reserve_token_rates(&converter, BASE, Ppm::new(5_000), true);
        assert!(matches!(result, Err(RateError::RateDeviation { .. })));

        // unvalidated reads still succeed
        let rates = reserve_token_rates(&converter, BASE, Ppm::new(5_000), false).unwrap();
        assert_eq!((rates.average.n, rates.average.d), (u(6_000), u(10_000)));
    }

    #[test]
    fn pool_token_rate_doubles_reserve() {
        let (converter, ledger) = pool();
        let supply = ledger.total_supply(POOL);
        let rate = pool_token_rate(&converter, supply, BASE).unwrap();
        assert_eq!((rate.n, rate.d), (u(20_000), u(7_071)));

        assert!(pool_token_rate(&converter, U256::zero(), BASE).is_err());
    }

    #[test]
    fn packing_bounds_components() {
        let huge = Fraction::new(U256::MAX, U256::MAX / 2).unwrap();
        let packed = PackedRates::pack(frac(1, 2), huge, frac(3, 4)).unwrap();
        assert!(packed.remove_spot.n <= MAX_U128 && packed.remove_spot.d <= MAX_U128);
        assert_eq!(packed.add_spot, frac(1, 2));

        let degenerate = Fraction::new(U256::MAX, u(1)).unwrap();
        assert_eq!(PackedRates::pack(degenerate, frac(1, 1), frac(1, 1)), Err(RateError::RateTooLarge));
    }
}
