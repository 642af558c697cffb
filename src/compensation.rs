// 4.0 compensation.rs: impermanent loss compensation. all pure functions.
// 4.1 protected amount plus fee, 4.2 impermanent loss, 4.3 protection level,
// 4.4 compensation blend, 4.5 target amount for a removal.
//
// rounding always leans toward the protocol: ceil on the numerator root,
// floor on the denominator root.

use crate::math::{self, Fraction, MathError, MAX_U256};
use crate::rates::PackedRates;
use crate::types::{Amount, Timestamp, U256};
use serde::{Deserialize, Serialize};

const TWO: U256 = U256([2, 0, 0, 0]);

// 4.1: sqrt(remove_rate / add_rate) * pool_rate * pool_amount
pub fn protected_amount_plus_fee(
    pool_amount: Amount,
    pool_rate: &Fraction,
    add_rate: &Fraction,
    remove_rate: &Fraction,
) -> Result<Amount, MathError> {
    let n = math::mul(math::ceil_sqrt(math::mul(add_rate.d, remove_rate.n)?), pool_rate.n)?;
    let d = math::mul(math::floor_sqrt(math::mul(add_rate.n, remove_rate.d)?), pool_rate.d)?;

    if let Some(x) = n.checked_mul(pool_amount) {
        return math::div(x, d);
    }

    // n * pool_amount overflows: scale the larger factor against d instead
    let (hi, lo) = if n > pool_amount { (n, pool_amount) } else { (pool_amount, n) };
    let (p, q) = math::reduced_ratio(hi, d, MAX_U256 / lo);
    let min = math::mul(math::div(hi, d)?, lo)?;

    if !q.is_zero() {
        return Ok(math::max(min, math::mul(p, lo)? / q));
    }
    Ok(min)
}

// 4.2: 1 - 2 * sqrt(r) / (1 + r) with r = new_rate / prev_rate.
// even and odd sums take different paths so integer division stays exact.
pub fn impermanent_loss(prev_rate: &Fraction, new_rate: &Fraction) -> Result<Fraction, MathError> {
    let ratio_n = math::mul(new_rate.n, prev_rate.d)?;
    let ratio_d = math::mul(new_rate.d, prev_rate.n)?;

    let root = match ratio_n.checked_mul(ratio_d) {
        Some(product) => math::floor_sqrt(product),
        None => math::mul(math::floor_sqrt(ratio_n), math::floor_sqrt(ratio_d))?,
    };
    let sum = math::add(ratio_n, ratio_d)?;

    // x + y >= 2 * sqrt(x * y), so neither subtraction underflows
    if (sum % TWO).is_zero() {
        let half = sum / TWO;
        return Fraction::new(math::sub(half, root)?, half);
    }
    Fraction::new(math::sub(sum, math::mul(root, TWO)?)?, sum)
}

// 4.3: linear ramp. nothing before min_delay, everything from max_delay on.
pub fn protection_level(
    add_timestamp: Timestamp,
    remove_timestamp: Timestamp,
    min_protection_delay: u64,
    max_protection_delay: u64,
) -> Result<Fraction, MathError> {
    let elapsed = remove_timestamp
        .elapsed_since(add_timestamp)
        .ok_or(MathError::Underflow)?;

    if elapsed < min_protection_delay {
        return Ok(Fraction::zero());
    }
    if elapsed >= max_protection_delay {
        return Ok(Fraction::one());
    }
    Fraction::new(U256::from(elapsed), U256::from(max_protection_delay))
}

// 4.4: total * (1 - loss) + amount * loss * level
pub fn compensation_amount(
    amount: Amount,
    total: Amount,
    loss: &Fraction,
    level: &Fraction,
) -> Result<Amount, MathError> {
    let level_n = math::mul(level.n, amount)?;
    let level_d = level.d;
    let max_val = math::max(math::max(level_n, level_d), total);
    let (loss_n, loss_d) = math::reduced_ratio(loss.n, loss.d, MAX_U256 / max_val);

    let lost = math::div(math::mul(loss_n, total)?, loss_d)?;
    let restored = math::div(math::mul(loss_n, level_n)?, math::mul(loss_d, level_d)?)?;
    math::add(math::sub(total, lost)?, restored)
}

/// Settings that shape the protection ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionSchedule {
    pub min_protection_delay: u64,
    pub max_protection_delay: u64,
}

/// Inputs of a single removal, already reduced to the removed portion.
#[derive(Debug, Clone, Copy)]
pub struct RemovalInputs {
    pub pool_amount: Amount,
    pub reserve_amount: Amount,
    pub pool_rate: Fraction,
    pub rates: PackedRates,
    pub add_timestamp: Timestamp,
    pub remove_timestamp: Timestamp,
}

/// Breakdown of a target amount, kept for logs and previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBreakdown {
    pub total: Amount,
    pub loss: Fraction,
    pub level: Fraction,
    pub target: Amount,
}

// 4.5: the amount of reserve tokens the provider is entitled to.
// spot rates size the position value, the average rate prices the loss so a
// single-block price push cannot inflate the payout.
pub fn remove_liquidity_target_amount(
    inputs: &RemovalInputs,
    schedule: &ProtectionSchedule,
) -> Result<TargetBreakdown, MathError> {
    let protected = protected_amount_plus_fee(
        inputs.pool_amount,
        &inputs.pool_rate,
        &inputs.rates.add_spot,
        &inputs.rates.remove_spot,
    )?;
    let total = math::max(inputs.reserve_amount, protected);
    let loss = impermanent_loss(&inputs.rates.add_spot, &inputs.rates.remove_average)?;
    let level = protection_level(
        inputs.add_timestamp,
        inputs.remove_timestamp,
        schedule.min_protection_delay,
        schedule.max_protection_delay,
    )?;
    let target = compensation_amount(inputs.reserve_amount, total, &loss, &level)?;

    Ok(TargetBreakdown {
        total,
        loss,
        level,
        target,
    })
}

// 4.6: network token compensation for a base token shortfall, priced at the average rate.
// dust below min_compensation is dropped.
pub fn network_compensation(
    target_amount: Amount,
    base_amount: Amount,
    average_rate: &Fraction,
    min_compensation: Amount,
) -> Result<Amount, MathError> {
    if target_amount <= base_amount {
        return Ok(U256::zero());
    }
    let delta = math::mul_div(target_amount - base_amount, average_rate.n, average_rate.d)?;
    if delta >= min_compensation {
        Ok(delta)
    } else {
        Ok(U256::zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(x: u64) -> U256 {
        U256::from(x)
    }

    fn frac(n: u64, d: u64) -> Fraction {
        Fraction::new(u(n), u(d)).unwrap()
    }

    #[test]
    fn no_loss_without_rate_change() {
        let loss = impermanent_loss(&frac(1, 2), &frac(5_000, 10_000)).unwrap();
        assert!(loss.is_zero());
    }

    #[test]
    fn loss_for_doubling_rate() {
        // r = 4: 1 - 2*2/5 = 0.2, sum = 5 is odd
        let loss = impermanent_loss(&frac(1, 1), &frac(4, 1)).unwrap();
        assert_eq!((loss.n, loss.d), (u(1), u(5)));

        // r = 9/1 scaled: sum = 10 even, half = 5, root = 3 → 2/5
        let loss = impermanent_loss(&frac(1, 1), &frac(9, 1)).unwrap();
        assert_eq!((loss.n, loss.d), (u(2), u(5)));
    }

    #[test]
    fn loss_is_symmetric_in_direction() {
        let up = impermanent_loss(&frac(1, 1), &frac(4, 1)).unwrap();
        let down = impermanent_loss(&frac(4, 1), &frac(1, 1)).unwrap();
        assert!(up.same_value(&down));
    }

    #[test]
    fn loss_falls_back_on_overflow() {
        // r = 3 with both sides near 2^128, so ratio_n * ratio_d overflows
        let unit = U256::one() << 128;
        let new = Fraction::new(unit * u(3), unit).unwrap();
        let loss = impermanent_loss(&Fraction::one(), &new).unwrap();
        assert!(!loss.is_zero());
        assert!(loss.n < loss.d);
    }

    #[test]
    fn protection_level_ramp() {
        let add = Timestamp::from_secs(0);
        let min = 30 * 86_400;
        let max = 100 * 86_400;

        let early = protection_level(add, Timestamp::from_secs(min - 1), min, max).unwrap();
        assert!(early.is_zero());

        let mid = protection_level(add, Timestamp::from_secs(50 * 86_400), min, max).unwrap();
        assert!(mid.same_value(&frac(1, 2)));

        let full = protection_level(add, Timestamp::from_secs(max), min, max).unwrap();
        assert_eq!(full, Fraction::one());

        assert!(protection_level(Timestamp::from_secs(5), add, min, max).is_err());
    }

    #[test]
    fn protected_amount_matches_pool_share_without_rate_change() {
        // 100 pool tokens at 2 reserve units each, rate unchanged
        let amount =
            protected_amount_plus_fee(u(100), &frac(2, 1), &frac(1, 4), &frac(1, 4)).unwrap();
        assert_eq!(amount, u(200));
    }

    #[test]
    fn protected_amount_scales_with_sqrt_of_rate_change() {
        // rate x4 → sqrt = 2
        let amount =
            protected_amount_plus_fee(u(100), &frac(1, 1), &frac(1, 1), &frac(4, 1)).unwrap();
        assert_eq!(amount, u(200));
    }

    #[test]
    fn protected_amount_overflow_path() {
        let pool_amount = U256::MAX / u(4);
        let amount =
            protected_amount_plus_fee(pool_amount, &frac(6, 4), &frac(1, 1), &frac(1, 1)).unwrap();
        // n = 6, d = 4: the direct product overflows, the result still lands near 1.5x
        assert!(amount > pool_amount);
        assert!(amount >= pool_amount / u(2) * u(3) - u(8));

        let too_big = protected_amount_plus_fee(U256::MAX, &frac(6, 4), &frac(1, 1), &frac(1, 1));
        assert_eq!(too_big, Err(MathError::Overflow));
    }

    #[test]
    fn compensation_blend() {
        let loss = frac(1, 5);
        // no protection: total * (1 - loss)
        assert_eq!(compensation_amount(u(1_000), u(1_000), &loss, &Fraction::zero()).unwrap(), u(800));
        // full protection: total - loss*total + loss*amount
        assert_eq!(compensation_amount(u(1_000), u(1_000), &loss, &Fraction::one()).unwrap(), u(1_000));
        // half protection
        assert_eq!(compensation_amount(u(1_000), u(1_000), &loss, &frac(1, 2)).unwrap(), u(900));
        // zero loss keeps the total regardless of level
        assert_eq!(compensation_amount(u(1_000), u(1_100), &Fraction::zero(), &Fraction::zero()).unwrap(), u(1_100));
    }

    #[test]
    fn target_amount_uses_average_rate_for_loss() {
        let rates = PackedRates::pack(frac(1, 1), frac(4, 1), frac(1, 1)).unwrap();
        let inputs = RemovalInputs {
            pool_amount: u(100),
            reserve_amount: u(100),
            pool_rate: frac(1, 1),
            rates,
            add_timestamp: Timestamp::from_secs(0),
            remove_timestamp: Timestamp::from_secs(1),
        };
        let schedule = ProtectionSchedule {
            min_protection_delay: 10,
            max_protection_delay: 100,
        };
        let breakdown = remove_liquidity_target_amount(&inputs, &schedule).unwrap();
        // spot moved x4 so the position is worth 200, but the average did not move
        assert_eq!(breakdown.total, u(200));
        assert!(breakdown.loss.is_zero());
        assert!(breakdown.level.is_zero());
        assert_eq!(breakdown.target, u(200));
    }

    #[test]
    fn network_compensation_floor() {
        let rate = frac(1, 2);
        assert_eq!(network_compensation(u(100), u(100), &rate, u(1)).unwrap(), U256::zero());
        assert_eq!(network_compensation(u(100), u(80), &rate, u(1)).unwrap(), u(10));
        assert_eq!(network_compensation(u(100), u(99), &rate, u(1)).unwrap(), U256::zero());
    }
}
