// 10.0 config.rs: protection schedule and limits in one place.
// 10.1 presets per environment, 10.2 validation, 10.3 json loading.
// amounts are raw token units (18 decimals on mainnet/testnet).

use crate::compensation::ProtectionSchedule;
use crate::types::{serde_u256, Amount, Ppm, U256, PPM_RESOLUTION};
use serde::{Deserialize, Serialize};

const DAY: u64 = 86_400;
const HOUR: u64 = 3_600;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionParams {
    // below this age a position gets no compensation at all
    pub min_protection_delay: u64,
    // from this age on a position is fully protected
    pub max_protection_delay: u64,
    // network token compensation stays locked this long
    pub lock_duration: u64,
    pub average_rate_max_deviation: Ppm,
    // base token deposits need the pool to hold at least this much network token
    #[serde(with = "serde_u256")]
    pub min_network_token_liquidity_for_minting: Amount,
    // per pool cap on network tokens minted against base deposits, unless overridden
    #[serde(with = "serde_u256")]
    pub default_network_token_minting_limit: Amount,
    // network token compensation below this is dropped
    #[serde(with = "serde_u256")]
    pub min_network_compensation: Amount,
}

fn tokens(whole: u64) -> Amount {
    U256::from(whole) * U256::exp10(18)
}

impl Default for ProtectionParams {
    fn default() -> Self {
        Self::development()
    }
}

impl ProtectionParams {
    // 10.1: 30 day ramp to full protection at 100 days, 24h lock, 0.5% rate deviation
    pub fn mainnet() -> Self {
        Self {
            min_protection_delay: 30 * DAY,
            max_protection_delay: 100 * DAY,
            lock_duration: 24 * HOUR,
            average_rate_max_deviation: Ppm::new(5_000),
            min_network_token_liquidity_for_minting: tokens(1_000),
            default_network_token_minting_limit: tokens(20_000),
            min_network_compensation: U256::exp10(16),
        }
    }

    pub fn testnet() -> Self {
        Self {
            min_protection_delay: DAY,
            max_protection_delay: 7 * DAY,
            lock_duration: HOUR,
            average_rate_max_deviation: Ppm::new(10_000),
            min_network_token_liquidity_for_minting: tokens(100),
            default_network_token_minting_limit: tokens(1_000_000),
            min_network_compensation: U256::exp10(16),
        }
    }

    // short delays and raw unit amounts for the simulator and tests
    pub fn development() -> Self {
        Self {
            min_protection_delay: 60,
            max_protection_delay: 600,
            lock_duration: 60,
            average_rate_max_deviation: Ppm::new(50_000),
            min_network_token_liquidity_for_minting: U256::from(1_000u64),
            default_network_token_minting_limit: U256::from(1_000_000_000u64),
            min_network_compensation: U256::one(),
        }
    }

    // 10.2
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_delays(self.min_protection_delay, self.max_protection_delay)?;
        validate_deviation(self.average_rate_max_deviation)?;
        Ok(())
    }

    pub fn schedule(&self) -> ProtectionSchedule {
        ProtectionSchedule {
            min_protection_delay: self.min_protection_delay,
            max_protection_delay: self.max_protection_delay,
        }
    }

    // 10.3
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

pub fn validate_delays(min_delay: u64, max_delay: u64) -> Result<(), ConfigError> {
    if min_delay >= max_delay {
        return Err(ConfigError::InvalidDelays {
            min: min_delay,
            max: max_delay,
        });
    }
    Ok(())
}

pub fn validate_deviation(deviation: Ppm) -> Result<(), ConfigError> {
    if deviation.value() == 0 || deviation.value() > PPM_RESOLUTION {
        return Err(ConfigError::InvalidDeviation(deviation));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Min protection delay {min} must be below max {max}")]
    InvalidDelays { min: u64, max: u64 },

    #[error("Average rate deviation {0} must be in (0, 100%]")]
    InvalidDeviation(Ppm),

    #[error("Cannot parse config: {0}")]
    Parse(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn params(&self) -> ProtectionParams {
        match self {
            Environment::Development => ProtectionParams::development(),
            Environment::Testnet => ProtectionParams::testnet(),
            Environment::Mainnet => ProtectionParams::mainnet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.params().validate().is_ok());
        assert!(Environment::Testnet.params().validate().is_ok());
        assert!(Environment::Mainnet.params().validate().is_ok());
    }

    #[test]
    fn test_mainnet_schedule() {
        let params = ProtectionParams::mainnet();
        assert_eq!(params.min_protection_delay, 2_592_000);
        assert_eq!(params.max_protection_delay, 8_640_000);
        assert_eq!(params.lock_duration, 86_400);
        assert_eq!(params.average_rate_max_deviation.as_fraction(), rust_decimal_macros::dec!(0.005));
    }

    #[test]
    fn test_invalid_delays() {
        let mut params = ProtectionParams::mainnet();
        params.min_protection_delay = params.max_protection_delay;
        assert!(matches!(params.validate(), Err(ConfigError::InvalidDelays { .. })));
    }

    #[test]
    fn test_invalid_deviation() {
        let mut params = ProtectionParams::mainnet();
        params.average_rate_max_deviation = Ppm::new(0);
        assert!(matches!(params.validate(), Err(ConfigError::InvalidDeviation(_))));

        params.average_rate_max_deviation = Ppm::new(PPM_RESOLUTION + 1);
        assert!(params.validate().is_err());

        params.average_rate_max_deviation = Ppm::FULL;
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let params = ProtectionParams::mainnet();
        let json = params.to_json().unwrap();
        // amounts go out as decimal strings
        assert!(json.contains("\"10000000000000000\""));

        let back = ProtectionParams::from_json(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(ProtectionParams::from_json("{"), Err(ConfigError::Parse(_))));

        let mut params = ProtectionParams::testnet();
        params.max_protection_delay = 0;
        let json = serde_json::to_string(&params).unwrap();
        assert!(matches!(
            ProtectionParams::from_json(&json),
            Err(ConfigError::InvalidDelays { .. })
        ));
    }
}
