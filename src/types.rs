// 1.0: all the primitives live here. ids, amounts, timestamps, ppm.
// each id is a newtype so the compiler catches a pool token passed where an account goes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer. every amount and rate component is one of these.
    pub struct U256(4);
}

// token units. never negative, never floating.
pub type Amount = U256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

// pool tokens (anchors), reserve tokens, the network token and the governance token all share this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position#{}", self.0)
    }
}

// 1.1: parts per million. 1_000_000 = 100%.
pub const PPM_RESOLUTION: u32 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ppm(u32);

impl Ppm {
    pub const FULL: Ppm = Ppm(PPM_RESOLUTION);

    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_full(&self) -> bool {
        self.0 == PPM_RESOLUTION
    }

    // (0, 100%]. zero and anything above full are rejected by callers.
    pub fn is_valid_portion(&self) -> bool {
        self.0 > 0 && self.0 <= PPM_RESOLUTION
    }

    pub fn as_u256(&self) -> U256 {
        U256::from(self.0)
    }

    // 5000 ppm → 0.005
    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 6)
    }
}

impl fmt::Display for Ppm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ppm", self.0)
    }
}

// 1.2: unix timestamp in seconds. the host clock advances it, the engine never reads wall time itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp().max(0) as u64)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn plus(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    pub fn elapsed_since(&self, earlier: Timestamp) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp(self.0 as i64, 0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => write!(f, "{}s", self.0),
        }
    }
}

// 1.3: U256 has no serde impls. amounts go over the wire as decimal strings.
pub mod serde_u256 {
    use super::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_dec_str(&raw)
            .map_err(|e| serde::de::Error::custom(format!("invalid amount {raw:?}: {e:?}")))
    }
}
