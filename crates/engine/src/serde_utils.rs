//! Serde helpers for raw on-chain integers.
//!
//! Snapshot producers hand us base-unit amounts that routinely exceed 2^53, so
//! JSON numbers are only safe for small values. These helpers accept decimal
//! strings, `0x`-prefixed hex strings and plain integers, and always emit
//! decimal strings.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

struct U256Visitor;

impl Visitor<'_> for U256Visitor {
    type Value = U256;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an unsigned integer or a decimal/hex string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<U256, E> {
        Ok(U256::from(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<U256, E> {
        u64::try_from(value)
            .map(U256::from)
            .map_err(|_| E::custom(format!("negative amount: {}", value)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<U256, E> {
        U256::from_str(value.trim()).map_err(|e| E::custom(format!("invalid amount {value:?}: {e}")))
    }
}

/// `U256` as a decimal string.
pub mod u256_dec {
    use super::*;

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(U256Visitor)
    }
}
