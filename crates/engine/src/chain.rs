//! Chain helpers for the networks the emission engine allocates across.
//!
//! The full `NamedChain` type comes from `alloy_chains`; this module pins the
//! subset the protocol is deployed on and provides a serde helper that encodes
//! a chain as its numeric id, which is how chains appear in config files and
//! in the proposal payload.

use alloy_chains::NamedChain;

/// All chains the protocol distributes rewards on.
pub const SUPPORTED_CHAINS: &[NamedChain] =
    &[NamedChain::Moonbeam, NamedChain::Base, NamedChain::Optimism];

/// Try to create a supported `NamedChain` from a chain ID.
pub fn chain_from_id(id: u64) -> Option<NamedChain> {
    NamedChain::try_from(id)
        .ok()
        .filter(|chain| SUPPORTED_CHAINS.contains(chain))
}

/// Numeric id of a chain.
pub fn chain_id(chain: NamedChain) -> u64 {
    chain.into()
}

/// Serde helper module for serializing/deserializing NamedChain as a u64 chain ID.
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct ChainConfig {
///     #[serde(with = "chain_serde")]
///     chain: NamedChain,
/// }
/// ```
pub mod chain_serde {
    use alloy_chains::NamedChain;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(chain: &NamedChain, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(super::chain_id(*chain))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NamedChain, D::Error>
    where
        D: Deserializer<'de>,
    {
        let id = u64::deserialize(deserializer)?;
        super::chain_from_id(id)
            .ok_or_else(|| serde::de::Error::custom(format!("Unknown chain ID: {}", id)))
    }
}
