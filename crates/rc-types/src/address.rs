use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use starknet::core::types::Felt;

/// On-chain identity of a token, pool, strategy or vault.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Felt);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address '{input}': {reason}")]
pub struct ParseAddressError {
    pub input: String,
    pub reason: &'static str,
}

impl Address {
    pub const ZERO: Self = Self(Felt::ZERO);

    pub const fn from_felt(felt: Felt) -> Self {
        Self(felt)
    }

    pub const fn as_felt(&self) -> Felt {
        self.0
    }

    /// Short form used in log lines, e.g. `0x3bdb…88b6`.
    pub fn short(&self) -> String {
        let full = self.to_string();
        if full.len() <= 12 {
            return full;
        }
        format!("{}…{}", &full[..6], &full[full.len() - 4..])
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self(Felt::from(value))
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = |reason| ParseAddressError {
            input: s.to_string(),
            reason,
        };

        let Some(digits) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        else {
            return Err(err("missing 0x prefix"));
        };
        if digits.is_empty() {
            return Err(err("no hex digits"));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err("non-hex character"));
        }

        Felt::from_hex(trimmed)
            .map(Self)
            .map_err(|_| err("value out of range"))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let address: Address = "0x3bDbd2Ed1A214Ca4ba4421ddD7236ccA3EF088b6".parse().unwrap();
        assert_eq!(
            address.to_string(),
            "0x3bdbd2ed1a214ca4ba4421ddd7236cca3ef088b6"
        );
        assert_eq!(address.short(), "0x3bdb…88b6");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("3bdbd2ed".parse::<Address>().is_err());
        assert!("0x".parse::<Address>().is_err());
        assert!("0xzz12".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let address = Address::from(255);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"0xff\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }
}
