use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Kind of yield source a strategy position sits in.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Display,
    AsRefStr,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive, serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Single-asset staking pool paying one emission token.
    SingleStake,
    /// AMM LP tokens staked in a farm.
    AmmLp,
    /// AMM LP farm paying two emission tokens.
    DualRewardLp,
    /// Lending deposit earning interest in the deposit token.
    Lending,
    /// Auto-compounding position whose balance grows in place.
    Compounding,
}

/// How rewards are measured for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Accrual {
    /// `emission rate * pool share * duration`, share taken at window start.
    Rate,
    /// `balance(end) - balance(start)`, clamped at zero.
    Delta,
}

impl Platform {
    pub const fn accrual(self) -> Accrual {
        match self {
            Self::SingleStake | Self::AmmLp | Self::DualRewardLp => Accrual::Rate,
            Self::Lending | Self::Compounding => Accrual::Delta,
        }
    }

    /// Fixed registration order, used to iterate positions deterministically.
    pub const fn registration_index(self) -> u8 {
        match self {
            Self::SingleStake => 0,
            Self::AmmLp => 1,
            Self::DualRewardLp => 2,
            Self::Lending => 3,
            Self::Compounding => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_platform_strings() {
        assert_eq!(Platform::DualRewardLp.to_string(), "dual_reward_lp");
        assert_eq!(Platform::from_str("LENDING").unwrap(), Platform::Lending);
        assert!(Platform::from_str("perp").is_err());
    }

    #[test]
    fn test_registration_index_is_unique_and_ordered() {
        let indexes: Vec<u8> = Platform::iter().map(Platform::registration_index).collect();
        assert!(indexes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_accrual_by_platform() {
        assert_eq!(Platform::AmmLp.accrual(), Accrual::Rate);
        assert_eq!(Platform::Compounding.accrual(), Accrual::Delta);
    }
}
