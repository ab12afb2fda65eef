//! Protocol parameters and genesis allocation

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use settlement_model::ReportingWindows;

use crate::types::{Address, DAY};

pub const E18: u128 = 1_000_000_000_000_000_000;

/// Fewest outcome slots a market can have: invalid plus two real outcomes
pub const MIN_OUTCOME_SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// Cash paid per complete set, in Cash base units
    #[serde(deserialize_with = "amount::deserialize")]
    pub price_scale: u128,
    /// REP escrowed by an initial report
    #[serde(deserialize_with = "amount::deserialize")]
    pub rep_bond: u128,
    /// REP escrowed by a dispute
    #[serde(deserialize_with = "amount::deserialize")]
    pub dispute_bond: u128,
    pub designated_reporting_window: u64,
    pub dispute_window: u64,
    pub migration_period: u64,
    pub auction_duration: u64,
    /// Spread factor of the auction curve
    #[serde(deserialize_with = "amount::deserialize")]
    pub auction_scale: u128,
    pub max_outcome_slots: usize,
    pub genesis: Vec<GenesisAllocation>,
}

/// REP minted in the genesis universe at start-up
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisAllocation {
    pub holder: Address,
    #[serde(deserialize_with = "amount::deserialize")]
    pub amount: u128,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            price_scale: 1_000,
            rep_bond: E18,
            dispute_bond: 2 * E18,
            designated_reporting_window: DAY,
            dispute_window: DAY,
            migration_period: 7 * DAY,
            auction_duration: 7 * DAY,
            auction_scale: 1_000_000,
            max_outcome_slots: 16,
            genesis: Vec::new(),
        }
    }
}

impl ProtocolConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: ProtocolConfig = toml::from_str(s).context("Failed to parse protocol config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("Invalid config in: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.price_scale == 0 {
            anyhow::bail!("price_scale must be positive");
        }
        if self.auction_scale == 0 {
            anyhow::bail!("auction_scale must be positive");
        }
        if self.auction_duration == 0 {
            anyhow::bail!("auction_duration must be positive");
        }
        if self.migration_period == 0 {
            anyhow::bail!("migration_period must be positive");
        }
        if self.dispute_window == 0 {
            anyhow::bail!("dispute_window must be positive");
        }
        if self.max_outcome_slots < MIN_OUTCOME_SLOTS || self.max_outcome_slots > u8::MAX as usize {
            anyhow::bail!(
                "max_outcome_slots must be between {} and {}, got {}",
                MIN_OUTCOME_SLOTS,
                u8::MAX,
                self.max_outcome_slots
            );
        }
        if let Some(alloc) = self.genesis.iter().find(|a| a.holder.is_reserved()) {
            anyhow::bail!("genesis allocation to reserved address {}", alloc.holder);
        }
        self.genesis
            .iter()
            .try_fold(0u128, |acc, a| acc.checked_add(a.amount))
            .context("genesis allocations overflow u128")?;
        Ok(())
    }

    pub fn windows(&self) -> ReportingWindows {
        ReportingWindows {
            designated_reporting: self.designated_reporting_window,
            dispute: self.dispute_window,
        }
    }
}

/// u128 amounts as TOML integers or decimal strings
mod amount {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> core::result::Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Int(v) => Ok(v as u128),
            Repr::Text(s) => s.replace('_', "").parse::<u128>().map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProtocolConfig::default();
        config.validate().unwrap();
        assert_eq!(config.windows().dispute, DAY);
        assert_eq!(config.dispute_bond, 2 * config.rep_bond);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ProtocolConfig::from_toml_str(
            r#"
            price_scale = 100
            migration_period = 3600
            rep_bond = "1_000_000_000_000_000_000_000"

            [[genesis]]
            holder = "0x00000000000000000000000000000000000a11ce"
            amount = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.price_scale, 100);
        assert_eq!(config.migration_period, 3_600);
        assert_eq!(config.rep_bond, 1_000 * E18);
        assert_eq!(config.auction_duration, 7 * DAY);
        assert_eq!(config.genesis.len(), 1);
        assert_eq!(config.genesis[0].holder, Address::from_low_u64(0xa11ce));
        assert_eq!(config.genesis[0].amount, 42);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ProtocolConfig::from_toml_str("price_scale = 0").is_err());
        assert!(ProtocolConfig::from_toml_str("max_outcome_slots = 2").is_err());
        assert!(ProtocolConfig::from_toml_str("unknown_field = 1").is_err());
        assert!(ProtocolConfig::from_toml_str(
            r#"
            [[genesis]]
            holder = "0x0000000000000000000000000000000000000001"
            amount = 1
            "#
        )
        .is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "dispute_window = 600").unwrap();
        let config = ProtocolConfig::load(file.path()).unwrap();
        assert_eq!(config.dispute_window, 600);

        let missing = file.path().with_extension("missing");
        let err = ProtocolConfig::load(&missing).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
