//! Identifiers and addresses

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer};

pub type UniverseId = u64;
pub type MarketId = u64;
pub type Timestamp = u64;

/// Outcome slot index; slot 0 is the implicit "invalid" outcome
pub type OutcomeSlot = u8;

pub const GENESIS_UNIVERSE: UniverseId = 0;

pub const INVALID_OUTCOME: OutcomeSlot = 0;

pub const DAY: u64 = 86_400;

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Canonical sink for migrated and cashed-in REP
    pub const BURN: Address = Address::from_low_u64(1);

    /// Holder of the Cash minted for complete sets
    pub const SHARE_TOKEN: Address = Address::from_low_u64(2);

    /// Holder of escrowed report and dispute bonds
    pub const BOND_ESCROW: Address = Address::from_low_u64(3);

    /// Reserved protocol addresses occupy the low 256 values
    const RESERVED_LIMIT: u64 = 0x100;

    pub const fn from_low_u64(value: u64) -> Self {
        let be = value.to_be_bytes();
        let mut bytes = [0u8; 20];
        let mut i = 0;
        while i < 8 {
            bytes[12 + i] = be[i];
            i += 1;
        }
        Address(bytes)
    }

    /// Protocol-owned address that no caller may act as
    pub fn is_reserved(&self) -> bool {
        self.0[..12].iter().all(|b| *b == 0) && {
            let mut low = [0u8; 8];
            low.copy_from_slice(&self.0[12..]);
            u64::from_be_bytes(low) < Self::RESERVED_LIMIT
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("expected 20 bytes, got {0}")]
    Length(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)?;
        if bytes.len() != 20 {
            return Err(AddressParseError::Length(bytes.len()));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which ledger a balance lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerKind {
    /// REP
    Stake,
    /// Cash
    Collateral,
    /// One outcome slot of one market
    OutcomeClaim,
}

/// Outcome-claim token identity: one slot of one market in one universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId {
    pub universe: UniverseId,
    pub market: MarketId,
    pub outcome: OutcomeSlot,
}

impl TokenId {
    pub fn new(universe: UniverseId, market: MarketId, outcome: OutcomeSlot) -> Self {
        Self { universe, market, outcome }
    }

    /// Same claim, different universe
    pub fn in_universe(&self, universe: UniverseId) -> Self {
        Self { universe, ..*self }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.universe, self.market, self.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_addresses() {
        assert_eq!(Address::BURN.to_string(), "0x0000000000000000000000000000000000000001");
        assert!(Address::ZERO.is_reserved());
        assert!(Address::BURN.is_reserved());
        assert!(Address::SHARE_TOKEN.is_reserved());
        assert!(Address::BOND_ESCROW.is_reserved());
        assert!(!Address::from_low_u64(0x100).is_reserved());
        assert!(!Address([0xAB; 20]).is_reserved());
    }

    #[test]
    fn test_parse_address() {
        let a: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        assert_eq!(a, Address::from_low_u64(0xff));
        let b: Address = "abababababababababababababababababababab".parse().unwrap();
        assert_eq!(b, Address([0xAB; 20]));
        assert_eq!("0x1234".parse::<Address>(), Err(AddressParseError::Length(2)));
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_token_id_rebase() {
        let t = TokenId::new(0, 7, 2);
        assert_eq!(t.in_universe(3), TokenId::new(3, 7, 2));
        assert_eq!(t.to_string(), "0/7/2");
    }
}
