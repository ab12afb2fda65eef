//! Universe state
//!
//! A universe owns its own REP, Cash and outcome-claim ledgers, the ETH that
//! backs its Cash, and the report records of every market visible in it.
//! Universes live in an arena owned by the exchange; parent and child links
//! are plain ids.

use std::collections::{BTreeMap, BTreeSet};

use settlement_model::{ReportStatus, PRICE_ONE};

use crate::auction::Auction;
use crate::error::Result;
use crate::ledger::TokenLedger;
use crate::types::{Address, LedgerKind, MarketId, OutcomeSlot, Timestamp, UniverseId};

/// Snapshot taken when a universe forks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkRecord {
    /// Market whose dispute forked the universe
    pub market: MarketId,
    pub forked_at: Timestamp,
    /// ETH backing held at the instant of the fork
    pub eth_at_fork: u128,
    /// REP supply minus burned REP at the instant of the fork
    pub rep_outstanding_at_fork: u128,
}

/// Report record of one market in one universe
///
/// A market with no record in a universe is unreported there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketReport {
    /// Reported, disputable until `reported_at + dispute_window`
    Tentative {
        reporter: Address,
        outcome: OutcomeSlot,
        bond: u128,
        reported_at: Timestamp,
        bond_returned: bool,
    },
    /// Disputed; this universe forked over the market
    Forked {
        tentative: OutcomeSlot,
        disputer: Address,
        proposed: OutcomeSlot,
    },
    /// Child universe created for this outcome of the forking market
    ResolvedByFork(OutcomeSlot),
    /// Finalized in the parent before it forked
    Inherited(OutcomeSlot),
}

impl MarketReport {
    pub fn status(&self) -> ReportStatus {
        match self {
            MarketReport::Tentative { reported_at, .. } => ReportStatus::Tentative {
                reported_at: *reported_at,
            },
            MarketReport::Forked { .. } => ReportStatus::Forked,
            MarketReport::ResolvedByFork(_) | MarketReport::Inherited(_) => ReportStatus::Resolved,
        }
    }

    /// Reported or resolved outcome, final or not
    pub fn outcome(&self) -> Option<OutcomeSlot> {
        match self {
            MarketReport::Tentative { outcome, .. } => Some(*outcome),
            MarketReport::Forked { .. } => None,
            MarketReport::ResolvedByFork(o) | MarketReport::Inherited(o) => Some(*o),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    pub id: UniverseId,
    pub parent: Option<UniverseId>,
    /// Outcome slot this universe stands for in its parent's fork
    pub outcome: Option<OutcomeSlot>,
    pub reputation: TokenLedger,
    pub cash: TokenLedger,
    pub(crate) shares: BTreeMap<(MarketId, OutcomeSlot), TokenLedger>,
    /// ETH backing the Cash ledger
    pub eth_balance: u128,
    /// ETH per Cash unit, `PRICE_ONE` is par
    pub redemption_price: u128,
    /// Indexed by outcome slot
    pub children: Vec<UniverseId>,
    pub fork: Option<ForkRecord>,
    pub cash_migrated: bool,
    pub(crate) migrated_share_tokens: BTreeSet<(MarketId, OutcomeSlot)>,
    pub auction: Option<Auction>,
    pub(crate) reports: BTreeMap<MarketId, MarketReport>,
}

impl Universe {
    pub fn genesis() -> Self {
        Self::new(0, None, None, PRICE_ONE)
    }

    pub fn child(id: UniverseId, parent: UniverseId, outcome: OutcomeSlot, redemption_price: u128) -> Self {
        Self::new(id, Some(parent), Some(outcome), redemption_price)
    }

    fn new(
        id: UniverseId,
        parent: Option<UniverseId>,
        outcome: Option<OutcomeSlot>,
        redemption_price: u128,
    ) -> Self {
        Self {
            id,
            parent,
            outcome,
            reputation: TokenLedger::new(LedgerKind::Stake),
            cash: TokenLedger::new(LedgerKind::Collateral),
            shares: BTreeMap::new(),
            eth_balance: 0,
            redemption_price,
            children: Vec::new(),
            fork: None,
            cash_migrated: false,
            migrated_share_tokens: BTreeSet::new(),
            auction: None,
            reports: BTreeMap::new(),
        }
    }

    pub fn is_forked(&self) -> bool {
        self.fork.is_some()
    }

    /// REP held by the burn address
    pub fn rep_burned(&self) -> u128 {
        self.reputation.balance_of(&Address::BURN)
    }

    /// REP still convertible: supply minus burned
    pub fn rep_outstanding(&self) -> Result<u128> {
        Ok(settlement_model::outstanding_rep(
            self.reputation.total_supply(),
            self.rep_burned(),
        )?)
    }

    pub fn report(&self, market: MarketId) -> Option<&MarketReport> {
        self.reports.get(&market)
    }

    pub fn report_status(&self, market: MarketId) -> ReportStatus {
        self.reports
            .get(&market)
            .map_or(ReportStatus::Unreported, MarketReport::status)
    }

    pub fn share_ledger(&self, market: MarketId, slot: OutcomeSlot) -> Option<&TokenLedger> {
        self.shares.get(&(market, slot))
    }

    pub(crate) fn share_ledger_mut(&mut self, market: MarketId, slot: OutcomeSlot) -> &mut TokenLedger {
        self.shares
            .entry((market, slot))
            .or_insert_with(|| TokenLedger::new(LedgerKind::OutcomeClaim))
    }

    pub fn share_balance(&self, market: MarketId, slot: OutcomeSlot, holder: &Address) -> u128 {
        self.share_ledger(market, slot)
            .map_or(0, |ledger| ledger.balance_of(holder))
    }

    pub fn share_token_migrated(&self, market: MarketId, slot: OutcomeSlot) -> bool {
        self.migrated_share_tokens.contains(&(market, slot))
    }

    /// Every ledger's balances add up to its supply
    pub fn check_ledgers(&self) -> bool {
        self.reputation.check_supply()
            && self.cash.check_supply()
            && self.shares.values().all(TokenLedger::check_supply)
    }
}

/// Read view of a universe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseData {
    pub id: UniverseId,
    pub parent: Option<UniverseId>,
    pub outcome: Option<OutcomeSlot>,
    pub eth_balance: u128,
    /// Liabilities not covered by the ETH balance
    pub eth_deficit: u128,
    pub rep_supply: u128,
    pub cash_supply: u128,
    pub redemption_price: u128,
    pub forked: bool,
    pub children: Vec<UniverseId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_inherits_price_only() {
        let child = Universe::child(4, 1, 2, PRICE_ONE / 2);
        assert_eq!(child.parent, Some(1));
        assert_eq!(child.outcome, Some(2));
        assert_eq!(child.redemption_price, PRICE_ONE / 2);
        assert_eq!(child.reputation.total_supply(), 0);
        assert_eq!(child.eth_balance, 0);
        assert!(!child.is_forked());
    }

    #[test]
    fn test_outstanding_excludes_burned() {
        let mut u = Universe::genesis();
        let holder = Address::from_low_u64(0x1234);
        u.reputation.mint(holder, 100).unwrap();
        u.reputation.transfer(holder, Address::BURN, 30).unwrap();
        assert_eq!(u.rep_burned(), 30);
        assert_eq!(u.rep_outstanding().unwrap(), 70);
    }

    #[test]
    fn test_report_status_mapping() {
        let mut u = Universe::genesis();
        assert_eq!(u.report_status(1), ReportStatus::Unreported);
        u.reports.insert(
            1,
            MarketReport::Tentative {
                reporter: Address::from_low_u64(0x1234),
                outcome: 2,
                bond: 10,
                reported_at: 50,
                bond_returned: false,
            },
        );
        u.reports.insert(2, MarketReport::Inherited(1));
        assert_eq!(u.report_status(1), ReportStatus::Tentative { reported_at: 50 });
        assert_eq!(u.report_status(2), ReportStatus::Resolved);
        assert_eq!(u.report(2).and_then(MarketReport::outcome), Some(1));
    }
}
