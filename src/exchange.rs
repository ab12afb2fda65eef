//! The exchange: one owner for every universe, market and wallet
//!
//! All state lives in a single `Exchange` value. Operations take explicit
//! universe and market ids, read the clock once, check every precondition and
//! only then write. A rejected call leaves the exchange untouched.

use std::collections::BTreeMap;

use anyhow::Context;
use log::info;
use settlement_model::{math, ReportingPhase};

use crate::config::{ProtocolConfig, MIN_OUTCOME_SLOTS};
use crate::error::{ExchangeError, Result};
use crate::market::{Market, MarketParams, MarketStatus};
use crate::universe::{MarketReport, Universe, UniverseData};
use crate::types::{Address, MarketId, OutcomeSlot, Timestamp, TokenId, UniverseId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub(crate) config: ProtocolConfig,
    pub(crate) now: Timestamp,
    /// Arena indexed by universe id
    pub(crate) universes: Vec<Universe>,
    /// Indexed by market id - 1
    pub(crate) markets: Vec<Market>,
    /// Native ETH held outside the protocol
    pub(crate) wallets: BTreeMap<Address, u128>,
}

// ============================================================================
// Construction & Clock
// ============================================================================

impl Exchange {
    /// Create the genesis universe and mint the configured REP allocations
    pub fn new(config: ProtocolConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let mut genesis = Universe::genesis();
        for alloc in &config.genesis {
            genesis
                .reputation
                .mint(alloc.holder, alloc.amount)
                .with_context(|| format!("genesis allocation to {}", alloc.holder))?;
        }
        info!(
            "genesis universe created with {} REP across {} holders",
            genesis.reputation.total_supply(),
            config.genesis.len()
        );
        Ok(Self {
            config,
            now: 0,
            universes: vec![genesis],
            markets: Vec::new(),
            wallets: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn set_time(&mut self, now: Timestamp) -> Result<()> {
        if now < self.now {
            return Err(ExchangeError::ClockWentBackwards {
                now: self.now,
                requested: now,
            });
        }
        self.now = now;
        Ok(())
    }

    pub fn advance_time(&mut self, seconds: u64) -> Result<()> {
        let now = self.now.checked_add(seconds).ok_or(ExchangeError::Overflow)?;
        self.set_time(now)
    }

    /// Credit native ETH to an account outside the protocol
    pub fn fund_wallet(&mut self, holder: Address, amount: u128) -> Result<()> {
        Self::check_caller(holder)?;
        let balance = self.credited_wallet(holder, amount)?;
        self.wallets.insert(holder, balance);
        Ok(())
    }

    pub fn wallet_balance(&self, holder: &Address) -> u128 {
        self.wallets.get(holder).copied().unwrap_or(0)
    }
}

// ============================================================================
// Markets
// ============================================================================

impl Exchange {
    pub fn create_market(
        &mut self,
        caller: Address,
        universe: UniverseId,
        params: MarketParams,
    ) -> Result<MarketId> {
        Self::check_caller(caller)?;
        self.live_universe(universe)?;

        let max = self.config.max_outcome_slots;
        let slots = params.num_outcomes.saturating_add(1);
        if !(MIN_OUTCOME_SLOTS..=max).contains(&slots) {
            return Err(ExchangeError::InvalidOutcomeCount {
                slots,
                min: MIN_OUTCOME_SLOTS,
                max,
            });
        }
        if params.end_time <= self.now {
            return Err(ExchangeError::InvalidEndTime {
                end_time: params.end_time,
                now: self.now,
            });
        }
        let designated_reporter = params.designated_reporter.unwrap_or(caller);
        Self::check_caller(designated_reporter)?;

        let id = self.markets.len() as MarketId + 1;
        self.markets.push(Market {
            id,
            origin_universe: universe,
            creator: caller,
            end_time: params.end_time,
            designated_reporter,
            description: params.description,
            num_slots: slots as u8,
        });
        info!(
            "market {} created in universe {} ending at {} with {} slots",
            id, universe, params.end_time, slots
        );
        Ok(id)
    }

    pub fn market(&self, market: MarketId) -> Result<&Market> {
        market
            .checked_sub(1)
            .and_then(|idx| self.markets.get(idx as usize))
            .ok_or(ExchangeError::UnknownMarket(market))
    }

    pub fn market_count(&self) -> usize {
        self.markets.len()
    }

    /// Reporting status of a market as seen from one universe
    pub fn market_status(&self, universe: UniverseId, market: MarketId) -> Result<MarketStatus> {
        let u = self.universe(universe)?;
        let m = self.visible_market(universe, market)?;
        let phase = self.phase_of(u, m);
        let report = u.report(market);
        let tentative_outcome = match (phase, report) {
            (ReportingPhase::DisputeWindow, Some(MarketReport::Tentative { outcome, .. })) => Some(*outcome),
            _ => None,
        };
        let winning_outcome = match phase {
            ReportingPhase::Finalized => report.and_then(MarketReport::outcome),
            _ => None,
        };
        let (reporter, dispute_deadline) = match report {
            Some(MarketReport::Tentative { reporter, reported_at, .. }) => (
                Some(*reporter),
                Some(settlement_model::dispute_deadline(*reported_at, &self.config.windows())),
            ),
            _ => (None, None),
        };
        Ok(MarketStatus {
            phase,
            tentative_outcome,
            winning_outcome,
            reporter,
            dispute_deadline,
        })
    }

    pub fn is_finalized(&self, universe: UniverseId, market: MarketId) -> Result<bool> {
        Ok(self.market_status(universe, market)?.is_finalized())
    }
}

// ============================================================================
// Reads
// ============================================================================

impl Exchange {
    pub fn universe(&self, universe: UniverseId) -> Result<&Universe> {
        self.universes
            .get(universe as usize)
            .ok_or(ExchangeError::UnknownUniverse(universe))
    }

    pub fn universe_count(&self) -> usize {
        self.universes.len()
    }

    pub fn universe_data(&self, universe: UniverseId) -> Result<UniverseData> {
        let u = self.universe(universe)?;
        Ok(UniverseData {
            id: u.id,
            parent: u.parent,
            outcome: u.outcome,
            eth_balance: u.eth_balance,
            eth_deficit: self.eth_deficit(universe)?,
            rep_supply: u.reputation.total_supply(),
            cash_supply: u.cash.total_supply(),
            redemption_price: u.redemption_price,
            forked: u.is_forked(),
            children: u.children.clone(),
        })
    }

    pub fn rep_balance(&self, universe: UniverseId, holder: &Address) -> Result<u128> {
        Ok(self.universe(universe)?.reputation.balance_of(holder))
    }

    pub fn rep_supply(&self, universe: UniverseId) -> Result<u128> {
        Ok(self.universe(universe)?.reputation.total_supply())
    }

    pub fn rep_burned(&self, universe: UniverseId) -> Result<u128> {
        Ok(self.universe(universe)?.rep_burned())
    }

    pub fn cash_balance(&self, universe: UniverseId, holder: &Address) -> Result<u128> {
        Ok(self.universe(universe)?.cash.balance_of(holder))
    }

    /// Balance of every outcome slot, indexed by slot
    pub fn share_balances(&self, universe: UniverseId, market: MarketId, holder: &Address) -> Result<Vec<u128>> {
        let u = self.universe(universe)?;
        let m = self.visible_market(universe, market)?;
        Ok(m.slots().map(|slot| u.share_balance(market, slot, holder)).collect())
    }

    pub fn token_id(&self, universe: UniverseId, market: MarketId, slot: OutcomeSlot) -> Result<TokenId> {
        self.universe(universe)?;
        let m = self.visible_market(universe, market)?;
        settlement_model::check_outcome(slot, m.num_slots)?;
        Ok(TokenId::new(universe, market, slot))
    }

    pub fn eth_balance(&self, universe: UniverseId) -> Result<u128> {
        Ok(self.universe(universe)?.eth_balance)
    }

    /// Cash liabilities not covered by the universe's ETH
    pub fn eth_deficit(&self, universe: UniverseId) -> Result<u128> {
        let u = self.universe(universe)?;
        Ok(self.liabilities(u, u.redemption_price)?.saturating_sub(u.eth_balance))
    }

    /// ETH in wallets plus ETH held by universes
    pub fn total_eth(&self) -> u128 {
        let wallets = self.wallets.values().fold(0u128, |acc, v| acc.saturating_add(*v));
        self.universes
            .iter()
            .fold(wallets, |acc, u| acc.saturating_add(u.eth_balance))
    }
}

// ============================================================================
// Invariants
// ============================================================================

impl Exchange {
    /// Per universe: every ledger sums to its supply, and outstanding REP
    /// (`supply - burned`) equals the REP held outside the burn address
    pub fn check_rep_conservation(&self) -> bool {
        self.universes.iter().all(|u| {
            let held = u
                .reputation
                .holders()
                .filter(|(holder, _)| **holder != Address::BURN)
                .fold(Some(0u128), |acc, (_, v)| acc.and_then(|a| a.checked_add(*v)));
            u.check_ledgers() && held.is_some() && u.rep_outstanding().ok() == held
        })
    }

    /// ETH backing covers Cash liabilities in every universe that is neither
    /// forked nor waiting on its auction
    pub fn check_backing(&self) -> bool {
        self.universes.iter().all(|u| {
            let settled = u.parent.is_none() || u.auction.as_ref().map_or(false, |a| a.settled);
            if u.is_forked() || !settled {
                return true;
            }
            match self.liabilities(u, u.redemption_price) {
                Ok(liabilities) => u.eth_balance >= liabilities,
                Err(_) => false,
            }
        })
    }
}

// ============================================================================
// Internal helpers
// ============================================================================

impl Exchange {
    /// Reserved protocol addresses never act as callers or recipients
    pub(crate) fn check_caller(caller: Address) -> Result<()> {
        if caller.is_reserved() {
            Err(ExchangeError::Unauthorized)
        } else {
            Ok(())
        }
    }

    pub(crate) fn universe_mut(&mut self, universe: UniverseId) -> Result<&mut Universe> {
        self.universes
            .get_mut(universe as usize)
            .ok_or(ExchangeError::UnknownUniverse(universe))
    }

    /// Universe that has not forked
    pub(crate) fn live_universe(&self, universe: UniverseId) -> Result<&Universe> {
        let u = self.universe(universe)?;
        if u.is_forked() {
            return Err(ExchangeError::UniverseForked(universe));
        }
        Ok(u)
    }

    /// Universe that has forked
    pub(crate) fn forked_universe(&self, universe: UniverseId) -> Result<&Universe> {
        let u = self.universe(universe)?;
        if !u.is_forked() {
            return Err(ExchangeError::UniverseNotForked(universe));
        }
        Ok(u)
    }

    /// Child of a forked universe for one outcome slot
    pub(crate) fn child_of(&self, parent: UniverseId, slot: OutcomeSlot) -> Result<UniverseId> {
        self.forked_universe(parent)?
            .children
            .get(slot as usize)
            .copied()
            .ok_or(ExchangeError::InvalidOutcome)
    }

    /// Market visible in `universe`: created there or in one of its ancestors
    pub(crate) fn visible_market(&self, universe: UniverseId, market: MarketId) -> Result<&Market> {
        let m = self.market(market)?;
        let mut cursor = Some(universe);
        while let Some(id) = cursor {
            if id == m.origin_universe {
                return Ok(m);
            }
            cursor = self.universe(id)?.parent;
        }
        Err(ExchangeError::MarketNotInUniverse { universe, market })
    }

    /// A forked universe's clock stops at the fork
    pub(crate) fn clock_of(&self, u: &Universe) -> Timestamp {
        u.fork.map_or(self.now, |f| f.forked_at.min(self.now))
    }

    pub(crate) fn phase_of(&self, u: &Universe, m: &Market) -> ReportingPhase {
        settlement_model::phase(
            m.end_time,
            u.report_status(m.id),
            self.clock_of(u),
            &self.config.windows(),
        )
    }

    /// Winning outcome of a finalized market
    pub(crate) fn winning_outcome(&self, u: &Universe, m: &Market) -> Result<OutcomeSlot> {
        settlement_model::check_finalized(self.phase_of(u, m))?;
        u.report(m.id)
            .and_then(MarketReport::outcome)
            .ok_or(ExchangeError::MarketNotFinalized)
    }

    /// ETH value of the Cash a universe owes at `price`
    ///
    /// Cash still waiting in an unmigrated ancestor counts too, since
    /// migration eventually copies it into this universe in full.
    pub(crate) fn liabilities(&self, u: &Universe, price: u128) -> Result<u128> {
        let mut cash = u.cash.total_supply();
        let mut cursor = u.parent;
        while let Some(id) = cursor {
            let ancestor = self.universe(id)?;
            if !ancestor.cash_migrated {
                cash = math::add(cash, ancestor.cash.total_supply())?;
            }
            cursor = ancestor.parent;
        }
        Ok(math::value_at_price(cash, price)?)
    }

    /// Universes that receive a copy of what migrates out of `universe`
    ///
    /// A child that already migrated the same balances passes its copy on to
    /// its own children.
    pub(crate) fn migration_targets(
        &self,
        universe: UniverseId,
        already_migrated: impl Fn(&Universe) -> bool + Copy,
    ) -> Result<Vec<UniverseId>> {
        let mut targets = Vec::new();
        for &child in &self.universe(universe)?.children {
            let c = self.universe(child)?;
            if c.is_forked() && already_migrated(c) {
                targets.extend(self.migration_targets(child, already_migrated)?);
            } else {
                targets.push(child);
            }
        }
        Ok(targets)
    }

    /// Wallet balance after a credit, without writing it
    pub(crate) fn credited_wallet(&self, holder: Address, amount: u128) -> Result<u128> {
        self.wallet_balance(&holder)
            .checked_add(amount)
            .ok_or(ExchangeError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisAllocation;
    use crate::types::{DAY, GENESIS_UNIVERSE};

    fn alice() -> Address {
        Address::from_low_u64(0xA11CE)
    }

    fn exchange() -> Exchange {
        let config = ProtocolConfig {
            genesis: vec![GenesisAllocation {
                holder: alice(),
                amount: 1_000,
            }],
            ..ProtocolConfig::default()
        };
        Exchange::new(config).unwrap()
    }

    #[test]
    fn test_genesis_allocation() {
        let ex = exchange();
        assert_eq!(ex.universe_count(), 1);
        assert_eq!(ex.rep_balance(GENESIS_UNIVERSE, &alice()).unwrap(), 1_000);
        assert_eq!(ex.rep_supply(GENESIS_UNIVERSE).unwrap(), 1_000);
        assert!(ex.check_rep_conservation());
        assert!(ex.check_backing());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut ex = exchange();
        ex.set_time(100).unwrap();
        ex.advance_time(DAY).unwrap();
        assert_eq!(ex.now(), 100 + DAY);
        assert_eq!(
            ex.set_time(99),
            Err(ExchangeError::ClockWentBackwards {
                now: 100 + DAY,
                requested: 99
            })
        );
        assert_eq!(ex.now(), 100 + DAY);
    }

    #[test]
    fn test_create_market_validation() {
        let mut ex = exchange();
        ex.set_time(1_000).unwrap();

        let err = ex
            .create_market(alice(), GENESIS_UNIVERSE, MarketParams::binary(1_000, "past"))
            .unwrap_err();
        assert_eq!(err, ExchangeError::InvalidEndTime { end_time: 1_000, now: 1_000 });

        let err = ex
            .create_market(alice(), GENESIS_UNIVERSE, MarketParams::binary(2_000, "one").with_outcomes(1))
            .unwrap_err();
        assert_eq!(err, ExchangeError::InvalidOutcomeCount { slots: 2, min: 3, max: 16 });

        let err = ex
            .create_market(Address::BURN, GENESIS_UNIVERSE, MarketParams::binary(2_000, "burn"))
            .unwrap_err();
        assert_eq!(err, ExchangeError::Unauthorized);

        assert_eq!(
            ex.create_market(alice(), 7, MarketParams::binary(2_000, "nowhere")),
            Err(ExchangeError::UnknownUniverse(7))
        );
        assert_eq!(ex.market_count(), 0);

        let id = ex
            .create_market(alice(), GENESIS_UNIVERSE, MarketParams::binary(2_000, "test"))
            .unwrap();
        assert_eq!(id, 1);
        let m = ex.market(id).unwrap();
        assert_eq!(m.designated_reporter, alice());
        assert_eq!(m.num_slots, 3);
        assert_eq!(m.description, "test");
        assert_eq!(ex.market(0), Err(ExchangeError::UnknownMarket(0)));
        assert_eq!(ex.market(2), Err(ExchangeError::UnknownMarket(2)));
    }

    #[test]
    fn test_token_id_checks_slot() {
        let mut ex = exchange();
        let id = ex
            .create_market(alice(), GENESIS_UNIVERSE, MarketParams::binary(10, "t"))
            .unwrap();
        assert_eq!(ex.token_id(GENESIS_UNIVERSE, id, 2).unwrap(), TokenId::new(0, id, 2));
        assert_eq!(ex.token_id(GENESIS_UNIVERSE, id, 3), Err(ExchangeError::InvalidOutcome));
    }

    #[test]
    fn test_fund_wallet_rejects_reserved() {
        let mut ex = exchange();
        ex.fund_wallet(alice(), 5).unwrap();
        ex.fund_wallet(alice(), 7).unwrap();
        assert_eq!(ex.wallet_balance(&alice()), 12);
        assert_eq!(ex.fund_wallet(Address::SHARE_TOKEN, 1), Err(ExchangeError::Unauthorized));
        assert_eq!(ex.total_eth(), 12);
    }
}
