//! Reporting operations
//!
//! Thin wrappers around the pure phase machine: each one derives the market's
//! phase in the target universe, runs the matching guard, and then moves the
//! REP bond in or out of escrow.

use log::debug;
use settlement_model::ReportingPhase;

use crate::error::{ExchangeError, Result};
use crate::exchange::Exchange;
use crate::types::{Address, MarketId, OutcomeSlot, UniverseId};
use crate::universe::MarketReport;

impl Exchange {
    /// Record the tentative outcome and escrow the reporter's REP bond
    pub fn report_outcome(
        &mut self,
        caller: Address,
        universe: UniverseId,
        market: MarketId,
        outcome: OutcomeSlot,
    ) -> Result<()> {
        Self::check_caller(caller)?;
        let u = self.live_universe(universe)?;
        let m = self.visible_market(universe, market)?;
        let phase = self.phase_of(u, m);
        settlement_model::check_report(phase, caller == m.designated_reporter)?;
        settlement_model::check_outcome(outcome, m.num_slots)?;
        let bond = self.config.rep_bond;
        u.reputation.ensure_balance(&caller, bond)?;

        let now = self.now;
        let u = self.universe_mut(universe)?;
        u.reputation.transfer(caller, Address::BOND_ESCROW, bond)?;
        u.reports.insert(
            market,
            MarketReport::Tentative {
                reporter: caller,
                outcome,
                bond,
                reported_at: now,
                bond_returned: false,
            },
        );
        debug!(
            "{} reported outcome {} for market {} in universe {} ({:?})",
            caller, outcome, market, universe, phase
        );
        Ok(())
    }

    /// Challenge the tentative outcome, forking the universe
    ///
    /// Costs the disputer `dispute_bond` REP, burned in the parent. Returns the
    /// ids of the new child universes, indexed by outcome slot.
    pub fn dispute(
        &mut self,
        caller: Address,
        universe: UniverseId,
        market: MarketId,
        proposed: OutcomeSlot,
    ) -> Result<Vec<UniverseId>> {
        Self::check_caller(caller)?;
        let u = self.live_universe(universe)?;
        let m = self.visible_market(universe, market)?;
        let phase = self.phase_of(u, m);
        let tentative = match u.report(market) {
            Some(MarketReport::Tentative { outcome, .. }) => *outcome,
            _ => return Err(ExchangeError::InvalidDispute),
        };
        settlement_model::check_dispute(phase, tentative, proposed, m.num_slots)?;

        debug!(
            "{} disputed market {} in universe {}: {} -> {}",
            caller, market, universe, tentative, proposed
        );
        self.fork(universe, market, caller, proposed)
    }

    /// Refund the reporter's bond once the market is final
    ///
    /// Anyone may trigger the refund; it always goes to the reporter. Returns
    /// the REP refunded, 0 if there is nothing left to refund.
    pub fn return_rep_bond(&mut self, caller: Address, universe: UniverseId, market: MarketId) -> Result<u128> {
        Self::check_caller(caller)?;
        let u = self.universe(universe)?;
        let m = self.visible_market(universe, market)?;
        let phase = self.phase_of(u, m);
        if phase != ReportingPhase::Finalized {
            return Err(ExchangeError::MarketNotFinalized);
        }
        let (reporter, bond) = match u.report(market) {
            Some(MarketReport::Tentative {
                reporter,
                bond,
                bond_returned: false,
                ..
            }) => (*reporter, *bond),
            _ => return Ok(0),
        };
        u.reputation.ensure_balance(&Address::BOND_ESCROW, bond)?;

        let u = self.universe_mut(universe)?;
        u.reputation.transfer(Address::BOND_ESCROW, reporter, bond)?;
        if let Some(MarketReport::Tentative { bond_returned, .. }) = u.reports.get_mut(&market) {
            *bond_returned = true;
        }
        debug!(
            "returned {} REP bond to {} for market {} in universe {}",
            bond, reporter, market, universe
        );
        Ok(bond)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{GenesisAllocation, ProtocolConfig, E18};
    use crate::error::ExchangeError;
    use crate::exchange::Exchange;
    use crate::market::MarketParams;
    use crate::types::{Address, DAY, GENESIS_UNIVERSE};
    use settlement_model::ReportingPhase;

    fn reporter() -> Address {
        Address::from_low_u64(0x5EED)
    }

    fn stranger() -> Address {
        Address::from_low_u64(0xF00D)
    }

    fn setup() -> (Exchange, u64) {
        let config = ProtocolConfig {
            genesis: vec![
                GenesisAllocation { holder: reporter(), amount: 10 * E18 },
                GenesisAllocation { holder: stranger(), amount: 10 * E18 },
            ],
            ..ProtocolConfig::default()
        };
        let mut ex = Exchange::new(config).unwrap();
        let market = ex
            .create_market(reporter(), GENESIS_UNIVERSE, MarketParams::binary(DAY, "test"))
            .unwrap();
        (ex, market)
    }

    #[test]
    fn test_report_escrows_bond() {
        let (mut ex, market) = setup();
        ex.set_time(DAY).unwrap();
        ex.report_outcome(reporter(), GENESIS_UNIVERSE, market, 1).unwrap();
        assert_eq!(ex.rep_balance(GENESIS_UNIVERSE, &reporter()).unwrap(), 9 * E18);
        assert_eq!(ex.rep_balance(GENESIS_UNIVERSE, &Address::BOND_ESCROW).unwrap(), E18);

        let status = ex.market_status(GENESIS_UNIVERSE, market).unwrap();
        assert_eq!(status.phase, ReportingPhase::DisputeWindow);
        assert_eq!(status.tentative_outcome, Some(1));
        assert_eq!(status.winning_outcome, None);
        assert_eq!(status.dispute_deadline, Some(2 * DAY));

        assert_eq!(
            ex.report_outcome(reporter(), GENESIS_UNIVERSE, market, 2),
            Err(ExchangeError::AlreadyReported)
        );
    }

    #[test]
    fn test_open_reporting_after_designated_window() {
        let (mut ex, market) = setup();
        ex.set_time(DAY + 10).unwrap();
        assert_eq!(
            ex.report_outcome(stranger(), GENESIS_UNIVERSE, market, 1),
            Err(ExchangeError::NotDesignatedReporter)
        );
        ex.set_time(2 * DAY).unwrap();
        ex.report_outcome(stranger(), GENESIS_UNIVERSE, market, 1).unwrap();
        assert_eq!(ex.market_status(GENESIS_UNIVERSE, market).unwrap().reporter, Some(stranger()));
    }

    #[test]
    fn test_invalid_outcome_rejected() {
        let (mut ex, market) = setup();
        ex.set_time(DAY).unwrap();
        assert_eq!(
            ex.report_outcome(reporter(), GENESIS_UNIVERSE, market, 3),
            Err(ExchangeError::InvalidOutcome)
        );
    }

    #[test]
    fn test_dispute_with_same_outcome_rejected() {
        let (mut ex, market) = setup();
        ex.set_time(DAY).unwrap();
        assert_eq!(
            ex.dispute(stranger(), GENESIS_UNIVERSE, market, 1),
            Err(ExchangeError::InvalidDispute)
        );
        ex.report_outcome(reporter(), GENESIS_UNIVERSE, market, 1).unwrap();
        assert_eq!(
            ex.dispute(stranger(), GENESIS_UNIVERSE, market, 1),
            Err(ExchangeError::InvalidDispute)
        );
        let broke = Address::from_low_u64(0xB40C);
        assert_eq!(
            ex.dispute(broke, GENESIS_UNIVERSE, market, 2),
            Err(ExchangeError::InsufficientStake)
        );
        assert!(!ex.universe_data(GENESIS_UNIVERSE).unwrap().forked);
        assert_eq!(ex.universe_count(), 1);
        ex.set_time(2 * DAY).unwrap();
        assert_eq!(
            ex.dispute(stranger(), GENESIS_UNIVERSE, market, 2),
            Err(ExchangeError::InvalidDispute)
        );
    }

    #[test]
    fn test_dispute_burns_bond() {
        let (mut ex, market) = setup();
        ex.set_time(DAY).unwrap();
        ex.report_outcome(reporter(), GENESIS_UNIVERSE, market, 1).unwrap();
        let bond = ex.config().dispute_bond;
        ex.dispute(stranger(), GENESIS_UNIVERSE, market, 2).unwrap();
        assert_eq!(ex.rep_balance(GENESIS_UNIVERSE, &stranger()).unwrap(), 10 * E18 - bond);
        assert_eq!(ex.rep_balance(GENESIS_UNIVERSE, &reporter()).unwrap(), 10 * E18);
        assert_eq!(ex.rep_burned(GENESIS_UNIVERSE).unwrap(), bond);
        assert!(ex.check_rep_conservation());
    }

    #[test]
    fn test_bond_returned_once_to_reporter() {
        let (mut ex, market) = setup();
        ex.set_time(DAY).unwrap();
        ex.report_outcome(reporter(), GENESIS_UNIVERSE, market, 2).unwrap();
        assert_eq!(
            ex.return_rep_bond(stranger(), GENESIS_UNIVERSE, market),
            Err(ExchangeError::MarketNotFinalized)
        );
        ex.set_time(2 * DAY).unwrap();
        assert_eq!(ex.return_rep_bond(stranger(), GENESIS_UNIVERSE, market).unwrap(), E18);
        assert_eq!(ex.rep_balance(GENESIS_UNIVERSE, &reporter()).unwrap(), 10 * E18);
        assert_eq!(ex.rep_balance(GENESIS_UNIVERSE, &stranger()).unwrap(), 10 * E18);
        assert_eq!(ex.return_rep_bond(reporter(), GENESIS_UNIVERSE, market).unwrap(), 0);
    }
}
