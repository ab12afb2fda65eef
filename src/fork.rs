//! Forking engine
//!
//! A valid dispute splits its universe into one child per outcome slot of the
//! disputed market. The parent freezes: its clock stops at the fork and only
//! migration, cash-in and auction operations touch it afterwards.

use log::info;
use settlement_model::{math, ReportingPhase};

use crate::error::{ExchangeError, Result};
use crate::exchange::Exchange;
use crate::types::{Address, MarketId, OutcomeSlot, UniverseId};
use crate::universe::{ForkRecord, MarketReport, Universe};

impl Exchange {
    /// Fork `universe` over `market`
    ///
    /// The disputer's bond is burned in the parent; every other escrowed bond
    /// goes back to its owner there.
    pub(crate) fn fork(
        &mut self,
        universe: UniverseId,
        market: MarketId,
        disputer: Address,
        proposed: OutcomeSlot,
    ) -> Result<Vec<UniverseId>> {
        let now = self.now;
        let parent = self.live_universe(universe)?;
        let num_slots = self.market(market)?.num_slots;
        let tentative = match parent.report(market) {
            Some(MarketReport::Tentative { outcome, .. }) => *outcome,
            _ => return Err(ExchangeError::InvalidDispute),
        };

        // Outcomes already final here stay final in every child
        let mut inherited = Vec::new();
        for (&id, report) in &parent.reports {
            if id == market {
                continue;
            }
            if self.phase_of(parent, self.market(id)?) == ReportingPhase::Finalized {
                if let Some(outcome) = report.outcome() {
                    inherited.push((id, outcome));
                }
            }
        }

        // Every bond still in escrow goes back to its owner
        let refunds: Vec<(Address, u128)> = parent
            .reports
            .values()
            .filter_map(|report| match report {
                MarketReport::Tentative {
                    reporter,
                    bond,
                    bond_returned: false,
                    ..
                } => Some((*reporter, *bond)),
                _ => None,
            })
            .collect();

        let dispute_bond = self.config.dispute_bond;
        parent.reputation.ensure_balance(&disputer, dispute_bond)?;
        let record = ForkRecord {
            market,
            forked_at: now,
            eth_at_fork: parent.eth_balance,
            rep_outstanding_at_fork: math::sub(parent.rep_outstanding()?, dispute_bond)?,
        };
        let price = parent.redemption_price;
        let first_child = self.universes.len() as UniverseId;
        let children: Vec<UniverseId> = (0..num_slots).map(|slot| first_child + slot as UniverseId).collect();

        let parent = self.universe_mut(universe)?;
        parent.reputation.transfer(disputer, Address::BURN, dispute_bond)?;
        for (owner, bond) in &refunds {
            parent.reputation.transfer(Address::BOND_ESCROW, *owner, *bond)?;
        }
        for report in parent.reports.values_mut() {
            if let MarketReport::Tentative { bond_returned, .. } = report {
                *bond_returned = true;
            }
        }
        parent.reports.insert(
            market,
            MarketReport::Forked {
                tentative,
                disputer,
                proposed,
            },
        );
        parent.fork = Some(record);
        parent.children = children.clone();

        for (slot, &id) in children.iter().enumerate() {
            let slot = slot as OutcomeSlot;
            let mut child = Universe::child(id, universe, slot, price);
            for &(inherited_market, outcome) in &inherited {
                child.reports.insert(inherited_market, MarketReport::Inherited(outcome));
            }
            child.reports.insert(market, MarketReport::ResolvedByFork(slot));
            self.universes.push(child);
        }

        info!(
            "universe {} forked over market {} at {}: children {:?}, {} ETH and {} REP outstanding, {} finalized markets carried over",
            universe,
            market,
            now,
            children,
            record.eth_at_fork,
            record.rep_outstanding_at_fork,
            inherited.len()
        );
        Ok(children)
    }
}
