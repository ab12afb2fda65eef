//! Market metadata and status view

use settlement_model::ReportingPhase;

use crate::types::{Address, MarketId, OutcomeSlot, Timestamp, UniverseId};

/// A market, visible in its origin universe and every descendant of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub id: MarketId,
    pub origin_universe: UniverseId,
    pub creator: Address,
    /// Trading cutoff
    pub end_time: Timestamp,
    pub designated_reporter: Address,
    pub description: String,
    /// Valid outcomes plus the invalid slot 0
    pub num_slots: u8,
}

impl Market {
    pub fn slots(&self) -> impl Iterator<Item = OutcomeSlot> {
        0..self.num_slots
    }
}

/// Market creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketParams {
    pub end_time: Timestamp,
    /// Real outcomes, not counting the invalid slot
    pub num_outcomes: usize,
    /// Defaults to the creator
    pub designated_reporter: Option<Address>,
    pub description: String,
}

impl MarketParams {
    /// Yes/no market
    pub fn binary(end_time: Timestamp, description: impl Into<String>) -> Self {
        Self {
            end_time,
            num_outcomes: 2,
            designated_reporter: None,
            description: description.into(),
        }
    }

    pub fn with_outcomes(mut self, num_outcomes: usize) -> Self {
        self.num_outcomes = num_outcomes;
        self
    }

    pub fn with_reporter(mut self, reporter: Address) -> Self {
        self.designated_reporter = Some(reporter);
        self
    }
}

/// Reporting status of a market within one universe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketStatus {
    pub phase: ReportingPhase,
    /// Reported outcome while disputable
    pub tentative_outcome: Option<OutcomeSlot>,
    /// Set iff the phase is `Finalized`
    pub winning_outcome: Option<OutcomeSlot>,
    pub reporter: Option<Address>,
    pub dispute_deadline: Option<Timestamp>,
}

impl MarketStatus {
    pub fn is_finalized(&self) -> bool {
        self.phase == ReportingPhase::Finalized
    }

    pub fn is_forked(&self) -> bool {
        self.phase == ReportingPhase::Forked
    }
}
