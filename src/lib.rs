//! Fork-resolution settlement engine for prediction markets
//!
//! Markets are reported on by REP stakers. An uncontested report finalizes
//! after its dispute window. A contested one forks the universe into one child
//! per outcome, and holders then migrate Cash, claim tokens and REP into the
//! children they believe in. Children left short of ETH re-capitalize through
//! a Dutch auction of fresh REP.
//!
//! The pure decision logic (phases, migration formulas, auction curve) lives
//! in `settlement_model`; this crate owns the state and applies it.

pub mod auction;
pub mod config;
pub mod error;
pub mod exchange;
mod fork;
pub mod ledger;
pub mod market;
mod migration;
mod reporting;
mod trading;
pub mod types;
pub mod universe;

pub use auction::Auction;
pub use config::{GenesisAllocation, ProtocolConfig, E18, MIN_OUTCOME_SLOTS};
pub use error::{ErrorKind, ExchangeError, Result};
pub use exchange::Exchange;
pub use ledger::TokenLedger;
pub use market::{Market, MarketParams, MarketStatus};
pub use settlement_model::{ReportingPhase, PRICE_ONE};
pub use types::*;
pub use universe::{ForkRecord, MarketReport, Universe, UniverseData};
