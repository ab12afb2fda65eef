//! Pure settlement model for the fork-resolution protocol
//! No ledger state, no allocation, all functions total
//!
//! Everything in here is a function of its arguments: the reporting phase
//! machine, the proportional migration formulas and the auction curve. The
//! engine crate owns the state and calls into these for every decision.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod math;
pub mod reporting;
pub mod migration;
pub mod auction;

pub use math::{mul_div_ceil, mul_div_floor, PRICE_ONE};
pub use reporting::*;
pub use migration::*;
pub use auction::*;

/// Error types for model operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelError {
    /// Market end time not reached yet
    MarketNotEnded,
    /// Caller is not the designated reporter inside the designated window
    NotDesignatedReporter,
    /// Market already carries a report
    AlreadyReported,
    /// Dispute outside the window or for the tentative outcome
    InvalidDispute,
    /// Outcome slot out of range for the market
    InvalidOutcome,
    /// Market not finalized
    MarketNotFinalized,
    /// Migration window already closed
    MigrationWindowClosed,
    /// Migration window still open
    MigrationWindowStillOpen,
    /// Auction window not open yet
    AuctionNotStarted,
    /// Auction window closed
    AuctionExpired,
    /// Auction already raised its deficit
    AuctionFilled,
    /// Division by zero
    DivisionByZero,
    /// Arithmetic overflow
    Overflow,
}
