//! Exchange error types

use settlement_model::ModelError;
use thiserror::Error;

use crate::types::{MarketId, UniverseId};

/// Broad rejection classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Call made outside its required window
    TimingViolation,
    /// Wrong caller for the operation
    AuthorizationViolation,
    /// Collateral, stake, claim-token or ETH shortfall
    InsufficientBalance,
    /// Market or universe in the wrong state
    InvalidState,
    /// Overflow or division by zero
    Arithmetic,
}

/// Rejection of an exchange operation
///
/// Every rejection leaves the exchange exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("market has not reached its end time")]
    MarketNotEnded,

    #[error("only the designated reporter may report in the designated window")]
    NotDesignatedReporter,

    #[error("market already reported")]
    AlreadyReported,

    #[error("dispute outside the dispute window or for the tentative outcome")]
    InvalidDispute,

    #[error("market not finalized")]
    MarketNotFinalized,

    #[error("outcome slot out of range for the market")]
    InvalidOutcome,

    #[error("market end time {end_time} is not after the current time {now}")]
    InvalidEndTime { end_time: u64, now: u64 },

    #[error("market must have between {min} and {max} outcome slots, got {slots}")]
    InvalidOutcomeCount { slots: usize, min: usize, max: usize },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("insufficient collateral")]
    InsufficientCollateral,

    #[error("insufficient shares")]
    InsufficientShares,

    #[error("insufficient stake")]
    InsufficientStake,

    #[error("insufficient ETH in wallet")]
    InsufficientEth,

    #[error("universe {universe} does not hold enough ETH to pay out")]
    UniverseUnderfunded { universe: UniverseId },

    #[error("caller is not authorized")]
    Unauthorized,

    #[error("unknown universe {0}")]
    UnknownUniverse(UniverseId),

    #[error("unknown market {0}")]
    UnknownMarket(MarketId),

    #[error("market {market} does not exist in universe {universe}")]
    MarketNotInUniverse { universe: UniverseId, market: MarketId },

    #[error("universe {0} has forked")]
    UniverseForked(UniverseId),

    #[error("universe {0} has not forked")]
    UniverseNotForked(UniverseId),

    #[error("REP migration window closed")]
    MigrationWindowClosed,

    #[error("REP migration window still open")]
    MigrationWindowStillOpen,

    #[error("no REP to cash in")]
    NothingToCashIn,

    #[error("auction has not started")]
    AuctionNotStarted,

    #[error("auction expired")]
    AuctionExpired,

    #[error("auction filled")]
    AuctionFilled,

    #[error("auction still running")]
    AuctionStillRunning,

    #[error("clock cannot move backwards from {now} to {requested}")]
    ClockWentBackwards { now: u64, requested: u64 },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,
}

impl ExchangeError {
    pub fn kind(&self) -> ErrorKind {
        use ExchangeError::*;
        match self {
            MarketNotEnded
            | InvalidDispute
            | MigrationWindowClosed
            | MigrationWindowStillOpen
            | AuctionNotStarted
            | AuctionExpired
            | AuctionStillRunning
            | ClockWentBackwards { .. }
            | InvalidEndTime { .. } => ErrorKind::TimingViolation,

            NotDesignatedReporter | Unauthorized => ErrorKind::AuthorizationViolation,

            InsufficientCollateral
            | InsufficientShares
            | InsufficientStake
            | InsufficientEth
            | UniverseUnderfunded { .. }
            | NothingToCashIn => ErrorKind::InsufficientBalance,

            AlreadyReported
            | MarketNotFinalized
            | InvalidOutcome
            | InvalidOutcomeCount { .. }
            | ZeroAmount
            | UnknownUniverse(_)
            | UnknownMarket(_)
            | MarketNotInUniverse { .. }
            | UniverseForked(_)
            | UniverseNotForked(_)
            | AuctionFilled => ErrorKind::InvalidState,

            DivisionByZero | Overflow => ErrorKind::Arithmetic,
        }
    }
}

impl From<ModelError> for ExchangeError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::MarketNotEnded => ExchangeError::MarketNotEnded,
            ModelError::NotDesignatedReporter => ExchangeError::NotDesignatedReporter,
            ModelError::AlreadyReported => ExchangeError::AlreadyReported,
            ModelError::InvalidDispute => ExchangeError::InvalidDispute,
            ModelError::InvalidOutcome => ExchangeError::InvalidOutcome,
            ModelError::MarketNotFinalized => ExchangeError::MarketNotFinalized,
            ModelError::MigrationWindowClosed => ExchangeError::MigrationWindowClosed,
            ModelError::MigrationWindowStillOpen => ExchangeError::MigrationWindowStillOpen,
            ModelError::AuctionNotStarted => ExchangeError::AuctionNotStarted,
            ModelError::AuctionExpired => ExchangeError::AuctionExpired,
            ModelError::AuctionFilled => ExchangeError::AuctionFilled,
            ModelError::DivisionByZero => ExchangeError::DivisionByZero,
            ModelError::Overflow => ExchangeError::Overflow,
        }
    }
}

pub type Result<T> = core::result::Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        assert_eq!(ExchangeError::MarketNotEnded.kind(), ErrorKind::TimingViolation);
        assert_eq!(ExchangeError::NotDesignatedReporter.kind(), ErrorKind::AuthorizationViolation);
        assert_eq!(ExchangeError::InsufficientStake.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(ExchangeError::UniverseNotForked(3).kind(), ErrorKind::InvalidState);
        assert_eq!(ExchangeError::Overflow.kind(), ErrorKind::Arithmetic);
    }

    #[test]
    fn test_model_errors_map_by_name() {
        assert_eq!(ExchangeError::from(ModelError::InvalidDispute), ExchangeError::InvalidDispute);
        assert_eq!(ExchangeError::from(ModelError::AuctionExpired), ExchangeError::AuctionExpired);
        assert_eq!(
            ExchangeError::from(ModelError::MigrationWindowClosed).kind(),
            ErrorKind::TimingViolation
        );
    }
}
