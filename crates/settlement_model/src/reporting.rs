//! Market reporting phase machine
//!
//! The phase of a market in a universe is a pure function of its end time,
//! the report record kept by that universe and the current timestamp. Every
//! reporting operation derives the phase once and then asks one of the guard
//! functions below whether the caller may proceed.
//!
//! ```text
//! Trading -> DesignatedReporting -> OpenReporting -> DisputeWindow -> Finalized
//!                     \_______________________________/      \
//!                                                             -> Forked
//! ```

use crate::ModelError;

/// Reporting phase of a market within one universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportingPhase {
    /// Before the market end time
    Trading,
    /// Only the designated reporter may report
    DesignatedReporting,
    /// Anyone may report
    OpenReporting,
    /// Tentative outcome recorded, disputes accepted
    DisputeWindow,
    /// Outcome final in this universe
    Finalized,
    /// Disputed and forked; never finalizes in this universe
    Forked,
}

/// What a universe knows about a market's report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// Nothing reported yet
    Unreported,
    /// Tentative outcome reported at `reported_at`
    Tentative { reported_at: u64 },
    /// Dispute triggered a fork of this universe
    Forked,
    /// Final without a dispute window (fork tag or inherited from parent)
    Resolved,
}

/// Fixed window lengths (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingWindows {
    pub designated_reporting: u64,
    pub dispute: u64,
}

/// Derive the phase of a market
pub fn phase(
    end_time: u64,
    status: ReportStatus,
    now: u64,
    windows: &ReportingWindows,
) -> ReportingPhase {
    match status {
        ReportStatus::Forked => ReportingPhase::Forked,
        ReportStatus::Resolved => ReportingPhase::Finalized,
        ReportStatus::Tentative { reported_at } => {
            if now < reported_at.saturating_add(windows.dispute) {
                ReportingPhase::DisputeWindow
            } else {
                ReportingPhase::Finalized
            }
        }
        ReportStatus::Unreported => {
            if now < end_time {
                ReportingPhase::Trading
            } else if now < end_time.saturating_add(windows.designated_reporting) {
                ReportingPhase::DesignatedReporting
            } else {
                ReportingPhase::OpenReporting
            }
        }
    }
}

/// Dispute deadline for a tentative report
#[inline]
pub fn dispute_deadline(reported_at: u64, windows: &ReportingWindows) -> u64 {
    reported_at.saturating_add(windows.dispute)
}

/// Guard for an initial report
pub fn check_report(phase: ReportingPhase, caller_is_designated: bool) -> Result<(), ModelError> {
    match phase {
        ReportingPhase::Trading => Err(ModelError::MarketNotEnded),
        ReportingPhase::DesignatedReporting if !caller_is_designated => {
            Err(ModelError::NotDesignatedReporter)
        }
        ReportingPhase::DesignatedReporting | ReportingPhase::OpenReporting => Ok(()),
        ReportingPhase::DisputeWindow | ReportingPhase::Finalized | ReportingPhase::Forked => {
            Err(ModelError::AlreadyReported)
        }
    }
}

/// Guard for a dispute against the tentative outcome
pub fn check_dispute(
    phase: ReportingPhase,
    tentative: u8,
    proposed: u8,
    num_slots: u8,
) -> Result<(), ModelError> {
    if phase != ReportingPhase::DisputeWindow || proposed == tentative {
        return Err(ModelError::InvalidDispute);
    }
    check_outcome(proposed, num_slots)
}

/// Guard for operations that need a final outcome
#[inline]
pub fn check_finalized(phase: ReportingPhase) -> Result<(), ModelError> {
    if phase == ReportingPhase::Finalized {
        Ok(())
    } else {
        Err(ModelError::MarketNotFinalized)
    }
}

/// Outcome slot range check (slot 0 is "invalid")
#[inline]
pub fn check_outcome(outcome: u8, num_slots: u8) -> Result<(), ModelError> {
    if outcome < num_slots {
        Ok(())
    } else {
        Err(ModelError::InvalidOutcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    fn windows() -> ReportingWindows {
        ReportingWindows {
            designated_reporting: DAY,
            dispute: DAY,
        }
    }

    #[test]
    fn test_unreported_phases() {
        let w = windows();
        let end = 1_000;
        assert_eq!(phase(end, ReportStatus::Unreported, end - 1, &w), ReportingPhase::Trading);
        assert_eq!(phase(end, ReportStatus::Unreported, end, &w), ReportingPhase::DesignatedReporting);
        assert_eq!(
            phase(end, ReportStatus::Unreported, end + DAY - 1, &w),
            ReportingPhase::DesignatedReporting
        );
        assert_eq!(phase(end, ReportStatus::Unreported, end + DAY, &w), ReportingPhase::OpenReporting);
    }

    #[test]
    fn test_dispute_window_boundary() {
        let w = windows();
        let status = ReportStatus::Tentative { reported_at: 5_000 };
        assert_eq!(phase(0, status, 5_000 + DAY - 1, &w), ReportingPhase::DisputeWindow);
        assert_eq!(phase(0, status, 5_000 + DAY, &w), ReportingPhase::Finalized);
        assert_eq!(dispute_deadline(5_000, &w), 5_000 + DAY);
    }

    #[test]
    fn test_terminal_statuses_ignore_time() {
        let w = windows();
        assert_eq!(phase(u64::MAX, ReportStatus::Forked, 0, &w), ReportingPhase::Forked);
        assert_eq!(phase(u64::MAX, ReportStatus::Resolved, 0, &w), ReportingPhase::Finalized);
    }

    #[test]
    fn test_report_guard() {
        assert_eq!(check_report(ReportingPhase::Trading, true), Err(ModelError::MarketNotEnded));
        assert_eq!(
            check_report(ReportingPhase::DesignatedReporting, false),
            Err(ModelError::NotDesignatedReporter)
        );
        assert!(check_report(ReportingPhase::DesignatedReporting, true).is_ok());
        assert!(check_report(ReportingPhase::OpenReporting, false).is_ok());
        assert_eq!(check_report(ReportingPhase::DisputeWindow, true), Err(ModelError::AlreadyReported));
        assert_eq!(check_report(ReportingPhase::Forked, true), Err(ModelError::AlreadyReported));
    }

    #[test]
    fn test_dispute_guard() {
        assert!(check_dispute(ReportingPhase::DisputeWindow, 1, 2, 3).is_ok());
        assert_eq!(check_dispute(ReportingPhase::DisputeWindow, 1, 1, 3), Err(ModelError::InvalidDispute));
        assert_eq!(check_dispute(ReportingPhase::Finalized, 1, 2, 3), Err(ModelError::InvalidDispute));
        assert_eq!(check_dispute(ReportingPhase::DisputeWindow, 1, 3, 3), Err(ModelError::InvalidOutcome));
    }

    #[test]
    fn test_finalized_guard() {
        assert!(check_finalized(ReportingPhase::Finalized).is_ok());
        for p in [
            ReportingPhase::Trading,
            ReportingPhase::DesignatedReporting,
            ReportingPhase::OpenReporting,
            ReportingPhase::DisputeWindow,
            ReportingPhase::Forked,
        ] {
            assert_eq!(check_finalized(p), Err(ModelError::MarketNotFinalized));
        }
    }
}
