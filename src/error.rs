use thiserror::Error;

/// Rejected input at the engine boundary.
///
/// "Nothing found" is never an error: an empty combination list or an empty
/// ledger comes back as `Ok`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("prediction {id} has invalid odds {odds} (must be finite and > 0)")]
    InvalidOdds { id: String, odds: f64 },

    #[error("invalid target multiplier {0} (must be finite and > 1)")]
    InvalidTarget(f64),

    #[error("invalid tolerance {0} (must be finite and >= 0)")]
    InvalidTolerance(f64),

    #[error("invalid stake {0} (must be finite and > 0)")]
    InvalidStake(f64),

    #[error("challenge length must be at least one day")]
    InvalidChallengeLength,

    #[error("combination search task aborted: {0}")]
    SearchAborted(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

pub(crate) fn check_target(target: f64) -> EngineResult<()> {
    if target.is_finite() && target > 1.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidTarget(target))
    }
}

pub(crate) fn check_tolerance(tolerance: f64) -> EngineResult<()> {
    if tolerance.is_finite() && tolerance >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidTolerance(tolerance))
    }
}

pub(crate) fn check_stake(stake: f64) -> EngineResult<()> {
    if stake.is_finite() && stake > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidStake(stake))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_must_exceed_one() {
        assert!(check_target(2.0).is_ok());
        assert_eq!(check_target(1.0), Err(EngineError::InvalidTarget(1.0)));
        assert!(check_target(-3.0).is_err());
        assert!(check_target(f64::NAN).is_err());
        assert!(check_target(f64::INFINITY).is_err());
    }

    #[test]
    fn test_tolerance_allows_zero() {
        assert!(check_tolerance(0.0).is_ok());
        assert!(check_tolerance(-0.1).is_err());
    }

    #[test]
    fn test_stake_must_be_positive() {
        assert!(check_stake(100.0).is_ok());
        assert!(check_stake(0.0).is_err());
    }
}
