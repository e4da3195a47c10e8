//! Error type for the fire spread engine.
//!
//! Stale handles and degenerate geometry are not errors; they are skipped or
//! clamped inside a pass. What remains are misuse of the tick protocol, bad
//! configuration and failure to start the worker thread.

use std::fmt;
use std::io;

/// Errors reported by [`FireSpreadEngine`](crate::FireSpreadEngine) and
/// [`SpreadConfig::validate`](crate::SpreadConfig::validate).
#[derive(Debug)]
pub enum SpreadError {
    /// A run was started while another one is still computing
    RunInFlight,
    /// A run was started before the previous result was fetched
    ResultNotFetched,
    /// The engine has been stopped
    Stopped,
    /// Elapsed time must be finite and non-negative
    InvalidTimeStep(f32),
    /// A configuration value is out of range
    InvalidConfig(String),
    /// The worker thread could not be spawned
    WorkerSpawn(io::Error),
}

impl SpreadError {
    /// Whether the error is a misuse of the prepare/start/fetch protocol
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            SpreadError::RunInFlight | SpreadError::ResultNotFetched | SpreadError::Stopped
        )
    }
}

impl fmt::Display for SpreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadError::RunInFlight => {
                write!(f, "a calculation run is already in flight")
            }
            SpreadError::ResultNotFetched => {
                write!(f, "the previous calculation result has not been fetched")
            }
            SpreadError::Stopped => write!(f, "the calculation worker has been stopped"),
            SpreadError::InvalidTimeStep(seconds) => {
                write!(f, "elapsed time must be finite and non-negative, got {seconds}")
            }
            SpreadError::InvalidConfig(message) => write!(f, "invalid spread config: {message}"),
            SpreadError::WorkerSpawn(err) => {
                write!(f, "failed to spawn calculation worker: {err}")
            }
        }
    }
}

impl std::error::Error for SpreadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SpreadError::WorkerSpawn(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_contract_violations() {
        assert!(SpreadError::RunInFlight.is_contract_violation());
        assert!(SpreadError::ResultNotFetched.is_contract_violation());
        assert!(SpreadError::Stopped.is_contract_violation());
        assert!(!SpreadError::InvalidTimeStep(-1.0).is_contract_violation());
    }

    #[test]
    fn test_display_and_source() {
        let err = SpreadError::InvalidTimeStep(f32::NAN);
        assert_eq!(
            err.to_string(),
            "elapsed time must be finite and non-negative, got NaN"
        );

        let spawn = SpreadError::WorkerSpawn(io::Error::other("no threads"));
        assert!(spawn.source().is_some());
        assert!(spawn.to_string().contains("no threads"));
    }
}
