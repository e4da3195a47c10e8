//! Lifecycle of the calculation worker.

use std::fmt;

/// Where the engine is in the prepare/start/fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerPhase {
    /// No worker thread yet
    #[default]
    Idle,
    /// Worker waiting for the next run
    Armed,
    /// A pass is running on the worker
    Computing,
    /// A pass finished and its result has not been fetched
    ResultReady,
    /// Worker joined; terminal
    Stopped,
}

impl WorkerPhase {
    /// Whether a new run may be started from this phase
    pub fn accepts_start(self) -> bool {
        matches!(self, WorkerPhase::Idle | WorkerPhase::Armed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerPhase::Idle => "idle",
            WorkerPhase::Armed => "armed",
            WorkerPhase::Computing => "computing",
            WorkerPhase::ResultReady => "result-ready",
            WorkerPhase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
