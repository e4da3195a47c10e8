//! Background calculation worker
//!
//! One dedicated thread runs spread passes over a snapshot of the registry
//! while the caller's tick keeps going. Work and results change hands under a
//! single mutex, with a condition variable for the wake-ups in both
//! directions.

pub mod coordinator;
pub mod state;

pub use coordinator::{FireSpreadEngine, WORKER_THREAD_NAME};
pub use state::WorkerPhase;
