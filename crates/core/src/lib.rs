//! Fire Spread Core Library
//!
//! A multi-threaded fire spread engine for games. Objects that burn send heat
//! to nearby receivers with distance falloff; receivers accumulate it, cool
//! down, and move monotonically from unburnt to burning, destroyed and
//! exploded as their heat crosses configurable thresholds.
//!
//! ## Tick cycle
//!
//! Passes run on a dedicated worker thread while the game tick continues:
//! - Fetch the previous result with [`FireSpreadEngine::get_calculation_result`]
//! - Add, edit and invalidate component data
//! - Prune with [`FireSpreadEngine::prepare_next_calculation_run`]
//! - Kick off the next pass with [`FireSpreadEngine::start_next_calculation_run`]

// Core types and utilities
pub mod core_types;
pub mod error;
pub mod profiler;

// Spread calculation
pub mod spread;

// Background worker and the engine facade
pub mod worker;

// Re-export core types
pub use core_types::{BurnStage, ComponentData, ComponentDataRegistry, Vec3};
pub use core_types::{HandleAllocator, ObjectHandle};
pub use core_types::{LinearScan, SpatialIndex, SpatialLookup};
pub use error::SpreadError;

// Re-export spread types
pub use spread::{DebugLineRecord, DebugRequestCollector, DifficultyMode};
pub use spread::{FalloffCurve, ResistanceModel, SpreadConfig};
pub use spread::{PassSummary, SpreadCalculator};

// Re-export the engine
pub use worker::{FireSpreadEngine, WorkerPhase};
