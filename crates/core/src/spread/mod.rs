//! Fire spread between component records
//!
//! This module contains the per-pass spread calculation and its tuning:
//! - Distance falloff and resistance attenuation
//! - Threshold-driven burn stage upgrades
//! - Difficulty scaling
//! - Debug line collection for transfer visualisation

pub mod calculator;
pub mod config;
pub mod debug;
pub mod difficulty;
pub mod falloff;

pub use calculator::{PassSummary, SpreadCalculator, Transfer};
pub use config::{FalloffCurve, ResistanceModel, SpreadConfig};
pub use debug::{DebugLineRecord, DebugRequestCollector};
pub use difficulty::DifficultyMode;
pub use falloff::{apply_resistance, falloff_factor};
