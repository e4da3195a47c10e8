//! Tuning parameters for the spread pass.
//!
//! Threshold defaults are placeholders meant to be tuned per game; only
//! their ordering matters to the engine.

use crate::error::SpreadError;
use serde::{Deserialize, Serialize};

/// Shape of the transfer falloff between hard and soft radius
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FalloffCurve {
    /// Straight line from 1 at the hard radius to 0 at the soft radius
    #[default]
    Linear,
    /// Hermite smoothstep, flat at both ends
    SmoothStep,
}

/// How a receiver's fire resistance attenuates incoming heat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResistanceModel {
    /// `max(raw - resistance * dt, 0)`: small transfers can be fully negated
    #[default]
    Subtractive,
    /// `raw / (1 + resistance)`: always lets some heat through
    Proportional,
}

/// Spread pass configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadConfig {
    /// Global scale on every transfer (difficulty knob)
    pub fire_energy_multiplier: f32,
    pub falloff: FalloffCurve,
    pub resistance: ResistanceModel,
    /// Accumulated energy at which an object starts burning
    pub ignition_threshold: f32,
    /// Accumulated energy at which an object is destroyed
    pub destruction_threshold: f32,
    /// Accumulated energy at which an object explodes; `None` disables explosions
    pub explosion_threshold: Option<f32>,
    /// Global scale on every record's cooling
    pub cooling_multiplier: f32,
    /// Smallest transfer that produces a debug line
    pub debug_min_energy: f32,
    /// Cell size of the default spatial index (meters)
    pub spatial_cell_size: f32,
    /// Waiting longer than this for a result is logged as a slow pass
    pub slow_pass_warning_ms: u64,
}

impl Default for SpreadConfig {
    fn default() -> Self {
        Self {
            fire_energy_multiplier: 1.0,
            falloff: FalloffCurve::Linear,
            resistance: ResistanceModel::Subtractive,
            ignition_threshold: 100.0,
            destruction_threshold: 1000.0,
            explosion_threshold: None,
            cooling_multiplier: 1.0,
            debug_min_energy: 0.0,
            spatial_cell_size: 10.0,
            slow_pass_warning_ms: 50,
        }
    }
}

impl SpreadConfig {
    /// Check every value is usable by the calculator.
    ///
    /// # Errors
    ///
    /// Returns [`SpreadError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SpreadError> {
        non_negative("fire_energy_multiplier", self.fire_energy_multiplier)?;
        non_negative("cooling_multiplier", self.cooling_multiplier)?;
        non_negative("debug_min_energy", self.debug_min_energy)?;
        positive("ignition_threshold", self.ignition_threshold)?;
        positive("destruction_threshold", self.destruction_threshold)?;
        positive("spatial_cell_size", self.spatial_cell_size)?;

        if self.destruction_threshold < self.ignition_threshold {
            return Err(SpreadError::InvalidConfig(format!(
                "destruction_threshold ({}) is below ignition_threshold ({})",
                self.destruction_threshold, self.ignition_threshold
            )));
        }
        if let Some(explosion) = self.explosion_threshold {
            positive("explosion_threshold", explosion)?;
            if explosion < self.destruction_threshold {
                return Err(SpreadError::InvalidConfig(format!(
                    "explosion_threshold ({}) is below destruction_threshold ({})",
                    explosion, self.destruction_threshold
                )));
            }
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), SpreadError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SpreadError::InvalidConfig(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

fn positive(name: &str, value: f32) -> Result<(), SpreadError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SpreadError::InvalidConfig(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}
