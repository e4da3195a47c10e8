//! Difficulty mode scaling for gameplay balance
//!
//! Scales how aggressively fire spreads and how effective cooling is, to
//! create appropriate challenge levels for players.

use crate::spread::config::SpreadConfig;
use serde::{Deserialize, Serialize};

/// Difficulty mode for gameplay scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DifficultyMode {
    /// Easier conditions for learning
    /// - -25% transferred fire energy
    /// - +25% cooling
    Easy,

    /// Unscaled behaviour
    #[default]
    Normal,

    /// Fires spread hard and are hard to put out
    /// - +50% transferred fire energy
    /// - -15% cooling
    Hard,
}

impl DifficultyMode {
    /// Get fire energy multiplier
    pub fn fire_energy_multiplier(&self) -> f32 {
        match self {
            DifficultyMode::Easy => 0.75,
            DifficultyMode::Normal => 1.00,
            DifficultyMode::Hard => 1.50,
        }
    }

    /// Get cooling multiplier
    pub fn cooling_multiplier(&self) -> f32 {
        match self {
            DifficultyMode::Easy => 1.25,
            DifficultyMode::Normal => 1.00,
            DifficultyMode::Hard => 0.85,
        }
    }

    /// Apply difficulty scaling to a spread config
    pub fn apply_to_config(&self, config: &mut SpreadConfig) {
        config.fire_energy_multiplier = self.fire_energy_multiplier();
        config.cooling_multiplier = self.cooling_multiplier();
    }

    /// Parse a mode name as used on the command line
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "easy" => Some(DifficultyMode::Easy),
            "normal" => Some(DifficultyMode::Normal),
            "hard" => Some(DifficultyMode::Hard),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easy_mode_multipliers() {
        let mode = DifficultyMode::Easy;
        assert_eq!(mode.fire_energy_multiplier(), 0.75);
        assert_eq!(mode.cooling_multiplier(), 1.25);
    }

    #[test]
    fn test_hard_mode_multipliers() {
        let mode = DifficultyMode::Hard;
        assert_eq!(mode.fire_energy_multiplier(), 1.50);
        assert_eq!(mode.cooling_multiplier(), 0.85);
    }

    #[test]
    fn test_apply_to_config() {
        let mut config = SpreadConfig::default();
        DifficultyMode::Hard.apply_to_config(&mut config);
        assert_eq!(config.fire_energy_multiplier, 1.5);
        assert_eq!(config.cooling_multiplier, 0.85);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_name() {
        assert_eq!(DifficultyMode::from_name("HARD"), Some(DifficultyMode::Hard));
        assert_eq!(DifficultyMode::from_name("nightmare"), None);
    }

    #[test]
    fn test_default_is_normal() {
        assert_eq!(DifficultyMode::default(), DifficultyMode::Normal);
    }
}
