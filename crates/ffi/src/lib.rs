//! C ABI for the fire spread engine.
//!
//! A host game engine owns one `FireSpreadInstance` per world and drives the
//! tick cycle through these functions. Every fallible call returns a
//! `FireSpreadErrorCode` and leaves a description behind for
//! `fire_spread_get_last_error`.

mod calculation;
mod components;
mod error;
mod helpers;
mod instance;

pub use calculation::{
    fire_spread_get_calculation_time_us, fire_spread_get_debug_lines, fire_spread_get_result,
    fire_spread_prepare_next_run, fire_spread_set_debug_active, fire_spread_set_difficulty,
    fire_spread_set_fire_energy_multiplier, fire_spread_start_next_run, fire_spread_stop,
    ComponentResult, DebugLine, FireSpreadDifficulty, FIRE_SPREAD_NO_HANDLE,
};
pub use components::{
    fire_spread_add_component, fire_spread_remove_component, fire_spread_update_component,
    ComponentDesc,
};
pub use error::{fire_spread_get_last_error, fire_spread_get_last_error_code, FireSpreadErrorCode};
pub use instance::{
    fire_spread_default_config, fire_spread_destroy, fire_spread_new, FireSpreadConfig,
    FireSpreadFalloff, FireSpreadInstance, FireSpreadResistance,
};
