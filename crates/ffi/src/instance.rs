use fire_spread_core::{
    FalloffCurve, FireSpreadEngine, HandleAllocator, ResistanceModel, SpreadConfig,
};
use std::ptr;
use std::sync::Mutex;

use crate::calculation::{ComponentResult, DebugLine};
use crate::error::{DefaultFireSpreadError, FireSpreadErrorCode};
use crate::helpers::{clear_last_error, track_error, track_result};

/// Falloff curve between hard and soft radius.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSpreadFalloff {
    Linear = 0,
    SmoothStep = 1,
}

/// How a receiver's fire resistance attenuates incoming heat.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSpreadResistance {
    /// `max(raw - resistance * dt, 0)`
    Subtractive = 0,
    /// `raw / (1 + resistance)`
    Proportional = 1,
}

/// C layout of the engine configuration.
///
/// Start from `fire_spread_default_config()` and override fields.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FireSpreadConfig {
    pub fire_energy_multiplier: f32,
    pub falloff: FireSpreadFalloff,
    pub resistance: FireSpreadResistance,
    pub ignition_threshold: f32,
    pub destruction_threshold: f32,
    /// Zero or negative disables explosions.
    pub explosion_threshold: f32,
    pub cooling_multiplier: f32,
    pub debug_min_energy: f32,
    /// Cell size of the spatial index in meters.
    pub spatial_cell_size: f32,
    pub slow_pass_warning_ms: u64,
}

impl From<&SpreadConfig> for FireSpreadConfig {
    fn from(config: &SpreadConfig) -> Self {
        Self {
            fire_energy_multiplier: config.fire_energy_multiplier,
            falloff: match config.falloff {
                FalloffCurve::Linear => FireSpreadFalloff::Linear,
                FalloffCurve::SmoothStep => FireSpreadFalloff::SmoothStep,
            },
            resistance: match config.resistance {
                ResistanceModel::Subtractive => FireSpreadResistance::Subtractive,
                ResistanceModel::Proportional => FireSpreadResistance::Proportional,
            },
            ignition_threshold: config.ignition_threshold,
            destruction_threshold: config.destruction_threshold,
            explosion_threshold: config.explosion_threshold.unwrap_or(0.0),
            cooling_multiplier: config.cooling_multiplier,
            debug_min_energy: config.debug_min_energy,
            spatial_cell_size: config.spatial_cell_size,
            slow_pass_warning_ms: config.slow_pass_warning_ms,
        }
    }
}

impl From<&FireSpreadConfig> for SpreadConfig {
    fn from(config: &FireSpreadConfig) -> Self {
        Self {
            fire_energy_multiplier: config.fire_energy_multiplier,
            falloff: match config.falloff {
                FireSpreadFalloff::Linear => FalloffCurve::Linear,
                FireSpreadFalloff::SmoothStep => FalloffCurve::SmoothStep,
            },
            resistance: match config.resistance {
                FireSpreadResistance::Subtractive => ResistanceModel::Subtractive,
                FireSpreadResistance::Proportional => ResistanceModel::Proportional,
            },
            ignition_threshold: config.ignition_threshold,
            destruction_threshold: config.destruction_threshold,
            explosion_threshold: (config.explosion_threshold > 0.0)
                .then_some(config.explosion_threshold),
            cooling_multiplier: config.cooling_multiplier,
            debug_min_energy: config.debug_min_energy,
            spatial_cell_size: config.spatial_cell_size,
            slow_pass_warning_ms: config.slow_pass_warning_ms,
        }
    }
}

/// The fire spread engine as seen from C.
///
/// # Thread Safety
/// Every entry point locks what it touches, so an instance may be shared
/// between the game thread and other host threads. Calls that fetch the
/// calculation result block while the worker finishes its pass.
///
/// # Usage in Game Engines
///
/// ```cpp
/// FireSpreadInstance* spread = nullptr;
/// FireSpreadConfig config = fire_spread_default_config();
/// if (fire_spread_new(config, &spread) != FireSpreadErrorCode::Ok) {
///     return;
/// }
///
/// void AFireActor::Tick(float DeltaTime) {
///     const ComponentResult* results = nullptr;
///     uintptr_t len = 0;
///     fire_spread_get_result(spread, &results, &len);
///     // ... apply results, add/update/remove components ...
///     fire_spread_prepare_next_run(spread, nullptr);
///     fire_spread_start_next_run(spread, DeltaTime);
/// }
///
/// fire_spread_destroy(spread);
/// ```
pub struct FireSpreadInstance {
    pub(crate) engine: Mutex<FireSpreadEngine>,
    pub(crate) handles: Mutex<HandleAllocator>,
    /// Cached copy of the last result, reused across calls to `fire_spread_get_result`.
    pub(crate) result_snapshot: Mutex<Vec<ComponentResult>>,
    /// Cached copy of the last debug lines, reused across calls to `fire_spread_get_debug_lines`.
    pub(crate) debug_snapshot: Mutex<Vec<DebugLine>>,
}

impl FireSpreadInstance {
    /// Creates a new instance with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `FireSpreadErrorCode::InvalidConfig` if the configuration does not validate.
    pub(crate) fn new(config: &FireSpreadConfig) -> Result<Box<Self>, DefaultFireSpreadError> {
        let engine = FireSpreadEngine::new(SpreadConfig::from(config))?;
        Ok(Box::new(Self {
            engine: Mutex::new(engine),
            handles: Mutex::new(HandleAllocator::new()),
            result_snapshot: Mutex::new(Vec::new()),
            debug_snapshot: Mutex::new(Vec::new()),
        }))
    }
}

/// Default engine configuration.
#[no_mangle]
pub extern "C" fn fire_spread_default_config() -> FireSpreadConfig {
    FireSpreadConfig::from(&SpreadConfig::default())
}

/// Create a new engine instance and return it via out-parameter.
///
/// Returns
/// - `FireSpreadErrorCode::Ok` (0): success, `out_instance` contains valid pointer
/// - `FireSpreadErrorCode::NullPointer`: `out_instance` is null
/// - `FireSpreadErrorCode::InvalidConfig`: a configuration value is out of range
///
/// Call `fire_spread_get_last_error()` for a human-readable description.
///
/// # Safety
///
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller takes ownership of the returned instance and MUST call `fire_spread_destroy`
///   exactly once.
#[no_mangle]
pub unsafe extern "C" fn fire_spread_new(
    config: FireSpreadConfig,
    out_instance: *mut *mut FireSpreadInstance,
) -> FireSpreadErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultFireSpreadError::null_pointer("out_instance"));
    }

    match track_result(FireSpreadInstance::new(&config)) {
        Ok(instance) => {
            clear_last_error();
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            FireSpreadErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                // Set to null on error (per documentation contract)
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroys an instance previously created by `fire_spread_new`.
///
/// Stops and joins the calculation worker. If `ptr` is null this is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `fire_spread_new` and not destroyed already.
/// - After calling this function, the caller must not use the pointer again.
#[no_mangle]
pub unsafe extern "C" fn fire_spread_destroy(ptr: *mut FireSpreadInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: The pointer was created by `Box::into_raw` in `fire_spread_new`
    // and has not been freed. Dropping the box stops the worker.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
