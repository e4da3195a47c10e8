use fire_spread_core::{ComponentData, DebugLineRecord, DifficultyMode};
use std::ptr;

use crate::error::{DefaultFireSpreadError, FireSpreadErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, lock, track_error, with_engine};
use crate::instance::FireSpreadInstance;

/// Handle value meaning "no object".
pub const FIRE_SPREAD_NO_HANDLE: u64 = u64::MAX;

/// FFI-friendly outcome of one component's last run.
/// Keep this layout stable for C/C++/C# consumers.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ComponentResult {
    /// Component handle.
    pub handle: u64,
    pub is_burning: bool,
    pub is_destroyed: bool,
    pub is_exploded: bool,
    /// Net heat received during the run.
    pub calculated_spread_energy: f32,
    /// Heat stock after the run.
    pub accumulated_energy: f32,
    /// Object that first delivered heat, or `FIRE_SPREAD_NO_HANDLE`.
    pub source: u64,
}

impl From<&ComponentData> for ComponentResult {
    fn from(record: &ComponentData) -> Self {
        Self {
            handle: record.owner.map_or(FIRE_SPREAD_NO_HANDLE, |h| h.to_bits()),
            is_burning: record.is_burning,
            is_destroyed: record.is_destroyed,
            is_exploded: record.is_exploded,
            calculated_spread_energy: record.calculated_spread_energy,
            accumulated_energy: record.accumulated_energy,
            source: record.source.map_or(FIRE_SPREAD_NO_HANDLE, |h| h.to_bits()),
        }
    }
}

/// One energy transfer for debug drawing.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DebugLine {
    pub start: [f32; 3],
    pub end: [f32; 3],
    /// RGBA
    pub color: [f32; 4],
    pub energy: f32,
    /// Share of the target's net heat, 0 to 1.
    pub fraction: f32,
    pub source: u64,
    pub target: u64,
}

impl From<&DebugLineRecord> for DebugLine {
    fn from(line: &DebugLineRecord) -> Self {
        Self {
            start: [line.start.x, line.start.y, line.start.z],
            end: [line.end.x, line.end.y, line.end.z],
            color: line.color,
            energy: line.energy,
            fraction: line.fraction,
            source: line.source.to_bits(),
            target: line.target.to_bits(),
        }
    }
}

/// Difficulty preset for `fire_spread_set_difficulty`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSpreadDifficulty {
    Easy = 0,
    Normal = 1,
    Hard = 2,
}

/// Drop components removed since the last run.
///
/// Call between `fire_spread_get_result` and `fire_spread_start_next_run`.
/// `out_pruned` is optional and receives how many records were dropped.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `fire_spread_new` or null.
/// - `out_pruned` if non-null, must be a valid pointer to a `usize`.
#[no_mangle]
pub unsafe extern "C" fn fire_spread_prepare_next_run(
    ptr: *const FireSpreadInstance,
    out_pruned: *mut usize,
) -> FireSpreadErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let pruned = with_engine(instance, |engine| Ok(engine.prepare_next_calculation_run()))?;
        if !out_pruned.is_null() {
            unsafe {
                *out_pruned = pruned;
            }
        }
        Ok(())
    })
}

/// Hand the current components to the worker and return immediately.
///
/// Returns
/// - `FireSpreadErrorCode::Ok` (0) on success
/// - `FireSpreadErrorCode::InvalidParameter` if `seconds_passed` is negative or not finite
/// - `FireSpreadErrorCode::ContractViolation` if the previous run is still in flight or
///   its result was not fetched, or the engine was stopped
/// - `FireSpreadErrorCode::WorkerFailure` if the worker thread could not be started
#[no_mangle]
pub extern "C" fn fire_spread_start_next_run(
    ptr: *const FireSpreadInstance,
    seconds_passed: f32,
) -> FireSpreadErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_engine(instance, |engine| {
            engine.start_next_calculation_run(seconds_passed)?;
            Ok(())
        })
    })
}

/// Return a borrowed pointer to the result of the last completed run.
///
/// Blocks while a run is still computing. The returned array is valid until the
/// next call to this function on the same instance. **DO NOT FREE THIS POINTER**.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `fire_spread_new` or null.
/// - `out_array` and `out_len` must be valid, non-null pointers to writable memory.
#[no_mangle]
pub unsafe extern "C" fn fire_spread_get_result(
    ptr: *const FireSpreadInstance,
    out_array: *mut *const ComponentResult,
    out_len: *mut usize,
) -> FireSpreadErrorCode {
    if out_len.is_null() {
        return track_error(&DefaultFireSpreadError::null_pointer("out_len"));
    }
    if out_array.is_null() {
        unsafe {
            *out_len = 0;
        }
        return track_error(&DefaultFireSpreadError::null_pointer("out_array"));
    }

    let result = handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let mut snapshot = lock(&instance.result_snapshot, "result_snapshot")?;
        with_engine(instance, |engine| {
            snapshot.clear();
            snapshot.extend(engine.get_calculation_result().iter().map(ComponentResult::from));
            Ok(())
        })?;

        unsafe {
            *out_len = snapshot.len();
            *out_array = snapshot.as_ptr();
        }
        Ok(())
    });

    if result != FireSpreadErrorCode::Ok {
        unsafe {
            *out_array = ptr::null();
            *out_len = 0;
        }
    }
    result
}

/// Stop and join the calculation worker. Idempotent.
///
/// Any run started after this call fails with `ContractViolation`.
#[no_mangle]
pub extern "C" fn fire_spread_stop(ptr: *const FireSpreadInstance) -> FireSpreadErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_engine(instance, |engine| {
            engine.stop_calculation();
            Ok(())
        })
    })
}

/// Turn debug line collection on or off for subsequent runs.
#[no_mangle]
pub extern "C" fn fire_spread_set_debug_active(
    ptr: *const FireSpreadInstance,
    active: bool,
) -> FireSpreadErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_engine(instance, |engine| {
            engine.set_debug_active(active);
            Ok(())
        })
    })
}

/// Return a borrowed pointer to the debug lines of the last fetched run.
///
/// The array is valid until the next call to this function on the same instance.
/// **DO NOT FREE THIS POINTER**.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `fire_spread_new` or null.
/// - `out_array` and `out_len` must be valid, non-null pointers to writable memory.
#[no_mangle]
pub unsafe extern "C" fn fire_spread_get_debug_lines(
    ptr: *const FireSpreadInstance,
    out_array: *mut *const DebugLine,
    out_len: *mut usize,
) -> FireSpreadErrorCode {
    if out_len.is_null() {
        return track_error(&DefaultFireSpreadError::null_pointer("out_len"));
    }
    if out_array.is_null() {
        unsafe {
            *out_len = 0;
        }
        return track_error(&DefaultFireSpreadError::null_pointer("out_array"));
    }

    let result = handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let mut snapshot = lock(&instance.debug_snapshot, "debug_snapshot")?;
        with_engine(instance, |engine| {
            snapshot.clear();
            snapshot.extend(engine.get_debug_draw_requests().iter().map(DebugLine::from));
            Ok(())
        })?;

        unsafe {
            *out_len = snapshot.len();
            *out_array = snapshot.as_ptr();
        }
        Ok(())
    });

    if result != FireSpreadErrorCode::Ok {
        unsafe {
            *out_array = ptr::null();
            *out_len = 0;
        }
    }
    result
}

/// Wall-clock duration of the last completed pass in microseconds.
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `fire_spread_new` or null.
/// - `out_us` must be a valid, non-null pointer to a `u64`.
#[no_mangle]
pub unsafe extern "C" fn fire_spread_get_calculation_time_us(
    ptr: *const FireSpreadInstance,
    out_us: *mut u64,
) -> FireSpreadErrorCode {
    if out_us.is_null() {
        return track_error(&DefaultFireSpreadError::null_pointer("out_us"));
    }

    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let elapsed = with_engine(instance, |engine| Ok(engine.get_calculation_time()))?;
        unsafe {
            *out_us = elapsed;
        }
        Ok(())
    })
}

/// Scale every transfer from the next run on.
///
/// Returns `FireSpreadErrorCode::InvalidConfig` for a negative or non-finite multiplier.
#[no_mangle]
pub extern "C" fn fire_spread_set_fire_energy_multiplier(
    ptr: *const FireSpreadInstance,
    multiplier: f32,
) -> FireSpreadErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_engine(instance, |engine| {
            engine.set_fire_energy_multiplier(multiplier)?;
            Ok(())
        })
    })
}

/// Apply a difficulty preset to the transfer and cooling multipliers.
#[no_mangle]
pub extern "C" fn fire_spread_set_difficulty(
    ptr: *const FireSpreadInstance,
    difficulty: FireSpreadDifficulty,
) -> FireSpreadErrorCode {
    let mode = match difficulty {
        FireSpreadDifficulty::Easy => DifficultyMode::Easy,
        FireSpreadDifficulty::Normal => DifficultyMode::Normal,
        FireSpreadDifficulty::Hard => DifficultyMode::Hard,
    };

    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_engine(instance, |engine| {
            engine.set_difficulty(mode);
            Ok(())
        })
    })
}
