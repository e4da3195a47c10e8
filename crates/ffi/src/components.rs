use fire_spread_core::{ComponentData, ObjectHandle, Vec3};

use crate::error::{DefaultFireSpreadError, FireSpreadErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, lock, track_error, with_engine};
use crate::instance::FireSpreadInstance;

/// Host-side description of a fire-capable object.
///
/// Burn progress (`is_destroyed`, `is_exploded`, accumulated heat) is owned
/// by the engine and cannot be set from here. `is_burning` can only ignite.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ComponentDesc {
    pub is_fire_sender: bool,
    pub is_fire_receiver: bool,
    pub is_burning: bool,
    /// When false the position fields are ignored and the object only takes `direct_energy`.
    pub has_position: bool,
    pub position_x: f32,
    pub position_y: f32,
    pub position_z: f32,
    pub hard_radius: f32,
    pub soft_radius: f32,
    /// Heat output per second while burning.
    pub fire_energy: f32,
    /// Heat removed per second.
    pub cooling_energy: f32,
    /// Heat absorbed per second before any of it counts.
    pub fire_resistance: f32,
    /// Heat injected for the next run only.
    pub direct_energy: f32,
}

impl ComponentDesc {
    fn apply_to(&self, record: &mut ComponentData) {
        record.is_fire_sender = self.is_fire_sender;
        record.is_fire_receiver = self.is_fire_receiver;
        record.is_burning |= self.is_burning;
        record.position = self
            .has_position
            .then(|| Vec3::new(self.position_x, self.position_y, self.position_z));
        record.hard_radius = self.hard_radius;
        record.soft_radius = self.soft_radius;
        record.fire_energy = self.fire_energy;
        record.cooling_energy = self.cooling_energy;
        record.fire_resistance = self.fire_resistance;
        record.direct_energy += self.direct_energy;
    }
}

fn desc_from_ptr<'a>(desc: *const ComponentDesc) -> Result<&'a ComponentDesc, DefaultFireSpreadError> {
    // SAFETY: callers promise `desc` is null or points to a valid `ComponentDesc`.
    unsafe { desc.as_ref() }.ok_or_else(|| DefaultFireSpreadError::null_pointer("desc"))
}

/// Register a new fire-capable object and return its handle.
///
/// The component joins the next run started after this call.
///
/// Returns
/// - `FireSpreadErrorCode::Ok` (0) on success with the handle in `out_handle`
/// - `FireSpreadErrorCode::NullPointer` if `ptr`, `desc` or `out_handle` is null
/// - `FireSpreadErrorCode::LockPoisoned` if an internal lock is poisoned
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `fire_spread_new` or null.
/// - `desc` must point to a valid `ComponentDesc` or be null.
/// - `out_handle` must be a valid pointer to writable memory or null.
#[no_mangle]
pub unsafe extern "C" fn fire_spread_add_component(
    ptr: *const FireSpreadInstance,
    desc: *const ComponentDesc,
    out_handle: *mut u64,
) -> FireSpreadErrorCode {
    if out_handle.is_null() {
        return track_error(&DefaultFireSpreadError::null_pointer("out_handle"));
    }

    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let desc = desc_from_ptr(desc)?;
        let owner = lock(&instance.handles, "handles")?.allocate();

        with_engine(instance, |engine| {
            desc.apply_to(engine.add_new_component_data(owner));
            Ok(())
        })?;

        unsafe {
            *out_handle = owner.to_bits();
        }
        Ok(())
    })
}

/// Overwrite the host-controlled fields of a registered component.
///
/// Returns
/// - `FireSpreadErrorCode::Ok` (0) on success
/// - `FireSpreadErrorCode::NullPointer` if `ptr` or `desc` is null
/// - `FireSpreadErrorCode::UnknownHandle` if `handle` is stale
///
/// # Safety
///
/// - `ptr` must be a valid pointer returned by `fire_spread_new` or null.
/// - `desc` must point to a valid `ComponentDesc` or be null.
#[no_mangle]
pub unsafe extern "C" fn fire_spread_update_component(
    ptr: *const FireSpreadInstance,
    handle: u64,
    desc: *const ComponentDesc,
) -> FireSpreadErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let desc = desc_from_ptr(desc)?;

        with_engine(instance, |engine| {
            let record = engine
                .component_data_mut(ObjectHandle::from_bits(handle))
                .ok_or_else(|| DefaultFireSpreadError::unknown_handle(handle))?;
            desc.apply_to(record);
            Ok(())
        })
    })
}

/// Unregister a component. Its handle goes stale immediately and the
/// component takes no part in any run started afterwards.
///
/// Returns
/// - `FireSpreadErrorCode::Ok` (0) on success
/// - `FireSpreadErrorCode::NullPointer` if `ptr` is null
/// - `FireSpreadErrorCode::UnknownHandle` if `handle` was already removed
#[no_mangle]
pub extern "C" fn fire_spread_remove_component(
    ptr: *const FireSpreadInstance,
    handle: u64,
) -> FireSpreadErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let owner = ObjectHandle::from_bits(handle);
        if !lock(&instance.handles, "handles")?.release(owner) {
            return Err(DefaultFireSpreadError::unknown_handle(handle));
        }

        with_engine(instance, |engine| {
            engine.invalidate_component(owner);
            Ok(())
        })
    })
}
