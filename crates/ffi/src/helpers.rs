use crate::error::{with_last_error_mut, DefaultFireSpreadError, FireSpreadError, FireSpreadErrorCode};
use crate::instance::FireSpreadInstance;
use fire_spread_core::FireSpreadEngine;
use std::ffi::CString;
use std::sync::{Mutex, MutexGuard};

/// Set the thread-local error message and code.
/// Internal helper for FFI functions to record failure details.
/// Accepts any type implementing `FireSpreadError` trait.
pub(crate) fn set_last_error(error: &impl FireSpreadError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
/// More efficient than handling results for immediate errors.
#[inline]
pub(crate) fn track_error(error: &impl FireSpreadError) -> FireSpreadErrorCode {
    set_last_error(error);
    error.code()
}

/// Record the error of a failed result and hand back its code, or pass the value through.
pub(crate) fn track_result<T>(result: Result<T, DefaultFireSpreadError>) -> Result<T, FireSpreadErrorCode> {
    result.map_err(|error| track_error(&error))
}

/// Clear the thread-local error message and code.
/// Internal helper called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = FireSpreadErrorCode::Ok;
    });
}

/// Run `f`, recording its error or clearing the last error on success.
pub(crate) fn handle_ffi_result_error<F>(f: F) -> FireSpreadErrorCode
where
    F: FnOnce() -> Result<(), DefaultFireSpreadError>,
{
    match f() {
        Ok(()) => {
            clear_last_error();
            FireSpreadErrorCode::Ok
        }
        Err(error) => track_error(&error),
    }
}

/// Borrow the instance behind a pointer handed out by `fire_spread_new`.
pub(crate) fn instance_from_ptr<'a>(
    ptr: *const FireSpreadInstance,
) -> Result<&'a FireSpreadInstance, DefaultFireSpreadError> {
    // SAFETY: callers promise `ptr` is null or a live pointer from `fire_spread_new`.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultFireSpreadError::null_pointer("ptr"))
}

/// Lock one of the instance's mutexes, reporting poisoning by name.
pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    name: &str,
) -> Result<MutexGuard<'a, T>, DefaultFireSpreadError> {
    mutex
        .lock()
        .map_err(|_| DefaultFireSpreadError::lock_poisoned(name))
}

/// Run `f` with exclusive access to the engine.
pub(crate) fn with_engine<F, T>(instance: &FireSpreadInstance, f: F) -> Result<T, DefaultFireSpreadError>
where
    F: FnOnce(&mut FireSpreadEngine) -> Result<T, DefaultFireSpreadError>,
{
    let mut engine = lock(&instance.engine, "engine")?;
    f(&mut engine)
}
