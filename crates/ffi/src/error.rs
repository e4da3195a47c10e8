use fire_spread_core::SpreadError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for FFI error types.
///
/// This trait provides a unified way to handle errors across the FFI boundary,
/// allowing both simple error codes and custom error messages.
///
/// # Design
/// - `code()` - Returns the error code to be passed across FFI boundary
/// - `msg()` - Returns the error message for diagnostic purposes
pub(crate) trait FireSpreadError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> FireSpreadErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Default implementation of `FireSpreadError` for common FFI error scenarios.
///
/// This struct wraps a `FireSpreadErrorCode` and provides convenient constructors
/// for each error type (except Ok, which represents success).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultFireSpreadError {
    code: FireSpreadErrorCode,
    msg: String,
}

impl DefaultFireSpreadError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: FireSpreadErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    ///
    /// # Arguments
    /// * `lock_name` - The name of the lock that was poisoned (e.g., `"engine"`, `"handles"`)
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: FireSpreadErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for a handle that does not name a live component.
    pub fn unknown_handle(handle: u64) -> Self {
        Self {
            code: FireSpreadErrorCode::UnknownHandle,
            msg: format!("Handle {handle:#x} does not name a live component"),
        }
    }
}

impl FireSpreadError for DefaultFireSpreadError {
    fn code(&self) -> FireSpreadErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

impl From<SpreadError> for DefaultFireSpreadError {
    fn from(error: SpreadError) -> Self {
        let code = match &error {
            SpreadError::RunInFlight | SpreadError::ResultNotFetched | SpreadError::Stopped => {
                FireSpreadErrorCode::ContractViolation
            }
            SpreadError::InvalidTimeStep(_) => FireSpreadErrorCode::InvalidParameter,
            SpreadError::InvalidConfig(_) => FireSpreadErrorCode::InvalidConfig,
            SpreadError::WorkerSpawn(_) => FireSpreadErrorCode::WorkerFailure,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

/// FFI error codes returned by fire spread functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireSpreadErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter passed to function.
    InvalidParameter = 3,

    /// Configuration values are out of range or out of order.
    InvalidConfig = 4,

    /// Calls made out of order: starting a run while one is in flight or
    /// unfetched, or using an engine after `fire_spread_stop`.
    ContractViolation = 5,

    /// The component handle is stale or was never issued.
    UnknownHandle = 6,

    /// The calculation worker thread could not be started.
    WorkerFailure = 7,
}

impl From<DefaultFireSpreadError> for FireSpreadErrorCode {
    fn from(error: DefaultFireSpreadError) -> Self {
        error.code
    }
}

thread_local! {
    /// Thread-local storage for the most recent FFI error (C string, error code).
    /// The CString is stored to keep the pointer returned by
    /// `fire_spread_get_last_error` valid.
    static LAST_ERROR: RefCell<(Option<CString>, FireSpreadErrorCode)> = const { RefCell::new((None, FireSpreadErrorCode::Ok)) };
}

/// Internal helper to read `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, FireSpreadErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

/// Internal helper to mutate `LAST_ERROR` thread-local storage (cstring, code).
pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, FireSpreadErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if the last call on this thread succeeded.
///
/// # Thread Safety
/// Error messages are stored per-thread (thread-local storage), so this is thread-safe.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread.
///
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```cpp
/// FireSpreadErrorCode err = fire_spread_start_next_run(engine, dt);
/// if (err != FireSpreadErrorCode::Ok) {
///     const char* error = fire_spread_get_last_error();
///     if (error) {
///         printf("Could not start spread run: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn fire_spread_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns:
/// - `FireSpreadErrorCode::Ok` (0) if the last call on this thread succeeded
/// - The specific error code from the last failed operation
#[no_mangle]
pub extern "C" fn fire_spread_get_last_error_code() -> FireSpreadErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
