//! C FFI bindings for native callers.
//!
//! Exposes a step-counting session behind an opaque handle so firmware or
//! mobile bridges can drive the engine through a C ABI.
//!
//! Memory Safety:
//! - The engine instance must be freed with `pedometer_destroy()`
//! - NULL checks are performed on all pointer inputs
//! - Results are written through caller-owned out pointers
//!
//! Thread Safety:
//! - The engine is NOT thread-safe. Use a single thread or a mutex.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::error::PedometerError;
use crate::session::Session;
use crate::types::{Gender, UserProfile};

// ============================================================================
// OPAQUE HANDLE TYPES
// ============================================================================

/// Opaque handle to a step-counting session.
pub struct PedometerEngine {
    session: Session,
}

/// Result status codes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PedometerStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Null pointer provided.
    NullPointer = 1,
    /// Invalid parameter value.
    InvalidParameter = 2,
    /// Metric not available yet.
    NoData = 3,
    /// Internal error.
    InternalError = 4,
}

impl From<PedometerError> for PedometerStatus {
    fn from(err: PedometerError) -> Self {
        match err {
            PedometerError::NoData => PedometerStatus::NoData,
            PedometerError::InvalidConfig(_) | PedometerError::ConfigParse(_) => {
                PedometerStatus::InvalidParameter
            }
            PedometerError::InvalidTopology(_) => PedometerStatus::InternalError,
        }
    }
}

// ============================================================================
// ENGINE LIFECYCLE
// ============================================================================

/// Create a new step-counting engine.
///
/// `gender` is a one-letter code: "F"/"f" for female, anything else male.
/// A non-zero `skip_filter` builds the chain without the smoothing stage.
///
/// # Safety
/// - `gender` must be NULL or a valid null-terminated C string.
/// - `out` must be a valid pointer; on success it receives a handle that
///   must be freed with `pedometer_destroy()`.
#[no_mangle]
pub unsafe extern "C" fn pedometer_create(
    gender: *const c_char,
    age_years: u8,
    height_cm: u16,
    weight_kg: u16,
    skip_filter: i32,
    out: *mut *mut PedometerEngine,
) -> PedometerStatus {
    if out.is_null() {
        return PedometerStatus::NullPointer;
    }
    *out = ptr::null_mut();

    let gender = if gender.is_null() {
        Gender::Male
    } else {
        match CStr::from_ptr(gender).to_str() {
            Ok(code) => Gender::from_code(code),
            Err(_) => return PedometerStatus::InvalidParameter,
        }
    };

    let config = if skip_filter != 0 {
        EngineConfig::skip_filter()
    } else {
        EngineConfig::default()
    };
    let profile = UserProfile::new(gender, age_years, height_cm, weight_kg);

    match Session::new(config, profile) {
        Ok(session) => {
            *out = Box::into_raw(Box::new(PedometerEngine { session }));
            PedometerStatus::Ok
        }
        Err(err) => {
            log::error!("failed to create step counter: {}", err);
            err.into()
        }
    }
}

/// Destroy an engine instance.
///
/// # Safety
/// - `engine` must be a valid pointer from `pedometer_create()`.
/// - Must not be called more than once for the same pointer.
#[no_mangle]
pub unsafe extern "C" fn pedometer_destroy(engine: *mut PedometerEngine) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Zero steps, distance, MET and calories.
///
/// # Safety
/// - `engine` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn pedometer_reset_steps(engine: *mut PedometerEngine) -> PedometerStatus {
    if engine.is_null() {
        return PedometerStatus::NullPointer;
    }
    (*engine).session.reset_steps();
    PedometerStatus::Ok
}

/// Clear all signal-processing state. The step count is kept.
///
/// # Safety
/// - `engine` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn pedometer_reset_algo(engine: *mut PedometerEngine) -> PedometerStatus {
    if engine.is_null() {
        return PedometerStatus::NullPointer;
    }
    (*engine).session.reset_algo();
    PedometerStatus::Ok
}

// ============================================================================
// SAMPLE PROCESSING
// ============================================================================

/// Process a single accelerometer sample.
///
/// `steps_confirmed` may be NULL; otherwise it receives the number of steps
/// confirmed by this sample.
///
/// # Safety
/// - `engine` must be a valid pointer.
/// - `steps_confirmed` must be NULL or a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn pedometer_process_sample(
    engine: *mut PedometerEngine,
    timestamp_ms: u64,
    x: f32,
    y: f32,
    z: f32,
    steps_confirmed: *mut u32,
) -> PedometerStatus {
    if engine.is_null() {
        return PedometerStatus::NullPointer;
    }
    if !(x.is_finite() && y.is_finite() && z.is_finite()) {
        return PedometerStatus::InvalidParameter;
    }

    let confirmed = (*engine).session.process_sample(timestamp_ms, x, y, z);
    if !steps_confirmed.is_null() {
        *steps_confirmed = confirmed;
    }
    PedometerStatus::Ok
}

// ============================================================================
// METRICS
// ============================================================================

/// Get the step count.
///
/// # Safety
/// - `engine` and `out` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn pedometer_get_steps(
    engine: *const PedometerEngine,
    out: *mut u32,
) -> PedometerStatus {
    if engine.is_null() || out.is_null() {
        return PedometerStatus::NullPointer;
    }
    *out = (*engine).session.steps();
    PedometerStatus::Ok
}

/// Get the distance travelled.
///
/// # Safety
/// - `engine` and `out` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn pedometer_get_distance(
    engine: *const PedometerEngine,
    out: *mut f32,
) -> PedometerStatus {
    if engine.is_null() || out.is_null() {
        return PedometerStatus::NullPointer;
    }
    *out = (*engine).session.distance();
    PedometerStatus::Ok
}

/// Get the average cadence in steps per second.
///
/// Returns `NoData` and leaves `out` untouched until a peak has been seen.
///
/// # Safety
/// - `engine` and `out` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn pedometer_get_steps_per_sec(
    engine: *const PedometerEngine,
    out: *mut f32,
) -> PedometerStatus {
    if engine.is_null() || out.is_null() {
        return PedometerStatus::NullPointer;
    }
    match (*engine).session.steps_per_sec() {
        Ok(rate) => {
            *out = rate;
            PedometerStatus::Ok
        }
        Err(err) => err.into(),
    }
}

/// Get the energy expenditure in kcal.
///
/// # Safety
/// - `engine` and `out` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn pedometer_get_calories(
    engine: *const PedometerEngine,
    out: *mut f64,
) -> PedometerStatus {
    if engine.is_null() || out.is_null() {
        return PedometerStatus::NullPointer;
    }
    *out = (*engine).session.calories();
    PedometerStatus::Ok
}

/// Get the mean time between peaks in ms.
///
/// # Safety
/// - `engine` and `out` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn pedometer_get_mean_avg(
    engine: *const PedometerEngine,
    out: *mut f32,
) -> PedometerStatus {
    if engine.is_null() || out.is_null() {
        return PedometerStatus::NullPointer;
    }
    *out = (*engine).session.mean_peak_time();
    PedometerStatus::Ok
}

// ============================================================================
// VERSION INFO
// ============================================================================

/// Get the library version string.
///
/// # Returns
/// - Static string, do NOT free.
#[no_mangle]
pub extern "C" fn pedometer_version() -> *const c_char {
    static VERSION: &[u8] = concat!("stepcount/", env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// TESTS
// ============================================================================
