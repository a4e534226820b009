use std::sync::{Arc, Mutex};

use erd_sensor::{EnergyReader, Reader, Reading, Timestamp};
use erd_wire::units::{convert_energy, convert_time, EnergyUnit, TimeUnit};
use tracing::debug;

use crate::attr;
use crate::error;
use crate::handles::{lock, HandleTable};
use crate::types::{ErdAttr, ErdErrorDescriptor, ErdHandle, ErdReadings, ErdStatus};

static READERS: Mutex<HandleTable<Arc<Reader>>> = Mutex::new(HandleTable::new());

fn reader(handle: ErdHandle) -> Option<Arc<Reader>> {
    lock(&READERS).get(handle).cloned()
}

fn to_c(timestamp: i64, energy: u64) -> ErdReadings {
    ErdReadings {
        timestamp,
        energy,
        tunit: u32::from(TimeUnit::CANONICAL.tag()),
        eunit: u32::from(EnergyUnit::CANONICAL.tag()),
    }
}

/// Convert a caller-supplied reading to canonical units.
fn from_c(readings: &ErdReadings) -> erd_wire::Result<Reading> {
    let tunit = u16::try_from(readings.tunit).unwrap_or(u16::MAX);
    let eunit = u16::try_from(readings.eunit).unwrap_or(u16::MAX);
    Ok(Reading::new(
        Timestamp::from_nanos(convert_time(readings.timestamp, tunit)?),
        convert_energy(readings.energy, eunit)?,
    ))
}

/// Open a reader for the sensor described by `attr`.
///
/// # Safety
/// `handle` must be a valid pointer to writable storage for one `ErdHandle`.
/// `ed` must be null or a valid error descriptor.
#[no_mangle]
pub unsafe extern "C" fn erd_handle_create(
    handle: *mut ErdHandle,
    attr: ErdAttr,
    ed: *mut ErdErrorDescriptor,
) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        if handle.is_null() {
            return error::fail(ed, ErdStatus::InvalidArgument, "handle cannot be null");
        }
        let Some(state) = attr::snapshot(attr) else {
            return error::fail(
                ed,
                ErdStatus::InvalidArgument,
                "invalid or destroyed attribute handle",
            );
        };

        let reader = match Reader::new(state.attrs, &state.config) {
            Ok(reader) => reader,
            Err(err) => return error::fail_sensor(ed, &err),
        };
        debug!(sensor = %state.attrs, backend = %reader.backend(), "reader created");

        match lock(&READERS).insert(Arc::new(reader)) {
            Some(id) => {
                // SAFETY: non-null, and writable per the caller's contract.
                unsafe { handle.write(id) };
                ErdStatus::Success
            }
            None => error::fail(ed, ErdStatus::AllocError, "Error allocating reader handle"),
        }
    })
}

/// Destroy a reader and close its counter file.
#[no_mangle]
pub extern "C" fn erd_handle_destroy(handle: ErdHandle) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        match lock(&READERS).remove(handle) {
            Some(_) => ErdStatus::Success,
            None => error::fail(
                std::ptr::null_mut(),
                ErdStatus::InvalidArgument,
                "invalid or destroyed reader handle",
            ),
        }
    })
}

/// Sample the reader's counter into `into`, in nanoseconds and microjoules.
///
/// # Safety
/// `into` must be a valid pointer to writable storage for one `ErdReadings`.
/// `ed` must be null or a valid error descriptor.
#[no_mangle]
pub unsafe extern "C" fn erd_obtain_readings(
    handle: ErdHandle,
    into: *mut ErdReadings,
    ed: *mut ErdErrorDescriptor,
) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        if into.is_null() {
            return error::fail(ed, ErdStatus::InvalidArgument, "into cannot be null");
        }
        let Some(reader) = reader(handle) else {
            return error::fail(
                ed,
                ErdStatus::InvalidArgument,
                "invalid or destroyed reader handle",
            );
        };

        match reader.obtain_readings() {
            Ok(reading) => {
                let out = to_c(reading.timestamp.as_nanos(), reading.energy.as_u64());
                // SAFETY: non-null, and writable per the caller's contract.
                unsafe { into.write(out) };
                ErdStatus::Success
            }
            Err(err) => error::fail_sensor(ed, &err),
        }
    })
}

/// Store `lhs - rhs` in `result`: elapsed nanoseconds in `timestamp` and
/// consumed microjoules in `energy`. `lhs` must be the later reading.
///
/// # Safety
/// `lhs` and `rhs` must be valid readable pointers; `result` must be a valid
/// writable pointer. All three may not be null.
#[no_mangle]
pub unsafe extern "C" fn erd_subtract_readings(
    handle: ErdHandle,
    lhs: *const ErdReadings,
    rhs: *const ErdReadings,
    result: *mut ErdReadings,
) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        if lhs.is_null() || rhs.is_null() || result.is_null() {
            return error::fail(
                std::ptr::null_mut(),
                ErdStatus::InvalidArgument,
                "lhs, rhs and result cannot be null",
            );
        }
        let Some(reader) = reader(handle) else {
            return error::fail(
                std::ptr::null_mut(),
                ErdStatus::InvalidArgument,
                "invalid or destroyed reader handle",
            );
        };

        // SAFETY: both pointers are non-null and readable per the caller's contract.
        let (lhs, rhs) = unsafe { (lhs.read(), rhs.read()) };
        let (lhs, rhs) = match (from_c(&lhs), from_c(&rhs)) {
            (Ok(lhs), Ok(rhs)) => (lhs, rhs),
            (Err(err), _) | (_, Err(err)) => {
                return error::fail_wire(std::ptr::null_mut(), &err)
            }
        };

        let diff = reader.subtract(&lhs, &rhs);
        let out = to_c(diff.duration_ns, diff.energy_consumed.as_u64());
        // SAFETY: non-null, and writable per the caller's contract.
        unsafe { result.write(out) };
        ErdStatus::Success
    })
}
