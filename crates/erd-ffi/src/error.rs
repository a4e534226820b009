use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use erd_sensor::{ErrorKind, SensorError};
use erd_wire::WireError;

use crate::types::{ErdErrorDescriptor, ErdStatus};

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

/// Record `message` as the last error, copy it into `ed` and return `status`.
pub(crate) fn fail(ed: *mut ErdErrorDescriptor, status: ErdStatus, message: &str) -> ErdStatus {
    set_error_message(message);
    // SAFETY: `ed` is null or a caller-provided descriptor, checked inside.
    unsafe { fill_error_descriptor(ed, message) };
    status
}

pub(crate) fn fail_sensor(ed: *mut ErdErrorDescriptor, err: &SensorError) -> ErdStatus {
    let status = match err.kind() {
        ErrorKind::System => ErdStatus::SystemError,
        ErrorKind::InvalidArgument => ErdStatus::InvalidArgument,
        ErrorKind::BadMessage => ErdStatus::GenericError,
    };
    fail(ed, status, &err.to_string())
}

pub(crate) fn fail_wire(ed: *mut ErdErrorDescriptor, err: &WireError) -> ErdStatus {
    let status = match err {
        WireError::UnknownTimeUnit(_) | WireError::UnknownEnergyUnit(_) => ErdStatus::InvalidUnit,
        WireError::OutOfRange(_) => ErdStatus::InvalidArgument,
        _ => ErdStatus::GenericError,
    };
    fail(ed, status, &err.to_string())
}

/// Copy as much of `message` as fits, always NUL-terminated, and store the
/// copied length back into `size`. Null or zero-capacity descriptors are left alone.
///
/// # Safety
/// `ed` must be null or point to a descriptor whose `what` is writable for `size` bytes.
unsafe fn fill_error_descriptor(ed: *mut ErdErrorDescriptor, message: &str) {
    if ed.is_null() {
        return;
    }
    // SAFETY: non-null per the check above; validity is the caller's contract.
    let ed = unsafe { &mut *ed };
    if ed.what.is_null() || ed.size == 0 || message.is_empty() {
        return;
    }

    let capacity = usize::try_from(ed.size - 1).unwrap_or(usize::MAX);
    let len = capacity.min(message.len());
    // SAFETY: `what` holds at least `size` bytes and `len + 1 <= size`.
    unsafe {
        std::ptr::copy_nonoverlapping(message.as_ptr(), ed.what.cast::<u8>(), len);
        *ed.what.add(len) = 0;
    }
    ed.size = len as u64;
}
