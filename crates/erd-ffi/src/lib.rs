//! erd-ffi: C-ABI exports for erd energy readers.
//!
//! Readers run in the calling process; no daemon is involved. Attribute and
//! reader handles are opaque 64-bit values checked on every call.

mod attr;
mod error;
mod handles;
mod reader;
mod types;

use std::panic::AssertUnwindSafe;

pub use attr::{
    erd_attr_create, erd_attr_destroy, erd_attr_set_backend, erd_attr_set_domain,
    erd_attr_set_socket,
};
pub use reader::{erd_handle_create, erd_handle_destroy, erd_obtain_readings, erd_subtract_readings};
pub use types::{
    ErdAttr, ErdErrorDescriptor, ErdHandle, ErdReadings, ErdStatus, ERD_BACKEND_NOP,
    ERD_BACKEND_POWERCAP, ERD_CORES, ERD_DRAM, ERD_JOULE, ERD_MICROJOULE, ERD_NANOSECOND,
    ERD_PACKAGE, ERD_SECOND, ERD_UNCORE,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Install a stderr log subscriber at warn level and reset the error state.
///
/// Optional; does nothing to logging if the host already installed a subscriber.
#[no_mangle]
pub extern "C" fn erd_init() -> ErdStatus {
    ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::level_filters::LevelFilter::WARN)
            .with_ansi(false)
            .with_target(false)
            .try_init();
        ErdStatus::Success
    })
}

/// Message of the last failed call on this thread, or an empty string.
///
/// The pointer stays valid until the next erd call on the same thread.
#[no_mangle]
pub extern "C" fn erd_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
