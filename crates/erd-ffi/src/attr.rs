use std::sync::Mutex;

use erd_sensor::{Attributes, ReaderConfig};

use crate::error;
use crate::handles::{lock, HandleTable};
use crate::types::{backend_from_c, domain_from_c, ErdAttr, ErdErrorDescriptor, ErdStatus};

/// Everything needed to build a reader.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttrState {
    pub(crate) attrs: Attributes,
    pub(crate) config: ReaderConfig,
}

static ATTRS: Mutex<HandleTable<AttrState>> = Mutex::new(HandleTable::new());

pub(crate) fn snapshot(attr: ErdAttr) -> Option<AttrState> {
    lock(&ATTRS).get(attr).cloned()
}

fn update(attr: ErdAttr, f: impl FnOnce(&mut AttrState)) -> ErdStatus {
    match lock(&ATTRS).get_mut(attr) {
        Some(state) => {
            f(state);
            ErdStatus::Success
        }
        None => error::fail(
            std::ptr::null_mut(),
            ErdStatus::InvalidArgument,
            "invalid or destroyed attribute handle",
        ),
    }
}

#[cfg(test)]
pub(crate) fn override_roots(attr: ErdAttr, root: std::path::PathBuf) {
    let roots = erd_sensor::SensorRoots {
        powercap: root.join("intel-rapl"),
        cpu: root.join("cpu"),
    };
    assert_eq!(update(attr, |state| state.config.roots = roots), ErdStatus::Success);
}

/// Create attributes defaulting to the package domain of socket 0.
///
/// # Safety
/// `attr` must be a valid pointer to writable storage for one `ErdAttr`.
/// `ed` must be null or a valid error descriptor.
#[no_mangle]
pub unsafe extern "C" fn erd_attr_create(
    attr: *mut ErdAttr,
    ed: *mut ErdErrorDescriptor,
) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        if attr.is_null() {
            return error::fail(ed, ErdStatus::InvalidArgument, "attr cannot be null");
        }
        match lock(&ATTRS).insert(AttrState::default()) {
            Some(handle) => {
                // SAFETY: non-null, and writable per the caller's contract.
                unsafe { attr.write(handle) };
                ErdStatus::Success
            }
            None => error::fail(
                ed,
                ErdStatus::AllocError,
                "Error allocating memory for attributes",
            ),
        }
    })
}

#[no_mangle]
pub extern "C" fn erd_attr_set_domain(attr: ErdAttr, domain: u32) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        match domain_from_c(domain) {
            Some(domain) => update(attr, |state| state.attrs.domain = domain),
            None => error::fail(
                std::ptr::null_mut(),
                ErdStatus::InvalidArgument,
                &format!("unknown domain {domain}"),
            ),
        }
    })
}

#[no_mangle]
pub extern "C" fn erd_attr_set_socket(attr: ErdAttr, socket: u32) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        update(attr, |state| state.attrs.socket = socket)
    })
}

/// Select the reader backend: `ERD_BACKEND_POWERCAP` (default) or `ERD_BACKEND_NOP`.
#[no_mangle]
pub extern "C" fn erd_attr_set_backend(attr: ErdAttr, backend: u32) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        match backend_from_c(backend) {
            Some(backend) => update(attr, |state| state.config.backend = backend),
            None => error::fail(
                std::ptr::null_mut(),
                ErdStatus::InvalidArgument,
                &format!("unknown backend {backend}"),
            ),
        }
    })
}

/// Destroy attributes. Handles already created from them stay valid.
#[no_mangle]
pub extern "C" fn erd_attr_destroy(attr: ErdAttr) -> ErdStatus {
    crate::ffi_boundary(ErdStatus::Unknown, || {
        error::clear_error_state();
        match lock(&ATTRS).remove(attr) {
            Some(_) => ErdStatus::Success,
            None => error::fail(
                std::ptr::null_mut(),
                ErdStatus::InvalidArgument,
                "invalid or destroyed attribute handle",
            ),
        }
    })
}
