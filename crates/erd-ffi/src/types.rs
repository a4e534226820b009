use std::os::raw::c_char;

use erd_sensor::{Backend, Domain};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErdStatus {
    Success = 0,
    Unknown = 1,
    InvalidStatus = 2,
    InvalidArgument = 3,
    InvalidUnit = 4,
    SystemError = 5,
    AllocError = 6,
    GenericError = 7,
}

pub const ERD_PACKAGE: u32 = 0;
pub const ERD_UNCORE: u32 = 1;
pub const ERD_CORES: u32 = 2;
pub const ERD_DRAM: u32 = 3;

pub const ERD_BACKEND_POWERCAP: u32 = 0;
pub const ERD_BACKEND_NOP: u32 = 1;

pub const ERD_SECOND: u32 = 0;
pub const ERD_NANOSECOND: u32 = 1;
pub const ERD_JOULE: u32 = 0;
pub const ERD_MICROJOULE: u32 = 1;

/// A reading or a difference, tagged with its units.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErdReadings {
    pub timestamp: i64,
    pub energy: u64,
    pub tunit: u32,
    pub eunit: u32,
}

/// Caller-owned buffer receiving a NUL-terminated diagnostic.
///
/// On input `size` is the capacity of `what`; on output it is the length of
/// the copied message, excluding the terminator.
#[repr(C)]
#[derive(Debug)]
pub struct ErdErrorDescriptor {
    pub what: *mut c_char,
    pub size: u64,
}

/// Opaque attribute handle: `generation << 32 | slot`. Zero is never valid.
pub type ErdAttr = u64;
/// Opaque reader handle: `generation << 32 | slot`. Zero is never valid.
pub type ErdHandle = u64;

pub(crate) fn domain_from_c(domain: u32) -> Option<Domain> {
    match domain {
        ERD_PACKAGE => Some(Domain::Package),
        ERD_UNCORE => Some(Domain::Uncore),
        ERD_CORES => Some(Domain::Cores),
        ERD_DRAM => Some(Domain::Dram),
        _ => None,
    }
}

pub(crate) fn backend_from_c(backend: u32) -> Option<Backend> {
    match backend {
        ERD_BACKEND_POWERCAP => Some(Backend::Powercap),
        ERD_BACKEND_NOP => Some(Backend::Nop),
        _ => None,
    }
}
