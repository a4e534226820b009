//! Unit tags carried next to every time and energy value on the wire.
//!
//! Encoders always write the canonical units (nanoseconds, microjoules);
//! decoders convert whatever tag they find into those units.

use erd_sensor::{Microjoules, Timestamp};

use crate::error::{Result, WireError};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Second = 0,
    Nanosecond = 1,
}

impl TimeUnit {
    pub const CANONICAL: TimeUnit = TimeUnit::Nanosecond;

    pub fn from_tag(tag: u16) -> Result<Self> {
        match tag {
            0 => Ok(TimeUnit::Second),
            1 => Ok(TimeUnit::Nanosecond),
            other => Err(WireError::UnknownTimeUnit(other)),
        }
    }

    pub const fn tag(self) -> u16 {
        self as u16
    }

    /// Convert a value in this unit to nanoseconds.
    pub fn to_nanos(self, value: i64) -> Result<i64> {
        match self {
            TimeUnit::Nanosecond => Ok(value),
            TimeUnit::Second => Timestamp::from_secs(value)
                .map(Timestamp::as_nanos)
                .ok_or(WireError::OutOfRange("time")),
        }
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyUnit {
    Joule = 0,
    Microjoule = 1,
}

impl EnergyUnit {
    pub const CANONICAL: EnergyUnit = EnergyUnit::Microjoule;

    pub fn from_tag(tag: u16) -> Result<Self> {
        match tag {
            0 => Ok(EnergyUnit::Joule),
            1 => Ok(EnergyUnit::Microjoule),
            other => Err(WireError::UnknownEnergyUnit(other)),
        }
    }

    pub const fn tag(self) -> u16 {
        self as u16
    }

    /// Convert a value in this unit to microjoules.
    pub fn to_microjoules(self, value: u64) -> Result<Microjoules> {
        match self {
            EnergyUnit::Microjoule => Ok(Microjoules(value)),
            EnergyUnit::Joule => {
                Microjoules::from_joules(value).ok_or(WireError::OutOfRange("energy"))
            }
        }
    }
}

/// Convert a tagged wire time value to nanoseconds.
pub fn convert_time(value: i64, tag: u16) -> Result<i64> {
    TimeUnit::from_tag(tag)?.to_nanos(value)
}

/// Convert a tagged wire energy value to microjoules.
pub fn convert_energy(value: u64, tag: u16) -> Result<Microjoules> {
    EnergyUnit::from_tag(tag)?.to_microjoules(value)
}
