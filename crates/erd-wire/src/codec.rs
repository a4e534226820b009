use std::fmt;

use bytes::{Buf, BufMut};
use erd_sensor::{Difference, Microjoules, Reading, Timestamp};

use crate::error::{Result, WireError};
use crate::units::{convert_energy, convert_time, EnergyUnit, TimeUnit};

/// Operation tag: 4 bytes, first field of both frame types.
pub const OPERATION_SIZE: usize = 4;
/// Status tag: 4 bytes, right after the operation in responses.
pub const STATUS_SIZE: usize = 4;
/// One serialized reading or difference.
pub const RECORD_SIZE: usize = 20;

pub const REQUEST_PAYLOAD_SIZE: usize = 2 * RECORD_SIZE;
pub const REQUEST_SIZE: usize = OPERATION_SIZE + REQUEST_PAYLOAD_SIZE;

pub const RESPONSE_PAYLOAD_SIZE: usize = STATUS_SIZE + RECORD_SIZE;
pub const RESPONSE_SIZE: usize = OPERATION_SIZE + RESPONSE_PAYLOAD_SIZE;

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ObtainReadings = 0,
    Subtract = 1,
}

impl Operation {
    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(Operation::ObtainReadings),
            1 => Ok(Operation::Subtract),
            other => Err(WireError::UnknownOperation(other)),
        }
    }

    pub const fn tag(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ObtainReadings => f.write_str("obtain_readings"),
            Operation::Subtract => f.write_str("subtract"),
        }
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success = 0,
    Error = 1,
}

impl Status {
    pub fn from_tag(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(Status::Success),
            1 => Ok(Status::Error),
            other => Err(WireError::UnknownStatus(other)),
        }
    }

    pub const fn tag(self) -> u32 {
        self as u32
    }
}

/// A request frame: operation tag plus a 40-byte payload.
#[derive(Clone, PartialEq, Eq)]
pub struct RequestFrame([u8; REQUEST_SIZE]);

impl RequestFrame {
    pub const fn from_bytes(bytes: [u8; REQUEST_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; REQUEST_SIZE] {
        &self.0
    }

    /// The raw operation tag, before validation.
    pub fn operation_tag(&self) -> u32 {
        (&self.0[..OPERATION_SIZE]).get_u32_le()
    }

    /// Decode only the leading operation tag.
    pub fn operation(&self) -> Result<Operation> {
        Operation::from_tag(self.operation_tag())
    }

    fn payload(&self) -> &[u8] {
        &self.0[OPERATION_SIZE..]
    }
}

impl fmt::Debug for RequestFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFrame")
            .field("operation", &self.operation().ok())
            .finish_non_exhaustive()
    }
}

/// A response frame: operation tag, status tag and one record.
#[derive(Clone, PartialEq, Eq)]
pub struct ResponseFrame([u8; RESPONSE_SIZE]);

impl ResponseFrame {
    pub const fn from_bytes(bytes: [u8; RESPONSE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; RESPONSE_SIZE] {
        &self.0
    }

    /// Decode only the leading operation tag.
    pub fn operation(&self) -> Result<Operation> {
        Operation::from_tag((&self.0[..OPERATION_SIZE]).get_u32_le())
    }

    pub fn status(&self) -> Result<Status> {
        Status::from_tag((&self.0[OPERATION_SIZE..OPERATION_SIZE + STATUS_SIZE]).get_u32_le())
    }

    fn record(&self) -> &[u8] {
        &self.0[OPERATION_SIZE + STATUS_SIZE..]
    }

    fn expect_operation(&self, expected: Operation) -> Result<()> {
        let found = self.operation()?;
        if found != expected {
            return Err(WireError::OperationMismatch { expected, found });
        }
        Ok(())
    }
}

impl fmt::Debug for ResponseFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFrame")
            .field("operation", &self.operation().ok())
            .field("status", &self.status().ok())
            .finish_non_exhaustive()
    }
}

/// The value carried by a response; its variant fixes the operation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseValue {
    Readings(Reading),
    Difference(Difference),
}

impl ResponseValue {
    pub fn operation(&self) -> Operation {
        match self {
            ResponseValue::Readings(_) => Operation::ObtainReadings,
            ResponseValue::Difference(_) => Operation::Subtract,
        }
    }
}

fn put_record(mut dst: &mut [u8], time: i64, energy: Microjoules) {
    dst.put_i64_le(time);
    dst.put_u64_le(energy.0);
    dst.put_u16_le(TimeUnit::CANONICAL.tag());
    dst.put_u16_le(EnergyUnit::CANONICAL.tag());
}

/// Decode one record into (nanoseconds, microjoules), honoring its unit tags.
fn get_record(mut src: &[u8]) -> Result<(i64, Microjoules)> {
    let time = src.get_i64_le();
    let energy = src.get_u64_le();
    let time_unit = src.get_u16_le();
    let energy_unit = src.get_u16_le();
    Ok((
        convert_time(time, time_unit)?,
        convert_energy(energy, energy_unit)?,
    ))
}

fn get_reading(src: &[u8]) -> Result<Reading> {
    let (nanos, energy) = get_record(src)?;
    Ok(Reading::new(Timestamp::from_nanos(nanos), energy))
}

/// Request a fresh reading. The payload is zeroed and ignored.
pub fn encode_obtain_readings() -> RequestFrame {
    let mut frame = [0u8; REQUEST_SIZE];
    (&mut frame[..OPERATION_SIZE]).put_u32_le(Operation::ObtainReadings.tag());
    RequestFrame(frame)
}

/// Request `lhs - rhs`; `lhs` is serialized first.
pub fn encode_subtract(lhs: &Reading, rhs: &Reading) -> RequestFrame {
    let mut frame = [0u8; REQUEST_SIZE];
    (&mut frame[..OPERATION_SIZE]).put_u32_le(Operation::Subtract.tag());
    let (first, second) = frame[OPERATION_SIZE..].split_at_mut(RECORD_SIZE);
    put_record(first, lhs.timestamp.as_nanos(), lhs.energy);
    put_record(second, rhs.timestamp.as_nanos(), rhs.energy);
    RequestFrame(frame)
}

/// Decode the two readings of a subtract request, in `(lhs, rhs)` order.
pub fn decode_subtract(frame: &RequestFrame) -> Result<(Reading, Reading)> {
    let found = frame.operation()?;
    if found != Operation::Subtract {
        return Err(WireError::OperationMismatch {
            expected: Operation::Subtract,
            found,
        });
    }
    let (first, second) = frame.payload().split_at(RECORD_SIZE);
    Ok((get_reading(first)?, get_reading(second)?))
}

/// Encode a response. The operation tag follows the value's variant.
pub fn encode_response(status: Status, value: &ResponseValue) -> ResponseFrame {
    let mut frame = [0u8; RESPONSE_SIZE];
    let (head, record) = frame.split_at_mut(OPERATION_SIZE + STATUS_SIZE);
    let mut head = &mut head[..];
    head.put_u32_le(value.operation().tag());
    head.put_u32_le(status.tag());
    match value {
        ResponseValue::Readings(reading) => {
            put_record(record, reading.timestamp.as_nanos(), reading.energy)
        }
        ResponseValue::Difference(diff) => {
            put_record(record, diff.duration_ns, diff.energy_consumed)
        }
    }
    ResponseFrame(frame)
}

/// Encode an error-status response for `operation` with an empty record.
pub fn encode_error_response(operation: Operation) -> ResponseFrame {
    encode_error_response_tag(operation.tag())
}

/// Like [`encode_error_response`], echoing a raw (possibly unknown) tag.
pub fn encode_error_response_tag(tag: u32) -> ResponseFrame {
    let mut frame = [0u8; RESPONSE_SIZE];
    let (head, record) = frame.split_at_mut(OPERATION_SIZE + STATUS_SIZE);
    let mut head = &mut head[..];
    head.put_u32_le(tag);
    head.put_u32_le(Status::Error.tag());
    put_record(record, 0, Microjoules::ZERO);
    ResponseFrame(frame)
}

/// Decode the reading carried by an `obtain_readings` response.
pub fn decode_readings_response(frame: &ResponseFrame) -> Result<Reading> {
    frame.expect_operation(Operation::ObtainReadings)?;
    get_reading(frame.record())
}

/// Decode the difference carried by a `subtract` response.
pub fn decode_difference_response(frame: &ResponseFrame) -> Result<Difference> {
    frame.expect_operation(Operation::Subtract)?;
    let (nanos, energy) = get_record(frame.record())?;
    Ok(Difference::new(nanos, energy))
}
