//! The erd wire protocol.
//!
//! Two fixed-size, little-endian frame types travel over the local socket:
//!
//! ```text
//! Request  (44 bytes): operation u32 | payload 40 (two records, or zeroes)
//! Response (28 bytes): operation u32 | status u32 | record 20
//! Record   (20 bytes): time i64 | energy u64 | time unit u16 | energy unit u16
//! ```
//!
//! There is no length prefix or checksum: the operation tag comes first so a
//! receiver can branch before decoding the rest, and unit tags are checked on
//! every decode.

pub mod codec;
pub mod error;
pub mod stream;
pub mod units;

pub use codec::{
    decode_difference_response, decode_readings_response, decode_subtract, encode_error_response,
    encode_error_response_tag, encode_obtain_readings, encode_response, encode_subtract,
    Operation, RequestFrame, ResponseFrame, ResponseValue, Status, RECORD_SIZE, REQUEST_SIZE,
    RESPONSE_SIZE,
};
pub use error::{Result, WireError};
pub use stream::{FrameConfig, FrameStream};
pub use units::{EnergyUnit, TimeUnit};
