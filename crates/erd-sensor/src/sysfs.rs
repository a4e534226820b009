//! Small helpers for reading powercap/topology text files.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::error::{Result, SensorError};

/// Large enough for any decimal u64 plus a newline.
pub(crate) const MAX_U64_TEXT: usize = 24;

/// Zone names are short (`package-0`, `uncore`).
const MAX_NAME_TEXT: usize = 32;

/// Read a decimal u64 from the start of an already open file.
pub(crate) fn read_u64_at(file: &File, path: &Path) -> Result<u64> {
    let mut buf = [0u8; MAX_U64_TEXT];
    let read = file
        .read_at(&mut buf, 0)
        .map_err(|err| SensorError::io(path, err))?;
    parse_u64(&buf[..read], path)
}

/// Open, read and parse a decimal u64 file.
pub(crate) fn read_u64(path: &Path) -> Result<u64> {
    let file = File::open(path).map_err(|err| SensorError::io(path, err))?;
    read_u64_at(&file, path)
}

/// Read a zone `name` file, trimmed.
pub(crate) fn read_name(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|err| SensorError::io(path, err))?;
    let mut buf = [0u8; MAX_NAME_TEXT];
    let read = file
        .read_at(&mut buf, 0)
        .map_err(|err| SensorError::io(path, err))?;
    Ok(String::from_utf8_lossy(&buf[..read]).trim().to_owned())
}

fn parse_u64(bytes: &[u8], path: &Path) -> Result<u64> {
    let bad = || SensorError::BadCounter {
        path: path.to_path_buf(),
        content: String::from_utf8_lossy(bytes).trim_end().to_owned(),
    };
    std::str::from_utf8(bytes)
        .map_err(|_| bad())?
        .trim_end()
        .parse()
        .map_err(|_| bad())
}
