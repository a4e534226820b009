use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::Timestamp;

/// Which clock stamps readings.
///
/// Readings are only comparable when produced with the same source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClockSource {
    /// `CLOCK_MONOTONIC`: unaffected by wall-clock adjustments.
    #[default]
    Monotonic,
    /// Wall-clock time since the Unix epoch.
    Realtime,
}

impl ClockSource {
    pub fn now(self) -> Timestamp {
        match self {
            ClockSource::Monotonic => monotonic_now(),
            ClockSource::Realtime => {
                let nanos = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
                    .unwrap_or(0);
                Timestamp::from_nanos(nanos)
            }
        }
    }
}

impl std::str::FromStr for ClockSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monotonic" | "steady" => Ok(ClockSource::Monotonic),
            "realtime" | "system" => Ok(ClockSource::Realtime),
            other => Err(format!(
                "unknown clock '{other}' (expected monotonic or realtime)"
            )),
        }
    }
}

fn monotonic_now() -> Timestamp {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `ts` is a valid, writable timespec; CLOCK_MONOTONIC is always available on Linux.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return Timestamp::default();
    }
    let nanos = (ts.tv_sec as i64)
        .saturating_mul(1_000_000_000)
        .saturating_add(ts.tv_nsec as i64);
    Timestamp::from_nanos(nanos)
}
