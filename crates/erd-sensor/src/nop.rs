use crate::clock::ClockSource;
use crate::error::Result;
use crate::reader::EnergyReader;
use crate::types::{Attributes, Difference, Microjoules, Reading};

/// Stand-in reader for hosts without RAPL: real timestamps, zero energy.
#[derive(Debug, Clone)]
pub struct NopReader {
    attrs: Attributes,
    clock: ClockSource,
}

impl NopReader {
    pub fn new(attrs: Attributes, clock: ClockSource) -> Self {
        Self { attrs, clock }
    }
}

impl EnergyReader for NopReader {
    fn obtain_readings(&self) -> Result<Reading> {
        Ok(Reading::new(self.clock.now(), Microjoules::ZERO))
    }

    fn subtract(&self, lhs: &Reading, rhs: &Reading) -> Difference {
        Difference::new(lhs.timestamp.nanos_since(rhs.timestamp), Microjoules::ZERO)
    }

    fn attributes(&self) -> Attributes {
        self.attrs
    }
}
