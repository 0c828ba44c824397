use crate::flush::unit::{FlushUnit, SharedFlushUnit};

/// Flush context for stand-alone operations: created fresh per call, flushed
/// implicitly at the end of the logical operation, then discarded.
///
/// A duplicate gets an independent accumulator; immediate sub-operations
/// flush on their own.
#[derive(Clone)]
pub struct ImmediateFlushContext {
    unit: SharedFlushUnit,
}

impl Default for ImmediateFlushContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ImmediateFlushContext {
    pub fn new() -> Self {
        Self {
            unit: FlushUnit::shared(),
        }
    }

    pub fn unit(&self) -> &SharedFlushUnit {
        &self.unit
    }

    pub fn duplicate(&self) -> Self {
        Self::new()
    }
}
