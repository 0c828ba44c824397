use crate::core::{ConsistencyLevel, PersistenceError, Result};
use crate::flush::unit::{FlushState, FlushUnit, SharedFlushUnit};

/// Flush context for an explicit batch session: statements pushed by any
/// number of logical operations accumulate without executing until the
/// session ends the batch.
///
/// Duplicates share the accumulator, so cascaded sub-operations land in the
/// same batch. Not safe for concurrent callers; the owning session confines
/// it behind `&mut self`.
#[derive(Clone)]
pub struct BatchingFlushContext {
    unit: SharedFlushUnit,
}

impl Default for BatchingFlushContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchingFlushContext {
    pub fn new() -> Self {
        Self {
            unit: FlushUnit::shared(),
        }
    }

    pub fn unit(&self) -> &SharedFlushUnit {
        &self.unit
    }

    /// Resets accumulators and optionally fixes a consistency level for the
    /// whole batch.
    pub fn start_batch(&self, level: Option<ConsistencyLevel>) -> Result<()> {
        self.unit.lock()?.reopen(level)
    }

    /// Discards accumulated state without executing.
    pub fn clean_batch(&self) -> Result<()> {
        self.unit.lock()?.clear();
        Ok(())
    }

    /// Operations are only legal between `start_batch` and `end_batch`.
    pub fn ensure_started(&self) -> Result<()> {
        let state = self.unit.lock()?.state();
        if state == FlushState::Accumulating {
            Ok(())
        } else {
            Err(PersistenceError::InvalidState(format!(
                "batch session is not accumulating (state {state:?}); call start_batch first"
            )))
        }
    }

    pub fn session_level(&self) -> Result<Option<ConsistencyLevel>> {
        Ok(self.unit.lock()?.session_level())
    }

    pub fn duplicate(&self) -> Self {
        self.clone()
    }
}
