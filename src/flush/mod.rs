pub mod batching;
pub mod completion;
pub mod immediate;
pub mod unit;

pub use batching::BatchingFlushContext;
pub use completion::AsyncCompletion;
pub use immediate::ImmediateFlushContext;
pub use unit::{FlushPayload, FlushState, FlushUnit, SharedFlushUnit};

use crate::core::{ConsistencyLevel, Result};
use crate::lifecycle::{CompletionListener, EventRecord};
use crate::statement::StatementWrapper;
use std::sync::Arc;

/// The flush context a persistence context is bound to.
///
/// Immediate duplicates are independent; batching duplicates share the
/// accumulator so cascaded sub-operations join the same batch.
#[derive(Clone)]
pub enum FlushHandle {
    Immediate(ImmediateFlushContext),
    Batching(BatchingFlushContext),
}

impl FlushHandle {
    pub fn immediate() -> Self {
        Self::Immediate(ImmediateFlushContext::new())
    }

    pub fn unit(&self) -> &SharedFlushUnit {
        match self {
            Self::Immediate(ctx) => ctx.unit(),
            Self::Batching(ctx) => ctx.unit(),
        }
    }

    pub fn is_batching(&self) -> bool {
        matches!(self, Self::Batching(_))
    }

    /// Batch-session consistency override, when one is active.
    pub fn batch_level(&self) -> Result<Option<ConsistencyLevel>> {
        match self {
            Self::Immediate(_) => Ok(None),
            Self::Batching(ctx) => ctx.session_level(),
        }
    }

    pub fn duplicate(&self) -> Self {
        match self {
            Self::Immediate(ctx) => Self::Immediate(ctx.duplicate()),
            Self::Batching(ctx) => Self::Batching(ctx.duplicate()),
        }
    }

    pub fn push_regular(&self, wrapper: StatementWrapper) -> Result<()> {
        self.unit().lock()?.push_regular(wrapper)
    }

    pub fn push_counter(&self, wrapper: StatementWrapper) -> Result<()> {
        self.unit().lock()?.push_counter(wrapper)
    }

    pub fn defer_event(&self, event: EventRecord) -> Result<()> {
        self.unit().lock()?.defer_event(event)
    }

    pub fn defer_listener(&self, listener: Arc<dyn CompletionListener>) -> Result<()> {
        self.unit().lock()?.defer_listener(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_duplicate_is_independent() {
        let handle = FlushHandle::immediate();
        let dup = handle.duplicate();
        assert!(!Arc::ptr_eq(handle.unit(), dup.unit()));
    }

    #[test]
    fn batching_duplicate_shares_the_accumulator() {
        let ctx = BatchingFlushContext::new();
        ctx.start_batch(Some(ConsistencyLevel::Quorum)).unwrap();
        let handle = FlushHandle::Batching(ctx.duplicate());
        assert!(Arc::ptr_eq(ctx.unit(), handle.unit()));
        assert_eq!(handle.batch_level().unwrap(), Some(ConsistencyLevel::Quorum));
    }
}
