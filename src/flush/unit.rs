use crate::core::{ConsistencyLevel, PersistenceError, Result};
use crate::lifecycle::{CompletionListener, EventRecord};
use crate::statement::StatementWrapper;
use std::sync::{Arc, Mutex};

/// Flush-unit lifecycle. A unit accumulates, flushes exactly once, and is
/// either reopened (batch sessions) or discarded (immediate operations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Open,
    Accumulating,
    Flushing,
    Flushed,
    Failed,
    Cleared,
}

/// Everything drained out of a unit when a flush begins.
pub struct FlushPayload {
    pub regular: Vec<StatementWrapper>,
    pub counter: Vec<StatementWrapper>,
    pub events: Vec<EventRecord>,
    pub listeners: Vec<Arc<dyn CompletionListener>>,
}

/// Accumulator behind a flush context: the two wrapper groups (regular and
/// counter statements never merge), the deferred post-event queue, and the
/// deferred completion listeners, all guarded by one state machine.
pub struct FlushUnit {
    state: FlushState,
    session_level: Option<ConsistencyLevel>,
    regular: Vec<StatementWrapper>,
    counter: Vec<StatementWrapper>,
    events: Vec<EventRecord>,
    listeners: Vec<Arc<dyn CompletionListener>>,
}

/// Shared handle to one unit; batch-mode duplicates clone the `Arc` so
/// cascaded sub-operations land in the same accumulator.
pub type SharedFlushUnit = Arc<Mutex<FlushUnit>>;

impl Default for FlushUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl FlushUnit {
    pub fn new() -> Self {
        Self {
            state: FlushState::Open,
            session_level: None,
            regular: Vec::new(),
            counter: Vec::new(),
            events: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn shared() -> SharedFlushUnit {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn state(&self) -> FlushState {
        self.state
    }

    pub fn session_level(&self) -> Option<ConsistencyLevel> {
        self.session_level
    }

    pub fn regular_len(&self) -> usize {
        self.regular.len()
    }

    pub fn counter_len(&self) -> usize {
        self.counter.len()
    }

    pub fn push_regular(&mut self, wrapper: StatementWrapper) -> Result<()> {
        self.ensure_accumulating()?;
        self.regular.push(wrapper);
        Ok(())
    }

    pub fn push_counter(&mut self, wrapper: StatementWrapper) -> Result<()> {
        self.ensure_accumulating()?;
        self.counter.push(wrapper);
        Ok(())
    }

    pub fn defer_event(&mut self, event: EventRecord) -> Result<()> {
        self.ensure_accumulating()?;
        self.events.push(event);
        Ok(())
    }

    pub fn defer_listener(&mut self, listener: Arc<dyn CompletionListener>) -> Result<()> {
        self.ensure_accumulating()?;
        self.listeners.push(listener);
        Ok(())
    }

    /// Transitions into `Flushing` and drains the accumulated work.
    pub fn begin_flush(&mut self) -> Result<FlushPayload> {
        match self.state {
            FlushState::Open | FlushState::Accumulating => {
                self.state = FlushState::Flushing;
                Ok(FlushPayload {
                    regular: std::mem::take(&mut self.regular),
                    counter: std::mem::take(&mut self.counter),
                    events: std::mem::take(&mut self.events),
                    listeners: std::mem::take(&mut self.listeners),
                })
            }
            other => Err(PersistenceError::InvalidState(format!(
                "cannot flush a unit in state {other:?}"
            ))),
        }
    }

    pub fn complete(&mut self) {
        self.state = FlushState::Flushed;
    }

    pub fn fail(&mut self) {
        self.state = FlushState::Failed;
    }

    /// Batch-session start: resets accumulators and fixes an optional
    /// session-wide consistency level. Rejected after an unacknowledged
    /// failure; `clear` first.
    pub fn reopen(&mut self, level: Option<ConsistencyLevel>) -> Result<()> {
        match self.state {
            FlushState::Open | FlushState::Flushed | FlushState::Cleared => {
                self.discard();
                self.session_level = level;
                self.state = FlushState::Accumulating;
                Ok(())
            }
            FlushState::Failed => Err(PersistenceError::InvalidState(
                "batch failed; clean the session before starting a new batch".into(),
            )),
            other => Err(PersistenceError::InvalidState(format!(
                "cannot start a batch while the unit is {other:?}"
            ))),
        }
    }

    /// Discards accumulated state without executing; error recovery path.
    pub fn clear(&mut self) {
        self.discard();
        self.state = FlushState::Cleared;
    }

    fn discard(&mut self) {
        self.regular.clear();
        self.counter.clear();
        self.events.clear();
        self.listeners.clear();
        self.session_level = None;
    }

    fn ensure_accumulating(&mut self) -> Result<()> {
        match self.state {
            FlushState::Open | FlushState::Accumulating => {
                self.state = FlushState::Accumulating;
                Ok(())
            }
            other => Err(PersistenceError::InvalidState(format!(
                "cannot accumulate statements in state {other:?}"
            ))),
        }
    }
}
