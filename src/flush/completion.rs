use crate::core::Result;
use crate::flush::unit::SharedFlushUnit;
use crate::gateway::DaoGateway;
use crate::lifecycle::{CompletionListener, InterceptorRegistry};
use crate::statement::BatchKind;
use futures::future::try_join;
use std::sync::Arc;
use tracing::{event, info_span, Instrument, Level};

/// Sequential continuation pipeline behind every flush:
///
/// 1. drain the unit (regular and counter groups stay separate),
/// 2. submit both groups and merge their completions; partial failure of
///    either sub-submission fails the combined future,
/// 3. on success, fire deferred post events in push order,
/// 4. hand back the deferred completion listeners so the caller can produce
///    its result first and invoke them last.
///
/// On failure, post events are suppressed and the deferred listeners observe
/// the error before it propagates.
pub struct AsyncCompletion<'a> {
    registry: &'a InterceptorRegistry,
}

impl<'a> AsyncCompletion<'a> {
    pub fn new(registry: &'a InterceptorRegistry) -> Self {
        Self { registry }
    }

    pub async fn flush(
        &self,
        unit: &SharedFlushUnit,
        gateway: &DaoGateway,
    ) -> Result<Vec<Arc<dyn CompletionListener>>> {
        let payload = { unit.lock()?.begin_flush()? };
        let span = info_span!(
            "flush",
            regular = payload.regular.len(),
            counter = payload.counter.len()
        );

        let submission = async {
            try_join(
                gateway.submit_group(payload.regular, BatchKind::Regular),
                gateway.submit_group(payload.counter, BatchKind::Counter),
            )
            .await
        }
        .instrument(span);

        match submission.await {
            Ok(_) => {
                unit.lock()?.complete();
                for record in &payload.events {
                    self.registry.notify(record);
                }
                Ok(payload.listeners)
            }
            Err(err) => {
                unit.lock()?.fail();
                event!(Level::ERROR, error = %err, "flush failed; post events suppressed");
                for listener in &payload.listeners {
                    listener.on_complete(Some(&err));
                }
                Err(err)
            }
        }
    }
}
