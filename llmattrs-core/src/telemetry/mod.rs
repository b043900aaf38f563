//! Span seam between attribute extraction and whatever tracing backend the caller uses.
//! By default, spans go nowhere unless a tracer is installed via `install_tracer`
//! or passed explicitly to an `Instrumentor`.

pub mod keys;
pub mod memory;
pub mod tracing_span;
pub mod types;
#[cfg(test)]
pub mod test_span;

pub use keys::*;
pub use memory::{FinishedSpan, MemoryTracer};
pub use tracing_span::TracingTracer;
pub use types::*;

use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

/// Starts spans. Implementations must be thread-safe (`Send + Sync`) and `'static`.
pub trait Tracer: Send + Sync + 'static {
    fn start_span(&self, name: &str, kind: SpanKind, attributes: AttributeMap)
    -> Box<dyn SpanHandle>;
}

/// A started span.
///
/// These three operations are all the instrumentation layer ever calls.
/// Implementations should avoid panicking; they run next to the caller's LLM request.
pub trait SpanHandle: Send {
    fn set_attributes(&mut self, attributes: AttributeMap);

    /// Mark the span failed. `kind` is a short type name, `message` a human-readable text.
    fn record_error(&mut self, kind: &str, message: &str);

    fn end(self: Box<Self>);
}

/// Tracer that drops every span.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

struct NoopSpan;

impl SpanHandle for NoopSpan {
    fn set_attributes(&mut self, _attributes: AttributeMap) {}
    fn record_error(&mut self, _kind: &str, _message: &str) {}
    fn end(self: Box<Self>) {}
}

impl Tracer for NoopTracer {
    fn start_span(
        &self,
        _name: &str,
        _kind: SpanKind,
        _attributes: AttributeMap,
    ) -> Box<dyn SpanHandle> {
        Box::new(NoopSpan)
    }
}

static GLOBAL_TRACER: Lazy<RwLock<Option<Arc<dyn Tracer>>>> = Lazy::new(|| RwLock::new(None));

/// Install the process-wide tracer. Returns `false` if one is already installed.
///
/// Pair with `uninstall_tracer` on teardown.
pub fn install_tracer(tracer: Arc<dyn Tracer>) -> bool {
    let mut slot = match GLOBAL_TRACER.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if slot.is_some() {
        return false;
    }
    *slot = Some(tracer);
    true
}

/// Remove the process-wide tracer, returning it if one was installed.
pub fn uninstall_tracer() -> Option<Arc<dyn Tracer>> {
    match GLOBAL_TRACER.write() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

/// The installed tracer, or a `NoopTracer` when none is installed.
pub fn global_tracer() -> Arc<dyn Tracer> {
    let slot = match GLOBAL_TRACER.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    slot.clone().unwrap_or_else(|| Arc::new(NoopTracer))
}
