use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::{AttributeMap, SpanHandle, SpanKind, Tracer};

/// A span as it looked when `end` was called.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinishedSpan {
    pub name: String,
    pub kind: SpanKind,
    pub attributes: AttributeMap,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl FinishedSpan {
    pub fn is_error(&self) -> bool {
        self.error_kind.is_some()
    }
}

/// Tracer that keeps finished spans in memory. Used by the CLI and by tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryTracer {
    finished: Arc<Mutex<Vec<FinishedSpan>>>,
}

impl MemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every span ended so far, in end order.
    pub fn finished(&self) -> Vec<FinishedSpan> {
        match self.finished.lock() {
            Ok(spans) => spans.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut spans) = self.finished.lock() {
            spans.clear();
        }
    }
}

struct MemorySpan {
    sink: Arc<Mutex<Vec<FinishedSpan>>>,
    span: FinishedSpan,
}

impl SpanHandle for MemorySpan {
    fn set_attributes(&mut self, attributes: AttributeMap) {
        self.span.attributes.extend(attributes);
    }

    fn record_error(&mut self, kind: &str, message: &str) {
        self.span.error_kind = Some(kind.to_string());
        self.span.error_message = Some(message.to_string());
    }

    fn end(self: Box<Self>) {
        let MemorySpan { sink, span } = *self;
        match sink.lock() {
            Ok(mut spans) => spans.push(span),
            Err(poisoned) => poisoned.into_inner().push(span),
        }
    }
}

impl Tracer for MemoryTracer {
    fn start_span(
        &self,
        name: &str,
        kind: SpanKind,
        attributes: AttributeMap,
    ) -> Box<dyn SpanHandle> {
        Box::new(MemorySpan {
            sink: self.finished.clone(),
            span: FinishedSpan {
                name: name.to_string(),
                kind,
                attributes,
                error_kind: None,
                error_message: None,
            },
        })
    }
}
