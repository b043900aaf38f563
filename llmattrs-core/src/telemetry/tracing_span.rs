use tracing::field::Empty;

use super::{AttributeMap, SpanHandle, SpanKind, Tracer};

/// Tracer backed by `tracing` spans.
///
/// Span names are static in `tracing`, so the logical name goes into `otel.name`
/// (the field `tracing-opentelemetry` exports as the span name). The attribute
/// map is recorded once, as JSON, into `llm.attributes` when the span ends.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTracer;

struct TracingSpan {
    span: tracing::Span,
    attributes: AttributeMap,
    failed: bool,
}

impl SpanHandle for TracingSpan {
    fn set_attributes(&mut self, attributes: AttributeMap) {
        self.attributes.extend(attributes);
    }

    fn record_error(&mut self, kind: &str, message: &str) {
        self.failed = true;
        self.span.record(super::KEY_ERROR_KIND, kind);
        self.span.record(super::KEY_ERROR_MESSAGE, message);
    }

    fn end(self: Box<Self>) {
        let TracingSpan {
            span,
            attributes,
            failed,
        } = *self;
        match serde_json::to_string(&attributes) {
            Ok(json) => {
                span.record("llm.attributes", json.as_str());
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode span attributes"),
        }
        span.record("otel.status_code", if failed { "ERROR" } else { "OK" });
        drop(span);
    }
}

impl Tracer for TracingTracer {
    fn start_span(
        &self,
        name: &str,
        kind: SpanKind,
        attributes: AttributeMap,
    ) -> Box<dyn SpanHandle> {
        let span = tracing::info_span!(
            target: "llmattrs",
            "llm.call",
            otel.name = name,
            openinference.span.kind = kind.as_str(),
            llm.attributes = Empty,
            otel.status_code = Empty,
            error.kind = Empty,
            error.message = Empty,
        );
        Box::new(TracingSpan {
            span,
            attributes,
            failed: false,
        })
    }
}
