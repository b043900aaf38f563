//! Streaming aggregation for chat completion chunks.
//!
//! Contract:
//! - Chunks are folded strictly in arrival order; nothing is reordered or deduplicated.
//! - Only the first choice of a chunk is read. A chunk without choices is a no-op.
//! - `finalize` may be called at any point and yields the mapping for what has arrived so far.
//!
//! `StreamAccumulator` is the synchronous reducer; `InstrumentedStream` drives it from a
//! `futures::Stream` and hands the result to a span once the stream ends, fails or is dropped.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use crate::config::TraceConfig;
use crate::mapper::{function_call_attributes, tool_call_function_attributes, usage_attributes};
use crate::model::{ChatCompletionChunk, ChunkDelta, Role, Usage};
use crate::telemetry::keys::*;
use crate::telemetry::{AttributeMap, SpanHandle};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamAccumulator {
    content: String,
    /// Tool/function-call keys relative to the message, merged with append semantics.
    calls: AttributeMap,
    model: Option<String>,
    usage: Option<Usage>,
    chunks: usize,
}

fn delta_call_attributes(delta: &ChunkDelta) -> AttributeMap {
    let mut attrs = AttributeMap::new();
    if let Some(tool_calls) = &delta.tool_calls {
        for (position, call) in tool_calls.iter().enumerate() {
            if call.kind.as_deref().is_some_and(|k| k != "function") {
                continue;
            }
            let Some(function) = &call.function else {
                continue;
            };
            attrs.append_merge(tool_call_function_attributes(
                call.index.unwrap_or(position),
                function.name.as_deref(),
                function.arguments.as_deref(),
            ));
        }
    }
    if let Some(call) = &delta.function_call {
        attrs.append_merge(function_call_attributes(
            call.name.as_deref(),
            call.arguments.as_deref(),
        ));
    }
    attrs
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reducer form: `(accumulator, chunk) -> accumulator`.
    pub fn fold(mut self, chunk: &ChatCompletionChunk) -> Self {
        self.push(chunk);
        self
    }

    pub fn push(&mut self, chunk: &ChatCompletionChunk) {
        self.chunks += 1;
        if self.model.is_none() {
            self.model.clone_from(&chunk.model);
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }
        let Some(choice) = chunk.choices.first() else {
            return;
        };
        let delta = &choice.delta;
        if let Some(content) = &delta.content {
            self.content.push_str(content);
        }
        if delta.tool_calls.is_some() || delta.function_call.is_some() {
            self.calls.append_merge(delta_call_attributes(delta));
        }
    }

    /// Text accumulated so far.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// The output mapping for everything folded so far.
    pub fn finalize(&self) -> AttributeMap {
        let mut message = AttributeMap::new()
            .with(MESSAGE_ROLE, Role::Assistant.as_str())
            .with(MESSAGE_CONTENT, self.content.as_str());
        message.extend(self.calls.clone());

        let mut attrs = AttributeMap::new()
            .with(OUTPUT_VALUE, self.content.as_str())
            .with(OUTPUT_MIME_TYPE, MIME_TYPE_TEXT);
        attrs.extend(message.prefixed(&format!("{LLM_OUTPUT_MESSAGES}.0")));
        attrs
    }

    /// Response metadata seen in the stream: the first model name and the last usage record.
    pub fn response_attributes(&self) -> AttributeMap {
        let mut attrs = usage_attributes(self.usage.as_ref());
        if let Some(model) = &self.model {
            attrs.insert(LLM_MODEL_NAME, model.as_str());
        }
        attrs
    }
}

/// Fold a complete, already-collected chunk sequence.
pub fn aggregate_chunks<'a, I>(chunks: I) -> AttributeMap
where
    I: IntoIterator<Item = &'a ChatCompletionChunk>,
{
    chunks
        .into_iter()
        .fold(StreamAccumulator::new(), StreamAccumulator::fold)
        .finalize()
}

/// Pass-through stream that aggregates chunks and finishes a span when done.
///
/// The span is finished exactly once: at end of stream, on the first error item
/// (recorded on the span, then passed through), or on drop if the consumer stops early.
pub struct InstrumentedStream<S> {
    inner: S,
    accumulator: StreamAccumulator,
    span: Option<Box<dyn SpanHandle>>,
    config: TraceConfig,
}

impl<S> InstrumentedStream<S> {
    pub fn new(inner: S, span: Box<dyn SpanHandle>, config: TraceConfig) -> Self {
        Self {
            inner,
            accumulator: StreamAccumulator::new(),
            span: Some(span),
            config,
        }
    }

    pub fn accumulator(&self) -> &StreamAccumulator {
        &self.accumulator
    }

    fn finish(&mut self) {
        let Some(mut span) = self.span.take() else {
            return;
        };
        let mut attrs = self.accumulator.finalize();
        attrs.extend(self.accumulator.response_attributes());
        tracing::debug!(
            chunks = self.accumulator.chunk_count(),
            attributes = attrs.len(),
            "finishing streamed chat completion span"
        );
        span.set_attributes(self.config.apply(attrs));
        span.end();
    }
}

impl<S, E> Stream for InstrumentedStream<S>
where
    S: Stream<Item = Result<ChatCompletionChunk, E>> + Unpin,
    E: fmt::Display,
{
    type Item = Result<ChatCompletionChunk, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.accumulator.push(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                if let Some(span) = this.span.as_mut() {
                    span.record_error(std::any::type_name::<E>(), &e.to_string());
                }
                this.finish();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S> Drop for InstrumentedStream<S> {
    fn drop(&mut self) {
        self.finish();
    }
}
