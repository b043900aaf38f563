//! Explicit instrumentation wrappers around a caller's own LLM calls.
//!
//! Each wrapper starts a span with the request attributes, awaits the call,
//! attaches response attributes (or the error) and ends the span. The call's
//! result is handed back untouched.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::config::TraceConfig;
use crate::mapper::{
    chat_completion_response_attributes, chat_request_attributes, completion_request_attributes,
    completion_response_attributes, embedding_request_attributes, embedding_response_attributes,
};
use crate::model::{
    ChatCompletion, ChatCompletionRequest, Completion, CompletionRequest, EmbeddingRequest,
    EmbeddingResponse,
};
use crate::stream::InstrumentedStream;
use crate::telemetry::{AttributeMap, SpanKind, Tracer, global_tracer};

pub const CHAT_SPAN_NAME: &str = "OpenAI Chat Completions";
pub const COMPLETION_SPAN_NAME: &str = "OpenAI Completions";
pub const EMBEDDING_SPAN_NAME: &str = "OpenAI Embeddings";

#[derive(Clone)]
pub struct Instrumentor {
    tracer: Arc<dyn Tracer>,
    config: TraceConfig,
}

impl fmt::Debug for Instrumentor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumentor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Instrumentor {
    pub fn new(tracer: Arc<dyn Tracer>, config: TraceConfig) -> Self {
        Self { tracer, config }
    }

    /// Uses whatever tracer is installed globally at the time of the call.
    pub fn global(config: TraceConfig) -> Self {
        Self::new(global_tracer(), config)
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub async fn chat<F, E>(&self, request: &ChatCompletionRequest, call: F) -> Result<ChatCompletion, E>
    where
        F: Future<Output = Result<ChatCompletion, E>>,
        E: fmt::Display,
    {
        self.run(
            CHAT_SPAN_NAME,
            SpanKind::Llm,
            chat_request_attributes(request),
            call,
            chat_completion_response_attributes,
        )
        .await
    }

    pub async fn completion<F, E>(&self, request: &CompletionRequest, call: F) -> Result<Completion, E>
    where
        F: Future<Output = Result<Completion, E>>,
        E: fmt::Display,
    {
        self.run(
            COMPLETION_SPAN_NAME,
            SpanKind::Llm,
            completion_request_attributes(request),
            call,
            completion_response_attributes,
        )
        .await
    }

    pub async fn embeddings<F, E>(
        &self,
        request: &EmbeddingRequest,
        call: F,
    ) -> Result<EmbeddingResponse, E>
    where
        F: Future<Output = Result<EmbeddingResponse, E>>,
        E: fmt::Display,
    {
        self.run(
            EMBEDDING_SPAN_NAME,
            SpanKind::Embedding,
            embedding_request_attributes(request),
            call,
            embedding_response_attributes,
        )
        .await
    }

    /// Starts the span now; it ends when the returned stream finishes, fails or is dropped.
    pub fn chat_stream<S>(&self, request: &ChatCompletionRequest, stream: S) -> InstrumentedStream<S> {
        let span = self.tracer.start_span(
            CHAT_SPAN_NAME,
            SpanKind::Llm,
            self.config.apply(chat_request_attributes(request)),
        );
        InstrumentedStream::new(stream, span, self.config)
    }

    async fn run<T, F, E>(
        &self,
        name: &str,
        kind: SpanKind,
        request_attributes: AttributeMap,
        call: F,
        response_attributes: fn(&T) -> AttributeMap,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut span = self
            .tracer
            .start_span(name, kind, self.config.apply(request_attributes));
        let result = call.await;
        match &result {
            Ok(response) => {
                span.set_attributes(self.config.apply(response_attributes(response)));
            }
            Err(e) => {
                let message = e.to_string();
                tracing::debug!(span = name, error = %message, "instrumented call failed");
                span.record_error(std::any::type_name::<E>(), &message);
            }
        }
        span.end();
        result
    }
}
