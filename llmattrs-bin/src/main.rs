use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use llmattrs_core::{
    config::TraceConfig,
    error::LlmAttrsError,
    instrument::Instrumentor,
    model::{ChatCompletionChunk, ChatCompletionRequest},
    telemetry::{MemoryTracer, TracingTracer, global_tracer, install_tracer, uninstall_tracer},
};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Replay recorded LLM payloads and print span attributes", long_about = None)]
struct Cli {
    /// Masking config (JSON or TOML). OPENINFERENCE_HIDE_* variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also emit each span through `tracing` (visible with RUST_LOG=llmattrs=info).
    #[arg(long, global = true)]
    emit_tracing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a chat completion request/response pair
    Chat {
        #[arg(long)]
        request: PathBuf,
        #[arg(long, conflicts_with = "error")]
        response: Option<PathBuf>,
        /// Simulate a failed call with this message
        #[arg(long)]
        error: Option<String>,
    },
    /// Replay a streamed chat completion from JSON lines or SSE `data:` lines
    Stream {
        #[arg(long)]
        request: PathBuf,
        #[arg(long)]
        chunks: PathBuf,
    },
    /// Replay a legacy completion request/response pair
    Completion {
        #[arg(long)]
        request: PathBuf,
        #[arg(long)]
        response: PathBuf,
    },
    /// Replay an embeddings request/response pair
    Embed {
        #[arg(long)]
        request: PathBuf,
        #[arg(long)]
        response: PathBuf,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn read_chat_request(path: &Path) -> anyhow::Result<ChatCompletionRequest> {
    let value: serde_json::Value = read_json(path)?;
    ChatCompletionRequest::from_value(value).map_err(|e| {
        if e.is_contract_violation() {
            tracing::error!(path = %path.display(), error = %e, "request violates the message role contract");
        }
        anyhow::Error::from(e)
    })
}

/// One chunk per non-empty line. Accepts raw JSON or SSE `data:` framing; `[DONE]` is skipped.
fn parse_chunk_lines(raw: &str) -> Vec<Result<ChatCompletionChunk, LlmAttrsError>> {
    raw.lines()
        .map(str::trim)
        .map(|line| line.strip_prefix("data:").map(str::trim_start).unwrap_or(line))
        .filter(|line| !line.is_empty() && *line != "[DONE]")
        .map(|line| {
            serde_json::from_str(line).map_err(|e| LlmAttrsError::Malformed(e.to_string()))
        })
        .collect()
}

fn load_trace_config(path: Option<&Path>) -> anyhow::Result<TraceConfig> {
    let base = match path {
        Some(p) => TraceConfig::from_path(p)
            .with_context(|| format!("loading trace config {}", p.display()))?,
        None => TraceConfig::default(),
    };
    Ok(base.with_overrides(|var| std::env::var(var).ok()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_trace_config(cli.config.as_deref())?;
    tracing::debug!(?config, "trace config loaded");

    if cli.emit_tracing {
        install_tracer(Arc::new(TracingTracer));
    }
    let tracer = MemoryTracer::new();
    let inst = Instrumentor::new(Arc::new(tracer.clone()), config);

    match cli.command {
        Commands::Chat {
            request,
            response,
            error,
        } => {
            let req = read_chat_request(&request)?;
            let outcome = match (response, error) {
                (Some(path), _) => read_json(&path),
                (None, Some(msg)) => Err(anyhow!(msg)),
                (None, None) => Err(anyhow!("either --response or --error is required")),
            };
            if let Err(e) = inst.chat(&req, async { outcome }).await {
                tracing::warn!(error = %e, "replayed chat call failed");
            }
        }
        Commands::Stream { request, chunks } => {
            let req = read_chat_request(&request)?;
            let raw = std::fs::read_to_string(&chunks)
                .with_context(|| format!("reading {}", chunks.display()))?;
            let source = futures_util::stream::iter(parse_chunk_lines(&raw));
            let mut stream = inst.chat_stream(&req, source);
            while let Some(item) = stream.next().await {
                if let Err(e) = item {
                    tracing::warn!(error = %e, "stream ended with an error");
                    break;
                }
            }
        }
        Commands::Completion { request, response } => {
            let req = read_json(&request)?;
            let resp = read_json(&response);
            if let Err(e) = inst.completion(&req, async { resp }).await {
                tracing::warn!(error = %e, "replayed completion call failed");
            }
        }
        Commands::Embed { request, response } => {
            let req = read_json(&request)?;
            let resp = read_json(&response);
            if let Err(e) = inst.embeddings(&req, async { resp }).await {
                tracing::warn!(error = %e, "replayed embeddings call failed");
            }
        }
    }

    let finished = tracer.finished();
    if cli.emit_tracing {
        let global = global_tracer();
        for span in &finished {
            let mut handle = global.start_span(&span.name, span.kind, span.attributes.clone());
            if let (Some(kind), Some(message)) = (&span.error_kind, &span.error_message) {
                handle.record_error(kind, message);
            }
            handle.end();
        }
        uninstall_tracer();
    }
    println!("{}", serde_json::to_string_pretty(&finished)?);
    Ok(())
}
