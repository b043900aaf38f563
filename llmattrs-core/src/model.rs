//! Typed OpenAI-compatible payloads consumed by the mapper and the stream aggregator.
//!
//! Only the fields that feed span attributes are modelled; everything else on a
//! request is kept verbatim as invocation parameters. Request and response bodies
//! that end up in `input.value` / `output.value` also keep the JSON they were
//! decoded from, so those attributes record the payload rather than a re-encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Map, Value};

use crate::error::{CoreResult, LlmAttrsError};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
    Function,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LlmAttrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            "function" => Ok(Self::Function),
            other => Err(LlmAttrsError::UnknownRole(other.to_string())),
        }
    }
}

/// Message content: either a plain string or an ordered list of parts.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },
    ImageUrl {
        image_url: ImageUrl,
    },
    /// Any part kind this crate does not know about (audio, files, ...).
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON string as produced by the model; never parsed.
    pub arguments: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCall {
    Function {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        function: FunctionCall,
    },
    #[serde(other)]
    Unsupported,
}

impl ToolCall {
    pub fn function(&self) -> Option<&FunctionCall> {
        match self {
            Self::Function { function, .. } => Some(function),
            Self::Unsupported => None,
        }
    }
}

/// A chat request message, discriminated by its `role`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum RequestMessage {
    System {
        #[serde(default)]
        content: Option<MessageContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    User {
        #[serde(default)]
        content: Option<MessageContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Assistant {
        #[serde(default)]
        content: Option<MessageContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function_call: Option<FunctionCall>,
    },
    Tool {
        #[serde(default)]
        content: Option<MessageContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool_call_id: Option<String>,
    },
    Function {
        #[serde(default)]
        content: Option<MessageContent>,
        name: String,
    },
}

impl RequestMessage {
    pub fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
            Self::Function { .. } => Role::Function,
        }
    }

    pub fn content(&self) -> Option<&MessageContent> {
        match self {
            Self::System { content, .. }
            | Self::User { content, .. }
            | Self::Assistant { content, .. }
            | Self::Tool { content, .. }
            | Self::Function { content, .. } => content.as_ref(),
        }
    }
}

/// Validate every `messages[i].role` of a raw request body against the closed role set.
fn check_roles(value: &Value) -> CoreResult<()> {
    let Some(messages) = value.get("messages").and_then(Value::as_array) else {
        return Ok(());
    };
    for message in messages {
        if let Some(role) = message.get("role").and_then(Value::as_str) {
            role.parse::<Role>()?;
        }
    }
    Ok(())
}

fn malformed(e: serde_json::Error) -> LlmAttrsError {
    LlmAttrsError::Malformed(e.to_string())
}

/// Serde impls for a body type derived with `#[serde(remote = "Self")]` and a
/// `raw: Option<Value>` field: decoding keeps the whole body in `raw`, and
/// encoding writes `raw` back when present.
macro_rules! keep_raw_body {
    ($ty:ty) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = Value::deserialize(deserializer)?;
                let mut decoded =
                    Self::deserialize(raw.clone()).map_err(<D::Error as de::Error>::custom)?;
                decoded.raw = Some(raw);
                Ok(decoded)
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                match &self.raw {
                    Some(raw) => raw.serialize(serializer),
                    None => Self::serialize(self, serializer),
                }
            }
        }
    };
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(remote = "Self")]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<RequestMessage>,
    /// Every other top-level request field (temperature, tools, stream, ...).
    #[serde(flatten)]
    pub params: Map<String, Value>,
    /// The body as received. `None` for requests built in code.
    #[serde(skip)]
    pub raw: Option<Value>,
}

keep_raw_body!(ChatCompletionRequest);

impl ChatCompletionRequest {
    /// Build a request from a raw JSON body.
    ///
    /// Roles are checked before typed decoding so an unknown role surfaces as
    /// `UnknownRole` rather than a generic decode failure.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        check_roles(&value)?;
        serde_json::from_value(value).map_err(malformed)
    }

    /// The request minus its messages, as recorded under `llm.invocation_parameters`.
    pub fn invocation_parameters(&self) -> Map<String, Value> {
        with_model(&self.model, &self.params)
    }
}

fn with_model(model: &str, params: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(params.len() + 1);
    out.insert("model".into(), Value::String(model.to_string()));
    for (k, v) in params {
        out.insert(k.clone(), v.clone());
    }
    out
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResponseMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(remote = "Self")]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(skip)]
    pub raw: Option<Value>,
}

keep_raw_body!(ChatCompletion);

/// Legacy completions prompt. Token-id prompts are accepted but never recorded.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Texts(Vec<String>),
    Tokens(Vec<i64>),
    TokenBatches(Vec<Vec<i64>>),
}

impl Prompt {
    /// The first prompt string, if any. Multi-prompt requests only ever report this one.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Texts(v) => v.first().map(String::as_str),
            Self::Tokens(_) | Self::TokenBatches(_) => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    #[serde(default)]
    pub prompt: Option<Prompt>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl CompletionRequest {
    pub fn invocation_parameters(&self) -> Map<String, Value> {
        with_model(&self.model, &self.params)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletionChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Completion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Text(String),
    Texts(Vec<String>),
    Tokens(Vec<i64>),
    TokenBatches(Vec<Vec<i64>>),
}

impl EmbeddingInput {
    /// Input strings in request order. Token inputs yield nothing.
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::Text(s) => vec![s.as_str()],
            Self::Texts(v) => v.iter().map(String::as_str).collect(),
            Self::Tokens(_) | Self::TokenBatches(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(remote = "Self")]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: EmbeddingInput,
    #[serde(flatten)]
    pub params: Map<String, Value>,
    #[serde(skip)]
    pub raw: Option<Value>,
}

keep_raw_body!(EmbeddingRequest);

impl EmbeddingRequest {
    pub fn invocation_parameters(&self) -> Map<String, Value> {
        with_model(&self.model, &self.params)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    #[serde(default)]
    pub index: u32,
    pub embedding: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmbeddingUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EmbeddingResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub data: Vec<Embedding>,
    #[serde(default)]
    pub usage: Option<EmbeddingUsage>,
}

// ---- Streaming ----

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct FunctionCallDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ToolCallDelta {
    /// Position of the tool call this fragment belongs to.
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    /// Only present on the first fragment of a call.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionCallDelta>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ChunkDelta {
    /// Kept as sent; streamed output is always attributed to the assistant.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
    #[serde(default)]
    pub function_call: Option<FunctionCallDelta>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub delta: ChunkDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Only sent on the final chunk when the caller asked for usage.
    #[serde(default)]
    pub usage: Option<Usage>,
}
