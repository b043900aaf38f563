use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::error::{CoreResult, LlmAttrsError};
use crate::telemetry::keys::*;
use crate::telemetry::{AttributeMap, AttributeValue};

/// Replacement text for hidden string attributes.
pub const REDACTED_VALUE: &str = "__REDACTED__";

/// Which attributes to withhold from spans. Everything is recorded by default.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraceConfig {
    /// Redact `input.value` and drop input messages and embedding texts.
    #[serde(default)]
    pub hide_inputs: bool,
    /// Redact `output.value` and drop output messages.
    #[serde(default)]
    pub hide_outputs: bool,
    #[serde(default)]
    pub hide_input_messages: bool,
    #[serde(default)]
    pub hide_output_messages: bool,
    /// Drop image URLs of user content parts.
    #[serde(default)]
    pub hide_input_images: bool,
    /// Redact the text of input messages (role and tool calls stay).
    #[serde(default)]
    pub hide_input_text: bool,
    #[serde(default)]
    pub hide_output_text: bool,
    #[serde(default)]
    pub hide_embedding_vectors: bool,
}

const ENV_FLAGS: [&str; 8] = [
    "OPENINFERENCE_HIDE_INPUTS",
    "OPENINFERENCE_HIDE_OUTPUTS",
    "OPENINFERENCE_HIDE_INPUT_MESSAGES",
    "OPENINFERENCE_HIDE_OUTPUT_MESSAGES",
    "OPENINFERENCE_HIDE_INPUT_IMAGES",
    "OPENINFERENCE_HIDE_INPUT_TEXT",
    "OPENINFERENCE_HIDE_OUTPUT_TEXT",
    "OPENINFERENCE_HIDE_EMBEDDING_VECTORS",
];

fn parse_flag(var: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        other => {
            tracing::warn!(var, value = other, "ignoring non-boolean trace config override");
            None
        }
    }
}

enum Masked {
    Keep,
    Redact,
    Drop,
}

fn invalid_config<E>(e: E) -> LlmAttrsError
where
    E: std::error::Error + Send + Sync + 'static,
{
    LlmAttrsError::Other(e.into())
}

fn is_text_key(key: &str) -> bool {
    key.ends_with(MESSAGE_CONTENT) || key.ends_with(MESSAGE_CONTENT_TEXT)
}

impl TraceConfig {
    /// Read masking flags from a `.json` or `.toml` file. Any other extension is
    /// tried as JSON, then as TOML.
    ///
    /// A missing or unreadable file is `Io`; bad UTF-8 or unparseable content is `Other`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let text = std::str::from_utf8(&bytes).map_err(invalid_config)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(text).map_err(invalid_config),
            Some("toml") => toml::from_str(text).map_err(invalid_config),
            _ => serde_json::from_str(text).or_else(|_| toml::from_str(text).map_err(invalid_config)),
        }
    }

    /// Defaults overlaid with `OPENINFERENCE_HIDE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Overlay boolean overrides looked up by `OPENINFERENCE_HIDE_*` name.
    /// Unparseable values are logged and ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for var in ENV_FLAGS {
            let Some(value) = lookup(var).and_then(|raw| parse_flag(var, &raw)) else {
                continue;
            };
            let field = match var {
                "OPENINFERENCE_HIDE_INPUTS" => &mut self.hide_inputs,
                "OPENINFERENCE_HIDE_OUTPUTS" => &mut self.hide_outputs,
                "OPENINFERENCE_HIDE_INPUT_MESSAGES" => &mut self.hide_input_messages,
                "OPENINFERENCE_HIDE_OUTPUT_MESSAGES" => &mut self.hide_output_messages,
                "OPENINFERENCE_HIDE_INPUT_IMAGES" => &mut self.hide_input_images,
                "OPENINFERENCE_HIDE_INPUT_TEXT" => &mut self.hide_input_text,
                "OPENINFERENCE_HIDE_OUTPUT_TEXT" => &mut self.hide_output_text,
                _ => &mut self.hide_embedding_vectors,
            };
            *field = value;
        }
        self
    }

    fn decide(&self, key: &str) -> Masked {
        if key == INPUT_VALUE {
            return if self.hide_inputs { Masked::Redact } else { Masked::Keep };
        }
        if key == INPUT_MIME_TYPE {
            return if self.hide_inputs { Masked::Drop } else { Masked::Keep };
        }
        if key == OUTPUT_VALUE {
            return if self.hide_outputs { Masked::Redact } else { Masked::Keep };
        }
        if key == OUTPUT_MIME_TYPE {
            return if self.hide_outputs { Masked::Drop } else { Masked::Keep };
        }
        if key.starts_with(LLM_INPUT_MESSAGES) {
            if self.hide_inputs || self.hide_input_messages {
                return Masked::Drop;
            }
            if self.hide_input_images && key.ends_with(MESSAGE_CONTENT_IMAGE) {
                return Masked::Drop;
            }
            if self.hide_input_text && is_text_key(key) {
                return Masked::Redact;
            }
            return Masked::Keep;
        }
        if key.starts_with(LLM_OUTPUT_MESSAGES) {
            if self.hide_outputs || self.hide_output_messages {
                return Masked::Drop;
            }
            if self.hide_output_text && is_text_key(key) {
                return Masked::Redact;
            }
            return Masked::Keep;
        }
        if key.starts_with(EMBEDDING_EMBEDDINGS) {
            if self.hide_embedding_vectors && key.ends_with(EMBEDDING_VECTOR) {
                return Masked::Drop;
            }
            if self.hide_inputs && key.ends_with(EMBEDDING_TEXT) {
                return Masked::Drop;
            }
        }
        Masked::Keep
    }

    /// Apply the masking rules to a finished attribute map.
    pub fn apply(&self, attributes: AttributeMap) -> AttributeMap {
        if *self == Self::default() {
            return attributes;
        }
        attributes
            .into_iter()
            .filter_map(|(key, value)| match self.decide(&key) {
                Masked::Keep => Some((key, value)),
                Masked::Redact => Some((key, AttributeValue::from(REDACTED_VALUE))),
                Masked::Drop => None,
            })
            .collect()
    }
}
