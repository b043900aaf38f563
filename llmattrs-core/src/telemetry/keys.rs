/// OpenInference semantic-convention attribute keys.
/// Keep these stable; changing them is a breaking change for dashboards.
pub const OPENINFERENCE_SPAN_KIND: &str = "openinference.span.kind";

pub const INPUT_VALUE: &str = "input.value";
pub const INPUT_MIME_TYPE: &str = "input.mime_type";
pub const OUTPUT_VALUE: &str = "output.value";
pub const OUTPUT_MIME_TYPE: &str = "output.mime_type";

pub const LLM_MODEL_NAME: &str = "llm.model_name";
pub const LLM_INVOCATION_PARAMETERS: &str = "llm.invocation_parameters";
pub const LLM_INPUT_MESSAGES: &str = "llm.input_messages";
pub const LLM_OUTPUT_MESSAGES: &str = "llm.output_messages";
pub const LLM_TOKEN_COUNT_PROMPT: &str = "llm.token_count.prompt";
pub const LLM_TOKEN_COUNT_COMPLETION: &str = "llm.token_count.completion";
pub const LLM_TOKEN_COUNT_TOTAL: &str = "llm.token_count.total";

pub const MESSAGE_ROLE: &str = "message.role";
pub const MESSAGE_CONTENT: &str = "message.content";
pub const MESSAGE_CONTENTS: &str = "message.contents";
pub const MESSAGE_NAME: &str = "message.name";
pub const MESSAGE_TOOL_CALLS: &str = "message.tool_calls";
pub const MESSAGE_FUNCTION_CALL_NAME: &str = "message.function_call_name";
pub const MESSAGE_FUNCTION_CALL_ARGUMENTS_JSON: &str = "message.function_call_arguments_json";

/// Relative to `message.contents.<i>`
pub const MESSAGE_CONTENT_TYPE: &str = "message_content.type";
pub const MESSAGE_CONTENT_TEXT: &str = "message_content.text";
pub const MESSAGE_CONTENT_IMAGE: &str = "message_content.image";

/// Relative to `message.tool_calls.<i>`
pub const TOOL_CALL_FUNCTION_NAME: &str = "tool_call.function.name";
pub const TOOL_CALL_FUNCTION_ARGUMENTS_JSON: &str = "tool_call.function.arguments";

pub const EMBEDDING_MODEL_NAME: &str = "embedding.model_name";
pub const EMBEDDING_EMBEDDINGS: &str = "embedding.embeddings";
/// Relative to `embedding.embeddings.<i>`
pub const EMBEDDING_TEXT: &str = "embedding.text";
pub const EMBEDDING_VECTOR: &str = "embedding.vector";

pub const MIME_TYPE_TEXT: &str = "text/plain";
pub const MIME_TYPE_JSON: &str = "application/json";

/// Error-related (recorded by span handles, not by the mapper)
pub const KEY_ERROR_KIND: &str = "error.kind";
pub const KEY_ERROR_MESSAGE: &str = "error.message";
