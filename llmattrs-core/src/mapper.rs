//! Pure payload → attribute-map translation.
//!
//! Every function here is total for well-typed input: unknown part or tool-call
//! kinds and missing optional data contribute no attributes instead of failing.
//! Only the first choice of any response is ever read.

use serde::Serialize;

use crate::model::{
    ChatCompletion, ChatCompletionRequest, Completion, CompletionRequest, ContentPart,
    EmbeddingInput, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage, MessageContent, Prompt,
    RequestMessage, ResponseMessage, Role, ToolCall, Usage,
};
use crate::telemetry::keys::*;
use crate::telemetry::{AttributeMap, AttributeValue, SpanKind};

/// Serialise for an `*.value` / invocation-parameters attribute; failures drop the attribute.
fn json_string<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(error = %e, "skipping attribute that failed to encode as JSON");
            None
        }
    }
}

fn content_part_attributes(part: &ContentPart) -> AttributeMap {
    match part {
        ContentPart::Text { text } => AttributeMap::new()
            .with(MESSAGE_CONTENT_TYPE, "text")
            .with(MESSAGE_CONTENT_TEXT, text.as_str()),
        ContentPart::ImageUrl { image_url } => AttributeMap::new()
            .with(MESSAGE_CONTENT_TYPE, "image_url")
            .with(MESSAGE_CONTENT_IMAGE, image_url.url.as_str()),
        ContentPart::Unsupported => AttributeMap::new(),
    }
}

/// Name/arguments of the tool call at `index`, relative to a message.
///
/// Shared with the stream aggregator, where both halves may be partial fragments.
pub(crate) fn tool_call_function_attributes(
    index: usize,
    name: Option<&str>,
    arguments: Option<&str>,
) -> AttributeMap {
    let prefix = format!("{MESSAGE_TOOL_CALLS}.{index}");
    let mut attrs = AttributeMap::new();
    if let Some(name) = name {
        attrs.insert(format!("{prefix}.{TOOL_CALL_FUNCTION_NAME}"), name);
    }
    if let Some(arguments) = arguments {
        attrs.insert(format!("{prefix}.{TOOL_CALL_FUNCTION_ARGUMENTS_JSON}"), arguments);
    }
    attrs
}

/// Legacy `function_call` name/arguments, relative to a message.
pub(crate) fn function_call_attributes(name: Option<&str>, arguments: Option<&str>) -> AttributeMap {
    let mut attrs = AttributeMap::new();
    if let Some(name) = name {
        attrs.insert(MESSAGE_FUNCTION_CALL_NAME, name);
    }
    if let Some(arguments) = arguments {
        attrs.insert(MESSAGE_FUNCTION_CALL_ARGUMENTS_JSON, arguments);
    }
    attrs
}

/// Indices follow the original positions; non-function calls leave a gap.
fn tool_calls_attributes(tool_calls: &[ToolCall]) -> AttributeMap {
    let mut attrs = AttributeMap::new();
    for (i, call) in tool_calls.iter().enumerate() {
        if let Some(function) = call.function() {
            attrs.extend(tool_call_function_attributes(
                i,
                Some(function.name.as_str()),
                Some(function.arguments.as_str()),
            ));
        }
    }
    attrs
}

/// Attributes of one request message, keyed relative to the message (`message.*`).
pub fn request_message_attributes(message: &RequestMessage) -> AttributeMap {
    let role = message.role();
    let mut attrs = AttributeMap::new().with(MESSAGE_ROLE, role.as_str());

    match message.content() {
        Some(MessageContent::Text(text)) => attrs.insert(MESSAGE_CONTENT, text.as_str()),
        Some(MessageContent::Parts(parts)) if role == Role::User => {
            for (i, part) in parts.iter().enumerate() {
                attrs.extend(content_part_attributes(part).prefixed(&format!("{MESSAGE_CONTENTS}.{i}")));
            }
        }
        Some(MessageContent::Parts(_)) | None => {}
    }

    match message {
        RequestMessage::Assistant {
            tool_calls,
            function_call,
            ..
        } => {
            if let Some(calls) = tool_calls {
                attrs.extend(tool_calls_attributes(calls));
            }
            if let Some(call) = function_call {
                attrs.extend(function_call_attributes(
                    Some(call.name.as_str()),
                    Some(call.arguments.as_str()),
                ));
            }
        }
        RequestMessage::Function { name, .. } => attrs.insert(MESSAGE_NAME, name.as_str()),
        // tool_call_id has no convention key.
        RequestMessage::System { .. } | RequestMessage::User { .. } | RequestMessage::Tool { .. } => {}
    }
    attrs
}

/// `llm.input_messages.<i>.*` for every message, in order.
pub fn input_messages_attributes(messages: &[RequestMessage]) -> AttributeMap {
    let mut attrs = AttributeMap::new();
    for (i, message) in messages.iter().enumerate() {
        attrs.extend(request_message_attributes(message).prefixed(&format!("{LLM_INPUT_MESSAGES}.{i}")));
    }
    attrs
}

/// Attributes of one response message, keyed relative to the message (`message.*`).
pub fn response_message_attributes(message: &ResponseMessage) -> AttributeMap {
    let mut attrs = AttributeMap::new().with(MESSAGE_ROLE, message.role.as_str());
    if let Some(content) = &message.content {
        attrs.insert(MESSAGE_CONTENT, content.as_str());
    }
    if let Some(calls) = &message.tool_calls {
        attrs.extend(tool_calls_attributes(calls));
    }
    if let Some(call) = &message.function_call {
        attrs.extend(function_call_attributes(
            Some(call.name.as_str()),
            Some(call.arguments.as_str()),
        ));
    }
    attrs
}

/// `llm.output_messages.0.*` from the first choice; empty when there is no choice or message.
pub fn chat_completion_output_attributes(completion: &ChatCompletion) -> AttributeMap {
    let Some(message) = completion.choices.first().and_then(|c| c.message.as_ref()) else {
        return AttributeMap::new();
    };
    response_message_attributes(message).prefixed(&format!("{LLM_OUTPUT_MESSAGES}.0"))
}

/// Token counts verbatim; absent usage yields an empty map, never zeroes.
pub fn usage_attributes(usage: Option<&Usage>) -> AttributeMap {
    let Some(usage) = usage else {
        return AttributeMap::new();
    };
    AttributeMap::new()
        .with(LLM_TOKEN_COUNT_PROMPT, usage.prompt_tokens)
        .with(LLM_TOKEN_COUNT_COMPLETION, usage.completion_tokens)
        .with(LLM_TOKEN_COUNT_TOTAL, usage.total_tokens)
}

/// Embedding responses report no completion tokens.
pub fn embedding_usage_attributes(usage: Option<&EmbeddingUsage>) -> AttributeMap {
    let Some(usage) = usage else {
        return AttributeMap::new();
    };
    AttributeMap::new()
        .with(LLM_TOKEN_COUNT_PROMPT, usage.prompt_tokens)
        .with(LLM_TOKEN_COUNT_TOTAL, usage.total_tokens)
}

/// First prompt string as plain-text input. Later prompts are ignored.
pub fn completion_prompt_attributes(prompt: Option<&Prompt>) -> AttributeMap {
    let Some(first) = prompt.and_then(Prompt::first_text) else {
        return AttributeMap::new();
    };
    AttributeMap::new()
        .with(INPUT_VALUE, first)
        .with(INPUT_MIME_TYPE, MIME_TYPE_TEXT)
}

/// First choice text as plain-text output.
pub fn completion_output_attributes(completion: &Completion) -> AttributeMap {
    let Some(choice) = completion.choices.first() else {
        return AttributeMap::new();
    };
    AttributeMap::new()
        .with(OUTPUT_VALUE, choice.text.as_str())
        .with(OUTPUT_MIME_TYPE, MIME_TYPE_TEXT)
}

/// `embedding.embeddings.<i>.embedding.text` per input string.
pub fn embedding_input_attributes(input: &EmbeddingInput) -> AttributeMap {
    input
        .texts()
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            (
                format!("{EMBEDDING_EMBEDDINGS}.{i}.{EMBEDDING_TEXT}"),
                AttributeValue::from(text),
            )
        })
        .collect()
}

/// `embedding.embeddings.<i>.embedding.vector` per returned embedding.
///
/// Position is the join key with the inputs; the response `index` field is not consulted.
pub fn embedding_output_attributes(response: &EmbeddingResponse) -> AttributeMap {
    response
        .data
        .iter()
        .enumerate()
        .map(|(i, e)| {
            (
                format!("{EMBEDDING_EMBEDDINGS}.{i}.{EMBEDDING_VECTOR}"),
                AttributeValue::from(e.embedding.clone()),
            )
        })
        .collect()
}

// ---- Span-level attribute sets ----

fn invocation_parameters_attribute(
    attrs: &mut AttributeMap,
    params: &serde_json::Map<String, serde_json::Value>,
) {
    if let Some(json) = json_string(params) {
        attrs.insert(LLM_INVOCATION_PARAMETERS, json);
    }
}

/// Attributes known before a chat completion call is made.
pub fn chat_request_attributes(request: &ChatCompletionRequest) -> AttributeMap {
    let mut attrs = AttributeMap::new()
        .with(OPENINFERENCE_SPAN_KIND, SpanKind::Llm.as_str())
        .with(LLM_MODEL_NAME, request.model.as_str());
    invocation_parameters_attribute(&mut attrs, &request.invocation_parameters());
    if let Some(json) = json_string(request) {
        attrs.insert(INPUT_VALUE, json);
        attrs.insert(INPUT_MIME_TYPE, MIME_TYPE_JSON);
    }
    attrs.extend(input_messages_attributes(&request.messages));
    attrs
}

/// Attributes known before a legacy completion call is made.
pub fn completion_request_attributes(request: &CompletionRequest) -> AttributeMap {
    let mut attrs = AttributeMap::new()
        .with(OPENINFERENCE_SPAN_KIND, SpanKind::Llm.as_str())
        .with(LLM_MODEL_NAME, request.model.as_str());
    invocation_parameters_attribute(&mut attrs, &request.invocation_parameters());
    attrs.extend(completion_prompt_attributes(request.prompt.as_ref()));
    attrs
}

/// Attributes known before an embeddings call is made.
pub fn embedding_request_attributes(request: &EmbeddingRequest) -> AttributeMap {
    let mut attrs = AttributeMap::new()
        .with(OPENINFERENCE_SPAN_KIND, SpanKind::Embedding.as_str())
        .with(EMBEDDING_MODEL_NAME, request.model.as_str());
    invocation_parameters_attribute(&mut attrs, &request.invocation_parameters());
    match &request.input {
        EmbeddingInput::Text(text) => {
            attrs.insert(INPUT_VALUE, text.as_str());
            attrs.insert(INPUT_MIME_TYPE, MIME_TYPE_TEXT);
        }
        other => {
            let sent = request.raw.as_ref().and_then(|raw| raw.get("input"));
            let encoded = match sent {
                Some(input) => json_string(input),
                None => json_string(other),
            };
            if let Some(json) = encoded {
                attrs.insert(INPUT_VALUE, json);
                attrs.insert(INPUT_MIME_TYPE, MIME_TYPE_JSON);
            }
        }
    }
    attrs.extend(embedding_input_attributes(&request.input));
    attrs
}

/// Attributes added once a chat completion has returned.
pub fn chat_completion_response_attributes(completion: &ChatCompletion) -> AttributeMap {
    let mut attrs = AttributeMap::new();
    if let Some(json) = json_string(completion) {
        attrs.insert(OUTPUT_VALUE, json);
        attrs.insert(OUTPUT_MIME_TYPE, MIME_TYPE_JSON);
    }
    if let Some(model) = &completion.model {
        attrs.insert(LLM_MODEL_NAME, model.as_str());
    }
    attrs.extend(chat_completion_output_attributes(completion));
    attrs.extend(usage_attributes(completion.usage.as_ref()));
    attrs
}

/// Attributes added once a legacy completion has returned.
pub fn completion_response_attributes(completion: &Completion) -> AttributeMap {
    let mut attrs = completion_output_attributes(completion);
    if let Some(model) = &completion.model {
        attrs.insert(LLM_MODEL_NAME, model.as_str());
    }
    attrs.extend(usage_attributes(completion.usage.as_ref()));
    attrs
}

/// Attributes added once an embeddings call has returned.
pub fn embedding_response_attributes(response: &EmbeddingResponse) -> AttributeMap {
    let mut attrs = embedding_output_attributes(response);
    if let Some(model) = &response.model {
        attrs.insert(EMBEDDING_MODEL_NAME, model.as_str());
    }
    attrs.extend(embedding_usage_attributes(response.usage.as_ref()));
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChatChoice, CompletionChoice, Embedding, FunctionCall, ImageUrl};
    use serde_json::json;
    use std::collections::BTreeSet;

    fn user_text(text: &str) -> RequestMessage {
        RequestMessage::User {
            content: Some(MessageContent::Text(text.into())),
            name: None,
        }
    }

    fn function_tool_call(name: &str, arguments: &str) -> ToolCall {
        ToolCall::Function {
            id: Some(format!("call_{name}")),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    fn message_indices(attrs: &AttributeMap, family: &str) -> BTreeSet<usize> {
        attrs
            .keys()
            .filter_map(|k| k.strip_prefix(family))
            .filter_map(|rest| rest.strip_prefix('.'))
            .filter_map(|rest| rest.split('.').next())
            .filter_map(|i| i.parse().ok())
            .collect()
    }

    #[test]
    fn input_message_indices_are_gap_free() {
        let messages = vec![
            RequestMessage::System {
                content: Some(MessageContent::Text("be brief".into())),
                name: None,
            },
            user_text("hi"),
            RequestMessage::Tool {
                content: Some(MessageContent::Text("42".into())),
                tool_call_id: Some("call_1".into()),
            },
            user_text("thanks"),
        ];
        let attrs = input_messages_attributes(&messages);
        let indices = message_indices(&attrs, LLM_INPUT_MESSAGES);
        assert_eq!(indices, (0..messages.len()).collect());
        assert_eq!(attrs.get_str("llm.input_messages.0.message.role"), Some("system"));
        assert_eq!(attrs.get_str("llm.input_messages.3.message.content"), Some("thanks"));
        assert_eq!(attrs.get_str("llm.input_messages.2.message.role"), Some("tool"));
        // tool_call_id is not captured
        assert!(!attrs.keys().any(|k| k.contains("tool_call_id")));
    }

    #[test]
    fn empty_message_list_yields_empty_map() {
        assert!(input_messages_attributes(&[]).is_empty());
    }

    #[test]
    fn user_content_parts_keep_order() {
        let message = RequestMessage::User {
            content: Some(MessageContent::Parts(vec![
                ContentPart::Text {
                    text: "what is in".into(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "https://example.com/cat.png".into(),
                        detail: None,
                    },
                },
                ContentPart::Text {
                    text: "this picture?".into(),
                },
            ])),
            name: None,
        };
        let attrs = request_message_attributes(&message);
        assert_eq!(message_indices(&attrs, MESSAGE_CONTENTS), (0..3).collect());
        assert_eq!(attrs.get_str("message.contents.0.message_content.type"), Some("text"));
        assert_eq!(attrs.get_str("message.contents.0.message_content.text"), Some("what is in"));
        assert_eq!(attrs.get_str("message.contents.1.message_content.type"), Some("image_url"));
        assert_eq!(
            attrs.get_str("message.contents.1.message_content.image"),
            Some("https://example.com/cat.png")
        );
        assert_eq!(attrs.get_str("message.contents.2.message_content.text"), Some("this picture?"));
        assert!(!attrs.contains_key(MESSAGE_CONTENT));
    }

    #[test]
    fn unsupported_content_part_contributes_nothing() {
        let message = RequestMessage::User {
            content: Some(MessageContent::Parts(vec![
                ContentPart::Unsupported,
                ContentPart::Text { text: "hi".into() },
            ])),
            name: None,
        };
        let attrs = request_message_attributes(&message);
        assert!(!attrs.keys().any(|k| k.starts_with("message.contents.0.")));
        assert_eq!(attrs.get_str("message.contents.1.message_content.text"), Some("hi"));
    }

    #[test]
    fn parts_are_only_expanded_for_user_messages() {
        let message = RequestMessage::System {
            content: Some(MessageContent::Parts(vec![ContentPart::Text {
                text: "rules".into(),
            }])),
            name: None,
        };
        let attrs = request_message_attributes(&message);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get_str(MESSAGE_ROLE), Some("system"));
    }

    #[test]
    fn assistant_tool_calls_keep_original_index() {
        let message = RequestMessage::Assistant {
            content: None,
            name: None,
            tool_calls: Some(vec![
                function_tool_call("get_weather", r#"{"city":"Oslo"}"#),
                ToolCall::Unsupported,
            ]),
            function_call: None,
        };
        let attrs = request_message_attributes(&message);
        assert_eq!(
            attrs.get_str("message.tool_calls.0.tool_call.function.name"),
            Some("get_weather")
        );
        assert_eq!(
            attrs.get_str("message.tool_calls.0.tool_call.function.arguments"),
            Some(r#"{"city":"Oslo"}"#)
        );
        assert!(!attrs.keys().any(|k| k.starts_with("message.tool_calls.1.")));

        // Unsupported first: the function call stays at index 1, nothing moves to 0.
        let message = RequestMessage::Assistant {
            content: None,
            name: None,
            tool_calls: Some(vec![
                ToolCall::Unsupported,
                function_tool_call("lookup", "{}"),
            ]),
            function_call: None,
        };
        let attrs = request_message_attributes(&message);
        assert!(!attrs.keys().any(|k| k.starts_with("message.tool_calls.0.")));
        assert_eq!(attrs.get_str("message.tool_calls.1.tool_call.function.name"), Some("lookup"));
    }

    #[test]
    fn function_role_emits_name() {
        let message = RequestMessage::Function {
            content: Some(MessageContent::Text("sunny".into())),
            name: "get_weather".into(),
        };
        let attrs = request_message_attributes(&message);
        assert_eq!(attrs.get_str(MESSAGE_ROLE), Some("function"));
        assert_eq!(attrs.get_str(MESSAGE_NAME), Some("get_weather"));
        assert_eq!(attrs.get_str(MESSAGE_CONTENT), Some("sunny"));
    }

    #[test]
    fn response_message_with_legacy_function_call() {
        let message = ResponseMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: None,
            function_call: Some(FunctionCall {
                name: "get_weather".into(),
                arguments: r#"{"a":1}"#.into(),
            }),
        };
        let attrs = response_message_attributes(&message);
        assert_eq!(attrs.get_str(MESSAGE_ROLE), Some("assistant"));
        assert!(!attrs.contains_key(MESSAGE_CONTENT));
        assert_eq!(attrs.get_str(MESSAGE_FUNCTION_CALL_NAME), Some("get_weather"));
        assert_eq!(attrs.get_str(MESSAGE_FUNCTION_CALL_ARGUMENTS_JSON), Some(r#"{"a":1}"#));
    }

    #[test]
    fn chat_output_uses_first_choice_only() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "second"}, "finish_reason": "stop"}
            ]
        }))
        .unwrap();
        let attrs = chat_completion_output_attributes(&completion);
        assert_eq!(attrs.get_str("llm.output_messages.0.message.content"), Some("first"));
        assert_eq!(attrs.get_str("llm.output_messages.0.message.role"), Some("assistant"));
        assert!(!attrs.keys().any(|k| k.starts_with("llm.output_messages.1")));
    }

    #[test]
    fn chat_output_with_no_choices_is_exactly_empty() {
        let completion = ChatCompletion {
            id: Some("x".into()),
            model: Some("gpt-4o".into()),
            choices: vec![],
            usage: None,
            raw: None,
        };
        assert!(chat_completion_output_attributes(&completion).is_empty());

        let no_message = ChatCompletion {
            choices: vec![ChatChoice {
                index: 0,
                message: None,
                finish_reason: None,
            }],
            ..completion
        };
        assert!(chat_completion_output_attributes(&no_message).is_empty());
    }

    #[test]
    fn usage_is_verbatim_or_empty() {
        let usage = Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        };
        let attrs = usage_attributes(Some(&usage));
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs.get_i64(LLM_TOKEN_COUNT_PROMPT), Some(10));
        assert_eq!(attrs.get_i64(LLM_TOKEN_COUNT_COMPLETION), Some(5));
        assert_eq!(attrs.get_i64(LLM_TOKEN_COUNT_TOTAL), Some(15));

        assert!(usage_attributes(None).is_empty());
        assert!(embedding_usage_attributes(None).is_empty());
    }

    #[test]
    fn completion_prompt_uses_first_string_only() {
        let prompt = Prompt::Texts(vec!["first".into(), "second".into()]);
        let attrs = completion_prompt_attributes(Some(&prompt));
        assert_eq!(attrs.get_str(INPUT_VALUE), Some("first"));
        assert_eq!(attrs.get_str(INPUT_MIME_TYPE), Some(MIME_TYPE_TEXT));

        assert!(completion_prompt_attributes(None).is_empty());
        assert!(completion_prompt_attributes(Some(&Prompt::Texts(vec![]))).is_empty());
        assert!(completion_prompt_attributes(Some(&Prompt::Tokens(vec![1, 2]))).is_empty());
    }

    #[test]
    fn completion_output_first_choice_text() {
        let completion = Completion {
            id: None,
            model: Some("gpt-3.5-turbo-instruct".into()),
            choices: vec![CompletionChoice {
                index: 0,
                text: " world".into(),
                finish_reason: Some("stop".into()),
            }],
            usage: None,
        };
        let attrs = completion_output_attributes(&completion);
        assert_eq!(attrs.get_str(OUTPUT_VALUE), Some(" world"));
        assert_eq!(attrs.get_str(OUTPUT_MIME_TYPE), Some(MIME_TYPE_TEXT));

        let empty = Completion {
            choices: vec![],
            ..completion
        };
        assert!(completion_output_attributes(&empty).is_empty());
    }

    #[test]
    fn embeddings_pair_text_and_vector_by_index() {
        let input = EmbeddingInput::Texts(vec!["a".into(), "b".into(), "c".into()]);
        let response = EmbeddingResponse {
            model: Some("text-embedding-3-small".into()),
            data: (0..3)
                .map(|i| Embedding {
                    index: i,
                    embedding: vec![f64::from(i), 0.5],
                })
                .collect(),
            usage: Some(EmbeddingUsage {
                prompt_tokens: 3,
                total_tokens: 3,
            }),
        };
        let mut attrs = embedding_input_attributes(&input);
        attrs.extend(embedding_output_attributes(&response));
        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            assert_eq!(
                attrs.get_str(&format!("embedding.embeddings.{i}.embedding.text")),
                Some(*text)
            );
            let vector = attrs
                .get(&format!("embedding.embeddings.{i}.embedding.vector"))
                .and_then(|v| v.as_floats())
                .unwrap();
            assert_eq!(vector, &[i as f64, 0.5]);
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        let request = ChatCompletionRequest::from_value(json!({
            "model": "gpt-4o",
            "temperature": 0.1,
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": "hi"}]},
                {"role": "assistant", "content": "hello", "tool_calls": [
                    {"id": "c1", "type": "function", "function": {"name": "f", "arguments": "{}"}}
                ]}
            ]
        }))
        .unwrap();
        let a = serde_json::to_vec(&chat_request_attributes(&request)).unwrap();
        let b = serde_json::to_vec(&chat_request_attributes(&request)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn chat_request_attributes_cover_span_start() {
        let request = ChatCompletionRequest::from_value(json!({
            "model": "gpt-4o-mini",
            "max_tokens": 32,
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        let attrs = chat_request_attributes(&request);
        assert_eq!(attrs.get_str(OPENINFERENCE_SPAN_KIND), Some("LLM"));
        assert_eq!(attrs.get_str(LLM_MODEL_NAME), Some("gpt-4o-mini"));
        assert_eq!(attrs.get_str(INPUT_MIME_TYPE), Some(MIME_TYPE_JSON));
        let params: serde_json::Value =
            serde_json::from_str(attrs.get_str(LLM_INVOCATION_PARAMETERS).unwrap()).unwrap();
        assert_eq!(params, json!({"model": "gpt-4o-mini", "max_tokens": 32}));
        assert_eq!(attrs.get_str("llm.input_messages.0.message.content"), Some("hi"));
    }

    #[test]
    fn embedding_request_single_string_is_plain_text() {
        let request: EmbeddingRequest = serde_json::from_value(json!({
            "model": "text-embedding-3-small",
            "input": "hello"
        }))
        .unwrap();
        let attrs = embedding_request_attributes(&request);
        assert_eq!(attrs.get_str(OPENINFERENCE_SPAN_KIND), Some("EMBEDDING"));
        assert_eq!(attrs.get_str(EMBEDDING_MODEL_NAME), Some("text-embedding-3-small"));
        assert_eq!(attrs.get_str(INPUT_VALUE), Some("hello"));
        assert_eq!(attrs.get_str(INPUT_MIME_TYPE), Some(MIME_TYPE_TEXT));
        assert_eq!(attrs.get_str("embedding.embeddings.0.embedding.text"), Some("hello"));
    }

    #[test]
    fn chat_response_attributes_include_output_json_and_usage() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-9",
            "model": "gpt-4o-2024-08-06",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}}],
            "usage": {"prompt_tokens": 4, "completion_tokens": 1, "total_tokens": 5}
        }))
        .unwrap();
        let attrs = chat_completion_response_attributes(&completion);
        assert_eq!(attrs.get_str(OUTPUT_MIME_TYPE), Some(MIME_TYPE_JSON));
        assert!(attrs.get_str(OUTPUT_VALUE).unwrap().contains("chatcmpl-9"));
        assert_eq!(attrs.get_str(LLM_MODEL_NAME), Some("gpt-4o-2024-08-06"));
        assert_eq!(attrs.get_i64(LLM_TOKEN_COUNT_TOTAL), Some(5));
        assert_eq!(attrs.get_str("llm.output_messages.0.message.content"), Some("ok"));
    }

    #[test]
    fn input_value_records_the_request_as_sent() {
        let body = json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "user", "content": [
                    {"type": "input_audio", "input_audio": {"data": "AAAA", "format": "wav"}}
                ]},
                {"role": "assistant", "content": "x", "tool_calls": [
                    {"id": "ci_1", "type": "code_interpreter"}
                ]}
            ]
        });
        let request = ChatCompletionRequest::from_value(body.clone()).unwrap();
        let attrs = chat_request_attributes(&request);

        let recorded: serde_json::Value =
            serde_json::from_str(attrs.get_str(INPUT_VALUE).unwrap()).unwrap();
        assert_eq!(recorded, body);
        // Unsupported kinds still contribute no flattened attributes.
        assert!(!attrs.keys().any(|k| k.contains("message.contents")));
        assert!(!attrs.keys().any(|k| k.contains("tool_calls")));
    }

    #[test]
    fn output_value_records_the_response_as_received() {
        let body = json!({
            "id": "chatcmpl-7",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4o",
            "system_fingerprint": "fp_44709d6fcb",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hi", "refusal": null},
                "logprobs": null,
                "finish_reason": "stop"
            }]
        });
        let completion: ChatCompletion = serde_json::from_value(body.clone()).unwrap();
        let attrs = chat_completion_response_attributes(&completion);

        let recorded: serde_json::Value =
            serde_json::from_str(attrs.get_str(OUTPUT_VALUE).unwrap()).unwrap();
        assert_eq!(recorded, body);
        assert!(recorded.get("usage").is_none());
        assert_eq!(attrs.get_str("llm.output_messages.0.message.content"), Some("hi"));
    }

    #[test]
    fn embedding_input_value_records_the_input_as_sent() {
        let request: EmbeddingRequest = serde_json::from_value(json!({
            "model": "text-embedding-3-small",
            "input": [[101, 202], [303]]
        }))
        .unwrap();
        let attrs = embedding_request_attributes(&request);
        assert_eq!(attrs.get_str(INPUT_VALUE), Some("[[101,202],[303]]"));
        assert_eq!(attrs.get_str(INPUT_MIME_TYPE), Some(MIME_TYPE_JSON));
    }

    #[test]
    fn request_built_in_code_is_encoded_from_its_fields() {
        let request = ChatCompletionRequest {
            model: "gpt-4o".into(),
            messages: vec![RequestMessage::User {
                content: Some(MessageContent::Text("hi".into())),
                name: None,
            }],
            params: serde_json::Map::new(),
            raw: None,
        };
        let attrs = chat_request_attributes(&request);
        let recorded: serde_json::Value =
            serde_json::from_str(attrs.get_str(INPUT_VALUE).unwrap()).unwrap();
        assert_eq!(
            recorded,
            json!({"model": "gpt-4o", "messages": [{"role": "user", "content": "hi"}]})
        );
    }
}
