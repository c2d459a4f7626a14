//! The guardrails transform: applied to a message list on its way to the
//! LLM driver (spec §4.9).

use astrid_session::{ContentBlock, Message};
use std::collections::BTreeMap;

use crate::args::truncate_arg_value;
use crate::config::GuardrailsConfig;
use crate::images::{apply_image_policy, ImageBlock};
use crate::text::{truncate_arg_string, truncate_middle, truncate_tool_result};

/// Apply the guardrails transform to every message in `messages`, returning
/// a new list safe to hand to the LLM driver. Non-assistant/tool_result
/// messages pass through unchanged.
#[must_use]
pub fn apply(messages: &[Message], config: &GuardrailsConfig) -> Vec<Message> {
    messages.iter().map(|m| transform_message(m, config)).collect()
}

fn transform_message(message: &Message, config: &GuardrailsConfig) -> Message {
    match message {
        Message::Assistant {
            timestamp,
            content,
            provider,
            model,
            api,
            usage,
            stop_reason,
        } => Message::Assistant {
            timestamp: *timestamp,
            content: content
                .iter()
                .map(|b| transform_assistant_block(b, config))
                .filter(|b| !matches!(b, ContentBlock::Thinking { text } if text.is_empty() && config.max_thinking_bytes == 0))
                .collect(),
            provider: provider.clone(),
            model: model.clone(),
            api: api.clone(),
            usage: *usage,
            stop_reason: *stop_reason,
        },
        Message::ToolResult {
            timestamp,
            tool_call_id,
            tool_name,
            content,
            is_error,
            trust,
        } => Message::ToolResult {
            timestamp: *timestamp,
            tool_call_id: tool_call_id.clone(),
            tool_name: tool_name.clone(),
            content: transform_tool_result_content(content, tool_name.as_deref(), config),
            is_error: *is_error,
            trust: *trust,
        },
        other => other.clone(),
    }
}

fn transform_assistant_block(block: &ContentBlock, config: &GuardrailsConfig) -> ContentBlock {
    match block {
        ContentBlock::Thinking { text } => {
            if config.max_thinking_bytes == 0 {
                // Dropped entirely; caller filters `None` out below. We
                // represent "drop" as an empty thinking block here and let
                // the caller strip zero-length thinking blocks, keeping
                // this function infallible and block-for-block.
                ContentBlock::Thinking { text: String::new() }
            } else {
                ContentBlock::Thinking {
                    text: truncate_middle(text, config.max_thinking_bytes),
                }
            }
        },
        ContentBlock::ToolCall { id, name, arguments } => {
            let limit = config.max_tool_call_arg_string_bytes;
            let spill_root = config.spill_dir.as_deref();
            let transformed: BTreeMap<String, serde_json::Value> = arguments
                .iter()
                .map(|(k, v)| {
                    let label = format!("tool_call:{name}:{id}:{k}");
                    (k.clone(), truncate_arg_value(v, limit, spill_root, &label))
                })
                .collect();
            ContentBlock::ToolCall {
                id: id.clone(),
                name: name.clone(),
                arguments: transformed,
            }
        },
        other => other.clone(),
    }
}

fn transform_tool_result_content(content: &[ContentBlock], tool_name: Option<&str>, config: &GuardrailsConfig) -> Vec<ContentBlock> {
    let images: Vec<ImageBlock> = content
        .iter()
        .filter_map(|b| match b {
            ContentBlock::Image { data, mime } => Some(ImageBlock {
                data_base64: data.clone(),
                mime: mime.clone(),
            }),
            _ => None,
        })
        .collect();
    let image_outcome = apply_image_policy(&images, config.max_tool_result_images, config.spill_dir.as_deref());

    let combined_text: String = content.iter().filter_map(ContentBlock::as_text).collect::<Vec<_>>().join("\n");
    let mut out = Vec::new();
    if !combined_text.is_empty() {
        match truncate_tool_result(&combined_text, tool_name, config.max_tool_result_bytes, config.spill_dir.as_deref()) {
            Some(truncated) => out.push(ContentBlock::text(truncated)),
            None => out.push(ContentBlock::text(combined_text)),
        }
    }
    for image in image_outcome.kept {
        out.push(ContentBlock::Image {
            data: image.data_base64,
            mime: image.mime,
        });
    }
    for placeholder in image_outcome.spilled {
        let text = serde_json::to_string(&placeholder).unwrap_or_default();
        out.push(ContentBlock::text(format!("[image spilled] {text}")));
    }
    // Preserve tool_call blocks embedded in a result's content verbatim,
    // besides text/image handled above (tool results don't normally carry
    // them, but nested agent output sometimes echoes one back).
    for block in content {
        if matches!(block, ContentBlock::ToolCall { .. }) {
            out.push(transform_assistant_block(block, config));
        }
    }
    out
}

/// Used by callers that need the raw, unconditional per-block drop/keep
/// decision for thinking content outside the [`apply`] message pipeline
/// (e.g. when truncating a freshly-streamed block before it is persisted).
#[must_use]
pub fn should_drop_thinking(config: &GuardrailsConfig) -> bool {
    config.max_thinking_bytes == 0
}

/// Truncate or spill a single tool-call argument string in isolation
/// (exposed for callers that transform one value at a time rather than a
/// whole message list).
#[must_use]
pub fn truncate_single_arg(value: &str, config: &GuardrailsConfig, label: &str) -> Option<crate::text::TruncatedPlaceholder> {
    if value.len() <= config.max_tool_call_arg_string_bytes {
        return None;
    }
    Some(truncate_arg_string(value, config.max_tool_call_arg_string_bytes, config.spill_dir.as_deref(), label))
}
