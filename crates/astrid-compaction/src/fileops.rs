//! Recovers which files were touched by a summarized span, by scanning
//! its tool calls for read/write/edit operations. Populates the
//! `SummaryDetails` attached to a compaction or branch-summary entry.

use std::collections::BTreeSet;

use astrid_session::{ContentBlock, Message, SummaryDetails};

/// Tool names (or name suffixes after a `:`) treated as read-only file
/// access. Kept in sync with the built-in file tools this crate has no
/// direct dependency on (tool implementations are out of scope).
const READ_TOOL_NAMES: &[&str] = &["read", "read_file", "glob", "grep"];

/// Tool names treated as file-mutating.
const WRITE_TOOL_NAMES: &[&str] = &["write", "write_file", "edit", "edit_file", "multi_edit", "apply_patch"];

/// Argument keys that, when present on a matched tool call, carry the
/// file path operated on.
const PATH_ARG_KEYS: &[&str] = &["path", "file_path", "filePath", "file"];

/// Scan `messages` for tool-call content blocks and classify the file
/// paths they touch into reads and writes, for attachment to a summary
/// entry's `SummaryDetails`.
#[must_use]
pub fn recover_file_ops(messages: &[Message]) -> SummaryDetails {
    let mut files_read = BTreeSet::new();
    let mut files_modified = BTreeSet::new();

    for message in messages {
        let Message::Assistant { content, .. } = message else {
            continue;
        };
        for block in content {
            let ContentBlock::ToolCall { name, arguments, .. } = block else {
                continue;
            };
            let Some(path) = PATH_ARG_KEYS.iter().find_map(|key| arguments.get(*key)).and_then(|v| v.as_str()) else {
                continue;
            };
            let short_name = name.rsplit(':').next().unwrap_or(name);
            if WRITE_TOOL_NAMES.contains(&short_name) {
                files_modified.insert(path.to_string());
            } else if READ_TOOL_NAMES.contains(&short_name) {
                files_read.insert(path.to_string());
            }
        }
    }

    SummaryDetails {
        files_read: files_read.into_iter().collect(),
        files_modified: files_modified.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astrid_session::{StopReason, Usage};
    use serde_json::json;

    fn assistant_call(name: &str, path: &str) -> Message {
        let mut arguments = std::collections::BTreeMap::new();
        arguments.insert("path".to_string(), json!(path));
        Message::Assistant {
            timestamp: 0,
            content: vec![ContentBlock::ToolCall {
                id: "t1".to_string(),
                name: name.to_string(),
                arguments,
            }],
            provider: "anthropic".to_string(),
            model: "claude".to_string(),
            api: "messages".to_string(),
            usage: Usage::default(),
            stop_reason: StopReason::ToolUse,
        }
    }

    #[test]
    fn classifies_reads_and_writes_by_tool_name() {
        let messages = vec![assistant_call("builtin:read", "/a.rs"), assistant_call("builtin:edit", "/b.rs")];
        let details = recover_file_ops(&messages);
        assert_eq!(details.files_read, vec!["/a.rs".to_string()]);
        assert_eq!(details.files_modified, vec!["/b.rs".to_string()]);
    }

    #[test]
    fn deduplicates_repeated_paths() {
        let messages = vec![assistant_call("read", "/a.rs"), assistant_call("read", "/a.rs")];
        let details = recover_file_ops(&messages);
        assert_eq!(details.files_read.len(), 1);
    }

    #[test]
    fn ignores_unrecognized_tools() {
        let messages = vec![assistant_call("bash", "/a.rs")];
        let details = recover_file_ops(&messages);
        assert!(details.files_read.is_empty());
        assert!(details.files_modified.is_empty());
    }
}
