//! Applies a selected cut-point: summarizes the span being dropped and
//! appends a `Compaction` entry to the log (spec §4.6).

use astrid_session::{EntryPayload, Message, SessionEntry, SessionLog};
use serde_json::Value;

use crate::cutpoint::find_cut_point;
use crate::config::CompactionConfig;
use crate::error::{CompactionError, CompactionResult};
use crate::estimate::estimate_entry_tokens;
use crate::fileops::recover_file_ops;
use crate::summary::Summarizer;

/// Select a cut-point on the log's current branch, summarize everything
/// before it, and append a `Compaction` entry. Returns the new entry's id.
///
/// # Errors
///
/// Propagates [`CompactionError::CannotCompact`] from cut-point selection
/// and [`CompactionError::SummarizationFailed`] / [`CompactionError::LogError`]
/// from the apply step.
pub async fn compact(
    log: &mut SessionLog,
    summarizer: &dyn Summarizer,
    config: &CompactionConfig,
    force: bool,
) -> CompactionResult<String> {
    let path = log.branch(None);
    let cut_id = find_cut_point(&path, config, force)?;
    let cut_idx = path
        .iter()
        .position(|e| e.id == cut_id)
        .ok_or(CompactionError::CannotCompact)?;

    let span = &path[..cut_idx];
    if span.is_empty() {
        return Err(CompactionError::CannotCompact);
    }

    let tokens_before: usize = span.iter().map(|e| estimate_entry_tokens(e) as usize).sum();
    let messages: Vec<Message> = span.iter().filter_map(|e| entry_to_message(e)).collect();

    let summary = summarizer.summarize(&messages).await?;
    let details = recover_file_ops(&messages);

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    let entry = SessionEntry {
        id: String::new(),
        parent_id: None,
        timestamp,
        payload: EntryPayload::Compaction {
            summary,
            first_kept_entry_id: cut_id,
            tokens_before,
            details,
            from_hook: false,
        },
    };

    log.append(entry).map_err(|e| CompactionError::LogError(e.to_string()))
}

/// Mirror of the private helper in `astrid_session::log`: the subset of
/// entry kinds that contribute a message to a summarization span.
fn entry_to_message(entry: &SessionEntry) -> Option<Message> {
    match &entry.payload {
        EntryPayload::Message { message } => Some(message.clone()),
        EntryPayload::CustomMessage { content, .. } => Some(Message::Custom {
            timestamp: entry.timestamp,
            custom_type: "custom_message".to_string(),
            data: Value::String(content.clone()),
        }),
        EntryPayload::BranchSummary { summary, .. } => Some(Message::BranchSummary {
            timestamp: entry.timestamp,
            summary: summary.clone(),
        }),
        _ => None,
    }
}
