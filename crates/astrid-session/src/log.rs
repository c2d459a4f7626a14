//! The branching session log: an append-only tree of [`SessionEntry`]
//! nodes with O(1) id lookup, linear branch reconstruction, and durable
//! JSONL replay.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;

use rand::Rng;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entry::{EntryPayload, SessionEntry, ThinkingLevel};
use crate::error::{SessionLogError, SessionLogResult};
use crate::header::{CURRENT_VERSION, SessionHeader};
use crate::message::{Message, TimestampMs};

/// The resolved context to hand to an LLM driver: the message list along
/// with the active reasoning level and model for the current branch.
#[derive(Debug, Clone, Default)]
pub struct BuiltContext {
    /// Messages from the effective start of context through the leaf.
    pub messages: Vec<Message>,
    /// Active reasoning level on this branch.
    pub thinking_level: ThinkingLevel,
    /// Active provider/model on this branch, if ever set.
    pub model: Option<(String, String)>,
}

/// An append-only tree of session entries, plus a cursor (`leaf_id`)
/// marking the current position.
#[derive(Debug, Clone)]
pub struct SessionLog {
    header: SessionHeader,
    entries: Vec<SessionEntry>,
    index: HashMap<String, usize>,
    leaf_id: Option<String>,
}

impl SessionLog {
    /// Start a fresh, empty session rooted at `cwd`.
    #[must_use]
    pub fn new(cwd: impl Into<String>, id: Option<Uuid>, parent_session: Option<Uuid>, now_ms: TimestampMs) -> Self {
        let header = SessionHeader::new(cwd, id.unwrap_or_else(Uuid::new_v4), now_ms, parent_session);
        Self {
            header,
            entries: Vec::new(),
            index: HashMap::new(),
            leaf_id: None,
        }
    }

    /// The session header.
    #[must_use]
    pub fn header(&self) -> &SessionHeader {
        &self.header
    }

    /// The current cursor position, or `None` if the log is empty.
    #[must_use]
    pub fn leaf_id(&self) -> Option<&str> {
        self.leaf_id.as_deref()
    }

    /// All entries in insertion (append) order. Not necessarily a branch.
    #[must_use]
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    /// Append a new entry. If `entry.id` is empty a fresh collision-free
    /// 8-hex id is assigned; if `entry.parent_id` is `None` it is set to
    /// the current leaf. Advances the leaf to the new entry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionLogError::ParentNotFound`] if an explicit
    /// `parent_id` does not reference an existing entry, and
    /// [`SessionLogError::IdSpaceExhausted`] if no free id could be found.
    pub fn append(&mut self, mut entry: SessionEntry) -> SessionLogResult<String> {
        if entry.id.is_empty() {
            entry.id = self.fresh_id()?;
        } else if self.index.contains_key(&entry.id) {
            return Err(SessionLogError::IdSpaceExhausted);
        }
        if entry.parent_id.is_none() {
            entry.parent_id = self.leaf_id.clone();
        }
        if let Some(parent) = entry.parent_id.clone()
            && !self.index.contains_key(&parent)
        {
            return Err(SessionLogError::ParentNotFound(parent));
        }

        let id = entry.id.clone();
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push(entry);
        self.leaf_id = Some(id.clone());
        Ok(id)
    }

    fn fresh_id(&self) -> SessionLogResult<String> {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let candidate: String = (0..8)
                .map(|_| {
                    let nibble: u8 = rng.gen_range(0..16);
                    std::char::from_digit(u32::from(nibble), 16).unwrap_or('0')
                })
                .collect();
            if !self.index.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(SessionLogError::IdSpaceExhausted)
    }

    /// Move the cursor to `id` without mutating any entry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionLogError::EntryNotFound`] if `id` is unknown.
    pub fn set_leaf(&mut self, id: &str) -> SessionLogResult<()> {
        if !self.index.contains_key(id) {
            return Err(SessionLogError::EntryNotFound(id.to_string()));
        }
        self.leaf_id = Some(id.to_string());
        Ok(())
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SessionEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// The ordered root-to-leaf path for `leaf_id` (or the log's current
    /// leaf if `None`), obtained by walking parent links.
    #[must_use]
    pub fn branch(&self, leaf_id: Option<&str>) -> Vec<&SessionEntry> {
        let start = leaf_id.or(self.leaf_id.as_deref());
        let Some(mut cursor) = start else {
            return Vec::new();
        };
        let mut path = Vec::new();
        let mut visited = std::collections::HashSet::new();
        loop {
            if !visited.insert(cursor.to_string()) {
                warn!(id = cursor, "cycle detected walking session branch, truncating");
                break;
            }
            let Some(entry) = self.get(cursor) else { break };
            path.push(entry);
            match &entry.parent_id {
                Some(parent) => cursor = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    /// Build the context to hand the LLM driver for `leaf_id` (or the
    /// current leaf): find the last compaction on the branch, if any, and
    /// emit a synthetic summary message followed by everything from
    /// `first_kept_entry_id` forward; otherwise emit every context-bearing
    /// entry. Also resolves the active thinking level and model.
    #[must_use]
    pub fn build_context(&self, leaf_id: Option<&str>) -> BuiltContext {
        let path = self.branch(leaf_id);

        let last_compaction_pos = path.iter().rposition(|e| matches!(e.payload, EntryPayload::Compaction { .. }));

        let thinking_level = path
            .iter()
            .rev()
            .find_map(|e| match &e.payload {
                EntryPayload::ThinkingLevelChange { level } => Some(*level),
                _ => None,
            })
            .unwrap_or_default();

        let model = path.iter().rev().find_map(|e| match &e.payload {
            EntryPayload::ModelChange { provider, model } => Some((provider.clone(), model.clone())),
            _ => None,
        });

        let mut messages = Vec::new();

        if let Some(pos) = last_compaction_pos {
            let EntryPayload::Compaction {
                summary,
                first_kept_entry_id,
                ..
            } = &path[pos].payload
            else {
                unreachable!("matched above");
            };
            messages.push(Message::CompactionSummary {
                timestamp: path[pos].timestamp,
                summary: summary.clone(),
            });
            let kept_start = path
                .iter()
                .position(|e| &e.id == first_kept_entry_id)
                .unwrap_or(pos + 1);
            for entry in &path[kept_start..] {
                if let Some(msg) = entry_to_message(entry) {
                    messages.push(msg);
                }
            }
        } else {
            for entry in &path {
                if let Some(msg) = entry_to_message(entry) {
                    messages.push(msg);
                }
            }
        }

        BuiltContext {
            messages,
            thinking_level,
            model,
        }
    }

    /// Serialize the log as line-delimited JSON: header first, then one
    /// entry per line. Null fields are omitted by `serde_json`'s default
    /// behavior via `skip_serializing_if` on optional fields.
    ///
    /// # Errors
    ///
    /// Returns [`SessionLogError::SaveFailed`] if the file cannot be
    /// written or an entry fails to serialize.
    pub fn save(&self, path: &Path) -> SessionLogResult<()> {
        let mut out = String::new();
        out.push_str(&to_wire_line(&self.header).map_err(|e| self.save_err(path, e))?);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&to_wire_line(entry).map_err(|e| self.save_err(path, e))?);
            out.push('\n');
        }
        let mut file = std::fs::File::create(path).map_err(|e| self.save_err(path, e.to_string()))?;
        file.write_all(out.as_bytes())
            .map_err(|e| self.save_err(path, e.to_string()))?;
        Ok(())
    }

    fn save_err(&self, path: &Path, message: impl Into<String>) -> SessionLogError {
        SessionLogError::SaveFailed {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Load a session log from a JSONL file, applying forward migrations
    /// as needed, and pick the leaf as the most-recently-appended entry
    /// not referenced as any other entry's parent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionLogError::LoadFailed`] if the file is missing or
    /// malformed, or [`SessionLogError::UnsupportedVersion`] if the header
    /// declares a version newer than this build understands.
    pub fn load(path: &Path) -> SessionLogResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SessionLogError::LoadFailed {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut lines = text.lines();
        let header_line = lines.next().ok_or_else(|| SessionLogError::LoadFailed {
            path: path.display().to_string(),
            message: "empty session file".to_string(),
        })?;
        let mut header: SessionHeader =
            serde_json::from_str(header_line).map_err(|e| SessionLogError::LoadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        if header.version > CURRENT_VERSION {
            return Err(SessionLogError::UnsupportedVersion(header.version));
        }

        let mut raw_entries: Vec<Value> = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line).map_err(|e| SessionLogError::LoadFailed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            raw_entries.push(value);
        }

        let migrated = migrate(header.version, raw_entries);
        header.version = CURRENT_VERSION;

        let mut entries = Vec::with_capacity(migrated.len());
        let mut index = HashMap::with_capacity(migrated.len());
        for value in migrated {
            let entry: SessionEntry = serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!(error = %e, "unrecognized session entry, coercing to custom");
                coerce_to_custom(value)
            });
            index.insert(entry.id.clone(), entries.len());
            entries.push(entry);
        }

        let referenced: std::collections::HashSet<&str> = entries
            .iter()
            .filter_map(|e| e.parent_id.as_deref())
            .collect();
        let leaf_id = entries
            .iter()
            .rev()
            .find(|e| !referenced.contains(e.id.as_str()))
            .map(|e| e.id.clone());

        debug!(entries = entries.len(), leaf = ?leaf_id, "loaded session log");

        Ok(Self {
            header,
            entries,
            index,
            leaf_id,
        })
    }
}

fn to_wire_line<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

fn coerce_to_custom(value: Value) -> SessionEntry {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let parent_id = value
        .get("parentId")
        .and_then(Value::as_str)
        .map(str::to_string);
    let timestamp = value.get("timestamp").and_then(Value::as_i64).unwrap_or(0);
    let custom_type = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    SessionEntry {
        id,
        parent_id,
        timestamp,
        payload: EntryPayload::Custom {
            custom_type,
            data: value,
        },
    }
}

/// Apply forward-only migrations starting from `from_version`.
///
/// - v1 -> v2: stamp ids/parent_ids onto every entry (referencing any
///   compaction's `firstKeptEntryIndex` by the id at that index), dropping
///   the index field.
/// - v2 -> v3: rename role `"hookMessage"` to `"custom"`.
fn migrate(from_version: u32, mut entries: Vec<Value>) -> Vec<Value> {
    if from_version < 2 {
        let mut synthetic_id = 0u64;
        let mut ids_by_index = Vec::with_capacity(entries.len());
        for entry in &mut entries {
            let obj = entry.as_object_mut();
            let Some(obj) = obj else { continue };
            if !obj.contains_key("id") {
                synthetic_id += 1;
                obj.insert(
                    "id".to_string(),
                    Value::String(format!("{synthetic_id:08x}")),
                );
            }
            if !obj.contains_key("parentId") {
                obj.insert("parentId".to_string(), Value::Null);
            }
            ids_by_index.push(obj.get("id").and_then(Value::as_str).unwrap_or_default().to_string());
        }
        for entry in &mut entries {
            let Some(obj) = entry.as_object_mut() else { continue };
            if let Some(idx) = obj.remove("firstKeptEntryIndex").and_then(|v| v.as_u64()) {
                if let Some(id) = ids_by_index.get(idx as usize) {
                    obj.insert("firstKeptEntryId".to_string(), Value::String(id.clone()));
                }
            }
        }
    }
    if from_version < 3 {
        for entry in &mut entries {
            let Some(obj) = entry.as_object_mut() else { continue };
            if obj.get("role").and_then(Value::as_str) == Some("hookMessage") {
                obj.insert("role".to_string(), Value::String("custom".to_string()));
            }
        }
    }
    entries
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ContentBlock, Trust};

    fn user_entry(text: &str, ts: TimestampMs) -> SessionEntry {
        SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: ts,
            payload: EntryPayload::Message {
                message: Message::User {
                    timestamp: ts,
                    content: vec![ContentBlock::text(text)],
                },
            },
        }
    }

    #[test]
    fn append_assigns_id_and_advances_leaf() {
        let mut log = SessionLog::new("/tmp", None, None, 0);
        let id = log.append(user_entry("hi", 1)).unwrap();
        assert_eq!(log.leaf_id(), Some(id.as_str()));
        assert!(log.get(&id).is_some());
    }

    #[test]
    fn branch_reconstructs_root_to_leaf() {
        let mut log = SessionLog::new("/tmp", None, None, 0);
        let a = log.append(user_entry("a", 1)).unwrap();
        let b = log.append(user_entry("b", 2)).unwrap();
        let branch = log.branch(None);
        assert_eq!(branch.len(), 2);
        assert_eq!(branch[0].id, a);
        assert_eq!(branch[1].id, b);
    }

    #[test]
    fn set_leaf_forks_without_mutating_entries() {
        let mut log = SessionLog::new("/tmp", None, None, 0);
        let root = log.append(user_entry("root", 1)).unwrap();
        log.append(user_entry("branch-a", 2)).unwrap();
        log.set_leaf(&root).unwrap();
        let b = log.append(user_entry("branch-b", 3)).unwrap();
        let branch = log.branch(None);
        assert_eq!(branch.len(), 2);
        assert_eq!(branch[1].id, b);
    }

    #[test]
    fn set_leaf_unknown_id_errors() {
        let mut log = SessionLog::new("/tmp", None, None, 0);
        assert!(matches!(
            log.set_leaf("deadbeef"),
            Err(SessionLogError::EntryNotFound(_))
        ));
    }

    #[test]
    fn append_with_missing_parent_errors() {
        let mut log = SessionLog::new("/tmp", None, None, 0);
        let mut entry = user_entry("x", 1);
        entry.parent_id = Some("ffffffff".to_string());
        assert!(matches!(
            log.append(entry),
            Err(SessionLogError::ParentNotFound(_))
        ));
    }

    #[test]
    fn build_context_uses_only_last_compaction() {
        let mut log = SessionLog::new("/tmp", None, None, 0);
        let a = log.append(user_entry("a", 1)).unwrap();
        let _b = log.append(user_entry("b", 2)).unwrap();
        log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: 3,
            payload: EntryPayload::Compaction {
                summary: "first summary".to_string(),
                first_kept_entry_id: a.clone(),
                tokens_before: 100,
                details: Default::default(),
                from_hook: false,
            },
        })
        .unwrap();
        let c = log.append(user_entry("c", 4)).unwrap();
        log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: 5,
            payload: EntryPayload::Compaction {
                summary: "second summary".to_string(),
                first_kept_entry_id: c,
                tokens_before: 200,
                details: Default::default(),
                from_hook: false,
            },
        })
        .unwrap();

        let ctx = log.build_context(None);
        // Only the second compaction's summary should appear.
        let summaries: Vec<_> = ctx
            .messages
            .iter()
            .filter(|m| matches!(m, Message::CompactionSummary { .. }))
            .collect();
        assert_eq!(summaries.len(), 1);
        if let Message::CompactionSummary { summary, .. } = summaries[0] {
            assert_eq!(summary, "second summary");
        }
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");

        let mut log = SessionLog::new("/work", None, None, 1000);
        log.append(user_entry("hello", 1001)).unwrap();
        log.append(SessionEntry {
            id: String::new(),
            parent_id: None,
            timestamp: 1002,
            payload: EntryPayload::Message {
                message: Message::ToolResult {
                    timestamp: 1002,
                    tool_call_id: "t1".to_string(),
                    tool_name: Some("bash".to_string()),
                    content: vec![ContentBlock::text("ok")],
                    is_error: false,
                    trust: Trust::Trusted,
                },
            },
        })
        .unwrap();
        log.save(&path).unwrap();

        let loaded = SessionLog::load(&path).unwrap();
        assert_eq!(loaded.entries().len(), 2);
        assert_eq!(loaded.header().cwd, "/work");
        assert_eq!(loaded.leaf_id(), log.leaf_id());
    }

    #[test]
    fn load_picks_leaf_as_entry_unreferenced_as_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.jsonl");
        let mut log = SessionLog::new("/work", None, None, 0);
        let root = log.append(user_entry("root", 1)).unwrap();
        log.append(user_entry("a", 2)).unwrap();
        log.set_leaf(&root).unwrap();
        let b = log.append(user_entry("b", 3)).unwrap();
        log.save(&path).unwrap();

        let loaded = SessionLog::load(&path).unwrap();
        assert_eq!(loaded.leaf_id(), Some(b.as_str()));
    }
}
