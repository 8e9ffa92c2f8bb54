//! Member-list operations for `repeatable-group` fields.
//!
//! The stored value is a JSON array of flat objects. Every operation takes
//! the current stored text and returns the new text plus the member index
//! that should be active afterwards; the caller writes both back.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::values::ValueStore;

/// One member record: sub-field name to value.
pub type Member = BTreeMap<String, String>;

/// Parses a stored repeatable value. Malformed or non-array JSON yields an
/// empty list; non-object entries become empty members so indices stay put.
pub fn parse_members(raw: &str) -> Vec<Member> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "treating malformed repeatable value as empty");
            return Vec::new();
        }
    };
    let Some(items) = parsed.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            item.as_object()
                .map(|map| {
                    map.iter()
                        .filter_map(|(key, value)| {
                            let text = match value {
                                Value::Null => return None,
                                Value::String(text) => text.clone(),
                                other => other.to_string(),
                            };
                            Some((key.clone(), text))
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect()
}

pub fn encode_members(members: &[Member]) -> String {
    serde_json::to_string(members).unwrap_or_else(|_| "[]".to_string())
}

/// A member's values as a store, so sub-fields validate against siblings.
pub fn member_values(member: &Member) -> ValueStore {
    member.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Result of a member-list edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatableEdit {
    pub value: String,
    pub active: usize,
}

/// Clamps an active index into `[0, len - 1]` (0 for an empty list).
pub fn clamp_active(len: usize, active: usize) -> usize {
    active.min(len.saturating_sub(1))
}

/// Appends an empty member and makes it active.
pub fn add_member(raw: &str) -> RepeatableEdit {
    let mut members = parse_members(raw);
    members.push(Member::new());
    RepeatableEdit {
        value: encode_members(&members),
        active: members.len() - 1,
    }
}

/// Removes the member at `index` and activates the one before it.
/// Returns `None` when `index` is out of range.
pub fn remove_member(raw: &str, index: usize) -> Option<RepeatableEdit> {
    let mut members = parse_members(raw);
    if index >= members.len() {
        return None;
    }
    members.remove(index);
    Some(RepeatableEdit {
        value: encode_members(&members),
        active: clamp_active(members.len(), index.saturating_sub(1)),
    })
}

/// Sets one sub-field on the active member. An empty list gets a first
/// member so typing into a fresh group works without an explicit add.
pub fn set_member_field(raw: &str, active: usize, sub_field: &str, value: &str) -> RepeatableEdit {
    let mut members = parse_members(raw);
    if members.is_empty() {
        members.push(Member::new());
    }
    let active = clamp_active(members.len(), active);
    members[active].insert(sub_field.to_string(), value.to_string());
    RepeatableEdit {
        value: encode_members(&members),
        active,
    }
}

/// Moves the active index by `delta`, clamped to the member bounds.
pub fn move_active(raw: &str, active: usize, delta: isize) -> usize {
    let len = parse_members(raw).len();
    let moved = if delta.is_negative() {
        active.saturating_sub(delta.unsigned_abs())
    } else {
        active.saturating_add(delta as usize)
    };
    clamp_active(len, moved)
}
