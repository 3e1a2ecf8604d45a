//! Event-sourced variable mapping.
//!
//! The store keeps no durable state of its own. The authoritative copy
//! lives in session history: every mutating tool result carries a full
//! snapshot of the mapping in its details payload, and [`VariableStore::reconstruct`]
//! rebuilds the in-memory view by replaying those snapshots oldest to
//! newest, last one wins.

use std::collections::BTreeMap;

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
    tracing::{debug, warn},
};

use pinion_extension::session::{SessionEntry, SessionMessage};

use super::TOOL_NAME;

/// A stored variable: the value plus an optional annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Full variable mapping. `BTreeMap` keeps listings key-sorted without a
/// separate sort step.
pub type VariableMap = BTreeMap<String, VariableEntry>;

/// Expected failures of store operations. None of these abort anything;
/// the tool layer turns them into error-flagged results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    #[error("key required")]
    MissingKey,
    #[error("key and value required")]
    MissingArgument,
    #[error("no stored value for \"%{0}\"")]
    NotFound(String),
}

impl VariableError {
    /// Stable machine-readable tag for the details payload, so callers can
    /// branch on outcome without parsing message text.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::MissingKey => "missing_key",
            Self::MissingArgument => "missing_argument",
            Self::NotFound(_) => "not_found",
        }
    }
}

/// Normalize a user-supplied variable name.
///
/// Trims whitespace and strips exactly one leading `%` sigil so `%foo` and
/// `foo` name the same variable. Returns `None` when nothing remains; a
/// bare `%` is no key at all.
pub fn normalize_key(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    let stripped = trimmed.strip_prefix('%').unwrap_or(trimmed);
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.to_string())
}

/// In-memory variable mapping for one session.
///
/// Keys are expected to be pre-normalized via [`normalize_key`].
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: VariableMap,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Full copy of the mapping, for embedding in a result payload.
    pub fn snapshot(&self) -> VariableMap {
        self.variables.clone()
    }

    /// Render all entries, one `%name = value` line per variable, sorted by
    /// name, with the description appended after an em dash when present.
    pub fn format_list(&self) -> String {
        if self.variables.is_empty() {
            return "No variables stored.".to_string();
        }
        self.variables
            .iter()
            .map(|(key, entry)| match &entry.description {
                Some(description) => format!("%{key} = {} — {description}", entry.value),
                None => format!("%{key} = {}", entry.value),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn get(&self, key: Option<&str>) -> Result<&VariableEntry, VariableError> {
        let key = key.ok_or(VariableError::MissingKey)?;
        self.variables
            .get(key)
            .ok_or_else(|| VariableError::NotFound(key.to_string()))
    }

    /// Insert or overwrite an entry. An absent description clears any prior
    /// one; an empty or whitespace-only value is rejected.
    pub fn set(
        &mut self,
        key: Option<&str>,
        value: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), VariableError> {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        let (Some(key), Some(value)) = (key, value) else {
            return Err(VariableError::MissingArgument);
        };
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        self.variables.insert(
            key.to_string(),
            VariableEntry {
                value: value.to_string(),
                description,
            },
        );
        Ok(())
    }

    pub fn delete(&mut self, key: Option<&str>) -> Result<(), VariableError> {
        let key = key.ok_or(VariableError::MissingKey)?;
        self.variables
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| VariableError::NotFound(key.to_string()))
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }

    /// Rebuild the mapping from a session branch.
    ///
    /// Resets to empty, then scans oldest to newest for results of this
    /// store's own tool and replaces the whole mapping with each snapshot
    /// found. Snapshots are not merged; the last one wins. Entries of other
    /// kinds, results of other tools, and payloads that fail to parse are
    /// skipped. The scan is a pure function of the branch, so replaying the
    /// same branch twice yields the same state.
    pub fn reconstruct(&mut self, branch: &[SessionEntry]) {
        self.variables.clear();
        let mut snapshots = 0usize;

        for entry in branch {
            let SessionEntry::Message {
                message:
                    SessionMessage::ToolResult {
                        tool_name,
                        details: Some(details),
                        ..
                    },
            } = entry
            else {
                continue;
            };
            if tool_name != TOOL_NAME {
                continue;
            }
            let Some(raw) = details.get("variables") else {
                continue;
            };
            match serde_json::from_value::<VariableMap>(raw.clone()) {
                Ok(map) => {
                    self.variables = map;
                    snapshots += 1;
                },
                Err(err) => warn!(%err, "skipping malformed variables snapshot"),
            }
        }

        debug!(
            snapshots,
            variables = self.variables.len(),
            "reconstructed variable store"
        );
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        pinion_extension::{session::SessionEntry, tool::ToolOutput},
        rstest::rstest,
        serde_json::json,
    };

    use super::*;

    fn snapshot_entry(tool_name: &str, variables: serde_json::Value) -> SessionEntry {
        SessionEntry::tool_result(
            tool_name,
            &ToolOutput::ok("ok", json!({ "action": "set", "variables": variables })),
        )
    }

    #[rstest]
    #[case(Some("%foo"), Some("foo"))]
    #[case(Some("foo"), Some("foo"))]
    #[case(Some("  %foo  "), Some("foo"))]
    #[case(Some("%%foo"), Some("%foo"))]
    #[case(Some("   "), None)]
    #[case(Some(""), None)]
    #[case(Some("%"), None)]
    #[case(None, None)]
    fn normalize_strips_one_sigil_and_whitespace(
        #[case] raw: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(normalize_key(raw).as_deref(), expected);
    }

    #[test]
    fn set_then_get_returns_what_was_set() {
        let mut store = VariableStore::new();
        store
            .set(Some("office"), Some("Plaza Mayor 2, Madrid"), Some("Office location"))
            .unwrap();

        let entry = store.get(Some("office")).unwrap();
        assert_eq!(entry.value, "Plaza Mayor 2, Madrid");
        assert_eq!(entry.description.as_deref(), Some("Office location"));
    }

    #[test]
    fn set_without_description_clears_prior_description() {
        let mut store = VariableStore::new();
        store.set(Some("k"), Some("v1"), Some("old")).unwrap();
        store.set(Some("k"), Some("v2"), None).unwrap();

        let entry = store.get(Some("k")).unwrap();
        assert_eq!(entry.value, "v2");
        assert_eq!(entry.description, None);
    }

    #[test]
    fn set_rejects_missing_key_or_empty_value() {
        let mut store = VariableStore::new();
        assert_eq!(
            store.set(None, Some("v"), None),
            Err(VariableError::MissingArgument)
        );
        assert_eq!(
            store.set(Some("k"), Some("   "), None),
            Err(VariableError::MissingArgument)
        );
        assert_eq!(
            store.set(Some("k"), None, None),
            Err(VariableError::MissingArgument)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn list_is_sorted_regardless_of_insertion_order() {
        let mut store = VariableStore::new();
        store.set(Some("zebra"), Some("z"), None).unwrap();
        store.set(Some("apple"), Some("a"), Some("fruit")).unwrap();
        store.set(Some("mango"), Some("m"), None).unwrap();

        assert_eq!(
            store.format_list(),
            "%apple = a — fruit\n%mango = m\n%zebra = z"
        );
    }

    #[test]
    fn empty_store_formats_fixed_message() {
        assert_eq!(VariableStore::new().format_list(), "No variables stored.");
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let mut store = VariableStore::new();
        store.set(Some("k"), Some("v"), None).unwrap();
        store.delete(Some("k")).unwrap();

        assert!(matches!(
            store.get(Some("k")),
            Err(VariableError::NotFound(key)) if key == "k"
        ));
    }

    #[test]
    fn delete_missing_key_and_unknown_key_fail() {
        let mut store = VariableStore::new();
        assert_eq!(store.delete(None), Err(VariableError::MissingKey));
        assert_eq!(
            store.delete(Some("ghost")),
            Err(VariableError::NotFound("ghost".to_string()))
        );
    }

    #[test]
    fn clear_empties_the_mapping() {
        let mut store = VariableStore::new();
        store.set(Some("k"), Some("v"), None).unwrap();
        store.clear();
        assert_eq!(store.format_list(), "No variables stored.");
    }

    #[test]
    fn reconstruct_applies_latest_snapshot() {
        let branch = vec![snapshot_entry(
            TOOL_NAME,
            json!({
                "office": { "value": "Plaza Mayor 2, Madrid", "description": "Office location" }
            }),
        )];

        let mut store = VariableStore::new();
        store.reconstruct(&branch);
        assert_eq!(
            store.format_list(),
            "%office = Plaza Mayor 2, Madrid — Office location"
        );
    }

    #[test]
    fn later_snapshot_replaces_earlier_not_merges() {
        let branch = vec![
            snapshot_entry(TOOL_NAME, json!({ "a": { "value": "1" } })),
            snapshot_entry(TOOL_NAME, json!({ "b": { "value": "2" } })),
        ];

        let mut store = VariableStore::new();
        store.reconstruct(&branch);
        assert!(store.get(Some("a")).is_err());
        assert_eq!(store.get(Some("b")).unwrap().value, "2");
    }

    #[test]
    fn empty_snapshot_after_clear_wins() {
        let branch = vec![
            snapshot_entry(TOOL_NAME, json!({ "a": { "value": "1" } })),
            snapshot_entry(TOOL_NAME, json!({})),
        ];

        let mut store = VariableStore::new();
        store.reconstruct(&branch);
        assert!(store.is_empty());
    }

    #[test]
    fn reconstruct_is_idempotent() {
        let branch = vec![
            snapshot_entry(TOOL_NAME, json!({ "a": { "value": "1" } })),
            snapshot_entry(TOOL_NAME, json!({ "a": { "value": "2" }, "b": { "value": "3" } })),
        ];

        let mut store = VariableStore::new();
        store.reconstruct(&branch);
        let first = store.snapshot();
        store.reconstruct(&branch);
        assert_eq!(store.snapshot(), first);
    }

    #[test]
    fn reconstruct_discards_prior_in_memory_state() {
        let mut store = VariableStore::new();
        store.set(Some("stale"), Some("x"), None).unwrap();

        store.reconstruct(&[]);
        assert!(store.is_empty());
    }

    #[test]
    fn reconstruct_skips_unrelated_entries() {
        let branch = vec![
            SessionEntry::Marker {
                label: "fork".to_string(),
            },
            snapshot_entry("exec", json!({ "a": { "value": "not ours" } })),
            snapshot_entry(TOOL_NAME, json!({ "ours": { "value": "1" } })),
            SessionEntry::tool_result(
                TOOL_NAME,
                &ToolOutput::ok("list", json!({ "action": "list" })),
            ),
        ];

        let mut store = VariableStore::new();
        store.reconstruct(&branch);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(Some("ours")).unwrap().value, "1");
    }

    #[test]
    fn reconstruct_skips_malformed_snapshots() {
        let branch = vec![
            snapshot_entry(TOOL_NAME, json!({ "good": { "value": "1" } })),
            snapshot_entry(TOOL_NAME, json!("not an object")),
        ];

        let mut store = VariableStore::new();
        store.reconstruct(&branch);
        assert_eq!(store.get(Some("good")).unwrap().value, "1");
    }
}
