//! Session history model and lifecycle events.
//!
//! The host persists one JSON record per entry; extensions only ever see
//! an already-materialized, oldest-to-newest slice of the current branch.
//! Extensions that keep per-session state rebuild it from this slice on
//! every lifecycle event rather than persisting anything of their own.

use std::fmt;

use {
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

// ── History entries ─────────────────────────────────────────────────────────

/// One record in a session branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEntry {
    /// A persisted conversation message.
    Message { message: SessionMessage },
    /// Branch bookkeeping (fork points, labels). Not visible to the model
    /// and ignored by extensions.
    Marker { label: String },
}

/// A message stored in a session branch.
///
/// The `role` field determines the variant. `ToolResult` carries the
/// structured `details` payload a tool returned, which is what makes
/// replay-based state reconstruction possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum SessionMessage {
    User {
        content: String,
    },
    Assistant {
        content: String,
    },
    ToolResult {
        tool_name: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
        #[serde(default)]
        is_error: bool,
    },
}

impl SessionEntry {
    /// Build a history entry from a tool's output, as the host does after
    /// each tool call.
    pub fn tool_result(tool_name: impl Into<String>, output: &crate::tool::ToolOutput) -> Self {
        Self::Message {
            message: SessionMessage::ToolResult {
                tool_name: tool_name.into(),
                content: output.text.clone(),
                details: Some(output.details.clone()),
                is_error: output.is_error,
            },
        }
    }
}

// ── Lifecycle events ────────────────────────────────────────────────────────

/// Session lifecycle events extensions can subscribe to.
///
/// Every variant invalidates in-memory session state: handlers are expected
/// to discard what they hold and rebuild from the branch in the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    Start,
    Switch,
    Fork,
    TreeNavigation,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl SessionEvent {
    /// All variants, for iteration.
    pub const ALL: &'static [SessionEvent] = &[
        Self::Start,
        Self::Switch,
        Self::Fork,
        Self::TreeNavigation,
    ];
}
