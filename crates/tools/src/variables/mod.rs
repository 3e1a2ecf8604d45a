//! Per-session user variables.
//!
//! Exposes a `variables` tool (list/get/set/delete/clear), a `/vars`
//! command, and session-lifecycle handling that rebuilds the mapping from
//! conversation history whenever the host starts, switches, forks, or
//! navigates sessions. See [`store`] for the replay model.

pub mod store;

use std::sync::{Arc, Mutex, MutexGuard};

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
    tracing::debug,
};

use pinion_extension::{
    command::{CommandContext, NotifyLevel, SlashCommand},
    extension::{Extension, ExtensionContext},
    session::SessionEvent,
    tool::{ExtensionTool, ToolOutput},
};

use store::{VariableError, VariableMap, VariableStore, normalize_key};

/// Tool name; reconstruction matches history entries against this.
pub const TOOL_NAME: &str = "variables";

/// Slash command name.
pub const COMMAND_NAME: &str = "vars";

// ── Wire types ──────────────────────────────────────────────────────────────

/// The five tool actions, dispatched exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableAction {
    List,
    Get,
    Set,
    Delete,
    Clear,
}

#[derive(Debug, Deserialize)]
struct VariableParams {
    action: VariableAction,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Structured payload attached to every tool result.
///
/// `variables` always holds the full post-operation mapping; this is what
/// [`VariableStore::reconstruct`] reads back out of history.
#[derive(Debug, Serialize)]
struct VariableDetails {
    action: VariableAction,
    variables: VariableMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

// ── Extension ───────────────────────────────────────────────────────────────

/// The variables extension. State is shared between the tool, the command,
/// and the event handler; the host guarantees at most one operation runs at
/// a time, so the mutex is never contended.
pub struct VariablesExtension {
    state: Arc<Mutex<VariableStore>>,
}

impl Default for VariablesExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl VariablesExtension {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(VariableStore::new())),
        }
    }
}

fn lock(state: &Mutex<VariableStore>) -> MutexGuard<'_, VariableStore> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Extension for VariablesExtension {
    fn tools(&self) -> Vec<Arc<dyn ExtensionTool>> {
        vec![Arc::new(VariablesTool {
            state: Arc::clone(&self.state),
        })]
    }

    fn commands(&self) -> Vec<Arc<dyn SlashCommand>> {
        vec![Arc::new(VarsCommand {
            state: Arc::clone(&self.state),
        })]
    }

    async fn on_session_event(&self, event: SessionEvent, ctx: &ExtensionContext<'_>) {
        debug!(%event, "rebuilding variables from session history");
        lock(&self.state).reconstruct(ctx.branch);
    }
}

// ── Tool ────────────────────────────────────────────────────────────────────

struct VariablesTool {
    state: Arc<Mutex<VariableStore>>,
}

fn display_key(key: &Option<String>) -> &str {
    key.as_deref().unwrap_or_default()
}

#[async_trait]
impl ExtensionTool for VariablesTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Store and retrieve user variables. Actions: list, get (key), \
         set (key+value+description), delete (key), clear. \
         Use %prefix to refer to variables."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["action"],
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list", "get", "set", "delete", "clear"],
                    "description": "The operation to perform"
                },
                "key": {
                    "type": "string",
                    "description": "Variable name (for get, set, delete)"
                },
                "value": {
                    "type": "string",
                    "description": "Variable value (for set)"
                },
                "description": {
                    "type": "string",
                    "description": "Optional description (for set)"
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let params: VariableParams = serde_json::from_value(params)?;
        let key = normalize_key(params.key.as_deref());
        let value = params
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let description = params
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let mut store = lock(&self.state);
        let mut details = VariableDetails {
            action: params.action,
            variables: store.snapshot(),
            key: key.clone(),
            value: value.clone(),
            description: description.clone(),
            error: None,
        };

        match params.action {
            VariableAction::List => {
                let text = store.format_list();
                Ok(ToolOutput::ok(text, serde_json::to_value(details)?))
            },

            VariableAction::Get => match store.get(key.as_deref()) {
                Ok(entry) => {
                    let suffix = entry
                        .description
                        .as_deref()
                        .map(|d| format!(" ({d})"))
                        .unwrap_or_default();
                    let text = format!(
                        "Stored value for \"%{}\": {}{suffix}",
                        display_key(&key),
                        entry.value
                    );
                    details.value = Some(entry.value.clone());
                    details.description = entry.description.clone();
                    Ok(ToolOutput::ok(text, serde_json::to_value(details)?))
                },
                Err(err) => {
                    details.error = Some(err.tag());
                    let text = match &err {
                        VariableError::NotFound(name) => {
                            format!("No stored value for \"%{name}\".")
                        },
                        _ => "Error: key required for get".to_string(),
                    };
                    Ok(ToolOutput::error(text, serde_json::to_value(details)?))
                },
            },

            VariableAction::Set => {
                match store.set(key.as_deref(), value.as_deref(), description.as_deref()) {
                    Ok(()) => {
                        details.variables = store.snapshot();
                        let text = format!("Saved \"%{}\".", display_key(&key));
                        Ok(ToolOutput::ok(text, serde_json::to_value(details)?))
                    },
                    Err(err) => {
                        details.error = Some(err.tag());
                        Ok(ToolOutput::error(
                            "Error: key and value required for set",
                            serde_json::to_value(details)?,
                        ))
                    },
                }
            },

            VariableAction::Delete => match store.delete(key.as_deref()) {
                Ok(()) => {
                    details.variables = store.snapshot();
                    let text = format!("Removed \"%{}\".", display_key(&key));
                    Ok(ToolOutput::ok(text, serde_json::to_value(details)?))
                },
                Err(err) => {
                    details.error = Some(err.tag());
                    let text = match &err {
                        VariableError::NotFound(name) => {
                            format!("\"%{name}\" was not stored.")
                        },
                        _ => "Error: key required for delete".to_string(),
                    };
                    Ok(ToolOutput::error(text, serde_json::to_value(details)?))
                },
            },

            VariableAction::Clear => {
                store.clear();
                details.variables = store.snapshot();
                Ok(ToolOutput::ok(
                    "Cleared all variables.",
                    serde_json::to_value(details)?,
                ))
            },
        }
    }
}

// ── Command ─────────────────────────────────────────────────────────────────

struct VarsCommand {
    state: Arc<Mutex<VariableStore>>,
}

#[async_trait]
impl SlashCommand for VarsCommand {
    fn name(&self) -> &str {
        COMMAND_NAME
    }

    fn description(&self) -> &str {
        "Show stored variables. Usage: /vars"
    }

    async fn run(&self, _args: &str, ctx: &CommandContext<'_>) -> Result<()> {
        let Some(ui) = ctx.ui else {
            return Ok(());
        };
        let text = lock(&self.state).format_list();
        ui.notify(&text, NotifyLevel::Info);
        Ok(())
    }
}
