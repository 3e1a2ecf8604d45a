//! Tool contract between extensions and the host agent loop.

use {anyhow::Result, async_trait::async_trait, serde_json::Value};

/// Output of a tool invocation.
///
/// `text` is the human-readable result shown in the transcript. `details`
/// is a structured payload the host persists verbatim alongside the entry,
/// which is how extensions get state back out of history later (see
/// [`crate::session::SessionMessage::ToolResult`]).
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub text: String,
    pub details: Value,
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful output with a structured details payload.
    pub fn ok(text: impl Into<String>, details: Value) -> Self {
        Self {
            text: text.into(),
            details,
            is_error: false,
        }
    }

    /// Failed output. Domain failures are reported this way, not as `Err`:
    /// the invocation itself succeeded, the operation did not.
    pub fn error(text: impl Into<String>, details: Value) -> Self {
        Self {
            text: text.into(),
            details,
            is_error: true,
        }
    }
}

/// A tool an extension exposes to the agent.
///
/// `execute` returns `Err` only for malformed invocations (unparseable
/// parameters); expected domain failures come back as [`ToolOutput`] with
/// `is_error` set, so the host can persist them like any other result.
#[async_trait]
pub trait ExtensionTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, params: Value) -> Result<ToolOutput>;
}
