//! Slash commands and the host UI surface.

use {anyhow::Result, async_trait::async_trait};

/// Severity of a UI notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
    Success,
}

/// Host UI operations available to command handlers.
///
/// Implemented by the host frontend and injected via [`CommandContext`].
pub trait Ui: Send + Sync {
    /// Show a transient notification to the user.
    fn notify(&self, message: &str, level: NotifyLevel);

    /// Set a named status-line segment.
    fn set_status(&self, key: &str, text: &str);
}

/// Context handed to a command handler for one dispatch.
///
/// `ui` is `None` when the host runs headless; commands that only render
/// output should no-op in that case.
pub struct CommandContext<'a> {
    pub ui: Option<&'a dyn Ui>,
}

/// A user-invocable `/command` registered by an extension.
#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn run(&self, args: &str, ctx: &CommandContext<'_>) -> Result<()>;
}
