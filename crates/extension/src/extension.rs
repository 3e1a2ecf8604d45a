//! Extension registration surface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    command::SlashCommand,
    session::{SessionEntry, SessionEvent},
    tool::ExtensionTool,
};

/// Extension-visible view of the host at event time.
pub struct ExtensionContext<'a> {
    /// Current branch of session history, oldest first.
    pub branch: &'a [SessionEntry],
}

/// A unit of host functionality: some tools, some commands, and optional
/// session-lifecycle handling.
///
/// The host collects `tools()` and `commands()` once at load time and keeps
/// the extension itself alive for event delivery, so stateful extensions
/// hand out `Arc`-backed handles that share state with the extension.
#[async_trait]
pub trait Extension: Send + Sync {
    /// Tools this extension contributes to the agent.
    fn tools(&self) -> Vec<Arc<dyn ExtensionTool>>;

    /// Slash commands this extension contributes to the UI.
    fn commands(&self) -> Vec<Arc<dyn SlashCommand>> {
        Vec::new()
    }

    /// Called on every session lifecycle event, after the host has
    /// materialized the new branch.
    async fn on_session_event(&self, _event: SessionEvent, _ctx: &ExtensionContext<'_>) {}
}
