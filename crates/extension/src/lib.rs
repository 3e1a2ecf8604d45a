//! Host boundary for pinion extensions.
//!
//! Defines the contracts an extension programs against — tools, slash
//! commands, the host UI, the command runner, and the session history
//! model — plus a mock harness so extensions can be unit-tested without
//! a running host.

pub mod command;
pub mod extension;
pub mod harness;
pub mod host;
pub mod session;
pub mod tool;

pub use {
    command::{CommandContext, NotifyLevel, SlashCommand, Ui},
    extension::{Extension, ExtensionContext},
    host::{CommandRunner, ExecResult},
    session::{SessionEntry, SessionEvent, SessionMessage},
    tool::{ExtensionTool, ToolOutput},
};
