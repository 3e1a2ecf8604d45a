//! Host-provided process execution.
//!
//! Extensions never spawn processes themselves; they hand a program and
//! argument list to the host, which owns timeouts, sandboxing, and
//! cancellation. The trait is injected at extension construction time.

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

/// Result of a host-side command execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external commands on behalf of an extension.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;
}
