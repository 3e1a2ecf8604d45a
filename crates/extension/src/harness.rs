//! In-process mock host for extension tests.
//!
//! Stands in for the real agent host: records registrations, owns an
//! in-memory session branch, and lets tests invoke tools, dispatch
//! commands, and fire lifecycle events without any runtime wiring.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
    serde_json::Value,
    tracing::debug,
};

use crate::{
    command::{CommandContext, NotifyLevel, SlashCommand, Ui},
    extension::{Extension, ExtensionContext},
    host::{CommandRunner, ExecResult},
    session::{SessionEntry, SessionEvent},
    tool::{ExtensionTool, ToolOutput},
};

// ── Mock UI ─────────────────────────────────────────────────────────────────

/// Recording [`Ui`] implementation.
#[derive(Default)]
pub struct MockUi {
    notifications: Mutex<Vec<(String, NotifyLevel)>>,
    statuses: Mutex<HashMap<String, String>>,
}

impl MockUi {
    /// All notifications shown so far, oldest first.
    pub fn notifications(&self) -> Vec<(String, NotifyLevel)> {
        self.notifications.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Current value of a status-line segment, if set.
    pub fn status(&self, key: &str) -> Option<String> {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl Ui for MockUi {
    fn notify(&self, message: &str, level: NotifyLevel) {
        self.notifications
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((message.to_string(), level));
    }

    fn set_status(&self, key: &str, text: &str) {
        self.statuses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), text.to_string());
    }
}

// ── Scripted command runner ─────────────────────────────────────────────────

/// [`CommandRunner`] that replays canned results and records invocations.
#[derive(Default)]
pub struct ScriptedRunner {
    results: Mutex<Vec<ExecResult>>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    /// Queue a result for the next invocation (FIFO).
    pub fn push(&self, result: ExecResult) {
        self.results
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result);
    }

    /// Shorthand for a zero-exit result with the given stdout.
    pub fn push_stdout(&self, stdout: impl Into<String>) {
        self.push(ExecResult {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        });
    }

    /// Every `(program, args)` pair run so far, oldest first.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push((
            program.to_string(),
            args.iter().map(|a| (*a).to_string()).collect(),
        ));
        let mut results = self.results.lock().unwrap_or_else(|e| e.into_inner());
        if results.is_empty() {
            bail!("no scripted result for `{program}`");
        }
        Ok(results.remove(0))
    }
}

// ── Harness ─────────────────────────────────────────────────────────────────

/// Mock host holding installed extensions and an in-memory session branch.
pub struct ExtensionHarness {
    extensions: Vec<Arc<dyn Extension>>,
    tools: HashMap<String, Arc<dyn ExtensionTool>>,
    commands: HashMap<String, Arc<dyn SlashCommand>>,
    entries: Vec<SessionEntry>,
    ui: MockUi,
    /// When set, commands are dispatched without a UI, like a headless host.
    pub headless: bool,
}

impl Default for ExtensionHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionHarness {
    pub fn new() -> Self {
        Self {
            extensions: Vec::new(),
            tools: HashMap::new(),
            commands: HashMap::new(),
            entries: Vec::new(),
            ui: MockUi::default(),
            headless: false,
        }
    }

    /// Install an extension, collecting its tools and commands.
    pub fn install(&mut self, extension: Arc<dyn Extension>) {
        for tool in extension.tools() {
            debug!(tool = tool.name(), "registering tool");
            self.tools.insert(tool.name().to_string(), tool);
        }
        for command in extension.commands() {
            self.commands.insert(command.name().to_string(), command);
        }
        self.extensions.push(extension);
    }

    /// Append an entry to the session branch.
    pub fn append(&mut self, entry: SessionEntry) {
        self.entries.push(entry);
    }

    /// Current branch, oldest first.
    pub fn branch(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn ui(&self) -> &MockUi {
        &self.ui
    }

    /// Fire a lifecycle event at every installed extension.
    pub async fn trigger(&self, event: SessionEvent) {
        let ctx = ExtensionContext {
            branch: &self.entries,
        };
        for extension in &self.extensions {
            extension.on_session_event(event, &ctx).await;
        }
    }

    /// Invoke a registered tool by name.
    pub async fn invoke_tool(&self, name: &str, params: Value) -> Result<ToolOutput> {
        let Some(tool) = self.tools.get(name) else {
            bail!("unknown tool: {name}");
        };
        tool.execute(params).await
    }

    /// Invoke a tool and append its result to the branch, as the real host
    /// does after every tool call.
    pub async fn invoke_and_record(&mut self, name: &str, params: Value) -> Result<ToolOutput> {
        let output = self.invoke_tool(name, params).await?;
        self.entries
            .push(SessionEntry::tool_result(name, &output));
        Ok(output)
    }

    /// Dispatch a slash command by name.
    pub async fn dispatch_command(&self, name: &str, args: &str) -> Result<()> {
        let Some(command) = self.commands.get(name) else {
            bail!("unknown command: {name}");
        };
        let ctx = CommandContext {
            ui: if self.headless { None } else { Some(&self.ui) },
        };
        command.run(args, &ctx).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl ExtensionTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input back."
        }

        fn parameters_schema(&self) -> Value {
            serde_json::json!({ "type": "object" })
        }

        async fn execute(&self, params: Value) -> Result<ToolOutput> {
            let text = params["text"].as_str().unwrap_or_default().to_string();
            Ok(ToolOutput::ok(text, params))
        }
    }

    struct EchoExtension;

    #[async_trait]
    impl Extension for EchoExtension {
        fn tools(&self) -> Vec<Arc<dyn ExtensionTool>> {
            vec![Arc::new(EchoTool)]
        }
    }

    #[tokio::test]
    async fn records_tool_results_into_branch() {
        let mut harness = ExtensionHarness::new();
        harness.install(Arc::new(EchoExtension));

        let output = harness
            .invoke_and_record("echo", serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert_eq!(output.text, "hi");
        assert_eq!(harness.branch().len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_invocation_error() {
        let harness = ExtensionHarness::new();
        assert!(harness
            .invoke_tool("nope", Value::Null)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn scripted_runner_replays_in_order() {
        let runner = ScriptedRunner::default();
        runner.push_stdout("first");
        runner.push_stdout("second");

        let a = runner.run("curl", &["-fsSL", "x"]).await.unwrap();
        let b = runner.run("curl", &["-fsSL", "y"]).await.unwrap();
        assert_eq!(a.stdout, "first");
        assert_eq!(b.stdout, "second");
        assert_eq!(runner.calls().len(), 2);

        assert!(runner.run("curl", &[]).await.is_err());
    }

    #[test]
    fn mock_ui_records_notifications_and_status() {
        let ui = MockUi::default();
        ui.notify("hello", NotifyLevel::Info);
        ui.set_status("weather", "Fetched");

        assert_eq!(ui.notifications(), vec![("hello".to_string(), NotifyLevel::Info)]);
        assert_eq!(ui.status("weather").as_deref(), Some("Fetched"));
        assert_eq!(ui.status("other"), None);
    }
}
