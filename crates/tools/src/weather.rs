//! Weather lookups via wttr.in.
//!
//! Thin adapter over `curl` run through the host's [`CommandRunner`]; the
//! host owns timeouts, retries, and cancellation. Exposes a `weather` tool
//! and a `/weather` command, both metric.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::debug,
};

use pinion_extension::{
    command::{CommandContext, NotifyLevel, SlashCommand},
    extension::Extension,
    host::CommandRunner,
    tool::{ExtensionTool, ToolOutput},
};

/// Tool and status-segment name.
pub const TOOL_NAME: &str = "weather";

pub const DEFAULT_LOCATION: &str = "Torrejón de Ardoz";

/// wttr.in one-line format.
const DEFAULT_FORMAT: &str = "3";

const FAILURE_MESSAGE: &str = "Weather lookup failed.";

// ── Lookup ──────────────────────────────────────────────────────────────────

struct Lookup {
    output: String,
    stderr: String,
    exit_code: i32,
    url: String,
}

impl Lookup {
    fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn failure_message(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() { FAILURE_MESSAGE } else { stderr }
    }

    fn display_output(&self) -> &str {
        if self.output.is_empty() {
            "(no output)"
        } else {
            &self.output
        }
    }
}

async fn run_lookup(
    runner: &dyn CommandRunner,
    location: Option<&str>,
    format: Option<&str>,
) -> Result<Lookup> {
    let location = location
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LOCATION);
    let format = format
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FORMAT);
    let url = format!(
        "https://wttr.in/{}?format={}&m",
        urlencoding::encode(location),
        urlencoding::encode(format)
    );
    debug!(%url, "weather lookup");

    let result = runner.run("curl", &["-fsSL", &url]).await?;
    Ok(Lookup {
        output: result.stdout.trim().to_string(),
        stderr: result.stderr,
        exit_code: result.exit_code,
        url,
    })
}

// ── Extension ───────────────────────────────────────────────────────────────

/// The weather extension. The command runner is injected by the host at
/// construction time.
pub struct WeatherExtension {
    runner: Arc<dyn CommandRunner>,
}

impl WeatherExtension {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Extension for WeatherExtension {
    fn tools(&self) -> Vec<Arc<dyn ExtensionTool>> {
        vec![Arc::new(WeatherTool {
            runner: Arc::clone(&self.runner),
        })]
    }

    fn commands(&self) -> Vec<Arc<dyn SlashCommand>> {
        vec![Arc::new(WeatherCommand {
            runner: Arc::clone(&self.runner),
        })]
    }
}

// ── Tool ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WeatherParams {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

struct WeatherTool {
    runner: Arc<dyn CommandRunner>,
}

#[async_trait]
impl ExtensionTool for WeatherTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Get current weather or a short forecast via wttr.in (metric units)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name, ZIP, or lat,lon. Defaults to Torrejón de Ardoz."
                },
                "format": {
                    "type": "string",
                    "description": "wttr.in format string. Default is '3'; try 'v2' for details."
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput> {
        let params: WeatherParams = serde_json::from_value(params)?;
        let lookup = run_lookup(
            self.runner.as_ref(),
            params.location.as_deref(),
            params.format.as_deref(),
        )
        .await?;

        if !lookup.success() {
            let message = lookup.failure_message().to_string();
            return Ok(ToolOutput::error(
                message,
                json!({
                    "url": lookup.url,
                    "exit_code": lookup.exit_code,
                    "stderr": lookup.stderr,
                }),
            ));
        }

        let text = lookup.display_output().to_string();
        Ok(ToolOutput::ok(
            text,
            json!({ "url": lookup.url, "exit_code": lookup.exit_code }),
        ))
    }
}

// ── Command ─────────────────────────────────────────────────────────────────

struct WeatherCommand {
    runner: Arc<dyn CommandRunner>,
}

#[async_trait]
impl SlashCommand for WeatherCommand {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Show weather (metric units). Usage: /weather [location] [format]"
    }

    async fn run(&self, args: &str, ctx: &CommandContext<'_>) -> Result<()> {
        let Some(ui) = ctx.ui else {
            return Ok(());
        };

        let mut parts = args.split_whitespace();
        let location = parts.next();
        let format = parts.next();

        let lookup = run_lookup(self.runner.as_ref(), location, format).await?;
        if !lookup.success() {
            ui.notify(lookup.failure_message(), NotifyLevel::Error);
            return Ok(());
        }

        ui.notify(lookup.display_output(), NotifyLevel::Info);
        ui.set_status(TOOL_NAME, &format!("Fetched {}", lookup.url));
        Ok(())
    }
}
