//! Extensions for the pinion host.
//!
//! Two extensions live here: a per-session user variables store rebuilt
//! from conversation history, and a wttr.in weather lookup that shells out
//! through the host's command runner.

pub mod variables;
pub mod weather;

pub use {variables::VariablesExtension, weather::WeatherExtension};
