//! Scenario definitions and the orchestrator that runs them.

pub mod catalog;
pub mod orchestrator;
pub mod types;

pub use orchestrator::Orchestrator;
pub use types::{
    MarkerKind, Outcome, Scenario, ScenarioBuilder, ScenarioState, Stage, Step, Terminal,
    TerminalMarker,
};
