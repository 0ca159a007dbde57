pub mod orchestrator;

pub use orchestrator::{ChatOrchestrator, ToolOutcome};
