pub mod config;
pub mod domain;
pub mod languages;
pub mod orchestrator;
pub mod pipeline;

pub use config::RelayConfig;
pub use domain::RelayEvent;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use pipeline::AudioPipeline;
