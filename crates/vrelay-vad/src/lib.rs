pub mod config;
pub mod constants;
pub mod energy;
pub mod engine;
pub mod gating;
pub mod types;

pub use config::VadGatingConfig;
pub use constants::{CHANNELS_MONO, FRAME_DURATION_MS, FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
pub use engine::{EnergyVadEngine, VadEngine};
pub use gating::VadGating;
pub use types::VadEvent;
