// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod settings;

pub use loader::ConfigStore;
pub use settings::{ModelConfig, PlannerConfig, Provider, ScheduleConfig};
