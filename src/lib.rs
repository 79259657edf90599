// Overthinker - autonomous planner for daily, weekly and yearly goals
// Library exports

pub mod config;
pub mod engine;
pub mod errors;
pub mod prompts;
pub mod providers;
pub mod scheduling;
pub mod scope;
pub mod server;
pub mod storage;

pub use errors::PlannerError;
pub use scope::Scope;
