// Autonomous scheduling
//
// Runs planning iterations for every scope on a timer, outside quiet hours,
// without user involvement.

pub mod budget;
pub mod quiet;
pub mod scheduler;

pub use budget::DailyBudget;
pub use quiet::{in_quiet, QuietWindow};
pub use scheduler::{BatchReport, Clock, PlannerScheduler, SchedulerState};
