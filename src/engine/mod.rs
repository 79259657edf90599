// Iteration engine
// produces one new plan for a scope
//
// Reads goals, the previous plan and feedback from storage, asks the LLM for a
// refined plan and writes it back as the scope's current run.

pub mod prompt;

use chrono::Local;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::PlannerConfig;
use crate::errors::{PlannerError, Result};
use crate::prompts::PromptStore;
use crate::providers::LlmProvider;
use crate::scope::Scope;
use crate::storage::Storage;

pub use prompt::{compose_messages, compose_user_payload, PlanContext};

/// Outcome of a successful iteration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IterationResult {
    pub scope: Scope,
    pub run_id: String,
    /// Completion time, ISO-8601 to the second
    pub ts: String,
    pub plan_markdown: String,
}

/// Runs planning iterations. Shared by the scheduler and the HTTP handlers.
pub struct Engine {
    storage: Arc<Storage>,
    prompts: PromptStore,
    provider: Arc<dyn LlmProvider>,
    /// Per-scope run locks, only taken when `schedule.exclusive_runs` is set
    run_locks: [Mutex<()>; 3],
}

impl Engine {
    pub fn new(storage: Arc<Storage>, prompts: PromptStore, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            storage,
            prompts,
            provider,
            run_locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        }
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Generate and persist a new plan for `scope` using `config`.
    ///
    /// Fails with `PlannerError::Validation` (and writes nothing) when the
    /// scope has no goals. The previous current run is overwritten, not
    /// archived. Without `exclusive_runs`, concurrent iterations of the same
    /// scope race and the last write wins.
    pub async fn run_iteration(&self, scope: Scope, config: &PlannerConfig) -> Result<IterationResult> {
        let _guard = if config.schedule.exclusive_runs {
            Some(self.run_locks[scope.index()].lock().await)
        } else {
            None
        };

        let prompts = self.prompts.load()?;
        let goals = self.storage.read_goals(scope)?;
        if goals.trim().is_empty() {
            return Err(PlannerError::empty_goals(scope));
        }
        let previous_plan = self.storage.read_current_run(scope)?;
        let feedback = self.storage.read_feedback(scope)?;

        let ctx = PlanContext {
            scope,
            goals: &goals,
            previous_plan: &previous_plan,
            feedback: &feedback,
        };
        let messages = compose_messages(&prompts, &ctx);

        tracing::info!(
            scope = %scope,
            provider = self.provider.name(),
            model = %config.model.model_name,
            "Starting iteration"
        );
        let reply = self
            .provider
            .generate(&messages, &config.model)
            .await
            .map_err(PlannerError::Upstream)?;

        let run_id = new_run_id(scope);
        self.storage.write_current_run(scope, &reply, &run_id)?;
        tracing::info!(scope = %scope, run_id = %run_id, chars = reply.len(), "Iteration complete");

        Ok(IterationResult {
            scope,
            run_id,
            ts: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            plan_markdown: reply,
        })
    }
}

/// `{Initial}-{YYYYMMDDHHMM}` in local time.
pub fn new_run_id(scope: Scope) -> String {
    format!("{}-{}", scope.initial(), Local::now().format("%Y%m%d%H%M"))
}
