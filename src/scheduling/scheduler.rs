// Autopilot scheduler
// periodic iteration of every scope

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::budget::DailyBudget;
use super::quiet::in_quiet;
use crate::config::{ConfigStore, PlannerConfig};
use crate::engine::Engine;
use crate::errors::{PlannerError, Result};
use crate::scope::Scope;

/// Source of the local wall-clock time used for quiet hours and the daily budget.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// Lifecycle of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No recurring job registered
    Stopped,
    /// Exactly one recurring job registered
    Running,
}

/// What one scheduled batch did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// The batch fell inside quiet hours and ran nothing
    pub quiet: bool,
    pub completed: Vec<Scope>,
    pub failed: Vec<Scope>,
    /// Scopes skipped because today's budget is spent
    pub rate_limited: Vec<Scope>,
}

/// Everything a batch needs, cheap to clone into spawned tasks.
#[derive(Clone)]
struct BatchRunner {
    engine: Arc<Engine>,
    budget: Arc<DailyBudget>,
    in_flight: Arc<AtomicBool>,
    clock: Clock,
}

/// Clears the in-flight flag even if the batch task panics.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BatchRunner {
    async fn run_all_scopes(&self, config: &PlannerConfig) -> BatchReport {
        let now = (self.clock)();
        let mut report = BatchReport::default();

        if in_quiet(&config.schedule, now.time()) {
            debug!(quiet_hours = %config.schedule.quiet_hours, "Inside quiet hours, skipping batch");
            report.quiet = true;
            return report;
        }

        for scope in Scope::SCHEDULED_ORDER {
            if !self
                .budget
                .try_acquire(scope, config.schedule.rate_limit_per_day, now.date())
            {
                info!(
                    scope = %scope,
                    limit = config.schedule.rate_limit_per_day,
                    "Daily budget spent, skipping scope"
                );
                report.rate_limited.push(scope);
                continue;
            }

            match self.engine.run_iteration(scope, config).await {
                Ok(result) => {
                    info!(scope = %scope, run_id = %result.run_id, "Scheduled iteration complete");
                    report.completed.push(scope);
                }
                Err(PlannerError::Validation(msg)) => {
                    warn!(scope = %scope, "Scheduled iteration skipped: {}", msg);
                    self.budget.release(scope);
                    report.failed.push(scope);
                }
                Err(e) => {
                    error!(scope = %scope, "Scheduled iteration failed: {}", e);
                    report.failed.push(scope);
                }
            }
        }

        report
    }

    /// Run a batch unless one is already in flight.
    async fn run_exclusive(&self, config: &PlannerConfig) -> Option<BatchReport> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("Previous batch still running, skipping this tick");
            return None;
        }
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));
        Some(self.run_all_scopes(config).await)
    }
}

/// Owns the autopilot timer and the config snapshot it runs with.
///
/// `start`, `reload` and `shutdown` must be called from within a tokio runtime.
pub struct PlannerScheduler {
    config_store: ConfigStore,
    runner: BatchRunner,
    config: Option<Arc<PlannerConfig>>,
    job: Option<JoinHandle<()>>,
}

impl PlannerScheduler {
    pub fn new(engine: Arc<Engine>, config_store: ConfigStore) -> Self {
        Self {
            config_store,
            runner: BatchRunner {
                engine,
                budget: Arc::new(DailyBudget::new()),
                in_flight: Arc::new(AtomicBool::new(false)),
                clock: system_clock(),
            },
            config: None,
            job: None,
        }
    }

    /// Replace the wall clock (tests pin it to a known time of day).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.runner.clock = clock;
        self
    }

    /// Load config and, if autopilot is enabled, register the recurring job.
    pub fn start(&mut self) -> Result<()> {
        let config = Arc::new(self.config_store.load()?);
        self.config = Some(Arc::clone(&config));

        if !config.schedule.autopilot {
            info!("Autopilot disabled, scheduler idle");
            return Ok(());
        }
        if self.job.is_none() {
            self.job = Some(self.spawn_job(config));
        }
        Ok(())
    }

    /// Re-read config and re-register the job so a new interval or toggle
    /// takes effect. Never leaves more than one job registered.
    ///
    /// A batch already in flight keeps the config it started with.
    pub fn reload(&mut self) -> Result<()> {
        let config = Arc::new(self.config_store.load()?);

        self.clear_job();
        self.config = Some(Arc::clone(&config));

        if config.schedule.autopilot {
            self.job = Some(self.spawn_job(config));
        } else {
            info!("Autopilot disabled by reload, scheduler idle");
        }
        Ok(())
    }

    /// Stop the timer without waiting for an in-flight batch.
    pub fn shutdown(&mut self) {
        if self.job.is_some() {
            self.clear_job();
            info!("Scheduler stopped");
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.job.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Number of registered recurring jobs (0 or 1).
    pub fn active_jobs(&self) -> usize {
        usize::from(self.job.is_some())
    }

    /// Config snapshot from the last `start`/`reload`.
    pub fn config(&self) -> Option<&PlannerConfig> {
        self.config.as_deref()
    }

    /// Run one batch immediately with the cached (or freshly loaded) config.
    ///
    /// Returns `None` if a batch is already in flight.
    pub async fn run_all_scopes(&self) -> Result<Option<BatchReport>> {
        let config = match &self.config {
            Some(config) => Arc::clone(config),
            None => Arc::new(self.config_store.load()?),
        };
        Ok(self.runner.run_exclusive(&config).await)
    }

    fn clear_job(&mut self) {
        if let Some(job) = self.job.take() {
            job.abort();
        }
    }

    fn spawn_job(&self, config: Arc<PlannerConfig>) -> JoinHandle<()> {
        let minutes = config.schedule.interval_minutes();
        let period = Duration::from_secs(minutes.saturating_mul(60));
        let runner = self.runner.clone();
        info!(interval_minutes = minutes, "Autopilot job registered");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // The batch runs detached so aborting this timer never cancels it.
                let runner = runner.clone();
                let config = Arc::clone(&config);
                tokio::spawn(async move {
                    if let Some(report) = runner.run_exclusive(&config).await {
                        debug!(?report, "Scheduled batch finished");
                    }
                });
            }
        })
    }
}

impl Drop for PlannerScheduler {
    fn drop(&mut self) {
        self.clear_job();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::prompts::PromptStore;
    use crate::providers::{ChatMessage, LlmProvider};
    use crate::storage::Storage;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// Records the scope of every call (via the goals text) and can fail on demand.
    struct ScriptedProvider {
        calls: Mutex<Vec<String>>,
        fail_when_contains: Option<String>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn generate(&self, messages: &[ChatMessage], _model: &ModelConfig) -> anyhow::Result<String> {
            let payload = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.calls.lock().unwrap().push(payload.clone());
            if let Some(needle) = &self.fail_when_contains {
                if payload.contains(needle.as_str()) {
                    anyhow::bail!("upstream timeout");
                }
            }
            Ok("# Plan".to_string())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct Fixture {
        scheduler: PlannerScheduler,
        provider: Arc<ScriptedProvider>,
        engine: Arc<Engine>,
        store: ConfigStore,
        _dir: tempfile::TempDir,
    }

    fn fixture(fail_when_contains: Option<&str>, clock_hour: u32) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(Storage::new(dir.path().join("data")));
        storage.init_dirs().unwrap();
        for scope in Scope::ALL {
            storage.write_goals(scope, &format!("goal-{}", scope)).unwrap();
        }
        let provider = Arc::new(ScriptedProvider {
            calls: Mutex::new(Vec::new()),
            fail_when_contains: fail_when_contains.map(str::to_string),
        });
        let engine = Arc::new(Engine::new(
            storage,
            PromptStore::new(dir.path().join("prompts")),
            provider.clone(),
        ));
        let store = ConfigStore::new(dir.path());
        let now = NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(clock_hour, 0, 0)
            .unwrap();
        let scheduler =
            PlannerScheduler::new(Arc::clone(&engine), store.clone()).with_clock(Arc::new(move || now));
        Fixture {
            scheduler,
            provider,
            engine,
            store,
            _dir: dir,
        }
    }

    fn set_config(store: &ConfigStore, f: impl FnOnce(&mut PlannerConfig)) {
        let mut config = store.load().unwrap();
        f(&mut config);
        store.save(&config).unwrap();
    }

    fn called_scopes(provider: &ScriptedProvider) -> Vec<String> {
        provider
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|payload| {
                payload
                    .lines()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_start_with_autopilot_disabled_registers_nothing() {
        let mut fx = fixture(None, 12);
        fx.scheduler.start().unwrap();
        assert_eq!(fx.scheduler.state(), SchedulerState::Stopped);
        assert_eq!(fx.scheduler.active_jobs(), 0);
        assert!(fx.scheduler.config().is_some());
    }

    #[tokio::test]
    async fn test_start_with_autopilot_enabled_runs() {
        let mut fx = fixture(None, 12);
        set_config(&fx.store, |c| c.schedule.autopilot = true);
        fx.scheduler.start().unwrap();
        assert_eq!(fx.scheduler.state(), SchedulerState::Running);
        fx.scheduler.shutdown();
        assert_eq!(fx.scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_reload_toggle_never_duplicates_jobs() {
        let mut fx = fixture(None, 12);
        set_config(&fx.store, |c| c.schedule.autopilot = true);
        fx.scheduler.start().unwrap();
        assert_eq!(fx.scheduler.active_jobs(), 1);

        set_config(&fx.store, |c| c.schedule.autopilot = false);
        fx.scheduler.reload().unwrap();
        assert_eq!(fx.scheduler.active_jobs(), 0);
        assert_eq!(fx.scheduler.state(), SchedulerState::Stopped);

        set_config(&fx.store, |c| c.schedule.autopilot = true);
        fx.scheduler.reload().unwrap();
        fx.scheduler.reload().unwrap();
        assert_eq!(fx.scheduler.active_jobs(), 1);
        assert_eq!(fx.scheduler.state(), SchedulerState::Running);
    }

    #[tokio::test]
    async fn test_reload_from_stopped_starts_job() {
        let mut fx = fixture(None, 12);
        fx.scheduler.start().unwrap();
        set_config(&fx.store, |c| {
            c.schedule.autopilot = true;
            c.schedule.poll_minutes = 1;
        });
        fx.scheduler.reload().unwrap();
        assert_eq!(fx.scheduler.state(), SchedulerState::Running);
        assert_eq!(fx.scheduler.config().unwrap().schedule.interval_minutes(), 5);
    }

    #[tokio::test]
    async fn test_batch_runs_longest_horizon_first() {
        let mut fx = fixture(None, 12);
        set_config(&fx.store, |c| c.schedule.rate_limit_per_day = 0);
        fx.scheduler.start().unwrap();

        let report = fx.scheduler.run_all_scopes().await.unwrap().unwrap();
        assert!(!report.quiet);
        assert_eq!(report.completed, vec![Scope::Yearly, Scope::Weekly, Scope::Daily]);
        assert_eq!(called_scopes(&fx.provider), vec!["yearly", "weekly", "daily"]);
    }

    #[tokio::test]
    async fn test_quiet_hours_skip_everything() {
        let mut fx = fixture(None, 3);
        fx.scheduler.start().unwrap();

        let report = fx.scheduler.run_all_scopes().await.unwrap().unwrap();
        assert!(report.quiet);
        assert!(report.completed.is_empty() && report.failed.is_empty());
        assert!(fx.provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_scope_failure_does_not_block_others() {
        let mut fx = fixture(Some("goal-weekly"), 12);
        fx.engine.storage().write_goals(Scope::Yearly, "").unwrap();
        fx.scheduler.start().unwrap();

        let report = fx.scheduler.run_all_scopes().await.unwrap().unwrap();
        assert_eq!(report.failed, vec![Scope::Yearly, Scope::Weekly]);
        assert_eq!(report.completed, vec![Scope::Daily]);
        assert!(fx
            .engine
            .storage()
            .read_current_run(Scope::Daily)
            .unwrap()
            .contains("# Plan"));
    }

    #[tokio::test]
    async fn test_daily_budget_limits_scheduled_runs() {
        let mut fx = fixture(None, 12);
        set_config(&fx.store, |c| c.schedule.rate_limit_per_day = 1);
        fx.scheduler.start().unwrap();

        let first = fx.scheduler.run_all_scopes().await.unwrap().unwrap();
        assert_eq!(first.completed.len(), 3);
        let second = fx.scheduler.run_all_scopes().await.unwrap().unwrap();
        assert!(second.completed.is_empty());
        assert_eq!(second.rate_limited, vec![Scope::Yearly, Scope::Weekly, Scope::Daily]);
    }

    #[tokio::test]
    async fn test_default_config_never_rate_limits() {
        let mut fx = fixture(None, 12);
        fx.scheduler.start().unwrap();

        for _ in 0..8 {
            let report = fx.scheduler.run_all_scopes().await.unwrap().unwrap();
            assert_eq!(report.completed.len(), 3);
            assert!(report.rate_limited.is_empty());
        }
    }

    #[tokio::test]
    async fn test_empty_goals_do_not_spend_budget() {
        let mut fx = fixture(None, 12);
        fx.engine.storage().write_goals(Scope::Weekly, "").unwrap();
        set_config(&fx.store, |c| c.schedule.rate_limit_per_day = 1);
        fx.scheduler.start().unwrap();

        let first = fx.scheduler.run_all_scopes().await.unwrap().unwrap();
        assert_eq!(first.failed, vec![Scope::Weekly]);

        fx.engine.storage().write_goals(Scope::Weekly, "goal-weekly").unwrap();
        let second = fx.scheduler.run_all_scopes().await.unwrap().unwrap();
        assert_eq!(second.completed, vec![Scope::Weekly]);
        assert_eq!(second.rate_limited, vec![Scope::Yearly, Scope::Daily]);
    }

    #[tokio::test]
    async fn test_oversized_poll_minutes_is_rejected_before_reload() {
        let mut fx = fixture(None, 12);
        fx.scheduler.start().unwrap();

        let mut config = fx.store.load().unwrap();
        config.schedule.autopilot = true;
        config.schedule.poll_minutes = u64::MAX / 2;
        assert!(matches!(fx.store.save(&config), Err(PlannerError::Validation(_))));

        fx.scheduler.reload().unwrap();
        assert_eq!(fx.scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_interval() {
        let mut fx = fixture(None, 12);
        set_config(&fx.store, |c| {
            c.schedule.autopilot = true;
            c.schedule.poll_minutes = 10;
            c.schedule.rate_limit_per_day = 0;
        });
        fx.scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_secs(9 * 60)).await;
        assert!(fx.provider.calls.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2 * 60)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(fx.provider.calls.lock().unwrap().len(), 3);

        fx.scheduler.shutdown();
        tokio::time::sleep(Duration::from_secs(60 * 60)).await;
        assert_eq!(fx.provider.calls.lock().unwrap().len(), 3);
    }
}
