// Per-day budget for scheduled iterations

use chrono::NaiveDate;
use std::sync::Mutex;

use crate::scope::Scope;

/// Counts scheduled iterations per scope for the current local day.
///
/// The counters reset the first time a new date is seen. Manual runs never
/// touch the budget.
#[derive(Debug, Default)]
pub struct DailyBudget {
    state: Mutex<BudgetState>,
}

#[derive(Debug, Default)]
struct BudgetState {
    day: Option<NaiveDate>,
    used: [u32; 3],
}

impl DailyBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve one iteration for `scope` on `today`.
    ///
    /// Returns `false` when `limit` iterations were already spent today.
    /// A `limit` of 0 means unlimited.
    pub fn try_acquire(&self, scope: Scope, limit: u32, today: NaiveDate) -> bool {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.day != Some(today) {
            state.day = Some(today);
            state.used = [0; 3];
        }

        let used = &mut state.used[scope.index()];
        if limit > 0 && *used >= limit {
            return false;
        }
        *used += 1;
        true
    }

    /// Give back one reservation for `scope`, e.g. when the iteration never
    /// reached the model.
    pub fn release(&self, scope: Scope) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let used = &mut state.used[scope.index()];
        *used = used.saturating_sub(1);
    }

    /// Iterations spent today for `scope` (as of the last `try_acquire`).
    pub fn used(&self, scope: Scope) -> u32 {
        let state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.used[scope.index()]
    }
}
