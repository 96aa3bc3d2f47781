//! Daily LLM spend ceiling (§4.9): the enrichment pool pauses, rather than
//! crashes, once a configured dollar ceiling is reached for the day, and
//! resumes automatically at the next UTC midnight.
//!
//! The LLM port (`krant_types::ports::LlmClient::analyze`) returns only raw
//! response text, with no per-call cost breakdown — so spend is tracked
//! against a configurable per-call estimate rather than a real invoice
//! amount. This is an explicit approximation, not a provider-reported cost.

use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

/// Estimated USD cost charged per `analyze` call when no real cost signal
/// is available from the provider.
const DEFAULT_ESTIMATED_COST_PER_CALL_USD: f64 = 0.01;

struct BudgetState {
    day: NaiveDate,
    spent_usd: f64,
}

pub struct BudgetTracker {
    daily_budget_usd: Option<f64>,
    estimated_cost_per_call_usd: f64,
    state: Mutex<BudgetState>,
}

impl BudgetTracker {
    pub fn new(daily_budget_usd: Option<f64>) -> Self {
        Self {
            daily_budget_usd,
            estimated_cost_per_call_usd: DEFAULT_ESTIMATED_COST_PER_CALL_USD,
            state: Mutex::new(BudgetState { day: Utc::now().date_naive(), spent_usd: 0.0 }),
        }
    }

    /// Whether the pool may dispatch another tick right now. Rolls spend
    /// over to zero on a new UTC day.
    pub async fn is_available(&self) -> bool {
        let Some(budget) = self.daily_budget_usd else { return true };
        let mut state = self.state.lock().await;
        self.roll_day_if_needed(&mut state);
        state.spent_usd < budget
    }

    /// Record one LLM call against today's spend.
    pub async fn charge_one_call(&self) {
        if self.daily_budget_usd.is_none() {
            return;
        }
        let mut state = self.state.lock().await;
        self.roll_day_if_needed(&mut state);
        state.spent_usd += self.estimated_cost_per_call_usd;
    }

    fn roll_day_if_needed(&self, state: &mut BudgetState) {
        let today = Utc::now().date_naive();
        if today != state.day {
            state.day = today;
            state.spent_usd = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unlimited_budget_is_always_available() {
        let tracker = BudgetTracker::new(None);
        for _ in 0..1000 {
            tracker.charge_one_call().await;
        }
        assert!(tracker.is_available().await);
    }

    #[tokio::test]
    async fn exhausts_after_enough_calls() {
        let tracker = BudgetTracker::new(Some(0.03));
        assert!(tracker.is_available().await);
        tracker.charge_one_call().await;
        tracker.charge_one_call().await;
        assert!(tracker.is_available().await);
        tracker.charge_one_call().await;
        assert!(!tracker.is_available().await);
    }
}
