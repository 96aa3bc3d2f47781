//! Named circuit breaker (C1): three states, phase-based locking so no lock
//! is ever held across an `.await` of the wrapped operation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use krant_config::CircuitConfig;
use krant_types::error::{KrantError, Result};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

enum Inner {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { probe_in_flight: bool },
}

impl Inner {
    fn public_state(&self) -> CircuitState {
        match self {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

/// A single named breaker guarding calls to one domain/provider.
pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    state: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(Inner::Closed { consecutive_failures: 0 }),
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.lock().await.public_state()
    }

    /// Run `op` through the breaker. Fails fast with `CircuitOpen` without
    /// invoking `op` at all when the breaker is open and the cooldown has
    /// not elapsed.
    pub async fn call<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Phase 1: decide whether to proceed, transitioning Open -> HalfOpen
        // if the cooldown elapsed. No operation runs while holding this lock.
        {
            let mut state = self.state.lock().await;
            match &*state {
                Inner::Open { opened_at } => {
                    let cooldown = Duration::from_secs(self.config.open_duration_seconds);
                    if opened_at.elapsed() < cooldown {
                        return Err(KrantError::CircuitOpen { name: self.name.clone() });
                    }
                    info!(breaker = %self.name, "circuit breaker probing half-open");
                    *state = Inner::HalfOpen { probe_in_flight: true };
                }
                Inner::HalfOpen { probe_in_flight: true } => {
                    // A probe is already in flight; reject concurrent callers.
                    return Err(KrantError::CircuitOpen { name: self.name.clone() });
                }
                Inner::HalfOpen { probe_in_flight: false } => {
                    *state = Inner::HalfOpen { probe_in_flight: true };
                }
                Inner::Closed { .. } => {}
            }
        } // lock dropped

        // Phase 2: run the operation with no lock held.
        let outcome = op().await;

        // Phase 3: record the result.
        let mut state = self.state.lock().await;
        match (&*state, &outcome) {
            (Inner::HalfOpen { .. }, Ok(_)) => {
                info!(breaker = %self.name, "circuit breaker closing after successful probe");
                *state = Inner::Closed { consecutive_failures: 0 };
            }
            (Inner::HalfOpen { .. }, Err(_)) => {
                warn!(breaker = %self.name, "circuit breaker reopening after failed probe");
                *state = Inner::Open { opened_at: Instant::now() };
            }
            (Inner::Closed { consecutive_failures }, Err(_)) => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    warn!(breaker = %self.name, failures, "circuit breaker opening");
                    *state = Inner::Open { opened_at: Instant::now() };
                } else {
                    *state = Inner::Closed { consecutive_failures: failures };
                }
            }
            (Inner::Closed { .. }, Ok(_)) => {
                *state = Inner::Closed { consecutive_failures: 0 };
            }
            (Inner::Open { .. }, _) => unreachable!("phase 1 never leaves the breaker Open before phase 2 runs"),
        }

        outcome
    }
}

/// Registry of named breakers, one per domain/provider, created lazily.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: CircuitConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitConfig) -> Self {
        Self { breakers: DashMap::new(), config }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.config)))
            .clone()
    }

    /// Snapshot the state of every breaker created so far, keyed by name.
    /// Collects the `Arc` handles out of the map first so no `.await` ever
    /// runs while a `DashMap` shard lock is held.
    pub async fn states(&self) -> HashMap<String, CircuitState> {
        let entries: Vec<(String, Arc<CircuitBreaker>)> =
            self.breakers.iter().map(|e| (e.key().clone(), e.value().clone())).collect();
        let mut out = HashMap::with_capacity(entries.len());
        for (name, breaker) in entries {
            out.insert(name, breaker.state().await);
        }
        out
    }

    /// The consecutive-failure count that opens a breaker, as configured.
    pub fn failure_threshold(&self) -> u32 {
        self.config.failure_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitConfig {
        CircuitConfig { failure_threshold: 5, open_duration_seconds: 300 }
    }

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new("nu.nl", fast_config());
        for _ in 0..5 {
            let result: Result<()> = breaker.call(|| async { Err(KrantError::Network("boom".into())) }).await;
            assert!(result.is_err());
        }
        assert_eq!(breaker.state().await, CircuitState::Open);

        // 6th call fails fast without invoking the operation.
        let invoked = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let invoked2 = invoked.clone();
        let result: Result<()> = breaker
            .call(move || {
                invoked2.store(true, std::sync::atomic::Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;
        assert!(matches!(result, Err(KrantError::CircuitOpen { .. })));
        assert!(!invoked.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new("ad.nl", fast_config());
        for _ in 0..4 {
            let _: Result<()> = breaker.call(|| async { Err(KrantError::Network("boom".into())) }).await;
        }
        let _: Result<()> = breaker.call(|| async { Ok(()) }).await;
        assert_eq!(breaker.state().await, CircuitState::Closed);

        for _ in 0..4 {
            let _: Result<()> = breaker.call(|| async { Err(KrantError::Network("boom".into())) }).await;
        }
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
