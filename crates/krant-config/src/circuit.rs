//! `circuit.*` configuration (§6).

use crate::env::EnvConfigLoader;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitConfig {
    pub failure_threshold: u32,
    pub open_duration_seconds: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration_seconds: 300,
        }
    }
}

impl CircuitConfig {
    pub fn from_env(loader: &EnvConfigLoader) -> Self {
        let defaults = Self::default();
        Self {
            failure_threshold: loader
                .get_uint("circuit_failure_threshold")
                .map(|v| v as u32)
                .unwrap_or(defaults.failure_threshold),
            open_duration_seconds: loader
                .get_uint("circuit_open_duration_seconds")
                .unwrap_or(defaults.open_duration_seconds),
        }
    }
}
