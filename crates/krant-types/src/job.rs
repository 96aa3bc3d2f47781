//! The `ScrapingJob` entity: one tracked run of the scraping service (C8).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapingMethod {
    Rss,
    Html,
    Browser,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingJob {
    pub id: i64,
    pub job_uuid: Uuid,
    pub source: String,
    pub method: ScrapingMethod,
    pub state: JobState,

    pub articles_found: u32,
    pub articles_new: u32,
    pub articles_updated: u32,
    pub articles_skipped: u32,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub execution_time_ms: Option<u64>,

    pub error: Option<String>,
    pub error_code: Option<ErrorCode>,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl ScrapingJob {
    pub fn new(source: impl Into<String>, method: ScrapingMethod) -> Self {
        Self {
            id: 0,
            job_uuid: Uuid::new_v4(),
            source: source.into(),
            method,
            state: JobState::Pending,
            articles_found: 0,
            articles_new: 0,
            articles_updated: 0,
            articles_skipped: 0,
            started_at: None,
            completed_at: None,
            execution_time_ms: None,
            error: None,
            error_code: None,
            retry_count: 0,
            max_retries: 3,
        }
    }

    pub fn start(&mut self, at: DateTime<Utc>) {
        self.state = JobState::Running;
        self.started_at = Some(at);
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.state = JobState::Completed;
        self.completed_at = Some(at);
        if let Some(started) = self.started_at {
            self.execution_time_ms = Some((at - started).num_milliseconds().max(0) as u64);
        }
    }

    pub fn fail(&mut self, code: ErrorCode, message: impl Into<String>, at: DateTime<Utc>) {
        self.state = JobState::Failed;
        self.completed_at = Some(at);
        self.error_code = Some(code);
        self.error = Some(message.into());
        if let Some(started) = self.started_at {
            self.execution_time_ms = Some((at - started).num_milliseconds().max(0) as u64);
        }
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.state = JobState::Cancelled;
        self.completed_at = Some(at);
    }

    /// Whether this job's failure should be retried given its own counters.
    pub fn should_retry(&self) -> bool {
        self.state == JobState::Failed && self.retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_tracks_timing() {
        let mut job = ScrapingJob::new("nu.nl", ScrapingMethod::Rss);
        let t0 = Utc::now();
        job.start(t0);
        assert_eq!(job.state, JobState::Running);
        let t1 = t0 + chrono::Duration::milliseconds(250);
        job.complete(t1);
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.execution_time_ms, Some(250));
    }

    #[test]
    fn retry_respects_max_retries() {
        let mut job = ScrapingJob::new("nu.nl", ScrapingMethod::Html);
        job.max_retries = 1;
        job.fail(ErrorCode::Network, "boom", Utc::now());
        assert!(job.should_retry());
        job.retry_count = 1;
        assert!(!job.should_retry());
    }
}
