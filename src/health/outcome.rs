// src/health/outcome.rs
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    Success,
    Failure,
}

/// Outcome of a single probe execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub status: ProbeStatus,
    /// Error text for a failed probe, empty otherwise.
    pub detail: String,
    pub latency_seconds: f64,
    pub observed_at: DateTime<Utc>,
    pub notes: String,
}

impl ProbeOutcome {
    pub fn success(notes: impl Into<String>, latency_seconds: f64) -> Self {
        Self {
            status: ProbeStatus::Success,
            detail: String::new(),
            latency_seconds,
            observed_at: Utc::now(),
            notes: notes.into(),
        }
    }

    pub fn failure(
        notes: impl Into<String>,
        latency_seconds: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            status: ProbeStatus::Failure,
            detail: detail.into(),
            latency_seconds,
            observed_at: Utc::now(),
            notes: notes.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ProbeStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    Success,
    Failure,
    /// No background cycle has completed yet.
    Pending,
}

/// HTTP codes and status labels used when building aggregate results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPolicy {
    pub success_code: u16,
    pub error_code: u16,
    pub pending_code: u16,
    pub success_label: String,
    pub error_label: String,
    pub pending_label: String,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            success_code: 200,
            error_code: 503,
            pending_code: 202,
            success_label: "ok".to_string(),
            error_label: "error".to_string(),
            pending_label: "pending".to_string(),
        }
    }
}

impl StatusPolicy {
    pub fn code_for(&self, status: OverallStatus) -> u16 {
        match status {
            OverallStatus::Success => self.success_code,
            OverallStatus::Failure => self.error_code,
            OverallStatus::Pending => self.pending_code,
        }
    }

    pub fn label_for(&self, status: OverallStatus) -> &str {
        match status {
            OverallStatus::Success => &self.success_label,
            OverallStatus::Failure => &self.error_label,
            OverallStatus::Pending => &self.pending_label,
        }
    }
}

/// Combined status of every probe for one execution cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub status: OverallStatus,
    pub http_status: u16,
    pub checks: BTreeMap<String, ProbeOutcome>,
}

impl AggregateResult {
    /// Sentinel held by the cache before the first refresh completes.
    pub fn pending(policy: &StatusPolicy) -> Self {
        Self {
            status: OverallStatus::Pending,
            http_status: policy.pending_code,
            checks: BTreeMap::new(),
        }
    }

    /// Fold probe outcomes into one result. A single failure makes the whole
    /// result a failure, regardless of order.
    pub fn from_outcomes<I>(outcomes: I, policy: &StatusPolicy) -> Self
    where
        I: IntoIterator<Item = (String, ProbeOutcome)>,
    {
        let mut status = OverallStatus::Success;
        let mut checks = BTreeMap::new();

        for (name, outcome) in outcomes {
            if !outcome.is_success() {
                status = OverallStatus::Failure;
            }
            checks.insert(name, outcome);
        }

        Self {
            status,
            http_status: policy.code_for(status),
            checks,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OverallStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == OverallStatus::Success
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = (&str, &ProbeOutcome)> {
        self.checks
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(name, outcome)| (name.as_str(), outcome))
    }
}
