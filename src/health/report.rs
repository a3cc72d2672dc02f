// src/health/report.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::outcome::{AggregateResult, StatusPolicy};

/// Wire shape of a health response body.
#[derive(Debug, Serialize)]
pub struct HealthReport<'a> {
    pub status: &'a str,
    pub checks: BTreeMap<&'a str, CheckReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct CheckReport<'a> {
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub result: &'a str,
    /// Success label, or the failure text of a failed check.
    pub status: &'a str,
    pub exec: f64,
    pub notes: &'a str,
}

/// Body sent when the report itself could not be encoded.
#[derive(Debug, Serialize)]
pub struct ErrorReport<'a> {
    pub status: &'a str,
    pub error: String,
    pub checks: &'a str,
}

impl<'a> HealthReport<'a> {
    pub fn new(result: &'a AggregateResult, policy: &'a StatusPolicy) -> Self {
        let checks = result
            .checks
            .iter()
            .map(|(name, outcome)| {
                let (result, status) = if outcome.is_success() {
                    (policy.success_label.as_str(), policy.success_label.as_str())
                } else {
                    (policy.error_label.as_str(), outcome.detail.as_str())
                };

                let report = CheckReport {
                    time: outcome.observed_at,
                    result,
                    status,
                    exec: outcome.latency_seconds,
                    notes: &outcome.notes,
                };
                (name.as_str(), report)
            })
            .collect();

        Self {
            status: policy.label_for(result.status),
            checks,
        }
    }
}

impl<'a> ErrorReport<'a> {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            status: "error",
            error: error.to_string(),
            checks: "",
        }
    }
}
