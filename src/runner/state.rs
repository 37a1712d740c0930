use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::FlowError;

/// Observed outcome of a flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Actual {
    Pass,
    Fail,
    Error,
}

impl Actual {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actual::Pass => "PASS",
            Actual::Fail => "FAIL",
            Actual::Error => "ERROR",
        }
    }
}

impl fmt::Display for Actual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of a test case against its expected outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    NotRun,
    Passed,
    Failed,
    Error,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::NotRun => "NOT_RUN",
            CaseStatus::Passed => "PASSED",
            CaseStatus::Failed => "FAILED",
            CaseStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of the per-case state machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowStep {
    #[default]
    Start,
    Navigate,
    OpenForm,
    FillFields,
    Submit,
    AwaitOutcome,
    Classified,
    Done,
    Error,
}

impl FlowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStep::Start => "START",
            FlowStep::Navigate => "NAVIGATE",
            FlowStep::OpenForm => "OPEN_FORM",
            FlowStep::FillFields => "FILL_FIELDS",
            FlowStep::Submit => "SUBMIT",
            FlowStep::AwaitOutcome => "AWAIT_OUTCOME",
            FlowStep::Classified => "CLASSIFIED",
            FlowStep::Done => "DONE",
            FlowStep::Error => "ERROR",
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a flow before it is compared with the expectation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub actual: Actual,
    pub details: String,
}

impl Classification {
    pub fn pass(details: impl Into<String>) -> Self {
        Self {
            actual: Actual::Pass,
            details: details.into(),
        }
    }

    pub fn fail(details: impl Into<String>) -> Self {
        Self {
            actual: Actual::Fail,
            details: details.into(),
        }
    }
}

/// Result record for one test case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowResult {
    pub id: String,
    pub flow: String,
    /// Normalized (trimmed, upper-case) expected outcome
    pub expected: String,
    pub actual: Option<Actual>,
    pub status: CaseStatus,
    pub details: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<String>,
    pub failed_step: Option<FlowStep>,
    pub screenshots: Vec<String>,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
}

impl FlowResult {
    pub fn new(id: &str, flow: &str, expected: &str) -> Self {
        Self {
            id: id.to_string(),
            flow: flow.to_string(),
            expected: normalize_expected(expected),
            actual: None,
            status: CaseStatus::NotRun,
            details: None,
            error: None,
            error_kind: None,
            failed_step: None,
            screenshots: Vec::new(),
            duration_ms: 0,
            started_at: Utc::now(),
        }
    }

    /// Record the observed outcome and derive the verdict from it
    pub fn classify(&mut self, classification: Classification) {
        self.status = if classification.actual.as_str() == self.expected {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        };
        self.actual = Some(classification.actual);
        self.details = Some(classification.details);
    }

    /// Short-circuit to ERROR, overriding any earlier classification
    pub fn fail_with_error(&mut self, step: FlowStep, err: &FlowError) {
        self.actual = Some(Actual::Error);
        self.status = CaseStatus::Error;
        self.error = Some(format!("[{}] {:#}", step, err));
        self.error_kind = Some(err.kind().to_string());
        self.failed_step = Some(step);
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.duration_ms = elapsed.as_millis() as u64;
    }
}

pub fn normalize_expected(expected: &str) -> String {
    expected.trim().to_uppercase()
}

/// One signup attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub attempt: u32,
    pub identifier: String,
    pub actual: Actual,
    pub details: String,
}

/// Totals for a whole run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub errors: u32,
    pub not_run: u32,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn from_results(run_id: &str, results: &[FlowResult], elapsed: Duration) -> Self {
        let mut summary = Self {
            run_id: run_id.to_string(),
            total: results.len() as u32,
            passed: 0,
            failed: 0,
            errors: 0,
            not_run: 0,
            duration_ms: elapsed.as_millis() as u64,
        };
        for result in results {
            match result.status {
                CaseStatus::Passed => summary.passed += 1,
                CaseStatus::Failed => summary.failed += 1,
                CaseStatus::Error => summary.errors += 1,
                CaseStatus::NotRun => summary.not_run += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.errors > 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} errors out of {} total",
            self.passed, self.failed, self.errors, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_compares_normalized_expected() {
        let mut result = FlowResult::new("L-02", "login", " fail ");
        assert_eq!(result.status, CaseStatus::NotRun);

        result.classify(Classification::fail("native_alert: User does not exist."));

        assert_eq!(result.expected, "FAIL");
        assert_eq!(result.actual, Some(Actual::Fail));
        assert_eq!(result.status, CaseStatus::Passed);
    }

    #[test]
    fn test_mismatch_is_failed() {
        let mut result = FlowResult::new("L-01", "login", "PASS");
        result.classify(Classification::fail("no popup and no logout found"));
        assert_eq!(result.status, CaseStatus::Failed);
    }

    #[test]
    fn test_error_overrides_classification() {
        let mut result = FlowResult::new("C-01", "contact", "ERROR");
        result.classify(Classification::pass("native_alert: Thanks"));

        let err = FlowError::timeout("#recipient-email", Duration::from_secs(10));
        result.fail_with_error(FlowStep::FillFields, &err);

        assert_eq!(result.status, CaseStatus::Error);
        assert_eq!(result.actual, Some(Actual::Error));
        assert_eq!(result.failed_step, Some(FlowStep::FillFields));
        assert!(result.error.as_deref().unwrap().starts_with("[FILL_FIELDS] timed out"));
        assert_eq!(result.error_kind.as_deref(), Some("timeout_failure"));
    }

    #[test]
    fn test_summary_counts() {
        let mut passed = FlowResult::new("A", "login", "PASS");
        passed.classify(Classification::pass("ok"));
        let mut failed = FlowResult::new("B", "login", "PASS");
        failed.classify(Classification::fail("nope"));
        let mut errored = FlowResult::new("C", "login", "PASS");
        errored.fail_with_error(FlowStep::Navigate, &FlowError::from(anyhow::anyhow!("boom")));
        let pending = FlowResult::new("D", "login", "PASS");

        let summary = RunSummary::from_results(
            "run-1",
            &[passed, failed, errored, pending],
            Duration::from_millis(1500),
        );

        assert_eq!(
            (summary.total, summary.passed, summary.failed, summary.errors, summary.not_run),
            (4, 1, 1, 1, 1)
        );
        assert!(summary.has_failures());
        assert_eq!(
            summary.to_string(),
            "1 passed, 1 failed, 1 errors out of 4 total"
        );
    }

    #[test]
    fn test_result_serializes_upper_case_tags() {
        let mut result = FlowResult::new("S-01", "signup", "pass");
        result.classify(Classification::pass("Success on attempt 1/3."));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["actual"], "PASS");
        assert_eq!(json["status"], "PASSED");
        assert_eq!(json["failedStep"], serde_json::Value::Null);
    }
}
