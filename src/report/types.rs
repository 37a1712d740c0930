use crate::runner::state::{FlowResult, RunSummary};
use serde::{Deserialize, Serialize};

/// Everything a run produced, as saved to `results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub summary: RunSummary,
    pub results: Vec<FlowResult>,
    pub generated_at: String,
}

impl TestResults {
    pub fn new(summary: RunSummary, results: Vec<FlowResult>) -> Self {
        Self {
            summary,
            results,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
