use anyhow::{Context, Result};
use std::path::Path;

use super::types::TestResults;

/// Write results as pretty JSON
pub fn write(results: &TestResults, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;
    log::info!("Results saved to: {}", path.display());
    Ok(())
}

/// Load results saved by an earlier run
pub fn read(path: &Path) -> Result<TestResults> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid results file {}", path.display()))
}
