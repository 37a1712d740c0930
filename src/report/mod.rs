pub mod json;
pub mod types;

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::driver::common::truncate;
use crate::runner::state::CaseStatus;
use types::TestResults;

/// Print the per-case table and totals of a run
pub fn print_summary(results: &TestResults) {
    println!(
        "\n  {:<12} {:<12} {:<8} {:<8} {}",
        "ID".bold(),
        "FLOW".bold(),
        "EXPECT".bold(),
        "ACTUAL".bold(),
        "STATUS".bold()
    );
    for result in &results.results {
        let status = match result.status {
            CaseStatus::Passed => result.status.as_str().green(),
            CaseStatus::Failed | CaseStatus::Error => result.status.as_str().red(),
            CaseStatus::NotRun => result.status.as_str().yellow(),
        };
        let actual = result.actual.map(|a| a.as_str()).unwrap_or("-");
        println!(
            "  {:<12} {:<12} {:<8} {:<8} {}",
            result.id, result.flow, result.expected, actual, status
        );
        if let Some(error) = &result.error {
            println!("      {}", truncate(error, 200).dimmed());
        }
    }
    println!("\n  {}", results.summary);
}

/// Re-print the summary of a saved `results.json`
pub fn show_saved(path: &Path) -> Result<TestResults> {
    let results = json::read(path)?;
    println!(
        "{} Run {} ({})",
        "■".blue().bold(),
        results.summary.run_id.cyan(),
        results.generated_at
    );
    print_summary(&results);
    Ok(results)
}
