pub mod context;
pub mod events;
pub mod retry;
pub mod state;

use anyhow::Result;
use futures::FutureExt;
use log::{debug, error, info, warn};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Instant;

pub use events::*;
pub use state::*;

use crate::driver::traits::SessionFactory;
use crate::error::FlowError;
use crate::flows::{run_flow, FlowKind};
use crate::parser::{load_sheets, Sheet, TestCase};
use crate::report::{self, types::TestResults};
use crate::utils::config::Config;
use context::{CaseScope, RunContext};

/// Inputs of one harness run
pub struct RunOptions {
    /// Directory of `<sheet>.csv` files, one CSV file, or a workbook
    pub data: PathBuf,
    /// Sheets to run; empty means every sheet with a known flow
    pub sheets: Vec<String>,
    pub output: PathBuf,
    pub config: Config,
}

/// Load the data, run every selected case and save `results.json`
pub async fn run_tests(options: RunOptions, factory: &dyn SessionFactory) -> Result<TestResults> {
    let sheets = select_sheets(load_sheets(&options.data)?, &options.sheets)?;
    let total_cases: usize = sheets.iter().map(|s| s.cases.len()).sum();

    let run_id = uuid::Uuid::new_v4().to_string();
    let (emitter, receiver) = EventEmitter::new();
    let listener = tokio::spawn(ConsoleEventListener::listen(receiver));
    let ctx = RunContext::new(&run_id, options.config, &options.output, emitter);

    ctx.emitter.emit(TestEvent::RunStarted {
        run_id: run_id.clone(),
        total_cases,
    });

    let start = Instant::now();
    let results = run_sheets(&sheets, factory, &ctx).await;
    let summary = RunSummary::from_results(&ctx.run_id, &results, start.elapsed());

    ctx.emitter.emit(TestEvent::RunFinished {
        summary: summary.clone(),
    });
    let _ = listener.await;

    let test_results = TestResults::new(summary, results);
    report::json::write(&test_results, &ctx.output_path("results.json"))?;
    report::print_summary(&test_results);

    Ok(test_results)
}

/// Keep the sheets named in `wanted` (all known ones when empty)
pub fn select_sheets(sheets: Vec<Sheet>, wanted: &[String]) -> Result<Vec<Sheet>> {
    if wanted.is_empty() {
        return Ok(sheets);
    }

    let wanted: Vec<String> = wanted.iter().map(|w| w.trim().to_lowercase()).collect();
    for name in &wanted {
        if !sheets.iter().any(|s| &s.name == name) {
            let known: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
            anyhow::bail!(
                "Sheet '{}' not found. Available sheets: {}",
                name,
                known.join(", ")
            );
        }
    }

    Ok(sheets
        .into_iter()
        .filter(|s| wanted.contains(&s.name))
        .collect())
}

/// Run every case of every sheet, one fresh session per case
pub async fn run_sheets(
    sheets: &[Sheet],
    factory: &dyn SessionFactory,
    ctx: &RunContext,
) -> Vec<FlowResult> {
    let mut results = Vec::new();

    for sheet in sheets {
        let Some(kind) = FlowKind::from_sheet(&sheet.name) else {
            warn!("Skipping sheet '{}': no flow for it", sheet.name);
            continue;
        };

        ctx.emitter.emit(TestEvent::SheetStarted {
            sheet: sheet.name.clone(),
            case_count: sheet.cases.len(),
        });

        for case in &sheet.cases {
            results.push(run_case(kind, case, factory, ctx).await);
        }
    }

    results
}

/// Run one case in isolation
///
/// Never fails: session errors, flow errors and panics all end up as an
/// ERROR result. The session is closed on every path once it was opened.
pub async fn run_case(
    kind: FlowKind,
    case: &TestCase,
    factory: &dyn SessionFactory,
    ctx: &RunContext,
) -> FlowResult {
    let id = case.test_id(kind.id_prefix());
    let mut result = FlowResult::new(&id, kind.name(), case.expected());
    let scope = CaseScope::new(ctx, &id, kind.name());
    let start = Instant::now();

    info!("[{}] {} flow start (row {})", id, kind, case.row);
    ctx.emitter.emit(TestEvent::CaseStarted {
        case_id: id.clone(),
        flow: kind.name().to_string(),
    });

    let label = format!("{} - {}", kind, id);
    match factory.open(&label).await {
        Ok(session) => {
            info!("[{}] Session opened: {}", id, session.session_name());
            let outcome = AssertUnwindSafe(run_flow(kind, session.as_ref(), case, &scope))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(classification)) => {
                    let actual = classification.actual;
                    result.classify(classification);
                    scope.screenshot(session.as_ref(), actual.as_str()).await;
                    scope.enter(FlowStep::Done);
                }
                Ok(Err(e)) => {
                    let step = scope.step();
                    error!("[{}] Exception in {} flow at {}: {:#}", id, kind, step, e);
                    scope.screenshot(session.as_ref(), "exception").await;
                    result.fail_with_error(step, &FlowError::classify(e));
                    scope.enter(FlowStep::Error);
                }
                Err(panic) => {
                    let step = scope.step();
                    let message = panic_message(panic.as_ref());
                    error!("[{}] {} flow panicked at {}: {}", id, kind, step, message);
                    scope.screenshot(session.as_ref(), "exception").await;
                    let err = FlowError::Unhandled(anyhow::anyhow!("panic: {}", message));
                    result.fail_with_error(step, &err);
                    scope.enter(FlowStep::Error);
                }
            }

            if let Err(e) = session.close().await {
                warn!(
                    "[{}] Failed to close browser session {}: {}",
                    id,
                    session.session_name(),
                    e
                );
            } else {
                debug!("[{}] Session closed: {}", id, session.session_name());
            }
        }
        Err(e) => {
            error!("[{}] Could not open browser session: {:#}", id, e);
            let err = FlowError::Unhandled(e.context("Failed to open browser session"));
            result.fail_with_error(FlowStep::Start, &err);
        }
    }

    result.screenshots = scope.take_screenshots();
    result.finish(start.elapsed());

    info!(
        "[{}] {} finished: expected={}, actual={}, status={}",
        id,
        kind,
        result.expected,
        result.actual.map(|a| a.as_str()).unwrap_or("-"),
        result.status
    );
    ctx.emitter.emit(TestEvent::CaseFinished {
        case_id: id,
        status: result.status,
        actual: result.actual,
        duration_ms: result.duration_ms,
        message: result.error.clone().or_else(|| result.details.clone()),
    });

    result
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
