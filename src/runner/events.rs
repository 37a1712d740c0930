use super::state::{Actual, CaseStatus, FlowStep, RunSummary};
use tokio::sync::broadcast;

/// Run progress events for real-time updates
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Run events
    RunStarted {
        run_id: String,
        total_cases: usize,
    },
    RunFinished {
        summary: RunSummary,
    },

    // Sheet events
    SheetStarted {
        sheet: String,
        case_count: usize,
    },

    // Case events
    CaseStarted {
        case_id: String,
        flow: String,
    },
    StepEntered {
        case_id: String,
        step: FlowStep,
    },
    AttemptFinished {
        case_id: String,
        attempt: u32,
        max_attempts: u32,
        actual: Actual,
    },
    CaseFinished {
        case_id: String,
        status: CaseStatus,
        actual: Option<Actual>,
        duration_ms: u64,
        message: Option<String>,
    },
}

/// Event emitter for broadcasting run events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Hidden draw target when piped, to keep escape codes out of logs
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;
        let mut case_text = String::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::RunStarted {
                    run_id,
                    total_cases,
                } => {
                    multi
                        .println(format!(
                            "\n{} Run started: {} ({} cases)",
                            "▶".green().bold(),
                            run_id.cyan(),
                            total_cases
                        ))
                        .ok();
                }

                TestEvent::SheetStarted { sheet, case_count } => {
                    println!(
                        "\n  {} Sheet: {} ({} cases)",
                        "→".blue(),
                        sheet.white().bold(),
                        case_count
                    );
                }

                TestEvent::CaseStarted { case_id, flow } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let pb = multi.add(ProgressBar::new_spinner());
                    let style = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner());
                    pb.set_style(style);

                    case_text = format!("[{}] {}", case_id, flow.dimmed());
                    pb.set_message(format!("{}... ", case_text));
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                TestEvent::StepEntered { step, .. } => {
                    if let Some(pb) = &spinner {
                        pb.set_message(format!("{} {}... ", case_text, step.as_str().dimmed()));
                    }
                }

                TestEvent::AttemptFinished {
                    attempt,
                    max_attempts,
                    actual,
                    ..
                } => {
                    if let Some(pb) = &spinner {
                        pb.set_message(format!(
                            "{} {}",
                            case_text,
                            format!("↻ attempt {}/{} {}", attempt, max_attempts, actual).yellow()
                        ));
                    }
                }

                TestEvent::CaseFinished {
                    case_id,
                    status,
                    actual,
                    duration_ms,
                    message,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                        // Let the clear land before printing the final line
                        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                    }

                    let icon = match status {
                        CaseStatus::Passed => "✓".green(),
                        CaseStatus::Failed => "✗".red(),
                        CaseStatus::Error => "!".red().bold(),
                        CaseStatus::NotRun => "○".yellow(),
                    };
                    let status_str = match status {
                        CaseStatus::Passed => status.as_str().green().bold(),
                        CaseStatus::Failed | CaseStatus::Error => status.as_str().red().bold(),
                        CaseStatus::NotRun => status.as_str().yellow().bold(),
                    };
                    let actual_str = actual.map(|a| a.as_str()).unwrap_or("-");
                    println!(
                        "    {} [{}] {} (actual {}) ({}ms)",
                        icon, case_id, status_str, actual_str, duration_ms
                    );
                    if let Some(message) = message {
                        println!("        {}", message.dimmed());
                    }
                }

                TestEvent::RunFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish();
                    }
                    // Let spinner output settle before the summary
                    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

                    println!("\n{} Run finished", "■".blue().bold());
                    println!(
                        "  {} passed, {} failed, {} errors out of {} total",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.errors.to_string().red(),
                        summary.total
                    );
                    println!("  Duration: {}ms", summary.duration_ms);
                    break;
                }
            }
        }
    }
}
