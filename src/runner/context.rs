use log::info;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use super::events::{EventEmitter, TestEvent};
use super::state::FlowStep;
use crate::driver::common::save_screenshot;
use crate::driver::popups::DetectorConfig;
use crate::driver::traits::BrowserSession;
use crate::utils::config::Config;

/// Run-wide execution context, created once by the runner
pub struct RunContext {
    pub run_id: String,

    pub config: Config,

    /// Output directory for results and screenshots
    pub output_dir: PathBuf,

    pub screenshot_dir: PathBuf,

    pub emitter: EventEmitter,
}

impl RunContext {
    pub fn new(run_id: &str, config: Config, output_dir: &Path, emitter: EventEmitter) -> Self {
        let screenshot_dir = output_dir.join("screenshots");
        // Always ensure output directory exists
        let _ = std::fs::create_dir_all(&screenshot_dir);

        Self {
            run_id: run_id.to_string(),
            config,
            output_dir: output_dir.to_path_buf(),
            screenshot_dir,
            emitter,
        }
    }

    /// Detector settings derived from the configured timeouts
    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig::default()
            .with_timeout(self.config.outcome_timeout())
            .with_poll_interval(self.config.poll_interval())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the output path for a file
    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }
}

/// Per-case state threaded through a flow
///
/// Tracks the state-machine step reached and the screenshots taken, so the
/// runner can still report both after an error or panic.
pub struct CaseScope<'a> {
    pub ctx: &'a RunContext,
    pub case_id: String,
    pub flow: String,
    step: Cell<FlowStep>,
    screenshots: RefCell<Vec<String>>,
}

impl<'a> CaseScope<'a> {
    pub fn new(ctx: &'a RunContext, case_id: &str, flow: &str) -> Self {
        Self {
            ctx,
            case_id: case_id.to_string(),
            flow: flow.to_string(),
            step: Cell::new(FlowStep::Start),
            screenshots: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    /// Move the state machine to `step`
    pub fn enter(&self, step: FlowStep) {
        self.step.set(step);
        info!("[{}] {} -> {}", self.case_id, self.flow, step);
        self.ctx.emitter.emit(TestEvent::StepEntered {
            case_id: self.case_id.clone(),
            step,
        });
    }

    pub fn step(&self) -> FlowStep {
        self.step.get()
    }

    pub fn emit(&self, event: TestEvent) {
        self.ctx.emitter.emit(event);
    }

    /// Capture `<case>_<flow>_<suffix>.png`, keeping its path on success
    pub async fn screenshot(&self, session: &dyn BrowserSession, suffix: &str) -> Option<PathBuf> {
        let name = format!("{}_{}_{}", self.case_id, self.flow, suffix);
        let path = save_screenshot(session, &self.ctx.screenshot_dir, &name).await?;
        self.screenshots
            .borrow_mut()
            .push(path.display().to_string());
        Some(path)
    }

    pub fn take_screenshots(&self) -> Vec<String> {
        self.screenshots.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::MockSession;

    #[tokio::test]
    async fn test_scope_tracks_step_and_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = RunContext::new("run", Config::default(), dir.path(), EventEmitter::default());
        let scope = CaseScope::new(&ctx, "L-01", "login");
        let session = MockSession::new();

        assert_eq!(scope.step(), FlowStep::Start);
        scope.enter(FlowStep::FillFields);
        assert_eq!(scope.step(), FlowStep::FillFields);

        let path = scope.screenshot(&session, "PASS").await.unwrap();

        assert!(path.ends_with("screenshots/L-01_login_PASS.png"));
        assert_eq!(scope.take_screenshots().len(), 1);
        assert_eq!(session.screenshots().len(), 1);
    }

    #[test]
    fn test_detector_uses_configured_timeouts() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            outcome_timeout_ms: 1_500,
            ..Config::default()
        };
        let ctx = RunContext::new("run", config, dir.path(), EventEmitter::default());
        assert_eq!(ctx.detector().timeout.as_millis(), 1_500);
    }
}
