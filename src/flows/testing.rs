//! Fixtures shared by flow and runner tests

use std::path::Path;

use crate::driver::mock::{MockSession, Reaction};
use crate::driver::traits::Selector;
use crate::parser::TestCase;
use crate::runner::context::RunContext;
use crate::runner::events::EventEmitter;
use crate::utils::config::Config;

/// Timeouts short enough for unit tests
pub fn fast_config() -> Config {
    Config {
        base_url: "https://shop.test".to_string(),
        element_timeout_ms: 150,
        outcome_timeout_ms: 200,
        poll_interval_ms: 10,
        alert_timeout_ms: 100,
        signup_attempts: 3,
        retry_delay_ms: 0,
    }
}

pub fn context(dir: &Path) -> RunContext {
    RunContext::new("test-run", fast_config(), dir, EventEmitter::default())
}

pub fn case(pairs: &[(&str, &str)]) -> TestCase {
    TestCase::from_pairs(1, pairs.iter().copied())
}

pub fn show(selector: Selector) -> Reaction {
    Reaction::Show(selector, String::new())
}

/// A session whose home page renders `visible` on every navigation
pub fn home_page(visible: Vec<Selector>) -> MockSession {
    let session = MockSession::new();
    session.on_navigate(visible.into_iter().map(show).collect());
    session
}
