//! Signup journey with bounded retry
//!
//! Usernames prefixed with `GENERATE_` or `AUTO_` are templates: every
//! attempt registers a fresh `<base>_<unix-seconds>_<attempt>` name so a
//! collision with an existing account does not sink the case.

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};

use super::page::{self, SIGNUP_MODAL};
use crate::driver::common::{
    click_when_visible, fill_field, truncate, wait_hidden, wait_visible,
};
use crate::driver::popups::{detect_popups, PopupKind};
use crate::driver::traits::{BrowserSession, Selector};
use crate::parser::TestCase;
use crate::runner::context::CaseScope;
use crate::runner::events::TestEvent;
use crate::runner::retry::{run_with_retry, RetryPolicy};
use crate::runner::state::{Actual, AttemptRecord, Classification, FlowStep};

const TEMPLATE_PREFIXES: [&str; 2] = ["GENERATE_", "AUTO_"];

/// Max characters of attempt details kept in the history block
const HISTORY_DETAIL_LIMIT: usize = 100;

pub async fn run(
    session: &dyn BrowserSession,
    case: &TestCase,
    scope: &CaseScope<'_>,
) -> Result<Classification> {
    let config = scope.config();
    let policy = RetryPolicy {
        max_attempts: config.signup_attempts.max(1),
        delay: config.retry_delay(),
    };
    let raw_username = case.get("username");
    let template = template_base(raw_username);

    let outcome = run_with_retry(
        policy,
        |attempt| match template {
            Some(base) => {
                let username = generated_username(base, Utc::now().timestamp(), attempt);
                info!("[{}] Generated unique username: {}", scope.case_id, username);
                username
            }
            None => raw_username.to_string(),
        },
        move |attempt, username| async move {
            let outcome = run_attempt(session, case, scope, attempt, &username).await;
            scope.emit(TestEvent::AttemptFinished {
                case_id: scope.case_id.clone(),
                attempt,
                max_attempts: policy.max_attempts,
                actual: outcome.actual,
            });
            outcome
        },
        |outcome: &Classification| outcome.actual == Actual::Pass,
    )
    .await;

    let records: Vec<AttemptRecord> = outcome
        .history
        .iter()
        .map(|a| AttemptRecord {
            attempt: a.number,
            identifier: a.input.clone(),
            actual: a.value.actual,
            details: a.value.details.clone(),
        })
        .collect();

    let classification = summarize(outcome.succeeded, policy.max_attempts, &records);
    if !outcome.succeeded {
        warn!(
            "[{}] All {} attempts failed",
            scope.case_id, policy.max_attempts
        );
    }
    Ok(classification)
}

/// One pass through the signup modal; errors become an ERROR attempt
async fn run_attempt(
    session: &dyn BrowserSession,
    case: &TestCase,
    scope: &CaseScope<'_>,
    attempt: u32,
    username: &str,
) -> Classification {
    match try_attempt(session, case, scope, attempt, username).await {
        Ok(outcome) => {
            scope
                .screenshot(session, &format!("attempt{}_{}", attempt, outcome.actual))
                .await;
            outcome
        }
        Err(e) => {
            warn!("[{}] Exception in attempt {}: {:#}", scope.case_id, attempt, e);
            scope
                .screenshot(session, &format!("attempt{}_exception", attempt))
                .await;
            Classification {
                actual: Actual::Error,
                details: format!("exception: {}", e),
            }
        }
    }
}

async fn try_attempt(
    session: &dyn BrowserSession,
    case: &TestCase,
    scope: &CaseScope<'_>,
    attempt: u32,
    username: &str,
) -> Result<Classification> {
    let config = scope.config();
    let wait = config.element_timeout();

    scope.enter(FlowStep::Navigate);
    session.navigate(scope.ctx.base_url()).await?;

    scope.enter(FlowStep::OpenForm);
    click_when_visible(session, &Selector::id("signin2"), "signin2", wait).await?;
    wait_visible(session, &Selector::id(SIGNUP_MODAL), wait).await?;

    scope.enter(FlowStep::FillFields);
    fill_field(session, &Selector::id("sign-username"), username, wait).await?;
    fill_field(session, &Selector::id("sign-password"), case.get("password"), wait).await?;
    debug!(
        "[{}] Attempt {}: Credentials filled: username={}",
        scope.case_id, attempt, username
    );

    scope.enter(FlowStep::Submit);
    click_when_visible(
        session,
        &page::modal_button(SIGNUP_MODAL, "Sign up"),
        "signup_submit",
        wait,
    )
    .await?;

    scope.enter(FlowStep::AwaitOutcome);
    if !wait_hidden(session, &Selector::id(SIGNUP_MODAL), config.alert_timeout()).await {
        warn!("[{}] Signup modal did not close", scope.case_id);
    }

    let popup = detect_popups(session, &scope.ctx.detector()).await;
    debug!(
        "[{}] Attempt {}: detect_popups returned: {}",
        scope.case_id,
        attempt,
        truncate(&popup.summary(), 200)
    );

    let outcome = match popup.kind {
        PopupKind::NativeAlert if popup.text.to_lowercase().contains("successful") => {
            info!("[{}] Attempt {}: Signup successful -> PASS", scope.case_id, attempt);
            Classification::pass(popup.summary())
        }
        PopupKind::None => {
            warn!("[{}] Attempt {}: No popup detected -> FAIL", scope.case_id, attempt);
            Classification::fail("no popup detected")
        }
        _ => {
            info!("[{}] Attempt {}: {} -> FAIL", scope.case_id, attempt, popup.summary());
            Classification::fail(popup.summary())
        }
    };
    scope.enter(FlowStep::Classified);
    Ok(outcome)
}

/// Base name of a template username, if it is one
pub fn template_base(username: &str) -> Option<&str> {
    TEMPLATE_PREFIXES
        .iter()
        .find_map(|prefix| username.strip_prefix(*prefix))
}

pub fn generated_username(base: &str, unix_seconds: i64, attempt: u32) -> String {
    format!("{}_{}_{}", base, unix_seconds, attempt)
}

/// Fold the attempt history into the case classification
pub fn summarize(succeeded: bool, max_attempts: u32, records: &[AttemptRecord]) -> Classification {
    let Some(last) = records.last() else {
        return Classification::fail("no attempts ran");
    };

    let mut details = if succeeded {
        format!(
            "Success on attempt {}/{}. {}",
            last.attempt, max_attempts, last.details
        )
    } else {
        format!("Failed all {} attempts. Last: {}", max_attempts, last.details)
    };

    if records.len() > 1 {
        details.push_str("\nAttempts history:\n");
        let lines: Vec<String> = records
            .iter()
            .map(|r| {
                format!(
                    "  #{}: {} - {} - {}",
                    r.attempt,
                    r.actual,
                    r.identifier,
                    truncate(&r.details, HISTORY_DETAIL_LIMIT)
                )
            })
            .collect();
        details.push_str(&lines.join("\n"));
    }

    Classification {
        actual: if succeeded { Actual::Pass } else { Actual::Fail },
        details: details.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockSession, Reaction};
    use crate::flows::testing::{case, context, home_page, show};

    fn signup_page() -> MockSession {
        let session = home_page(vec![Selector::id("signin2")]);
        session.on_click(
            Selector::id("signin2"),
            vec![
                show(Selector::id(SIGNUP_MODAL)),
                show(Selector::id("sign-username")),
                show(Selector::id("sign-password")),
                show(page::modal_button(SIGNUP_MODAL, "Sign up")),
            ],
        );
        session
    }

    fn answer(text: &str) -> Vec<Reaction> {
        vec![
            Reaction::Hide(Selector::id(SIGNUP_MODAL)),
            Reaction::Alert(text.to_string()),
        ]
    }

    #[test]
    fn test_template_base() {
        assert_eq!(template_base("GENERATE_qa"), Some("qa"));
        assert_eq!(template_base("AUTO_bot"), Some("bot"));
        assert_eq!(template_base("alice"), None);
        assert_eq!(generated_username("qa", 1_700_000_000, 2), "qa_1700000000_2");
    }

    #[tokio::test]
    async fn test_success_on_third_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let scope = CaseScope::new(&ctx, "S-01", "signup");
        let session = signup_page();
        session.on_click_sequence(
            page::modal_button(SIGNUP_MODAL, "Sign up"),
            vec![
                answer("This user already exist."),
                answer("This user already exist."),
                answer("Sign up successful."),
            ],
        );

        let outcome = run(
            &session,
            &case(&[("username", "GENERATE_qa"), ("password", "pw")]),
            &scope,
        )
        .await
        .unwrap();

        assert_eq!(outcome.actual, Actual::Pass);
        assert!(outcome
            .details
            .starts_with("Success on attempt 3/3. native_alert: Sign up successful."));
        let history: Vec<&str> = outcome
            .details
            .lines()
            .filter(|l| l.trim_start().starts_with('#'))
            .collect();
        assert_eq!(history.len(), 3);
        for (idx, line) in history.iter().enumerate() {
            assert!(line.trim_start().starts_with(&format!("#{}: ", idx + 1)));
            assert!(line.contains("qa_"));
        }

        let usernames: Vec<String> = session
            .fills()
            .into_iter()
            .filter(|(sel, _)| *sel == Selector::id("sign-username"))
            .map(|(_, v)| v)
            .collect();
        assert_eq!(usernames.len(), 3);
        assert!(usernames[2].ends_with("_3"));
    }

    #[tokio::test]
    async fn test_all_attempts_fail() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let scope = CaseScope::new(&ctx, "S-02", "signup");
        let session = signup_page();
        session.on_click_sequence(
            page::modal_button(SIGNUP_MODAL, "Sign up"),
            vec![
                answer("This user already exist."),
                answer("This user already exist."),
                answer("Please fill out Username and Password."),
            ],
        );

        let outcome = run(&session, &case(&[("username", "alice")]), &scope)
            .await
            .unwrap();

        assert_eq!(outcome.actual, Actual::Fail);
        assert!(outcome.details.starts_with(
            "Failed all 3 attempts. Last: native_alert: Please fill out Username and Password."
        ));
        assert!(outcome.details.contains("#3: FAIL - alice - native_alert: Please fill out"));
    }

    #[tokio::test]
    async fn test_attempt_errors_are_recorded_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let scope = CaseScope::new(&ctx, "S-03", "signup");
        let session = MockSession::new();

        let outcome = run(&session, &case(&[("username", "alice")]), &scope)
            .await
            .unwrap();

        assert_eq!(outcome.actual, Actual::Fail);
        assert!(outcome.details.contains("#1: ERROR - alice - exception: timed out"));
        assert_eq!(session.screenshots().len(), 3);
    }

    #[test]
    fn test_single_attempt_has_no_history() {
        let records = vec![AttemptRecord {
            attempt: 1,
            identifier: "bob".into(),
            actual: Actual::Pass,
            details: "native_alert: Sign up successful.".into(),
        }];
        let outcome = summarize(true, 3, &records);
        assert_eq!(
            outcome.details,
            "Success on attempt 1/3. native_alert: Sign up successful."
        );
    }

    #[test]
    fn test_history_truncates_details() {
        let long = "x".repeat(150);
        let records: Vec<AttemptRecord> = (1..=2)
            .map(|n| AttemptRecord {
                attempt: n,
                identifier: format!("u{}", n),
                actual: Actual::Fail,
                details: long.clone(),
            })
            .collect();
        let outcome = summarize(false, 2, &records);
        let last_line = outcome.details.lines().last().unwrap();
        assert_eq!(last_line, format!("  #2: FAIL - u2 - {}", "x".repeat(100)));
    }
}
