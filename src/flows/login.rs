//! Login journey
//!
//! Success is the logout link showing up in the navbar. The login modal stays
//! open while the server answers, so modal popups are not treated as signals;
//! any alert or inline banner means the login was refused.

use anyhow::Result;
use log::{debug, info, warn};
use std::time::Instant;

use super::page::{self, LOGIN_MODAL};
use crate::driver::common::{click_when_visible, fill_field, prepare_clean_session, wait_visible};
use crate::driver::popups::{detect_once, DetectorConfig};
use crate::driver::traits::{BrowserSession, Selector};
use crate::parser::TestCase;
use crate::runner::context::CaseScope;
use crate::runner::state::{Classification, FlowStep};

const LOGOUT_LINK: &str = "logout2";

pub async fn run(
    session: &dyn BrowserSession,
    case: &TestCase,
    scope: &CaseScope<'_>,
) -> Result<Classification> {
    let wait = scope.config().element_timeout();

    scope.enter(FlowStep::Navigate);
    prepare_clean_session(session).await;
    session.navigate(scope.ctx.base_url()).await?;

    scope.enter(FlowStep::OpenForm);
    click_when_visible(session, &Selector::id("login2"), "login2", wait).await?;
    wait_visible(session, &Selector::id(LOGIN_MODAL), wait).await?;

    scope.enter(FlowStep::FillFields);
    fill_field(session, &Selector::id("loginusername"), case.get("username"), wait).await?;
    fill_field(session, &Selector::id("loginpassword"), case.get("password"), wait).await?;
    debug!("[{}] Credentials filled", scope.case_id);

    scope.enter(FlowStep::Submit);
    click_when_visible(
        session,
        &page::modal_button(LOGIN_MODAL, "Log in"),
        "login_submit",
        wait,
    )
    .await?;

    scope.enter(FlowStep::AwaitOutcome);
    let outcome = await_outcome(session, scope).await;
    scope.enter(FlowStep::Classified);
    Ok(outcome)
}

/// Poll for a refusal popup or the logout link until the outcome timeout
async fn await_outcome(session: &dyn BrowserSession, scope: &CaseScope<'_>) -> Classification {
    let detector: DetectorConfig = scope.ctx.detector().without_modals();
    let logout = Selector::id(LOGOUT_LINK);
    let start = Instant::now();

    loop {
        if let Some(popup) = detect_once(session, &detector).await {
            info!("[{}] {} detected -> FAIL", scope.case_id, popup.summary());
            close_modal(session).await;
            return Classification::fail(popup.summary());
        }

        if session.is_visible(&logout).await.unwrap_or(false) {
            info!("[{}] logout2 found -> PASS", scope.case_id);
            return Classification::pass("logout2 present");
        }

        let elapsed = start.elapsed();
        if elapsed >= detector.timeout {
            break;
        }
        tokio::time::sleep(detector.poll_interval.min(detector.timeout - elapsed)).await;
    }

    scope.screenshot(session, "no_indicator").await;
    if session
        .is_visible(&Selector::id(LOGIN_MODAL))
        .await
        .unwrap_or(false)
    {
        warn!("[{}] Modal still open -> FAIL", scope.case_id);
        Classification::fail("login modal still open (no alert, no logout)")
    } else {
        warn!("[{}] No indicators found -> FAIL (ambiguous)", scope.case_id);
        Classification::fail("no popup and no logout found")
    }
}

async fn close_modal(session: &dyn BrowserSession) {
    let close = page::modal_button(LOGIN_MODAL, "Close");
    if let Err(e) = session.click(&close).await {
        debug!("Could not close login modal: {}", e);
    }
}
