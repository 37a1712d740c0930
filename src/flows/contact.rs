use anyhow::Result;
use log::{info, warn};

use super::page::{self, CONTACT_MODAL};
use crate::driver::common::{click_when_visible, fill_field, wait_visible};
use crate::driver::popups::{detect_popups, PopupKind};
use crate::driver::traits::{BrowserSession, Selector};
use crate::parser::TestCase;
use crate::runner::context::CaseScope;
use crate::runner::state::{Classification, FlowStep};

/// Send the contact form; a native "thanks" alert is the only success signal
pub async fn run(
    session: &dyn BrowserSession,
    case: &TestCase,
    scope: &CaseScope<'_>,
) -> Result<Classification> {
    let wait = scope.config().element_timeout();

    scope.enter(FlowStep::Navigate);
    session.navigate(scope.ctx.base_url()).await?;

    scope.enter(FlowStep::OpenForm);
    click_when_visible(session, &Selector::link_text("Contact"), "contact_link", wait).await?;
    wait_visible(session, &Selector::id(CONTACT_MODAL), wait).await?;

    scope.enter(FlowStep::FillFields);
    fill_field(session, &Selector::id("recipient-email"), case.get("email"), wait).await?;
    fill_field(session, &Selector::id("recipient-name"), case.get("name"), wait).await?;
    fill_field(session, &Selector::id("message-text"), case.get("message"), wait).await?;

    scope.enter(FlowStep::Submit);
    click_when_visible(
        session,
        &page::modal_button(CONTACT_MODAL, "Send message"),
        "contact_send",
        wait,
    )
    .await?;

    scope.enter(FlowStep::AwaitOutcome);
    let popup = detect_popups(session, &scope.ctx.detector().without_modals()).await;
    let outcome = match popup.kind {
        PopupKind::NativeAlert => {
            info!("[{}] Contact alert: {}", scope.case_id, popup.text);
            Classification::pass(popup.summary())
        }
        PopupKind::None => {
            warn!("[{}] No contact confirmation -> FAIL (ambiguous)", scope.case_id);
            Classification::fail("no popup detected")
        }
        _ => Classification::fail(popup.summary()),
    };
    scope.enter(FlowStep::Classified);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::mock::{MockSession, Reaction};
    use crate::flows::testing::{case, context, home_page, show};
    use crate::runner::state::Actual;

    fn contact_page() -> MockSession {
        let session = home_page(vec![Selector::link_text("Contact")]);
        session.on_click(
            Selector::link_text("Contact"),
            vec![
                show(Selector::id(CONTACT_MODAL)),
                show(Selector::id("recipient-email")),
                show(Selector::id("recipient-name")),
                show(Selector::id("message-text")),
                show(page::modal_button(CONTACT_MODAL, "Send message")),
            ],
        );
        session
    }

    #[tokio::test]
    async fn test_thanks_alert_passes() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let scope = CaseScope::new(&ctx, "C-01", "contact");
        let session = contact_page();
        session.on_click(
            page::modal_button(CONTACT_MODAL, "Send message"),
            vec![Reaction::Alert("Thanks for the message!!".into())],
        );

        let outcome = run(
            &session,
            &case(&[("email", "a@b.c"), ("name", "Ann"), ("message", "hi")]),
            &scope,
        )
        .await
        .unwrap();

        assert_eq!(outcome, Classification::pass("native_alert: Thanks for the message!!"));
        assert_eq!(session.fills().len(), 3);
    }

    #[tokio::test]
    async fn test_inline_banner_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let scope = CaseScope::new(&ctx, "C-02", "contact");
        let session = contact_page();
        session.on_click(
            page::modal_button(CONTACT_MODAL, "Send message"),
            vec![Reaction::Show(
                Selector::css("div.alert"),
                "Email is required".into(),
            )],
        );

        let outcome = run(&session, &case(&[]), &scope).await.unwrap();

        assert_eq!(outcome.actual, Actual::Fail);
        assert_eq!(outcome.details, "inline_banner: Email is required");
    }

    #[tokio::test]
    async fn test_silence_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let scope = CaseScope::new(&ctx, "C-03", "contact");
        let session = contact_page();

        let outcome = run(&session, &case(&[]), &scope).await.unwrap();

        assert_eq!(outcome, Classification::fail("no popup detected"));
    }
}
