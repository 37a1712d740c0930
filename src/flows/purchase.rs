use anyhow::Result;
use log::{info, warn};

use super::page::{self, ORDER_MODAL};
use crate::driver::common::{click_when_visible, fill_field, wait_visible};
use crate::driver::popups::{detect_popups, wait_for_native_alert, PopupKind};
use crate::driver::traits::{BrowserSession, Selector};
use crate::parser::TestCase;
use crate::runner::context::CaseScope;
use crate::runner::state::{Classification, FlowStep};

/// Order form fields, filled from the case columns of the same name
const ORDER_FIELDS: [&str; 6] = ["name", "country", "city", "card", "month", "year"];

/// Buy one product; the styled confirmation overlay means the order went through
pub async fn run(
    session: &dyn BrowserSession,
    case: &TestCase,
    scope: &CaseScope<'_>,
) -> Result<Classification> {
    let config = scope.config();
    let wait = config.element_timeout();
    let product = case.get("product").trim();

    scope.enter(FlowStep::Navigate);
    session.navigate(scope.ctx.base_url()).await?;

    scope.enter(FlowStep::OpenForm);
    click_when_visible(
        session,
        &page::product_link(product),
        &format!("prod_{}", product),
        wait,
    )
    .await?;
    click_when_visible(session, &page::add_to_cart_button(), "add_to_cart", wait).await?;
    match wait_for_native_alert(session, config.alert_timeout(), config.poll_interval()).await {
        Some(text) => info!("Add alert: {}", text),
        None => warn!("No add-to-cart alert"),
    }

    click_when_visible(session, &Selector::id("cartur"), "cart_link", wait).await?;
    wait_visible(session, &page::cart_rows(), wait).await?;
    click_when_visible(session, &page::place_order_button(), "place_order", wait).await?;
    wait_visible(session, &Selector::id(ORDER_MODAL), wait).await?;

    scope.enter(FlowStep::FillFields);
    for field in ORDER_FIELDS {
        fill_field(session, &Selector::id(field), case.get(field), wait).await?;
    }

    scope.enter(FlowStep::Submit);
    click_when_visible(
        session,
        &page::modal_button(ORDER_MODAL, "Purchase"),
        "purchase_btn",
        wait,
    )
    .await?;

    scope.enter(FlowStep::AwaitOutcome);
    let popup = detect_popups(session, &scope.ctx.detector().without_modals()).await;
    let outcome = match popup.kind {
        PopupKind::OverlayAlert => {
            info!("[{}] Order confirmed", scope.case_id);
            Classification::pass(popup.summary())
        }
        PopupKind::None => {
            warn!("[{}] No confirmation shown -> FAIL (ambiguous)", scope.case_id);
            Classification::fail("no confirmation shown")
        }
        _ => {
            info!("[{}] Order refused: {}", scope.case_id, popup.summary());
            Classification::fail(popup.summary())
        }
    };
    scope.enter(FlowStep::Classified);
    Ok(outcome)
}
