//! Add one or more products to the cart, then check the cart lists them all

use anyhow::Result;
use log::{info, warn};

use super::page;
use crate::driver::common::{click_when_visible, wait_visible};
use crate::driver::popups::wait_for_native_alert;
use crate::driver::traits::{BrowserSession, Selector};
use crate::parser::TestCase;
use crate::runner::context::CaseScope;
use crate::runner::state::{Classification, FlowStep};

/// Split the `;`-separated product cell
pub fn product_list(cell: &str) -> Vec<String> {
    cell.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn run(
    session: &dyn BrowserSession,
    case: &TestCase,
    scope: &CaseScope<'_>,
) -> Result<Classification> {
    let config = scope.config();
    let wait = config.element_timeout();
    let products = product_list(case.get("product"));
    if products.is_empty() {
        anyhow::bail!("No product given for {}", scope.case_id);
    }

    scope.enter(FlowStep::Navigate);
    session.navigate(scope.ctx.base_url()).await?;

    let mut added = Vec::with_capacity(products.len());
    for product in &products {
        info!("[{}] add product: {}", scope.case_id, product);

        scope.enter(FlowStep::OpenForm);
        click_when_visible(
            session,
            &page::product_link(product),
            &format!("prod_link_{}", product),
            wait,
        )
        .await?;

        scope.enter(FlowStep::Submit);
        click_when_visible(
            session,
            &page::add_to_cart_button(),
            &format!("add_to_cart_{}", product),
            wait,
        )
        .await?;
        match wait_for_native_alert(session, config.alert_timeout(), config.poll_interval()).await
        {
            Some(text) => info!("Add alert: {}", text),
            None => warn!("No add-to-cart alert for {}", product),
        }
        added.push(product.clone());

        scope.enter(FlowStep::Navigate);
        click_when_visible(session, &page::home_link(), "home_link", wait).await?;
        wait_visible(session, &page::product_table(), wait).await?;
    }

    scope.enter(FlowStep::AwaitOutcome);
    click_when_visible(session, &Selector::id("cartur"), "cart_link", wait).await?;
    wait_visible(session, &page::product_table(), wait).await?;

    let mut missing = Vec::new();
    for product in &added {
        if wait_visible(session, &page::cart_row(product), wait).await.is_err() {
            missing.push(product.as_str());
        }
    }

    let outcome = if missing.is_empty() {
        Classification::pass(format!("all {} products in cart", added.len()))
    } else {
        warn!("[{}] missing in cart: {:?}", scope.case_id, missing);
        Classification::fail(format!("missing in cart: {}", missing.join(", ")))
    };
    scope.enter(FlowStep::Classified);
    Ok(outcome)
}
