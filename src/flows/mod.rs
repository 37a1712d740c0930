//! Storefront user journeys
//!
//! Each flow drives one test case through the state machine
//! `NAVIGATE -> OPEN_FORM -> FILL_FIELDS -> SUBMIT -> AWAIT_OUTCOME -> CLASSIFIED`
//! and returns its classification. Errors propagate to the runner, which
//! turns them into an ERROR result.

pub mod add_to_cart;
pub mod contact;
pub mod login;
pub mod page;
pub mod purchase;
pub mod signup;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use std::fmt;

use crate::driver::traits::BrowserSession;
use crate::parser::TestCase;
use crate::runner::context::CaseScope;
use crate::runner::state::Classification;

/// The journeys the harness knows how to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Login,
    Signup,
    Contact,
    AddToCart,
    Purchase,
}

impl FlowKind {
    pub const ALL: [FlowKind; 5] = [
        FlowKind::Login,
        FlowKind::Signup,
        FlowKind::Contact,
        FlowKind::AddToCart,
        FlowKind::Purchase,
    ];

    /// Map a sheet name to its flow
    pub fn from_sheet(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        match normalized.as_str() {
            "login" => Some(FlowKind::Login),
            "signup" | "sign_up" => Some(FlowKind::Signup),
            "contact" => Some(FlowKind::Contact),
            "add_to_cart" | "addtocart" | "cart" => Some(FlowKind::AddToCart),
            "purchase" => Some(FlowKind::Purchase),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlowKind::Login => "login",
            FlowKind::Signup => "signup",
            FlowKind::Contact => "contact",
            FlowKind::AddToCart => "add_to_cart",
            FlowKind::Purchase => "purchase",
        }
    }

    /// Letter used for fallback test ids
    pub fn id_prefix(&self) -> char {
        match self {
            FlowKind::Login => 'L',
            FlowKind::Signup => 'S',
            FlowKind::Contact => 'C',
            FlowKind::AddToCart => 'A',
            FlowKind::Purchase => 'P',
        }
    }
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drive `case` through the flow `kind`
pub async fn run_flow(
    kind: FlowKind,
    session: &dyn BrowserSession,
    case: &TestCase,
    scope: &CaseScope<'_>,
) -> Result<Classification> {
    match kind {
        FlowKind::Login => login::run(session, case, scope).await,
        FlowKind::Signup => signup::run(session, case, scope).await,
        FlowKind::Contact => contact::run(session, case, scope).await,
        FlowKind::AddToCart => add_to_cart::run(session, case, scope).await,
        FlowKind::Purchase => purchase::run(session, case, scope).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sheet() {
        assert_eq!(FlowKind::from_sheet("Login"), Some(FlowKind::Login));
        assert_eq!(FlowKind::from_sheet("add-to-cart"), Some(FlowKind::AddToCart));
        assert_eq!(FlowKind::from_sheet("inventory"), None);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in FlowKind::ALL {
            assert_eq!(FlowKind::from_sheet(kind.name()), Some(kind));
        }
    }
}
