//! Storefront locators shared by the flows

use crate::driver::common::xpath_literal;
use crate::driver::traits::Selector;

pub const LOGIN_MODAL: &str = "logInModal";
pub const SIGNUP_MODAL: &str = "signInModal";
pub const CONTACT_MODAL: &str = "exampleModal";
pub const ORDER_MODAL: &str = "orderModal";

/// Button inside the modal `modal_id` whose text is `label`
pub fn modal_button(modal_id: &str, label: &str) -> Selector {
    Selector::xpath(format!(
        "//div[@id='{}']//button[normalize-space(.)={}]",
        modal_id,
        xpath_literal(label)
    ))
}

pub fn home_link() -> Selector {
    Selector::xpath("//a[normalize-space(text())='Home']")
}

pub fn add_to_cart_button() -> Selector {
    Selector::xpath("//a[normalize-space(.)='Add to cart']")
}

pub fn product_link(name: &str) -> Selector {
    Selector::link_text(name.trim())
}

/// Product grid on the home page and item rows in the cart
pub fn product_table() -> Selector {
    Selector::id("tbodyid")
}

pub fn cart_rows() -> Selector {
    Selector::css("#tbodyid > tr")
}

/// Cart cell holding the product title
pub fn cart_row(product: &str) -> Selector {
    Selector::xpath(format!(
        "//tbody[@id='tbodyid']//td[normalize-space(.)={}]",
        xpath_literal(product.trim())
    ))
}

pub fn place_order_button() -> Selector {
    Selector::xpath("//button[normalize-space(.)='Place Order']")
}
