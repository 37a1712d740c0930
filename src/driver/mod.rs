pub mod common;
pub mod grid;
pub mod popups;
pub mod traits;
pub mod web;

#[cfg(test)]
pub mod mock;
