pub mod driver;
pub mod error;
pub mod flows;
pub mod parser;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use error::FlowError;
pub use runner::{run_tests, RunOptions};
