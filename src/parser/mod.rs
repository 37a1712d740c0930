pub mod sheet;
pub mod types;
pub mod workbook;

pub use sheet::load_sheets;
pub use types::{Sheet, TestCase};
