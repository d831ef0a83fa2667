pub mod constants;
pub mod error;
pub mod table;
pub mod types;

pub use error::{Error, Result};
pub use table::TagTable;
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
