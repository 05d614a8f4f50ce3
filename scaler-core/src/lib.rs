pub mod config;
pub mod error;
pub mod logging;
pub mod test_utils;
pub mod types;
pub mod utils;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;
pub use utils::*;
