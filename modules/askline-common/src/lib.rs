pub mod config;
pub mod error;
pub mod pseudonym;
pub mod types;

pub use config::Config;
pub use error::AsklineError;
pub use types::*;
