pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use catalog::{ActionCatalog, ActionSpec};
pub use config::AppConfig;
pub use error::{HrflowError, Result};
pub use event::EventBus;
pub use types::*;
