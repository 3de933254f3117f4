//! Recipe Ingredient Sync
//!
//! Client-side ingredient list for a recipe, kept in sync with a REST service
//! and degrading to local changes when the service is unreachable.
//!
//! Layers:
//! - models: API payloads
//! - remote: service bindings (HTTP, in-memory)
//! - store: the session-owned list and its fallback rules
//! - notify: where outcomes are reported

pub mod config;
pub mod error;
pub mod export;
pub mod inference;
pub mod models;
pub mod notify;
pub mod remote;
pub mod store;

pub use config::ClientConfig;
pub use error::{ConfigError, RemoteError, RemoteResult, StoreError};
pub use models::{ExportFormat, Ingredient, IngredientAnalysis, IngredientPatch, NewIngredient, OrderEntry, Unit};
pub use notify::{LogSink, Notification, NotificationLevel, NotificationSink, RecordingSink};
pub use remote::{HttpRemote, InMemoryRemote, IngredientRemote};
pub use store::{IngredientStore, Outcome, SyncStatus};

use std::path::Path;
use std::sync::Arc;

/// Set up file logging under `log_dir`.
pub fn init_logging(log_dir: &Path) -> Result<(), rolling_logger::LoggerError> {
    rolling_logger::init_logger(log_dir, "RecipeIngredients")?;
    rolling_logger::info("Logging initialized");
    Ok(())
}

/// Open a store against the HTTP service described by `config`, reporting
/// through the `log` facade.
pub async fn open_http_store(config: &ClientConfig) -> Result<IngredientStore, RemoteError> {
    let remote = HttpRemote::new(config)?;
    log::info!("Opening ingredient store at {}", remote.base_url());
    Ok(IngredientStore::load(Arc::new(remote), Arc::new(LogSink)).await)
}
