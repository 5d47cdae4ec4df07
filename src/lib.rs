pub mod config;
pub mod mentor;
pub mod progress;
pub mod rest;
pub mod rewards;
pub mod shop;
pub mod storage;

use std::sync::Arc;

use config::ServiceConfig;
use mentor::CompletionService;
use storage::Storage;

/// Shared application state passed to every REST handler.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServiceConfig>,
    pub storage: Arc<Storage>,
    /// Opaque completion vendor behind a trait so tests can stub it.
    pub mentor: Arc<dyn CompletionService>,
    pub started_at: std::time::Instant,
}
