use std::sync::Arc;

use crate::auth::Authenticator;
use crate::store::JobStore;
use crate::upload::UploadStorage;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Entity store. `PgStore` in production, `MemoryStore` for local runs and tests.
    pub store: Arc<dyn JobStore>,
    pub auth: Arc<dyn Authenticator>,
    pub uploads: Arc<UploadStorage>,
}
