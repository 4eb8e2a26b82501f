// Application state shared across all modules

use std::sync::Arc;

use crate::blog::models::{PostRecord, UserIdMatch};
use crate::services::blob_log::BlobLog;
use crate::services::identity::IdentityProvider;

/// Application state: the identity delegate, the post log and request-level policy.
///
/// Built once in `main` and shared read-only behind an `Arc` for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub posts: Arc<BlobLog<PostRecord>>,
    pub posts_key: String,
    pub user_id_match: UserIdMatch,
}

/// Handle type injected into handlers through `Extension`
pub type SharedState = Arc<AppState>;
