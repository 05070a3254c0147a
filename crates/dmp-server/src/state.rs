//! Shared handler state

use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};
use crate::identity::{ForwardedHeaders, IdentityProvider, UserInfo};
use axum::http::HeaderMap;
use dmp_store::{CatalogError, CatalogStore};
use std::sync::Arc;

/// State cloned into every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<CatalogStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub auth: AuthConfig,
}

impl AppState {
    /// State using forwarded-header identity
    #[must_use]
    pub fn new(store: CatalogStore, auth: AuthConfig) -> Self {
        Self {
            store: Arc::new(store),
            identity: Arc::new(ForwardedHeaders::new(&auth)),
            auth,
        }
    }

    /// Run a synchronous store call on the blocking pool
    ///
    /// # Errors
    /// The store's error, or [`ApiError::Internal`] if the task panicked
    pub async fn with_store<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&CatalogStore) -> Result<T, CatalogError> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ApiError::internal(format!("store task failed: {e}")))?
            .map_err(ApiError::from)
    }

    /// Resolve the caller and refuse writes from non-admins when required
    ///
    /// # Errors
    /// [`ApiError::Forbidden`]
    pub async fn authorize_write(&self, headers: &HeaderMap) -> ApiResult<UserInfo> {
        let user = self.identity.identify(headers).await;
        if self.auth.require_admin_for_writes && !user.is_admin {
            tracing::warn!(username = %user.username, "write refused: caller is not an admin");
            return Err(ApiError::forbidden("admin privileges required to modify products"));
        }
        Ok(user)
    }
}
