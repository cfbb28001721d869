//! Shared application state and router assembly.

use std::fmt;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::{Authenticator, RoleAccess};
use crate::repository::ContactStore;
use crate::routes;

/// Collaborators handed to every request.
pub struct AppState {
    pub store: Arc<dyn ContactStore>,
    pub authenticator: Arc<dyn Authenticator>,
    /// Gate for `GET /contacts/all`.
    pub list_all_access: RoleAccess,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &"<ContactStore>")
            .field("authenticator", &"<Authenticator>")
            .field("list_all_access", &self.list_all_access)
            .finish()
    }
}

impl AppState {
    pub fn new(store: Arc<dyn ContactStore>, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            store,
            authenticator,
            list_all_access: RoleAccess::elevated(),
        }
    }
}

/// Builds the HTTP router with every route mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/healthz", get(healthz))
        .merge(routes::contacts());

    Router::new()
        .nest("/api", api)
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
