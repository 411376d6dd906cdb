use crate::handlers::{
    create_document, current_user, delete_document, diagnostics, get_document, health_check,
    list_documents, login, ready_check, share_document, signup, update_document,
};
use crate::routes::auth_middleware::auth_middleware;
use crate::ws::hub::SessionHub;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(hub: Arc<SessionHub>) -> Router {
    // Everything behind the auth middleware
    let protected = Router::new()
        .route("/auth/user", get(current_user))
        .route("/documents", post(create_document).get(list_documents))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .route("/documents/:id/share", post(share_document))
        .route("/diagnostics", get(diagnostics))
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .merge(protected)
        .with_state(hub)
}
