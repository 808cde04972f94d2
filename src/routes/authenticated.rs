use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Defines the routes that mutate posts, all of which require a signed-in caller.
///
/// Access Control Strategy:
/// This router is wrapped in the auth middleware layer by `create_router`, so a
/// request without a valid bearer token is rejected before any handler body runs.
/// Every handler here additionally receives the validated `AuthUser`, which it
/// uses for the Owner-Only authorization checks in `update_post` and `delete_post`
/// (admins pass those checks for any post).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/posts
        // Submits a new post. The author is always the authenticated caller;
        // defaults (draft status, zero views, empty tags) are applied during validation.
        .route("/api/posts", post(handlers::create_post))
        // PUT/DELETE /api/posts/{id}
        // Allows the author to modify or remove their own post. The **ownership check**
        // is enforced within the handler logic before the payload is validated.
        .route(
            "/api/posts/{id}",
            put(handlers::update_post).delete(handlers::delete_post),
        )
}
