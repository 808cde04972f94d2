use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client
/// (anonymous or logged-in). All of these are read-only.
///
/// Visibility Mandate:
/// The listing endpoint defaults to `status=published` in the handler's filter
/// normalization, so drafts are never served to anonymous browsing. The detail
/// endpoint deliberately has no status restriction: fetching a draft by its id
/// is how authors preview their own unpublished work.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(handlers::health))
        // GET /api/posts?page=...&limit=...&category=...&status=...&search=...
        // Lists posts with pagination metadata, category filtering, and text search.
        // The published-only default is applied during filter normalization.
        .route("/api/posts", get(handlers::list_posts))
        // GET /api/posts/{id}
        // Retrieves a single post with its comment thread, incrementing the view counter.
        .route("/api/posts/{id}", get(handlers::get_post))
}
