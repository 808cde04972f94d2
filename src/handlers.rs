use crate::{
    AppState,
    auth::{AuthUser, can_modify},
    error::ApiError,
    models::{
        CreatePostRequest, HealthResponse, ListPostsResponse, MessageResponse, Pagination, Post,
        PostDetail, UpdatePostRequest,
    },
    repository::PostFilter,
    validation::{build_post_patch, validate_new_post},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// ListPostsQuery
///
/// Defines the accepted query parameters for the post listing endpoint (GET /api/posts).
/// Numeric values arrive as strings and are parsed leniently: anything unusable
/// silently falls back to its default rather than failing the request.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ListPostsQuery {
    /// 1-based page number. Defaults to 1.
    pub page: Option<String>,
    /// Page size. Defaults to 10.
    pub limit: Option<String>,
    /// Restrict the listing to a single category id.
    pub category: Option<String>,
    /// Post status to list. Defaults to 'published'.
    pub status: Option<String>,
    /// Case-insensitive search over title and content.
    pub search: Option<String>,
}

impl ListPostsQuery {
    /// Normalizes the raw query string into a `PostFilter`: the published-only
    /// default is applied here, and blank filter values are treated as absent.
    pub fn into_filter(self) -> PostFilter {
        PostFilter {
            status: self
                .status
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "published".to_string()),
            category: self.category.filter(|c| !c.is_empty()),
            search: self.search.filter(|s| !s.is_empty()),
            page: parse_positive(self.page.as_deref(), 1),
            limit: parse_positive(self.limit.as_deref(), 10),
        }
    }
}

/// Parses a positive integer query value, falling back to `default` when the
/// value is missing, malformed, or not positive.
fn parse_positive(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Parses a path segment as a post id. Anything that is not a UUID is a 400,
/// checked before the repository is touched.
fn parse_post_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::InvalidId)
}

// --- Handlers ---

/// list_posts
///
/// [Public Route] Lists posts with pagination, category filtering, and text search.
///
/// *Visibility*: Defaults to `status=published`, so drafts never appear unless the
/// caller asks for them explicitly via `?status=draft`.
#[utoipa::path(
    get,
    path = "/api/posts",
    params(ListPostsQuery),
    responses(
        (status = 200, description = "A page of posts with pagination metadata", body = ListPostsResponse)
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<ListPostsResponse>, ApiError> {
    let filter = query.into_filter();
    let (posts, total) = state.repo.list_posts(&filter).await?;
    let pagination = Pagination::new(filter.page, filter.limit, total);
    Ok(Json(ListPostsResponse { posts, pagination }))
}

/// get_post
///
/// [Public Route] Retrieves a single post with its comment thread, and counts
/// the retrieval as a view.
///
/// *Note*: The increment runs after the post is known to exist; the response
/// carries the already-bumped count without a second fetch.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 400, description = "Malformed ID"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PostDetail>, ApiError> {
    let post_id = parse_post_id(&id)?;

    let mut detail = state
        .repo
        .get_post_detail(post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    state.repo.record_view(post_id).await?;
    detail.views += 1;

    Ok(Json(detail))
}

/// create_post
///
/// [Authenticated Route] Handles the submission of a new post.
/// The author is always the authenticated caller; any author value in the JSON
/// body is ignored, ensuring data integrity.
#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn create_post(
    AuthUser { id: author_id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let new_post = validate_new_post(payload)?;
    let post = state.repo.create_post(author_id, &new_post).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] Applies a partial update to an existing post.
///
/// *Authorization*: The author id is fetched first and checked against the caller
/// before the payload is even validated. Only the post's author (or an admin)
/// may update it.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, ApiError> {
    let post_id = parse_post_id(&id)?;

    let author_id = state
        .repo
        .get_post_author(post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if !can_modify(&user, author_id) {
        return Err(ApiError::Forbidden(
            "Access denied. You can only edit your own posts.".to_string(),
        ));
    }

    let patch = build_post_patch(payload)?;
    let post = state
        .repo
        .update_post(post_id, &patch)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// delete_post
///
/// [Authenticated Route] Deletes a post and, through the schema cascade, its comments.
///
/// *Authorization*: Same ownership rule as update. The 404/403 split is deliberate:
/// a missing post is reported before the ownership check runs.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = String, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let post_id = parse_post_id(&id)?;

    let author_id = state
        .repo
        .get_post_author(post_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    if !can_modify(&user, author_id) {
        return Err(ApiError::Forbidden(
            "Access denied. You can only delete your own posts.".to_string(),
        ));
    }

    if !state.repo.delete_post(post_id).await? {
        // The post vanished between the author check and the delete.
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Post deleted successfully".to_string(),
    }))
}

/// health
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
    })
}

/// route_not_found
///
/// Fallback for any path the router does not know, so unknown routes get the
/// same JSON error shape as everything else.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}
