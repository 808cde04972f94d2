use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents a user's canonical identity record stored in the `users` table.
/// Users are provisioned externally; this service only reads them during
/// authentication and when joining author details onto posts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    // The RBAC field: 'user' or 'admin'.
    pub role: String,
    // Deactivated accounts keep their rows but are rejected at authentication.
    pub is_active: bool,
}

/// PostRecord
///
/// Raw post row (internal use). Matches the `posts` table column for column and is
/// used by the in-memory repository before author/category details are joined on.
#[derive(Debug, Clone, Default)]
pub struct PostRecord {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub tags: Vec<String>,
    pub status: String,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

/// CommentRecord
///
/// Raw comment row (internal use), mirroring the `comments` table.
#[derive(Debug, Clone, Default)]
pub struct CommentRecord {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// --- Joined Row Schemas (Repository Output) ---

/// PostSummaryRow
///
/// The flat result of the canonical post query: a `posts` row joined with the
/// author's username/email and the category name. The repository converts this
/// into the nested `Post` response shape.
#[derive(Debug, Clone, FromRow)]
pub struct PostSummaryRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    // NULL when the referenced category no longer exists.
    pub category_name: Option<String>,
    pub author_id: Uuid,
    pub author_username: String,
    pub author_email: String,
    pub tags: Vec<String>,
    pub status: String,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

/// CommentRow
///
/// A comment joined with its author's username. The username is NULL when the
/// commenting user has since been deleted.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_username: Option<String>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// --- Response Schemas (Wire Shapes) ---

// All response bodies use camelCase keys, matching the contract the frontend
// consumes (the ts-rs exports pick the renamed keys up automatically).

/// AuthorSummary
///
/// The author fields exposed on a post: just enough identity for display.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// CategorySummary
///
/// The category fields exposed on a post.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
}

/// CommentAuthor
///
/// The commenting user's display identity.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub username: String,
}

/// Post
///
/// The primary response shape for a post: the stored fields with the author and
/// category references replaced by their joined summaries.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    // None when the referenced category has been removed.
    pub category: Option<CategorySummary>,
    pub author: AuthorSummary,
    pub tags: Vec<String>,
    // 'draft' or 'published'.
    pub status: String,
    pub views: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PostComment
///
/// A single comment in the detail view. `user` is None when the commenting
/// account has been deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostComment {
    pub id: Uuid,
    pub user: Option<CommentAuthor>,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// PostDetail
///
/// The single-post response: the `Post` fields plus the ordered comment thread.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostDetail {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<CategorySummary>,
    pub author: AuthorSummary,
    pub tags: Vec<String>,
    pub status: String,
    pub views: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Oldest first.
    pub comments: Vec<PostComment>,
}

impl PostDetail {
    /// Assembles the detail view from an already-joined post and its comment thread.
    pub fn new(post: Post, comments: Vec<PostComment>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            category: post.category,
            author: post.author,
            tags: post.tags,
            status: post.status,
            views: post.views,
            created_at: post.created_at,
            comments,
        }
    }
}

impl From<PostSummaryRow> for Post {
    fn from(row: PostSummaryRow) -> Self {
        Post {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category_name.map(|name| CategorySummary {
                id: row.category_id,
                name,
            }),
            author: AuthorSummary {
                id: row.author_id,
                username: row.author_username,
                email: row.author_email,
            },
            tags: row.tags,
            status: row.status,
            views: row.views,
            created_at: row.created_at,
        }
    }
}

impl From<CommentRow> for PostComment {
    fn from(row: CommentRow) -> Self {
        PostComment {
            id: row.id,
            user: row.author_username.map(|username| CommentAuthor {
                id: row.user_id,
                username,
            }),
            text: row.text,
            created_at: row.created_at,
        }
    }
}

/// Pagination
///
/// Listing metadata returned alongside every page of posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_posts: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Computes the page metadata for a listing of `total` matching posts.
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        // Ceiling division. The additive (total + limit - 1) form overflows for
        // the near-i64::MAX limits the query parser accepts.
        let total_pages = if limit > 0 {
            total / limit + i64::from(total % limit != 0)
        } else {
            0
        };
        Self {
            current_page: page,
            total_pages,
            total_posts: total,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// ListPostsResponse
///
/// Output schema for the post listing endpoint (GET /api/posts).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ListPostsResponse {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

/// MessageResponse
///
/// Generic confirmation body, e.g. after a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// HealthResponse
///
/// Output schema for the liveness endpoint (GET /health).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct HealthResponse {
    pub status: String,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreatePostRequest
///
/// Input payload for submitting a new post (POST /api/posts).
///
/// There is deliberately no `author` field: the author is always taken from the
/// authenticated caller, and any author value supplied in the JSON body is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    /// The category id, as a string. Validated before the post is stored.
    pub category: String,
    pub tags: Option<Vec<String>>,
    /// 'draft' or 'published'. Defaults to 'draft' when omitted or empty.
    pub status: Option<String>,
}

/// UpdatePostRequest
///
/// Partial update payload for modifying an existing post (PUT /api/posts/{id}).
/// Every field is optional; absent (or blank) fields leave the stored value untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// --- Normalized Write Payloads (Validation Output) ---

/// NewPost
///
/// A create request that has passed validation: trimmed required fields, a parsed
/// category id, and the status/tags defaults applied.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    pub tags: Vec<String>,
    pub status: String,
}

/// PostPatch
///
/// The explicit optional-field patch produced from an update request. A `Some`
/// field is written; a `None` field is left untouched. This keeps "absent" and
/// "blank" inputs from clearing stored values.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}
