use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query_builder::QueryBuilder, PgPool, Postgres};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AuthorSummary, CategorySummary, CommentAuthor, CommentRecord, CommentRow, NewPost, Post,
    PostComment, PostDetail, PostPatch, PostRecord, PostSummaryRow, User,
};

/// RepoError
///
/// Failures surfaced by the persistence layer. Constraint violations that map to
/// client errors get their own variant; everything else stays a database error
/// and becomes a 500 at the API boundary.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("a post with this title already exists")]
    DuplicateTitle,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// PostFilter
///
/// The normalized listing criteria: a status (always present, 'published' unless
/// the caller asked otherwise), optional category and text search, and the page
/// window. Built from the raw query string by the listing handler.
#[derive(Debug, Clone)]
pub struct PostFilter {
    pub status: String,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: i64,
    pub limit: i64,
}

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers to interact with
/// the data layer without knowing the specific implementation (Postgres, in-memory).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Post Retrieval ---
    // Filtered, paginated listing. Returns the page of posts plus the total
    // number of posts matching the filter (before pagination).
    async fn list_posts(&self, filter: &PostFilter) -> Result<(Vec<Post>, i64), RepoError>;
    // Single post with its comment thread, regardless of status.
    async fn get_post_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError>;
    // Just the author id, for ownership checks before a mutation.
    async fn get_post_author(&self, id: Uuid) -> Result<Option<Uuid>, RepoError>;

    // --- Post Actions ---
    async fn create_post(&self, author_id: Uuid, new_post: &NewPost) -> Result<Post, RepoError>;
    // Partial update: only the patch's Some fields are written.
    async fn update_post(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, RepoError>;
    // Returns true if a row was deleted, false if the id matched nothing.
    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError>;
    // Bumps the view counter. A missing id is a no-op, not an error.
    async fn record_view(&self, id: Uuid) -> Result<(), RepoError>;

    // --- User/Auth ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// Maps a write error onto `DuplicateTitle` when the underlying cause is the
/// unique constraint on `posts.title`.
fn map_unique_violation(e: sqlx::Error) -> RepoError {
    if e.as_database_error()
        .map_or(false, |db| db.is_unique_violation())
    {
        RepoError::DuplicateTitle
    } else {
        RepoError::Database(e)
    }
}

/// Appends the WHERE clause for a `PostFilter` to a query. Shared between the
/// page query and the COUNT query so the two can never disagree.
fn push_post_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    builder.push(" WHERE p.status = ");
    builder.push_bind(filter.status.clone());

    if let Some(category) = &filter.category {
        // Compared as text so a malformed id matches nothing instead of
        // failing the whole query with a cast error.
        builder.push(" AND p.category_id::text = ");
        builder.push_bind(category.clone());
    }

    if let Some(search) = &filter.search {
        // Case-insensitive search across title and content.
        let search_pattern = format!("%{}%", search);
        builder.push(" AND (p.title ILIKE ");
        builder.push_bind(search_pattern.clone());
        builder.push(" OR p.content ILIKE ");
        builder.push_bind(search_pattern);
        builder.push(")");
    }
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_posts
    ///
    /// Implements filtering and search using QueryBuilder for safe parameterization,
    /// adhering to the **"No SQL Injection Risk"** mandate. Runs the page query and
    /// a matching COUNT so the pagination metadata reflects the same filter.
    async fn list_posts(&self, filter: &PostFilter) -> Result<(Vec<Post>, i64), RepoError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            SELECT
                p.id, p.title, p.content, p.category_id, c.name AS category_name,
                p.author_id, u.username AS author_username, u.email AS author_email,
                p.tags, p.status, p.views, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN categories c ON c.id = p.category_id
            "#,
        );
        push_post_filters(&mut builder, filter);

        builder.push(" ORDER BY p.created_at DESC LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        // page and limit are only bounded below; the product can exceed i64.
        builder.push_bind((filter.page - 1).saturating_mul(filter.limit));

        let rows = builder
            .build_query_as::<PostSummaryRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p");
        push_post_filters(&mut count_builder, filter);

        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(Post::from).collect(), total))
    }

    /// get_post_detail
    ///
    /// Retrieves a single post by ID (no status check, drafts included) together
    /// with its comment thread, oldest comment first.
    async fn get_post_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError> {
        let row = sqlx::query_as::<_, PostSummaryRow>(
            r#"
            SELECT
                p.id, p.title, p.content, p.category_id, c.name AS category_name,
                p.author_id, u.username AS author_username, u.email AS author_email,
                p.tags, p.status, p.views, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        // LEFT JOIN keeps comments whose author account has since been deleted.
        let comments = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT cm.id, cm.user_id, u.username AS author_username, cm.text, cm.created_at
            FROM comments cm
            LEFT JOIN users u ON u.id = cm.user_id
            WHERE cm.post_id = $1
            ORDER BY cm.created_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PostDetail::new(
            row.into(),
            comments.into_iter().map(PostComment::from).collect(),
        )))
    }

    /// get_post_author
    ///
    /// Fetches only the author id, so ownership can be checked before validating
    /// or applying a mutation.
    async fn get_post_author(&self, id: Uuid) -> Result<Option<Uuid>, RepoError> {
        let author = sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    /// create_post
    ///
    /// Inserts a validated post and returns it with author and category joined on.
    /// New posts always start at zero views.
    async fn create_post(&self, author_id: Uuid, new_post: &NewPost) -> Result<Post, RepoError> {
        let new_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, content, category_id, author_id, tags, status, views, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0, NOW())
            "#,
        )
        .bind(new_id)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(new_post.category_id)
        .bind(author_id)
        .bind(&new_post.tags)
        .bind(&new_post.status)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        let row = sqlx::query_as::<_, PostSummaryRow>(
            r#"
            SELECT
                p.id, p.title, p.content, p.category_id, c.name AS category_name,
                p.author_id, u.username AS author_username, u.email AS author_email,
                p.tags, p.status, p.views, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.id = $1
            "#,
        )
        .bind(new_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// update_post
    ///
    /// Applies a partial update. Uses the PostgreSQL `COALESCE` function to handle
    /// `Option<T>` fields, only writing a column when the corresponding patch field
    /// is `Some`. Returns the refreshed joined post, or None if the id matched nothing.
    async fn update_post(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, RepoError> {
        sqlx::query(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                category_id = COALESCE($4, category_id),
                tags = COALESCE($5, tags),
                status = COALESCE($6, status)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.content)
        .bind(patch.category_id)
        .bind(&patch.tags)
        .bind(&patch.status)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        let row = sqlx::query_as::<_, PostSummaryRow>(
            r#"
            SELECT
                p.id, p.title, p.content, p.category_id, c.name AS category_name,
                p.author_id, u.username AS author_username, u.email AS author_email,
                p.tags, p.status, p.views, p.created_at
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    /// delete_post
    ///
    /// Deletes a post by id. Its comments go with it via `ON DELETE CASCADE`.
    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// record_view
    ///
    /// Increments the view counter atomically on the database side, so concurrent
    /// reads of the same post never lose increments.
    async fn record_view(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("UPDATE posts SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// get_user
    ///
    /// Retrieves the user record (identity, role, active flag) needed for
    /// authentication and authorization.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, email, role, is_active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}

// --- In-Memory Implementation ---

/// Locks a mutex, recovering the guard if a previous holder panicked. The maps
/// hold plain owned data, so a poisoned guard is still internally consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// InMemoryRepository
///
/// A `Repository` backed by HashMaps behind mutexes. Drives the test suites
/// without a live database and doubles as a local scratch backend. Behavior
/// mirrors `PostgresRepository`, including the duplicate-title rejection and
/// the joined author/category shapes.
pub struct InMemoryRepository {
    users: Mutex<HashMap<Uuid, User>>,
    categories: Mutex<HashMap<Uuid, String>>,
    posts: Mutex<HashMap<Uuid, PostRecord>>,
    comments: Mutex<Vec<CommentRecord>>,
    // When set, every operation reports a database error.
    fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            categories: Mutex::new(HashMap::new()),
            posts: Mutex::new(HashMap::new()),
            comments: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A repository where every operation fails, for exercising the 500 paths.
    pub fn new_failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn seed_user(&self, user: User) {
        lock(&self.users).insert(user.id, user);
    }

    pub fn seed_category(&self, id: Uuid, name: &str) {
        lock(&self.categories).insert(id, name.to_string());
    }

    pub fn seed_post(&self, post: PostRecord) {
        lock(&self.posts).insert(post.id, post);
    }

    pub fn seed_comment(&self, comment: CommentRecord) {
        lock(&self.comments).push(comment);
    }

    fn check_fail(&self) -> Result<(), RepoError> {
        if self.fail {
            return Err(RepoError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    /// Joins the author and category onto a raw record, mirroring the SQL the
    /// Postgres implementation runs. A record whose author is gone yields None,
    /// matching the INNER JOIN on users.
    fn to_post(&self, record: &PostRecord) -> Option<Post> {
        let users = lock(&self.users);
        let categories = lock(&self.categories);
        let author = users.get(&record.author_id)?;
        Some(Post {
            id: record.id,
            title: record.title.clone(),
            content: record.content.clone(),
            category: categories.get(&record.category_id).map(|name| CategorySummary {
                id: record.category_id,
                name: name.clone(),
            }),
            author: AuthorSummary {
                id: author.id,
                username: author.username.clone(),
                email: author.email.clone(),
            },
            tags: record.tags.clone(),
            status: record.status.clone(),
            views: record.views,
            created_at: record.created_at,
        })
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_posts(&self, filter: &PostFilter) -> Result<(Vec<Post>, i64), RepoError> {
        self.check_fail()?;
        let posts = lock(&self.posts);

        let mut matching: Vec<&PostRecord> = posts
            .values()
            .filter(|p| p.status == filter.status)
            .filter(|p| {
                filter
                    .category
                    .as_ref()
                    .map_or(true, |c| p.category_id.to_string() == *c)
            })
            .filter(|p| {
                filter.search.as_ref().map_or(true, |s| {
                    let needle = s.to_lowercase();
                    p.title.to_lowercase().contains(&needle)
                        || p.content.to_lowercase().contains(&needle)
                })
            })
            .collect();

        // Newest first; ties broken by id so paging stays stable.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        let offset = (filter.page - 1).saturating_mul(filter.limit);
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(filter.limit as usize)
            .filter_map(|record| self.to_post(record))
            .collect();

        Ok((page, total))
    }

    async fn get_post_detail(&self, id: Uuid) -> Result<Option<PostDetail>, RepoError> {
        self.check_fail()?;

        let record = {
            let posts = lock(&self.posts);
            match posts.get(&id) {
                Some(record) => record.clone(),
                None => return Ok(None),
            }
        };
        let Some(post) = self.to_post(&record) else {
            return Ok(None);
        };

        let comments = {
            let comments = lock(&self.comments);
            let users = lock(&self.users);
            let mut thread: Vec<&CommentRecord> =
                comments.iter().filter(|c| c.post_id == id).collect();
            thread.sort_by_key(|c| c.created_at);
            thread
                .into_iter()
                .map(|c| PostComment {
                    id: c.id,
                    user: users.get(&c.user_id).map(|u| CommentAuthor {
                        id: u.id,
                        username: u.username.clone(),
                    }),
                    text: c.text.clone(),
                    created_at: c.created_at,
                })
                .collect()
        };

        Ok(Some(PostDetail::new(post, comments)))
    }

    async fn get_post_author(&self, id: Uuid) -> Result<Option<Uuid>, RepoError> {
        self.check_fail()?;
        let posts = lock(&self.posts);
        Ok(posts.get(&id).map(|p| p.author_id))
    }

    async fn create_post(&self, author_id: Uuid, new_post: &NewPost) -> Result<Post, RepoError> {
        self.check_fail()?;

        let record = {
            let mut posts = lock(&self.posts);
            if posts.values().any(|p| p.title == new_post.title) {
                return Err(RepoError::DuplicateTitle);
            }
            let record = PostRecord {
                id: Uuid::new_v4(),
                title: new_post.title.clone(),
                content: new_post.content.clone(),
                category_id: new_post.category_id,
                author_id,
                tags: new_post.tags.clone(),
                status: new_post.status.clone(),
                views: 0,
                created_at: Utc::now(),
            };
            posts.insert(record.id, record.clone());
            record
        };

        // An unknown author would have failed the users FK in Postgres.
        self.to_post(&record)
            .ok_or(RepoError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_post(&self, id: Uuid, patch: &PostPatch) -> Result<Option<Post>, RepoError> {
        self.check_fail()?;

        let record = {
            let mut posts = lock(&self.posts);
            if !posts.contains_key(&id) {
                return Ok(None);
            }
            if let Some(title) = &patch.title {
                if posts.values().any(|p| p.id != id && p.title == *title) {
                    return Err(RepoError::DuplicateTitle);
                }
            }
            let Some(record) = posts.get_mut(&id) else {
                return Ok(None);
            };
            if let Some(title) = &patch.title {
                record.title = title.clone();
            }
            if let Some(content) = &patch.content {
                record.content = content.clone();
            }
            if let Some(category_id) = patch.category_id {
                record.category_id = category_id;
            }
            if let Some(tags) = &patch.tags {
                record.tags = tags.clone();
            }
            if let Some(status) = &patch.status {
                record.status = status.clone();
            }
            record.clone()
        };

        Ok(self.to_post(&record))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError> {
        self.check_fail()?;
        let mut posts = lock(&self.posts);
        let removed = posts.remove(&id).is_some();
        if removed {
            // Mirrors the ON DELETE CASCADE on comments.post_id.
            lock(&self.comments).retain(|c| c.post_id != id);
        }
        Ok(removed)
    }

    async fn record_view(&self, id: Uuid) -> Result<(), RepoError> {
        self.check_fail()?;
        let mut posts = lock(&self.posts);
        if let Some(record) = posts.get_mut(&id) {
            record.views += 1;
        }
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        self.check_fail()?;
        let users = lock(&self.users);
        Ok(users.get(&id).cloned())
    }
}
