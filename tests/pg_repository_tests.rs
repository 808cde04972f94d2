use blog_api::{
    models::{NewPost, PostPatch, User},
    repository::{PostFilter, PostgresRepository, RepoError, Repository},
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the live database pool. These tests need a reachable Postgres and
/// are ignored by default; run them with `cargo test -- --ignored`.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Inserts a user with unique credentials so repeated runs never collide.
async fn create_test_user(pool: &PgPool, prefix: &str, role: &str) -> User {
    let id = Uuid::new_v4();
    let username = format!("{}_{}", prefix, id.simple());
    let email = format!("{}@test.com", username);

    sqlx::query_as::<_, User>(
        r#"INSERT INTO users (id, username, email, role, is_active)
           VALUES ($1, $2, $3, $4, TRUE)
           RETURNING id, username, email, role, is_active"#,
    )
    .bind(id)
    .bind(&username)
    .bind(&email)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("Failed to create test user")
}

/// Inserts a category with a unique name and returns its id. Listing tests
/// filter by this id, so leftover rows from earlier runs never interfere.
async fn create_test_category(pool: &PgPool, prefix: &str) -> Uuid {
    let id = Uuid::new_v4();
    let name = format!("{}_{}", prefix, id.simple());

    sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2)")
        .bind(id)
        .bind(&name)
        .execute(pool)
        .await
        .expect("Failed to create test category");

    id
}

fn post_input(title_prefix: &str, category_id: Uuid, status: &str) -> NewPost {
    NewPost {
        title: format!("{} {}", title_prefix, Uuid::new_v4().simple()),
        content: "Integration test content".to_string(),
        category_id,
        tags: vec!["it".to_string()],
        status: status.to_string(),
    }
}

fn filter_for(category_id: Uuid) -> PostFilter {
    PostFilter {
        status: "published".to_string(),
        category: Some(category_id.to_string()),
        search: None,
        page: 1,
        limit: 10,
    }
}

// --- Tests ---

#[test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_create_and_fetch_post_with_joins() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "author", "user").await;
    let category_id = create_test_category(&ctx.pool, "tech").await;

    // 1. Create
    let input = post_input("Joined post", category_id, "published");
    let created = repo
        .create_post(user.id, &input)
        .await
        .expect("Failed to create post");

    assert_eq!(created.title, input.title);
    assert_eq!(created.author.id, user.id);
    assert_eq!(created.author.username, user.username);
    assert_eq!(
        created.category.as_ref().map(|c| c.id),
        Some(category_id),
        "category should come back joined"
    );
    assert_eq!(created.views, 0);
    assert_eq!(created.tags, vec!["it".to_string()]);

    // 2. The same title trips the unique constraint.
    let duplicate = repo.create_post(user.id, &input).await;
    assert!(matches!(duplicate, Err(RepoError::DuplicateTitle)));

    // 3. The detail view carries the joins plus an empty comment thread.
    let detail = repo
        .get_post_detail(created.id)
        .await
        .expect("Failed to fetch detail")
        .expect("Post should exist");
    assert_eq!(detail.author.username, user.username);
    assert!(detail.comments.is_empty());

    // 4. User lookups back the auth extractor.
    let fetched = repo
        .get_user(user.id)
        .await
        .expect("Failed to fetch user")
        .expect("User should exist");
    assert_eq!(fetched.username, user.username);
    assert!(
        repo.get_user(Uuid::new_v4())
            .await
            .expect("Failed to fetch user")
            .is_none()
    );
}

#[test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_listing_filters_and_paginates() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "lister", "user").await;
    let category_id = create_test_category(&ctx.pool, "filter").await;

    let marker = Uuid::new_v4().simple().to_string();
    let mut flagged = post_input("Flagged", category_id, "published");
    flagged.content = format!("Contains marker {}", marker);
    repo.create_post(user.id, &flagged)
        .await
        .expect("Failed to create post");
    repo.create_post(user.id, &post_input("Plain", category_id, "published"))
        .await
        .expect("Failed to create post");
    repo.create_post(user.id, &post_input("Hidden", category_id, "draft"))
        .await
        .expect("Failed to create post");

    // 1. The default filter sees published posts only.
    let (posts, total) = repo
        .list_posts(&filter_for(category_id))
        .await
        .expect("Failed to list posts");
    assert_eq!(total, 2);
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|p| p.status == "published"));

    // 2. Drafts on request.
    let draft_filter = PostFilter {
        status: "draft".to_string(),
        ..filter_for(category_id)
    };
    let (drafts, total) = repo
        .list_posts(&draft_filter)
        .await
        .expect("Failed to list drafts");
    assert_eq!(total, 1);
    assert!(drafts[0].title.starts_with("Hidden"));

    // 3. Text search is case-insensitive and reaches the content.
    let search_filter = PostFilter {
        search: Some(marker.to_uppercase()),
        ..filter_for(category_id)
    };
    let (found, total) = repo
        .list_posts(&search_filter)
        .await
        .expect("Failed to search posts");
    assert_eq!(total, 1);
    assert!(found[0].title.starts_with("Flagged"));

    // 4. Pagination slices the page but reports the full count.
    let page_two = PostFilter {
        page: 2,
        limit: 1,
        ..filter_for(category_id)
    };
    let (second_page, total) = repo
        .list_posts(&page_two)
        .await
        .expect("Failed to page posts");
    assert_eq!(total, 2);
    assert_eq!(second_page.len(), 1);
}

#[test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_update_delete_and_author_lookup() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "editor", "user").await;
    let category_id = create_test_category(&ctx.pool, "drafting").await;

    let created = repo
        .create_post(user.id, &post_input("Mutable", category_id, "published"))
        .await
        .expect("Failed to create post");

    assert_eq!(
        repo.get_post_author(created.id)
            .await
            .expect("Failed to fetch author"),
        Some(user.id)
    );

    // 1. A partial patch touches only the named fields.
    let patch = PostPatch {
        title: Some(format!("Renamed {}", Uuid::new_v4().simple())),
        content: Some("Edited".to_string()),
        ..Default::default()
    };
    let updated = repo
        .update_post(created.id, &patch)
        .await
        .expect("Failed to update post")
        .expect("Post should exist");
    assert_eq!(updated.content, "Edited");
    assert_eq!(updated.status, "published");
    assert_eq!(updated.category.as_ref().map(|c| c.id), Some(category_id));

    // 2. An all-None patch rewrites nothing.
    let unchanged = repo
        .update_post(created.id, &PostPatch::default())
        .await
        .expect("Failed to update post")
        .expect("Post should exist");
    assert_eq!(unchanged.title, updated.title);
    assert_eq!(unchanged.content, "Edited");

    // 3. Delete once, then the row is gone.
    assert!(repo.delete_post(created.id).await.expect("delete failed"));
    assert_eq!(
        repo.get_post_author(created.id)
            .await
            .expect("Failed to fetch author"),
        None
    );
    assert!(!repo.delete_post(created.id).await.expect("delete failed"));
}

#[test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_record_view_increments() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&ctx.pool, "viewer", "user").await;
    let category_id = create_test_category(&ctx.pool, "popular").await;

    let created = repo
        .create_post(user.id, &post_input("Watched", category_id, "published"))
        .await
        .expect("Failed to create post");

    repo.record_view(created.id).await.expect("view failed");
    repo.record_view(created.id).await.expect("view failed");

    let detail = repo
        .get_post_detail(created.id)
        .await
        .expect("Failed to fetch detail")
        .expect("Post should exist");
    assert_eq!(detail.views, 2);

    // Recording against a missing post is a quiet no-op.
    repo.record_view(Uuid::new_v4()).await.expect("view failed");
}

#[test]
#[ignore = "requires a live Postgres via DATABASE_URL"]
async fn test_comments_join_and_order() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let author = create_test_user(&ctx.pool, "poster", "user").await;
    let commenter = create_test_user(&ctx.pool, "commenter", "user").await;
    let category_id = create_test_category(&ctx.pool, "discussed").await;

    let created = repo
        .create_post(author.id, &post_input("Discussed", category_id, "published"))
        .await
        .expect("Failed to create post");

    // Inserted newest first, so the ordering below has to come from
    // created_at. The newer comment's author no longer exists.
    sqlx::query("INSERT INTO comments (id, post_id, user_id, text, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(Uuid::new_v4())
        .bind(created.id)
        .bind(Uuid::new_v4())
        .bind("From a deleted account")
        .bind(Utc::now() - Duration::minutes(1))
        .execute(&ctx.pool)
        .await
        .expect("Failed to insert comment");
    sqlx::query("INSERT INTO comments (id, post_id, user_id, text, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(Uuid::new_v4())
        .bind(created.id)
        .bind(commenter.id)
        .bind("Earliest")
        .bind(Utc::now() - Duration::minutes(10))
        .execute(&ctx.pool)
        .await
        .expect("Failed to insert comment");

    let detail = repo
        .get_post_detail(created.id)
        .await
        .expect("Failed to fetch detail")
        .expect("Post should exist");

    assert_eq!(detail.comments.len(), 2);
    // Oldest first.
    assert_eq!(detail.comments[0].text, "Earliest");
    assert_eq!(
        detail.comments[0].user.as_ref().map(|u| u.username.as_str()),
        Some(commenter.username.as_str())
    );
    assert!(detail.comments[1].user.is_none());
}
