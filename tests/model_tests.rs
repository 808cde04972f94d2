use blog_api::models::{
    AuthorSummary, CategorySummary, CommentAuthor, CreatePostRequest, Pagination, Post,
    PostComment, PostDetail, UpdatePostRequest,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

fn sample_post() -> Post {
    Post {
        id: Uuid::from_u128(7),
        title: "Sample".to_string(),
        content: "Body".to_string(),
        category: Some(CategorySummary {
            id: Uuid::from_u128(40),
            name: "Tech".to_string(),
        }),
        author: AuthorSummary {
            id: Uuid::from_u128(1),
            username: "author".to_string(),
            email: "author@example.com".to_string(),
        },
        tags: vec!["rust".to_string()],
        status: "published".to_string(),
        views: 3,
        created_at: Utc::now(),
    }
}

#[test]
fn test_post_serializes_camel_case() {
    let value = serde_json::to_value(sample_post()).unwrap();

    assert!(value.get("createdAt").is_some());
    assert!(value.get("created_at").is_none());
    assert_eq!(value["author"]["username"], "author");
    assert_eq!(value["category"]["name"], "Tech");
}

#[test]
fn test_pagination_math() {
    let empty = Pagination::new(1, 10, 0);
    assert_eq!(empty.total_pages, 0);
    assert!(!empty.has_next);
    assert!(!empty.has_prev);

    let first = Pagination::new(1, 10, 25);
    assert_eq!(first.total_pages, 3);
    assert!(first.has_next);
    assert!(!first.has_prev);

    let middle = Pagination::new(2, 10, 25);
    assert!(middle.has_next);
    assert!(middle.has_prev);

    let last = Pagination::new(3, 10, 25);
    assert!(!last.has_next);
    assert!(last.has_prev);

    // An exact multiple does not produce a trailing empty page.
    let exact = Pagination::new(2, 10, 20);
    assert_eq!(exact.total_pages, 2);
    assert!(!exact.has_next);

    // Page counting holds at the extremes of the accepted range.
    let oversized = Pagination::new(1, i64::MAX, 25);
    assert_eq!(oversized.total_pages, 1);
    assert!(!oversized.has_next);

    let far_past_end = Pagination::new(i64::MAX, i64::MAX, 25);
    assert_eq!(far_past_end.total_pages, 1);
    assert!(!far_past_end.has_next);
    assert!(far_past_end.has_prev);
}

#[test]
fn test_pagination_serializes_camel_case() {
    let value = serde_json::to_value(Pagination::new(2, 10, 25)).unwrap();

    assert_eq!(value["currentPage"], 2);
    assert_eq!(value["totalPages"], 3);
    assert_eq!(value["totalPosts"], 25);
    assert_eq!(value["hasNext"], true);
    assert_eq!(value["hasPrev"], true);
}

#[test]
fn test_update_request_skips_absent_fields() {
    let patch = UpdatePostRequest {
        title: Some("Only this".to_string()),
        ..Default::default()
    };

    let value = serde_json::to_value(&patch).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(object.contains_key("title"));
}

#[test]
fn test_update_request_from_empty_body() {
    let patch: UpdatePostRequest = serde_json::from_str("{}").unwrap();

    assert!(patch.title.is_none());
    assert!(patch.content.is_none());
    assert!(patch.category.is_none());
    assert!(patch.tags.is_none());
    assert!(patch.status.is_none());
}

#[test]
fn test_create_request_ignores_unknown_fields() {
    let raw = json!({
        "title": "T",
        "content": "C",
        "category": "cat-id",
        "author": "someone-else",
        "views": 9000,
    });

    let request: CreatePostRequest = serde_json::from_value(raw).unwrap();
    assert_eq!(request.title, "T");
    assert_eq!(request.category, "cat-id");
    assert!(request.tags.is_none());
}

#[test]
fn test_comment_author_can_be_null() {
    let raw = json!({
        "id": "00000000-0000-0000-0000-000000000064",
        "user": null,
        "text": "orphaned",
        "createdAt": "2026-01-15T10:00:00Z",
    });

    let comment: PostComment = serde_json::from_value(raw).unwrap();
    assert!(comment.user.is_none());
    assert_eq!(comment.text, "orphaned");
}

#[test]
fn test_post_detail_composes_post_and_comments() {
    let post = sample_post();
    let comments = vec![PostComment {
        id: Uuid::from_u128(100),
        user: Some(CommentAuthor {
            id: Uuid::from_u128(2),
            username: "other".to_string(),
        }),
        text: "Nice".to_string(),
        created_at: Utc::now(),
    }];

    let detail = PostDetail::new(post.clone(), comments);
    assert_eq!(detail.id, post.id);
    assert_eq!(detail.title, post.title);
    assert_eq!(detail.views, post.views);
    assert_eq!(detail.comments.len(), 1);

    let value = serde_json::to_value(&detail).unwrap();
    assert_eq!(value["comments"][0]["user"]["username"], "other");
}
