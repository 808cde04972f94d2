use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{CreatePostRequest, NewPost, PostPatch, UpdatePostRequest};

// --- Validation Messages ---

// These exact strings are shared with the client-side form validator so the
// frontend can render identical feedback before and after submission.
pub const TITLE_REQUIRED: &str = "Title is required";
pub const CONTENT_REQUIRED: &str = "Content is required";
pub const CATEGORY_REQUIRED: &str = "Category is required";
pub const INVALID_STATUS: &str = "Status must be either draft or published";
pub const INVALID_CATEGORY: &str = "Invalid category ID";

/// required_field_errors
///
/// Checks the three mandatory post fields and returns a message for every one
/// that is missing, not just the first. Whitespace-only input counts as missing.
pub fn required_field_errors(title: &str, content: &str, category: &str) -> Vec<&'static str> {
    let mut errors = Vec::new();
    if title.trim().is_empty() {
        errors.push(TITLE_REQUIRED);
    }
    if content.trim().is_empty() {
        errors.push(CONTENT_REQUIRED);
    }
    if category.trim().is_empty() {
        errors.push(CATEGORY_REQUIRED);
    }
    errors
}

/// is_valid_status
///
/// A post is either a 'draft' or 'published'; anything else is rejected.
pub fn is_valid_status(status: &str) -> bool {
    status == "draft" || status == "published"
}

/// validate_new_post
///
/// Turns a raw create request into a normalized `NewPost`, or a 400 describing
/// what is wrong with it.
///
/// Missing required fields are reported together (joined with ", ") before the
/// category id or status are even looked at, so a request that is blank across
/// the board gets the full picture in one response.
pub fn validate_new_post(payload: CreatePostRequest) -> Result<NewPost, ApiError> {
    let errors = required_field_errors(&payload.title, &payload.content, &payload.category);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors.join(", ")));
    }

    let category_id = Uuid::parse_str(payload.category.trim())
        .map_err(|_| ApiError::Validation(INVALID_CATEGORY.to_string()))?;

    let status = match payload.status.as_deref() {
        None | Some("") => "draft".to_string(),
        Some(s) if is_valid_status(s) => s.to_string(),
        Some(_) => return Err(ApiError::Validation(INVALID_STATUS.to_string())),
    };

    Ok(NewPost {
        title: payload.title.trim().to_string(),
        content: payload.content.trim().to_string(),
        category_id,
        tags: payload.tags.unwrap_or_default(),
        status,
    })
}

/// build_post_patch
///
/// Converts a partial update request into an explicit `PostPatch`.
///
/// Text fields only make it into the patch when they carry non-blank content
/// after trimming, so sending `"title": "  "` cannot wipe an existing title.
/// Tags are the exception: an explicit empty list clears the stored tags.
pub fn build_post_patch(payload: UpdatePostRequest) -> Result<PostPatch, ApiError> {
    let mut patch = PostPatch::default();

    if let Some(title) = &payload.title {
        if !title.trim().is_empty() {
            patch.title = Some(title.trim().to_string());
        }
    }

    if let Some(content) = &payload.content {
        if !content.trim().is_empty() {
            patch.content = Some(content.trim().to_string());
        }
    }

    if let Some(category) = &payload.category {
        if !category.trim().is_empty() {
            let category_id = Uuid::parse_str(category.trim())
                .map_err(|_| ApiError::Validation(INVALID_CATEGORY.to_string()))?;
            patch.category_id = Some(category_id);
        }
    }

    if let Some(tags) = payload.tags {
        patch.tags = Some(tags);
    }

    if let Some(status) = &payload.status {
        if !status.is_empty() {
            if !is_valid_status(status) {
                return Err(ApiError::Validation(INVALID_STATUS.to_string()));
            }
            patch.status = Some(status.clone());
        }
    }

    Ok(patch)
}
