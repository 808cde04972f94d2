use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::validation::{CATEGORY_REQUIRED, CONTENT_REQUIRED, TITLE_REQUIRED};

/// FormField
///
/// The three user-editable fields of the post form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Content,
    Category,
}

/// PostFormData
///
/// The values a successfully validated form submits. Field values are passed
/// through exactly as typed; trimming is the server's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostFormData {
    pub title: String,
    pub content: String,
    pub category: String,
}

/// PostForm
///
/// Client-side state for the post editor: the current field values plus one
/// optional error message per field. The messages are the same constants the
/// server-side validator uses, so feedback reads identically before and after
/// submission.
#[derive(Debug, Default)]
pub struct PostForm {
    title: String,
    content: String,
    category: String,
    title_error: Option<&'static str>,
    content_error: Option<&'static str>,
    category_error: Option<&'static str>,
}

impl PostForm {
    /// An empty form, for composing a new post.
    pub fn new() -> Self {
        Self::default()
    }

    /// A form pre-filled with an existing post's values, for editing.
    pub fn with_initial(title: &str, content: &str, category: &str) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            ..Self::default()
        }
    }

    /// set_field
    ///
    /// Replaces one field's value and clears that field's error, and only that
    /// field's. Other errors stay visible until the next validation pass.
    pub fn set_field(&mut self, field: FormField, value: &str) {
        match field {
            FormField::Title => {
                self.title = value.to_string();
                self.title_error = None;
            }
            FormField::Content => {
                self.content = value.to_string();
                self.content_error = None;
            }
            FormField::Category => {
                self.category = value.to_string();
                self.category_error = None;
            }
        }
    }

    /// validate
    ///
    /// Recomputes all three field errors independently (whitespace-only input
    /// counts as missing) and reports whether the form is submittable.
    pub fn validate(&mut self) -> bool {
        self.title_error = if self.title.trim().is_empty() {
            Some(TITLE_REQUIRED)
        } else {
            None
        };
        self.content_error = if self.content.trim().is_empty() {
            Some(CONTENT_REQUIRED)
        } else {
            None
        };
        self.category_error = if self.category.trim().is_empty() {
            Some(CATEGORY_REQUIRED)
        } else {
            None
        };

        self.title_error.is_none() && self.content_error.is_none() && self.category_error.is_none()
    }

    /// The current error for a field, if the last validation flagged it.
    pub fn error(&self, field: FormField) -> Option<&'static str> {
        match field {
            FormField::Title => self.title_error,
            FormField::Content => self.content_error,
            FormField::Category => self.category_error,
        }
    }

    /// submit
    ///
    /// Validates and, when everything passes, hands back the raw field values
    /// for the API call. Returns None (with errors set) otherwise.
    pub fn submit(&mut self) -> Option<PostFormData> {
        if !self.validate() {
            return None;
        }
        Some(PostFormData {
            title: self.title.clone(),
            content: self.content.clone(),
            category: self.category.clone(),
        })
    }
}
