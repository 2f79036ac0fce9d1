//! Community board post model and list filters.

use serde::{Deserialize, Serialize};

/// Reserved category label meaning "no category filter".
///
/// Shown as a selectable tab but never sent to the server as a filter value.
pub const ALL_CATEGORY: &str = "전체";

/// A board post. Readable without a session; category is a free-form label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub created_at: String,
    pub author_name: Option<String>,
}

/// Payload for creating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
}

/// Partial update for a post; absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Server-side list filters for the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilters {
    /// Free-text search query.
    pub q: Option<String>,
    /// Category label; [`ALL_CATEGORY`] means unfiltered.
    pub category: Option<String>,
}

impl PostFilters {
    /// True when neither a query nor an effective category filter is set.
    pub fn is_unfiltered(&self) -> bool {
        self.effective_query().is_none() && self.effective_category().is_none()
    }

    /// Query string pairs for the list request; the sentinel category is omitted.
    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = self.effective_query() {
            pairs.push(("q".to_string(), q.to_string()));
        }
        if let Some(category) = self.effective_category() {
            pairs.push(("category".to_string(), category.to_string()));
        }
        pairs
    }

    fn effective_query(&self) -> Option<&str> {
        self.q.as_deref().filter(|q| !q.is_empty())
    }

    fn effective_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|category| !category.is_empty() && *category != ALL_CATEGORY)
    }
}
