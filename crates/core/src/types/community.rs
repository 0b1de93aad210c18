//! Community forum types.
//!
//! Read shapes for the forum endpoints plus the thread/post creation
//! payloads. Threads are addressed by slug everywhere, matching the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::{CategoryId, PostId, ThreadId};

/// A forum category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumCategory {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thread_count: u64,
}

/// A discussion thread, as listed inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumThread {
    pub id: ThreadId,
    pub title: String,
    pub slug: String,
    pub author_username: String,
    #[serde(default)]
    pub post_count: u64,
    pub created_at: DateTime<Utc>,
    /// Present on detail reads only.
    #[serde(default)]
    pub posts: Vec<ForumPost>,
}

/// A single post inside a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: PostId,
    pub author_username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for `POST /community/forum-threads/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewThread {
    pub category_slug: String,
    pub title: String,
    pub initial_post_content: String,
}

/// Payload for `POST /community/forum-threads/{slug}/create-post/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewPost {
    pub content: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_list_shape_has_no_posts() {
        let body = serde_json::json!({
            "id": 4,
            "title": "Sourcing GOTS cotton",
            "slug": "sourcing-gots-cotton",
            "author_username": "millco",
            "post_count": 2,
            "created_at": "2025-05-10T08:30:00Z"
        });
        let thread: ForumThread = serde_json::from_value(body).unwrap();
        assert!(thread.posts.is_empty());
        assert_eq!(thread.post_count, 2);
    }
}
