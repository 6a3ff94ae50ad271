use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::{reaction::CounterDelta, user::Caller};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PostRow {
    pub id: String,
    pub creator_id: String,
    pub content: String,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post row joined with its creator's display name.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PostWithCreatorRow {
    pub id: String,
    pub creator_id: String,
    pub content: String,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator_name: String,
}

/// Business-facing view of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostModel {
    pub id: String,
    pub content: String,
    pub likes: i64,
    pub dislikes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator: CreatorModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorModel {
    pub id: String,
    pub name: String,
}

/// In-memory post entity.
///
/// Counters only move through `add_*` / `remove_*` (or `apply`, which calls
/// them). Decrements are not bounds-checked: the reaction engine only emits
/// a decrement for a reaction that was previously counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    id: String,
    content: String,
    likes: i64,
    dislikes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    creator_id: String,
    creator_name: String,
}

impl Post {
    /// A fresh post owned by `creator`, with both counters at zero.
    pub fn create(id: String, content: String, now: DateTime<Utc>, creator: &Caller) -> Self {
        Self {
            id,
            content,
            likes: 0,
            dislikes: 0,
            created_at: now,
            updated_at: now,
            creator_id: creator.id.clone(),
            creator_name: creator.name.clone(),
        }
    }

    pub fn from_row(row: PostRow, creator_name: String) -> Self {
        Self {
            id: row.id,
            content: row.content,
            likes: row.likes,
            dislikes: row.dislikes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            creator_id: row.creator_id,
            creator_name,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn likes(&self) -> i64 {
        self.likes
    }

    pub fn dislikes(&self) -> i64 {
        self.dislikes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    pub fn creator_name(&self) -> &str {
        &self.creator_name
    }

    pub fn set_content(&mut self, content: String) {
        self.content = content;
    }

    pub fn set_updated_at(&mut self, updated_at: DateTime<Utc>) {
        self.updated_at = updated_at;
    }

    pub fn add_like(&mut self) {
        self.likes += 1;
    }

    pub fn remove_like(&mut self) {
        self.likes -= 1;
    }

    pub fn add_dislike(&mut self) {
        self.dislikes += 1;
    }

    pub fn remove_dislike(&mut self) {
        self.dislikes -= 1;
    }

    /// Applies an engine-computed delta, decrement first.
    pub fn apply(&mut self, delta: CounterDelta) {
        match delta.likes {
            -1 => self.remove_like(),
            1 => self.add_like(),
            _ => {}
        }
        match delta.dislikes {
            -1 => self.remove_dislike(),
            1 => self.add_dislike(),
            _ => {}
        }
    }

    pub fn to_model(&self) -> PostModel {
        PostModel {
            id: self.id.clone(),
            content: self.content.clone(),
            likes: self.likes,
            dislikes: self.dislikes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            creator: CreatorModel {
                id: self.creator_id.clone(),
                name: self.creator_name.clone(),
            },
        }
    }

    pub fn to_row(&self) -> PostRow {
        PostRow {
            id: self.id.clone(),
            creator_id: self.creator_id.clone(),
            content: self.content.clone(),
            likes: self.likes,
            dislikes: self.dislikes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<PostWithCreatorRow> for Post {
    fn from(row: PostWithCreatorRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            likes: row.likes,
            dislikes: row.dislikes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            creator_id: row.creator_id,
            creator_name: row.creator_name,
        }
    }
}

/// DTO for creating a new post.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
}

/// DTO for replacing a post's content.
#[derive(Debug, Clone, Deserialize)]
pub struct EditPostRequest {
    pub content: String,
}

/// DTO for a like (`true`) or dislike (`false`) action.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReactRequest {
    pub like: bool,
}
