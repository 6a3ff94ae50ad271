// src/store/mod.rs

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        post::{PostRow, PostWithCreatorRow},
        reaction::{CounterDelta, PostCounters, Reaction},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgPostStore;

/// Row-oriented persistence for posts and their reaction records.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, row: &PostRow) -> Result<(), AppError>;

    async fn find_post(&self, id: &str) -> Result<Option<PostRow>, AppError>;

    async fn update_post(&self, id: &str, row: &PostRow) -> Result<(), AppError>;

    /// Removes the post and every reaction record that points at it.
    async fn delete_post(&self, id: &str) -> Result<(), AppError>;

    async fn list_posts_with_creator(&self) -> Result<Vec<PostWithCreatorRow>, AppError>;

    async fn find_post_with_creator(&self, id: &str)
    -> Result<Option<PostWithCreatorRow>, AppError>;

    /// Opens a unit of work for one user's reaction to one post.
    ///
    /// Units for the same `(user_id, post_id)` pair run one after another;
    /// units for different pairs do not wait on each other.
    async fn begin_reaction(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Box<dyn ReactionTx>, AppError>;
}

/// Read-modify-write access to a reaction record and its post's counters.
///
/// Writes become visible on `commit`. Dropping the unit without committing
/// discards them.
#[async_trait]
pub trait ReactionTx: Send {
    async fn find_post_with_creator(
        &mut self,
        post_id: &str,
    ) -> Result<Option<PostWithCreatorRow>, AppError>;

    async fn find_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<Reaction>, AppError>;

    async fn insert_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
        reaction: Reaction,
    ) -> Result<(), AppError>;

    async fn update_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
        reaction: Reaction,
    ) -> Result<(), AppError>;

    async fn delete_reaction(&mut self, user_id: &str, post_id: &str) -> Result<(), AppError>;

    /// Adds `delta` to the stored counters as a relative update and returns
    /// the counters this unit will leave behind when it commits, including
    /// updates committed by other units in the meantime.
    async fn apply_counters(
        &mut self,
        post_id: &str,
        delta: CounterDelta,
    ) -> Result<PostCounters, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}
