use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::{
    error::AppError,
    models::{
        decode_body,
        post::{CreatePostRequest, EditPostRequest, Post, PostModel, ReactRequest},
        reaction::{Reaction, ReactionOutcome, ReactionState},
    },
    services::{
        AuthVerifier, IdGenerator,
        interaction::{self, StoreOp},
    },
    store::PostStore,
};

/// Post operations: auth check, load, mutate, persist.
///
/// Request bodies arrive as raw JSON and are type-checked after the token,
/// so each operation fails in the order token, payload, existence,
/// permission.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    auth: Arc<dyn AuthVerifier>,
    ids: Arc<dyn IdGenerator>,
}

impl PostService {
    pub fn new(
        store: Arc<dyn PostStore>,
        auth: Arc<dyn AuthVerifier>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { store, auth, ids }
    }

    /// List every post with its creator's name, newest first.
    pub async fn list_posts(&self, token: Option<&str>) -> Result<Vec<PostModel>, AppError> {
        self.auth.verify(token).await?;

        let posts = self
            .store
            .list_posts_with_creator()
            .await?
            .into_iter()
            .map(|row| Post::from(row).to_model())
            .collect();

        Ok(posts)
    }

    /// Create a post owned by the caller with both counters at zero.
    pub async fn create_post(
        &self,
        token: Option<&str>,
        body: Value,
    ) -> Result<PostModel, AppError> {
        let caller = self.auth.verify(token).await?;
        let payload: CreatePostRequest = decode_body(body)?;

        let post = Post::create(self.ids.next_id(), payload.content, Utc::now(), &caller);
        self.store.insert_post(&post.to_row()).await?;

        tracing::info!(post_id = %post.id(), creator_id = %caller.id, "post created");
        Ok(post.to_model())
    }

    /// Replace a post's content.
    /// Requires: caller is the creator.
    pub async fn edit_post(
        &self,
        token: Option<&str>,
        id: &str,
        body: Value,
    ) -> Result<PostModel, AppError> {
        let caller = self.auth.verify(token).await?;
        let payload: EditPostRequest = decode_body(body)?;

        let row = self
            .store
            .find_post(id)
            .await?
            .ok_or(AppError::NotFound("Post not found".to_string()))?;

        if !caller.can_edit(&row.creator_id) {
            tracing::warn!(post_id = %id, caller_id = %caller.id, "edit denied");
            return Err(AppError::Forbidden(
                "Only the creator of the post can edit it".to_string(),
            ));
        }

        let mut post = Post::from_row(row, caller.name.clone());
        post.set_content(payload.content);
        post.set_updated_at(Utc::now());

        self.store.update_post(id, &post.to_row()).await?;

        tracing::info!(post_id = %id, "post edited");
        Ok(post.to_model())
    }

    /// Delete a post and its reaction records.
    /// Requires: caller is the creator or an admin.
    pub async fn delete_post(&self, token: Option<&str>, id: &str) -> Result<(), AppError> {
        let caller = self.auth.verify(token).await?;

        let row = self
            .store
            .find_post(id)
            .await?
            .ok_or(AppError::NotFound("Post not found".to_string()))?;

        if !caller.can_delete(&row.creator_id) {
            tracing::warn!(post_id = %id, caller_id = %caller.id, "delete denied");
            return Err(AppError::Forbidden(
                "Only the creator of the post or an admin can delete it".to_string(),
            ));
        }

        self.store.delete_post(id).await?;

        tracing::info!(post_id = %id, caller_id = %caller.id, "post deleted");
        Ok(())
    }

    /// Like (`like = true`) or dislike a post.
    ///
    /// The record lookup, the record write and the counter update run inside
    /// one reaction unit for the (caller, post) pair. The returned counters
    /// are the committed ones, so they include concurrent reactions by
    /// other users.
    pub async fn react(
        &self,
        token: Option<&str>,
        id: &str,
        body: Value,
    ) -> Result<ReactionOutcome, AppError> {
        let caller = self.auth.verify(token).await?;
        let payload: ReactRequest = decode_body(body)?;
        let requested = Reaction::from_like_flag(payload.like);

        let mut tx = self.store.begin_reaction(&caller.id, id).await?;

        let mut post: Post = tx
            .find_post_with_creator(id)
            .await?
            .ok_or(AppError::NotFound("Post not found".to_string()))?
            .into();

        let current = ReactionState::from(tx.find_reaction(&caller.id, id).await?);
        let step = interaction::transition(current, requested);
        tracing::debug!(post_id = %id, user_id = %caller.id, ?current, ?requested, next = ?step.next, "reaction transition");

        match step.op {
            StoreOp::Insert(reaction) => tx.insert_reaction(&caller.id, id, reaction).await?,
            StoreOp::Update(reaction) => tx.update_reaction(&caller.id, id, reaction).await?,
            StoreOp::Delete => tx.delete_reaction(&caller.id, id).await?,
        }

        post.apply(step.delta);
        let counters = tx.apply_counters(id, step.delta).await?;
        tx.commit().await?;

        tracing::info!(
            post_id = %id,
            user_id = %caller.id,
            state = ?step.next,
            likes = counters.likes,
            dislikes = counters.dislikes,
            snapshot_likes = post.likes(),
            snapshot_dislikes = post.dislikes(),
            "reaction applied"
        );
        Ok(ReactionOutcome {
            post_id: post.id().to_string(),
            state: step.next,
            likes: counters.likes,
            dislikes: counters.dislikes,
        })
    }
}
