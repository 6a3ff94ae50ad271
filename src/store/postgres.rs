// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    config::TableNames,
    error::AppError,
    models::{
        post::{PostRow, PostWithCreatorRow},
        reaction::{CounterDelta, PostCounters, Reaction, ReactionRow},
    },
    store::{PostStore, ReactionTx},
};

/// PostgreSQL-backed store.
///
/// Table names come from configuration and are validated before they are
/// spliced into query text; all values are bound parameters.
#[derive(Clone)]
pub struct PgPostStore {
    pool: PgPool,
    tables: TableNames,
}

impl PgPostStore {
    pub fn new(pool: PgPool, tables: TableNames) -> Result<Self, AppError> {
        tables.validate()?;
        Ok(Self { pool, tables })
    }
}

fn select_with_creator(tables: &TableNames) -> String {
    format!(
        r#"
        SELECT
            p.id, p.creator_id, p.content, p.likes, p.dislikes,
            p.created_at, p.updated_at,
            u.name AS creator_name
        FROM {posts} p
        JOIN {users} u ON p.creator_id = u.id
        "#,
        posts = tables.posts,
        users = tables.users,
    )
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn insert_post(&self, row: &PostRow) -> Result<(), AppError> {
        let sql = format!(
            r#"
            INSERT INTO {} (id, creator_id, content, likes, dislikes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
            self.tables.posts
        );

        sqlx::query(&sql)
            .bind(&row.id)
            .bind(&row.creator_id)
            .bind(&row.content)
            .bind(row.likes)
            .bind(row.dislikes)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to insert post: {:?}", e);
                AppError::from(e)
            })?;

        Ok(())
    }

    async fn find_post(&self, id: &str) -> Result<Option<PostRow>, AppError> {
        let sql = format!(
            r#"
            SELECT id, creator_id, content, likes, dislikes, created_at, updated_at
            FROM {}
            WHERE id = $1
            "#,
            self.tables.posts
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn update_post(&self, id: &str, row: &PostRow) -> Result<(), AppError> {
        // Counters only move through apply_counters.
        let sql = format!(
            "UPDATE {} SET content = $1, updated_at = $2 WHERE id = $3",
            self.tables.posts
        );

        sqlx::query(&sql)
            .bind(&row.content)
            .bind(row.updated_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update post {}: {:?}", id, e);
                AppError::from(e)
            })?;

        Ok(())
    }

    async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        // Reaction rows go with it via ON DELETE CASCADE.
        let sql = format!("DELETE FROM {} WHERE id = $1", self.tables.posts);

        sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete post {}: {:?}", id, e);
                AppError::from(e)
            })?;

        Ok(())
    }

    async fn list_posts_with_creator(&self) -> Result<Vec<PostWithCreatorRow>, AppError> {
        let sql = format!(
            "{} ORDER BY p.created_at DESC",
            select_with_creator(&self.tables)
        );

        let rows = sqlx::query_as::<_, PostWithCreatorRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list posts: {:?}", e);
                AppError::from(e)
            })?;

        Ok(rows)
    }

    async fn find_post_with_creator(
        &self,
        id: &str,
    ) -> Result<Option<PostWithCreatorRow>, AppError> {
        let sql = format!("{} WHERE p.id = $1", select_with_creator(&self.tables));

        let row = sqlx::query_as::<_, PostWithCreatorRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn begin_reaction(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Box<dyn ReactionTx>, AppError> {
        let mut tx = self.pool.begin().await?;

        // Serialize units for the same (user, post) pair until commit/rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{}:{}", user_id, post_id))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PgReactionTx {
            tx,
            tables: self.tables.clone(),
        }))
    }
}

pub struct PgReactionTx {
    tx: Transaction<'static, Postgres>,
    tables: TableNames,
}

#[async_trait]
impl ReactionTx for PgReactionTx {
    async fn find_post_with_creator(
        &mut self,
        post_id: &str,
    ) -> Result<Option<PostWithCreatorRow>, AppError> {
        // KEY SHARE blocks a concurrent delete but not other reactors' counter updates.
        let sql = format!(
            "{} WHERE p.id = $1 FOR KEY SHARE OF p",
            select_with_creator(&self.tables)
        );

        let row = sqlx::query_as::<_, PostWithCreatorRow>(&sql)
            .bind(post_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row)
    }

    async fn find_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<Reaction>, AppError> {
        let sql = format!(
            r#"SELECT user_id, post_id, "like" FROM {} WHERE user_id = $1 AND post_id = $2"#,
            self.tables.reactions
        );

        let row = sqlx::query_as::<_, ReactionRow>(&sql)
            .bind(user_id)
            .bind(post_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(row.map(|r| r.reaction()))
    }

    async fn insert_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
        reaction: Reaction,
    ) -> Result<(), AppError> {
        let sql = format!(
            r#"INSERT INTO {} (user_id, post_id, "like") VALUES ($1, $2, $3)"#,
            self.tables.reactions
        );

        sqlx::query(&sql)
            .bind(user_id)
            .bind(post_id)
            .bind(reaction.to_column())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn update_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
        reaction: Reaction,
    ) -> Result<(), AppError> {
        let sql = format!(
            r#"UPDATE {} SET "like" = $1 WHERE user_id = $2 AND post_id = $3"#,
            self.tables.reactions
        );

        sqlx::query(&sql)
            .bind(reaction.to_column())
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_reaction(&mut self, user_id: &str, post_id: &str) -> Result<(), AppError> {
        let sql = format!(
            "DELETE FROM {} WHERE user_id = $1 AND post_id = $2",
            self.tables.reactions
        );

        sqlx::query(&sql)
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn apply_counters(
        &mut self,
        post_id: &str,
        delta: CounterDelta,
    ) -> Result<PostCounters, AppError> {
        // The row lock taken here is held until commit, so the returned
        // values are the ones that get committed.
        let sql = format!(
            r#"
            UPDATE {}
            SET likes = likes + $1, dislikes = dislikes + $2
            WHERE id = $3
            RETURNING likes, dislikes
            "#,
            self.tables.posts
        );

        sqlx::query_as::<_, PostCounters>(&sql)
            .bind(delta.likes)
            .bind(delta.dislikes)
            .bind(post_id)
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or(AppError::NotFound("Post not found".to_string()))
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
