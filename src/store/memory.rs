// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    error::AppError,
    models::{
        post::{PostRow, PostWithCreatorRow},
        reaction::{CounterDelta, PostCounters, Reaction},
    },
    store::{PostStore, ReactionTx},
};

type ReactionKey = (String, String);
type PairLocks = Arc<StdMutex<HashMap<ReactionKey, Arc<Mutex<()>>>>>;

#[derive(Default)]
struct Tables {
    /// user id -> display name
    users: HashMap<String, String>,
    posts: HashMap<String, PostRow>,
    reactions: HashMap<ReactionKey, Reaction>,
}

impl Tables {
    fn with_creator(&self, row: &PostRow) -> Option<PostWithCreatorRow> {
        let name = self.users.get(&row.creator_id)?;
        Some(PostWithCreatorRow {
            id: row.id.clone(),
            creator_id: row.creator_id.clone(),
            content: row.content.clone(),
            likes: row.likes,
            dislikes: row.dislikes,
            created_at: row.created_at,
            updated_at: row.updated_at,
            creator_name: name.clone(),
        })
    }
}

/// In-process store with the same observable behavior as the PostgreSQL
/// adapter: inner join on users, cascading post deletion, per-pair
/// serialization of reaction units and rollback on drop.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    /// Only pairs with a running or waiting unit have an entry.
    pair_locks: PairLocks,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user so posts created by them show up in joined reads.
    pub async fn add_user(&self, id: &str, name: &str) {
        self.tables
            .lock()
            .await
            .users
            .insert(id.to_string(), name.to_string());
    }

    /// Number of stored reaction records, including ones for any post.
    pub async fn reaction_count(&self) -> usize {
        self.tables.lock().await.reactions.len()
    }

    fn pair_lock(&self, key: &ReactionKey) -> Arc<Mutex<()>> {
        let mut locks = self.pair_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.clone()).or_default().clone()
    }

    /// Drops idle lock entries for `post_id`.
    fn release_pairs_for_post(&self, post_id: &str) {
        let mut locks = self.pair_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|(_, p), lock| p != post_id || Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    fn pair_lock_count(&self) -> usize {
        self.pair_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, row: &PostRow) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        if tables.posts.contains_key(&row.id) {
            return Err(AppError::Internal(format!("duplicate post id '{}'", row.id)));
        }
        tables.posts.insert(row.id.clone(), row.clone());
        Ok(())
    }

    async fn find_post(&self, id: &str) -> Result<Option<PostRow>, AppError> {
        Ok(self.tables.lock().await.posts.get(id).cloned())
    }

    async fn update_post(&self, id: &str, row: &PostRow) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(stored) = tables.posts.get_mut(id) {
            stored.content = row.content.clone();
            stored.updated_at = row.updated_at;
        }
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        {
            let mut tables = self.tables.lock().await;
            tables.posts.remove(id);
            tables.reactions.retain(|(_, post_id), _| post_id != id);
        }
        self.release_pairs_for_post(id);
        Ok(())
    }

    async fn list_posts_with_creator(&self) -> Result<Vec<PostWithCreatorRow>, AppError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<PostWithCreatorRow> = tables
            .posts
            .values()
            .filter_map(|row| tables.with_creator(row))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_post_with_creator(
        &self,
        id: &str,
    ) -> Result<Option<PostWithCreatorRow>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables.posts.get(id).and_then(|row| tables.with_creator(row)))
    }

    async fn begin_reaction(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Box<dyn ReactionTx>, AppError> {
        let key = key(user_id, post_id);
        let guard = self.pair_lock(&key).lock_owned().await;

        Ok(Box::new(MemoryReactionTx {
            tables: self.tables.clone(),
            held: None,
            pending: Vec::new(),
            _pair: PairGuard {
                key,
                locks: self.pair_locks.clone(),
                _guard: guard,
            },
        }))
    }
}

/// Holds a pair's lock and removes the pair's entry on release when no
/// other unit is waiting for it.
struct PairGuard {
    key: ReactionKey,
    locks: PairLocks,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map plus the one inside `_guard`; waiters add more.
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            locks.remove(&self.key);
        }
    }
}

enum PendingWrite {
    Upsert(ReactionKey, Reaction),
    Delete(ReactionKey),
    Counters(String, CounterDelta),
}

/// Buffers writes and applies them in one critical section on commit.
///
/// From `apply_counters` until commit or drop the unit keeps the tables
/// locked, so the counters it reports are the ones it commits.
pub struct MemoryReactionTx {
    tables: Arc<Mutex<Tables>>,
    held: Option<OwnedMutexGuard<Tables>>,
    pending: Vec<PendingWrite>,
    _pair: PairGuard,
}

impl MemoryReactionTx {
    async fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        match &self.held {
            Some(tables) => f(tables),
            None => f(&*self.tables.lock().await),
        }
    }

    async fn current(&self, key: &ReactionKey) -> Option<Reaction> {
        for write in self.pending.iter().rev() {
            match write {
                PendingWrite::Upsert(k, reaction) if k == key => return Some(*reaction),
                PendingWrite::Delete(k) if k == key => return None,
                _ => {}
            }
        }
        self.read(|tables| tables.reactions.get(key).copied()).await
    }
}

fn key(user_id: &str, post_id: &str) -> ReactionKey {
    (user_id.to_string(), post_id.to_string())
}

#[async_trait]
impl ReactionTx for MemoryReactionTx {
    async fn find_post_with_creator(
        &mut self,
        post_id: &str,
    ) -> Result<Option<PostWithCreatorRow>, AppError> {
        Ok(self
            .read(|tables| tables.posts.get(post_id).and_then(|row| tables.with_creator(row)))
            .await)
    }

    async fn find_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<Reaction>, AppError> {
        Ok(self.current(&key(user_id, post_id)).await)
    }

    async fn insert_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
        reaction: Reaction,
    ) -> Result<(), AppError> {
        let key = key(user_id, post_id);
        if self.current(&key).await.is_some() {
            return Err(AppError::Internal(format!(
                "duplicate reaction for user '{}' on post '{}'",
                user_id, post_id
            )));
        }
        self.pending.push(PendingWrite::Upsert(key, reaction));
        Ok(())
    }

    async fn update_reaction(
        &mut self,
        user_id: &str,
        post_id: &str,
        reaction: Reaction,
    ) -> Result<(), AppError> {
        let key = key(user_id, post_id);
        if self.current(&key).await.is_some() {
            self.pending.push(PendingWrite::Upsert(key, reaction));
        }
        Ok(())
    }

    async fn delete_reaction(&mut self, user_id: &str, post_id: &str) -> Result<(), AppError> {
        self.pending.push(PendingWrite::Delete(key(user_id, post_id)));
        Ok(())
    }

    async fn apply_counters(
        &mut self,
        post_id: &str,
        delta: CounterDelta,
    ) -> Result<PostCounters, AppError> {
        let guard = match self.held.take() {
            Some(guard) => guard,
            None => self.tables.clone().lock_owned().await,
        };
        let tables = self.held.insert(guard);

        let stored = tables
            .posts
            .get(post_id)
            .ok_or(AppError::NotFound("Post not found".to_string()))?;
        let mut counters = PostCounters {
            likes: stored.likes,
            dislikes: stored.dislikes,
        };
        for write in &self.pending {
            match write {
                PendingWrite::Counters(p, earlier) if p == post_id => {
                    counters.likes += earlier.likes;
                    counters.dislikes += earlier.dislikes;
                }
                _ => {}
            }
        }
        counters.likes += delta.likes;
        counters.dislikes += delta.dislikes;

        self.pending
            .push(PendingWrite::Counters(post_id.to_string(), delta));
        Ok(counters)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let mut this = self;
        let mut tables = match this.held.take() {
            Some(guard) => guard,
            None => this.tables.clone().lock_owned().await,
        };

        for write in &this.pending {
            match write {
                PendingWrite::Upsert((_, post_id), _) if !tables.posts.contains_key(post_id) => {
                    return Err(AppError::Internal(format!(
                        "post '{}' was deleted during the reaction",
                        post_id
                    )));
                }
                _ => {}
            }
        }

        for write in &this.pending {
            match write {
                PendingWrite::Upsert(key, reaction) => {
                    tables.reactions.insert(key.clone(), *reaction);
                }
                PendingWrite::Delete(key) => {
                    tables.reactions.remove(key);
                }
                PendingWrite::Counters(post_id, delta) => {
                    if let Some(post) = tables.posts.get_mut(post_id) {
                        post.likes += delta.likes;
                        post.dislikes += delta.dislikes;
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(id: &str, creator_id: &str) -> PostRow {
        let now = Utc::now();
        PostRow {
            id: id.to_string(),
            creator_id: creator_id.to_string(),
            content: "hello".to_string(),
            likes: 0,
            dislikes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn joined_reads_skip_posts_without_a_known_creator() {
        let store = MemoryStore::new();
        store.add_user("u1", "alice").await;
        store.insert_post(&row("p1", "u1")).await.unwrap();
        store.insert_post(&row("p2", "ghost")).await.unwrap();

        let rows = store.list_posts_with_creator().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].creator_name, "alice");
        assert!(store.find_post_with_creator("p2").await.unwrap().is_none());
        assert!(store.find_post("p2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dropped_unit_discards_writes() {
        let store = MemoryStore::new();
        store.add_user("u1", "alice").await;
        store.insert_post(&row("p1", "u1")).await.unwrap();

        {
            let mut tx = store.begin_reaction("u1", "p1").await.unwrap();
            tx.insert_reaction("u1", "p1", Reaction::Like).await.unwrap();
            tx.apply_counters("p1", CounterDelta { likes: 1, dislikes: 0 })
                .await
                .unwrap();
            assert_eq!(
                tx.find_reaction("u1", "p1").await.unwrap(),
                Some(Reaction::Like)
            );
        }

        assert_eq!(store.reaction_count().await, 0);
        assert_eq!(store.find_post("p1").await.unwrap().unwrap().likes, 0);

        // The pair lock was released with the dropped unit.
        let tx = store.begin_reaction("u1", "p1").await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn committed_unit_applies_relative_counters() {
        let store = MemoryStore::new();
        store.add_user("u1", "alice").await;
        store.insert_post(&row("p1", "u1")).await.unwrap();

        let mut tx = store.begin_reaction("u1", "p1").await.unwrap();
        tx.insert_reaction("u1", "p1", Reaction::Dislike).await.unwrap();
        tx.apply_counters("p1", CounterDelta { likes: 0, dislikes: 1 })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let post = store.find_post("p1").await.unwrap().unwrap();
        assert_eq!((post.likes, post.dislikes), (0, 1));
        assert_eq!(store.reaction_count().await, 1);
    }

    #[tokio::test]
    async fn delete_post_cascades_to_reactions() {
        let store = MemoryStore::new();
        store.add_user("u1", "alice").await;
        store.insert_post(&row("p1", "u1")).await.unwrap();
        store.insert_post(&row("p2", "u1")).await.unwrap();

        for post_id in ["p1", "p2"] {
            let mut tx = store.begin_reaction("u1", post_id).await.unwrap();
            tx.insert_reaction("u1", post_id, Reaction::Like).await.unwrap();
            tx.commit().await.unwrap();
        }

        store.delete_post("p1").await.unwrap();
        assert_eq!(store.reaction_count().await, 1);
    }

    #[tokio::test]
    async fn apply_counters_reports_what_gets_committed() {
        let store = MemoryStore::new();
        store.add_user("owner", "owner").await;
        store.insert_post(&row("p1", "owner")).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let user = format!("u{}", i);
                let mut tx = store.begin_reaction(&user, "p1").await.unwrap();
                tx.insert_reaction(&user, "p1", Reaction::Like).await.unwrap();
                let counters = tx
                    .apply_counters("p1", CounterDelta { likes: 1, dislikes: 0 })
                    .await
                    .unwrap();
                tx.commit().await.unwrap();
                counters.likes
            }));
        }

        let mut reported = Vec::new();
        for handle in handles {
            reported.push(handle.await.unwrap());
        }
        reported.sort();

        // Every unit saw the likes committed before it, and the last one saw them all.
        assert_eq!(reported, (1..=20).collect::<Vec<i64>>());
        assert_eq!(store.find_post("p1").await.unwrap().unwrap().likes, 20);
    }

    #[tokio::test]
    async fn pair_locks_are_released_when_units_finish() {
        let store = MemoryStore::new();
        store.add_user("owner", "owner").await;
        store.insert_post(&row("p", "owner")).await.unwrap();

        for i in 0..100 {
            let tx = store.begin_reaction(&format!("u{}", i), "p").await.unwrap();
            tx.commit().await.unwrap();
        }
        assert_eq!(store.pair_lock_count(), 0);

        let first = store.begin_reaction("u1", "p").await.unwrap();
        let waiter_store = store.clone();
        let waiter = tokio::spawn(async move {
            let tx = waiter_store.begin_reaction("u1", "p").await.unwrap();
            tx.commit().await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(store.pair_lock_count(), 1);

        drop(first);
        waiter.await.unwrap();
        assert_eq!(store.pair_lock_count(), 0);
    }

    #[tokio::test]
    async fn delete_post_keeps_only_busy_pair_locks() {
        let store = MemoryStore::new();
        store.add_user("owner", "owner").await;
        store.insert_post(&row("p1", "owner")).await.unwrap();
        store.insert_post(&row("p2", "owner")).await.unwrap();

        let busy = store.begin_reaction("u1", "p1").await.unwrap();
        store.delete_post("p2").await.unwrap();
        store.delete_post("p1").await.unwrap();
        assert_eq!(store.pair_lock_count(), 1);

        drop(busy);
        assert_eq!(store.pair_lock_count(), 0);
    }
}
