use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The value stored in a reaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn from_like_flag(like: bool) -> Self {
        if like { Reaction::Like } else { Reaction::Dislike }
    }

    /// Column encoding: 1 = like, 0 = dislike.
    pub fn to_column(self) -> i16 {
        match self {
            Reaction::Like => 1,
            Reaction::Dislike => 0,
        }
    }

    pub fn from_column(value: i16) -> Self {
        if value == 1 { Reaction::Like } else { Reaction::Dislike }
    }
}

/// What a user last did to a post, derived from the presence and value of
/// the reaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionState {
    None,
    Liked,
    Disliked,
}

impl From<Option<Reaction>> for ReactionState {
    fn from(value: Option<Reaction>) -> Self {
        match value {
            None => ReactionState::None,
            Some(Reaction::Like) => ReactionState::Liked,
            Some(Reaction::Dislike) => ReactionState::Disliked,
        }
    }
}

/// Signed change to a post's counters; each field is -1, 0 or +1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CounterDelta {
    pub likes: i64,
    pub dislikes: i64,
}

/// A post's counters as stored after a reaction unit's counter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromRow, Serialize)]
pub struct PostCounters {
    pub likes: i64,
    pub dislikes: i64,
}

/// Represents the 'likes_dislikes' table, keyed by (user_id, post_id).
#[derive(Debug, Clone, FromRow)]
pub struct ReactionRow {
    pub user_id: String,
    pub post_id: String,
    pub like: i16,
}

impl ReactionRow {
    pub fn reaction(&self) -> Reaction {
        Reaction::from_column(self.like)
    }
}

/// Result of a `react` call as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionOutcome {
    pub post_id: String,
    pub state: ReactionState,
    pub likes: i64,
    pub dislikes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_derived_from_record() {
        assert_eq!(ReactionState::from(None), ReactionState::None);
        assert_eq!(ReactionState::from(Some(Reaction::Like)), ReactionState::Liked);
        assert_eq!(
            ReactionState::from(Some(Reaction::Dislike)),
            ReactionState::Disliked
        );
    }

    #[test]
    fn column_encoding_matches_flag() {
        assert_eq!(Reaction::from_like_flag(true).to_column(), 1);
        assert_eq!(Reaction::from_like_flag(false).to_column(), 0);
        assert_eq!(Reaction::from_column(1), Reaction::Like);
        assert_eq!(Reaction::from_column(0), Reaction::Dislike);
    }
}
