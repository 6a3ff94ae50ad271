use crate::models::reaction::{CounterDelta, Reaction, ReactionState};

/// Write to perform on the (user, post) reaction record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Insert(Reaction),
    Update(Reaction),
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ReactionState,
    pub op: StoreOp,
    pub delta: CounterDelta,
}

/// Computes the next reaction state for a like/dislike request.
///
/// Repeating the current reaction removes it. Requesting the opposite one
/// flips the record in place and moves one count from the old counter to
/// the new one in a single delta.
pub fn transition(current: ReactionState, requested: Reaction) -> Transition {
    match (current, requested) {
        (ReactionState::None, Reaction::Like) => Transition {
            next: ReactionState::Liked,
            op: StoreOp::Insert(Reaction::Like),
            delta: CounterDelta {
                likes: 1,
                dislikes: 0,
            },
        },
        (ReactionState::None, Reaction::Dislike) => Transition {
            next: ReactionState::Disliked,
            op: StoreOp::Insert(Reaction::Dislike),
            delta: CounterDelta {
                likes: 0,
                dislikes: 1,
            },
        },
        (ReactionState::Liked, Reaction::Like) => Transition {
            next: ReactionState::None,
            op: StoreOp::Delete,
            delta: CounterDelta {
                likes: -1,
                dislikes: 0,
            },
        },
        (ReactionState::Liked, Reaction::Dislike) => Transition {
            next: ReactionState::Disliked,
            op: StoreOp::Update(Reaction::Dislike),
            delta: CounterDelta {
                likes: -1,
                dislikes: 1,
            },
        },
        (ReactionState::Disliked, Reaction::Like) => Transition {
            next: ReactionState::Liked,
            op: StoreOp::Update(Reaction::Like),
            delta: CounterDelta {
                likes: 1,
                dislikes: -1,
            },
        },
        (ReactionState::Disliked, Reaction::Dislike) => Transition {
            next: ReactionState::None,
            op: StoreOp::Delete,
            delta: CounterDelta {
                likes: 0,
                dislikes: -1,
            },
        },
    }
}
