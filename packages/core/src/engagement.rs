//! Like/unlike rules and the cached like counter.
//!
//! The like record is the source of truth. `likes_count` on the tweet is a
//! projection that backends move by exactly one step in the same atomic unit
//! that inserts or deletes the record.

use crate::error::DomainError;
use crate::types::{TweetId, UserId};

/// Decide whether `user` may like `tweet`. Tweet existence is checked first.
pub fn check_like(
    tweet: TweetId,
    user: UserId,
    tweet_exists: bool,
    already_liked: bool,
) -> Result<(), DomainError> {
    if !tweet_exists {
        return Err(DomainError::TweetNotFound(tweet));
    }
    if already_liked {
        return Err(DomainError::AlreadyLiked { tweet, user });
    }
    Ok(())
}

/// Decide whether `user` may withdraw a like from `tweet`.
pub fn check_unlike(
    tweet: TweetId,
    user: UserId,
    tweet_exists: bool,
    already_liked: bool,
) -> Result<(), DomainError> {
    if !tweet_exists {
        return Err(DomainError::TweetNotFound(tweet));
    }
    if !already_liked {
        return Err(DomainError::NotLiked { tweet, user });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterStep {
    Increment,
    Decrement,
}

/// Result of moving a cached counter by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    pub value: u32,
    /// `true` when a decrement hit the zero floor, which means the counter
    /// had already drifted below the number of like records.
    pub drift: bool,
}

/// Move `current` by one step, never below zero.
pub fn next_like_count(current: u32, step: CounterStep) -> CounterUpdate {
    match step {
        CounterStep::Increment => CounterUpdate {
            value: current.saturating_add(1),
            drift: false,
        },
        CounterStep::Decrement => CounterUpdate {
            value: current.saturating_sub(1),
            drift: current == 0,
        },
    }
}
