//! The rejection taxonomy shared by every storage backend.
//!
//! A [`DomainError`] is a caller-recoverable refusal of a state transition.
//! It never means the store is broken; backends report those separately.

use thiserror::Error;

use crate::types::{FollowAction, TweetId, UserId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("a user cannot {0} themselves")]
    SelfReference(FollowAction),

    #[error("{action} target user {target} not found")]
    TargetNotFound { action: FollowAction, target: UserId },

    #[error("user {follower} already follows user {target}")]
    AlreadyFollowing { follower: UserId, target: UserId },

    #[error("user {follower} does not follow user {target}")]
    NotFollowing { follower: UserId, target: UserId },

    #[error("tweet {0} not found")]
    TweetNotFound(TweetId),

    #[error("user {user} already liked tweet {tweet}")]
    AlreadyLiked { tweet: TweetId, user: UserId },

    #[error("user {user} has not liked tweet {tweet}")]
    NotLiked { tweet: TweetId, user: UserId },

    #[error("tweet {tweet} does not belong to user {requester}")]
    NotTweetAuthor { tweet: TweetId, requester: UserId },
}
