//! Core data types for the microblog domain.
//!
//! Identifiers are plain `i64` row ids assigned by the store. The structures
//! here are what storage backends hand back to the HTTP layer; the wire
//! rendering lives in `microblog-api`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{validate_tweet_text, ValidationError};

pub type UserId = i64;
pub type TweetId = i64;
pub type MediaId = i64;

/// An authenticated account, as seen by other users.
///
/// The credential is deliberately not part of this type; only the identity
/// store ever sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// A user together with both directions of the follow relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user: User,
    /// Users following this one, ordered by id.
    pub followers: Vec<User>,
    /// Users this one follows, ordered by id.
    pub following: Vec<User>,
}

/// A stored tweet without its joined relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tweet {
    pub id: TweetId,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Cached projection of the number of like records for this tweet.
    pub likes_count: u32,
}

/// A stored upload. `tweet_id` is `None` until a tweet claims it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub id: MediaId,
    /// Path relative to the media root, e.g. `0192...e4.png`.
    pub path: String,
    pub tweet_id: Option<TweetId>,
}

/// A validated request to publish a tweet.
///
/// The only way to build one is [`NewTweet::new`], so storage backends never
/// see text over the length limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTweet {
    author_id: UserId,
    text: String,
    media_ids: Vec<MediaId>,
}

impl NewTweet {
    /// Validate `text` and collect the media ids to attach.
    ///
    /// Duplicate media ids are collapsed; attaching the same upload twice is
    /// the same as attaching it once.
    pub fn new(
        author_id: UserId,
        text: impl Into<String>,
        media_ids: impl IntoIterator<Item = MediaId>,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        validate_tweet_text(&text)?;
        let mut media_ids: Vec<MediaId> = media_ids.into_iter().collect();
        media_ids.sort_unstable();
        media_ids.dedup();
        Ok(Self {
            author_id,
            text,
            media_ids,
        })
    }

    pub fn author_id(&self) -> UserId {
        self.author_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn media_ids(&self) -> &[MediaId] {
        &self.media_ids
    }
}

/// One entry of a viewer's feed with every relation already joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTweet {
    pub id: TweetId,
    pub text: String,
    pub author: User,
    pub created_at: DateTime<Utc>,
    pub likes_count: u32,
    /// Storage paths of attached media, ordered by media id.
    pub attachments: Vec<String>,
    /// Users who liked the tweet.
    pub likes: Vec<User>,
}

/// Which side of the follow state machine a request is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowAction {
    Follow,
    Unfollow,
}

impl std::fmt::Display for FollowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FollowAction::Follow => write!(f, "follow"),
            FollowAction::Unfollow => write!(f, "unfollow"),
        }
    }
}
