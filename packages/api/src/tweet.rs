//! Tweet types: publishing, and the feed rendering.

use microblog::{FeedTweet, MediaId, TweetId, User, UserId};
use serde::{Deserialize, Serialize};

/// Request body for `POST /api/tweets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTweetRequest {
    /// Tweet text; at most 280 characters.
    pub tweet_data: String,

    /// Ids returned by earlier `POST /api/medias` calls. `null`, `[]`, and an
    /// absent field all mean "no attachments".
    #[serde(default)]
    pub tweet_media_ids: Option<Vec<MediaId>>,
}

/// Response to `POST /api/tweets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetCreated {
    pub result: bool,
    pub tweet_id: TweetId,
}

impl TweetCreated {
    pub fn new(tweet_id: TweetId) -> Self {
        Self {
            result: true,
            tweet_id,
        }
    }
}

/// A user who liked a tweet, as rendered inside [`TweetView::likes`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeView {
    pub user_id: UserId,
    pub name: String,
}

impl From<User> for LikeView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
        }
    }
}

/// One tweet in a feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TweetView {
    pub id: TweetId,
    /// The tweet text.
    pub content: String,
    pub author: User,
    pub likes: Vec<LikeView>,
    /// Media storage paths, not media ids.
    pub attachments: Vec<String>,
    pub likes_count: u32,
}

impl From<FeedTweet> for TweetView {
    fn from(t: FeedTweet) -> Self {
        Self {
            id: t.id,
            content: t.text,
            author: t.author,
            likes: t.likes.into_iter().map(LikeView::from).collect(),
            attachments: t.attachments,
            likes_count: t.likes_count,
        }
    }
}

/// Response to `GET /api/tweets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedResponse {
    pub result: bool,
    pub tweets: Vec<TweetView>,
}

impl FeedResponse {
    pub fn new(tweets: impl IntoIterator<Item = FeedTweet>) -> Self {
        Self {
            result: true,
            tweets: tweets.into_iter().map(TweetView::from).collect(),
        }
    }
}
