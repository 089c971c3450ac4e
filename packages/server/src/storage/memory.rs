//! In-memory storage implementation.
//!
//! All data is held in RAM behind a single [`RwLock`] and is lost when the
//! process exits. Use this for tests, the conformance suite, and ephemeral
//! servers.
//!
//! Every mutating operation takes the write lock once and performs its checks
//! and effects under it, which gives the same all-or-nothing behaviour the
//! SQLite backend gets from a transaction.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use microblog::{
    check_like, check_unlike, order_feed, CounterStep, DomainError, FeedTweet, FollowGraph, Media,
    MediaId, NewTweet, Tweet, TweetId, User, UserId, UserProfile,
};

use super::{step_like_counter, Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Account {
    user: User,
    api_key: String,
}

#[derive(Default)]
struct Inner {
    users: BTreeMap<UserId, Account>,
    graph: FollowGraph,
    tweets: BTreeMap<TweetId, Tweet>,
    /// `(tweet, user)` so one tweet's likers are a contiguous range.
    likes: BTreeSet<(TweetId, UserId)>,
    medias: BTreeMap<MediaId, Media>,
    last_user_id: UserId,
    last_tweet_id: TweetId,
    last_media_id: MediaId,
}

impl Inner {
    fn users_by_id(&self, ids: Vec<UserId>) -> Vec<User> {
        ids.into_iter()
            .filter_map(|id| self.users.get(&id).map(|a| a.user.clone()))
            .collect()
    }

    fn likers(&self, tweet: TweetId) -> Vec<User> {
        let ids = self
            .likes
            .range((
                Bound::Included((tweet, UserId::MIN)),
                Bound::Included((tweet, UserId::MAX)),
            ))
            .map(|&(_, user)| user)
            .collect();
        self.users_by_id(ids)
    }

    fn is_liked(&self, tweet: TweetId, user: UserId) -> bool {
        self.likes.contains(&(tweet, user))
    }

    fn feed_entry(&self, tweet: &Tweet) -> Option<FeedTweet> {
        let author = self.users.get(&tweet.author_id)?.user.clone();
        let attachments = self
            .medias
            .values()
            .filter(|m| m.tweet_id == Some(tweet.id))
            .map(|m| m.path.clone())
            .collect();
        Some(FeedTweet {
            id: tweet.id,
            text: tweet.text.clone(),
            author,
            created_at: tweet.created_at,
            likes_count: tweet.likes_count,
            attachments,
            likes: self.likers(tweet.id),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Identities ----------------------------------------------------------

    async fn create_user(&self, name: &str, api_key: &str) -> Result<User, StorageError> {
        let mut inner = self.write();
        if inner.users.values().any(|a| a.user.name == name) {
            return Err(StorageError::Conflict(format!("user {name} already exists")));
        }
        if inner.users.values().any(|a| a.api_key == api_key) {
            return Err(StorageError::Conflict("api key already issued".into()));
        }
        inner.last_user_id += 1;
        let user = User {
            id: inner.last_user_id,
            name: name.to_string(),
        };
        inner.users.insert(
            user.id,
            Account {
                user: user.clone(),
                api_key: api_key.to_string(),
            },
        );
        Ok(user)
    }

    async fn user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StorageError> {
        let inner = self.read();
        Ok(inner
            .users
            .values()
            .find(|a| a.api_key == api_key)
            .map(|a| a.user.clone()))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.read().users.get(&id).map(|a| a.user.clone()))
    }

    async fn count_users(&self) -> Result<u64, StorageError> {
        Ok(self.read().users.len() as u64)
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let inner = self.read();
        let Some(account) = inner.users.get(&id) else {
            return Ok(None);
        };
        Ok(Some(UserProfile {
            user: account.user.clone(),
            followers: inner.users_by_id(inner.graph.followers(id)),
            following: inner.users_by_id(inner.graph.following(id)),
        }))
    }

    // --- Follow graph --------------------------------------------------------

    async fn follow(&self, follower: UserId, target: UserId) -> Result<(), StorageError> {
        let mut inner = self.write();
        let target_exists = inner.users.contains_key(&target);
        inner.graph.follow(follower, target, target_exists)?;
        Ok(())
    }

    async fn unfollow(&self, follower: UserId, target: UserId) -> Result<(), StorageError> {
        let mut inner = self.write();
        let target_exists = inner.users.contains_key(&target);
        inner.graph.unfollow(follower, target, target_exists)?;
        Ok(())
    }

    async fn is_following(&self, follower: UserId, target: UserId) -> Result<bool, StorageError> {
        Ok(self.read().graph.is_following(follower, target))
    }

    async fn list_following(&self, user: UserId) -> Result<Vec<User>, StorageError> {
        let inner = self.read();
        Ok(inner.users_by_id(inner.graph.following(user)))
    }

    async fn list_followers(&self, user: UserId) -> Result<Vec<User>, StorageError> {
        let inner = self.read();
        Ok(inner.users_by_id(inner.graph.followers(user)))
    }

    // --- Engagement ----------------------------------------------------------

    async fn like(&self, tweet: TweetId, user: UserId) -> Result<(), StorageError> {
        let mut inner = self.write();
        let liked = inner.is_liked(tweet, user);
        let known_user = inner.users.contains_key(&user);
        let Some(row) = inner.tweets.get_mut(&tweet) else {
            return Err(DomainError::TweetNotFound(tweet).into());
        };
        check_like(tweet, user, true, liked)?;
        if !known_user {
            return Err(StorageError::Internal(format!("like by unknown user {user}")));
        }
        row.likes_count = step_like_counter(tweet, row.likes_count, CounterStep::Increment);
        inner.likes.insert((tweet, user));
        Ok(())
    }

    async fn unlike(&self, tweet: TweetId, user: UserId) -> Result<(), StorageError> {
        let mut inner = self.write();
        let liked = inner.is_liked(tweet, user);
        let Some(row) = inner.tweets.get_mut(&tweet) else {
            return Err(DomainError::TweetNotFound(tweet).into());
        };
        check_unlike(tweet, user, true, liked)?;
        row.likes_count = step_like_counter(tweet, row.likes_count, CounterStep::Decrement);
        inner.likes.remove(&(tweet, user));
        Ok(())
    }

    async fn get_tweet(&self, id: TweetId) -> Result<Option<Tweet>, StorageError> {
        Ok(self.read().tweets.get(&id).cloned())
    }

    async fn count_likes(&self, tweet: TweetId) -> Result<u64, StorageError> {
        Ok(self.read().likers(tweet).len() as u64)
    }

    // --- Media ---------------------------------------------------------------

    async fn create_media(&self, path: &str) -> Result<Media, StorageError> {
        let mut inner = self.write();
        inner.last_media_id += 1;
        let media = Media {
            id: inner.last_media_id,
            path: path.to_string(),
            tweet_id: None,
        };
        inner.medias.insert(media.id, media.clone());
        Ok(media)
    }

    async fn get_media(&self, id: MediaId) -> Result<Option<Media>, StorageError> {
        Ok(self.read().medias.get(&id).cloned())
    }

    // --- Tweets --------------------------------------------------------------

    async fn create_tweet(&self, tweet: &NewTweet) -> Result<TweetId, StorageError> {
        let mut inner = self.write();
        if !inner.users.contains_key(&tweet.author_id()) {
            return Err(StorageError::Internal(format!(
                "author {} does not exist",
                tweet.author_id()
            )));
        }
        inner.last_tweet_id += 1;
        let id = inner.last_tweet_id;
        inner.tweets.insert(
            id,
            Tweet {
                id,
                author_id: tweet.author_id(),
                text: tweet.text().to_string(),
                created_at: Utc::now(),
                likes_count: 0,
            },
        );
        for media_id in tweet.media_ids() {
            if let Some(media) = inner.medias.get_mut(media_id) {
                media.tweet_id = Some(id);
            }
        }
        Ok(id)
    }

    async fn delete_tweet(
        &self,
        tweet: TweetId,
        requester: UserId,
    ) -> Result<Vec<Media>, StorageError> {
        let mut inner = self.write();
        let Some(row) = inner.tweets.get(&tweet) else {
            return Err(DomainError::TweetNotFound(tweet).into());
        };
        if row.author_id != requester {
            return Err(DomainError::NotTweetAuthor { tweet, requester }.into());
        }

        inner.tweets.remove(&tweet);
        inner
            .likes
            .retain(|&(liked_tweet, _)| liked_tweet != tweet);
        let (removed, kept): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut inner.medias)
            .into_iter()
            .partition(|(_, m)| m.tweet_id == Some(tweet));
        inner.medias = kept;
        Ok(removed.into_values().collect())
    }

    // --- Feed ----------------------------------------------------------------

    async fn feed(&self, viewer: UserId) -> Result<Vec<FeedTweet>, StorageError> {
        let inner = self.read();
        let authors: BTreeSet<UserId> = inner.graph.following(viewer).into_iter().collect();
        if authors.is_empty() {
            return Ok(Vec::new());
        }
        let mut feed: Vec<FeedTweet> = inner
            .tweets
            .values()
            .filter(|t| authors.contains(&t.author_id))
            .filter_map(|t| inner.feed_entry(t))
            .collect();
        order_feed(&mut feed);
        Ok(feed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
