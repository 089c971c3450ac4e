//! Storage abstraction layer for the microblog server.
//!
//! The [`Storage`] trait defines the contract between the HTTP handler layer
//! and persistence. Unlike a plain data-access layer, each mutating method is
//! a complete unit of work: it loads the facts a transition needs, asks the
//! rules in the `microblog` core crate whether the transition is allowed, and
//! applies every effect, all inside one transaction. A like never lands
//! without its counter step, and a rejected transition leaves no trace.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, ephemeral servers |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use microblog::{
    next_like_count, CounterStep, DomainError, FeedTweet, Media, MediaId, NewTweet, Tweet,
    TweetId, User, UserId, UserProfile,
};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The transition was refused by a domain rule. Recoverable by the caller.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A uniqueness constraint outside the domain rules was hit
    /// (e.g. duplicate user name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for a microblog server.
///
/// All methods are `async` and return `Result<_, StorageError>`.
/// Implementations must be `Send + Sync + 'static` so they can be held in an
/// `Arc<dyn Storage>` and handed to every request.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Identities ----------------------------------------------------------

    /// Register a user with a pre-issued credential. Returns
    /// [`StorageError::Conflict`] if the name or the credential is taken.
    async fn create_user(&self, name: &str, api_key: &str) -> Result<User, StorageError>;

    /// Resolve a credential to its user. `None` if nobody holds it.
    async fn user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StorageError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    async fn count_users(&self) -> Result<u64, StorageError>;

    /// A user with followers and following, both ordered by id.
    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, StorageError>;

    // --- Follow graph --------------------------------------------------------

    /// Add the edge `follower -> target`.
    ///
    /// Fails with `SelfReference`, `TargetNotFound`, or `AlreadyFollowing`, in
    /// that order of precedence. Never creates the reverse edge.
    async fn follow(&self, follower: UserId, target: UserId) -> Result<(), StorageError>;

    /// Remove the edge `follower -> target`.
    ///
    /// Fails with `SelfReference`, `TargetNotFound`, or `NotFollowing`.
    async fn unfollow(&self, follower: UserId, target: UserId) -> Result<(), StorageError>;

    async fn is_following(&self, follower: UserId, target: UserId) -> Result<bool, StorageError>;

    /// Users that `user` follows, ordered by id.
    async fn list_following(&self, user: UserId) -> Result<Vec<User>, StorageError>;

    /// Users that follow `user`, ordered by id.
    async fn list_followers(&self, user: UserId) -> Result<Vec<User>, StorageError>;

    // --- Engagement ----------------------------------------------------------

    /// Insert the like record and step the cached counter up, together.
    ///
    /// Fails with `TweetNotFound` or `AlreadyLiked`. A concurrent duplicate
    /// that slips past the check is caught by the record's primary key and
    /// reported as `AlreadyLiked` as well.
    async fn like(&self, tweet: TweetId, user: UserId) -> Result<(), StorageError>;

    /// Delete the like record and step the cached counter down (never below
    /// zero), together. Fails with `TweetNotFound` or `NotLiked`.
    async fn unlike(&self, tweet: TweetId, user: UserId) -> Result<(), StorageError>;

    async fn get_tweet(&self, id: TweetId) -> Result<Option<Tweet>, StorageError>;

    /// Live number of like records for `tweet`.
    async fn count_likes(&self, tweet: TweetId) -> Result<u64, StorageError>;

    // --- Media ---------------------------------------------------------------

    /// Record an upload that is not yet attached to any tweet.
    async fn create_media(&self, path: &str) -> Result<Media, StorageError>;

    async fn get_media(&self, id: MediaId) -> Result<Option<Media>, StorageError>;

    // --- Tweets --------------------------------------------------------------

    /// Persist a tweet and point the named media references at it.
    ///
    /// Unknown media ids are ignored. A media reference that already belongs
    /// to another tweet is moved to the new one.
    async fn create_tweet(&self, tweet: &NewTweet) -> Result<TweetId, StorageError>;

    /// Delete a tweet together with its like records and media references.
    ///
    /// Fails with `TweetNotFound`, then `NotTweetAuthor` if `requester` is not
    /// the author. Returns the media references that were removed so the
    /// caller can delete their stored bytes.
    async fn delete_tweet(
        &self,
        tweet: TweetId,
        requester: UserId,
    ) -> Result<Vec<Media>, StorageError>;

    // --- Feed ----------------------------------------------------------------

    /// Every tweet authored by someone `viewer` follows, with author,
    /// attachments, and likers joined, ordered by `likes_count` ascending.
    ///
    /// Following nobody yields an empty feed, not an error.
    async fn feed(&self, viewer: UserId) -> Result<Vec<FeedTweet>, StorageError>;
}

/// Step a cached like counter, logging when the zero floor had to be applied.
pub(crate) fn step_like_counter(tweet: TweetId, current: u32, step: CounterStep) -> u32 {
    let update = next_like_count(current, step);
    if update.drift {
        tracing::warn!(
            tweet,
            "like counter was already 0 while a like record existed; clamped at 0"
        );
    }
    update.value
}

// ---------------------------------------------------------------------------
// Backend-agnostic scenarios, run by both backends' test modules
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod scenarios {
    use microblog::{DomainError, FollowAction, NewTweet};

    use super::{Storage, StorageError};

    fn domain(err: StorageError) -> DomainError {
        match err {
            StorageError::Domain(d) => d,
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    async fn users(s: &dyn Storage, n: usize) -> Vec<i64> {
        let mut ids = Vec::with_capacity(n);
        for i in 1..=n {
            let u = s
                .create_user(&format!("user{i}"), &format!("key{i}"))
                .await
                .unwrap();
            ids.push(u.id);
        }
        ids
    }

    async fn assert_counter_consistent(s: &dyn Storage, tweet: i64) {
        let cached = s.get_tweet(tweet).await.unwrap().unwrap().likes_count;
        let live = s.count_likes(tweet).await.unwrap();
        assert_eq!(u64::from(cached), live, "cached counter drifted from like records");
    }

    pub async fn identity_lookup(s: &dyn Storage) {
        let alice = s.create_user("alice", "secret").await.unwrap();
        assert_eq!(s.user_by_api_key("secret").await.unwrap(), Some(alice.clone()));
        assert_eq!(s.user_by_api_key("nope").await.unwrap(), None);
        assert_eq!(s.get_user(alice.id).await.unwrap(), Some(alice));
        assert_eq!(s.count_users().await.unwrap(), 1);

        let dup_name = s.create_user("alice", "other").await.unwrap_err();
        assert!(matches!(dup_name, StorageError::Conflict(_)));
        let dup_key = s.create_user("bob", "secret").await.unwrap_err();
        assert!(matches!(dup_key, StorageError::Conflict(_)));
    }

    pub async fn follow_state_machine(s: &dyn Storage) {
        let ids = users(s, 2).await;
        let (a, b) = (ids[0], ids[1]);

        s.follow(a, b).await.unwrap();
        assert!(s.is_following(a, b).await.unwrap());
        assert!(!s.is_following(b, a).await.unwrap(), "follow must not be reciprocal");

        assert_eq!(
            domain(s.follow(a, b).await.unwrap_err()),
            DomainError::AlreadyFollowing { follower: a, target: b }
        );

        s.unfollow(a, b).await.unwrap();
        assert!(!s.is_following(a, b).await.unwrap());
        assert_eq!(
            domain(s.unfollow(a, b).await.unwrap_err()),
            DomainError::NotFollowing { follower: a, target: b }
        );
    }

    pub async fn follow_guards(s: &dyn Storage) {
        let ids = users(s, 2).await;
        let (a, b) = (ids[0], ids[1]);
        s.follow(a, b).await.unwrap();

        assert_eq!(
            domain(s.follow(a, a).await.unwrap_err()),
            DomainError::SelfReference(FollowAction::Follow)
        );
        assert_eq!(
            domain(s.unfollow(a, a).await.unwrap_err()),
            DomainError::SelfReference(FollowAction::Unfollow)
        );
        assert_eq!(
            domain(s.follow(a, 999).await.unwrap_err()),
            DomainError::TargetNotFound { action: FollowAction::Follow, target: 999 }
        );
        assert_eq!(
            domain(s.unfollow(a, 999).await.unwrap_err()),
            DomainError::TargetNotFound { action: FollowAction::Unfollow, target: 999 }
        );
    }

    pub async fn profiles_read_both_directions(s: &dyn Storage) {
        let ids = users(s, 4).await;
        // 1 -> 2, 2 -> 1, 3 -> 1, 4 -> 3
        s.follow(ids[0], ids[1]).await.unwrap();
        s.follow(ids[1], ids[0]).await.unwrap();
        s.follow(ids[2], ids[0]).await.unwrap();
        s.follow(ids[3], ids[2]).await.unwrap();

        let p = s.get_profile(ids[2]).await.unwrap().unwrap();
        assert_eq!(p.user.name, "user3");
        assert_eq!(p.following.iter().map(|u| u.id).collect::<Vec<_>>(), vec![ids[0]]);
        assert_eq!(p.followers.iter().map(|u| u.id).collect::<Vec<_>>(), vec![ids[3]]);

        let followers_of_1: Vec<i64> = s
            .list_followers(ids[0])
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(followers_of_1, vec![ids[1], ids[2]]);
        assert!(s.get_profile(999).await.unwrap().is_none());
    }

    pub async fn like_counter_lockstep(s: &dyn Storage) {
        let ids = users(s, 3).await;
        let tweet = s
            .create_tweet(&NewTweet::new(ids[0], "likeable", []).unwrap())
            .await
            .unwrap();

        s.like(tweet, ids[1]).await.unwrap();
        assert_counter_consistent(s, tweet).await;
        s.like(tweet, ids[2]).await.unwrap();
        assert_counter_consistent(s, tweet).await;
        assert_eq!(s.get_tweet(tweet).await.unwrap().unwrap().likes_count, 2);

        assert_eq!(
            domain(s.like(tweet, ids[1]).await.unwrap_err()),
            DomainError::AlreadyLiked { tweet, user: ids[1] }
        );
        assert_eq!(s.get_tweet(tweet).await.unwrap().unwrap().likes_count, 2);

        s.unlike(tweet, ids[1]).await.unwrap();
        assert_counter_consistent(s, tweet).await;
        assert_eq!(s.get_tweet(tweet).await.unwrap().unwrap().likes_count, 1);

        assert_eq!(
            domain(s.unlike(tweet, ids[1]).await.unwrap_err()),
            DomainError::NotLiked { tweet, user: ids[1] }
        );
        assert_counter_consistent(s, tweet).await;

        assert_eq!(
            domain(s.like(4242, ids[1]).await.unwrap_err()),
            DomainError::TweetNotFound(4242)
        );
        assert_eq!(
            domain(s.unlike(4242, ids[1]).await.unwrap_err()),
            DomainError::TweetNotFound(4242)
        );
    }

    pub async fn unlike_at_zero_stays_at_zero(s: &dyn Storage) {
        let ids = users(s, 2).await;
        let tweet = s
            .create_tweet(&NewTweet::new(ids[0], "quiet", []).unwrap())
            .await
            .unwrap();
        assert_eq!(
            domain(s.unlike(tweet, ids[1]).await.unwrap_err()),
            DomainError::NotLiked { tweet, user: ids[1] }
        );
        assert_eq!(s.get_tweet(tweet).await.unwrap().unwrap().likes_count, 0);
    }

    pub async fn unknown_liker_is_internal(s: &dyn Storage) {
        let ids = users(s, 1).await;
        let tweet = s
            .create_tweet(&NewTweet::new(ids[0], "lonely", []).unwrap())
            .await
            .unwrap();
        let err = s.like(tweet, 999).await.unwrap_err();
        assert!(matches!(err, StorageError::Internal(_)), "got {err:?}");
        assert_eq!(s.count_likes(tweet).await.unwrap(), 0);
        assert_eq!(s.get_tweet(tweet).await.unwrap().unwrap().likes_count, 0);
    }

    pub async fn media_attach_and_cascade(s: &dyn Storage) {
        let ids = users(s, 2).await;
        let m1 = s.create_media("one.png").await.unwrap();
        let m2 = s.create_media("two.jpg").await.unwrap();
        assert_eq!(m1.tweet_id, None);

        let tweet = s
            .create_tweet(&NewTweet::new(ids[0], "with pictures", [m2.id, m1.id, 777]).unwrap())
            .await
            .unwrap();
        assert_eq!(s.get_media(m1.id).await.unwrap().unwrap().tweet_id, Some(tweet));
        assert_eq!(s.get_media(m2.id).await.unwrap().unwrap().tweet_id, Some(tweet));
        s.like(tweet, ids[1]).await.unwrap();

        assert_eq!(
            domain(s.delete_tweet(tweet, ids[1]).await.unwrap_err()),
            DomainError::NotTweetAuthor { tweet, requester: ids[1] }
        );
        assert!(s.get_tweet(tweet).await.unwrap().is_some());

        let removed = s.delete_tweet(tweet, ids[0]).await.unwrap();
        let paths: Vec<&str> = removed.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["one.png", "two.jpg"]);
        assert!(s.get_tweet(tweet).await.unwrap().is_none());
        assert!(s.get_media(m1.id).await.unwrap().is_none());
        assert_eq!(s.count_likes(tweet).await.unwrap(), 0);

        assert_eq!(
            domain(s.delete_tweet(tweet, ids[0]).await.unwrap_err()),
            DomainError::TweetNotFound(tweet)
        );
    }

    pub async fn media_reattachment_is_idempotent(s: &dyn Storage) {
        let ids = users(s, 1).await;
        let m = s.create_media("pic.gif").await.unwrap();
        let first = s
            .create_tweet(&NewTweet::new(ids[0], "first", [m.id]).unwrap())
            .await
            .unwrap();
        let second = s
            .create_tweet(&NewTweet::new(ids[0], "second", [m.id, m.id]).unwrap())
            .await
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(s.get_media(m.id).await.unwrap().unwrap().tweet_id, Some(second));
    }

    pub async fn feed_assembly(s: &dyn Storage) {
        let ids = users(s, 4).await;
        let (viewer, followed_a, followed_b, stranger) = (ids[0], ids[1], ids[2], ids[3]);
        s.follow(viewer, followed_a).await.unwrap();
        s.follow(viewer, followed_b).await.unwrap();

        let pic = s.create_media("a.png").await.unwrap();
        let popular = s
            .create_tweet(&NewTweet::new(followed_a, "popular", [pic.id]).unwrap())
            .await
            .unwrap();
        let quiet = s
            .create_tweet(&NewTweet::new(followed_b, "quiet", []).unwrap())
            .await
            .unwrap();
        let hidden = s
            .create_tweet(&NewTweet::new(stranger, "hidden", []).unwrap())
            .await
            .unwrap();
        let own = s
            .create_tweet(&NewTweet::new(viewer, "own", []).unwrap())
            .await
            .unwrap();
        s.like(popular, viewer).await.unwrap();
        s.like(popular, stranger).await.unwrap();
        s.like(hidden, viewer).await.unwrap();

        let feed = s.feed(viewer).await.unwrap();
        let feed_ids: Vec<i64> = feed.iter().map(|t| t.id).collect();
        assert_eq!(feed_ids, vec![quiet, popular], "ascending by likes_count");
        assert!(!feed_ids.contains(&hidden));
        assert!(!feed_ids.contains(&own));

        let top = &feed[1];
        assert_eq!(top.text, "popular");
        assert_eq!(top.author.id, followed_a);
        assert_eq!(top.likes_count, 2);
        assert_eq!(top.attachments, vec!["a.png".to_string()]);
        let mut likers: Vec<&str> = top.likes.iter().map(|u| u.name.as_str()).collect();
        likers.sort_unstable();
        assert_eq!(likers, vec!["user1", "user4"]);

        assert!(feed[0].likes.is_empty());
        assert!(feed[0].attachments.is_empty());

        assert!(s.feed(stranger).await.unwrap().is_empty(), "follows nobody");

        s.delete_tweet(popular, followed_a).await.unwrap();
        let feed_ids: Vec<i64> = s.feed(viewer).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(feed_ids, vec![quiet]);
    }
}
