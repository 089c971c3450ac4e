//! Demo data for a fresh store.
//!
//! Everything goes through the regular [`Storage`] operations, so the seeded
//! like counters agree with the like records by construction.

use microblog::{NewTweet, UserId};

use crate::storage::{Storage, StorageError};

const USERS: [(&str, &str); 3] = [
    ("Test_user", "test"),
    ("Test_user2", "test2"),
    ("Test_user3", "test3"),
];

/// `(follower, followed)` by position in [`USERS`], 1-based.
const FOLLOWS: [(usize, usize); 5] = [(1, 2), (1, 3), (2, 1), (3, 2), (3, 1)];

/// `(author, text, attached file names)`; author is 1-based into [`USERS`].
const TWEETS: [(usize, &str, &[&str]); 12] = [
    (1, "Test_tweet 1", &["1.jpg"]),
    (2, "Test_tweet 2", &[]),
    (3, "Test_tweet 3", &[]),
    (2, "Test_tweet 4", &["3.jpg"]),
    (1, "Test_tweet 5", &[]),
    (1, "Test_tweet 6", &["5.jpg", "7.jpg", "2.jpg"]),
    (3, "Test_tweet 7", &[]),
    (3, "Test_tweet 8", &["4.jpg"]),
    (2, "Test_tweet 9", &[]),
    (2, "Test_tweet 10", &["8.jpg"]),
    (2, "Test_tweet 11", &["6.jpg"]),
    (1, "Test_tweet 12", &[]),
];

/// `(user, tweet)`, both 1-based.
const LIKES: [(usize, usize); 15] = [
    (1, 1),
    (3, 1),
    (2, 1),
    (2, 2),
    (3, 2),
    (1, 3),
    (2, 3),
    (1, 4),
    (1, 6),
    (3, 6),
    (2, 7),
    (1, 9),
    (2, 9),
    (2, 11),
    (3, 11),
];

/// Seed demo users, follows, tweets, media rows, and likes.
///
/// Does nothing and returns `false` if the store already has users.
pub async fn seed_demo(storage: &dyn Storage) -> Result<bool, StorageError> {
    if storage.count_users().await? > 0 {
        tracing::info!("store already has users; skipping demo seed");
        return Ok(false);
    }

    let mut users: Vec<UserId> = Vec::with_capacity(USERS.len());
    for (name, key) in USERS {
        users.push(storage.create_user(name, key).await?.id);
    }
    let user = |n: usize| users[n - 1];

    for (follower, followed) in FOLLOWS {
        storage.follow(user(follower), user(followed)).await?;
    }

    let mut tweets = Vec::with_capacity(TWEETS.len());
    for (author, text, files) in TWEETS {
        let mut media_ids = Vec::with_capacity(files.len());
        for file in files {
            media_ids.push(storage.create_media(file).await?.id);
        }
        let new_tweet = NewTweet::new(user(author), text, media_ids)
            .map_err(|e| StorageError::Internal(format!("invalid demo tweet: {e}")))?;
        tweets.push(storage.create_tweet(&new_tweet).await?);
    }

    for (liker, tweet) in LIKES {
        storage.like(tweets[tweet - 1], user(liker)).await?;
    }

    tracing::info!(
        users = USERS.len(),
        tweets = TWEETS.len(),
        likes = LIKES.len(),
        "seeded demo data"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{memory::MemoryStorage, sqlite::SqliteStorage};

    #[tokio::test]
    async fn seeds_once() {
        let s = MemoryStorage::new();
        assert!(seed_demo(&s).await.unwrap());
        assert!(!seed_demo(&s).await.unwrap());
        assert_eq!(s.count_users().await.unwrap(), 3);
        let me = s.user_by_api_key("test").await.unwrap().unwrap();
        assert_eq!(me.name, "Test_user");
    }

    #[tokio::test]
    async fn counters_match_like_records() {
        let s = SqliteStorage::open_in_memory().unwrap();
        seed_demo(&s).await.unwrap();
        let expected = [3, 2, 2, 1, 0, 2, 1, 0, 2, 0, 2, 0];
        for (i, want) in expected.into_iter().enumerate() {
            let id = i as i64 + 1;
            let tweet = s.get_tweet(id).await.unwrap().unwrap();
            assert_eq!(tweet.likes_count, want, "tweet {id}");
            assert_eq!(s.count_likes(id).await.unwrap(), u64::from(want));
        }
    }

    #[tokio::test]
    async fn demo_feed_is_ordered() {
        let s = MemoryStorage::new();
        seed_demo(&s).await.unwrap();
        let feed = s.feed(1).await.unwrap();
        // Test_user follows users 2 and 3: tweets 2,3,4,7,8,9,10,11.
        assert_eq!(feed.len(), 8);
        assert!(feed.windows(2).all(|w| w[0].likes_count <= w[1].likes_count));
        let fourth = feed.iter().find(|t| t.text == "Test_tweet 4").unwrap();
        assert_eq!(fourth.attachments, vec!["3.jpg".to_string()]);
        assert_eq!(fourth.likes.len(), 1);
    }
}
