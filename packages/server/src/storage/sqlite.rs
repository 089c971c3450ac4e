//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! Every mutating operation runs in one transaction: the existence and edge
//! checks, the insert or delete, and any counter step commit together or not
//! at all. Composite primary keys on `follows` and `likes` back up the checks
//! so a duplicate can never be stored.
//!
//! # Schema
//!
//! - `users`: accounts and their pre-issued api keys.
//! - `follows`: directed `(follower_id, followed_id)` edges.
//! - `tweets`: text, author, timestamp, and the cached `likes_count`.
//! - `medias`: uploaded file paths, attached to at most one tweet.
//! - `likes`: `(user_id, tweet_id)` like records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use microblog::{
    check_follow_transition, check_like, check_unlike, CounterStep, DomainError, FeedTweet,
    FollowAction, Media, MediaId, NewTweet, Tweet, TweetId, User, UserId, UserProfile,
};
use rusqlite::{ffi, params, params_from_iter, Connection, OptionalExtension, Transaction};

use super::{step_like_counter, Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    username  TEXT NOT NULL UNIQUE,
    api_key   TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS follows (
    follower_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    followed_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (follower_id, followed_id),
    CHECK (follower_id <> followed_id)
);
CREATE INDEX IF NOT EXISTS idx_follows_followed ON follows(followed_id);

CREATE TABLE IF NOT EXISTS tweets (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    tweet_data   TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    likes_count  INTEGER NOT NULL DEFAULT 0 CHECK (likes_count >= 0)
);
CREATE INDEX IF NOT EXISTS idx_tweets_user ON tweets(user_id);

CREATE TABLE IF NOT EXISTS medias (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    path      TEXT NOT NULL,
    tweet_id  INTEGER REFERENCES tweets(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_medias_tweet ON medias(tweet_id);

CREATE TABLE IF NOT EXISTS likes (
    user_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    tweet_id  INTEGER NOT NULL REFERENCES tweets(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, tweet_id)
);
CREATE INDEX IF NOT EXISTS idx_likes_tweet ON likes(tweet_id);
";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("storage task failed: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Error conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// True only for a primary-key or unique-index collision. Foreign-key, check
/// and not-null failures are not conflicts.
fn is_duplicate_key(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Map a duplicate-key violation to `on_conflict`, anything else to `Internal`.
fn map_conflict(e: rusqlite::Error, on_conflict: impl FnOnce() -> StorageError) -> StorageError {
    if is_duplicate_key(&e) {
        on_conflict()
    } else {
        map_err(e)
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

fn user_from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
    })
}

fn media_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Media> {
    Ok(Media {
        id: row.get(0)?,
        path: row.get(1)?,
        tweet_id: row.get(2)?,
    })
}

fn query_users(conn: &Connection, sql: &str, id: UserId) -> Result<Vec<User>, StorageError> {
    let mut stmt = conn.prepare(sql).map_err(map_err)?;
    let rows = stmt
        .query_map(params![id], |row| user_from_row(row, 0))
        .map_err(map_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(map_err)
}

fn user_exists(conn: &Connection, id: UserId) -> Result<bool, StorageError> {
    conn.query_row("SELECT 1 FROM users WHERE id = ?1", params![id], |_| Ok(()))
        .optional()
        .map(|r| r.is_some())
        .map_err(map_err)
}

fn edge_exists(conn: &Connection, follower: UserId, target: UserId) -> Result<bool, StorageError> {
    conn.query_row(
        "SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
        params![follower, target],
        |_| Ok(()),
    )
    .optional()
    .map(|r| r.is_some())
    .map_err(map_err)
}

/// Facts a like or unlike needs: the current counter (if the tweet exists)
/// and whether `user` already holds a like record.
fn like_state(
    tx: &Transaction<'_>,
    tweet: TweetId,
    user: UserId,
) -> Result<(Option<u32>, bool), StorageError> {
    let count: Option<u32> = tx
        .query_row(
            "SELECT likes_count FROM tweets WHERE id = ?1",
            params![tweet],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_err)?;
    let liked = tx
        .query_row(
            "SELECT 1 FROM likes WHERE user_id = ?1 AND tweet_id = ?2",
            params![user, tweet],
            |_| Ok(()),
        )
        .optional()
        .map_err(map_err)?
        .is_some();
    Ok((count, liked))
}

/// Shared by follow and unfollow: check the transition, then add or remove
/// the edge.
fn follow_transition(
    conn: &mut Connection,
    action: FollowAction,
    follower: UserId,
    target: UserId,
) -> Result<(), StorageError> {
    let tx = conn.transaction().map_err(map_err)?;
    let (target_exists, edge) = if follower == target {
        (false, false)
    } else {
        (user_exists(&tx, target)?, edge_exists(&tx, follower, target)?)
    };
    check_follow_transition(action, follower, target, target_exists, edge)?;

    match action {
        FollowAction::Follow => {
            tx.execute(
                "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
                params![follower, target],
            )
            .map_err(|e| {
                map_conflict(e, || {
                    DomainError::AlreadyFollowing { follower, target }.into()
                })
            })?;
        }
        FollowAction::Unfollow => {
            tx.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                params![follower, target],
            )
            .map_err(map_err)?;
        }
    }
    tx.commit().map_err(map_err)
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Identities ----------------------------------------------------------

    async fn create_user(&self, name: &str, api_key: &str) -> Result<User, StorageError> {
        let name = name.to_string();
        let api_key = api_key.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO users (username, api_key) VALUES (?1, ?2)",
                params![name, api_key],
            )
            .map_err(|e| {
                map_conflict(e, || {
                    StorageError::Conflict(format!("user {name} or its api key already exists"))
                })
            })?;
            Ok(User {
                id: conn.last_insert_rowid(),
                name,
            })
        })
        .await
    }

    async fn user_by_api_key(&self, api_key: &str) -> Result<Option<User>, StorageError> {
        let api_key = api_key.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, username FROM users WHERE api_key = ?1",
                params![api_key],
                |row| user_from_row(row, 0),
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, username FROM users WHERE id = ?1",
                params![id],
                |row| user_from_row(row, 0),
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn count_users(&self) -> Result<u64, StorageError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get::<_, i64>(0))
                .map(|n| n as u64)
                .map_err(map_err)
        })
        .await
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            let user = tx
                .query_row(
                    "SELECT id, username FROM users WHERE id = ?1",
                    params![id],
                    |row| user_from_row(row, 0),
                )
                .optional()
                .map_err(map_err)?;
            let Some(user) = user else {
                return Ok(None);
            };
            let followers = query_users(
                &tx,
                "SELECT u.id, u.username FROM follows f JOIN users u ON u.id = f.follower_id
                 WHERE f.followed_id = ?1 ORDER BY u.id",
                id,
            )?;
            let following = query_users(
                &tx,
                "SELECT u.id, u.username FROM follows f JOIN users u ON u.id = f.followed_id
                 WHERE f.follower_id = ?1 ORDER BY u.id",
                id,
            )?;
            Ok(Some(UserProfile {
                user,
                followers,
                following,
            }))
        })
        .await
    }

    // --- Follow graph --------------------------------------------------------

    async fn follow(&self, follower: UserId, target: UserId) -> Result<(), StorageError> {
        self.with_conn(move |conn| follow_transition(conn, FollowAction::Follow, follower, target))
            .await
    }

    async fn unfollow(&self, follower: UserId, target: UserId) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            follow_transition(conn, FollowAction::Unfollow, follower, target)
        })
        .await
    }

    async fn is_following(&self, follower: UserId, target: UserId) -> Result<bool, StorageError> {
        self.with_conn(move |conn| edge_exists(conn, follower, target))
            .await
    }

    async fn list_following(&self, user: UserId) -> Result<Vec<User>, StorageError> {
        self.with_conn(move |conn| {
            query_users(
                conn,
                "SELECT u.id, u.username FROM follows f JOIN users u ON u.id = f.followed_id
                 WHERE f.follower_id = ?1 ORDER BY u.id",
                user,
            )
        })
        .await
    }

    async fn list_followers(&self, user: UserId) -> Result<Vec<User>, StorageError> {
        self.with_conn(move |conn| {
            query_users(
                conn,
                "SELECT u.id, u.username FROM follows f JOIN users u ON u.id = f.follower_id
                 WHERE f.followed_id = ?1 ORDER BY u.id",
                user,
            )
        })
        .await
    }

    // --- Engagement ----------------------------------------------------------

    async fn like(&self, tweet: TweetId, user: UserId) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            let (count, liked) = like_state(&tx, tweet, user)?;
            check_like(tweet, user, count.is_some(), liked)?;
            let next = step_like_counter(tweet, count.unwrap_or(0), CounterStep::Increment);

            tx.execute(
                "INSERT INTO likes (user_id, tweet_id) VALUES (?1, ?2)",
                params![user, tweet],
            )
            .map_err(|e| map_conflict(e, || DomainError::AlreadyLiked { tweet, user }.into()))?;
            tx.execute(
                "UPDATE tweets SET likes_count = ?1 WHERE id = ?2",
                params![next, tweet],
            )
            .map_err(map_err)?;
            tx.commit().map_err(map_err)
        })
        .await
    }

    async fn unlike(&self, tweet: TweetId, user: UserId) -> Result<(), StorageError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            let (count, liked) = like_state(&tx, tweet, user)?;
            check_unlike(tweet, user, count.is_some(), liked)?;
            let next = step_like_counter(tweet, count.unwrap_or(0), CounterStep::Decrement);

            tx.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND tweet_id = ?2",
                params![user, tweet],
            )
            .map_err(map_err)?;
            tx.execute(
                "UPDATE tweets SET likes_count = ?1 WHERE id = ?2",
                params![next, tweet],
            )
            .map_err(map_err)?;
            tx.commit().map_err(map_err)
        })
        .await
    }

    async fn get_tweet(&self, id: TweetId) -> Result<Option<Tweet>, StorageError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, user_id, tweet_data, created_at, likes_count FROM tweets WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Tweet {
                        id: row.get(0)?,
                        author_id: row.get(1)?,
                        text: row.get(2)?,
                        created_at: row.get(3)?,
                        likes_count: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    async fn count_likes(&self, tweet: TweetId) -> Result<u64, StorageError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM likes WHERE tweet_id = ?1",
                params![tweet],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(map_err)
        })
        .await
    }

    // --- Media ---------------------------------------------------------------

    async fn create_media(&self, path: &str) -> Result<Media, StorageError> {
        let path = path.to_string();
        self.with_conn(move |conn| {
            conn.execute("INSERT INTO medias (path) VALUES (?1)", params![path])
                .map_err(map_err)?;
            Ok(Media {
                id: conn.last_insert_rowid(),
                path,
                tweet_id: None,
            })
        })
        .await
    }

    async fn get_media(&self, id: MediaId) -> Result<Option<Media>, StorageError> {
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, path, tweet_id FROM medias WHERE id = ?1",
                params![id],
                media_from_row,
            )
            .optional()
            .map_err(map_err)
        })
        .await
    }

    // --- Tweets --------------------------------------------------------------

    async fn create_tweet(&self, tweet: &NewTweet) -> Result<TweetId, StorageError> {
        let tweet = tweet.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            tx.execute(
                "INSERT INTO tweets (user_id, tweet_data, created_at, likes_count)
                 VALUES (?1, ?2, ?3, 0)",
                params![tweet.author_id(), tweet.text(), Utc::now()],
            )
            .map_err(map_err)?;
            let id = tx.last_insert_rowid();

            let media_ids = tweet.media_ids();
            if !media_ids.is_empty() {
                let placeholders = vec!["?"; media_ids.len()].join(", ");
                let sql = format!("UPDATE medias SET tweet_id = ? WHERE id IN ({placeholders})");
                let values = std::iter::once(id).chain(media_ids.iter().copied());
                tx.execute(&sql, params_from_iter(values)).map_err(map_err)?;
            }
            tx.commit().map_err(map_err)?;
            Ok(id)
        })
        .await
    }

    async fn delete_tweet(
        &self,
        tweet: TweetId,
        requester: UserId,
    ) -> Result<Vec<Media>, StorageError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            let author: Option<UserId> = tx
                .query_row(
                    "SELECT user_id FROM tweets WHERE id = ?1",
                    params![tweet],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_err)?;
            match author {
                None => return Err(DomainError::TweetNotFound(tweet).into()),
                Some(author) if author != requester => {
                    return Err(DomainError::NotTweetAuthor { tweet, requester }.into())
                }
                Some(_) => {}
            }

            let removed = {
                let mut stmt = tx
                    .prepare(
                        "SELECT id, path, tweet_id FROM medias WHERE tweet_id = ?1 ORDER BY id",
                    )
                    .map_err(map_err)?;
                let rows = stmt
                    .query_map(params![tweet], media_from_row)
                    .map_err(map_err)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(map_err)?
            };

            // likes and medias rows go with it via ON DELETE CASCADE.
            tx.execute("DELETE FROM tweets WHERE id = ?1", params![tweet])
                .map_err(map_err)?;
            tx.commit().map_err(map_err)?;
            Ok(removed)
        })
        .await
    }

    // --- Feed ----------------------------------------------------------------

    async fn feed(&self, viewer: UserId) -> Result<Vec<FeedTweet>, StorageError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;

            let mut feed: Vec<FeedTweet> = {
                let mut stmt = tx
                    .prepare(
                        "SELECT t.id, t.tweet_data, t.created_at, t.likes_count, u.id, u.username
                         FROM follows f
                         JOIN tweets t ON t.user_id = f.followed_id
                         JOIN users u ON u.id = t.user_id
                         WHERE f.follower_id = ?1
                         ORDER BY t.likes_count ASC, t.id ASC",
                    )
                    .map_err(map_err)?;
                let rows = stmt
                    .query_map(params![viewer], |row| {
                        let created_at: DateTime<Utc> = row.get(2)?;
                        Ok(FeedTweet {
                            id: row.get(0)?,
                            text: row.get(1)?,
                            created_at,
                            likes_count: row.get(3)?,
                            author: user_from_row(row, 4)?,
                            attachments: Vec::new(),
                            likes: Vec::new(),
                        })
                    })
                    .map_err(map_err)?;
                rows.collect::<Result<Vec<_>, _>>().map_err(map_err)?
            };
            if feed.is_empty() {
                return Ok(feed);
            }

            let mut attachments: HashMap<TweetId, Vec<String>> = HashMap::new();
            {
                let mut stmt = tx
                    .prepare(
                        "SELECT m.tweet_id, m.path
                         FROM follows f
                         JOIN tweets t ON t.user_id = f.followed_id
                         JOIN medias m ON m.tweet_id = t.id
                         WHERE f.follower_id = ?1
                         ORDER BY m.id",
                    )
                    .map_err(map_err)?;
                let rows = stmt
                    .query_map(params![viewer], |row| {
                        Ok((row.get::<_, TweetId>(0)?, row.get::<_, String>(1)?))
                    })
                    .map_err(map_err)?;
                for row in rows {
                    let (tweet, path) = row.map_err(map_err)?;
                    attachments.entry(tweet).or_default().push(path);
                }
            }

            let mut likes: HashMap<TweetId, Vec<User>> = HashMap::new();
            {
                let mut stmt = tx
                    .prepare(
                        "SELECT l.tweet_id, u.id, u.username
                         FROM follows f
                         JOIN tweets t ON t.user_id = f.followed_id
                         JOIN likes l ON l.tweet_id = t.id
                         JOIN users u ON u.id = l.user_id
                         WHERE f.follower_id = ?1
                         ORDER BY u.id",
                    )
                    .map_err(map_err)?;
                let rows = stmt
                    .query_map(params![viewer], |row| {
                        Ok((row.get::<_, TweetId>(0)?, user_from_row(row, 1)?))
                    })
                    .map_err(map_err)?;
                for row in rows {
                    let (tweet, user) = row.map_err(map_err)?;
                    likes.entry(tweet).or_default().push(user);
                }
            }

            for entry in &mut feed {
                entry.attachments = attachments.remove(&entry.id).unwrap_or_default();
                entry.likes = likes.remove(&entry.id).unwrap_or_default();
            }
            Ok(feed)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::scenarios;

    fn storage() -> SqliteStorage {
        SqliteStorage::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn identity_lookup() {
        scenarios::identity_lookup(&storage()).await;
    }

    #[tokio::test]
    async fn follow_state_machine() {
        scenarios::follow_state_machine(&storage()).await;
    }

    #[tokio::test]
    async fn follow_guards() {
        scenarios::follow_guards(&storage()).await;
    }

    #[tokio::test]
    async fn profiles_read_both_directions() {
        scenarios::profiles_read_both_directions(&storage()).await;
    }

    #[tokio::test]
    async fn like_counter_lockstep() {
        scenarios::like_counter_lockstep(&storage()).await;
    }

    #[tokio::test]
    async fn unlike_at_zero_stays_at_zero() {
        scenarios::unlike_at_zero_stays_at_zero(&storage()).await;
    }

    #[tokio::test]
    async fn unknown_liker_is_internal() {
        scenarios::unknown_liker_is_internal(&storage()).await;
    }

    #[tokio::test]
    async fn media_attach_and_cascade() {
        scenarios::media_attach_and_cascade(&storage()).await;
    }

    #[tokio::test]
    async fn media_reattachment_is_idempotent() {
        scenarios::media_reattachment_is_idempotent(&storage()).await;
    }

    #[tokio::test]
    async fn feed_assembly() {
        scenarios::feed_assembly(&storage()).await;
    }

    #[tokio::test]
    async fn schema_rejects_self_follow_and_duplicate_like() {
        let s = storage();
        let a = s.create_user("a", "ka").await.unwrap();
        let tweet = s
            .create_tweet(&NewTweet::new(a.id, "t", []).unwrap())
            .await
            .unwrap();
        let conn = s.conn.lock().unwrap();
        assert!(conn
            .execute(
                "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?1)",
                params![a.id],
            )
            .is_err());
        conn.execute(
            "INSERT INTO likes (user_id, tweet_id) VALUES (?1, ?2)",
            params![a.id, tweet],
        )
        .unwrap();
        let dup = conn
            .execute(
                "INSERT INTO likes (user_id, tweet_id) VALUES (?1, ?2)",
                params![a.id, tweet],
            )
            .unwrap_err();
        assert!(is_duplicate_key(&dup));
    }

    #[tokio::test]
    async fn duplicate_key_maps_to_domain_conflict() {
        let s = storage();
        let a = s.create_user("a", "ka").await.unwrap();
        let b = s.create_user("b", "kb").await.unwrap();
        let tweet = s
            .create_tweet(&NewTweet::new(a.id, "t", []).unwrap())
            .await
            .unwrap();
        s.like(tweet, b.id).await.unwrap();
        s.follow(b.id, a.id).await.unwrap();

        let conn = s.conn.lock().unwrap();
        let dup_like = conn
            .execute(
                "INSERT INTO likes (user_id, tweet_id) VALUES (?1, ?2)",
                params![b.id, tweet],
            )
            .unwrap_err();
        let mapped = map_conflict(dup_like, || {
            DomainError::AlreadyLiked { tweet, user: b.id }.into()
        });
        assert!(matches!(
            mapped,
            StorageError::Domain(DomainError::AlreadyLiked { .. })
        ));

        let dup_follow = conn
            .execute(
                "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?2)",
                params![b.id, a.id],
            )
            .unwrap_err();
        let mapped = map_conflict(dup_follow, || {
            DomainError::AlreadyFollowing { follower: b.id, target: a.id }.into()
        });
        assert!(matches!(
            mapped,
            StorageError::Domain(DomainError::AlreadyFollowing { .. })
        ));
    }

    #[tokio::test]
    async fn other_constraint_failures_are_internal() {
        let s = storage();
        let a = s.create_user("a", "ka").await.unwrap();
        let tweet = s
            .create_tweet(&NewTweet::new(a.id, "t", []).unwrap())
            .await
            .unwrap();
        let conn = s.conn.lock().unwrap();
        let fk = conn
            .execute(
                "INSERT INTO likes (user_id, tweet_id) VALUES (?1, ?2)",
                params![999, tweet],
            )
            .unwrap_err();
        assert!(!is_duplicate_key(&fk));
        let mapped = map_conflict(fk, || {
            DomainError::AlreadyLiked { tweet, user: 999 }.into()
        });
        assert!(matches!(mapped, StorageError::Internal(_)));

        let check = conn
            .execute(
                "INSERT INTO follows (follower_id, followed_id) VALUES (?1, ?1)",
                params![a.id],
            )
            .unwrap_err();
        let mapped = map_conflict(check, || {
            DomainError::AlreadyFollowing { follower: a.id, target: a.id }.into()
        });
        assert!(matches!(mapped, StorageError::Internal(_)));
    }

    #[tokio::test]
    async fn duplicate_api_key_is_a_conflict() {
        let s = storage();
        s.create_user("a", "shared").await.unwrap();
        let err = s.create_user("b", "shared").await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn drifted_counter_is_clamped_on_unlike() {
        let s = storage();
        let author = s.create_user("a", "ka").await.unwrap();
        let fan = s.create_user("b", "kb").await.unwrap();
        let tweet = s
            .create_tweet(&NewTweet::new(author.id, "t", []).unwrap())
            .await
            .unwrap();
        s.like(tweet, fan.id).await.unwrap();
        s.conn
            .lock()
            .unwrap()
            .execute("UPDATE tweets SET likes_count = 0 WHERE id = ?1", params![tweet])
            .unwrap();

        s.unlike(tweet, fan.id).await.unwrap();
        assert_eq!(s.get_tweet(tweet).await.unwrap().unwrap().likes_count, 0);
        assert_eq!(s.count_likes(tweet).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_likes_keep_counter_exact() {
        let s = Arc::new(storage());
        let author = s.create_user("author", "k0").await.unwrap();
        let tweet = s
            .create_tweet(&NewTweet::new(author.id, "hot take", []).unwrap())
            .await
            .unwrap();
        let mut fans = Vec::new();
        for i in 0..16 {
            fans.push(s.create_user(&format!("fan{i}"), &format!("kf{i}")).await.unwrap().id);
        }

        let mut handles = Vec::new();
        for &fan in &fans {
            for _ in 0..2 {
                let s = s.clone();
                handles.push(tokio::spawn(async move { s.like(tweet, fan).await }));
            }
        }
        let mut accepted = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(()) => accepted += 1,
                Err(StorageError::Domain(DomainError::AlreadyLiked { .. })) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(accepted, 16);
        assert_eq!(s.get_tweet(tweet).await.unwrap().unwrap().likes_count, 16);
        assert_eq!(s.count_likes(tweet).await.unwrap(), 16);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("microblog.db");
        let path = path.to_str().unwrap();
        {
            let s = SqliteStorage::open(path).unwrap();
            let a = s.create_user("a", "ka").await.unwrap();
            let b = s.create_user("b", "kb").await.unwrap();
            s.follow(a.id, b.id).await.unwrap();
        }
        let s = SqliteStorage::open(path).unwrap();
        assert_eq!(s.count_users().await.unwrap(), 2);
        assert!(s.is_following(1, 2).await.unwrap());
    }
}
