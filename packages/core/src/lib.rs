//! Domain core of the microblog backend.
//!
//! This crate holds everything about tweets, likes, and follows that does not
//! touch I/O: the data types shared by the storage backends and the HTTP
//! layer, text and upload validation, the transition rules of the follow
//! graph and the like counter, and the fixed feed ordering.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Identities, tweets, media references, feed entries |
//! | [`validation`] | Tweet length and upload name checks via [`validate_tweet_text`] / [`image_extension`] |
//! | [`graph`] | Follow/unfollow rules and the in-memory [`FollowGraph`] edge set |
//! | [`engagement`] | Like/unlike rules and the cached counter step |
//! | [`feed`] | Feed ordering |
//! | [`error`] | [`DomainError`], the rejection taxonomy every backend reports |
//!
//! Storage backends load the facts a rule needs (does the target exist, does
//! the edge exist) inside their own transaction and then ask this crate
//! whether the transition is allowed. That keeps the precedence of checks in
//! one place no matter which backend runs it.

pub mod engagement;
pub mod error;
pub mod feed;
pub mod graph;
pub mod types;
pub mod validation;

pub use engagement::{check_like, check_unlike, next_like_count, CounterStep, CounterUpdate};
pub use error::DomainError;
pub use feed::order_feed;
pub use graph::{check_follow_transition, FollowGraph};
pub use types::{
    FeedTweet, FollowAction, Media, MediaId, NewTweet, Tweet, TweetId, User, UserId, UserProfile,
};
pub use validation::{image_extension, validate_tweet_text, ValidationError};
