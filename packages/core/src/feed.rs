//! Feed ordering.
//!
//! The feed is sorted by cached like count, lowest first. There is no other
//! ranking and no pagination.

use crate::types::FeedTweet;

/// Sort `tweets` ascending by `likes_count`.
///
/// The sort is stable: tweets with equal counts keep the order the store
/// returned them in.
pub fn order_feed(tweets: &mut [FeedTweet]) {
    tweets.sort_by_key(|t| t.likes_count);
}
