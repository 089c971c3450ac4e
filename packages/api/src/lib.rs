//! Request and response types for the microblog HTTP API.
//!
//! Every response body is an envelope with a boolean `result`. Success
//! bodies carry `result: true` plus the payload; error bodies are always
//! [`ErrorResponse`]. Clients rely on this shape byte for byte.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/api/tweets` | → [`FeedResponse`] |
//! | POST | `/api/tweets` | [`CreateTweetRequest`] → [`TweetCreated`] |
//! | DELETE | `/api/tweets/{id}` | → [`Ack`] |
//! | POST | `/api/tweets/{id}/likes` | → [`Ack`] |
//! | DELETE | `/api/tweets/{id}/likes` | → [`Ack`] |
//! | POST | `/api/medias` | multipart `file` → [`MediaCreated`] |
//! | POST | `/api/users/{id}/follow` | → [`Ack`] |
//! | DELETE | `/api/users/{id}/follow` | → [`Ack`] |
//! | GET | `/api/users/me` | → [`ProfileResponse`] |
//! | GET | `/api/users/{id}` | → [`ProfileResponse`] |

pub mod ack;
pub mod error;
pub mod media;
pub mod tweet;
pub mod user;

pub use ack::Ack;
pub use error::ErrorResponse;
pub use media::MediaCreated;
pub use tweet::{CreateTweetRequest, FeedResponse, LikeView, TweetCreated, TweetView};
pub use user::{ProfileResponse, UserInfo};
