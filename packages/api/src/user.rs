//! Profile types — `GET /api/users/me` and `GET /api/users/{id}`.

use microblog::{User, UserId, UserProfile};
use serde::{Deserialize, Serialize};

/// A user with both directions of the follow relation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: UserId,
    pub name: String,
    /// Users following this one.
    pub followers: Vec<User>,
    /// Users this one follows.
    pub following: Vec<User>,
}

impl From<UserProfile> for UserInfo {
    fn from(p: UserProfile) -> Self {
        Self {
            id: p.user.id,
            name: p.user.name,
            followers: p.followers,
            following: p.following,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileResponse {
    pub result: bool,
    pub user: UserInfo,
}

impl ProfileResponse {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            result: true,
            user: profile.into(),
        }
    }
}
