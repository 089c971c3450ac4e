//! The follow graph: a single set of directed edges `(follower, followed)`.
//!
//! "Following" and "followers" are two query directions over the same edge
//! set, never two structures that could drift apart. The relation is
//! irreflexive and not symmetric: `a -> b` says nothing about `b -> a`.

use std::collections::BTreeSet;
use std::ops::Bound;

use crate::error::DomainError;
use crate::types::{FollowAction, UserId};

/// Decide whether a follow or unfollow may proceed.
///
/// Checks run in a fixed order and the first failure wins:
///
/// 1. self-reference (needs no lookup),
/// 2. target existence,
/// 3. edge state (`AlreadyFollowing` for follow, `NotFollowing` for unfollow).
///
/// So a missing target is reported as missing whatever the edge table says,
/// and `a -> a` is refused before anything is looked up.
pub fn check_follow_transition(
    action: FollowAction,
    follower: UserId,
    target: UserId,
    target_exists: bool,
    edge_exists: bool,
) -> Result<(), DomainError> {
    if follower == target {
        return Err(DomainError::SelfReference(action));
    }
    if !target_exists {
        return Err(DomainError::TargetNotFound { action, target });
    }
    match (action, edge_exists) {
        (FollowAction::Follow, true) => Err(DomainError::AlreadyFollowing { follower, target }),
        (FollowAction::Unfollow, false) => Err(DomainError::NotFollowing { follower, target }),
        _ => Ok(()),
    }
}

/// In-memory directed edge set, ordered by `(follower, followed)`.
#[derive(Debug, Default, Clone)]
pub struct FollowGraph {
    edges: BTreeSet<(UserId, UserId)>,
}

impl FollowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the edge `follower -> target` after applying
    /// [`check_follow_transition`]. Never adds the reverse edge.
    pub fn follow(
        &mut self,
        follower: UserId,
        target: UserId,
        target_exists: bool,
    ) -> Result<(), DomainError> {
        let edge_exists = self.is_following(follower, target);
        check_follow_transition(
            FollowAction::Follow,
            follower,
            target,
            target_exists,
            edge_exists,
        )?;
        self.edges.insert((follower, target));
        Ok(())
    }

    /// Remove exactly the edge `follower -> target`.
    pub fn unfollow(
        &mut self,
        follower: UserId,
        target: UserId,
        target_exists: bool,
    ) -> Result<(), DomainError> {
        let edge_exists = self.is_following(follower, target);
        check_follow_transition(
            FollowAction::Unfollow,
            follower,
            target,
            target_exists,
            edge_exists,
        )?;
        self.edges.remove(&(follower, target));
        Ok(())
    }

    pub fn is_following(&self, follower: UserId, target: UserId) -> bool {
        self.edges.contains(&(follower, target))
    }

    /// Ids `user` follows, ascending.
    pub fn following(&self, user: UserId) -> Vec<UserId> {
        self.edges
            .range((Bound::Included((user, UserId::MIN)), Bound::Included((user, UserId::MAX))))
            .map(|&(_, followed)| followed)
            .collect()
    }

    /// Ids following `user`, ascending.
    pub fn followers(&self, user: UserId) -> Vec<UserId> {
        self.edges
            .iter()
            .filter(|&&(_, followed)| followed == user)
            .map(|&(follower, _)| follower)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
