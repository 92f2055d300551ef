//! Bounded walk up the referrer chain.
//!
//! The forest is never held in memory: each hop is a `find_by_id` against the
//! directory, so a walk costs at most `max_depth` reads.

use std::collections::HashSet;

use crate::error::ReferralResult;
use crate::models::UserId;
use crate::repository::UserDirectory;

/// How a chain walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainWalk {
    /// The walk reached an already visited node
    Cycle { at: UserId, depth: usize },
    /// Reached a user without a referrer
    Root { depth: usize },
    /// A referrer id pointed at a missing user
    Broken { missing: UserId, depth: usize },
    /// Gave up after `max_depth` hops without seeing a repeat
    DepthLimit { last: UserId },
}

impl ChainWalk {
    pub fn is_cycle(&self) -> bool {
        matches!(self, ChainWalk::Cycle { .. })
    }
}

/// Walk from `referrer_id` towards the root, treating `referral_id` as
/// already visited.
///
/// Answers "would `referral_id -> referrer_id` close a loop": that happens
/// exactly when `referral_id` is an ancestor of (or equal to) `referrer_id`.
/// Chains longer than `max_depth` hops are reported as [`ChainWalk::DepthLimit`].
pub async fn walk_chain<D>(
    directory: &D,
    referrer_id: UserId,
    referral_id: UserId,
    max_depth: usize,
) -> ReferralResult<ChainWalk>
where
    D: UserDirectory + ?Sized,
{
    if referrer_id == referral_id {
        return Ok(ChainWalk::Cycle {
            at: referral_id,
            depth: 0,
        });
    }

    let mut visited = HashSet::from([referral_id]);
    let mut cursor = referrer_id;
    let mut depth = 0;

    while depth < max_depth {
        if !visited.insert(cursor) {
            return Ok(ChainWalk::Cycle { at: cursor, depth });
        }

        let Some(user) = directory.find_by_id(cursor).await? else {
            return Ok(ChainWalk::Broken {
                missing: cursor,
                depth,
            });
        };

        depth += 1;
        match user.referrer_id {
            Some(parent) => cursor = parent,
            None => return Ok(ChainWalk::Root { depth }),
        }
    }

    Ok(ChainWalk::DepthLimit { last: cursor })
}
