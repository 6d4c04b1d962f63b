//! Access-control entities and the permission resolver.
//!
//! The resolver answers one question: may `user_id` perform `action` on
//! `resource`? It walks User → Group → Policy → Statement relations over
//! caller-supplied snapshots and returns a plain boolean. Any missing link in
//! the chain — unknown user, dangling group or policy reference, no matching
//! statement — resolves to deny ("fail closed"). The resolver never errors
//! and never touches storage; fetching the snapshots is the caller's job.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// An identity with a set of group references.
///
/// `group_ids` is ordered and may contain duplicates, but is semantically a
/// set: traversal order does not affect the resolver's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub group_ids: Vec<String>,
}

/// A named collection of policy references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: String,
    #[serde(default)]
    pub policy_ids: Vec<String>,
}

/// A named collection of statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// A single grant rule pairing a set of allowed actions with a set of
/// allowed resources. A statement grants every (action, resource) pair in
/// its cross product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub actions: HashSet<String>,
    pub resources: HashSet<String>,
}

impl Statement {
    /// Creates a statement from action and resource name lists.
    pub fn new<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether this statement grants the given (action, resource) pair.
    /// Exact string match, no normalization.
    pub fn grants(&self, action: &str, resource: &str) -> bool {
        self.actions.contains(action) && self.resources.contains(resource)
    }
}

/// Builds an id-keyed lookup over a slice of entities.
///
/// Duplicate ids overwrite silently (last write wins); inputs are expected to
/// carry unique ids, so this is an undefined corner rather than a contract.
fn index_by_id<'a, T>(items: &'a [T], id: impl Fn(&T) -> &str) -> HashMap<&'a str, &'a T> {
    items.iter().map(|item| (id(item), item)).collect()
}

/// Decides whether `user_id` is permitted to perform `action` on `resource`.
///
/// Returns `true` iff the user exists in `users` and at least one chain
/// user → group → policy → statement grants the (action, resource) pair.
/// Dangling group or policy references are skipped, not errors; every other
/// gap in the chain folds into `false`.
///
/// Lookup maps for the three collections are built once (O(U+G+P)), then the
/// traversal short-circuits on the first granting statement, so repeated
/// identifier resolution is O(1) rather than a rescan of the full lists.
///
/// Pure function over its inputs: no side effects, no I/O, safe to call
/// concurrently as long as callers do not mutate the slices mid-call.
pub fn has_permission(
    user_id: &str,
    resource: &str,
    action: &str,
    users: &[User],
    groups: &[UserGroup],
    policies: &[Policy],
) -> bool {
    let users_by_id = index_by_id(users, |u| u.id.as_str());
    let Some(user) = users_by_id.get(user_id) else {
        return false;
    };

    let groups_by_id = index_by_id(groups, |g| g.id.as_str());
    let policies_by_id = index_by_id(policies, |p| p.id.as_str());

    user.group_ids
        .iter()
        .filter_map(|group_id| groups_by_id.get(group_id.as_str()))
        .flat_map(|group| group.policy_ids.iter())
        .filter_map(|policy_id| policies_by_id.get(policy_id.as_str()))
        .flat_map(|policy| policy.statements.iter())
        .any(|statement| statement.grants(action, resource))
}

#[cfg(test)]
mod proptests;
