//! Property-based tests for the permission resolver.

use proptest::prelude::*;

use super::*;

/// Strategy for short lowercase identifiers.
fn id_strategy() -> impl Strategy<Value = String> + Clone {
    "[a-z][a-z0-9]{0,7}"
}

/// Strategy for a small world of users, groups, and policies with ids drawn
/// from a shared pool, so references dangle sometimes and resolve sometimes.
fn world_strategy() -> impl Strategy<Value = (Vec<User>, Vec<UserGroup>, Vec<Policy>)> {
    let ids = prop::collection::vec(id_strategy(), 1..6);
    (ids.clone(), ids.clone(), ids).prop_flat_map(|(user_ids, group_ids, policy_ids)| {
        let users = {
            let group_pool = group_ids.clone();
            prop::collection::vec(
                (any::<prop::sample::Index>(), 0..4usize),
                user_ids.len(),
            )
            .prop_map(move |picks| {
                user_ids
                    .iter()
                    .zip(picks)
                    .map(|(id, (start, n))| User {
                        id: id.clone(),
                        group_ids: group_pool
                            .iter()
                            .cycle()
                            .skip(start.index(group_pool.len().max(1)))
                            .take(n)
                            .cloned()
                            .collect(),
                    })
                    .collect::<Vec<_>>()
            })
        };
        let groups = {
            let policy_pool = policy_ids.clone();
            let group_ids = group_ids.clone();
            prop::collection::vec(0..3usize, group_ids.len()).prop_map(move |counts| {
                group_ids
                    .iter()
                    .zip(counts)
                    .map(|(id, n)| UserGroup {
                        id: id.clone(),
                        policy_ids: policy_pool.iter().take(n).cloned().collect(),
                    })
                    .collect::<Vec<_>>()
            })
        };
        let policies = prop::collection::vec(prop::bool::ANY, policy_ids.len()).prop_map(
            move |grant_flags| {
                policy_ids
                    .iter()
                    .zip(grant_flags)
                    .map(|(id, grants)| Policy {
                        id: id.clone(),
                        statements: if grants {
                            vec![Statement::new(["read"], ["doc"])]
                        } else {
                            vec![Statement::new(["write"], ["other"])]
                        },
                    })
                    .collect::<Vec<_>>()
            },
        );
        (users, groups, policies)
    })
}

proptest! {
    /// Shuffling the input collections never changes the boolean result.
    #[test]
    fn result_is_order_independent(
        (users, mut groups, mut policies) in world_strategy(),
        user_pick: prop::sample::Index,
    ) {
        let user_id = users[user_pick.index(users.len())].id.clone();
        let before = has_permission(&user_id, "doc", "read", &users, &groups, &policies);

        groups.reverse();
        policies.reverse();
        let after = has_permission(&user_id, "doc", "read", &users, &groups, &policies);

        prop_assert_eq!(before, after);
    }

    /// An unknown user is always denied, whatever else the world contains.
    #[test]
    fn unknown_user_is_always_denied(
        (users, groups, policies) in world_strategy(),
        resource in id_strategy(),
        action in id_strategy(),
    ) {
        // "!" cannot be produced by id_strategy, so this id is never present.
        prop_assert!(!has_permission("!absent", &resource, &action, &users, &groups, &policies));
    }

    /// A granted pair stays granted when unrelated non-granting policies are
    /// appended ("any" semantics).
    #[test]
    fn extra_non_granting_policies_cannot_revoke(extra in 0..5usize) {
        let users = vec![User { id: "u".into(), group_ids: vec!["g".into()] }];
        let groups = vec![UserGroup {
            id: "g".into(),
            policy_ids: (0..=extra).map(|i| format!("p{i}")).collect(),
        }];
        let mut policies = vec![Policy {
            id: "p0".into(),
            statements: vec![Statement::new(["read"], ["doc"])],
        }];
        for i in 1..=extra {
            policies.push(Policy {
                id: format!("p{i}"),
                statements: vec![Statement::new(["write"], ["elsewhere"])],
            });
        }

        prop_assert!(has_permission("u", "doc", "read", &users, &groups, &policies));
    }
}
