//! Authorization - role graph, role assignments and the request guard
//!
//! This module implements the RBAC engine with support for:
//! - Hierarchical roles (a role inherits every grant of its parents)
//! - Per-resource grants on exact resource paths, with a `*` action wildcard
//! - An implicit role held by every caller, including anonymous ones
//! - Fail-closed decisions for unknown users, resources and actions

mod assignments;
mod evaluator;
mod middleware;
mod policy;

pub use assignments::RoleAssignments;
pub use evaluator::{AccessPolicy, Authorizer};
pub use middleware::{enforce_acl, resource_path};
pub use policy::{Action, ActionGrant, Permission, Policy, PolicyError};

/// Identity used for callers without a valid token.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Well-known role names
pub mod roles {
    pub const GUEST: &str = "guest";
    pub const REFEREE: &str = "tournament_referee";
    pub const EDITOR: &str = "tournament_editor";
    pub const ADMIN: &str = "tournament_admin";
}

/// Protected collections below the API root.
pub mod resources {
    pub const TOURNAMENTS: &str = "tournaments";
    pub const RESULTS: &str = "results";
    pub const NEWS: &str = "news";
    pub const PAGES: &str = "pages";
    pub const LEAGUE_TABLES: &str = "leaguetables";
}

/// The tournament API's permission model, rooted at `api_root`.
///
/// `guest` < `tournament_referee` < `tournament_editor` < `tournament_admin`.
pub fn tournament_policy(api_root: &str) -> Result<Policy, PolicyError> {
    use resources::*;

    let path = |resource: &str| format!("{api_root}/{resource}");
    let mut policy = Policy::new();

    for resource in [TOURNAMENTS, NEWS, RESULTS, PAGES] {
        policy.grant(roles::ADMIN, &path(resource), &["*"])?;
    }

    policy.grant(roles::EDITOR, &path(RESULTS), &["post", "put", "delete"])?;
    policy.grant(roles::EDITOR, &path(NEWS), &["post", "put"])?;
    policy.grant(roles::EDITOR, &path(LEAGUE_TABLES), &["post"])?;

    policy.grant(roles::REFEREE, &path(RESULTS), &["put"])?;

    for resource in [RESULTS, NEWS, TOURNAMENTS, PAGES] {
        policy.grant(roles::GUEST, &path(resource), &["get"])?;
    }

    policy.add_parent(roles::REFEREE, roles::GUEST)?;
    policy.add_parent(roles::EDITOR, roles::REFEREE)?;
    policy.add_parent(roles::ADMIN, roles::EDITOR)?;

    Ok(policy)
}
