use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a [`Policy`]. All of them are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("role name must not be empty")]
    EmptyRole,
    #[error("invalid resource path '{0}': must start with '/'")]
    InvalidResource(String),
    #[error("grant for role '{role}' on '{resource}' names no actions")]
    NoActions { role: String, resource: String },
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("making '{parent}' a parent of '{role}' would create an inheritance cycle")]
    CircularInheritance { role: String, parent: String },
}

/// An action a caller performs on a resource. Mirrors the HTTP verbs of the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [Action::Get, Action::Post, Action::Put, Action::Patch, Action::Delete];

    /// Maps a request method onto an action. Methods without a mapping have no
    /// grantable action and are therefore always denied.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Action::Get),
            Method::POST => Some(Action::Post),
            Method::PUT => Some(Action::Put),
            Method::PATCH => Some(Action::Patch),
            Method::DELETE => Some(Action::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::Post => "post",
            Action::Put => "put",
            Action::Patch => "patch",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Action::Get),
            "post" => Ok(Action::Post),
            "put" => Ok(Action::Put),
            "patch" => Ok(Action::Patch),
            "delete" => Ok(Action::Delete),
            _ => Err(PolicyError::UnknownAction(s.to_string())),
        }
    }
}

/// The action half of a grant: either one action or the `*` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionGrant {
    Any,
    Only(Action),
}

impl ActionGrant {
    pub fn covers(&self, action: Action) -> bool {
        match self {
            ActionGrant::Any => true,
            ActionGrant::Only(granted) => *granted == action,
        }
    }
}

impl FromStr for ActionGrant {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "*" {
            return Ok(ActionGrant::Any);
        }
        s.parse().map(ActionGrant::Only)
    }
}

impl fmt::Display for ActionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionGrant::Any => f.write_str("*"),
            ActionGrant::Only(action) => action.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Permission {
    pub resource: String,
    pub action: ActionGrant,
}

impl Permission {
    pub fn matches(&self, resource: &str, action: Action) -> bool {
        self.resource == resource && self.action.covers(action)
    }
}

/// Role graph plus permission table.
///
/// Built once at startup and shared read-only afterwards. Inheritance edges
/// point from a role to its parents; a role holds every grant reachable by
/// following zero or more parent edges.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    parents: HashMap<String, BTreeSet<String>>,
    grants: HashMap<String, HashSet<Permission>>,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grants `actions` on `resource` to `role`. Actions are verbs (`get`,
    /// `post`, ...) or `*`.
    pub fn grant(&mut self, role: &str, resource: &str, actions: &[&str]) -> Result<(), PolicyError> {
        ensure_role_name(role)?;
        if !resource.starts_with('/') {
            return Err(PolicyError::InvalidResource(resource.to_string()));
        }
        if actions.is_empty() {
            return Err(PolicyError::NoActions {
                role: role.to_string(),
                resource: resource.to_string(),
            });
        }

        let parsed = actions
            .iter()
            .map(|action| action.parse::<ActionGrant>())
            .collect::<Result<Vec<_>, _>>()?;

        let entry = self.grants.entry(role.to_string()).or_default();
        for action in parsed {
            entry.insert(Permission {
                resource: resource.to_string(),
                action,
            });
        }

        Ok(())
    }

    /// Makes `role` inherit every permission of `parent`.
    pub fn add_parent(&mut self, role: &str, parent: &str) -> Result<(), PolicyError> {
        ensure_role_name(role)?;
        ensure_role_name(parent)?;

        if self.reaches(parent, role) {
            return Err(PolicyError::CircularInheritance {
                role: role.to_string(),
                parent: parent.to_string(),
            });
        }

        self.parents
            .entry(role.to_string())
            .or_default()
            .insert(parent.to_string());

        Ok(())
    }

    pub fn parents_of(&self, role: &str) -> impl Iterator<Item = &str> {
        self.parents
            .get(role)
            .into_iter()
            .flat_map(|parents| parents.iter().map(String::as_str))
    }

    /// Every role known to the policy, either through a grant or an edge.
    pub fn roles(&self) -> BTreeSet<&str> {
        let mut roles: BTreeSet<&str> = self.grants.keys().map(String::as_str).collect();
        for (role, parents) in &self.parents {
            roles.insert(role);
            roles.extend(parents.iter().map(String::as_str));
        }
        roles
    }

    /// `role` itself plus all of its transitive parents.
    pub fn inherited_roles(&self, role: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut pending = vec![role.to_string()];

        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for parent in self.parents_of(&current) {
                if !visited.contains(parent) {
                    pending.push(parent.to_string());
                }
            }
        }

        visited
    }

    /// Whether any grant reachable from `role` covers `action` on `resource`.
    pub fn allows(&self, role: &str, resource: &str, action: Action) -> bool {
        self.inherited_roles(role).iter().any(|inherited| {
            self.grants
                .get(inherited)
                .map(|grants| grants.iter().any(|p| p.matches(resource, action)))
                .unwrap_or(false)
        })
    }

    /// Whether `to` is reachable from `from` via zero or more parent edges.
    fn reaches(&self, from: &str, to: &str) -> bool {
        self.inherited_roles(from).contains(to)
    }
}

fn ensure_role_name(role: &str) -> Result<(), PolicyError> {
    if role.trim().is_empty() {
        return Err(PolicyError::EmptyRole);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Policy {
        let mut policy = Policy::new();
        policy.grant("guest", "/api/items", &["get"]).unwrap();
        policy.grant("writer", "/api/items", &["post", "put"]).unwrap();
        policy.grant("owner", "/api/items", &["*"]).unwrap();
        policy.add_parent("writer", "guest").unwrap();
        policy.add_parent("owner", "writer").unwrap();
        policy
    }

    #[test]
    fn test_grants_are_inherited_transitively() {
        let policy = chain();

        assert!(policy.allows("owner", "/api/items", Action::Get));
        assert!(policy.allows("writer", "/api/items", Action::Get));
        assert!(!policy.allows("guest", "/api/items", Action::Post));
    }

    #[test]
    fn test_inheritance_is_monotonic() {
        let policy = chain();

        for (child, parent) in [("writer", "guest"), ("owner", "writer"), ("owner", "guest")] {
            for action in Action::ALL {
                if policy.allows(parent, "/api/items", action) {
                    assert!(policy.allows(child, "/api/items", action), "{child} lost {action} of {parent}");
                }
            }
        }
    }

    #[test]
    fn test_wildcard_covers_every_action() {
        let policy = chain();
        for action in Action::ALL {
            assert!(policy.allows("owner", "/api/items", action));
        }
        assert!(!policy.allows("owner", "/api/other", Action::Get));
    }

    #[test]
    fn test_resource_match_is_exact() {
        let policy = chain();
        assert!(!policy.allows("guest", "/api/items/1", Action::Get));
        assert!(!policy.allows("guest", "/api", Action::Get));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut policy = chain();

        let err = policy.add_parent("guest", "owner").unwrap_err();
        assert_eq!(
            err,
            PolicyError::CircularInheritance {
                role: "guest".to_string(),
                parent: "owner".to_string()
            }
        );
        assert!(policy.add_parent("guest", "guest").is_err());
        // The rejected edge must not have been recorded.
        assert_eq!(policy.parents_of("guest").count(), 0);
    }

    #[test]
    fn test_malformed_grants_are_rejected() {
        let mut policy = Policy::new();
        assert_eq!(policy.grant("", "/x", &["get"]), Err(PolicyError::EmptyRole));
        assert!(matches!(policy.grant("r", "x", &["get"]), Err(PolicyError::InvalidResource(_))));
        assert!(matches!(policy.grant("r", "/x", &[]), Err(PolicyError::NoActions { .. })));
        assert!(matches!(policy.grant("r", "/x", &["fly"]), Err(PolicyError::UnknownAction(_))));
    }

    #[test]
    fn test_unknown_role_has_no_permissions() {
        let policy = chain();
        for action in Action::ALL {
            assert!(!policy.allows("nobody", "/api/items", action));
        }
        assert_eq!(policy.inherited_roles("nobody").len(), 1);
    }

    #[test]
    fn test_roles_lists_grant_and_edge_roles() {
        let mut policy = chain();
        policy.add_parent("auditor", "guest").unwrap();
        let roles: Vec<_> = policy.roles().into_iter().collect();
        assert_eq!(roles, vec!["auditor", "guest", "owner", "writer"]);
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("GET".parse::<Action>().unwrap(), Action::Get);
        assert_eq!("*".parse::<ActionGrant>().unwrap(), ActionGrant::Any);
        assert_eq!(Action::from_method(&Method::HEAD), None);
        assert_eq!(Action::from_method(&Method::DELETE), Some(Action::Delete));
    }
}
