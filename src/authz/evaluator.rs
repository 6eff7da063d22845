use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::assignments::RoleAssignments;
use super::policy::{Action, Policy};

/// Access decision seam used by the request middleware.
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Check whether `user_id` may perform `action` on `resource`.
    async fn is_allowed(&self, user_id: &str, resource: &str, action: Action) -> bool;
}

/// Resolves decisions from a user's assigned roles, the implicit role every
/// caller holds, and the static [`Policy`].
///
/// Evaluation order:
/// 1. directly assigned roles (none for unknown users)
/// 2. plus the implicit role
/// 3. union of each role's inherited grants
/// 4. allow iff a grant matches the resource and action
#[derive(Debug, Clone)]
pub struct Authorizer {
    policy: Arc<Policy>,
    assignments: Arc<RoleAssignments>,
    implicit_role: String,
}

impl Authorizer {
    pub fn new(policy: Arc<Policy>, assignments: Arc<RoleAssignments>, implicit_role: impl Into<String>) -> Self {
        Self {
            policy,
            assignments,
            implicit_role: implicit_role.into(),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn assignments(&self) -> &Arc<RoleAssignments> {
        &self.assignments
    }

    pub async fn effective_roles(&self, user_id: &str) -> BTreeSet<String> {
        let mut roles = self.assignments.roles_of(user_id).await;
        roles.insert(self.implicit_role.clone());
        roles
    }
}

#[async_trait]
impl AccessPolicy for Authorizer {
    async fn is_allowed(&self, user_id: &str, resource: &str, action: Action) -> bool {
        let allowed = self
            .effective_roles(user_id)
            .await
            .iter()
            .any(|role| self.policy.allows(role, resource, action));

        tracing::debug!(
            user_id = %user_id,
            resource = %resource,
            action = %action,
            allowed,
            "access decision"
        );
        allowed
    }
}
