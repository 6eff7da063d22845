use std::collections::{BTreeSet, HashMap};

use tokio::sync::RwLock;

/// User id -> directly assigned roles.
///
/// Writers take the lock for the whole read-modify-write, so concurrent
/// additions for one user merge instead of overwriting each other, and readers
/// only ever see complete role sets.
#[derive(Debug, Default)]
pub struct RoleAssignments {
    inner: RwLock<HashMap<String, BTreeSet<String>>>,
}

impl RoleAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the role was not held before.
    pub async fn add_role(&self, user_id: &str, role: &str) -> bool {
        self.add_roles(user_id, [role]).await > 0
    }

    /// Adds every role in `roles`, returning how many were new.
    pub async fn add_roles<I, S>(&self, user_id: &str, roles: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let roles: Vec<S> = roles.into_iter().collect();

        {
            let guard = self.inner.read().await;
            let already_held = guard
                .get(user_id)
                .map(|held| roles.iter().all(|role| held.contains(role.as_ref())))
                .unwrap_or(roles.is_empty());
            if already_held {
                return 0;
            }
        }

        let mut guard = self.inner.write().await;
        let held = guard.entry(user_id.to_string()).or_default();
        let added = roles
            .iter()
            .filter(|role| held.insert(role.as_ref().to_string()))
            .count();

        if added > 0 {
            tracing::debug!(user_id = %user_id, added, "assigned roles");
        }
        added
    }

    /// Removes every role in `roles`, returning how many were held.
    pub async fn remove_roles<I, S>(&self, user_id: &str, roles: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut guard = self.inner.write().await;
        let Some(held) = guard.get_mut(user_id) else {
            return 0;
        };

        let removed = roles.into_iter().filter(|role| held.remove(role.as_ref())).count();
        if held.is_empty() {
            guard.remove(user_id);
        }
        removed
    }

    pub async fn roles_of(&self, user_id: &str) -> BTreeSet<String> {
        self.inner
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_add_role_is_idempotent() {
        let store = RoleAssignments::new();

        assert!(store.add_role("u1", "editor").await);
        let once = store.roles_of("u1").await;
        assert!(!store.add_role("u1", "editor").await);
        assert_eq!(store.roles_of("u1").await, once);
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_roles() {
        let store = RoleAssignments::new();
        assert!(store.roles_of("ghost").await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_merge() {
        let store = Arc::new(RoleAssignments::new());
        let roles: Vec<String> = (0..32).map(|i| format!("role-{i}")).collect();

        let handles: Vec<_> = roles
            .iter()
            .cloned()
            .map(|role| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.add_role("shared", &role).await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let held = store.roles_of("shared").await;
        assert_eq!(held.len(), roles.len());
        assert!(roles.iter().all(|role| held.contains(role)));
    }

    #[tokio::test]
    async fn test_remove_roles() {
        let store = RoleAssignments::new();
        store.add_roles("u1", ["guest", "editor"]).await;

        assert_eq!(store.remove_roles("u1", ["editor", "admin"]).await, 1);
        assert_eq!(store.roles_of("u1").await.into_iter().collect::<Vec<_>>(), vec!["guest"]);
        assert_eq!(store.remove_roles("u1", ["guest"]).await, 1);
        assert!(store.roles_of("u1").await.is_empty());
        assert_eq!(store.remove_roles("nobody", ["guest"]).await, 0);
    }
}
