/// Scope resolution helper
use crate::{
    admin::{
        directory::Directory,
        level::{Actor, OwnerScope},
    },
    error::KudosResult,
};
use std::sync::Arc;

/// Resolves organizational scopes through the directory
///
/// A missing record resolves to [`OwnerScope::unknown`], which no scoped
/// comparison accepts.
#[derive(Clone)]
pub struct ScopeResolver {
    directory: Arc<dyn Directory>,
}

impl ScopeResolver {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    pub async fn actor(&self, user_id: &str) -> KudosResult<Option<Actor>> {
        self.directory.get_actor(user_id).await
    }

    /// Scope of a user
    pub async fn owner_scope(&self, user_id: &str) -> KudosResult<OwnerScope> {
        Ok(self
            .directory
            .get_user_scope(user_id)
            .await?
            .unwrap_or_else(OwnerScope::unknown))
    }

    /// Scope of a kudos post, through its author
    pub async fn content_owner_scope(&self, kudos_id: &str) -> KudosResult<OwnerScope> {
        Ok(self
            .directory
            .get_content_owner_scope(kudos_id)
            .await?
            .unwrap_or_else(OwnerScope::unknown))
    }

    /// Parent domain of a department
    pub async fn department_domain(&self, department_id: &str) -> KudosResult<Option<String>> {
        self.directory.get_department_domain(department_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{directory::MemoryDirectory, level::AdminProfile};

    #[tokio::test]
    async fn test_missing_records_resolve_unknown() {
        let directory = Arc::new(MemoryDirectory::new());
        directory
            .insert_actor(Actor {
                id: "u1".to_string(),
                profile: AdminProfile::user(),
                domain: Some("acme.com".to_string()),
                department_id: Some("dept-1".to_string()),
            })
            .await;
        directory.insert_content("k1", "u1").await;
        directory.insert_content("k2", "deleted-user").await;
        directory.insert_department("dept-1", "acme.com").await;

        let resolver = ScopeResolver::new(directory);

        let scope = resolver.content_owner_scope("k1").await.unwrap();
        assert_eq!(scope.domain.as_deref(), Some("acme.com"));

        assert_eq!(resolver.content_owner_scope("k2").await.unwrap(), OwnerScope::unknown());
        assert_eq!(resolver.owner_scope("nobody").await.unwrap(), OwnerScope::unknown());

        assert_eq!(
            resolver.department_domain("dept-1").await.unwrap().as_deref(),
            Some("acme.com")
        );
        assert!(resolver.department_domain("dept-2").await.unwrap().is_none());
    }
}
