/// Directory lookups consumed by the authorization core
///
/// The evaluator never touches the database directly; it is handed a
/// [`Directory`] so it can run against SQLite in production and an
/// in-memory fake in tests.
use crate::{
    admin::level::{Actor, AdminProfile, OwnerScope},
    error::{KudosError, KudosResult},
};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Read-only lookups of users, content owners and departments
///
/// `Ok(None)` means the record does not exist. `Err` is reserved for
/// infrastructure faults.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Load a user as an acting principal
    async fn get_actor(&self, user_id: &str) -> KudosResult<Option<Actor>>;

    /// Organizational scope of a user
    async fn get_user_scope(&self, user_id: &str) -> KudosResult<Option<OwnerScope>>;

    /// Organizational scope of the user owning a kudos post
    async fn get_content_owner_scope(&self, kudos_id: &str) -> KudosResult<Option<OwnerScope>>;

    /// Domain a department belongs to
    async fn get_department_domain(&self, department_id: &str) -> KudosResult<Option<String>>;
}

/// SQLite-backed directory
#[derive(Clone)]
pub struct SqlDirectory {
    db: SqlitePool,
}

impl SqlDirectory {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Directory for SqlDirectory {
    async fn get_actor(&self, user_id: &str) -> KudosResult<Option<Actor>> {
        let row = sqlx::query(
            r#"
            SELECT id, domain, department_id, admin_level, admin_scope
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| {
            let level: String = row.get("admin_level");
            let scope: Option<String> = row.get("admin_scope");

            Actor {
                id: row.get("id"),
                profile: AdminProfile::from_columns(&level, scope.as_deref()),
                domain: row.get("domain"),
                department_id: row.get("department_id"),
            }
        }))
    }

    async fn get_user_scope(&self, user_id: &str) -> KudosResult<Option<OwnerScope>> {
        let row = sqlx::query("SELECT domain, department_id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|row| OwnerScope::new(row.get("domain"), row.get("department_id"))))
    }

    async fn get_content_owner_scope(&self, kudos_id: &str) -> KudosResult<Option<OwnerScope>> {
        // Resolved through the author row; the copies on `kudos` are not authoritative
        let row = sqlx::query(
            r#"
            SELECT u.domain, u.department_id
            FROM kudos k
            JOIN users u ON u.id = k.author_id
            WHERE k.id = ?
            "#,
        )
        .bind(kudos_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(|row| OwnerScope::new(row.get("domain"), row.get("department_id"))))
    }

    async fn get_department_domain(&self, department_id: &str) -> KudosResult<Option<String>> {
        let domain = sqlx::query_scalar::<_, String>("SELECT domain FROM departments WHERE id = ?")
            .bind(department_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(domain)
    }
}

/// In-memory directory
#[derive(Default)]
pub struct MemoryDirectory {
    actors: RwLock<HashMap<String, Actor>>,
    content_owners: RwLock<HashMap<String, String>>,
    departments: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_actor(&self, actor: Actor) {
        self.actors.write().await.insert(actor.id.clone(), actor);
    }

    pub async fn insert_content(&self, kudos_id: &str, owner_id: &str) {
        self.content_owners
            .write()
            .await
            .insert(kudos_id.to_string(), owner_id.to_string());
    }

    pub async fn insert_department(&self, department_id: &str, domain: &str) {
        self.departments
            .write()
            .await
            .insert(department_id.to_string(), domain.to_string());
    }

    /// Make every lookup fail as if the backing store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> KudosResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KudosError::Internal("Directory unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn get_actor(&self, user_id: &str) -> KudosResult<Option<Actor>> {
        self.check_available()?;
        Ok(self.actors.read().await.get(user_id).cloned())
    }

    async fn get_user_scope(&self, user_id: &str) -> KudosResult<Option<OwnerScope>> {
        self.check_available()?;
        Ok(self
            .actors
            .read()
            .await
            .get(user_id)
            .map(|a| OwnerScope::new(a.domain.clone(), a.department_id.clone())))
    }

    async fn get_content_owner_scope(&self, kudos_id: &str) -> KudosResult<Option<OwnerScope>> {
        self.check_available()?;
        let owner_id = match self.content_owners.read().await.get(kudos_id) {
            Some(owner_id) => owner_id.clone(),
            None => return Ok(None),
        };
        self.get_user_scope(&owner_id).await
    }

    async fn get_department_domain(&self, department_id: &str) -> KudosResult<Option<String>> {
        self.check_available()?;
        Ok(self.departments.read().await.get(department_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{admin::level::AdminLevel, db};

    async fn seeded_pool() -> SqlitePool {
        let pool = db::memory_pool().await.unwrap();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, domain, department_id, admin_level, admin_scope, created_at)
            VALUES
                ('alice', 'alice@acme.com', 'acme.com', 'dept-1', 'DOMAIN', 'acme.com', '2024-01-01T00:00:00Z'),
                ('bob', 'bob@acme.com', 'acme.com', 'dept-1', 'wizard', NULL, '2024-01-01T00:00:00Z')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            r#"
            INSERT INTO kudos (id, author_id, message, domain, department_id, created_at)
            VALUES
                ('k1', 'bob', 'thanks!', 'stale.com', 'stale-dept', '2024-01-02T00:00:00Z'),
                ('k2', 'ghost', 'orphan', 'acme.com', 'dept-1', '2024-01-02T00:00:00Z')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO departments (id, domain, name, created_at) VALUES ('dept-1', 'acme.com', 'Eng', '2024-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    #[tokio::test]
    async fn test_sql_actor_lookup() {
        let directory = SqlDirectory::new(seeded_pool().await);

        let alice = directory.get_actor("alice").await.unwrap().unwrap();
        assert_eq!(alice.profile.level(), AdminLevel::Domain);
        assert_eq!(alice.domain.as_deref(), Some("acme.com"));

        // Unknown level strings fail closed
        let bob = directory.get_actor("bob").await.unwrap().unwrap();
        assert_eq!(bob.profile.level(), AdminLevel::User);

        assert!(directory.get_actor("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sql_content_scope_uses_author_row() {
        let directory = SqlDirectory::new(seeded_pool().await);

        let scope = directory.get_content_owner_scope("k1").await.unwrap().unwrap();
        assert_eq!(scope.domain.as_deref(), Some("acme.com"));
        assert_eq!(scope.department_id.as_deref(), Some("dept-1"));

        // Author row missing
        assert!(directory.get_content_owner_scope("k2").await.unwrap().is_none());
        assert!(directory.get_content_owner_scope("k3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sql_department_domain() {
        let directory = SqlDirectory::new(seeded_pool().await);

        assert_eq!(
            directory.get_department_domain("dept-1").await.unwrap().as_deref(),
            Some("acme.com")
        );
        assert!(directory.get_department_domain("dept-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_directory_unavailable() {
        let directory = MemoryDirectory::new();
        directory.set_unavailable(true);
        assert!(directory.get_actor("alice").await.is_err());

        directory.set_unavailable(false);
        assert!(directory.get_actor("alice").await.unwrap().is_none());
    }
}
