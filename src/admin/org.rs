/// Departments within organizational domains
use crate::{
    admin::{audit::AuditLog, evaluator::DENIED_MESSAGE, level::Scope, resolver::ScopeResolver},
    db::{format_timestamp, parse_timestamp},
    error::{KudosError, KudosResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub domain: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Department management
#[derive(Clone)]
pub struct OrgManager {
    db: SqlitePool,
    resolver: ScopeResolver,
    audit: AuditLog,
}

impl OrgManager {
    pub fn new(db: SqlitePool, resolver: ScopeResolver, audit: AuditLog) -> Self {
        Self { db, resolver, audit }
    }

    /// Create a department; SITE admins anywhere, DOMAIN admins in their own domain
    pub async fn create_department(
        &self,
        actor_id: &str,
        domain: &str,
        name: &str,
    ) -> KudosResult<Department> {
        let domain = domain.trim().to_ascii_lowercase();
        let name = name.trim();

        let actor = self
            .resolver
            .actor(actor_id)
            .await?
            .ok_or_else(|| KudosError::Authorization(DENIED_MESSAGE.to_string()))?;

        let permitted = match actor.profile.scope() {
            Scope::Site => true,
            Scope::Domain(scope) => *scope == domain,
            Scope::Department(_) | Scope::None => false,
        };
        if !permitted {
            return Err(KudosError::Authorization(DENIED_MESSAGE.to_string()));
        }

        if domain.is_empty() || name.is_empty() {
            return Err(KudosError::Validation(
                "Department domain and name are required".to_string(),
            ));
        }

        let department = Department {
            id: uuid::Uuid::new_v4().to_string(),
            domain,
            name: name.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO departments (id, domain, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(&department.id)
            .bind(&department.domain)
            .bind(&department.name)
            .bind(format_timestamp(&department.created_at))
            .execute(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    KudosError::Conflict(format!(
                        "Department {} already exists in {}",
                        department.name, department.domain
                    ))
                }
                e => KudosError::Database(e),
            })?;

        tracing::info!(
            "Created department {} ({}) in {}",
            department.name,
            department.id,
            department.domain
        );
        self.audit
            .record(
                actor_id,
                "department.create",
                Some(&department.id),
                Some(&format!("{} {}", department.domain, department.name)),
            )
            .await;

        Ok(department)
    }

    pub async fn list_departments(&self, domain: &str) -> KudosResult<Vec<Department>> {
        let rows = sqlx::query(
            "SELECT id, domain, name, created_at FROM departments WHERE domain = ? ORDER BY name",
        )
        .bind(domain.trim().to_ascii_lowercase())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                Ok(Department {
                    id: row.get("id"),
                    domain: row.get("domain"),
                    name: row.get("name"),
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }
}
