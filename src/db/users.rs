/// User records and queries
use crate::{
    admin::level::{AdminLevel, AdminProfile},
    db::{format_timestamp, parse_timestamp},
    error::{KudosError, KudosResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// User record in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub domain: Option<String>,
    pub department_id: Option<String>,
    pub admin_level: AdminLevel,
    pub admin_scope: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn profile(&self) -> AdminProfile {
        AdminProfile::new(self.admin_level, self.admin_scope.as_deref())
    }
}

/// New user to insert
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub id: Option<String>,
    pub email: String,
    pub display_name: Option<String>,
    pub department_id: Option<String>,
}

/// Domain part of an email address, lowercased
pub fn email_domain(email: &str) -> Option<String> {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim().to_ascii_lowercase())
        .filter(|domain| !domain.is_empty())
}

/// User queries
#[derive(Clone)]
pub struct UserRepository {
    db: SqlitePool,
}

impl UserRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a user; the organizational domain is taken from the email address
    pub async fn create(&self, user: NewUser) -> KudosResult<UserRecord> {
        let id = user.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let domain = email_domain(&user.email)
            .ok_or_else(|| KudosError::Validation(format!("Invalid email: {}", user.email)))?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, domain, department_id, admin_level, created_at)
            VALUES (?, ?, ?, ?, ?, 'USER', ?)
            "#,
        )
        .bind(&id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&domain)
        .bind(&user.department_id)
        .bind(format_timestamp(&now))
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                KudosError::Conflict(format!("User already exists: {}", user.email))
            }
            e => KudosError::Database(e),
        })?;

        Ok(UserRecord {
            id,
            email: user.email,
            display_name: user.display_name,
            domain: Some(domain),
            department_id: user.department_id,
            admin_level: AdminLevel::User,
            admin_scope: None,
            created_at: now,
        })
    }

    pub async fn get(&self, user_id: &str) -> KudosResult<Option<UserRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, display_name, domain, department_id, admin_level, admin_scope, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        row.map(parse_user).transpose()
    }

    /// Write an admin level and scope; callers authorize beforehand
    pub async fn set_admin_level(
        &self,
        user_id: &str,
        level: AdminLevel,
        scope: Option<&str>,
    ) -> KudosResult<()> {
        let result = sqlx::query("UPDATE users SET admin_level = ?, admin_scope = ? WHERE id = ?")
            .bind(level.as_str())
            .bind(scope)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(KudosError::NotFound(format!("User {} not found", user_id)));
        }

        Ok(())
    }

    /// List users above USER level, optionally restricted to one domain
    ///
    /// A department admin is listed under the domain of the department it is
    /// scoped to, not under its own membership.
    pub async fn list_admins(&self, domain: Option<&str>) -> KudosResult<Vec<UserRecord>> {
        let rows = match domain {
            Some(domain) => {
                sqlx::query(
                    r#"
                    SELECT u.id, u.email, u.display_name, u.domain, u.department_id,
                           u.admin_level, u.admin_scope, u.created_at
                    FROM users u
                    LEFT JOIN departments d ON d.id = u.admin_scope
                    WHERE u.admin_level != 'USER'
                      AND ((u.admin_level = 'DOMAIN' AND u.admin_scope = ?)
                        OR (u.admin_level = 'DEPARTMENT' AND d.domain = ?))
                    ORDER BY u.email
                    "#,
                )
                .bind(domain)
                .bind(domain)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, email, display_name, domain, department_id, admin_level, admin_scope, created_at
                    FROM users
                    WHERE admin_level != 'USER'
                    ORDER BY email
                    "#,
                )
                .fetch_all(&self.db)
                .await?
            }
        };

        rows.into_iter().map(parse_user).collect()
    }
}

fn parse_user(row: SqliteRow) -> KudosResult<UserRecord> {
    let level: String = row.get("admin_level");
    let created_at: String = row.get("created_at");

    Ok(UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        domain: row.get("domain"),
        department_id: row.get("department_id"),
        admin_level: AdminLevel::parse_lenient(&level),
        admin_scope: row.get("admin_scope"),
        created_at: parse_timestamp(&created_at)?,
    })
}
