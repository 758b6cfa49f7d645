/// Admin action audit log
use crate::{
    db::{format_timestamp, parse_timestamp},
    error::KudosResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Admin action audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub admin_id: String,
    pub action: String,
    pub subject_id: Option<String>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Log admin action to audit log
    pub async fn log_action(
        &self,
        admin_id: &str,
        action: &str,
        subject_id: Option<&str>,
        details: Option<&str>,
    ) -> KudosResult<()> {
        sqlx::query(
            r#"
            INSERT INTO admin_audit_log (admin_id, action, subject_id, details, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(admin_id)
        .bind(action)
        .bind(subject_id)
        .bind(details)
        .bind(format_timestamp(&Utc::now()))
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Log an action after it already succeeded; a failed write is only reported
    pub async fn record(&self, admin_id: &str, action: &str, subject_id: Option<&str>, details: Option<&str>) {
        if let Err(e) = self.log_action(admin_id, action, subject_id, details).await {
            tracing::warn!("Failed to write audit entry {} by {}: {}", action, admin_id, e);
        }
    }

    /// Most recent entries first
    pub async fn list(&self, limit: i64) -> KudosResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, admin_id, action, subject_id, details, timestamp
            FROM admin_audit_log
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| {
                let timestamp: String = row.get("timestamp");
                Ok(AuditLogEntry {
                    id: row.get("id"),
                    admin_id: row.get("admin_id"),
                    action: row.get("action"),
                    subject_id: row.get("subject_id"),
                    details: row.get("details"),
                    timestamp: parse_timestamp(&timestamp)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn test_log_and_list() {
        let log = AuditLog::new(db::memory_pool().await.unwrap());

        log.log_action("admin", "kudos.hide", Some("k1"), None).await.unwrap();
        log.record("admin", "kudos.delete", Some("k2"), Some("2 media")).await;

        let entries = log.list(10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, "kudos.delete");
        assert_eq!(entries[1].subject_id.as_deref(), Some("k1"));
    }
}
