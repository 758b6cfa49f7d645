/// Content moderation actions
///
/// Every action is authorized against the author's scope first; the write
/// itself is a single statement so the moderation attribution always lands
/// together with the visibility change.
use crate::{
    admin::{
        audit::AuditLog,
        evaluator::{Authorizer, Target},
    },
    db::format_timestamp,
    error::{KudosError, KudosResult},
    media::MediaBackend,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Moderation state of a kudos post after an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationRecord {
    pub kudos_id: String,
    pub hidden: bool,
    pub moderated_by: String,
    pub moderated_at: DateTime<Utc>,
}

/// Result of a delete; media cleanup is best-effort
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub kudos_id: String,
    pub media_removed: usize,
    /// Media keys that could not be removed from storage
    pub media_failures: Vec<String>,
}

impl DeletionReport {
    pub fn is_complete(&self) -> bool {
        self.media_failures.is_empty()
    }
}

/// Moderation manager
#[derive(Clone)]
pub struct ModerationManager {
    db: SqlitePool,
    authorizer: Authorizer,
    media: Arc<dyn MediaBackend>,
    audit: AuditLog,
}

impl ModerationManager {
    pub fn new(
        db: SqlitePool,
        authorizer: Authorizer,
        media: Arc<dyn MediaBackend>,
        audit: AuditLog,
    ) -> Self {
        Self {
            db,
            authorizer,
            media,
            audit,
        }
    }

    /// Hide a kudos post from everyone outside the moderator's scope
    pub async fn hide(&self, actor_id: &str, kudos_id: &str) -> KudosResult<ModerationRecord> {
        self.set_hidden(actor_id, kudos_id, true).await
    }

    /// Make a hidden kudos post visible again
    pub async fn unhide(&self, actor_id: &str, kudos_id: &str) -> KudosResult<ModerationRecord> {
        self.set_hidden(actor_id, kudos_id, false).await
    }

    async fn set_hidden(
        &self,
        actor_id: &str,
        kudos_id: &str,
        hidden: bool,
    ) -> KudosResult<ModerationRecord> {
        self.authorizer
            .require(actor_id, Target::Content(kudos_id.to_string()))
            .await?;

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE kudos
            SET hidden = ?,
                moderated_by = ?,
                moderated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(hidden)
        .bind(actor_id)
        .bind(format_timestamp(&now))
        .bind(kudos_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(KudosError::NotFound(format!("Kudos {} not found", kudos_id)));
        }

        let action = if hidden { "kudos.hide" } else { "kudos.unhide" };
        tracing::info!("{} {} by {}", action, kudos_id, actor_id);
        self.audit.record(actor_id, action, Some(kudos_id), None).await;

        Ok(ModerationRecord {
            kudos_id: kudos_id.to_string(),
            hidden,
            moderated_by: actor_id.to_string(),
            moderated_at: now,
        })
    }

    /// Delete a kudos post, then remove its media from storage
    ///
    /// The row delete is authoritative. Media that cannot be removed is
    /// logged and listed in the report; it never fails the delete.
    pub async fn delete(&self, actor_id: &str, kudos_id: &str) -> KudosResult<DeletionReport> {
        self.authorizer
            .require(actor_id, Target::Content(kudos_id.to_string()))
            .await?;

        let mut tx = self.db.begin().await?;

        let media_keys: Vec<String> =
            sqlx::query_scalar("SELECT media_key FROM kudos_media WHERE kudos_id = ? ORDER BY id")
                .bind(kudos_id)
                .fetch_all(&mut *tx)
                .await?;

        sqlx::query("DELETE FROM kudos_media WHERE kudos_id = ?")
            .bind(kudos_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM kudos WHERE id = ?")
            .bind(kudos_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(KudosError::NotFound(format!("Kudos {} not found", kudos_id)));
        }

        tx.commit().await?;

        let mut report = DeletionReport {
            kudos_id: kudos_id.to_string(),
            ..Default::default()
        };

        for key in media_keys {
            match self.media.delete(&key).await {
                Ok(()) => report.media_removed += 1,
                Err(e) => {
                    tracing::warn!("Failed to remove media {} of deleted kudos {}: {}", key, kudos_id, e);
                    report.media_failures.push(key);
                }
            }
        }

        tracing::info!(
            "kudos.delete {} by {} ({} media removed, {} failed)",
            kudos_id,
            actor_id,
            report.media_removed,
            report.media_failures.len()
        );

        let details = (!report.is_complete())
            .then(|| format!("media cleanup failed: {}", report.media_failures.join(",")));
        self.audit
            .record(actor_id, "kudos.delete", Some(kudos_id), details.as_deref())
            .await;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        admin::{directory::SqlDirectory, resolver::ScopeResolver},
        db,
        kudos::KudosStore,
        media::{DiskMediaBackend, MediaRef},
    };
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Disk backend that refuses to delete keys starting with "stuck"
    struct FlakyMedia {
        inner: DiskMediaBackend,
    }

    #[async_trait]
    impl MediaBackend for FlakyMedia {
        async fn put(&self, key: &str, data: Vec<u8>) -> KudosResult<()> {
            self.inner.put(key, data).await
        }

        async fn get(&self, key: &str) -> KudosResult<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn delete(&self, key: &str) -> KudosResult<()> {
            if key.starts_with("stuck") {
                return Err(KudosError::MediaStorage("bucket unavailable".to_string()));
            }
            self.inner.delete(key).await
        }

        async fn exists(&self, key: &str) -> KudosResult<bool> {
            self.inner.exists(key).await
        }

        async fn health_check(&self) -> KudosResult<()> {
            self.inner.health_check().await
        }
    }

    struct Fixture {
        pool: SqlitePool,
        store: KudosStore,
        manager: ModerationManager,
        media: Arc<FlakyMedia>,
        _dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let pool = db::memory_pool().await.unwrap();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, domain, department_id, admin_level, admin_scope, created_at) VALUES
                ('site', 'root@corp.com', 'corp.com', NULL, 'SITE', NULL, '2024-01-01T00:00:00Z'),
                ('eng-admin', 'lead@eng.example.com', 'eng.example.com', 'dept-1', 'DOMAIN', 'eng.example.com', '2024-01-01T00:00:00Z'),
                ('dept-admin', 'mgr@eng.example.com', 'eng.example.com', 'dept-1', 'DEPARTMENT', 'dept-1', '2024-01-01T00:00:00Z'),
                ('eng-user', 'dev@eng.example.com', 'eng.example.com', 'dept-2', 'USER', NULL, '2024-01-01T00:00:00Z'),
                ('mkt-user', 'pm@mkt.example.com', 'mkt.example.com', 'dept-3', 'USER', NULL, '2024-01-01T00:00:00Z')
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let media = Arc::new(FlakyMedia {
            inner: DiskMediaBackend::new(dir.path().to_path_buf()),
        });
        let authorizer = Authorizer::new(ScopeResolver::new(Arc::new(SqlDirectory::new(pool.clone()))));
        let manager = ModerationManager::new(
            pool.clone(),
            authorizer,
            media.clone(),
            AuditLog::new(pool.clone()),
        );

        Fixture {
            store: KudosStore::new(pool.clone()),
            pool,
            manager,
            media,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_hide_sets_attribution_together() {
        let f = fixture().await;
        let kudos = f.store.create("eng-user", None, "shipping!", vec![]).await.unwrap();

        let record = f.manager.hide("eng-admin", &kudos.id).await.unwrap();
        assert!(record.hidden);
        assert_eq!(record.moderated_by, "eng-admin");

        let stored = f.store.get(&kudos.id).await.unwrap().unwrap();
        assert!(stored.hidden);
        assert_eq!(stored.moderated_by.as_deref(), Some("eng-admin"));
        assert!(stored.moderated_at.is_some());

        let record = f.manager.unhide("site", &kudos.id).await.unwrap();
        assert!(!record.hidden);
        let stored = f.store.get(&kudos.id).await.unwrap().unwrap();
        assert!(!stored.hidden);
        assert_eq!(stored.moderated_by.as_deref(), Some("site"));

        let actions: Vec<String> = sqlx::query_scalar("SELECT action FROM admin_audit_log ORDER BY id")
            .fetch_all(&f.pool)
            .await
            .unwrap();
        assert_eq!(actions, vec!["kudos.hide", "kudos.unhide"]);
    }

    #[tokio::test]
    async fn test_out_of_scope_moderation_is_denied_without_writes() {
        let f = fixture().await;
        let mkt = f.store.create("mkt-user", None, "nice deck", vec![]).await.unwrap();
        let eng = f.store.create("eng-user", None, "nice fix", vec![]).await.unwrap();

        for (actor, kudos_id) in [
            ("eng-admin", mkt.id.as_str()),
            ("eng-user", eng.id.as_str()),
            // Department admin of dept-1; the author is in dept-2 of the same domain
            ("dept-admin", eng.id.as_str()),
            ("nobody", eng.id.as_str()),
        ] {
            let err = f.manager.hide(actor, kudos_id).await.unwrap_err();
            assert!(matches!(err, KudosError::Authorization(_)), "{} on {}", actor, kudos_id);
        }

        // Unknown content is indistinguishable from out-of-scope content
        let err = f.manager.hide("eng-admin", "missing").await.unwrap_err();
        assert!(matches!(err, KudosError::Authorization(_)));

        let stored = f.store.get(&mkt.id).await.unwrap().unwrap();
        assert!(!stored.hidden);
        assert!(stored.moderated_by.is_none());
    }

    #[tokio::test]
    async fn test_site_admin_on_missing_content_gets_not_found() {
        let f = fixture().await;
        let err = f.manager.delete("site", "missing").await.unwrap_err();
        assert!(matches!(err, KudosError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_survives_media_cleanup_failure() {
        let f = fixture().await;
        f.media.put("ok-1.png", b"a".to_vec()).await.unwrap();
        f.media.put("stuck-2.png", b"b".to_vec()).await.unwrap();

        let kudos = f
            .store
            .create(
                "eng-user",
                None,
                "with pictures",
                vec![
                    MediaRef {
                        key: "ok-1.png".to_string(),
                        mime_type: "image/png".to_string(),
                    },
                    MediaRef {
                        key: "stuck-2.png".to_string(),
                        mime_type: "image/png".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        let report = f.manager.delete("eng-admin", &kudos.id).await.unwrap();
        assert_eq!(report.media_removed, 1);
        assert_eq!(report.media_failures, vec!["stuck-2.png".to_string()]);
        assert!(!report.is_complete());

        assert!(f.store.get(&kudos.id).await.unwrap().is_none());
        assert!(f.store.media_for(&kudos.id).await.unwrap().is_empty());
        assert!(!f.media.exists("ok-1.png").await.unwrap());
    }
}
