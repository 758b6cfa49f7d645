/// Kudos persistence and feed listing
use crate::{
    admin::{
        evaluator::evaluate,
        level::{Actor, OwnerScope},
        visibility::{SqlColumns, VisibilityFilter},
    },
    db::{format_timestamp, parse_timestamp},
    error::{KudosError, KudosResult},
    kudos::{FeedCursor, FeedItem, FeedPage, Kudos},
    media::MediaRef,
};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

/// Default and maximum feed page sizes
pub const DEFAULT_FEED_LIMIT: i64 = 25;
pub const MAX_FEED_LIMIT: i64 = 100;

/// Visibility is decided on the author's current row, not on the copies in `kudos`
const FEED_COLUMNS: SqlColumns = SqlColumns {
    hidden: "k.hidden",
    owner_domain: "u.domain",
    owner_department_id: "u.department_id",
};

/// Kudos store
#[derive(Clone)]
pub struct KudosStore {
    db: SqlitePool,
}

impl KudosStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a kudos post, copying the author's scope onto the row
    pub async fn create(
        &self,
        author_id: &str,
        recipient_id: Option<&str>,
        message: &str,
        media: Vec<MediaRef>,
    ) -> KudosResult<Kudos> {
        let author = sqlx::query("SELECT domain, department_id FROM users WHERE id = ?")
            .bind(author_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| KudosError::NotFound(format!("User {} not found", author_id)))?;
        let domain: Option<String> = author.get("domain");
        let department_id: Option<String> = author.get("department_id");

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO kudos (id, author_id, recipient_id, message, domain, department_id, hidden, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&id)
        .bind(author_id)
        .bind(recipient_id)
        .bind(message)
        .bind(&domain)
        .bind(&department_id)
        .bind(format_timestamp(&now))
        .execute(&mut *tx)
        .await?;

        for item in &media {
            sqlx::query("INSERT INTO kudos_media (kudos_id, media_key, mime_type) VALUES (?, ?, ?)")
                .bind(&id)
                .bind(&item.key)
                .bind(&item.mime_type)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        tracing::debug!("Created kudos {} by {}", id, author_id);

        Ok(Kudos {
            id,
            author_id: author_id.to_string(),
            recipient_id: recipient_id.map(String::from),
            message: message.to_string(),
            hidden: false,
            moderated_by: None,
            moderated_at: None,
            created_at: now,
            media,
        })
    }

    /// Get a kudos post regardless of visibility
    pub async fn get(&self, kudos_id: &str) -> KudosResult<Option<Kudos>> {
        let row = sqlx::query(
            r#"
            SELECT id, author_id, recipient_id, message, hidden, moderated_by, moderated_at, created_at
            FROM kudos
            WHERE id = ?
            "#,
        )
        .bind(kudos_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let media = self.media_for(kudos_id).await?;
                Ok(Some(parse_kudos(&row, media)?))
            }
            None => Ok(None),
        }
    }

    /// Media attached to a kudos post
    pub async fn media_for(&self, kudos_id: &str) -> KudosResult<Vec<MediaRef>> {
        let rows = sqlx::query("SELECT media_key, mime_type FROM kudos_media WHERE kudos_id = ? ORDER BY id")
            .bind(kudos_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| MediaRef {
                key: row.get("media_key"),
                mime_type: row.get("mime_type"),
            })
            .collect())
    }

    /// List the feed as seen by `viewer`, newest first
    pub async fn list_feed(
        &self,
        viewer: &Actor,
        filter: &VisibilityFilter,
        limit: Option<i64>,
        before: Option<&FeedCursor>,
    ) -> KudosResult<FeedPage> {
        let limit = limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);

        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT k.id, k.author_id, k.recipient_id, k.message, k.hidden,
                   k.moderated_by, k.moderated_at, k.created_at,
                   u.domain AS author_domain, u.department_id AS author_department_id
            FROM kudos k
            LEFT JOIN users u ON u.id = k.author_id
            WHERE "#,
        );
        filter.push_sql(&mut qb, &FEED_COLUMNS);
        if let Some(before) = before {
            let created_at = format_timestamp(&before.created_at);
            qb.push(" AND (k.created_at < ")
                .push_bind(created_at.clone())
                .push(" OR (k.created_at = ")
                .push_bind(created_at)
                .push(" AND k.id < ")
                .push_bind(before.id.clone())
                .push("))");
        }
        qb.push(" ORDER BY k.created_at DESC, k.id DESC LIMIT ").push_bind(limit);

        let rows = qb.build().fetch_all(&self.db).await?;

        let ids: Vec<String> = rows.iter().map(|row| row.get("id")).collect();
        let mut media = self.media_for_many(&ids).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let kudos = parse_kudos(row, media.remove(&id).unwrap_or_default())?;
            let owner = OwnerScope::new(row.get("author_domain"), row.get("author_department_id"));

            items.push(FeedItem {
                can_moderate: evaluate(&viewer.profile, Some(&owner)).allowed,
                author_domain: owner.domain,
                author_department_id: owner.department_id,
                kudos,
            });
        }

        let cursor = if items.len() as i64 == limit {
            items.last().map(|item| {
                FeedCursor {
                    created_at: item.kudos.created_at,
                    id: item.kudos.id.clone(),
                }
                .encode()
            })
        } else {
            None
        };

        Ok(FeedPage { items, cursor })
    }

    async fn media_for_many(&self, ids: &[String]) -> KudosResult<HashMap<String, Vec<MediaRef>>> {
        let mut media: HashMap<String, Vec<MediaRef>> = HashMap::new();
        if ids.is_empty() {
            return Ok(media);
        }

        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT kudos_id, media_key, mime_type FROM kudos_media WHERE kudos_id IN (",
        );
        {
            let mut separated = qb.separated(", ");
            for id in ids {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(") ORDER BY id");
        }

        for row in qb.build().fetch_all(&self.db).await? {
            media
                .entry(row.get("kudos_id"))
                .or_default()
                .push(MediaRef {
                    key: row.get("media_key"),
                    mime_type: row.get("mime_type"),
                });
        }

        Ok(media)
    }
}

pub(crate) fn parse_kudos(row: &SqliteRow, media: Vec<MediaRef>) -> KudosResult<Kudos> {
    let created_at: String = row.get("created_at");
    let moderated_at = row
        .get::<Option<String>, _>("moderated_at")
        .map(|s| parse_timestamp(&s))
        .transpose()?;

    Ok(Kudos {
        id: row.get("id"),
        author_id: row.get("author_id"),
        recipient_id: row.get("recipient_id"),
        message: row.get("message"),
        hidden: row.get("hidden"),
        moderated_by: row.get("moderated_by"),
        moderated_at,
        created_at: parse_timestamp(&created_at)?,
        media,
    })
}
