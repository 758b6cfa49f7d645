/// Kudos posts and the feed that lists them

pub mod store;

pub use store::KudosStore;

use crate::{
    db::{format_timestamp, parse_timestamp},
    error::{KudosError, KudosResult},
    media::MediaRef,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A kudos post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kudos {
    pub id: String,
    pub author_id: String,
    pub recipient_id: Option<String>,
    pub message: String,
    pub hidden: bool,
    pub moderated_by: Option<String>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub media: Vec<MediaRef>,
}

/// A kudos post as listed to a particular viewer
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub kudos: Kudos,
    pub author_domain: Option<String>,
    pub author_department_id: Option<String>,
    /// Whether the viewer may hide or delete this post
    pub can_moderate: bool,
}

/// One page of the feed
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Position in the feed: the last item's timestamp plus its id
///
/// Encoded as `{created_at}~{id}`. The id breaks ties between posts that
/// share a timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCursor {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

impl FeedCursor {
    pub fn encode(&self) -> String {
        format!("{}~{}", format_timestamp(&self.created_at), self.id)
    }

    pub fn parse(raw: &str) -> KudosResult<Self> {
        let invalid = || KudosError::Validation("Invalid 'before' cursor".to_string());

        let (created_at, id) = raw.split_once('~').ok_or_else(invalid)?;
        if id.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            created_at: parse_timestamp(created_at).map_err(|_| invalid())?,
            id: id.to_string(),
        })
    }
}
