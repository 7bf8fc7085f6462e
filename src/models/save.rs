use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::VoteType;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Save {
    pub uuid: Uuid,
    pub game_uuid: Uuid,
    pub author_uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub download_url: String,
    pub thumbnail_url: Option<String>,
    pub upvote_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SaveAuthor {
    pub uuid: Uuid,
    pub username: String,
    pub display_name: Option<String>,
}

/// A save enriched with its derived score and the requesting user's own
/// vote state. `customer_vote` is `None` for anonymous callers and right
/// after a retraction.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedSave {
    pub uuid: Uuid,
    pub game_uuid: Uuid,
    pub author_uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub download_url: String,
    pub thumbnail_url: Option<String>,
    pub author: Option<SaveAuthor>,
    pub score: i64,
    pub customer_vote: Option<VoteType>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SavesTab {
    #[default]
    NewToday,
    NewThisWeek,
    Latest,
    Popular,
}

#[derive(Debug, Serialize)]
pub struct SaveListResponse {
    pub count: usize,
    pub saves: Vec<AggregatedSave>,
    pub total_count: i64,
    pub total_pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_selector_parses_kebab_case() {
        let tab: SavesTab = serde_json::from_str("\"new-today\"").unwrap();
        assert_eq!(tab, SavesTab::NewToday);
        let tab: SavesTab = serde_json::from_str("\"new-this-week\"").unwrap();
        assert_eq!(tab, SavesTab::NewThisWeek);
        let tab: SavesTab = serde_json::from_str("\"latest\"").unwrap();
        assert_eq!(tab, SavesTab::Latest);
        let tab: SavesTab = serde_json::from_str("\"popular\"").unwrap();
        assert_eq!(tab, SavesTab::Popular);
    }

    #[test]
    fn default_tab_is_new_today() {
        assert_eq!(SavesTab::default(), SavesTab::NewToday);
    }

    #[test]
    fn unknown_tab_is_rejected() {
        assert!(serde_json::from_str::<SavesTab>("\"trending\"").is_err());
    }
}
