use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Locally materialized game record. Rows are created lazily the first time
/// the catalog id is seen; catalog metadata itself is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub uuid: Uuid,
    pub rawg_id: i32,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Game metadata as returned by the RAWG catalog API. Only the fields the
/// application cares about are deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawgGame {
    pub id: i32,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub description_raw: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub metacritic: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RawgGamePage {
    pub count: i64,
    pub results: Vec<RawgGame>,
}

#[derive(Debug, Serialize)]
pub struct CombinedGame {
    #[serde(flatten)]
    pub game: Game,
    pub rawg_data: RawgGame,
}

#[derive(Debug, Serialize)]
pub struct GameSearchResult {
    pub uuid: Uuid,
    pub rawg_id: i32,
    pub slug: String,
    pub name: String,
    pub rawg_data: RawgGameSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RawgGameSummary {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub released: Option<String>,
    pub background_image: Option<String>,
}

impl From<CombinedGame> for GameSearchResult {
    fn from(combined: CombinedGame) -> Self {
        Self {
            uuid: combined.game.uuid,
            rawg_id: combined.game.rawg_id,
            slug: combined.game.slug,
            name: combined.game.name,
            rawg_data: RawgGameSummary {
                id: combined.rawg_data.id,
                slug: combined.rawg_data.slug,
                name: combined.rawg_data.name,
                released: combined.rawg_data.released,
                background_image: combined.rawg_data.background_image,
            },
            created_at: combined.game.created_at,
            updated_at: combined.game.updated_at,
            deleted_at: combined.game.deleted_at,
        }
    }
}
