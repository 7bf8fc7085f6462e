use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{CombinedGame, Game, GameSearchResult},
    services::rawg_service::{GetGamesParams, RawgService},
};

fn deleted_filter(include_deleted: bool) -> &'static str {
    if include_deleted {
        ""
    } else {
        " AND deleted_at IS NULL"
    }
}

async fn find_local(
    db: &PgPool,
    key: &str,
    include_deleted: bool,
) -> Result<Option<Game>> {
    let as_uuid = Uuid::parse_str(key).ok();
    let as_rawg_id = key.parse::<i32>().ok();

    let query = format!(
        "SELECT * FROM games WHERE (uuid = $1 OR slug = $2 OR rawg_id = $3){}",
        deleted_filter(include_deleted)
    );

    let game = sqlx::query_as::<_, Game>(&query)
        .bind(as_uuid)
        .bind(key)
        .bind(as_rawg_id)
        .fetch_optional(db)
        .await?;

    Ok(game)
}

async fn materialize(db: &PgPool, rawg_id: i32, slug: &str, name: &str) -> Result<Game> {
    // First sighting of a catalog id creates the local row. Concurrent first
    // sightings are resolved by the unique constraint on rawg_id.
    let game = sqlx::query_as::<_, Game>(
        r#"
        INSERT INTO games (uuid, rawg_id, slug, name, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        ON CONFLICT (rawg_id) DO UPDATE SET updated_at = games.updated_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(rawg_id)
    .bind(slug)
    .bind(name)
    .bind(chrono::Utc::now())
    .fetch_one(db)
    .await?;

    Ok(game)
}

/// Resolves a game by local uuid, catalog slug, or numeric catalog id,
/// lazily materializing a local row when only the catalog knows it.
pub async fn get_game(
    db: &PgPool,
    rawg: &RawgService,
    key: &str,
    include_deleted: bool,
) -> Result<CombinedGame> {
    let local = find_local(db, key, include_deleted).await?;
    let mut rawg_game = rawg.get_game(key).await?;

    let game = match (local, &rawg_game) {
        (None, None) => return Err(AppError::NotFound("Game not found".to_string())),
        (None, Some(catalog)) => materialize(db, catalog.id, &catalog.slug, &catalog.name).await?,
        (Some(game), _) => game,
    };

    if rawg_game.is_none() {
        rawg_game = rawg.get_game(&game.rawg_id.to_string()).await?;
    }

    let rawg_data = rawg_game
        .ok_or_else(|| AppError::Internal("Catalog data unavailable for known game".to_string()))?;

    Ok(CombinedGame { game, rawg_data })
}

/// Catalog search. Every hit is materialized locally; hits that fail to
/// materialize are skipped rather than failing the whole search.
pub async fn get_games(
    db: &PgPool,
    rawg: &RawgService,
    keyword: Option<&str>,
    size: Option<u32>,
    sort: Option<&str>,
) -> Result<Vec<GameSearchResult>> {
    let page = rawg
        .get_games(&GetGamesParams {
            search: keyword.map(|s| s.to_string()),
            page_size: size,
            ordering: sort.map(|s| s.to_string()),
        })
        .await?;

    let mut results = Vec::with_capacity(page.results.len());
    for catalog in page.results {
        match materialize(db, catalog.id, &catalog.slug, &catalog.name).await {
            Ok(game) => results.push(GameSearchResult::from(CombinedGame {
                game,
                rawg_data: catalog,
            })),
            Err(e) => {
                tracing::warn!(rawg_id = catalog.id, "Skipping unmaterializable game: {}", e);
            }
        }
    }

    Ok(results)
}
