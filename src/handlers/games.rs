use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, error::Result, services::game_service};

#[derive(Debug, Deserialize)]
pub struct GetGamesQuery {
    pub keyword: Option<String>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    tracing::info!(id = %id, "Get game");

    let game = game_service::get_game(&state.db, &state.rawg, &id, false).await?;

    Ok(Json(json!({ "game": game })))
}

pub async fn get_games(
    State(state): State<AppState>,
    Query(query): Query<GetGamesQuery>,
) -> Result<Json<Value>> {
    tracing::info!("Get games");

    let games = game_service::get_games(
        &state.db,
        &state.rawg,
        query.keyword.as_deref(),
        query.size,
        query.sort.as_deref(),
    )
    .await?;

    Ok(Json(json!({
        "keyword": query.keyword,
        "count": games.len(),
        "games": games,
    })))
}
