use chrono::{DateTime, Utc};
use cron::Schedule;
use sqlx::PgPool;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{AggregatedSave, Save, SaveAuthor, SaveListResponse, SaveVote, SavesTab},
    services::{storage_service::StorageService, vote_service},
};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;

// The "new" tabs are windows of a recurring schedule, not fixed calendar
// boundaries: [previous occurrence, next occurrence) around now.
const DAILY_SCHEDULE: &str = "0 0 0 * * *";
const WEEKLY_SCHEDULE: &str = "0 0 0 * * Mon";

#[derive(Debug, Default, Clone, Copy)]
pub struct GetGameSavesParams {
    pub customer_uuid: Option<Uuid>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

pub struct CreateSaveParams {
    pub game_uuid: Uuid,
    pub author_uuid: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub download_url: String,
    pub thumbnail: Option<Vec<u8>>,
}

fn total_pages(total_count: i64, size: u32) -> i64 {
    (total_count + size as i64 - 1) / size as i64
}

fn schedule_window(expr: &str, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let schedule = Schedule::from_str(expr)
        .map_err(|e| AppError::Internal(format!("Invalid schedule expression: {}", e)))?;

    let prev = schedule
        .after(&now)
        .next_back()
        .ok_or_else(|| AppError::Internal("Schedule has no previous occurrence".to_string()))?;
    let next = schedule
        .after(&now)
        .next()
        .ok_or_else(|| AppError::Internal("Schedule has no next occurrence".to_string()))?;

    Ok((prev, next))
}

pub async fn get_save_raw(db: &PgPool, uuid: Uuid) -> Result<Option<Save>> {
    let save =
        sqlx::query_as::<_, Save>("SELECT * FROM saves WHERE uuid = $1 AND deleted_at IS NULL")
            .bind(uuid)
            .fetch_optional(db)
            .await?;

    Ok(save)
}

async fn votes_for_saves(db: &PgPool, save_uuids: &[Uuid]) -> Result<Vec<SaveVote>> {
    let votes = sqlx::query_as::<_, SaveVote>("SELECT * FROM save_votes WHERE save_uuid = ANY($1)")
        .bind(save_uuids)
        .fetch_all(db)
        .await?;

    Ok(votes)
}

async fn authors_for_saves(db: &PgPool, author_uuids: &[Uuid]) -> Result<HashMap<Uuid, SaveAuthor>> {
    let authors = sqlx::query_as::<_, SaveAuthor>(
        "SELECT uuid, username, display_name FROM users WHERE uuid = ANY($1)",
    )
    .bind(author_uuids)
    .fetch_all(db)
    .await?;

    Ok(authors.into_iter().map(|a| (a.uuid, a)).collect())
}

pub async fn get_game_save(
    db: &PgPool,
    uuid: Uuid,
    customer_uuid: Option<Uuid>,
) -> Result<AggregatedSave> {
    let save = get_save_raw(db, uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("Save not found".to_string()))?;

    let votes = votes_for_saves(db, &[uuid]).await?;
    let mut authors = authors_for_saves(db, &[save.author_uuid]).await?;
    let author = authors.remove(&save.author_uuid);

    Ok(vote_service::aggregate(save, author, &votes, customer_uuid))
}

async fn list_page(
    db: &PgPool,
    game_uuid: Uuid,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    order_by: &str,
    params: GetGameSavesParams,
) -> Result<SaveListResponse> {
    let size = params.size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
    let page = params.page.unwrap_or(DEFAULT_PAGE).max(1);
    let offset = (page - 1) as i64 * size as i64;

    let (saves, total_count) = if let Some((from, to)) = window {
        let filter = r#"
            WHERE game_uuid = $1 AND deleted_at IS NULL
              AND ((created_at >= $2 AND created_at < $3)
                OR (updated_at >= $2 AND updated_at < $3))
        "#;

        let saves = sqlx::query_as::<_, Save>(&format!(
            "SELECT * FROM saves {} ORDER BY {} LIMIT $4 OFFSET $5",
            filter, order_by
        ))
        .bind(game_uuid)
        .bind(from)
        .bind(to)
        .bind(size as i64)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let total_count =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM saves {}", filter))
                .bind(game_uuid)
                .bind(from)
                .bind(to)
                .fetch_one(db)
                .await?;

        (saves, total_count)
    } else {
        let filter = "WHERE game_uuid = $1 AND deleted_at IS NULL";

        let saves = sqlx::query_as::<_, Save>(&format!(
            "SELECT * FROM saves {} ORDER BY {} LIMIT $2 OFFSET $3",
            filter, order_by
        ))
        .bind(game_uuid)
        .bind(size as i64)
        .bind(offset)
        .fetch_all(db)
        .await?;

        let total_count =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM saves {}", filter))
                .bind(game_uuid)
                .fetch_one(db)
                .await?;

        (saves, total_count)
    };

    let save_uuids: Vec<Uuid> = saves.iter().map(|s| s.uuid).collect();
    let author_uuids: Vec<Uuid> = saves.iter().map(|s| s.author_uuid).collect();
    let votes = votes_for_saves(db, &save_uuids).await?;
    let authors = authors_for_saves(db, &author_uuids).await?;

    let aggregated: Vec<AggregatedSave> = saves
        .into_iter()
        .map(|save| {
            let save_votes: Vec<SaveVote> = votes
                .iter()
                .filter(|v| v.save_uuid == save.uuid)
                .cloned()
                .collect();
            let author = authors.get(&save.author_uuid).cloned();
            vote_service::aggregate(save, author, &save_votes, params.customer_uuid)
        })
        .collect();

    Ok(SaveListResponse {
        count: aggregated.len(),
        saves: aggregated,
        total_count,
        total_pages: total_pages(total_count, size),
    })
}

async fn get_new_game_saves_by_schedule(
    db: &PgPool,
    game_uuid: Uuid,
    schedule_expr: &str,
    params: GetGameSavesParams,
) -> Result<SaveListResponse> {
    let window = schedule_window(schedule_expr, Utc::now())?;
    list_page(db, game_uuid, Some(window), "created_at DESC", params).await
}

async fn get_latest_game_saves(
    db: &PgPool,
    game_uuid: Uuid,
    params: GetGameSavesParams,
) -> Result<SaveListResponse> {
    list_page(db, game_uuid, None, "created_at DESC", params).await
}

async fn get_popular_game_saves(
    db: &PgPool,
    game_uuid: Uuid,
    params: GetGameSavesParams,
) -> Result<SaveListResponse> {
    list_page(db, game_uuid, None, "upvote_count DESC", params).await
}

pub async fn get_game_saves(
    db: &PgPool,
    game_uuid: Uuid,
    tab: SavesTab,
    params: GetGameSavesParams,
) -> Result<SaveListResponse> {
    match tab {
        SavesTab::NewToday => {
            get_new_game_saves_by_schedule(db, game_uuid, DAILY_SCHEDULE, params).await
        }
        SavesTab::NewThisWeek => {
            get_new_game_saves_by_schedule(db, game_uuid, WEEKLY_SCHEDULE, params).await
        }
        SavesTab::Latest => get_latest_game_saves(db, game_uuid, params).await,
        SavesTab::Popular => get_popular_game_saves(db, game_uuid, params).await,
    }
}

pub async fn create(
    db: &PgPool,
    storage: &StorageService,
    params: CreateSaveParams,
) -> Result<AggregatedSave> {
    let game_exists = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM games WHERE uuid = $1 AND deleted_at IS NULL",
    )
    .bind(params.game_uuid)
    .fetch_one(db)
    .await?;

    if game_exists == 0 {
        return Err(AppError::NotFound("Game not found".to_string()));
    }

    let save = sqlx::query_as::<_, Save>(
        r#"
        INSERT INTO saves (
            uuid, game_uuid, author_uuid, title, description, download_url,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(params.game_uuid)
    .bind(params.author_uuid)
    .bind(&params.title)
    .bind(&params.description)
    .bind(&params.download_url)
    .bind(chrono::Utc::now())
    .fetch_one(db)
    .await?;

    if let Some(thumbnail) = params.thumbnail {
        let thumbnail_url = storage
            .upload_image(&format!("{}/thumbnail", save.uuid), &thumbnail)
            .await?;

        sqlx::query("UPDATE saves SET thumbnail_url = $2 WHERE uuid = $1")
            .bind(save.uuid)
            .bind(&thumbnail_url)
            .execute(db)
            .await?;
    }

    get_game_save(db, save.uuid, Some(params.author_uuid)).await
}

/// Author-only soft delete; the row stays behind its deleted_at marker.
pub async fn delete_save(db: &PgPool, save_uuid: Uuid, user_uuid: Uuid) -> Result<()> {
    let save = get_save_raw(db, save_uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("Save not found".to_string()))?;

    if save.author_uuid != user_uuid {
        return Err(AppError::Authorization(
            "Cannot delete this save".to_string(),
        ));
    }

    sqlx::query("UPDATE saves SET deleted_at = $2 WHERE uuid = $1 AND deleted_at IS NULL")
        .bind(save_uuid)
        .bind(chrono::Utc::now())
        .execute(db)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(25, 10), 3);
        assert_eq!(total_pages(20, 10), 2);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(0, 10), 0);
    }

    #[test]
    fn daily_window_brackets_now_at_midnights() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 13, 45, 0).unwrap();
        let (prev, next) = schedule_window(DAILY_SCHEDULE, now).unwrap();

        assert_eq!(prev, Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 16, 0, 0, 0).unwrap());
        assert!(prev <= now && now < next);
    }

    #[test]
    fn weekly_window_runs_monday_to_monday() {
        // 2025-03-15 is a Saturday.
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 13, 45, 0).unwrap();
        let (prev, next) = schedule_window(WEEKLY_SCHEDULE, now).unwrap();

        assert_eq!(prev, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 17, 0, 0, 0).unwrap());
        assert_eq!(prev.weekday(), chrono::Weekday::Mon);
        assert_eq!(prev.hour(), 0);
    }

    #[test]
    fn schedule_window_rejects_garbage_expressions() {
        assert!(schedule_window("not a schedule", Utc::now()).is_err());
    }
}
