use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuthUser},
    error::{AppError, Result},
    models::{SaveListResponse, SavesTab, VoteType},
    services::{
        save_service::{self, CreateSaveParams, GetGameSavesParams},
        vote_service,
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddSaveRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(url(message = "download_url must be a valid URL"))]
    pub download_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GetSavesQuery {
    pub tab: Option<SavesTab>,
    pub size: Option<u32>,
    pub page: Option<u32>,
}

/// Download links must point at one of the configured file hosts.
fn is_allowed_download_url(download_url: &str, allowed_hosts: &[String]) -> bool {
    let Ok(parsed) = url::Url::parse(download_url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    allowed_hosts
        .iter()
        .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
}

pub async fn add_save(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(game_uuid): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>)> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut download_url: Option<String> = None;
    let mut thumbnail: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };

        match name.as_str() {
            "title" => {
                title = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read title: {}", e))
                })?);
            }
            "description" => {
                description = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read description: {}", e))
                })?);
            }
            "download_url" => {
                download_url = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read download_url: {}", e))
                })?);
            }
            "thumbnail" => {
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read thumbnail: {}", e))
                })?;
                thumbnail = Some(data.to_vec());
            }
            _ => {}
        }
    }

    let request = AddSaveRequest {
        title: title.ok_or_else(|| AppError::BadRequest("title is required".to_string()))?,
        description: description.filter(|d| !d.is_empty()),
        download_url: download_url
            .ok_or_else(|| AppError::BadRequest("download_url is required".to_string()))?,
    };
    request.validate()?;

    if !is_allowed_download_url(&request.download_url, &state.config.allowed_download_hosts) {
        return Err(AppError::BadRequest("Invalid download URL".to_string()));
    }

    tracing::info!(
        username = %auth_user.user.username,
        game_uuid = %game_uuid,
        "Add save"
    );

    let save = save_service::create(
        &state.db,
        &state.storage,
        CreateSaveParams {
            game_uuid,
            author_uuid: auth_user.user.uuid,
            title: request.title,
            description: request.description,
            download_url: request.download_url,
            thumbnail,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "save": save }))))
}

pub async fn get_saves(
    State(state): State<AppState>,
    Path(game_uuid): Path<Uuid>,
    Query(query): Query<GetSavesQuery>,
    OptionalAuthUser(auth_user): OptionalAuthUser,
) -> Result<Json<SaveListResponse>> {
    tracing::info!(game_uuid = %game_uuid, "Get saves");

    let results = save_service::get_game_saves(
        &state.db,
        game_uuid,
        query.tab.unwrap_or_default(),
        GetGameSavesParams {
            customer_uuid: auth_user.map(|u| u.user.uuid),
            page: query.page,
            size: query.size,
        },
    )
    .await?;

    Ok(Json(results))
}

pub async fn upvote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(save_uuid): Path<Uuid>,
) -> Result<Json<Value>> {
    tracing::info!(
        save_uuid = %save_uuid,
        username = %auth_user.user.username,
        "Upvote"
    );

    let save = vote_service::vote(&state.db, save_uuid, auth_user.user.uuid, VoteType::Up).await?;

    Ok(Json(json!({ "message": "Upvoted", "upvote": save })))
}

pub async fn downvote(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(save_uuid): Path<Uuid>,
) -> Result<Json<Value>> {
    tracing::info!(
        save_uuid = %save_uuid,
        username = %auth_user.user.username,
        "Downvote"
    );

    let save =
        vote_service::vote(&state.db, save_uuid, auth_user.user.uuid, VoteType::Down).await?;

    Ok(Json(json!({ "message": "Downvoted", "upvote": save })))
}

pub async fn delete_save(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(save_uuid): Path<Uuid>,
) -> Result<Json<Value>> {
    save_service::delete_save(&state.db, save_uuid, auth_user.user.uuid).await?;

    Ok(Json(json!({ "message": "Save deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts() -> Vec<String> {
        vec!["drive.google.com".to_string(), "mega.nz".to_string()]
    }

    #[test]
    fn accepts_allowed_hosts_and_subdomains() {
        assert!(is_allowed_download_url(
            "https://drive.google.com/file/d/abc",
            &hosts()
        ));
        assert!(is_allowed_download_url("https://eu.mega.nz/f/xyz", &hosts()));
    }

    #[test]
    fn rejects_unlisted_hosts() {
        assert!(!is_allowed_download_url("https://example.com/save.zip", &hosts()));
        // Suffix tricks must not pass as subdomains.
        assert!(!is_allowed_download_url("https://notmega.nz.evil.com/f", &hosts()));
        assert!(!is_allowed_download_url("https://fakemega.nz/f", &hosts()));
    }

    #[test]
    fn rejects_unparseable_urls() {
        assert!(!is_allowed_download_url("not a url", &hosts()));
        assert!(!is_allowed_download_url("", &hosts()));
    }
}
