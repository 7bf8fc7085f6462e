use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::LazyLock;
use validator::Validate;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::UserResponse,
    services::{auth_service, user_service},
};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._\-']+$").unwrap());

#[derive(Debug, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(
        length(min = 3, max = 32, message = "username must be 3 to 32 characters"),
        regex(
            path = *USERNAME_RE,
            message = "username can only contain letters, digits, and ._-'"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1))]
    pub login: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    payload.validate()?;

    tracing::info!(username = %payload.username, "Sign-up");

    let session = auth_service::sign_up(
        &state.db,
        &state.redis,
        &state.config.jwt_secret,
        &payload.username,
        &payload.email,
        &payload.password,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token: session.token,
            user: session.user,
        }),
    ))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<AuthResponse>> {
    payload.validate()?;

    tracing::info!("Sign-in");

    let session = auth_service::sign_in(
        &state.db,
        &state.redis,
        &state.config.jwt_secret,
        &payload.login,
        &payload.password,
    )
    .await?;

    Ok(Json(AuthResponse {
        token: session.token,
        user: session.user,
    }))
}

pub async fn sign_out(State(state): State<AppState>, auth_user: AuthUser) -> Result<Json<Value>> {
    tracing::info!(username = %auth_user.user.username, "Sign-out");

    auth_service::sign_out(&state.redis, &auth_user.token).await?;

    Ok(Json(json!({
        "message": "Sign-out successful"
    })))
}

pub async fn fetch_user(auth_user: AuthUser) -> Result<Json<Value>> {
    Ok(Json(json!({
        "user": UserResponse::from(auth_user.user)
    })))
}

pub async fn update_profile_picture(
    State(state): State<AppState>,
    auth_user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let mut picture: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart payload: {}", e)))?
    {
        if field.name() == Some("profile_picture") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
            picture = Some(data.to_vec());
        }
    }

    let picture =
        picture.ok_or_else(|| AppError::BadRequest("profile_picture is required".to_string()))?;

    tracing::info!(username = %auth_user.user.username, "Update profile picture");

    let picture_url = state
        .storage
        .upload_image(&format!("{}/profile-picture", auth_user.user.uuid), &picture)
        .await?;

    let user = user_service::update_picture_url(&state.db, auth_user.user.uuid, &picture_url).await?;

    Ok(Json(json!({
        "user": UserResponse::from(user)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_up_request(username: &str, email: &str, password: &str) -> SignUpRequest {
        SignUpRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn accepts_valid_sign_up() {
        assert!(
            sign_up_request("alice.o'brien-99", "alice@example.com", "long enough")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn rejects_forbidden_username_characters() {
        assert!(
            sign_up_request("alice smith", "alice@example.com", "long enough")
                .validate()
                .is_err()
        );
        assert!(
            sign_up_request("al", "alice@example.com", "long enough")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn rejects_bad_email_and_short_password() {
        assert!(
            sign_up_request("alice", "not-an-email", "long enough")
                .validate()
                .is_err()
        );
        assert!(
            sign_up_request("alice", "alice@example.com", "short")
                .validate()
                .is_err()
        );
    }
}
