use sqlx::PgPool;

use crate::{
    auth::{Claims, hash_password, verify_password},
    error::{AppError, Result},
    models::{User, UserResponse},
    redis::RedisClient,
    services::user_service,
};

pub struct SessionResult {
    pub token: String,
    pub user: UserResponse,
}

/// Signs a token carrying {sub, username, email} and stores the
/// password-free user snapshot under it. The token is the session id; all
/// later lookups are O(1) against the store.
async fn create_session(redis: &RedisClient, jwt_secret: &str, user: User) -> Result<SessionResult> {
    let token = Claims::new(&user).sign(jwt_secret)?;
    let snapshot = UserResponse::from(user);
    let user_json = serde_json::to_string(&snapshot)
        .map_err(|e| AppError::Internal(format!("Failed to serialize session user: {}", e)))?;
    redis.store_session(&token, &user_json).await?;

    Ok(SessionResult {
        token,
        user: snapshot,
    })
}

pub async fn sign_up(
    db: &PgPool,
    redis: &RedisClient,
    jwt_secret: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<SessionResult> {
    if user_service::find_by_email(db, email).await?.is_some() {
        return Err(AppError::Conflict("Email already taken".to_string()));
    }
    if user_service::find_by_username(db, username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let password_hash = hash_password(password)?;
    let user = user_service::create(db, username, email, &password_hash).await?;

    tracing::info!(username = %user.username, "User registered");

    create_session(redis, jwt_secret, user).await
}

pub async fn sign_in(
    db: &PgPool,
    redis: &RedisClient,
    jwt_secret: &str,
    login: &str,
    password: &str,
) -> Result<SessionResult> {
    let user = user_service::find_by_login(db, login)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::Authentication("Invalid credentials".to_string()));
    }

    create_session(redis, jwt_secret, user).await
}

pub async fn sign_out(redis: &RedisClient, token: &str) -> Result<()> {
    redis.delete_session(token).await
}
