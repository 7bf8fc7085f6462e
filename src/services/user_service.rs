use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::User,
};

pub async fn find_by_uuid(db: &PgPool, uuid: Uuid) -> Result<Option<User>> {
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE uuid = $1 AND deleted_at IS NULL")
            .bind(uuid)
            .fetch_optional(db)
            .await?;

    Ok(user)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>> {
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL")
            .bind(email)
            .fetch_optional(db)
            .await?;

    Ok(user)
}

pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<User>> {
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1 AND deleted_at IS NULL")
            .bind(username)
            .fetch_optional(db)
            .await?;

    Ok(user)
}

/// Sign-in accepts either username or email as the login.
pub async fn find_by_login(db: &PgPool, login: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE (username = $1 OR email = $1) AND deleted_at IS NULL",
    )
    .bind(login)
    .fetch_optional(db)
    .await?;

    Ok(user)
}

/// Which uniqueness guarantee a violated constraint belongs to.
fn taken_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "Email already taken",
        Some("users_username_key") => "Username already taken",
        _ => "User already exists",
    }
}

pub async fn create(
    db: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User> {
    let now = chrono::Utc::now();

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (uuid, username, email, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .fetch_one(db)
    .await
    .map_err(|e| {
        // Sign-up pre-checks then inserts; a concurrent duplicate lands
        // on the unique constraint and must still surface as a conflict.
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Conflict(taken_message(db_err.constraint()).to_string());
            }
        }
        AppError::from(e)
    })?;

    Ok(user)
}

pub async fn update_picture_url(db: &PgPool, uuid: Uuid, picture_url: &str) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET picture_url = $2, updated_at = $3
        WHERE uuid = $1 AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(uuid)
    .bind(picture_url)
    .bind(chrono::Utc::now())
    .fetch_one(db)
    .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_sign_up_maps_to_the_violated_field() {
        assert_eq!(taken_message(Some("users_email_key")), "Email already taken");
        assert_eq!(
            taken_message(Some("users_username_key")),
            "Username already taken"
        );
    }

    #[test]
    fn unknown_unique_violation_still_reads_as_conflict() {
        assert_eq!(taken_message(Some("users_pkey")), "User already exists");
        assert_eq!(taken_message(None), "User already exists");
    }
}
