use axum::{RequestPartsExt, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    models::User,
    services::user_service,
};

/// Identity claims embedded in a session token. Sessions carry no expiry;
/// they live exactly as long as the store entry does.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user uuid
    pub username: String,
    pub email: String,
}

impl Claims {
    pub fn new(user: &User) -> Self {
        Self {
            sub: user.uuid.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }

    pub fn sign(&self, jwt_secret: &str) -> Result<String> {
        let token = encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(jwt_secret.as_ref()),
        )?;
        Ok(token)
    }

    pub fn verify(token: &str, jwt_secret: &str) -> Result<Self> {
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(jwt_secret.as_ref()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}

/// Authenticated caller. Validation is the strict variant: the token must
/// decode, the session entry must still exist in Redis, and the user is
/// re-resolved from Postgres by the subject claim so a stale session
/// snapshot can never diverge from the canonical record.
#[derive(Debug)]
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = bearer.token().to_string();
        let claims = Claims::verify(&token, &state.config.jwt_secret)?;

        if state.redis.get_session(&token).await?.is_none() {
            return Err(AppError::Authentication("Invalid session".to_string()));
        }

        let user_uuid = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Authentication("Invalid user ID in token".to_string()))?;

        let user = user_service::find_by_uuid(&state.db, user_uuid)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid session".to_string()))?;

        Ok(AuthUser { user, token })
    }
}

// Optional auth user (for endpoints that work with or without auth)
#[derive(Debug)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(OptionalAuthUser(Some(user))),
            Err(_) => Ok(OptionalAuthUser(None)),
        }
    }
}

// Password hashing utilities
pub fn hash_password(password: &str) -> Result<String> {
    let cost = 10;
    bcrypt::hash(password, cost).map_err(AppError::from)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            uuid: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
            display_name: None,
            picture_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn claims_round_trip_without_expiry() {
        let user = sample_user();
        let token = Claims::new(&user).sign("test-secret").unwrap();
        let claims = Claims::verify(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, user.uuid.to_string());
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email, "alice@example.com");
    }

    #[test]
    fn claims_reject_wrong_secret() {
        let token = Claims::new(&sample_user()).sign("test-secret").unwrap();
        assert!(Claims::verify(&token, "other-secret").is_err());
    }

    #[test]
    fn claims_reject_garbage_token() {
        assert!(Claims::verify("not.a.token", "test-secret").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2!aa").unwrap();
        assert!(verify_password("hunter2!aa", &hash).unwrap());
        assert!(!verify_password("hunter3!aa", &hash).unwrap());
    }
}
