use chrono::{Duration, Utc}; // Use chrono for time
use common::Role;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::config::JwtConfig;
use crate::error::AppError;
use crate::extractors::AuthUser;
use crate::web_server::AppState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: usize,    // Issued at
    pub exp: usize,    // Expiration time
    pub nonce: String, // Keeps two tokens issued in the same second distinct
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        AuthUser {
            id: claims.id,
            email: claims.email,
            name: claims.name,
            role: claims.role,
        }
    }
}

// --- Token Helpers ---

/// Signs a token for `user` that expires after `jwt_config.token_expires_minutes`.
pub fn sign_token(user: &AuthUser, jwt_config: &JwtConfig) -> Result<String, AppError> {
    // Generate a random nonce for the token to ensure uniqueness
    let nonce: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();

    let now = Utc::now();
    let claims = Claims {
        id: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::minutes(jwt_config.token_expires_minutes)).timestamp() as usize,
        nonce,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_ref()),
    )?;
    Ok(token)
}

/// Decodes and checks a token. Every failure collapses into [`AppError::InvalidToken`].
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_ref()),
        &validation,
    )
    .map(|token_data| token_data.claims)
    .map_err(|e| {
        tracing::warn!("Token verification failed: {}", e);
        AppError::InvalidToken
    })
}

// --- Middleware for JWT Authentication ---

pub async fn auth_middleware(
    State(state): State<AppState>,
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = auth_header
        .ok_or(AppError::MissingToken)?
        .token()
        .to_owned();

    let claims = verify_token(&token, &state.app_config.jwt)?;

    // Add the authenticated user data to the request extensions
    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            token_expires_minutes: 60,
        }
    }

    fn user() -> AuthUser {
        AuthUser {
            id: "507f1f77bcf86cd799439011".to_string(),
            email: "test@example.com".to_string(),
            name: "Test User".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn signed_tokens_verify_with_the_same_secret() {
        let jwt = config("test-secret");
        let token = sign_token(&user(), &jwt).unwrap();
        let claims = verify_token(&token, &jwt).unwrap();

        assert_eq!(claims.id, "507f1f77bcf86cd799439011");
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.name, "Test User");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.exp - claims.iat, 60 * 60);
    }

    #[test]
    fn tokens_are_unique_per_issue() {
        let jwt = config("test-secret");
        assert_ne!(sign_token(&user(), &jwt).unwrap(), sign_token(&user(), &jwt).unwrap());
    }

    #[test]
    fn a_different_secret_is_rejected() {
        let token = sign_token(&user(), &config("test-secret")).unwrap();
        assert!(matches!(
            verify_token(&token, &config("another-secret")),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(matches!(
            verify_token("invalid.jwt.token", &config("test-secret")),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let jwt = JwtConfig {
            secret: "test-secret".to_string(),
            token_expires_minutes: -5,
        };
        let token = sign_token(&user(), &jwt).unwrap();
        assert!(matches!(verify_token(&token, &jwt), Err(AppError::InvalidToken)));
    }
}
