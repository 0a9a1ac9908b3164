use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{Json, Response},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope;
use crate::AppState;

const TOKEN_DURATION_SECS: i64 = 24 * 3600; // 24 hours
const ISSUER: &str = "askline";

/// JWT claims stored in a staff token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub jti: String,
}

/// JWT service for creating and verifying staff tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn create_token(&self, username: &str) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            is_admin: true,
            exp: now.timestamp() + TOKEN_DURATION_SECS,
            iat: now.timestamp(),
            iss: ISSUER.to_string(),
            jti: Uuid::new_v4().to_string(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a token. Returns claims if valid and not expired.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

/// Constant-time comparison to prevent timing attacks.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// `POST /auth/login` — exchange the admin credentials for a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Response {
    let user_ok = constant_time_eq(
        body.username.as_bytes(),
        state.config.admin_username.as_bytes(),
    );
    let pass_ok = constant_time_eq(
        body.password.as_bytes(),
        state.config.admin_password.as_bytes(),
    );
    if !(user_ok && pass_ok) {
        return envelope::reject(StatusCode::UNAUTHORIZED, "invalid credentials");
    }

    match state.jwt.create_token(&body.username) {
        Ok(token) => envelope::data(serde_json::json!({ "token": token })),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to issue token");
            envelope::reject(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// Middleware guarding the staff surface: requires `Authorization: Bearer`
/// with a valid token.
pub async fn require_staff(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if state.jwt.verify_token(token).is_ok() => next.run(request).await,
        _ => envelope::reject(StatusCode::UNAUTHORIZED, "missing or invalid token"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> JwtService {
        JwtService::new("test-secret-key")
    }

    #[test]
    fn roundtrip_token() {
        let svc = test_service();
        let token = svc.create_token("staff").unwrap();
        let claims = svc.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "staff");
        assert!(claims.is_admin);
        assert_eq!(claims.iss, "askline");
    }

    #[test]
    fn rejects_invalid_token() {
        assert!(test_service().verify_token("garbage").is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = JwtService::new("secret-a").create_token("staff").unwrap();
        assert!(JwtService::new("secret-b").verify_token(&token).is_err());
    }

    #[test]
    fn token_expiry_is_24h() {
        let claims = {
            let svc = test_service();
            let token = svc.create_token("staff").unwrap();
            svc.verify_token(&token).unwrap()
        };
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
