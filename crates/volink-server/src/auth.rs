// JWT authentication
//
// Tokens carry the profile id plus the `is_ngo` flag; the role is always
// derived from that flag, never stored on its own. The middleware rejects
// expired tokens with a dedicated error code so clients can distinguish
// "log in again" from "bad credentials".

use crate::api::error_response;
use crate::logging::TraceId;
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Profile id
    pub sub: String,
    pub email: String,
    /// Derived role flag; true means the account belongs to an NGO
    pub is_ngo: bool,
    pub iat: i64,
    pub exp: i64,
}

pub fn create_token(
    secret: &str,
    profile_id: &str,
    email: &str,
    is_ngo: bool,
    expire_secs: u64,
) -> Result<String> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: profile_id.to_string(),
        email: email.to_string(),
        is_ngo,
        iat: now,
        exp: now + expire_secs as i64,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    // The logging layer runs first and always plants a trace id.
    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();

    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let token = match bearer {
        Some(token) => token,
        None => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "Missing bearer token",
            )
            .into_response();
        }
    };

    match validate_token(&state.jwt_secret, token) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) => {
            error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "token_expired",
                "Token expired, please log in again",
            )
            .into_response()
        }
        Err(e) => {
            tracing::warn!(trace_id = %trace_id, error = %e, "Rejected bearer token");
            error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "Invalid token",
            )
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_keeps_role_flag() {
        let token = create_token("test-secret", "p-1", "ngo@example.org", true, 3600).unwrap();
        let claims = validate_token("test-secret", &token).unwrap();
        assert_eq!(claims.sub, "p-1");
        assert_eq!(claims.email, "ngo@example.org");
        assert!(claims.is_ngo);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = create_token("secret-a", "p-1", "v@example.org", false, 3600).unwrap();
        assert!(validate_token("secret-b", &token).is_err());
    }

    #[test]
    fn test_expired_token_reports_expiry() {
        // Validation keeps a default 60s leeway, so step well past it.
        let token = create_token("test-secret", "p-1", "v@example.org", false, 0).unwrap();
        let now = chrono::Utc::now().timestamp();
        let expired = Claims {
            sub: "p-1".to_string(),
            email: "v@example.org".to_string(),
            is_ngo: false,
            iat: now - 7200,
            exp: now - 3600,
        };
        let expired_token = encode(
            &Header::default(),
            &expired,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let err = validate_token("test-secret", &expired_token).unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
        // A token with exp in the immediate past may still pass due to leeway.
        let _ = validate_token("test-secret", &token);
    }
}
