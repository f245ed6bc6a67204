use crate::error::AppError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use models::ErrorKind;

/// The caller identity resolved from a bearer token (§6: every
/// `/api/v1/*` route requires one; `/healthz` `/readyz` `/capabilities`
/// `/api/v1/platforms` are public).
pub struct AuthUser(pub uuid::Uuid);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::Kind(ErrorKind::Authentication {
                        code: "NO_TOKEN".to_string(),
                        message: "missing or malformed bearer token".to_string(),
                    })
                })?;

        let user_id = state
            .tokens
            .user_for_token(bearer.token())
            .await
            .map_err(|e| AppError::Other(anyhow::anyhow!(e)))?
            .ok_or_else(|| {
                AppError::Kind(ErrorKind::Authentication {
                    code: "INVALID_TOKEN".to_string(),
                    message: "bearer token does not match a known user".to_string(),
                })
            })?;

        Ok(AuthUser(user_id))
    }
}

/// Validates the shared-secret header the worker presents to the internal
/// completion callback in production (§6, §4.1).
pub fn check_internal_secret(
    headers: &axum::http::HeaderMap,
    expected: &Option<String>,
) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get("X-Internal-Secret")
        .and_then(|v| v.to_str().ok());
    if provided == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(AppError::Kind(ErrorKind::Authentication {
            code: "INVALID_INTERNAL_SECRET".to_string(),
            message: "missing or invalid internal callback secret".to_string(),
        }))
    }
}
