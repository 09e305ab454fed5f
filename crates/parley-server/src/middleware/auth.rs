//! Bearer token authentication
//!
//! `resolve_identity` never rejects a request by itself; it only attaches an
//! [`AuthUser`] marker when the token is known. Handlers that need a caller
//! take `AuthUser` as an argument and get a 401 when the marker is missing.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use parley_store::UserRef;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Identity resolved for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
}

impl AuthUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The reference stored on records; an empty id cannot produce one.
    pub fn user_ref(&self) -> Result<UserRef, ApiError> {
        if self.id.trim().is_empty() {
            return Err(ApiError::UserInfo);
        }
        Ok(UserRef::new(self.id.clone()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

/// Extract the token from `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// 解析调用者身份，匹配成功时写入 request extensions
pub async fn resolve_identity(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        // 每次请求读取最新配置，热重载后立即生效
        let user_id = {
            let config = state.config.get();
            let config = config.read().await;
            config.auth.user_for_token(&token).map(str::to_string)
        };

        match user_id {
            Some(id) => {
                debug!(user_id = %id, "request authenticated");
                request.extensions_mut().insert(AuthUser::new(id));
            }
            None => debug!("unknown bearer token"),
        }
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("BEARER abc"));
        assert_eq!(bearer_token(&headers), Some("abc".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearerabc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_user_ref() {
        assert_eq!(AuthUser::new("u1").user_ref().unwrap().as_str(), "u1");
        assert_eq!(AuthUser::new("").user_ref(), Err(ApiError::UserInfo));
    }
}
