use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::auth::AuthContext;
use crate::backend::{ApiError, AppState};

/// Extractor for protected routes: a bearer token the identity provider
/// still recognises, turned into an authenticated [`AuthContext`].
pub struct RequireAdmin(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_bearer(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        match state.identity.verify(&token).await? {
            Some(session) => Ok(RequireAdmin(AuthContext::authenticated(session))),
            None => Err(ApiError::unauthorized()),
        }
    }
}

/// Like [`RequireAdmin`] but never rejects a missing session, for routes
/// that serve anonymous callers a narrower view. A token that is present
/// but unknown is treated the same as no token.
pub struct MaybeAdmin(pub Option<AuthContext>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_bearer(&parts.headers) else {
            return Ok(MaybeAdmin(None));
        };
        let session = state.identity.verify(&token).await?;
        Ok(MaybeAdmin(session.map(AuthContext::authenticated)))
    }
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())?
        .trim()
        .to_string();
    let token = match auth.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if auth.eq_ignore_ascii_case("bearer") => "",
        _ => auth.as_str(),
    };
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc"));

        // a bare token is accepted too
        headers.insert("authorization", HeaderValue::from_static("abc"));
        assert_eq!(extract_bearer(&headers).as_deref(), Some("abc"));

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), None);
    }
}
