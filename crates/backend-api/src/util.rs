use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::ApiError;

/// Session tokens are URL-safe base64 without padding.
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Borrow the session token from an `Authorization: Bearer <token>` header.
///
/// Anything that could not be a session token is refused here, before the
/// session store is queried.
pub fn require_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("malformed authorization header"))?
        .trim();

    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = token.trim_start();
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }
    if !token.chars().all(is_token_char) {
        return Err(ApiError::unauthorized("malformed bearer token"));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_session_token_with_any_scheme_case() {
        let headers = headers("bearer q1W-e_rTy");
        assert_eq!(require_bearer(&headers).unwrap(), "q1W-e_rTy");
    }

    #[test]
    fn rejects_missing_header_and_empty_token() {
        let error = require_bearer(&HeaderMap::new()).unwrap_err();
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert!(error.message.contains("missing authorization header"));

        let headers = headers("Bearer");
        assert!(require_bearer(&headers)
            .unwrap_err()
            .message
            .contains("missing bearer token"));
    }

    #[test]
    fn rejects_basic_scheme() {
        let headers = headers("Basic dXNlcjpwYXNz");
        assert!(require_bearer(&headers)
            .unwrap_err()
            .message
            .contains("invalid authorization scheme"));
    }

    #[test]
    fn rejects_tokens_outside_session_alphabet() {
        for value in ["Bearer abc def", "Bearer abc=", "Bearer a/b+c"] {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
            let error = require_bearer(&headers).unwrap_err();
            assert!(error.message.contains("malformed bearer token"), "{value}");
        }
    }
}
