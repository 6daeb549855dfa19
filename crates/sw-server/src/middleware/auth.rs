//! Elevated-access checks.
//!
//! Reading a single item's segments is public; listing everything and
//! mutating require the configured API key. Handlers opt in by taking an
//! [`Elevated`] argument. When auth is disabled in config every request is
//! elevated.

use std::collections::HashMap;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::Uri;

use sw_core::config::AuthConfig;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Check raw header values against the auth config.
///
/// Token resolution order:
/// 1. `Authorization: MediaBrowser ..., Token="<token>"` (Jellyfin clients)
/// 2. `X-Emby-Token: <token>` (Jellyfin shorthand)
/// 3. `Authorization: Bearer <token>` (standard API clients)
/// 4. `?api_key=<token>` query parameter, already percent-decoded
pub fn validate_auth_headers(
    auth_config: &AuthConfig,
    authorization: Option<&str>,
    x_emby_token: Option<&str>,
    api_key_param: Option<&str>,
) -> bool {
    if !auth_config.enabled {
        return true;
    }
    let Some(api_key) = auth_config.api_key.as_deref().filter(|k| !k.is_empty()) else {
        return false;
    };

    let mut candidates: Vec<String> = Vec::new();
    if let Some(auth_value) = authorization {
        if auth_value.starts_with("MediaBrowser ") || auth_value.starts_with("Emby ") {
            candidates.extend(extract_mediabrowser_token(auth_value));
        }
    }
    candidates.extend(x_emby_token.map(String::from));
    if let Some(token) = authorization.and_then(|v| v.strip_prefix("Bearer ")) {
        candidates.push(token.trim().to_string());
    }
    candidates.extend(api_key_param.map(String::from));

    candidates.iter().any(|token| token == api_key)
}

/// Extract Token value from MediaBrowser/Emby authorization header.
/// Format: `MediaBrowser Client="...", Device="...", Token="<token>"`
pub fn extract_mediabrowser_token(header: &str) -> Option<String> {
    for part in header.split(',') {
        let part = part.trim();
        let part = part
            .strip_prefix("MediaBrowser ")
            .or_else(|| part.strip_prefix("Emby "))
            .unwrap_or(part);
        if let Some(rest) = part.strip_prefix("Token=") {
            return Some(rest.trim_matches('"').to_string());
        }
    }
    None
}

/// The decoded `api_key` query parameter, matched case-insensitively.
pub fn query_api_key(uri: &Uri) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("api_key"))
        .map(|(_, v)| v)
}

/// Extractor proving the request carries elevated credentials.
#[derive(Debug, Clone, Copy)]
pub struct Elevated;

impl FromRequestParts<AppContext> for Elevated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());
        let api_key_param = query_api_key(&parts.uri);

        if validate_auth_headers(
            &ctx.config.auth,
            header(axum::http::header::AUTHORIZATION.as_str()),
            header("X-Emby-Token"),
            api_key_param.as_deref(),
        ) {
            return Ok(Elevated);
        }

        tracing::debug!(path = %parts.uri.path(), "Rejected request without elevated credentials");
        let err = AppError::from(sw_core::Error::Unauthorized(
            "administrator credentials required".into(),
        ));
        Err(match parts.extensions.get::<RequestId>() {
            Some(id) => err.with_request_id(id.0.clone()),
            None => err,
        })
    }
}
