//! bearer-token authorization for the sensor api
//!
//! the token table comes from `[[auth.tokens]]` in host.toml. a request is let
//! through when its token maps to at least one sensor-reading authority
//! (ADMIN or USER).

use crate::config::TokenEntry;
use crate::domain::Authority;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// token -> authorities held by whoever presents it
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: HashMap<String, HashSet<Authority>>,
}

impl TokenRegistry {
    pub fn from_entries(entries: &[TokenEntry]) -> Self {
        let mut tokens: HashMap<String, HashSet<Authority>> = HashMap::new();
        for entry in entries {
            tokens
                .entry(entry.token.clone())
                .or_default()
                .extend(entry.authorities.iter().copied());
        }
        Self { tokens }
    }

    pub fn authorities_for(&self, token: &str) -> Option<&HashSet<Authority>> {
        self.tokens.get(token)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// route layer: 401 without a known token, 403 without a reader authority
pub async fn require_reader(
    State(registry): State<Arc<TokenRegistry>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(authorities) = bearer_token(request.headers()).and_then(|t| registry.authorities_for(t))
    else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    if !authorities.iter().any(|a| a.can_read_sensors()) {
        tracing::debug!(?authorities, "caller lacks a sensor-reading authority");
        return StatusCode::FORBIDDEN.into_response();
    }

    next.run(request).await
}
