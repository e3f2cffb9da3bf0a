//! Bearer-session authentication.
//!
//! The identity provider is external; the server only needs to map an
//! opaque session token to an owner. [`SessionRegistry`] holds that map and
//! [`AuthenticatedOwner`] is the axum extractor handlers use to require it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use letsfocus_proto::task::OwnerId;

use crate::config::SessionEntry;
use crate::error::ApiErrorResponse;
use crate::server::AppState;

/// Token -> owner lookup table, fixed at startup.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, OwnerId>,
}

impl SessionRegistry {
    /// Creates an empty registry; every request is then unauthenticated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from configured sessions. Later entries win on
    /// duplicate tokens.
    #[must_use]
    pub fn from_entries(entries: &[SessionEntry]) -> Self {
        let sessions = entries
            .iter()
            .map(|e| (e.token.clone(), OwnerId::new(e.owner.clone())))
            .collect();
        Self { sessions }
    }

    /// Returns the owner for `token`, if it is a known session.
    #[must_use]
    pub fn resolve(&self, token: &str) -> Option<&OwnerId> {
        self.sessions.get(token)
    }

    /// Number of known sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// The owner behind the request's `Authorization: Bearer` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedOwner(pub OwnerId);

impl FromRequestParts<Arc<AppState>> for AuthenticatedOwner {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token);

        let Some(token) = token else {
            tracing::debug!(path = %parts.uri.path(), "request without bearer token");
            return Err(ApiErrorResponse::unauthenticated());
        };

        state.sessions.resolve(token).map_or_else(
            || {
                tracing::warn!(path = %parts.uri.path(), "unknown session token");
                Err(ApiErrorResponse::unauthenticated())
            },
            |owner| Ok(Self(owner.clone())),
        )
    }
}

/// Extracts the token from a `Bearer <token>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
