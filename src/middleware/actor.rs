use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;
use crate::workflow::{permissions, Actor, PermissionSet};

/// Set by the authentication layer in front of this service.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Comma-separated permission tokens granted to the actor.
pub const ACTOR_PERMISSIONS_HEADER: &str = "x-actor-permissions";

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .ok_or_else(|| AppError::Authentication("missing actor id".to_string()))?
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| AppError::Authentication("malformed actor id".to_string()))?;

        let permissions = parts
            .headers
            .get(ACTOR_PERMISSIONS_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(PermissionSet::from_header_value)
            .unwrap_or_default();

        let catalogue = permissions::registry();
        for token in permissions.iter().filter(|token| !catalogue.contains(token)) {
            tracing::debug!(actor_id = %id, token, "Actor holds an uncatalogued permission token");
        }

        Ok(Actor::new(id, permissions))
    }
}
