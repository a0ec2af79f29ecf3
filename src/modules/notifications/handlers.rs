use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::models::Notification;
use crate::error::{AppError, AppResult};
use crate::workflow::permissions::{registry, NOTIFICATIONS_READ, NOTIFICATIONS_UPDATE};
use crate::workflow::{Actor, PermissionRegistry, PermissionSet, Role};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<Notification>,
    pub unread: usize,
}

#[derive(Debug, Serialize)]
pub struct PermissionCatalogue {
    pub permissions: &'static PermissionRegistry,
    pub roles: BTreeMap<Role, PermissionSet>,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<NotificationList>> {
    if !actor.can(NOTIFICATIONS_READ) {
        return Err(AppError::missing_permission(NOTIFICATIONS_READ));
    }

    Ok(Json(NotificationList {
        notifications: state.notifications.list()?,
        unread: state.notifications.unread_count(),
    }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    actor: Actor,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    if !actor.can(NOTIFICATIONS_UPDATE) {
        return Err(AppError::missing_permission(NOTIFICATIONS_UPDATE));
    }

    Ok(Json(state.notifications.set_read(notification_id, true)?))
}

/// The capability catalogue and the preset role bundles. Needs no permission.
pub async fn permission_catalogue() -> Json<PermissionCatalogue> {
    Json(PermissionCatalogue {
        permissions: registry(),
        roles: Role::all()
            .iter()
            .map(|role| (*role, role.permissions()))
            .collect(),
    })
}
