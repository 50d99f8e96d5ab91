//! HTTP API endpoint handlers.
//!
//! Read-only inspection endpoints plus the event-injection endpoints the
//! CRUD collaborator calls when files are uploaded, shared or re-permissioned.

use std::sync::Arc;

use axum::{Json, extract::State};

use tsudoi_shared::time::timestamp_to_jst_rfc3339;

use crate::{
    domain::UserId,
    infrastructure::dto::{
        http::{
            DeliveryReportDto, FilePresenceDto, FileUploadedRequest, OnlineUsersDto,
            PermissionUpdatedRequest, ResourceSharedRequest,
        },
        websocket::{IdentityDto, ServerEvent, ViewerDto},
    },
    ui::handler::websocket::broadcast_all,
    ui::state::AppState,
    usecase::{NotifyUserUseCase, OnlineUsersUseCase},
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Snapshot of every tracked file's viewer set
pub async fn get_presence(State(state): State<Arc<AppState>>) -> Json<Vec<FilePresenceDto>> {
    let snapshot = state.repository.presence_snapshot().await;

    let presence = snapshot
        .iter()
        .map(|set| FilePresenceDto {
            file_id: set.file_id.as_str().to_string(),
            viewers: set.snapshot().iter().map(ViewerDto::from).collect(),
            last_updated: timestamp_to_jst_rfc3339(set.last_updated.value()),
        })
        .collect();

    Json(presence)
}

/// Deduplicated list of online identities
pub async fn get_online_users(State(state): State<Arc<AppState>>) -> Json<OnlineUsersDto> {
    let usecase = OnlineUsersUseCase::new(state.repository.clone());
    let users = usecase.execute().await;

    Json(OnlineUsersDto {
        users: users.iter().map(IdentityDto::from).collect(),
    })
}

/// Broadcast a new-file-uploaded event to every connected client
pub async fn post_file_uploaded(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FileUploadedRequest>,
) -> Json<DeliveryReportDto> {
    let event = ServerEvent::NewFileUploaded {
        file_id: request.file_id,
        file_name: request.file_name,
        uploaded_by: request.uploaded_by,
    };
    let delivered = state.repository.count_connections().await;
    broadcast_all(&state, &event).await;
    tracing::info!("Broadcasted new-file-uploaded to {} connections", delivered);

    Json(DeliveryReportDto { delivered })
}

/// Relay a resource-shared-with-you event to the target identity
pub async fn post_resource_shared(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResourceSharedRequest>,
) -> Json<DeliveryReportDto> {
    let event = ServerEvent::ResourceSharedWithYou {
        resource_id: request.resource_id,
        resource_name: request.resource_name,
        shared_by: request.shared_by,
    };
    let delivered = relay_to_user(&state, &request.target_user_id, &event).await;

    Json(DeliveryReportDto { delivered })
}

/// Relay a permission-updated event to the target identity
pub async fn post_permission_updated(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PermissionUpdatedRequest>,
) -> Json<DeliveryReportDto> {
    let event = ServerEvent::PermissionUpdated {
        resource_id: request.resource_id,
        permission: request.permission,
        updated_by: request.updated_by,
    };
    let delivered = relay_to_user(&state, &request.target_user_id, &event).await;

    Json(DeliveryReportDto { delivered })
}

/// Best-effort relay to every connection of one user.
///
/// An offline target yields zero deliveries, not an error.
async fn relay_to_user(state: &Arc<AppState>, target_user_id: &str, event: &ServerEvent) -> usize {
    let Ok(user_id) = UserId::new(target_user_id.to_string()) else {
        tracing::warn!("Invalid targetUserId in event injection: '{}'", target_user_id);
        return 0;
    };

    let usecase = NotifyUserUseCase::new(state.repository.clone());
    let targets = usecase.execute(&user_id).await;
    let json = serde_json::to_string(event).unwrap();

    let mut delivered = 0;
    for (conn_id, info) in targets {
        if info.sender.send(json.clone()).is_ok() {
            delivered += 1;
        } else {
            tracing::warn!("Failed to relay event to connection '{}'", conn_id);
        }
    }
    delivered
}
