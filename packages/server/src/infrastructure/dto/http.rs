//! HTTP API DTOs for the presence application.
//!
//! The CRUD collaborator injects domain events (uploads, shares, permission
//! changes) through these request bodies; the snapshot DTOs back the
//! read-only inspection endpoints.

use serde::{Deserialize, Serialize};

use super::websocket::{IdentityDto, ViewerDto};

/// Presence summary for one file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilePresenceDto {
    pub file_id: String,
    pub viewers: Vec<ViewerDto>,
    pub last_updated: String, // ISO 8601
}

/// Online user list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnlineUsersDto {
    pub users: Vec<IdentityDto>,
}

/// Request body for `POST /api/events/file-uploaded`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUploadedRequest {
    pub file_id: String,
    pub file_name: String,
    pub uploaded_by: String,
}

/// Request body for `POST /api/events/resource-shared`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSharedRequest {
    pub resource_id: String,
    pub resource_name: String,
    pub shared_by: String,
    pub target_user_id: String,
}

/// Request body for `POST /api/events/permission-updated`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionUpdatedRequest {
    pub resource_id: String,
    pub permission: String,
    pub updated_by: String,
    pub target_user_id: String,
}

/// Delivery report returned by the event injection endpoints.
///
/// Relay is best-effort: a target with no live connection yields
/// `delivered: 0`, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReportDto {
    pub delivered: usize,
}
