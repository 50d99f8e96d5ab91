//! WebSocket message DTOs for the presence protocol.
//!
//! Inbound client actions carry a kebab-case `action` tag, outbound server
//! events a kebab-case `event` tag; payload fields are camelCase on the wire.
//! The client crate reuses these types so both halves stay in sync.

use serde::{Deserialize, Serialize};

use crate::domain::{Identity, ViewerEntry};

/// Viewer entry as sent over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerDto {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub connection_id: String,
    /// Unix timestamp (milliseconds since epoch) in JST
    pub joined_at: i64,
}

impl From<&ViewerEntry> for ViewerDto {
    fn from(entry: &ViewerEntry) -> Self {
        Self {
            user_id: entry.identity.id.as_str().to_string(),
            name: entry.identity.name.as_str().to_string(),
            email: entry.identity.email.as_str().to_string(),
            connection_id: entry.connection_id.as_str().to_string(),
            joined_at: entry.joined_at.value(),
        }
    }
}

/// Identity as sent over the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityDto {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Identity> for IdentityDto {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.as_str().to_string(),
            name: identity.name.as_str().to_string(),
            email: identity.email.as_str().to_string(),
        }
    }
}

/// Inbound client → server actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientAction {
    StartViewingFile {
        file_id: String,
    },
    StopViewingFile {
        file_id: String,
    },
    StartEditingFile {
        file_id: String,
    },
    StopEditingFile {
        file_id: String,
    },
    JoinCollaboration {
        resource_id: String,
    },
    LeaveCollaboration {
        resource_id: String,
    },
    SendNotification {
        target_user_id: String,
        r#type: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resource_id: Option<String>,
    },
    GetOnlineUsers,
}

/// Outbound server → client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    FileViewersUpdated {
        file_id: String,
        viewers: Vec<ViewerDto>,
    },
    UserStartedViewingFile {
        file_id: String,
        viewer: ViewerDto,
    },
    UserStoppedViewingFile {
        file_id: String,
        user_id: String,
    },
    UserStartedEditing {
        file_id: String,
        user_id: String,
    },
    UserStoppedEditing {
        file_id: String,
        user_id: String,
    },
    FileBeingEdited {
        file_id: String,
        editor_ids: Vec<String>,
    },
    NewFileUploaded {
        file_id: String,
        file_name: String,
        uploaded_by: String,
    },
    ResourceSharedWithYou {
        resource_id: String,
        resource_name: String,
        shared_by: String,
    },
    PermissionUpdated {
        resource_id: String,
        permission: String,
        updated_by: String,
    },
    Notification {
        r#type: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resource_id: Option<String>,
    },
    // 既存クライアントとの互換のため、このイベント名のみ camelCase
    #[serde(rename = "onlineUsersUpdated")]
    OnlineUsersUpdated {
        users: Vec<IdentityDto>,
    },
}
