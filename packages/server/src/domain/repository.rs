//! Repository trait for the presence authority.
//!
//! ドメイン層が定義するデータアクセスの抽象。UseCase 層はこの trait に依存し、
//! インフラ層の実装（InMemory など）には直接依存しません（依存性の逆転）。

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::{
    entity::{FileViewerSet, Identity, ViewerEntry},
    error::RepositoryError,
    value_object::{ConnectionId, FileId, UserId},
};
use crate::ui::state::ClientInfo;

/// Result of sweeping a dead connection out of the store.
///
/// One entry per affected file; each viewer update produces its own
/// broadcast, as does each implicitly ended editing session.
#[derive(Debug, Clone, Default)]
pub struct DisconnectSweep {
    /// Files whose viewer set changed, with the updated (possibly empty) list
    pub viewer_updates: Vec<(FileId, Vec<ViewerEntry>)>,
    /// Editing sessions that ended because their connection died
    pub editing_stopped: Vec<(FileId, UserId)>,
}

/// Data access for the connection registry, the per-file viewer sets and the
/// per-file editing marks.
///
/// The implementation must serialize presence mutations so that concurrent
/// start/stop on the same file never lose updates.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    // --- connection registry ---

    /// Register a new connection. Fails on a duplicate connection id.
    async fn register_connection(
        &self,
        connection_id: ConnectionId,
        info: ClientInfo,
    ) -> Result<(), RepositoryError>;

    /// Remove a connection from the registry, returning its info.
    async fn remove_connection(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<ClientInfo, RepositoryError>;

    /// Look up the info registered for a connection.
    async fn get_client_info(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<ClientInfo, RepositoryError>;

    /// Snapshot of all live connections.
    async fn all_connections(&self) -> Vec<(ConnectionId, ClientInfo)>;

    /// Live connections belonging to one identity (a user may be connected
    /// from several devices).
    async fn connections_of_user(&self, user_id: &UserId) -> Vec<(ConnectionId, ClientInfo)>;

    /// Number of live connections.
    async fn count_connections(&self) -> usize;

    /// Identities with at least one live connection, deduplicated by user id
    /// and sorted for stable broadcasts.
    async fn online_users(&self) -> Vec<Identity>;

    // --- presence store ---

    /// Insert or replace the viewer entry for the entry's user under a file.
    /// Returns the full updated viewer list for broadcast.
    async fn start_viewing(&self, file_id: FileId, entry: ViewerEntry) -> Vec<ViewerEntry>;

    /// Remove a user's viewer entry; the file's set is purged entirely when
    /// it becomes empty. Returns the (possibly empty) updated list.
    /// Stopping an absent user is a no-op.
    async fn stop_viewing(&self, file_id: &FileId, user_id: &UserId) -> Vec<ViewerEntry>;

    /// Remove every viewer entry and editing mark held by a dead connection,
    /// across all files.
    async fn disconnect_cleanup(&self, connection_id: &ConnectionId) -> DisconnectSweep;

    /// Current viewer list for a file (empty when untracked).
    async fn viewers_of(&self, file_id: &FileId) -> Vec<ViewerEntry>;

    /// Snapshot of every tracked file's viewer set.
    async fn presence_snapshot(&self) -> Vec<FileViewerSet>;

    // --- editing marks ---

    /// Mark a user as editing a file. Returns the updated editor list.
    async fn start_editing(
        &self,
        file_id: FileId,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Vec<UserId>;

    /// Unmark a user as editing a file. Returns the updated editor list.
    async fn stop_editing(&self, file_id: &FileId, user_id: &UserId) -> Vec<UserId>;

    /// Users currently editing a file.
    async fn editors_of(&self, file_id: &FileId) -> Vec<UserId>;
}
