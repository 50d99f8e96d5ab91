//! InMemory Presence Repository 実装
//!
//! ドメイン層が定義する PresenceRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ## 技術的負債
//!
//! 単一プロセスが presence の唯一の権威である前提の実装です。水平スケール
//! するには Redis などの共有バックエンドへの置き換えが必要になりますが、
//! それはこのリポジトリのスコープ外です。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tsudoi_shared::time::get_jst_timestamp;

use crate::{
    domain::{
        ConnectionId, DisconnectSweep, FileId, FileViewerSet, Identity, PresenceRepository,
        RepositoryError, Timestamp, UserId, ViewerEntry,
    },
    ui::state::ClientInfo,
};

/// インメモリ Presence Repository 実装
///
/// 接続レジストリ・閲覧者セット・編集マークを HashMap で保持する実装。
/// presence の変更は `files` のロックで直列化されるため、同一ファイルへの
/// 並行 start/stop で更新が失われることはありません。
pub struct InMemoryPresenceRepository {
    /// 接続中のクライアント情報（WebSocket sender を含む）
    connections: Mutex<HashMap<String, ClientInfo>>,
    /// ファイルごとの閲覧者セット（空になったら purge される）
    files: Mutex<HashMap<String, FileViewerSet>>,
    /// ファイルごとの編集マーク（user_id と、そのマークを張った接続）
    editing: Mutex<HashMap<String, Vec<(UserId, ConnectionId)>>>,
}

impl InMemoryPresenceRepository {
    /// 新しい InMemoryPresenceRepository を作成
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            files: Mutex::new(HashMap::new()),
            editing: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPresenceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceRepository for InMemoryPresenceRepository {
    async fn register_connection(
        &self,
        connection_id: ConnectionId,
        info: ClientInfo,
    ) -> Result<(), RepositoryError> {
        let mut connections = self.connections.lock().await;
        if connections.contains_key(connection_id.as_str()) {
            return Err(RepositoryError::DuplicateConnection(
                connection_id.into_string(),
            ));
        }
        connections.insert(connection_id.into_string(), info);
        Ok(())
    }

    async fn remove_connection(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<ClientInfo, RepositoryError> {
        let mut connections = self.connections.lock().await;
        connections
            .remove(connection_id.as_str())
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))
    }

    async fn get_client_info(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<ClientInfo, RepositoryError> {
        let connections = self.connections.lock().await;
        connections
            .get(connection_id.as_str())
            .cloned()
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))
    }

    async fn all_connections(&self) -> Vec<(ConnectionId, ClientInfo)> {
        let connections = self.connections.lock().await;
        connections
            .iter()
            .filter_map(|(id, info)| {
                ConnectionId::new(id.clone())
                    .ok()
                    .map(|cid| (cid, info.clone()))
            })
            .collect()
    }

    async fn connections_of_user(&self, user_id: &UserId) -> Vec<(ConnectionId, ClientInfo)> {
        let connections = self.connections.lock().await;
        connections
            .iter()
            .filter(|(_, info)| &info.identity.id == user_id)
            .filter_map(|(id, info)| {
                ConnectionId::new(id.clone())
                    .ok()
                    .map(|cid| (cid, info.clone()))
            })
            .collect()
    }

    async fn count_connections(&self) -> usize {
        let connections = self.connections.lock().await;
        connections.len()
    }

    async fn online_users(&self) -> Vec<Identity> {
        let connections = self.connections.lock().await;
        let mut by_user: HashMap<&str, Identity> = HashMap::new();
        for info in connections.values() {
            by_user
                .entry(info.identity.id.as_str())
                .or_insert_with(|| info.identity.clone());
        }
        let mut users: Vec<Identity> = by_user.into_values().collect();
        users.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        users
    }

    async fn start_viewing(&self, file_id: FileId, entry: ViewerEntry) -> Vec<ViewerEntry> {
        let now = Timestamp::new(get_jst_timestamp());
        let mut files = self.files.lock().await;
        let set = files
            .entry(file_id.as_str().to_string())
            .or_insert_with(|| FileViewerSet::new(file_id, now));
        set.insert(entry, now);
        set.snapshot()
    }

    async fn stop_viewing(&self, file_id: &FileId, user_id: &UserId) -> Vec<ViewerEntry> {
        let now = Timestamp::new(get_jst_timestamp());
        let mut files = self.files.lock().await;
        let Some(set) = files.get_mut(file_id.as_str()) else {
            return Vec::new();
        };
        set.remove(user_id, now);
        let snapshot = set.snapshot();
        if set.is_empty() {
            files.remove(file_id.as_str());
        }
        snapshot
    }

    async fn disconnect_cleanup(&self, connection_id: &ConnectionId) -> DisconnectSweep {
        let now = Timestamp::new(get_jst_timestamp());
        let mut sweep = DisconnectSweep::default();

        {
            let mut files = self.files.lock().await;
            let mut purged: Vec<String> = Vec::new();
            for (key, set) in files.iter_mut() {
                if set.remove_connection(connection_id, now) {
                    sweep
                        .viewer_updates
                        .push((set.file_id.clone(), set.snapshot()));
                    if set.is_empty() {
                        purged.push(key.clone());
                    }
                }
            }
            for key in purged {
                files.remove(&key);
            }
        }

        {
            let mut editing = self.editing.lock().await;
            editing.retain(|key, marks| {
                marks.retain(|(user_id, conn_id)| {
                    if conn_id == connection_id {
                        if let Ok(file_id) = FileId::new(key.clone()) {
                            sweep.editing_stopped.push((file_id, user_id.clone()));
                        }
                        false
                    } else {
                        true
                    }
                });
                !marks.is_empty()
            });
        }

        sweep
    }

    async fn viewers_of(&self, file_id: &FileId) -> Vec<ViewerEntry> {
        let files = self.files.lock().await;
        files
            .get(file_id.as_str())
            .map(|set| set.snapshot())
            .unwrap_or_default()
    }

    async fn presence_snapshot(&self) -> Vec<FileViewerSet> {
        let files = self.files.lock().await;
        let mut sets: Vec<FileViewerSet> = files.values().cloned().collect();
        sets.sort_by(|a, b| a.file_id.as_str().cmp(b.file_id.as_str()));
        sets
    }

    async fn start_editing(
        &self,
        file_id: FileId,
        user_id: UserId,
        connection_id: ConnectionId,
    ) -> Vec<UserId> {
        let mut editing = self.editing.lock().await;
        let marks = editing.entry(file_id.into_string()).or_default();
        marks.retain(|(uid, _)| uid != &user_id);
        marks.push((user_id, connection_id));
        marks.iter().map(|(uid, _)| uid.clone()).collect()
    }

    async fn stop_editing(&self, file_id: &FileId, user_id: &UserId) -> Vec<UserId> {
        let mut editing = self.editing.lock().await;
        let Some(marks) = editing.get_mut(file_id.as_str()) else {
            return Vec::new();
        };
        marks.retain(|(uid, _)| uid != user_id);
        let editors = marks.iter().map(|(uid, _)| uid.clone()).collect();
        if marks.is_empty() {
            editing.remove(file_id.as_str());
        }
        editors
    }

    async fn editors_of(&self, file_id: &FileId) -> Vec<UserId> {
        let editing = self.editing.lock().await;
        editing
            .get(file_id.as_str())
            .map(|marks| marks.iter().map(|(uid, _)| uid.clone()).collect())
            .unwrap_or_default()
    }
}
