//! Core domain models for the presence layer.

use serde::{Deserialize, Serialize};

use super::value_object::{ConnectionId, Email, FileId, Timestamp, UserId, UserName};

/// Authenticated identity bound to a connection at handshake.
///
/// Supplied by the authentication collaborator; immutable for the lifetime
/// of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Identity id
    pub id: UserId,
    /// Display name
    pub name: UserName,
    /// Email address
    pub email: Email,
}

impl Identity {
    /// Create a new identity
    pub fn new(id: UserId, name: UserName, email: Email) -> Self {
        Self { id, name, email }
    }
}

/// One identity actively viewing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerEntry {
    /// Viewer identity
    pub identity: Identity,
    /// Transport session the entry belongs to
    pub connection_id: ConnectionId,
    /// Timestamp when the viewer joined (refreshed on re-start)
    pub joined_at: Timestamp,
}

impl ViewerEntry {
    /// Create a new viewer entry
    pub fn new(identity: Identity, connection_id: ConnectionId, joined_at: Timestamp) -> Self {
        Self {
            identity,
            connection_id,
            joined_at,
        }
    }

    /// Id of the viewing user
    pub fn user_id(&self) -> &UserId {
        &self.identity.id
    }
}

/// Per-file set of active viewers.
///
/// Invariant: at most one entry per user id. A user re-starting (e.g. after
/// a reconnect) replaces their entry in place, refreshing `joined_at` and
/// `connection_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileViewerSet {
    /// File identifier
    pub file_id: FileId,
    /// Active viewers, at most one per user id
    pub viewers: Vec<ViewerEntry>,
    /// Timestamp of the last mutation
    pub last_updated: Timestamp,
}

impl FileViewerSet {
    /// Create a new empty viewer set for a file
    pub fn new(file_id: FileId, created_at: Timestamp) -> Self {
        Self {
            file_id,
            viewers: Vec::new(),
            last_updated: created_at,
        }
    }

    /// Insert or replace the entry for the entry's user id.
    ///
    /// Idempotent for the same user: an existing entry is removed before the
    /// new one is pushed, so the set never holds duplicates.
    pub fn insert(&mut self, entry: ViewerEntry, now: Timestamp) {
        self.viewers.retain(|v| v.user_id() != entry.user_id());
        self.viewers.push(entry);
        self.last_updated = now;
    }

    /// Remove the entry for a user id.
    ///
    /// Removing an absent user is a no-op; returns whether an entry was
    /// actually removed.
    pub fn remove(&mut self, user_id: &UserId, now: Timestamp) -> bool {
        let before = self.viewers.len();
        self.viewers.retain(|v| v.user_id() != user_id);
        let removed = self.viewers.len() != before;
        if removed {
            self.last_updated = now;
        }
        removed
    }

    /// Remove every entry carrying the given connection id.
    ///
    /// Returns whether any entry was removed.
    pub fn remove_connection(&mut self, connection_id: &ConnectionId, now: Timestamp) -> bool {
        let before = self.viewers.len();
        self.viewers.retain(|v| &v.connection_id != connection_id);
        let removed = self.viewers.len() != before;
        if removed {
            self.last_updated = now;
        }
        removed
    }

    /// Get the entry for a user id
    pub fn get(&self, user_id: &UserId) -> Option<&ViewerEntry> {
        self.viewers.iter().find(|v| v.user_id() == user_id)
    }

    /// Whether the set has no viewers left
    pub fn is_empty(&self) -> bool {
        self.viewers.is_empty()
    }

    /// Snapshot of the viewers, sorted by user id for stable broadcasts
    pub fn snapshot(&self) -> Vec<ViewerEntry> {
        let mut viewers = self.viewers.clone();
        viewers.sort_by(|a, b| a.user_id().as_str().cmp(b.user_id().as_str()));
        viewers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::factory::ConnectionIdFactory;

    fn identity(id: &str) -> Identity {
        Identity::new(
            UserId::new(id.to_string()).unwrap(),
            UserName::new(format!("{id}-name")).unwrap(),
            Email::new(format!("{id}@example.com")).unwrap(),
        )
    }

    fn entry(id: &str, joined_at: i64) -> ViewerEntry {
        ViewerEntry::new(
            identity(id),
            ConnectionIdFactory::generate().unwrap(),
            Timestamp::new(joined_at),
        )
    }

    #[test]
    fn test_file_viewer_set_new() {
        // テスト項目: 新しい FileViewerSet が空の状態で作成される
        // given (前提条件):
        let file_id = FileId::new("file-1".to_string()).unwrap();

        // when (操作):
        let set = FileViewerSet::new(file_id.clone(), Timestamp::new(1000));

        // then (期待する結果):
        assert_eq!(set.file_id, file_id);
        assert!(set.is_empty());
        assert_eq!(set.last_updated, Timestamp::new(1000));
    }

    #[test]
    fn test_file_viewer_set_insert() {
        // テスト項目: 閲覧者を追加できる
        // given (前提条件):
        let mut set = FileViewerSet::new(
            FileId::new("file-1".to_string()).unwrap(),
            Timestamp::new(0),
        );

        // when (操作):
        set.insert(entry("alice", 1000), Timestamp::new(1000));

        // then (期待する結果):
        assert_eq!(set.viewers.len(), 1);
        assert_eq!(set.viewers[0].user_id().as_str(), "alice");
        assert_eq!(set.last_updated, Timestamp::new(1000));
    }

    #[test]
    fn test_file_viewer_set_insert_same_user_replaces() {
        // テスト項目: 同一ユーザーの再追加はエントリを置き換え、重複しない
        // given (前提条件):
        let mut set = FileViewerSet::new(
            FileId::new("file-1".to_string()).unwrap(),
            Timestamp::new(0),
        );
        let first = entry("alice", 1000);
        set.insert(first.clone(), Timestamp::new(1000));

        // when (操作): 再接続後の新しい接続 ID で再度 start する
        let second = entry("alice", 2000);
        set.insert(second.clone(), Timestamp::new(2000));

        // then (期待する結果): エントリは1件のまま、接続 ID と joined_at が更新される
        assert_eq!(set.viewers.len(), 1);
        assert_eq!(set.viewers[0].connection_id, second.connection_id);
        assert_eq!(set.viewers[0].joined_at, Timestamp::new(2000));
        assert_ne!(set.viewers[0].connection_id, first.connection_id);
    }

    #[test]
    fn test_file_viewer_set_remove() {
        // テスト項目: 閲覧者を削除できる
        // given (前提条件):
        let mut set = FileViewerSet::new(
            FileId::new("file-1".to_string()).unwrap(),
            Timestamp::new(0),
        );
        set.insert(entry("alice", 1000), Timestamp::new(1000));
        set.insert(entry("bob", 2000), Timestamp::new(2000));

        // when (操作):
        let removed = set.remove(
            &UserId::new("alice".to_string()).unwrap(),
            Timestamp::new(3000),
        );

        // then (期待する結果):
        assert!(removed);
        assert_eq!(set.viewers.len(), 1);
        assert_eq!(set.viewers[0].user_id().as_str(), "bob");
        assert_eq!(set.last_updated, Timestamp::new(3000));
    }

    #[test]
    fn test_file_viewer_set_remove_absent_user_is_noop() {
        // テスト項目: 存在しないユーザーの削除は no-op でエラーにならない
        // given (前提条件):
        let mut set = FileViewerSet::new(
            FileId::new("file-1".to_string()).unwrap(),
            Timestamp::new(0),
        );
        set.insert(entry("alice", 1000), Timestamp::new(1000));

        // when (操作):
        let removed = set.remove(
            &UserId::new("ghost".to_string()).unwrap(),
            Timestamp::new(2000),
        );

        // then (期待する結果): 削除は行われず last_updated も変わらない
        assert!(!removed);
        assert_eq!(set.viewers.len(), 1);
        assert_eq!(set.last_updated, Timestamp::new(1000));
    }

    #[test]
    fn test_file_viewer_set_remove_connection() {
        // テスト項目: 接続 ID を指定してエントリを削除できる
        // given (前提条件):
        let mut set = FileViewerSet::new(
            FileId::new("file-1".to_string()).unwrap(),
            Timestamp::new(0),
        );
        let alice = entry("alice", 1000);
        let bob = entry("bob", 2000);
        set.insert(alice.clone(), Timestamp::new(1000));
        set.insert(bob.clone(), Timestamp::new(2000));

        // when (操作):
        let removed = set.remove_connection(&alice.connection_id, Timestamp::new(3000));

        // then (期待する結果):
        assert!(removed);
        assert_eq!(set.viewers.len(), 1);
        assert_eq!(set.viewers[0].user_id().as_str(), "bob");
    }

    #[test]
    fn test_file_viewer_set_snapshot_sorted() {
        // テスト項目: snapshot はユーザー ID でソートされたリストを返す
        // given (前提条件):
        let mut set = FileViewerSet::new(
            FileId::new("file-1".to_string()).unwrap(),
            Timestamp::new(0),
        );
        set.insert(entry("charlie", 1000), Timestamp::new(1000));
        set.insert(entry("alice", 2000), Timestamp::new(2000));
        set.insert(entry("bob", 3000), Timestamp::new(3000));

        // when (操作):
        let snapshot = set.snapshot();

        // then (期待する結果):
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].user_id().as_str(), "alice");
        assert_eq!(snapshot[1].user_id().as_str(), "bob");
        assert_eq!(snapshot[2].user_id().as_str(), "charlie");
    }

    #[test]
    fn test_file_viewer_set_get() {
        // テスト項目: ユーザー ID でエントリを取得できる
        // given (前提条件):
        let mut set = FileViewerSet::new(
            FileId::new("file-1".to_string()).unwrap(),
            Timestamp::new(0),
        );
        set.insert(entry("alice", 1000), Timestamp::new(1000));

        // when (操作):
        let alice_id = UserId::new("alice".to_string()).unwrap();
        let found = set.get(&alice_id);
        let missing = set.get(&UserId::new("bob".to_string()).unwrap());

        // then (期待する結果):
        assert!(found.is_some());
        assert_eq!(found.unwrap().user_id(), &alice_id);
        assert!(missing.is_none());
    }
}
