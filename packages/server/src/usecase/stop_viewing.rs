//! UseCase: ファイル閲覧終了
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - StopViewingUseCase::execute() メソッド
//! - エントリの削除と、更新後リストの返却
//!
//! ### なぜこのテストが必要か
//! - 閲覧していないファイルへの stop が no-op であることを保証
//! - 最後の閲覧者の stop でファイルエントリが purge されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：閲覧終了
//! - エッジケース：閲覧していないファイルへの stop
//! - 異常系：ハンドシェイクしていない接続からのアクション

use std::sync::Arc;

use crate::domain::{ConnectionId, FileId, PresenceRepository, UserId, ViewerEntry};

use super::error::PresenceActionError;

/// 閲覧終了の結果
#[derive(Debug)]
pub struct StopViewingOutcome {
    /// アクションを発行したユーザー（user-stopped-viewing-file の payload）
    pub user_id: UserId,
    /// 更新後の（空かもしれない）閲覧者リスト
    pub viewers: Vec<ViewerEntry>,
}

/// 閲覧終了のユースケース
pub struct StopViewingUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl StopViewingUseCase {
    /// 新しい StopViewingUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 閲覧終了を実行
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        file_id: &FileId,
    ) -> Result<StopViewingOutcome, PresenceActionError> {
        let info = self
            .repository
            .get_client_info(connection_id)
            .await
            .map_err(|_| PresenceActionError::ConnectionNotFound(connection_id.to_string()))?;

        let viewers = self.repository.stop_viewing(file_id, &info.identity.id).await;

        Ok(StopViewingOutcome {
            user_id: info.identity.id,
            viewers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            ConnectionIdFactory, Email, Identity, Timestamp, UserName, ViewerEntry,
        },
        infrastructure::repository::InMemoryPresenceRepository,
        ui::state::ClientInfo,
    };
    use tokio::sync::mpsc;
    use tsudoi_shared::time::get_jst_timestamp;

    fn identity(id: &str) -> Identity {
        Identity::new(
            UserId::new(id.to_string()).unwrap(),
            UserName::new(format!("{id}-name")).unwrap(),
            Email::new(format!("{id}@example.com")).unwrap(),
        )
    }

    async fn register(repo: &InMemoryPresenceRepository, id: &str) -> ConnectionId {
        let conn_id = ConnectionIdFactory::generate().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        repo.register_connection(
            conn_id.clone(),
            ClientInfo {
                sender: tx,
                identity: identity(id),
                connected_at: get_jst_timestamp(),
            },
        )
        .await
        .unwrap();
        conn_id
    }

    fn file(id: &str) -> FileId {
        FileId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_stop_viewing_success() {
        // テスト項目: 閲覧終了でエントリが削除され、残りのリストが返される
        // given (前提条件): alice と bob が f1 を閲覧中
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let usecase = StopViewingUseCase::new(repository.clone());
        let conn_alice = register(&repository, "alice").await;
        let conn_bob = register(&repository, "bob").await;
        repository
            .start_viewing(
                file("f1"),
                ViewerEntry::new(
                    identity("alice"),
                    conn_alice.clone(),
                    Timestamp::new(get_jst_timestamp()),
                ),
            )
            .await;
        repository
            .start_viewing(
                file("f1"),
                ViewerEntry::new(
                    identity("bob"),
                    conn_bob,
                    Timestamp::new(get_jst_timestamp()),
                ),
            )
            .await;

        // when (操作):
        let outcome = usecase.execute(&conn_alice, &file("f1")).await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome.user_id.as_str(), "alice");
        assert_eq!(outcome.viewers.len(), 1);
        assert_eq!(outcome.viewers[0].user_id().as_str(), "bob");
    }

    #[tokio::test]
    async fn test_stop_viewing_not_viewing_is_noop() {
        // テスト項目: 閲覧していないファイルへの stop は no-op で成功する
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let usecase = StopViewingUseCase::new(repository.clone());
        let conn_id = register(&repository, "alice").await;

        // when (操作):
        let outcome = usecase.execute(&conn_id, &file("f1")).await.unwrap();

        // then (期待する結果):
        assert!(outcome.viewers.is_empty());
    }

    #[tokio::test]
    async fn test_stop_viewing_unknown_connection_error() {
        // テスト項目: ハンドシェイクしていない接続からのアクションはエラーになる
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let usecase = StopViewingUseCase::new(repository);
        let conn_id = ConnectionIdFactory::generate().unwrap();

        // when (操作):
        let result = usecase.execute(&conn_id, &file("f1")).await;

        // then (期待する結果):
        assert!(matches!(
            result.unwrap_err(),
            PresenceActionError::ConnectionNotFound(_)
        ));
    }
}
