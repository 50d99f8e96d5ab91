//! UseCase: 接続受け入れ処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectClientUseCase::execute() メソッド
//! - 接続の登録（重複チェック、オンラインユーザーリスト構築）
//!
//! ### なぜこのテストが必要か
//! - ビジネスロジックの検証：接続 ID の二重登録を防ぐ
//! - 同一ユーザーの複数デバイス接続が独立に許可されることを保証
//! - 接続直後に全クライアントへ配るオンラインユーザーリストの正しさを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続の登録
//! - 正常系：同一ユーザーの別接続（別デバイス）
//! - 異常系：同じ接続 ID での二重登録

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use tsudoi_shared::time::get_jst_timestamp;

use crate::{
    domain::{ConnectionId, Identity, PresenceRepository, RepositoryError},
    ui::state::ClientInfo,
};

use super::error::ConnectError;

/// 接続受け入れのユースケース
pub struct ConnectClientUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl ConnectClientUseCase {
    /// 新しい ConnectClientUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 接続受け入れを実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - ハンドシェイクで採番された接続 ID
    /// * `identity` - 認証コラボレーターが検証済みの identity
    /// * `sender` - この接続へのメッセージ送信チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Identity>)` - 登録成功。全クライアントへ配る最新のオンラインユーザーリスト
    /// * `Err(ConnectError)` - 登録失敗
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        identity: Identity,
        sender: UnboundedSender<String>,
    ) -> Result<Vec<Identity>, ConnectError> {
        let info = ClientInfo {
            sender,
            identity,
            connected_at: get_jst_timestamp(),
        };

        self.repository
            .register_connection(connection_id, info)
            .await
            .map_err(|e| match e {
                RepositoryError::DuplicateConnection(id) => ConnectError::DuplicateConnection(id),
                RepositoryError::ConnectionNotFound(id) => ConnectError::DuplicateConnection(id),
            })?;

        Ok(self.repository.online_users().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionIdFactory, Email, UserId, UserName},
        infrastructure::repository::InMemoryPresenceRepository,
    };
    use tokio::sync::mpsc;

    fn identity(id: &str) -> Identity {
        Identity::new(
            UserId::new(id.to_string()).unwrap(),
            UserName::new(format!("{id}-name")).unwrap(),
            Email::new(format!("{id}@example.com")).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_connect_client_success() {
        // テスト項目: 新規接続が登録され、オンラインユーザーリストが返る
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let usecase = ConnectClientUseCase::new(repository.clone());
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let conn_id = ConnectionIdFactory::generate().unwrap();
        let result = usecase.execute(conn_id, identity("alice"), tx).await;

        // then (期待する結果):
        let online = result.unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].id.as_str(), "alice");
        assert_eq!(repository.count_connections().await, 1);
    }

    #[tokio::test]
    async fn test_connect_same_user_from_two_devices() {
        // テスト項目: 同一ユーザーの複数デバイス接続は独立に許可される
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let usecase = ConnectClientUseCase::new(repository.clone());
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        // when (操作): alice が2接続する
        usecase
            .execute(
                ConnectionIdFactory::generate().unwrap(),
                identity("alice"),
                tx1,
            )
            .await
            .unwrap();
        let online = usecase
            .execute(
                ConnectionIdFactory::generate().unwrap(),
                identity("alice"),
                tx2,
            )
            .await
            .unwrap();

        // then (期待する結果): 接続は2本、オンラインユーザーは1人
        assert_eq!(repository.count_connections().await, 2);
        assert_eq!(online.len(), 1);
    }

    #[tokio::test]
    async fn test_connect_duplicate_connection_id_error() {
        // テスト項目: 同じ接続 ID での二重登録はエラーになる
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let usecase = ConnectClientUseCase::new(repository.clone());
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let conn_id = ConnectionIdFactory::generate().unwrap();
        usecase
            .execute(conn_id.clone(), identity("alice"), tx1)
            .await
            .unwrap();

        // when (操作):
        let result = usecase.execute(conn_id.clone(), identity("alice"), tx2).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ConnectError::DuplicateConnection(
                conn_id.as_str().to_string()
            ))
        );
        assert_eq!(repository.count_connections().await, 1);
    }
}
