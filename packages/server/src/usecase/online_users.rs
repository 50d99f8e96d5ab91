//! UseCase: オンラインユーザーリストの取得

use std::sync::Arc;

use crate::domain::{Identity, PresenceRepository};

/// オンラインユーザー問い合わせのユースケース
pub struct OnlineUsersUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl OnlineUsersUseCase {
    /// 新しい OnlineUsersUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 現在オンラインの identity リストを取得（ユーザー単位で重複排除済み）
    pub async fn execute(&self) -> Vec<Identity> {
        self.repository.online_users().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionIdFactory, Email, UserId, UserName},
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

    #[tokio::test]
    async fn test_online_users_lists_connected_identities() {
        // テスト項目: 接続中の identity がソートされて返される
        // given (前提条件):
        let repository = Arc::new(InMemoryPresenceRepository::new());
        let usecase = OnlineUsersUseCase::new(repository.clone());
        for id in ["charlie", "alice"] {
            let (tx, _rx) = mpsc::unbounded_channel();
            repository
                .register_connection(
                    ConnectionIdFactory::generate().unwrap(),
                    ClientInfo {
                        sender: tx,
                        identity: identity(id),
                        connected_at: get_jst_timestamp(),
                    },
                )
                .await
                .unwrap();
        }

        // when (操作):
        let users = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id.as_str(), "alice");
        assert_eq!(users[1].id.as_str(), "charlie");
    }
}
