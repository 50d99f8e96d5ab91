//! UseCase: 編集状態の開始・終了
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - EditingUseCase::start() / stop() メソッド
//! - 編集マークの付与・解除と、発行者の user_id の解決
//!
//! ### なぜこのテストが必要か
//! - 編集イベントは同じファイルの他の閲覧者に配られるため、
//!   発行者がレジストリ上の identity に正しく解決されることを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：編集開始・終了
//! - 異常系：ハンドシェイクしていない接続からのアクション

use std::sync::Arc;

use crate::domain::{ConnectionId, FileId, PresenceRepository, UserId};

use super::error::PresenceActionError;

/// 編集状態変更の結果
#[derive(Debug)]
pub struct EditingOutcome {
    /// アクションを発行したユーザー
    pub user_id: UserId,
    /// 更新後の編集者リスト
    pub editors: Vec<UserId>,
}

/// 編集状態のユースケース
pub struct EditingUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl EditingUseCase {
    /// 新しい EditingUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 編集開始を実行
    pub async fn start(
        &self,
        connection_id: &ConnectionId,
        file_id: FileId,
    ) -> Result<EditingOutcome, PresenceActionError> {
        let info = self
            .repository
            .get_client_info(connection_id)
            .await
            .map_err(|_| PresenceActionError::ConnectionNotFound(connection_id.to_string()))?;

        let user_id = info.identity.id;
        let editors = self
            .repository
            .start_editing(file_id, user_id.clone(), connection_id.clone())
            .await;

        Ok(EditingOutcome { user_id, editors })
    }

    /// 編集終了を実行
    pub async fn stop(
        &self,
        connection_id: &ConnectionId,
        file_id: &FileId,
    ) -> Result<EditingOutcome, PresenceActionError> {
        let info = self
            .repository
            .get_client_info(connection_id)
            .await
            .map_err(|_| PresenceActionError::ConnectionNotFound(connection_id.to_string()))?;

        let user_id = info.identity.id;
        let editors = self.repository.stop_editing(file_id, &user_id).await;

        Ok(EditingOutcome { user_id, editors })
    }
}
