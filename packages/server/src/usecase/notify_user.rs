//! UseCase: 対象ユーザーへの通知中継
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - NotifyUserUseCase::execute() メソッド
//! - 対象ユーザーの全接続（複数デバイス）の解決
//!
//! ### なぜこのテストが必要か
//! - 通知はベストエフォートの中継であり、対象がオフラインでもエラーに
//!   しないという契約を固定する
//! - 同一ユーザーの全デバイスに届くことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：対象が複数接続を持つ場合
//! - エッジケース：対象がオフラインの場合（空リスト）

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, PresenceRepository, UserId},
    ui::state::ClientInfo,
};

/// 通知中継のユースケース
pub struct NotifyUserUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl NotifyUserUseCase {
    /// 新しい NotifyUserUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 通知の配送先を解決
    ///
    /// # Returns
    ///
    /// 対象ユーザーの全接続。オフラインの場合は空リスト（エラーではない）
    pub async fn execute(&self, target_user_id: &UserId) -> Vec<(ConnectionId, ClientInfo)> {
        self.repository.connections_of_user(target_user_id).await
    }
}
