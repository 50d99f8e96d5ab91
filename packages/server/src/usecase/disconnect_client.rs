//! UseCase: 切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectClientUseCase::execute() メソッド
//! - レジストリからの削除と、presence の横断的な掃除
//!
//! ### なぜこのテストが必要か
//! - 明示的な stop を送らずに死んだ接続の閲覧者エントリが残ると、
//!   クライアントに幽霊閲覧者が表示され続ける
//! - 影響を受けたファイルごとに1回ずつブロードキャストが発生することを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：複数ファイルを閲覧中の接続の切断
//! - エッジケース：何も閲覧していない接続の切断（掃除対象なし）
//! - 異常系：レジストリに存在しない接続の切断試行

use std::sync::Arc;

use crate::domain::{ConnectionId, DisconnectSweep, Identity, PresenceRepository};

use super::error::DisconnectError;

/// 切断処理の結果
#[derive(Debug)]
pub struct DisconnectOutcome {
    /// presence から掃除されたエントリ（影響ファイルごとにブロードキャスト）
    pub sweep: DisconnectSweep,
    /// 切断後のオンラインユーザーリスト（全クライアントへ配る）
    pub online_users: Vec<Identity>,
}

/// 切断処理のユースケース
pub struct DisconnectClientUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl DisconnectClientUseCase {
    /// 新しい DisconnectClientUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 切断処理を実行
    ///
    /// レジストリから接続を外した後、その接続が持っていた閲覧者エントリと
    /// 編集マークを全ファイル横断で掃除します。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<DisconnectOutcome, DisconnectError> {
        self.repository
            .remove_connection(connection_id)
            .await
            .map_err(|_| DisconnectError::ConnectionNotFound(connection_id.to_string()))?;

        let sweep = self.repository.disconnect_cleanup(connection_id).await;
        let online_users = self.repository.online_users().await;

        Ok(DisconnectOutcome { sweep, online_users })
    }
}
