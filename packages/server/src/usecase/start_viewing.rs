//! UseCase: ファイル閲覧開始（switch を含む）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - StartViewingUseCase::execute() メソッド
//! - 閲覧開始と、直前に閲覧していたファイルからの switch
//!
//! ### なぜこのテストが必要か
//! - switch は「前のファイルの stop → 新しいファイルの start」のペアとして
//!   このユースケースが強制する複合ルール。ユーザーが2つの閲覧者セットに
//!   同時に現れないことを保証する必要がある
//! - 同一ファイルへの重複 start が冪等であることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規閲覧開始
//! - 正常系：別ファイルからの switch（2つのブロードキャスト）
//! - エッジケース：同一ファイルへの重複 start（stop なし、置き換えのみ）
//! - 異常系：ハンドシェイクしていない接続からのアクション

use std::sync::Arc;

use tsudoi_shared::time::get_jst_timestamp;

use crate::domain::{
    ConnectionId, FileId, PresenceRepository, Timestamp, UserId, ViewerEntry,
};

use super::error::PresenceActionError;

/// 閲覧開始の結果
#[derive(Debug)]
pub struct StartViewingOutcome {
    /// switch によって閲覧を終了したファイルと、その更新後リスト
    /// （それ自体のブロードキャストを先に発生させる）
    pub stopped: Option<(FileId, Vec<ViewerEntry>)>,
    /// 追加されたエントリ（user-started-viewing-file の payload）
    pub entry: ViewerEntry,
    /// 新しいファイルの更新後の閲覧者リスト
    pub viewers: Vec<ViewerEntry>,
    /// 新しいファイルを現在編集中のユーザー（file-being-edited の payload）
    pub editors: Vec<UserId>,
}

/// 閲覧開始のユースケース
pub struct StartViewingUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn PresenceRepository>,
}

impl StartViewingUseCase {
    /// 新しい StartViewingUseCase を作成
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 閲覧開始を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - アクションを発行した接続
    /// * `file_id` - 閲覧を開始するファイル
    /// * `previous` - この接続が直前まで閲覧していたファイル（あれば）。
    ///   別ファイルなら先に stop され、独自のブロードキャストを発生させる
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        file_id: FileId,
        previous: Option<FileId>,
    ) -> Result<StartViewingOutcome, PresenceActionError> {
        let info = self
            .repository
            .get_client_info(connection_id)
            .await
            .map_err(|_| PresenceActionError::ConnectionNotFound(connection_id.to_string()))?;

        // switch: 別ファイルを閲覧していた場合は先にそちらを stop する。
        // 同一ファイルへの重複 start は stop せず、エントリの置き換えに任せる。
        let stopped = match previous {
            Some(prev) if prev != file_id => {
                let viewers = self.repository.stop_viewing(&prev, &info.identity.id).await;
                Some((prev, viewers))
            }
            _ => None,
        };

        let entry = ViewerEntry::new(
            info.identity,
            connection_id.clone(),
            Timestamp::new(get_jst_timestamp()),
        );
        let viewers = self
            .repository
            .start_viewing(file_id.clone(), entry.clone())
            .await;
        let editors = self.repository.editors_of(&file_id).await;

        Ok(StartViewingOutcome {
            stopped,
            entry,
            viewers,
            editors,
        })
    }
}
