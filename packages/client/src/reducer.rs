//! クライアント側ビュー状態のリデューサー
//!
//! サーバーから受信したプレゼンスイベントを純粋関数でローカルの表示状態に
//! 畳み込む。`reduce` は入力の状態を変更せず、常に新しい状態を返す。
//! 同じアクション列を再適用しても同じ状態に収束するため、再接続後の
//! リプレイが安全に行える。

use std::collections::HashMap;

use tsudoi_server::infrastructure::dto::websocket::ViewerDto;

/// ファイルごとの閲覧者一覧と自分の閲覧中ファイル
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub file_viewers: HashMap<String, Vec<ViewerDto>>,
    pub currently_viewing: Option<String>,
}

/// ビュー状態に対する操作
#[derive(Debug, Clone)]
pub enum ViewAction {
    /// サーバー正本の閲覧者一覧で置き換える
    SetFileViewers {
        file_id: String,
        viewers: Vec<ViewerDto>,
    },
    /// 閲覧開始したユーザーを追加する（同一ユーザーは置き換え）
    UserStartedViewing { file_id: String, viewer: ViewerDto },
    /// 閲覧終了したユーザーを取り除く
    UserStoppedViewing { file_id: String, user_id: String },
    /// 自分が閲覧中のファイルを記録する
    SetCurrentlyViewing { file_id: Option<String> },
    /// 指定ファイルのキャッシュを破棄する（ナビゲーション離脱や明示的な無効化）
    ClearFileViewers { file_id: String },
}

/// 現在の状態とアクションから次の状態を導出する
pub fn reduce(state: &ViewState, action: &ViewAction) -> ViewState {
    let mut next = state.clone();
    match action {
        ViewAction::SetFileViewers { file_id, viewers } => {
            if viewers.is_empty() {
                next.file_viewers.remove(file_id);
            } else {
                next.file_viewers.insert(file_id.clone(), viewers.clone());
            }
        }
        ViewAction::UserStartedViewing { file_id, viewer } => {
            let entry = next.file_viewers.entry(file_id.clone()).or_default();
            entry.retain(|v| v.user_id != viewer.user_id);
            entry.push(viewer.clone());
        }
        ViewAction::UserStoppedViewing { file_id, user_id } => {
            if let Some(entry) = next.file_viewers.get_mut(file_id) {
                entry.retain(|v| &v.user_id != user_id);
                if entry.is_empty() {
                    next.file_viewers.remove(file_id);
                }
            }
        }
        ViewAction::SetCurrentlyViewing { file_id } => {
            next.currently_viewing = file_id.clone();
        }
        ViewAction::ClearFileViewers { file_id } => {
            next.file_viewers.remove(file_id);
        }
    }
    next
}
