//! UseCase 層のエラー定義

use thiserror::Error;

/// 接続受け入れ時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// 同じ接続 ID が既に登録されている
    #[error("Connection '{0}' is already registered")]
    DuplicateConnection(String),
}

/// 切断処理のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DisconnectError {
    /// レジストリに存在しない接続
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),
}

/// presence を変更するアクション（start/stop viewing, editing）のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresenceActionError {
    /// ハンドシェイク済みの接続が見つからない（プロトコル違反）
    #[error("Connection '{0}' is not registered")]
    ConnectionNotFound(String),
}
