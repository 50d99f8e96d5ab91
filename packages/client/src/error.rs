//! クライアントのエラー型

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// サーバーへの WebSocket 接続に失敗した
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// ハンドシェイクがサーバーに拒否された（認証・バリデーション失敗）
    #[error("Handshake rejected: {0}")]
    HandshakeRejected(String),

    /// 切断状態で送信操作が呼ばれた
    #[error("Not connected")]
    NotConnected,

    /// 再接続の試行回数が上限に達した
    #[error("Reconnection permanently failed after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    /// サーバーから受信したメッセージの JSON が不正
    #[error("Invalid server message: {0}")]
    InvalidMessage(#[from] serde_json::Error),
}
