//! クライアントの CLI 設定

use clap::Parser;

/// Tsudoi presence client
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct ClientConfig {
    /// Server WebSocket URL
    #[arg(long, default_value = "ws://127.0.0.1:8080")]
    pub url: String,

    /// Shared secret for the handshake
    #[arg(long, default_value = "dev-token")]
    pub token: String,

    /// User ID to announce
    #[arg(long)]
    pub user_id: String,

    /// Display name to announce
    #[arg(long)]
    pub user_name: String,

    /// Email address to announce
    #[arg(long)]
    pub user_email: String,
}
