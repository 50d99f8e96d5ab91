//! Server configuration parsed from the command line.

use clap::Parser;

/// Tsudoi presence server
#[derive(Debug, Clone, Parser)]
#[command(name = "tsudoi-server", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Shared secret the handshake verifier checks; the auth service hands
    /// the same secret to clients it has authenticated
    #[arg(long, default_value = "dev-token")]
    pub auth_token: String,

    /// Default log level (overridable with RUST_LOG)
    #[arg(long, default_value = "debug")]
    pub log_level: String,
}

impl ServerConfig {
    /// Socket address string to bind the listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        // テスト項目: 引数なしでデフォルト値が使われる
        // when (操作):
        let config = ServerConfig::parse_from(["tsudoi-server"]);

        // then (期待する結果):
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.auth_token, "dev-token");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_config_overrides() {
        // テスト項目: コマンドライン引数で設定を上書きできる
        // when (操作):
        let config = ServerConfig::parse_from([
            "tsudoi-server",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--auth-token",
            "s3cret",
        ]);

        // then (期待する結果):
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
        assert_eq!(config.auth_token, "s3cret");
    }
}
