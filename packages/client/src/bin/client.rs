use clap::Parser;

use tsudoi_client::{ClientConfig, run_client};
use tsudoi_shared::setup_logger;

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let config = ClientConfig::parse();
    if let Err(e) = run_client(config).await {
        eprintln!("Client error: {e}");
        std::process::exit(1);
    }
}
