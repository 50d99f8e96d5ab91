//! Handler modules for HTTP and WebSocket endpoints.

pub mod http;
pub mod websocket;

// Re-export HTTP handlers
pub use http::{
    get_online_users, get_presence, health_check, post_file_uploaded, post_permission_updated,
    post_resource_shared,
};

// Re-export WebSocket handlers
pub use websocket::websocket_handler;
