//! Data transfer objects for the HTTP and WebSocket boundaries.

pub mod http;
pub mod websocket;
