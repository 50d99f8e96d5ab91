//! UI layer: HTTP routes, WebSocket endpoint and shared server state.

pub mod handler;
pub mod state;
