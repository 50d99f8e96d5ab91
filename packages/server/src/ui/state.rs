//! Server state and connection management.

use serde::Deserialize;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::{Mutex, mpsc};

use crate::{
    auth::TokenVerifier,
    domain::{Identity, PresenceRepository},
};

/// Query parameters for the WebSocket handshake.
///
/// The identity fields are supplied by the authentication collaborator; the
/// bearer token is checked before the upgrade is accepted.
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
}

/// Client connection information
#[derive(Debug, Clone)]
pub struct ClientInfo {
    /// Message sender channel
    pub sender: mpsc::UnboundedSender<String>,
    /// Identity bound at handshake
    pub identity: Identity,
    /// Unix timestamp when connected (in JST, milliseconds)
    pub connected_at: i64,
}

/// Shared application state
pub struct AppState {
    /// Repository（データアクセス層の抽象化）
    pub repository: Arc<dyn PresenceRepository>,
    /// Bearer token verifier for the handshake
    pub verifier: Arc<dyn TokenVerifier>,
    /// Per-resource subscriber sets (connection ids joined via
    /// join-collaboration), independent of the viewer sets
    pub subscriptions: Mutex<HashMap<String, HashSet<String>>>,
}

impl AppState {
    /// Create a new state over a repository and a token verifier
    pub fn new(repository: Arc<dyn PresenceRepository>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            repository,
            verifier,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Add a connection to a resource's subscriber set
    pub async fn subscribe(&self, resource_id: &str, connection_id: &str) {
        let mut subs = self.subscriptions.lock().await;
        subs.entry(resource_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    /// Remove a connection from a resource's subscriber set
    pub async fn unsubscribe(&self, resource_id: &str, connection_id: &str) {
        let mut subs = self.subscriptions.lock().await;
        if let Some(set) = subs.get_mut(resource_id) {
            set.remove(connection_id);
            if set.is_empty() {
                subs.remove(resource_id);
            }
        }
    }

    /// Remove a connection from every subscriber set (on disconnect)
    pub async fn unsubscribe_all(&self, connection_id: &str) {
        let mut subs = self.subscriptions.lock().await;
        subs.retain(|_, set| {
            set.remove(connection_id);
            !set.is_empty()
        });
    }

    /// Snapshot of a resource's subscriber connection ids
    pub async fn subscribers_of(&self, resource_id: &str) -> HashSet<String> {
        let subs = self.subscriptions.lock().await;
        subs.get(resource_id).cloned().unwrap_or_default()
    }
}
