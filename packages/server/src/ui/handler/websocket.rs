//! WebSocket connection handlers.
//!
//! Server half of the event router: the handshake binds an identity and a
//! fresh connection id to the socket, inbound actions are dispatched to the
//! use case layer, and resulting events are fanned out to the connections
//! interested in the affected file.

use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{
        ConnectionId, ConnectionIdFactory, Email, FileId, Identity, UserId, UserName, ViewerEntry,
    },
    infrastructure::dto::websocket::{ClientAction, IdentityDto, ServerEvent, ViewerDto},
    ui::state::{AppState, ClientInfo, ConnectQuery},
    usecase::{
        ConnectClientUseCase, ConnectError, DisconnectClientUseCase, EditingUseCase,
        NotifyUserUseCase, OnlineUsersUseCase, StartViewingUseCase, StopViewingUseCase,
    },
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Reject the handshake before any presence action is accepted
    if let Err(e) = state.verifier.verify(&query.token) {
        tracing::warn!("Handshake rejected for user '{}': {}", query.user_id, e);
        return Err(StatusCode::UNAUTHORIZED);
    }

    // Convert String -> Identity (Domain Model)
    let identity = match build_identity(&query) {
        Ok(identity) => identity,
        Err(_) => {
            tracing::warn!("Invalid identity fields for user '{}'", query.user_id);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    let connection_id = match ConnectionIdFactory::generate() {
        Ok(id) => id,
        Err(_) => return Err(StatusCode::INTERNAL_SERVER_ERROR),
    };

    // Create a channel for this client to receive messages
    let (tx, rx) = mpsc::unbounded_channel();

    // Use ConnectClientUseCase to handle connection
    let connect_usecase = ConnectClientUseCase::new(state.repository.clone());

    match connect_usecase
        .execute(connection_id.clone(), identity, tx)
        .await
    {
        Ok(online_users) => {
            tracing::info!(
                "User '{}' connected with connection '{}'",
                query.user_id,
                connection_id
            );
            // Everyone (including the new connection, whose channel is
            // already registered) sees the updated online list
            broadcast_all(&state, &online_users_event(&online_users)).await;
            Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id, rx)))
        }
        Err(ConnectError::DuplicateConnection(id)) => {
            tracing::warn!("Connection id collision for '{}'. Rejecting connection.", id);
            Err(StatusCode::CONFLICT)
        }
    }
}

fn build_identity(query: &ConnectQuery) -> Result<Identity, crate::domain::ValueObjectError> {
    Ok(Identity::new(
        UserId::new(query.user_id.clone())?,
        UserName::new(query.user_name.clone())?,
        Email::new(query.user_email.clone())?,
    ))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    connection_id: ConnectionId,
    mut rx: mpsc::UnboundedReceiver<String>,
) {
    let (mut sender, mut receiver) = socket.split();

    let connection_id_clone = connection_id.clone();
    let state_clone = state.clone();

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(async move {
        // Single currently-viewed file per connection; start-viewing on a
        // different file always pairs a stop on this one first
        let mut current_file: Option<FileId> = None;

        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received action frame: {}", text);

                    // Protocol failure: reject the frame without mutating
                    // presence state or emitting any broadcast
                    let action = match serde_json::from_str::<ClientAction>(&text) {
                        Ok(action) => action,
                        Err(e) => {
                            tracing::warn!("Failed to parse action as JSON: {}", e);
                            continue;
                        }
                    };

                    dispatch_action(
                        &state_clone,
                        &connection_id_clone,
                        &mut current_file,
                        action,
                    )
                    .await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection '{}' requested close", connection_id_clone);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to receive messages from other clients and send to this client
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            // Send the message to this client
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Use DisconnectClientUseCase to handle disconnection; the sweep
    // guarantees presence never shows a viewer whose connection has died,
    // even when no explicit stop message was sent
    let disconnect_usecase = DisconnectClientUseCase::new(state.repository.clone());

    match disconnect_usecase.execute(&connection_id).await {
        Ok(outcome) => {
            tracing::info!(
                "Connection '{}' disconnected and removed from registry",
                connection_id
            );

            for (file_id, viewers) in &outcome.sweep.viewer_updates {
                broadcast_presence(&state, file_id, viewers, &viewers_updated_event(file_id, viewers))
                    .await;
            }
            for (file_id, user_id) in &outcome.sweep.editing_stopped {
                let event = ServerEvent::UserStoppedEditing {
                    file_id: file_id.as_str().to_string(),
                    user_id: user_id.as_str().to_string(),
                };
                let viewers = state.repository.viewers_of(file_id).await;
                broadcast_presence(&state, file_id, &viewers, &event).await;
            }

            broadcast_all(&state, &online_users_event(&outcome.online_users)).await;
        }
        Err(_) => {
            tracing::warn!("Failed to disconnect connection '{}'", connection_id);
        }
    }

    state.unsubscribe_all(connection_id.as_str()).await;
}

/// Dispatch one inbound action to its use case and broadcast the results.
async fn dispatch_action(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    current_file: &mut Option<FileId>,
    action: ClientAction,
) {
    match action {
        ClientAction::StartViewingFile { file_id } => {
            let Ok(file_id) = FileId::new(file_id) else {
                tracing::warn!("Invalid fileId in start-viewing-file");
                return;
            };
            let usecase = StartViewingUseCase::new(state.repository.clone());
            match usecase
                .execute(connection_id, file_id.clone(), current_file.clone())
                .await
            {
                Ok(outcome) => {
                    // The stop on the previous file broadcasts first, so no
                    // observer ever sees the user in both viewer sets
                    if let Some((prev_file, prev_viewers)) = &outcome.stopped {
                        broadcast_presence(
                            state,
                            prev_file,
                            prev_viewers,
                            &viewers_updated_event(prev_file, prev_viewers),
                        )
                        .await;
                        let stopped_event = ServerEvent::UserStoppedViewingFile {
                            file_id: prev_file.as_str().to_string(),
                            user_id: outcome.entry.user_id().as_str().to_string(),
                        };
                        broadcast_presence_except(
                            state,
                            prev_file,
                            prev_viewers,
                            connection_id,
                            &stopped_event,
                        )
                        .await;
                    }

                    broadcast_presence(
                        state,
                        &file_id,
                        &outcome.viewers,
                        &viewers_updated_event(&file_id, &outcome.viewers),
                    )
                    .await;
                    let started_event = ServerEvent::UserStartedViewingFile {
                        file_id: file_id.as_str().to_string(),
                        viewer: ViewerDto::from(&outcome.entry),
                    };
                    broadcast_presence_except(
                        state,
                        &file_id,
                        &outcome.viewers,
                        connection_id,
                        &started_event,
                    )
                    .await;

                    // Tell the newcomer about in-flight editing sessions
                    if !outcome.editors.is_empty() {
                        let event = ServerEvent::FileBeingEdited {
                            file_id: file_id.as_str().to_string(),
                            editor_ids: outcome
                                .editors
                                .iter()
                                .map(|id| id.as_str().to_string())
                                .collect(),
                        };
                        send_to_connection(state, connection_id, &event).await;
                    }

                    *current_file = Some(file_id);
                }
                Err(e) => {
                    tracing::warn!("start-viewing-file rejected: {}", e);
                }
            }
        }
        ClientAction::StopViewingFile { file_id } => {
            let Ok(file_id) = FileId::new(file_id) else {
                tracing::warn!("Invalid fileId in stop-viewing-file");
                return;
            };
            let usecase = StopViewingUseCase::new(state.repository.clone());
            match usecase.execute(connection_id, &file_id).await {
                Ok(outcome) => {
                    broadcast_presence(
                        state,
                        &file_id,
                        &outcome.viewers,
                        &viewers_updated_event(&file_id, &outcome.viewers),
                    )
                    .await;
                    let stopped_event = ServerEvent::UserStoppedViewingFile {
                        file_id: file_id.as_str().to_string(),
                        user_id: outcome.user_id.as_str().to_string(),
                    };
                    broadcast_presence_except(
                        state,
                        &file_id,
                        &outcome.viewers,
                        connection_id,
                        &stopped_event,
                    )
                    .await;

                    if current_file.as_ref() == Some(&file_id) {
                        *current_file = None;
                    }
                }
                Err(e) => {
                    tracing::warn!("stop-viewing-file rejected: {}", e);
                }
            }
        }
        ClientAction::StartEditingFile { file_id } => {
            let Ok(file_id) = FileId::new(file_id) else {
                tracing::warn!("Invalid fileId in start-editing-file");
                return;
            };
            let usecase = EditingUseCase::new(state.repository.clone());
            match usecase.start(connection_id, file_id.clone()).await {
                Ok(outcome) => {
                    let event = ServerEvent::UserStartedEditing {
                        file_id: file_id.as_str().to_string(),
                        user_id: outcome.user_id.as_str().to_string(),
                    };
                    let viewers = state.repository.viewers_of(&file_id).await;
                    broadcast_presence_except(state, &file_id, &viewers, connection_id, &event)
                        .await;
                }
                Err(e) => {
                    tracing::warn!("start-editing-file rejected: {}", e);
                }
            }
        }
        ClientAction::StopEditingFile { file_id } => {
            let Ok(file_id) = FileId::new(file_id) else {
                tracing::warn!("Invalid fileId in stop-editing-file");
                return;
            };
            let usecase = EditingUseCase::new(state.repository.clone());
            match usecase.stop(connection_id, &file_id).await {
                Ok(outcome) => {
                    let event = ServerEvent::UserStoppedEditing {
                        file_id: file_id.as_str().to_string(),
                        user_id: outcome.user_id.as_str().to_string(),
                    };
                    let viewers = state.repository.viewers_of(&file_id).await;
                    broadcast_presence_except(state, &file_id, &viewers, connection_id, &event)
                        .await;
                }
                Err(e) => {
                    tracing::warn!("stop-editing-file rejected: {}", e);
                }
            }
        }
        ClientAction::JoinCollaboration { resource_id } => {
            state.subscribe(&resource_id, connection_id.as_str()).await;
            tracing::info!(
                "Connection '{}' joined collaboration on '{}'",
                connection_id,
                resource_id
            );
            // Reply with the current snapshot so a (re)joining client can
            // rebuild its cache without waiting for the next mutation
            if let Ok(file_id) = FileId::new(resource_id) {
                let viewers = state.repository.viewers_of(&file_id).await;
                send_to_connection(state, connection_id, &viewers_updated_event(&file_id, &viewers))
                    .await;
            }
        }
        ClientAction::LeaveCollaboration { resource_id } => {
            state.unsubscribe(&resource_id, connection_id.as_str()).await;
            tracing::info!(
                "Connection '{}' left collaboration on '{}'",
                connection_id,
                resource_id
            );
        }
        ClientAction::SendNotification {
            target_user_id,
            r#type,
            message,
            resource_id,
        } => {
            let Ok(target_user_id) = UserId::new(target_user_id) else {
                tracing::warn!("Invalid targetUserId in send-notification");
                return;
            };
            let usecase = NotifyUserUseCase::new(state.repository.clone());
            let targets = usecase.execute(&target_user_id).await;
            let event = ServerEvent::Notification {
                r#type,
                message,
                resource_id,
            };
            let json = serde_json::to_string(&event).unwrap();
            for (target_conn, info) in targets {
                if info.sender.send(json.clone()).is_err() {
                    tracing::warn!("Failed to relay notification to '{}'", target_conn);
                }
            }
        }
        ClientAction::GetOnlineUsers => {
            let usecase = OnlineUsersUseCase::new(state.repository.clone());
            let users = usecase.execute().await;
            send_to_connection(state, connection_id, &online_users_event(&users)).await;
        }
    }
}

fn viewers_updated_event(file_id: &FileId, viewers: &[ViewerEntry]) -> ServerEvent {
    ServerEvent::FileViewersUpdated {
        file_id: file_id.as_str().to_string(),
        viewers: viewers.iter().map(ViewerDto::from).collect(),
    }
}

fn online_users_event(users: &[Identity]) -> ServerEvent {
    ServerEvent::OnlineUsersUpdated {
        users: users.iter().map(IdentityDto::from).collect(),
    }
}

/// Connections interested in a file: its current viewers plus the
/// connections subscribed via join-collaboration.
async fn presence_targets(
    state: &Arc<AppState>,
    file_id: &FileId,
    viewers: &[ViewerEntry],
) -> HashSet<String> {
    let mut targets = state.subscribers_of(file_id.as_str()).await;
    for viewer in viewers {
        targets.insert(viewer.connection_id.as_str().to_string());
    }
    targets
}

/// Broadcast a presence event for a file to every interested connection.
pub(crate) async fn broadcast_presence(
    state: &Arc<AppState>,
    file_id: &FileId,
    viewers: &[ViewerEntry],
    event: &ServerEvent,
) {
    let targets = presence_targets(state, file_id, viewers).await;
    send_to_targets(state, &targets, event).await;
}

/// Same as [`broadcast_presence`] but without echoing to the acting connection.
async fn broadcast_presence_except(
    state: &Arc<AppState>,
    file_id: &FileId,
    viewers: &[ViewerEntry],
    except: &ConnectionId,
    event: &ServerEvent,
) {
    let mut targets = presence_targets(state, file_id, viewers).await;
    targets.remove(except.as_str());
    send_to_targets(state, &targets, event).await;
}

async fn send_to_targets(state: &Arc<AppState>, targets: &HashSet<String>, event: &ServerEvent) {
    if targets.is_empty() {
        return;
    }
    let json = serde_json::to_string(event).unwrap();
    // Fire-and-forget: a dead receiver is logged, never blocks the mutation path
    for (conn_id, info) in state.repository.all_connections().await {
        if targets.contains(conn_id.as_str()) && info.sender.send(json.clone()).is_err() {
            tracing::warn!("Failed to send event to connection '{}'", conn_id);
        }
    }
}

/// Broadcast a global event to every connected client.
pub(crate) async fn broadcast_all(state: &Arc<AppState>, event: &ServerEvent) {
    let json = serde_json::to_string(event).unwrap();
    for (conn_id, info) in state.repository.all_connections().await {
        if info.sender.send(json.clone()).is_err() {
            tracing::warn!("Failed to send event to connection '{}'", conn_id);
        }
    }
}

/// Send an event to one connection.
pub(crate) async fn send_to_connection(
    state: &Arc<AppState>,
    connection_id: &ConnectionId,
    event: &ServerEvent,
) {
    let json = serde_json::to_string(event).unwrap();
    match state.repository.get_client_info(connection_id).await {
        Ok(info) => {
            if info.sender.send(json).is_err() {
                tracing::warn!("Failed to send event to connection '{}'", connection_id);
            }
        }
        Err(_) => {
            tracing::warn!("Connection '{}' vanished before send", connection_id);
        }
    }
}
