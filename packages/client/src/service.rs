//! リアルタイム同期サービス
//!
//! WebSocket 接続の確立・維持・再接続と、受信イベントのビュー状態への
//! 反映、リスナーへの配信をまとめて担う。接続の実体は世代番号つきの
//! ドライバタスクで、再接続や明示的な切断で世代が進むと古いドライバは
//! 自然に終了する。

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

use tsudoi_server::infrastructure::dto::websocket::{ClientAction, ServerEvent};

use crate::error::ClientError;
use crate::events::{ClientEvent, EventClass, EventRegistry, ListenerId};
use crate::reconnect::{ConnectionPhase, ReconnectDecision, ReconnectManager, RetryPolicy};
use crate::reducer::{ViewAction, ViewState, reduce};

/// ハンドシェイクで名乗るユーザー情報
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
}

/// サービスの接続設定
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// `ws://host:port` 形式のサーバー URL
    pub url: String,
    /// 共有シークレット
    pub token: String,
    pub identity: ClientIdentity,
    pub retry: RetryPolicy,
}

/// プレゼンス同期クライアントの本体
pub struct RealtimeService {
    config: ServiceConfig,
    registry: EventRegistry,
    reconnect: ReconnectManager,
    view_state: Mutex<ViewState>,
    /// join-collaboration 済みのリソース。再接続時に再購読する。
    subscriptions: Mutex<HashSet<String>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    generation: watch::Sender<u64>,
}

impl RealtimeService {
    pub fn new(config: ServiceConfig) -> Arc<Self> {
        let reconnect = ReconnectManager::new(config.retry.clone());
        let (generation, _) = watch::channel(0);
        Arc::new(Self {
            config,
            registry: EventRegistry::new(),
            reconnect,
            view_state: Mutex::new(ViewState::default()),
            subscriptions: Mutex::new(HashSet::new()),
            outbound: Mutex::new(None),
            generation,
        })
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.reconnect.phase()
    }

    /// 現在のビュー状態のスナップショット
    pub fn view_state(&self) -> ViewState {
        self.view_state.lock().unwrap().clone()
    }

    pub fn on<F>(&self, class: EventClass, listener: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        self.registry.on(class, listener)
    }

    pub fn off(&self, class: EventClass, id: ListenerId) {
        self.registry.off(class, id)
    }

    /// サーバーへ接続する。最初の接続確立（または恒久的な失敗）まで待つ。
    ///
    /// すでに接続中・試行中の場合は何もせず成功を返す。
    pub async fn connect(self: &Arc<Self>) -> Result<(), ClientError> {
        if !self.reconnect.begin_connect() {
            return Ok(());
        }
        let generation = self.bump_generation();
        let (ready_tx, ready_rx) = oneshot::channel();
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.drive(generation, Some(ready_tx)).await;
        });
        ready_rx
            .await
            .map_err(|_| ClientError::ConnectionFailed("driver task ended".to_string()))?
    }

    /// 明示的に切断する。リスナーとビュー状態のキャッシュは破棄される。
    pub fn disconnect(&self) {
        self.reconnect.mark_disconnected();
        self.bump_generation();
        self.outbound.lock().unwrap().take();
        self.registry.clear();
        self.subscriptions.lock().unwrap().clear();
        let mut state = self.view_state.lock().unwrap();
        *state = ViewState::default();
    }

    /// 手動の再接続。リスナーと購読は保持し、再試行カウンタだけ戻す。
    pub fn force_reconnect(self: &Arc<Self>) {
        self.reconnect.force_reconnect();
        let generation = self.bump_generation();
        self.outbound.lock().unwrap().take();
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.drive(generation, None).await;
        });
    }

    pub fn start_viewing(&self, file_id: &str) -> Result<(), ClientError> {
        self.send_action(&ClientAction::StartViewingFile {
            file_id: file_id.to_string(),
        })?;
        // 離脱したファイルの更新はもう届かないので、キャッシュを無効化する
        let previous = self.view_state.lock().unwrap().currently_viewing.clone();
        if let Some(previous) = previous.filter(|p| p != file_id) {
            self.apply(&ViewAction::ClearFileViewers { file_id: previous });
        }
        self.apply(&ViewAction::SetCurrentlyViewing {
            file_id: Some(file_id.to_string()),
        });
        Ok(())
    }

    pub fn stop_viewing(&self, file_id: &str) -> Result<(), ClientError> {
        self.send_action(&ClientAction::StopViewingFile {
            file_id: file_id.to_string(),
        })?;
        self.apply(&ViewAction::ClearFileViewers {
            file_id: file_id.to_string(),
        });
        let mut state = self.view_state.lock().unwrap();
        if state.currently_viewing.as_deref() == Some(file_id) {
            *state = reduce(&state, &ViewAction::SetCurrentlyViewing { file_id: None });
        }
        Ok(())
    }

    pub fn start_editing(&self, file_id: &str) -> Result<(), ClientError> {
        self.send_action(&ClientAction::StartEditingFile {
            file_id: file_id.to_string(),
        })
    }

    pub fn stop_editing(&self, file_id: &str) -> Result<(), ClientError> {
        self.send_action(&ClientAction::StopEditingFile {
            file_id: file_id.to_string(),
        })
    }

    pub fn join_collaboration(&self, resource_id: &str) -> Result<(), ClientError> {
        self.send_action(&ClientAction::JoinCollaboration {
            resource_id: resource_id.to_string(),
        })?;
        self.subscriptions
            .lock()
            .unwrap()
            .insert(resource_id.to_string());
        Ok(())
    }

    pub fn leave_collaboration(&self, resource_id: &str) -> Result<(), ClientError> {
        self.send_action(&ClientAction::LeaveCollaboration {
            resource_id: resource_id.to_string(),
        })?;
        self.subscriptions.lock().unwrap().remove(resource_id);
        Ok(())
    }

    pub fn send_notification(
        &self,
        target_user_id: &str,
        r#type: &str,
        message: &str,
        resource_id: Option<String>,
    ) -> Result<(), ClientError> {
        self.send_action(&ClientAction::SendNotification {
            target_user_id: target_user_id.to_string(),
            r#type: r#type.to_string(),
            message: message.to_string(),
            resource_id,
        })
    }

    pub fn get_online_users(&self) -> Result<(), ClientError> {
        self.send_action(&ClientAction::GetOnlineUsers)
    }

    fn bump_generation(&self) -> u64 {
        let mut next = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            next = *g;
        });
        next
    }

    fn apply(&self, action: &ViewAction) {
        let mut state = self.view_state.lock().unwrap();
        *state = reduce(&state, action);
    }

    /// 任意のアクションを送信する。切断中は警告ログとともに破棄される。
    pub fn send_action(&self, action: &ClientAction) -> Result<(), ClientError> {
        let payload = serde_json::to_string(action)?;
        let outbound = self.outbound.lock().unwrap();
        match outbound.as_ref() {
            Some(sender) if sender.send(payload).is_ok() => Ok(()),
            _ => {
                tracing::warn!("Dropped outbound action while disconnected: {:?}", action);
                Err(ClientError::NotConnected)
            }
        }
    }

    fn handshake_url(&self) -> String {
        format!(
            "{}/ws?token={}&user_id={}&user_name={}&user_email={}",
            self.config.url,
            self.config.token,
            self.config.identity.user_id,
            self.config.identity.user_name,
            self.config.identity.user_email,
        )
    }

    /// 接続ドライバ。世代が進むまで、接続→受信→再接続判断を繰り返す。
    async fn drive(self: Arc<Self>, generation: u64, mut ready: Option<oneshot::Sender<Result<(), ClientError>>>) {
        let mut generation_rx = self.generation.subscribe();
        loop {
            if *generation_rx.borrow() != generation {
                return;
            }
            match connect_async(self.handshake_url()).await {
                Ok((socket, _)) => {
                    // 接続確立中に disconnect / force_reconnect で世代が進んで
                    // いたら、このセッションは成立させない（フェーズも汚さない）
                    if *generation_rx.borrow() != generation {
                        return;
                    }
                    let (tx, rx) = mpsc::unbounded_channel::<String>();
                    *self.outbound.lock().unwrap() = Some(tx);
                    let was_reconnecting =
                        self.reconnect.phase() == ConnectionPhase::Reconnecting;
                    self.reconnect.mark_connected();
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Ok(()));
                    }
                    if was_reconnecting {
                        self.registry.emit(&ClientEvent::Reconnected);
                    } else {
                        self.registry.emit(&ClientEvent::Connected);
                    }
                    self.resync();
                    self.run_session(socket, rx, generation, &mut generation_rx)
                        .await;
                    self.outbound.lock().unwrap().take();
                    if *generation_rx.borrow() != generation {
                        return;
                    }
                    self.registry.emit(&ClientEvent::Disconnected);
                }
                Err(tungstenite::Error::Http(response)) => {
                    if *generation_rx.borrow() != generation {
                        return;
                    }
                    // 認証・バリデーション拒否。再試行しても結果は変わらない。
                    let status = response.status();
                    tracing::error!("Handshake rejected: {status}");
                    self.reconnect.fail_permanently();
                    if let Some(tx) = ready.take() {
                        let _ = tx.send(Err(ClientError::HandshakeRejected(status.to_string())));
                    }
                    self.registry.emit(&ClientEvent::ReconnectFailed);
                    return;
                }
                Err(e) => {
                    tracing::warn!("Connection attempt failed: {e}");
                }
            }
            if *generation_rx.borrow() != generation {
                return;
            }
            match self.reconnect.connection_lost() {
                ReconnectDecision::Retry { attempt, delay } => {
                    self.registry.emit(&ClientEvent::Reconnecting { attempt });
                    tokio::time::sleep(delay).await;
                }
                ReconnectDecision::GiveUp => {
                    if self.reconnect.phase() == ConnectionPhase::PermanentlyFailed {
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Err(ClientError::ReconnectExhausted {
                                attempts: self.config.retry.max_attempts,
                            }));
                        }
                        self.registry.emit(&ClientEvent::ReconnectFailed);
                    }
                    return;
                }
            }
        }
    }

    /// 確立済みソケット上の送受信。切断か世代交代で戻る。
    async fn run_session(
        &self,
        socket: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        mut rx: mpsc::UnboundedReceiver<String>,
        generation: u64,
        generation_rx: &mut watch::Receiver<u64>,
    ) {
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => self.handle_server_message(&text),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket read error: {e}");
                        break;
                    }
                },
                outgoing = rx.recv() => match outgoing {
                    Some(payload) => {
                        if sink.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                result = generation_rx.changed() => {
                    if result.is_err() || *generation_rx.borrow() != generation {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    /// 再接続直後の復元。オンライン一覧の取り直し、閲覧中ファイルの
    /// 再宣言、購読の再登録を行う。
    fn resync(&self) {
        let _ = self.get_online_users();
        let current = self.view_state.lock().unwrap().currently_viewing.clone();
        if let Some(file_id) = current {
            let _ = self.send_action(&ClientAction::StartViewingFile { file_id });
        }
        let subscriptions: Vec<String> = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .collect();
        for resource_id in subscriptions {
            let _ = self.send_action(&ClientAction::JoinCollaboration { resource_id });
        }
    }

    fn handle_server_message(&self, text: &str) {
        let event: ServerEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Ignoring malformed server message: {e}");
                return;
            }
        };
        match &event {
            ServerEvent::FileViewersUpdated { file_id, viewers } => {
                self.apply(&ViewAction::SetFileViewers {
                    file_id: file_id.clone(),
                    viewers: viewers.clone(),
                });
            }
            ServerEvent::UserStartedViewingFile { file_id, viewer } => {
                self.apply(&ViewAction::UserStartedViewing {
                    file_id: file_id.clone(),
                    viewer: viewer.clone(),
                });
            }
            ServerEvent::UserStoppedViewingFile { file_id, user_id } => {
                self.apply(&ViewAction::UserStoppedViewing {
                    file_id: file_id.clone(),
                    user_id: user_id.clone(),
                });
            }
            _ => {}
        }
        self.registry.emit(&ClientEvent::from(event));
    }
}
