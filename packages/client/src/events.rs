//! イベントリスナーレジストリ
//!
//! アプリケーション側のコールバックをイベント種別ごとに保持し、受信した
//! イベントを登録順に配信する。配信前にリスナー一覧のスナップショットを
//! 取るため、コールバック内からの登録・解除は進行中の配信に影響しない。
//! コールバックのパニックは捕捉して記録し、残りのリスナーへの配信と
//! 受信ループ本体を守る。

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use tsudoi_server::infrastructure::dto::websocket::{IdentityDto, ServerEvent, ViewerDto};

/// クライアントに配信されるイベント
#[derive(Debug, Clone)]
pub enum ClientEvent {
    FileViewersUpdated {
        file_id: String,
        viewers: Vec<ViewerDto>,
    },
    UserStartedViewingFile {
        file_id: String,
        viewer: ViewerDto,
    },
    UserStoppedViewingFile {
        file_id: String,
        user_id: String,
    },
    UserStartedEditing {
        file_id: String,
        user_id: String,
    },
    UserStoppedEditing {
        file_id: String,
        user_id: String,
    },
    FileBeingEdited {
        file_id: String,
        editor_ids: Vec<String>,
    },
    NewFileUploaded {
        file_id: String,
        file_name: String,
        uploaded_by: String,
    },
    ResourceSharedWithYou {
        resource_id: String,
        resource_name: String,
        shared_by: String,
    },
    PermissionUpdated {
        resource_id: String,
        permission: String,
        updated_by: String,
    },
    Notification {
        r#type: String,
        message: String,
        resource_id: Option<String>,
    },
    OnlineUsersUpdated {
        users: Vec<IdentityDto>,
    },
    // 接続ライフサイクル（サーバーイベントではなくクライアント内部で発火）
    Connected,
    /// 切断からの復帰。初回確立の Connected とは区別して発火する
    Reconnected,
    Disconnected,
    Reconnecting {
        attempt: u32,
    },
    ReconnectFailed,
}

impl ClientEvent {
    pub fn class(&self) -> EventClass {
        match self {
            ClientEvent::FileViewersUpdated { .. } => EventClass::FileViewersUpdated,
            ClientEvent::UserStartedViewingFile { .. } => EventClass::UserStartedViewingFile,
            ClientEvent::UserStoppedViewingFile { .. } => EventClass::UserStoppedViewingFile,
            ClientEvent::UserStartedEditing { .. } => EventClass::UserStartedEditing,
            ClientEvent::UserStoppedEditing { .. } => EventClass::UserStoppedEditing,
            ClientEvent::FileBeingEdited { .. } => EventClass::FileBeingEdited,
            ClientEvent::NewFileUploaded { .. } => EventClass::NewFileUploaded,
            ClientEvent::ResourceSharedWithYou { .. } => EventClass::ResourceSharedWithYou,
            ClientEvent::PermissionUpdated { .. } => EventClass::PermissionUpdated,
            ClientEvent::Notification { .. } => EventClass::Notification,
            ClientEvent::OnlineUsersUpdated { .. } => EventClass::OnlineUsersUpdated,
            ClientEvent::Connected => EventClass::Connected,
            ClientEvent::Reconnected => EventClass::Reconnected,
            ClientEvent::Disconnected => EventClass::Disconnected,
            ClientEvent::Reconnecting { .. } => EventClass::Reconnecting,
            ClientEvent::ReconnectFailed => EventClass::ReconnectFailed,
        }
    }
}

impl From<ServerEvent> for ClientEvent {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::FileViewersUpdated { file_id, viewers } => {
                ClientEvent::FileViewersUpdated { file_id, viewers }
            }
            ServerEvent::UserStartedViewingFile { file_id, viewer } => {
                ClientEvent::UserStartedViewingFile { file_id, viewer }
            }
            ServerEvent::UserStoppedViewingFile { file_id, user_id } => {
                ClientEvent::UserStoppedViewingFile { file_id, user_id }
            }
            ServerEvent::UserStartedEditing { file_id, user_id } => {
                ClientEvent::UserStartedEditing { file_id, user_id }
            }
            ServerEvent::UserStoppedEditing { file_id, user_id } => {
                ClientEvent::UserStoppedEditing { file_id, user_id }
            }
            ServerEvent::FileBeingEdited {
                file_id,
                editor_ids,
            } => ClientEvent::FileBeingEdited {
                file_id,
                editor_ids,
            },
            ServerEvent::NewFileUploaded {
                file_id,
                file_name,
                uploaded_by,
            } => ClientEvent::NewFileUploaded {
                file_id,
                file_name,
                uploaded_by,
            },
            ServerEvent::ResourceSharedWithYou {
                resource_id,
                resource_name,
                shared_by,
            } => ClientEvent::ResourceSharedWithYou {
                resource_id,
                resource_name,
                shared_by,
            },
            ServerEvent::PermissionUpdated {
                resource_id,
                permission,
                updated_by,
            } => ClientEvent::PermissionUpdated {
                resource_id,
                permission,
                updated_by,
            },
            ServerEvent::Notification {
                r#type,
                message,
                resource_id,
            } => ClientEvent::Notification {
                r#type,
                message,
                resource_id,
            },
            ServerEvent::OnlineUsersUpdated { users } => ClientEvent::OnlineUsersUpdated { users },
        }
    }
}

/// リスナー登録のキーとなるイベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    FileViewersUpdated,
    UserStartedViewingFile,
    UserStoppedViewingFile,
    UserStartedEditing,
    UserStoppedEditing,
    FileBeingEdited,
    NewFileUploaded,
    ResourceSharedWithYou,
    PermissionUpdated,
    Notification,
    OnlineUsersUpdated,
    Connected,
    Reconnected,
    Disconnected,
    Reconnecting,
    ReconnectFailed,
}

/// `off` で解除に使うリスナー識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: HashMap<EventClass, Vec<(ListenerId, Listener)>>,
}

/// イベント種別ごとのリスナー登録簿
#[derive(Default)]
pub struct EventRegistry {
    inner: Mutex<RegistryInner>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// リスナーを登録し、解除用の識別子を返す
    pub fn on<F>(&self, class: EventClass, listener: F) -> ListenerId
    where
        F: Fn(&ClientEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner
            .listeners
            .entry(class)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// 指定した識別子のリスナーを解除する。未登録の識別子は何もしない。
    pub fn off(&self, class: EventClass, id: ListenerId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(entries) = inner.listeners.get_mut(&class) {
            if let Some(pos) = entries.iter().position(|(entry_id, _)| *entry_id == id) {
                entries.remove(pos);
            }
            if entries.is_empty() {
                inner.listeners.remove(&class);
            }
        }
    }

    /// 登録済みリスナーを登録順に呼び出す。
    ///
    /// ロックを持たずに配信するため、コールバックからの `on` / `off` は
    /// デッドロックしない（反映は次回の emit から）。
    pub fn emit(&self, event: &ClientEvent) {
        let snapshot: Vec<Listener> = {
            let inner = self.inner.lock().unwrap();
            inner
                .listeners
                .get(&event.class())
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };
        for listener in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!("Event listener panicked for {:?}", event.class());
            }
        }
    }

    /// 全リスナーを解除する
    pub fn clear(&self) {
        self.inner.lock().unwrap().listeners.clear();
    }

    /// 指定種別の登録数（テスト・デバッグ用）
    pub fn listener_count(&self, class: EventClass) -> usize {
        self.inner
            .lock()
            .unwrap()
            .listeners
            .get(&class)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_listeners_invoked_in_registration_order() {
        // テスト項目: リスナーは登録順に呼び出される
        // given (前提条件):
        let registry = EventRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.on(EventClass::Connected, move |_| {
                order.lock().unwrap().push(label);
            });
        }

        // when (操作):
        registry.emit(&ClientEvent::Connected);

        // then (期待する結果):
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_emit_only_dispatches_matching_class() {
        // テスト項目: 種別の一致しないリスナーは呼び出されない
        // given (前提条件):
        let registry = EventRegistry::new();
        let connected = Arc::new(AtomicUsize::new(0));
        let disconnected = Arc::new(AtomicUsize::new(0));
        {
            let connected = Arc::clone(&connected);
            registry.on(EventClass::Connected, move |_| {
                connected.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let disconnected = Arc::clone(&disconnected);
            registry.on(EventClass::Disconnected, move |_| {
                disconnected.fetch_add(1, Ordering::SeqCst);
            });
        }

        // when (操作):
        registry.emit(&ClientEvent::Connected);

        // then (期待する結果):
        assert_eq!(connected.load(Ordering::SeqCst), 1);
        assert_eq!(disconnected.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_off_removes_only_target_listener() {
        // テスト項目: off は指定した識別子のリスナーだけを解除する
        // given (前提条件):
        let registry = EventRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = {
            let count = Arc::clone(&count);
            registry.on(EventClass::Connected, move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        {
            let count = Arc::clone(&count);
            registry.on(EventClass::Connected, move |_| {
                count.fetch_add(10, Ordering::SeqCst);
            });
        }

        // when (操作):
        registry.off(EventClass::Connected, id);
        registry.emit(&ClientEvent::Connected);

        // then (期待する結果): 残ったリスナーだけが呼ばれる
        assert_eq!(count.load(Ordering::SeqCst), 10);
        assert_eq!(registry.listener_count(EventClass::Connected), 1);
    }

    #[test]
    fn test_off_with_unknown_id_is_noop() {
        // テスト項目: 未登録の識別子を off しても何も起こらない
        // given (前提条件):
        let registry = EventRegistry::new();
        let id = registry.on(EventClass::Connected, |_| {});

        // when (操作): 別の種別に対して同じ識別子で off する
        registry.off(EventClass::Disconnected, id);

        // then (期待する結果):
        assert_eq!(registry.listener_count(EventClass::Connected), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_dispatch() {
        // テスト項目: リスナーのパニックは後続のリスナー配信を妨げない
        // given (前提条件):
        let registry = EventRegistry::new();
        let reached = Arc::new(AtomicUsize::new(0));
        registry.on(EventClass::Connected, |_| {
            panic!("listener failure");
        });
        {
            let reached = Arc::clone(&reached);
            registry.on(EventClass::Connected, move |_| {
                reached.fetch_add(1, Ordering::SeqCst);
            });
        }

        // when (操作):
        registry.emit(&ClientEvent::Connected);

        // then (期待する結果):
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_during_dispatch_does_not_affect_current_emit() {
        // テスト項目: 配信中の解除は進行中の emit には影響しない
        // given (前提条件): 1つ目のリスナーが2つ目を解除する
        let registry = Arc::new(EventRegistry::new());
        let count = Arc::new(AtomicUsize::new(0));
        let target_id: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));
        {
            let reg = Arc::clone(&registry);
            let target_id = Arc::clone(&target_id);
            registry.on(EventClass::Connected, move |_| {
                if let Some(id) = *target_id.lock().unwrap() {
                    reg.off(EventClass::Connected, id);
                }
            });
        }
        let second_id = {
            let count = Arc::clone(&count);
            registry.on(EventClass::Connected, move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        *target_id.lock().unwrap() = Some(second_id);

        // when (操作):
        registry.emit(&ClientEvent::Connected);

        // then (期待する結果): スナップショット済みのため今回の配信では呼ばれる
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // 次回の emit では解除が反映されている
        registry.emit(&ClientEvent::Connected);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_removes_all_listeners() {
        // テスト項目: clear は全種別のリスナーを解除する
        // given (前提条件):
        let registry = EventRegistry::new();
        registry.on(EventClass::Connected, |_| {});
        registry.on(EventClass::OnlineUsersUpdated, |_| {});

        // when (操作):
        registry.clear();

        // then (期待する結果):
        assert_eq!(registry.listener_count(EventClass::Connected), 0);
        assert_eq!(registry.listener_count(EventClass::OnlineUsersUpdated), 0);
    }
}
