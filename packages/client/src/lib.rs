//! Tsudoi の CLI プレゼンスクライアント
//!
//! WebSocket でプレゼンスサーバーに接続し、閲覧・編集の宣言と
//! イベントの購読を対話的に行う。

pub mod config;
pub mod error;
pub mod events;
pub mod reconnect;
pub mod reducer;
pub mod service;

use std::sync::Arc;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

pub use config::ClientConfig;
use error::ClientError;
use events::{ClientEvent, EventClass};
use reconnect::RetryPolicy;
use service::{ClientIdentity, RealtimeService, ServiceConfig};

/// 受信イベントをコンソールに表示する
fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::FileViewersUpdated { file_id, viewers } => {
            let names: Vec<&str> = viewers.iter().map(|v| v.name.as_str()).collect();
            println!("[presence] {file_id} viewers: {names:?}");
        }
        ClientEvent::UserStartedViewingFile { file_id, viewer } => {
            println!("[presence] {} started viewing {file_id}", viewer.name);
        }
        ClientEvent::UserStoppedViewingFile { file_id, user_id } => {
            println!("[presence] {user_id} stopped viewing {file_id}");
        }
        ClientEvent::UserStartedEditing { file_id, user_id } => {
            println!("[presence] {user_id} started editing {file_id}");
        }
        ClientEvent::UserStoppedEditing { file_id, user_id } => {
            println!("[presence] {user_id} stopped editing {file_id}");
        }
        ClientEvent::FileBeingEdited {
            file_id,
            editor_ids,
        } => {
            println!("[presence] {file_id} is being edited by {editor_ids:?}");
        }
        ClientEvent::NewFileUploaded {
            file_name,
            uploaded_by,
            ..
        } => {
            println!("[event] {uploaded_by} uploaded {file_name}");
        }
        ClientEvent::ResourceSharedWithYou {
            resource_name,
            shared_by,
            ..
        } => {
            println!("[event] {shared_by} shared {resource_name} with you");
        }
        ClientEvent::PermissionUpdated {
            resource_id,
            permission,
            updated_by,
        } => {
            println!("[event] {updated_by} set your permission on {resource_id} to {permission}");
        }
        ClientEvent::Notification {
            r#type: kind,
            message,
            ..
        } => {
            println!("[notification] ({kind}) {message}");
        }
        ClientEvent::OnlineUsersUpdated { users } => {
            let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
            println!("[online] {names:?}");
        }
        ClientEvent::Connected => println!("[system] connected"),
        ClientEvent::Reconnected => println!("[system] reconnected"),
        ClientEvent::Disconnected => println!("[system] connection lost, reconnecting..."),
        ClientEvent::Reconnecting { attempt } => {
            println!("[system] reconnect attempt {attempt}");
        }
        ClientEvent::ReconnectFailed => {
            println!("[system] reconnection failed, use /reconnect to retry");
        }
    }
}

const EVENT_CLASSES: [EventClass; 16] = [
    EventClass::FileViewersUpdated,
    EventClass::UserStartedViewingFile,
    EventClass::UserStoppedViewingFile,
    EventClass::UserStartedEditing,
    EventClass::UserStoppedEditing,
    EventClass::FileBeingEdited,
    EventClass::NewFileUploaded,
    EventClass::ResourceSharedWithYou,
    EventClass::PermissionUpdated,
    EventClass::Notification,
    EventClass::OnlineUsersUpdated,
    EventClass::Connected,
    EventClass::Reconnected,
    EventClass::Disconnected,
    EventClass::Reconnecting,
    EventClass::ReconnectFailed,
];

fn register_printers(service: &RealtimeService) {
    for class in EVENT_CLASSES {
        service.on(class, print_event);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /view <file_id>                 Start viewing a file");
    println!("  /stop <file_id>                 Stop viewing a file");
    println!("  /edit <file_id>                 Start editing a file");
    println!("  /done <file_id>                 Stop editing a file");
    println!("  /join <resource_id>             Subscribe to a resource's presence");
    println!("  /leave <resource_id>            Unsubscribe from a resource");
    println!("  /notify <user_id> <message...>  Send a direct notification");
    println!("  /online                         Request the online user list");
    println!("  /state                          Show the local view state");
    println!("  /reconnect                      Force a reconnection attempt");
    println!("  /help                           Show this help");
    println!("  /quit                           Exit");
}

fn report(result: Result<(), ClientError>) {
    if let Err(e) = result {
        println!("[error] {e}");
    }
}

/// コマンド1行を処理する。false を返したら REPL を終了する。
fn handle_command(service: &Arc<RealtimeService>, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    match command {
        "/view" => match parts.next() {
            Some(file_id) => report(service.start_viewing(file_id)),
            None => println!("Usage: /view <file_id>"),
        },
        "/stop" => match parts.next() {
            Some(file_id) => report(service.stop_viewing(file_id)),
            None => println!("Usage: /stop <file_id>"),
        },
        "/edit" => match parts.next() {
            Some(file_id) => report(service.start_editing(file_id)),
            None => println!("Usage: /edit <file_id>"),
        },
        "/done" => match parts.next() {
            Some(file_id) => report(service.stop_editing(file_id)),
            None => println!("Usage: /done <file_id>"),
        },
        "/join" => match parts.next() {
            Some(resource_id) => report(service.join_collaboration(resource_id)),
            None => println!("Usage: /join <resource_id>"),
        },
        "/leave" => match parts.next() {
            Some(resource_id) => report(service.leave_collaboration(resource_id)),
            None => println!("Usage: /leave <resource_id>"),
        },
        "/notify" => {
            let target = parts.next();
            let message: Vec<&str> = parts.collect();
            match target {
                Some(user_id) if !message.is_empty() => report(service.send_notification(
                    user_id,
                    "direct",
                    &message.join(" "),
                    None,
                )),
                _ => println!("Usage: /notify <user_id> <message...>"),
            }
        }
        "/online" => report(service.get_online_users()),
        "/state" => {
            let state = service.view_state();
            println!("currently viewing: {:?}", state.currently_viewing);
            for (file_id, viewers) in &state.file_viewers {
                let names: Vec<&str> = viewers.iter().map(|v| v.name.as_str()).collect();
                println!("  {file_id}: {names:?}");
            }
        }
        "/reconnect" => {
            service.force_reconnect();
            println!("[system] reconnecting...");
        }
        "/help" => print_help(),
        "/quit" | "/exit" => return false,
        _ => println!("Unknown command: {command} (try /help)"),
    }
    true
}

/// REPL を起動し、終了まで回す
pub async fn run_client(config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = RealtimeService::new(ServiceConfig {
        url: config.url.clone(),
        token: config.token.clone(),
        identity: ClientIdentity {
            user_id: config.user_id.clone(),
            user_name: config.user_name.clone(),
            user_email: config.user_email.clone(),
        },
        retry: RetryPolicy::default(),
    });
    register_printers(&service);

    println!("Connecting to {}...", config.url);
    service.connect().await?;
    print_help();

    let mut rl = DefaultEditor::new()?;
    loop {
        let (editor, readline) =
            tokio::task::spawn_blocking(move || {
                let result = rl.readline("> ");
                (rl, result)
            })
            .await?;
        rl = editor;
        match readline {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                if !handle_command(&service, &line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                println!("[error] {e}");
                break;
            }
        }
    }

    service.disconnect();
    println!("Bye.");
    Ok(())
}
