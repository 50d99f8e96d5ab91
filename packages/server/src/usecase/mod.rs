//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層を操作します。

pub mod connect_client;
pub mod disconnect_client;
pub mod editing;
pub mod error;
pub mod notify_user;
pub mod online_users;
pub mod start_viewing;
pub mod stop_viewing;

pub use connect_client::ConnectClientUseCase;
pub use disconnect_client::{DisconnectClientUseCase, DisconnectOutcome};
pub use editing::{EditingOutcome, EditingUseCase};
pub use error::{ConnectError, DisconnectError, PresenceActionError};
pub use notify_user::NotifyUserUseCase;
pub use online_users::OnlineUsersUseCase;
pub use start_viewing::{StartViewingOutcome, StartViewingUseCase};
pub use stop_viewing::{StopViewingOutcome, StopViewingUseCase};
