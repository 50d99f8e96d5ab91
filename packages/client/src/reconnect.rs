//! 再接続の状態遷移
//!
//! 接続ライフサイクルのフェーズと再試行カウンタを一箇所で管理する。
//! イベントの発火やスリープは呼び出し側（サービス層）の責務とし、
//! ここでは判断だけを返す。

use std::sync::Mutex;
use std::time::Duration;

/// 接続ライフサイクルのフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// 未接続（初期状態、または明示的な切断後）
    Disconnected,
    /// 初回接続を試行中
    Connecting,
    /// 接続確立済み
    Connected,
    /// 切断を検知し再接続を試行中
    Reconnecting,
    /// 再試行上限に達し、手動操作なしには復帰しない
    PermanentlyFailed,
}

/// 再試行ポリシー
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 連続失敗の許容回数
    pub max_attempts: u32,
    /// 再試行間の待ち時間
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

/// 切断検知時の判断
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// `delay` 待ってから `attempt` 回目の再接続を試みる
    Retry { attempt: u32, delay: Duration },
    /// 上限到達。PermanentlyFailed へ遷移済み。
    GiveUp,
}

#[derive(Debug)]
struct ReconnectState {
    phase: ConnectionPhase,
    attempts: u32,
}

/// フェーズと再試行カウンタの管理者
#[derive(Debug)]
pub struct ReconnectManager {
    policy: RetryPolicy,
    state: Mutex<ReconnectState>,
}

impl ReconnectManager {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(ReconnectState {
                phase: ConnectionPhase::Disconnected,
                attempts: 0,
            }),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.state.lock().unwrap().phase
    }

    /// 接続試行を開始してよいか。すでに試行中・接続済みなら false を返し、
    /// 呼び出し側は何もしない（connect の単一飛行保証）。
    pub fn begin_connect(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.phase {
            ConnectionPhase::Disconnected | ConnectionPhase::PermanentlyFailed => {
                state.phase = ConnectionPhase::Connecting;
                state.attempts = 0;
                true
            }
            ConnectionPhase::Connecting
            | ConnectionPhase::Connected
            | ConnectionPhase::Reconnecting => false,
        }
    }

    /// 接続確立。再試行カウンタをリセットする。
    pub fn mark_connected(&self) {
        let mut state = self.state.lock().unwrap();
        state.phase = ConnectionPhase::Connected;
        state.attempts = 0;
    }

    /// 明示的な切断。自動再接続の対象外になる。
    pub fn mark_disconnected(&self) {
        let mut state = self.state.lock().unwrap();
        state.phase = ConnectionPhase::Disconnected;
        state.attempts = 0;
    }

    /// 意図しない切断・接続失敗を記録し、次の行動を決める
    pub fn connection_lost(&self) -> ReconnectDecision {
        let mut state = self.state.lock().unwrap();
        if state.phase == ConnectionPhase::Disconnected {
            // 明示的な切断後に届いた遅延通知は無視する
            return ReconnectDecision::GiveUp;
        }
        if state.attempts >= self.policy.max_attempts {
            state.phase = ConnectionPhase::PermanentlyFailed;
            return ReconnectDecision::GiveUp;
        }
        state.attempts += 1;
        state.phase = ConnectionPhase::Reconnecting;
        ReconnectDecision::Retry {
            attempt: state.attempts,
            delay: self.policy.delay,
        }
    }

    /// 再試行しても無駄な失敗（認証拒否など）。即座に打ち切る。
    pub fn fail_permanently(&self) {
        self.state.lock().unwrap().phase = ConnectionPhase::PermanentlyFailed;
    }

    /// 手動の再接続要求。PermanentlyFailed からでもカウンタを
    /// リセットして再試行を許可する。
    pub fn force_reconnect(&self) {
        let mut state = self.state.lock().unwrap();
        state.attempts = 0;
        state.phase = ConnectionPhase::Reconnecting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_connect_is_single_flight() {
        // テスト項目: 接続試行中の connect 再呼び出しは拒否される
        // given (前提条件):
        let manager = ReconnectManager::new(RetryPolicy::default());

        // when (操作):
        let first = manager.begin_connect();
        let second = manager.begin_connect();

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        assert_eq!(manager.phase(), ConnectionPhase::Connecting);
    }

    #[test]
    fn test_connection_lost_retries_up_to_limit() {
        // テスト項目: 切断は上限回数まで Retry、超えたら GiveUp になる
        // given (前提条件): 上限3回のポリシー
        let manager = ReconnectManager::new(RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        });
        manager.begin_connect();

        // when (操作) / then (期待する結果):
        for expected in 1..=3 {
            assert_eq!(
                manager.connection_lost(),
                ReconnectDecision::Retry {
                    attempt: expected,
                    delay: Duration::from_millis(10),
                }
            );
            assert_eq!(manager.phase(), ConnectionPhase::Reconnecting);
        }
        assert_eq!(manager.connection_lost(), ReconnectDecision::GiveUp);
        assert_eq!(manager.phase(), ConnectionPhase::PermanentlyFailed);
    }

    #[test]
    fn test_successful_connection_resets_attempts() {
        // テスト項目: 接続成功で再試行カウンタがリセットされる
        // given (前提条件): 2回失敗した後に接続成功する
        let manager = ReconnectManager::new(RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(10),
        });
        manager.begin_connect();
        manager.connection_lost();
        manager.connection_lost();
        manager.mark_connected();

        // when (操作): 再び切断される
        let decision = manager.connection_lost();

        // then (期待する結果): カウントは1から数え直される
        assert_eq!(
            decision,
            ReconnectDecision::Retry {
                attempt: 1,
                delay: Duration::from_millis(10),
            }
        );
    }

    #[test]
    fn test_deliberate_disconnect_suppresses_retry() {
        // テスト項目: 明示的な切断後は再接続しない
        // given (前提条件):
        let manager = ReconnectManager::new(RetryPolicy::default());
        manager.begin_connect();
        manager.mark_connected();
        manager.mark_disconnected();

        // when (操作): 切断後にソケットクローズの通知が届く
        let decision = manager.connection_lost();

        // then (期待する結果):
        assert_eq!(decision, ReconnectDecision::GiveUp);
        assert_eq!(manager.phase(), ConnectionPhase::Disconnected);
    }

    #[test]
    fn test_force_reconnect_recovers_from_permanent_failure() {
        // テスト項目: force_reconnect は PermanentlyFailed から復帰できる
        // given (前提条件): 上限1回で失敗済み
        let manager = ReconnectManager::new(RetryPolicy {
            max_attempts: 1,
            delay: Duration::from_millis(10),
        });
        manager.begin_connect();
        manager.connection_lost();
        manager.connection_lost();
        assert_eq!(manager.phase(), ConnectionPhase::PermanentlyFailed);

        // when (操作):
        manager.force_reconnect();

        // then (期待する結果): カウンタが戻り、再試行が許可される
        assert_eq!(manager.phase(), ConnectionPhase::Reconnecting);
        assert_eq!(
            manager.connection_lost(),
            ReconnectDecision::Retry {
                attempt: 1,
                delay: Duration::from_millis(10),
            }
        );
    }
}
