//! Background message polling.
//!
//! A single scheduled task ticks once a second. The tick itself never
//! blocks on network I/O: it only spawns the actual fetch and exits, so
//! `stop()` cancels future ticks but leaves an in-flight fetch to complete
//! (and its late effects still apply). The cursor only ever moves forward.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use kakehashi_shared::time::Clock;

use crate::api::FetchOutcome;
use crate::display::DisplaySink;
use crate::formatter::MessageFormatter;
use crate::session::Session;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Source of new messages, implemented by the API client.
#[async_trait]
pub trait MessageFetcher: Send + Sync {
    async fn fetch_messages(&self, since: i64) -> FetchOutcome;
}

/// Fixed-interval poller keeping a monotonic timestamp cursor.
pub struct Poller {
    fetcher: Arc<dyn MessageFetcher>,
    sink: Arc<dyn DisplaySink>,
    session: Arc<Session>,
    clock: Arc<dyn Clock>,
    cursor: Arc<AtomicI64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(
        fetcher: Arc<dyn MessageFetcher>,
        sink: Arc<dyn DisplaySink>,
        session: Arc<Session>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            sink,
            session,
            clock,
            cursor: Arc::new(AtomicI64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Start polling. No-op if already running. The cursor starts at the
    /// current time so history predating this session is not replayed.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        self.cursor
            .store(self.clock.now_millis(), Ordering::SeqCst);

        let fetcher = self.fetcher.clone();
        let sink = self.sink.clone();
        let session = self.session.clone();
        let cursor = self.cursor.clone();

        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                if !session.poll_allowed().await {
                    continue;
                }
                // The tick only arms the fetch; it never awaits it.
                tokio::spawn(poll_once(fetcher.clone(), sink.clone(), cursor.clone()));
            }
        }));

        tracing::info!("Message poller started");
    }

    /// Cancel the repeating schedule. Does not abort an in-flight fetch.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            handle.abort();
            tracing::info!("Message poller stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        let task = self.task.lock().await;
        task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Move the cursor to the current time, e.g. when re-establishing a
    /// session, so older history is not replayed.
    pub fn reset_timestamp(&self) {
        self.cursor
            .store(self.clock.now_millis(), Ordering::SeqCst);
    }

    pub fn cursor(&self) -> i64 {
        self.cursor.load(Ordering::SeqCst)
    }
}

/// One poll: fetch everything after the cursor, raise the cursor to the
/// batch maximum (whatever order the batch arrived in), then forward the
/// messages in received order. A failed fetch is skipped silently; the
/// next tick tries again.
async fn poll_once(
    fetcher: Arc<dyn MessageFetcher>,
    sink: Arc<dyn DisplaySink>,
    cursor: Arc<AtomicI64>,
) {
    let since = cursor.load(Ordering::SeqCst);
    let outcome = fetcher.fetch_messages(since).await;
    if !outcome.ok {
        return;
    }

    for message in &outcome.messages {
        cursor.fetch_max(message.timestamp, Ordering::SeqCst);
    }
    for message in outcome.messages {
        sink.show(MessageFormatter::format_incoming(
            &message.sender,
            &message.message,
            message.timestamp,
        ))
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ChannelSink;
    use kakehashi_shared::protocol::MessageDto;
    use kakehashi_shared::time::FixedClock;
    use std::collections::VecDeque;
    use uuid::Uuid;

    /// Fetcher that replays scripted outcomes, then reports empty batches.
    struct ScriptedFetcher {
        outcomes: Mutex<VecDeque<FetchOutcome>>,
    }

    impl ScriptedFetcher {
        fn new(outcomes: Vec<FetchOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
            }
        }
    }

    #[async_trait]
    impl MessageFetcher for ScriptedFetcher {
        async fn fetch_messages(&self, _since: i64) -> FetchOutcome {
            let mut outcomes = self.outcomes.lock().await;
            outcomes.pop_front().unwrap_or(FetchOutcome {
                ok: true,
                messages: Vec::new(),
            })
        }
    }

    fn message(sender: &str, text: &str, timestamp: i64) -> MessageDto {
        MessageDto {
            sender: sender.to_string(),
            message: text.to_string(),
            timestamp,
        }
    }

    async fn connected_session() -> Arc<Session> {
        let session = Arc::new(Session::new(Uuid::new_v4()));
        session.mark_connected("token".to_string()).await;
        session
    }

    #[tokio::test]
    async fn test_cursor_moves_to_batch_maximum_not_last() {
        // テスト項目: [5, 3, 9] の順のバッチ処理後にカーソルが 9 になる
        // given (前提条件):
        let batch = FetchOutcome {
            ok: true,
            messages: vec![
                message("a", "m1", 5),
                message("b", "m2", 3),
                message("c", "m3", 9),
            ],
        };
        let fetcher = Arc::new(ScriptedFetcher::new(vec![batch]));
        let (sink, mut rx) = ChannelSink::new();
        let cursor = Arc::new(AtomicI64::new(0));

        // when (操作):
        poll_once(fetcher, Arc::new(sink), cursor.clone()).await;

        // then (期待する結果):
        assert_eq!(cursor.load(Ordering::SeqCst), 9);
        // メッセージは受信順で転送される
        assert!(rx.recv().await.unwrap().contains("m1"));
        assert!(rx.recv().await.unwrap().contains("m2"));
        assert!(rx.recv().await.unwrap().contains("m3"));
    }

    #[tokio::test]
    async fn test_cursor_never_decreases() {
        // テスト項目: 既読より古いタイムスタンプでカーソルが戻らない
        // given (前提条件):
        let batch = FetchOutcome {
            ok: true,
            messages: vec![message("a", "old", 50)],
        };
        let fetcher = Arc::new(ScriptedFetcher::new(vec![batch]));
        let (sink, _rx) = ChannelSink::new();
        let cursor = Arc::new(AtomicI64::new(100));

        // when (操作):
        poll_once(fetcher, Arc::new(sink), cursor.clone()).await;

        // then (期待する結果):
        assert_eq!(cursor.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_skipped_silently() {
        // テスト項目: 失敗した fetch ではカーソルも表示も変化しない
        // given (前提条件):
        let fetcher = Arc::new(ScriptedFetcher::new(vec![FetchOutcome::failed()]));
        let (sink, mut rx) = ChannelSink::new();
        let cursor = Arc::new(AtomicI64::new(42));

        // when (操作):
        poll_once(fetcher, Arc::new(sink), cursor.clone()).await;

        // then (期待する結果):
        assert_eq!(cursor.load(Ordering::SeqCst), 42);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_start_is_idempotent_and_sets_cursor_to_now() {
        // テスト項目: start が冪等で、カーソルが現在時刻に初期化される
        // given (前提条件):
        let fetcher = Arc::new(ScriptedFetcher::new(vec![]));
        let (sink, _rx) = ChannelSink::new();
        let session = connected_session().await;
        let poller = Poller::new(
            fetcher,
            Arc::new(sink),
            session,
            Arc::new(FixedClock::new(777_000)),
        );

        // when (操作):
        poller.start().await;
        poller.start().await;

        // then (期待する結果):
        assert!(poller.is_running().await);
        assert_eq!(poller.cursor(), 777_000);

        poller.stop().await;
        assert!(!poller.is_running().await);
        // stop も冪等
        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_poller_forwards_messages_to_sink() {
        // テスト項目: 稼働中のポーラーが新着メッセージをシンクへ流す
        // given (前提条件):
        let batch = FetchOutcome {
            ok: true,
            messages: vec![message("alice", "hello", 1_000_000)],
        };
        let fetcher = Arc::new(ScriptedFetcher::new(vec![batch]));
        let (sink, mut rx) = ChannelSink::new();
        let session = connected_session().await;
        let poller = Poller::new(
            fetcher,
            Arc::new(sink),
            session,
            Arc::new(FixedClock::new(500)),
        );

        // when (操作):
        poller.start().await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // then (期待する結果):
        let line = rx.recv().await.unwrap();
        assert!(line.contains("alice"));
        assert!(line.contains("hello"));
        assert_eq!(poller.cursor(), 1_000_000);

        poller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_idles_while_session_disconnected() {
        // テスト項目: セッション未接続の間は fetch が呼ばれない
        // given (前提条件):
        let batch = FetchOutcome {
            ok: true,
            messages: vec![message("alice", "hello", 1_000_000)],
        };
        let fetcher = Arc::new(ScriptedFetcher::new(vec![batch]));
        let (sink, mut rx) = ChannelSink::new();
        let session = Arc::new(Session::new(Uuid::new_v4()));
        let poller = Poller::new(
            fetcher,
            Arc::new(sink),
            session,
            Arc::new(FixedClock::new(500)),
        );

        // when (操作):
        poller.start().await;
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // then (期待する結果):
        assert!(rx.try_recv().is_err());

        poller.stop().await;
    }
}
