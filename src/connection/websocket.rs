//! Socket Connection Manager
//!
//! Keeps one socket to the backend. The stream is owned by a local task;
//! lifecycle events are handled on the UI task by [`SocketManager`], which
//! writes them into the state store.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use url::Url;

use super::error::ConnectionError;
use super::handle::{ReadyState, SocketHandle};
use super::protocol::{ClientAction, ClientEnvelope, InboundFrame, ServerMessage};
use super::{apply_snapshot, ConnectionManager};
use crate::data::{now_millis, ConnectionConfig, ConnectionStatus, LinkQuality, NoticeKind};
use crate::state::{ConnectionState, StateChange, StateStore};
use crate::ui::ViewController;

const BACKOFF_FACTOR: f64 = 1.5;
const POOR_AFTER_MS: i64 = 10_000;
const FAIR_AFTER_MS: i64 = 5_000;

/// What to do after the socket closed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconnectPlan {
    Retry { attempt: u32, delay: Duration },
    Exhausted,
}

/// Decide the next reconnect from the attempt counter and budget
pub fn plan_reconnect(connection: &ConnectionState) -> ReconnectPlan {
    if connection.reconnect_attempts >= connection.max_reconnect_attempts {
        return ReconnectPlan::Exhausted;
    }
    let attempt = connection.reconnect_attempts + 1;
    ReconnectPlan::Retry {
        attempt,
        delay: reconnect_delay(Duration::from_millis(connection.reconnect_delay_ms), attempt),
    }
}

/// `base * 1.5^(attempt - 1)`
pub fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    base.mul_f64(BACKOFF_FACTOR.powi(exponent))
}

/// Result of one health check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHealth {
    pub needs_ping: bool,
    pub quality: LinkQuality,
}

/// Classify the link by the time since the last inbound message.
///
/// A socket that never heard from the server counts as stale and poor.
pub fn assess_link(now: i64, last_ping: Option<i64>, stale_after: Duration) -> LinkHealth {
    let Some(last) = last_ping else {
        return LinkHealth {
            needs_ping: true,
            quality: LinkQuality::Poor,
        };
    };

    let elapsed = now.saturating_sub(last);
    let stale_ms = i64::try_from(stale_after.as_millis()).unwrap_or(i64::MAX);
    let quality = if elapsed > POOR_AFTER_MS {
        LinkQuality::Poor
    } else if elapsed > FAIR_AFTER_MS {
        LinkQuality::Fair
    } else {
        LinkQuality::Good
    };

    LinkHealth {
        needs_ping: elapsed > stale_ms,
        quality,
    }
}

/// Socket strategy
pub struct SocketManager {
    me: Weak<SocketManager>,
    store: StateStore,
    view: Rc<ViewController>,
    url: Url,
    health_interval: Duration,
    stale_after: Duration,
    next_socket_id: Cell<u64>,
    health_check: RefCell<Option<JoinHandle<()>>>,
    personalities_deferred: Cell<bool>,
}

impl SocketManager {
    pub fn new(
        store: StateStore,
        view: Rc<ViewController>,
        url: Url,
        config: &ConnectionConfig,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            store,
            view,
            url,
            health_interval: config.health_check_interval(),
            stale_after: config.stale_after(),
            next_socket_id: Cell::new(0),
            health_check: RefCell::new(None),
            personalities_deferred: Cell::new(false),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Open a new socket and hand its stream to a local task
    pub fn open(&self) {
        self.store.update([
            StateChange::ConnectionStatus(ConnectionStatus::Connecting),
            StateChange::UiLoadingConnecting(true),
        ]);

        let id = self.next_socket_id.get() + 1;
        self.next_socket_id.set(id);

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SocketHandle::new(id, tx);
        self.store
            .set(StateChange::ConnectionSocket(Some(handle.clone())));

        tracing::info!("Connecting to {} (socket #{})", self.url, id);
        tokio::task::spawn_local(run_socket(self.me.clone(), self.url.clone(), handle, rx));
    }

    /// Send immediately, rejecting when the socket is absent or not open
    pub fn send_now(&self, action: &ClientAction) -> bool {
        let Some(socket) = self.store.read(|s| s.connection.socket.clone()) else {
            tracing::warn!("Socket not initialized, dropping {}", action.name());
            self.view.show_error("Not connected to server", NoticeKind::Error);
            return false;
        };

        match socket.ready_state() {
            ReadyState::Connecting => {
                tracing::warn!("Socket still connecting, dropping {}", action.name());
                self.view
                    .show_error("Still connecting, please try again", NoticeKind::Error);
                false
            }
            ReadyState::Open => {
                let envelope = ClientEnvelope::new(action, now_millis());
                let sent = serde_json::to_string(&envelope)
                    .map_err(ConnectionError::from)
                    .and_then(|text| socket.send_text(text).map_err(|_| ConnectionError::Closed));

                match sent {
                    Ok(()) => {
                        tracing::debug!("Sent socket message: {}", action.name());
                        true
                    }
                    Err(e) => {
                        tracing::error!("Error sending {}: {}", action.name(), e);
                        self.view
                            .show_error(&format!("Failed to send message: {}", e), NoticeKind::Error);
                        false
                    }
                }
            }
            ReadyState::Closing | ReadyState::Closed => {
                tracing::warn!("Socket not open, cannot send {}", action.name());
                self.view.show_error("Not connected to server", NoticeKind::Error);
                false
            }
        }
    }

    fn is_current(&self, handle: &SocketHandle) -> bool {
        self.store
            .read(|s| s.connection.socket.as_ref() == Some(handle))
    }

    fn on_open(&self, handle: &SocketHandle) {
        if !self.is_current(handle) {
            return;
        }
        tracing::info!("Socket #{} connected", handle.id());

        self.store.update([
            StateChange::ConnectionStatus(ConnectionStatus::Connected),
            StateChange::ConnectionReconnectAttempts(0),
            StateChange::ConnectionLastPing(Some(now_millis())),
            StateChange::UiLoadingConnecting(false),
        ]);
        self.start_health_check();
        self.view.show_info("Connected to server");

        if self.personalities_deferred.replace(false) {
            self.send_now(&ClientAction::GetPersonalities);
        }
    }

    fn on_message(&self, text: &str) {
        let frame = match serde_json::from_str::<InboundFrame>(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Error parsing socket message: {}", e);
                self.view
                    .show_error("Received invalid message from server", NoticeKind::Error);
                return;
            }
        };

        match ServerMessage::from_frame(frame) {
            Ok(message) => self.handle_message(message),
            Err(e) => {
                tracing::error!("Error handling socket message: {}", e);
                self.view
                    .show_error("Error processing server message", NoticeKind::Error);
            }
        }
        self.store
            .set(StateChange::ConnectionLastPing(Some(now_millis())));
    }

    fn handle_message(&self, message: ServerMessage) {
        match message {
            ServerMessage::StateUpdate(snapshot) => {
                apply_snapshot(&self.store, &self.view, snapshot);
            }
            ServerMessage::PersonalitiesList(personalities) => {
                tracing::debug!("Received {} personalities", personalities.len());
                self.store
                    .set(StateChange::DataAvailablePersonalities(personalities));
                self.view.populate_personality_dropdown();
            }
            ServerMessage::Pong => {
                self.store
                    .set(StateChange::ConnectionLastPing(Some(now_millis())));
            }
            ServerMessage::Error(message) => {
                self.view.show_error(
                    message.as_deref().unwrap_or("Server error occurred"),
                    NoticeKind::Error,
                );
            }
            ServerMessage::Info(message) => {
                self.view
                    .show_info(message.as_deref().unwrap_or("Server notification"));
            }
            ServerMessage::Unknown(kind) => {
                tracing::debug!("Unknown message type: {}", kind);
            }
        }
    }

    fn on_error(&self, handle: &SocketHandle, error: &ConnectionError) {
        if !self.is_current(handle) {
            return;
        }
        tracing::error!("Socket #{} error: {}", handle.id(), error);
        self.store.update([
            StateChange::ConnectionStatus(ConnectionStatus::Error),
            StateChange::UiLoadingConnecting(false),
        ]);
        self.view
            .show_error("Connection error occurred", NoticeKind::Error);
    }

    fn on_close(&self, handle: &SocketHandle) {
        if !self.is_current(handle) {
            tracing::debug!("Ignoring close of superseded socket #{}", handle.id());
            return;
        }
        tracing::info!("Socket #{} disconnected", handle.id());

        let was_connected =
            self.store.read(|s| s.connection.status) == ConnectionStatus::Connected;
        self.store.update([
            StateChange::ConnectionStatus(ConnectionStatus::Disconnected),
            StateChange::ConnectionSocket(None),
            StateChange::UiLoadingConnecting(false),
        ]);
        self.stop_health_check();

        if was_connected {
            self.view
                .show_error("Disconnected from server", NoticeKind::Error);
        }
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&self) {
        match self.store.read(|s| plan_reconnect(&s.connection)) {
            ReconnectPlan::Retry { attempt, delay } => {
                let max = self.store.read(|s| s.connection.max_reconnect_attempts);
                self.store
                    .set(StateChange::ConnectionReconnectAttempts(attempt));
                tracing::info!(
                    "Scheduling reconnection attempt {}/{} in {:?}",
                    attempt,
                    max,
                    delay
                );

                let me = self.me.clone();
                tokio::task::spawn_local(async move {
                    tokio::time::sleep(delay).await;
                    let Some(manager) = me.upgrade() else {
                        return;
                    };
                    if manager.store.read(|s| s.connection.status) == ConnectionStatus::Disconnected
                    {
                        manager.open();
                    } else {
                        tracing::debug!("Reconnect attempt {} superseded", attempt);
                    }
                });
            }
            ReconnectPlan::Exhausted => {
                tracing::warn!("Reconnect budget exhausted");
                self.view.show_error(
                    "Unable to reconnect - maximum attempts reached",
                    NoticeKind::Error,
                );
            }
        }
    }

    fn start_health_check(&self) {
        self.stop_health_check();

        let me = self.me.clone();
        let period = self.health_interval;
        let task = tokio::task::spawn_local(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(manager) = me.upgrade() else {
                    break;
                };
                manager.check_health();
            }
        });
        *self.health_check.borrow_mut() = Some(task);
    }

    fn stop_health_check(&self) {
        if let Some(task) = self.health_check.borrow_mut().take() {
            task.abort();
        }
    }

    fn check_health(&self) {
        let (open, last_ping) = self.store.read(|s| {
            (
                s.connection
                    .socket
                    .as_ref()
                    .is_some_and(|socket| socket.ready_state() == ReadyState::Open),
                s.connection.last_ping,
            )
        });
        if !open {
            return;
        }

        let health = assess_link(now_millis(), last_ping, self.stale_after);
        if health.needs_ping {
            tracing::warn!("Connection seems stale, sending ping");
            self.send_now(&ClientAction::Ping);
        }
        self.store.set(StateChange::ConnectionQuality(health.quality));
    }
}

#[async_trait(?Send)]
impl ConnectionManager for SocketManager {
    fn connect(&self) {
        self.open();
    }

    async fn send_message(&self, action: ClientAction) -> bool {
        self.send_now(&action)
    }

    /// Sent on open when the socket is still connecting.
    async fn request_personalities(&self) {
        let connecting = self.store.read(|s| {
            s.connection
                .socket
                .as_ref()
                .is_some_and(|socket| socket.ready_state() == ReadyState::Connecting)
        });
        if connecting {
            tracing::debug!("Deferring personality request until the socket opens");
            self.personalities_deferred.set(true);
            return;
        }
        self.send_now(&ClientAction::GetPersonalities);
    }
}

impl Drop for SocketManager {
    fn drop(&mut self) {
        self.stop_health_check();
    }
}

async fn run_socket(
    manager: Weak<SocketManager>,
    url: Url,
    handle: SocketHandle,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            handle.set_ready_state(ReadyState::Closed);
            if let Some(manager) = manager.upgrade() {
                manager.on_error(&handle, &ConnectionError::from(e));
                manager.on_close(&handle);
            }
            return;
        }
    };

    handle.set_ready_state(ReadyState::Open);
    match manager.upgrade() {
        Some(manager) => manager.on_open(&handle),
        None => return,
    }

    let (mut write, mut read) = stream.split();
    let outcome: Result<(), ConnectionError> = loop {
        tokio::select! {
            inbound = read.next() => match inbound {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(manager) = manager.upgrade() {
                        manager.on_message(&text);
                    }
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    tracing::debug!("Server closed socket #{}: {:?}", handle.id(), frame);
                    break Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(e.into()),
                None => break Ok(()),
            },
            // `handle` keeps the channel open; the socket ends through `read`.
            Some(text) = outbound.recv() => {
                if let Err(e) = write.send(WsMessage::Text(text)).await {
                    break Err(e.into());
                }
            }
        }
    };

    handle.set_ready_state(ReadyState::Closed);
    if let Some(manager) = manager.upgrade() {
        if let Err(e) = outcome {
            manager.on_error(&handle, &e);
        }
        manager.on_close(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::UiConfig;
    use crate::state::{AppState, ManualFrames};
    use crate::ui::Document;
    use std::future::Future;
    use tokio::net::TcpListener;
    use tokio::task::LocalSet;

    fn manager_with(
        state: AppState,
        url: &str,
    ) -> (StateStore, Rc<ViewController>, Rc<SocketManager>) {
        let store = StateStore::new(state, ManualFrames::default());
        let view = ViewController::new(
            store.clone(),
            Rc::new(Document::kiosk()),
            &UiConfig::default(),
        );
        let manager = SocketManager::new(
            store.clone(),
            view.clone(),
            Url::parse(url).unwrap(),
            &ConnectionConfig::default(),
        );
        (store, view, manager)
    }

    fn notices(store: &StateStore) -> Vec<String> {
        store.read(|s| s.ui.errors.iter().map(|n| n.message.clone()).collect())
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    fn local<F: Future<Output = ()>>(fut: F) -> impl Future<Output = ()> {
        async move { LocalSet::new().run_until(fut).await }
    }

    #[test]
    fn backoff_grows_by_half_each_attempt() {
        let base = Duration::from_millis(1000);
        let delays: Vec<f64> = (1..=5)
            .map(|attempt| reconnect_delay(base, attempt).as_secs_f64() * 1000.0)
            .collect();
        assert_eq!(delays, vec![1000.0, 1500.0, 2250.0, 3375.0, 5062.5]);
    }

    #[test]
    fn plan_stops_after_budget() {
        let mut connection = ConnectionState::default();
        assert_eq!(
            plan_reconnect(&connection),
            ReconnectPlan::Retry {
                attempt: 1,
                delay: Duration::from_millis(1000)
            }
        );

        connection.reconnect_attempts = 4;
        assert_eq!(
            plan_reconnect(&connection),
            ReconnectPlan::Retry {
                attempt: 5,
                delay: Duration::from_micros(5_062_500)
            }
        );

        connection.reconnect_attempts = 5;
        assert_eq!(plan_reconnect(&connection), ReconnectPlan::Exhausted);
    }

    #[test]
    fn link_quality_thresholds() {
        let stale = Duration::from_secs(30);
        let at = |elapsed: i64| assess_link(100_000, Some(100_000 - elapsed), stale);

        assert_eq!(at(1_000).quality, LinkQuality::Good);
        assert_eq!(at(5_000).quality, LinkQuality::Good);
        assert_eq!(at(5_001).quality, LinkQuality::Fair);
        assert_eq!(at(10_001).quality, LinkQuality::Poor);
        assert!(!at(30_000).needs_ping);
        assert!(at(30_001).needs_ping);
        assert_eq!(
            assess_link(100_000, None, stale),
            LinkHealth {
                needs_ping: true,
                quality: LinkQuality::Poor
            }
        );
    }

    #[tokio::test]
    async fn send_is_rejected_unless_open() {
        local(async {
            let (store, _view, manager) = manager_with(AppState::default(), "ws://127.0.0.1:9");

            assert!(!manager.send_now(&ClientAction::Ping));
            assert_eq!(notices(&store), vec!["Not connected to server"]);

            let (tx, mut rx) = mpsc::unbounded_channel();
            let socket = SocketHandle::new(1, tx);
            store.set(StateChange::ConnectionSocket(Some(socket.clone())));

            assert!(!manager.send_now(&ClientAction::Ping));
            assert_eq!(
                notices(&store).last().map(String::as_str),
                Some("Still connecting, please try again")
            );

            socket.set_ready_state(ReadyState::Closed);
            assert!(!manager.send_now(&ClientAction::Ping));
            assert_eq!(
                notices(&store).last().map(String::as_str),
                Some("Not connected to server")
            );
            assert!(rx.try_recv().is_err());

            socket.set_ready_state(ReadyState::Open);
            assert!(manager.send_now(&ClientAction::SelectPersonality {
                personality: "classic".into()
            }));
            let sent: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(sent["action"], "select_personality");
            assert_eq!(sent["data"]["personality"], "classic");
            assert!(sent["timestamp"].as_i64().unwrap() > 0);
        })
        .await;
    }

    #[tokio::test]
    async fn inbound_frames_dispatch_by_type() {
        local(async {
            let (store, view, manager) = manager_with(AppState::default(), "ws://127.0.0.1:9");

            manager.on_message(
                r#"{"type":"personalities_list","data":{"personalities":[{"key":"classic","name":"Classic Terry"}]}}"#,
            );
            assert_eq!(store.read(|s| s.data.available_personalities.len()), 1);
            let dropdown = view
                .element(crate::ui::ElementKey::PersonalityDropdown)
                .unwrap();
            assert_eq!(dropdown.borrow().children.len(), 2);
            assert!(store.read(|s| s.connection.last_ping.is_some()));

            manager.on_message(r#"{"type":"info","data":{}}"#);
            manager.on_message(r#"{"type":"error","data":{"message":"Keg empty"}}"#);
            manager.on_message(r#"{"type":"mystery","data":{}}"#);
            manager.on_message("not json");
            assert_eq!(
                notices(&store),
                vec![
                    "Server notification",
                    "Keg empty",
                    "Received invalid message from server"
                ]
            );
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_after_budget_is_terminal() {
        local(async {
            let mut state = AppState::default();
            state.connection.reconnect_attempts = 5;
            let (store, _view, manager) = manager_with(state, "ws://127.0.0.1:9");

            let (tx, _rx) = mpsc::unbounded_channel();
            let socket = SocketHandle::new(1, tx);
            store.update([
                StateChange::ConnectionSocket(Some(socket.clone())),
                StateChange::ConnectionStatus(ConnectionStatus::Connected),
            ]);

            manager.on_close(&socket);
            assert_eq!(
                notices(&store),
                vec![
                    "Disconnected from server",
                    "Unable to reconnect - maximum attempts reached"
                ]
            );

            tokio::time::sleep(Duration::from_secs(60)).await;
            store.read(|s| {
                assert_eq!(s.connection.status, ConnectionStatus::Disconnected);
                assert_eq!(s.connection.reconnect_attempts, 5);
                assert!(s.connection.socket.is_none());
            });
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_is_skipped_when_status_moved_on() {
        local(async {
            let (store, _view, manager) = manager_with(AppState::default(), "ws://127.0.0.1:9");
            let (tx, _rx) = mpsc::unbounded_channel();
            let socket = SocketHandle::new(1, tx);
            store.set(StateChange::ConnectionSocket(Some(socket.clone())));

            manager.on_close(&socket);
            assert_eq!(store.read(|s| s.connection.reconnect_attempts), 1);
            assert!(notices(&store).is_empty());

            // Something else reconnected before the timer fired.
            store.set(StateChange::ConnectionStatus(ConnectionStatus::Connected));
            tokio::time::sleep(Duration::from_millis(1500)).await;

            store.read(|s| {
                assert_eq!(s.connection.status, ConnectionStatus::Connected);
                assert!(s.connection.socket.is_none());
            });
        })
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn stale_open_socket_is_pinged() {
        local(async {
            let (store, _view, manager) = manager_with(AppState::default(), "ws://127.0.0.1:9");
            let (tx, mut rx) = mpsc::unbounded_channel();
            let socket = SocketHandle::new(1, tx);
            socket.set_ready_state(ReadyState::Open);
            store.update([
                StateChange::ConnectionSocket(Some(socket)),
                StateChange::ConnectionLastPing(Some(now_millis() - 31_000)),
            ]);

            manager.start_health_check();
            tokio::time::sleep(Duration::from_secs(6)).await;

            let ping: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(ping["action"], "ping");
            assert_eq!(store.read(|s| s.connection.quality), LinkQuality::Poor);

            // A fresh message clears the alarm on the next tick.
            store.set(StateChange::ConnectionLastPing(Some(now_millis())));
            while rx.try_recv().is_ok() {}
            tokio::time::sleep(Duration::from_secs(5)).await;
            assert!(rx.try_recv().is_err());
            assert_eq!(store.read(|s| s.connection.quality), LinkQuality::Good);

            manager.stop_health_check();
        })
        .await;
    }

    #[tokio::test]
    async fn loopback_socket_round_trip() {
        local(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let server = tokio::spawn(async move {
                let (tcp, _) = listener.accept().await.unwrap();
                let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
                ws.send(WsMessage::Text(
                    r#"{"type":"state_update","data":{"status":"Pouring...","text_chat_enabled":true}}"#
                        .to_string(),
                ))
                .await
                .unwrap();

                let request = loop {
                    match ws.next().await {
                        Some(Ok(WsMessage::Text(text))) => break text,
                        Some(Ok(_)) => continue,
                        other => panic!("socket ended early: {:?}", other),
                    }
                };
                ws.close(None).await.unwrap();
                request
            });

            let (store, _view, manager) =
                manager_with(AppState::default(), &format!("ws://{}", addr));
            manager.connect();
            manager.request_personalities().await;

            wait_until(|| store.read(|s| s.data.current_status == "Pouring...")).await;
            store.read(|s| {
                assert_eq!(s.connection.status, ConnectionStatus::Connected);
                assert!(s.ui.text_chat_enabled);
                assert!(!s.ui.loading.connecting);
            });
            assert!(notices(&store).contains(&"Connected to server".to_string()));

            let request: serde_json::Value =
                serde_json::from_str(&server.await.unwrap()).unwrap();
            assert_eq!(request["action"], "get_personalities");

            wait_until(|| store.read(|s| s.connection.reconnect_attempts == 1)).await;
            assert!(notices(&store).contains(&"Disconnected from server".to_string()));
        })
        .await;
    }
}
