//! Polling Connection Manager
//!
//! Fetches the full snapshot from the REST surface on a fixed interval and
//! realizes actions as one-shot POSTs.

use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use url::Url;

use super::error::ConnectionError;
use super::protocol::{ActionRequest, ClientAction, PersonalityList, StateSnapshot};
use super::{apply_snapshot, ConnectionManager};
use crate::data::{ConnectionStatus, PollingConfig};
use crate::state::{StateChange, StateStore};
use crate::ui::ViewController;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Polling strategy
pub struct PollingManager {
    me: Weak<PollingManager>,
    store: StateStore,
    view: Rc<ViewController>,
    client: reqwest::Client,
    base: Url,
    interval: Duration,
    repoll_delay: Duration,
    connected: Cell<bool>,
    poller: RefCell<Option<JoinHandle<()>>>,
}

impl PollingManager {
    pub fn new(
        store: StateStore,
        view: Rc<ViewController>,
        base: Url,
        config: &PollingConfig,
    ) -> Result<Rc<Self>, ConnectionError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Rc::new_cyclic(|me| Self {
            me: me.clone(),
            store,
            view,
            client,
            base,
            interval: config.interval(),
            repoll_delay: config.repoll_delay(),
            connected: Cell::new(false),
            poller: RefCell::new(None),
        }))
    }

    /// Mark connected, load personalities and start the poll loop
    pub fn start(&self) {
        tracing::info!("Starting polling manager against {}", self.base);
        self.connected.set(true);
        self.store
            .set(StateChange::ConnectionStatus(ConnectionStatus::Connected));

        let me = self.me.clone();
        tokio::task::spawn_local(async move {
            if let Some(manager) = me.upgrade() {
                manager.load_personalities().await;
            }
        });

        let me = self.me.clone();
        let period = self.interval;
        let task = tokio::task::spawn_local(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(manager) = me.upgrade() else {
                    break;
                };
                manager.poll_state().await;
            }
        });
        if let Some(previous) = self.poller.borrow_mut().replace(task) {
            previous.abort();
        }
    }

    pub fn stop(&self) {
        if let Some(task) = self.poller.borrow_mut().take() {
            task.abort();
        }
        self.connected.set(false);
        self.store
            .set(StateChange::ConnectionStatus(ConnectionStatus::Disconnected));
        tracing::info!("Polling manager stopped");
    }

    /// Fetch one snapshot.
    ///
    /// Only the first failure in a row flips the status to disconnected.
    pub async fn poll_state(&self) {
        match self.fetch_state().await {
            Ok(snapshot) => {
                apply_snapshot(&self.store, &self.view, snapshot);
                if !self.connected.replace(true) {
                    tracing::info!("State poll recovered");
                    self.store
                        .set(StateChange::ConnectionStatus(ConnectionStatus::Connected));
                }
            }
            Err(e) => {
                tracing::error!("Failed to poll state: {}", e);
                if self.connected.replace(false) {
                    self.store
                        .set(StateChange::ConnectionStatus(ConnectionStatus::Disconnected));
                }
            }
        }
    }

    pub async fn load_personalities(&self) {
        let result: Result<PersonalityList, ConnectionError> = async {
            let response = self
                .client
                .get(self.endpoint("/api/personalities")?)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ConnectionError::Status {
                    status: response.status().as_u16(),
                });
            }
            Ok(response.json().await?)
        }
        .await;

        match result {
            Ok(list) => {
                tracing::info!("Personalities loaded: {}", list.personalities.len());
                self.store
                    .set(StateChange::DataAvailablePersonalities(list.personalities));
                self.view.populate_personality_dropdown();
            }
            Err(e) => tracing::error!("Failed to load personalities: {}", e),
        }
    }

    /// POST one action, then re-poll shortly after a success
    pub async fn send_action(&self, action: &ClientAction) -> bool {
        match self.post_action(action).await {
            Ok(ack) => {
                tracing::debug!("Action {} successful: {}", action.name(), ack);

                let me = self.me.clone();
                let delay = self.repoll_delay;
                tokio::task::spawn_local(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(manager) = me.upgrade() {
                        manager.poll_state().await;
                    }
                });
                true
            }
            Err(e) => {
                tracing::error!("Action {} failed: {}", action.name(), e);
                false
            }
        }
    }

    async fn fetch_state(&self) -> Result<StateSnapshot, ConnectionError> {
        let response = self
            .client
            .get(self.endpoint("/api/state")?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ConnectionError::Status {
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn post_action(
        &self,
        action: &ClientAction,
    ) -> Result<serde_json::Value, ConnectionError> {
        let response = self
            .client
            .post(self.endpoint("/api/action")?)
            .json(&ActionRequest::from(action))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ConnectionError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }

    fn endpoint(&self, path: &str) -> Result<Url, ConnectionError> {
        self.base
            .join(path)
            .map_err(|source| ConnectionError::InvalidUrl {
                endpoint: path.to_string(),
                source,
            })
    }
}

#[async_trait(?Send)]
impl ConnectionManager for PollingManager {
    fn connect(&self) {
        self.start();
    }

    async fn send_message(&self, action: ClientAction) -> bool {
        self.send_action(&action).await
    }

    async fn request_personalities(&self) {
        self.load_personalities().await;
    }
}

impl Drop for PollingManager {
    fn drop(&mut self) {
        if let Some(task) = self.poller.borrow_mut().take() {
            task.abort();
        }
    }
}
