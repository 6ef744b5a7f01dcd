//! Connection module
//!
//! Two interchangeable transports behind [`ConnectionManager`]: a socket
//! with reconnect and health checks, and a REST poller.

mod error;
mod handle;
mod polling;
mod protocol;
mod websocket;

use async_trait::async_trait;

use crate::state::StateStore;
use crate::ui::ViewController;

pub use error::ConnectionError;
pub use handle::{ReadyState, SocketHandle};
pub use polling::PollingManager;
pub use protocol::{
    ActionRequest, ClientAction, ClientEnvelope, InboundFrame, PersonalityList, ServerMessage,
    StateSnapshot,
};
pub use websocket::{
    assess_link, plan_reconnect, reconnect_delay, LinkHealth, ReconnectPlan, SocketManager,
};

/// What the application controller needs from a transport
#[async_trait(?Send)]
pub trait ConnectionManager {
    /// Open the connection, or start polling.
    fn connect(&self);

    /// Deliver one action; `false` means it never reached the server.
    async fn send_message(&self, action: ClientAction) -> bool;

    /// Ask for the personality list.
    async fn request_personalities(&self);
}

/// Write a server snapshot into the store and refresh the overlay and chat box
pub fn apply_snapshot(store: &StateStore, view: &ViewController, snapshot: StateSnapshot) {
    store.update(snapshot.into_changes());
    view.update_personality_state();
    view.update_text_chat_visibility();
}
