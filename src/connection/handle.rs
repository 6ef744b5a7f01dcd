//! Live socket handle stored in the application state

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tokio::sync::mpsc;

/// Lifecycle of one socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Cheap clonable view of one socket.
///
/// The socket task owns the stream; everyone else queues outbound text
/// through `outbound` and reads the lifecycle through `ready_state`.
#[derive(Clone)]
pub struct SocketHandle {
    id: u64,
    ready_state: Rc<Cell<ReadyState>>,
    outbound: mpsc::UnboundedSender<String>,
}

impl SocketHandle {
    pub fn new(id: u64, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            id,
            ready_state: Rc::new(Cell::new(ReadyState::Connecting)),
            outbound,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state.get()
    }

    pub fn set_ready_state(&self, state: ReadyState) {
        self.ready_state.set(state);
    }

    /// Queue a text frame for the socket task
    pub(crate) fn send_text(&self, text: String) -> Result<(), mpsc::error::SendError<String>> {
        self.outbound.send(text)
    }
}

impl PartialEq for SocketHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for SocketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketHandle")
            .field("id", &self.id)
            .field("ready_state", &self.ready_state.get())
            .finish()
    }
}
