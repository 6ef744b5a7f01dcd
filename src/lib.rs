//! Terry the Tube - kiosk client
//!
//! A terminal kiosk for the Terry the Tube beer-serving bartender. It keeps
//! a reactive state store in sync with the backend over a socket or by
//! polling, and paints the kiosk page to the terminal.

pub mod business;
pub mod connection;
pub mod data;
pub mod state;
pub mod ui;

pub use business::{AppController, Command, UiEvent};
pub use connection::{ConnectionManager, PollingManager, SocketManager};
pub use data::{KioskConfig, TransportKind};
pub use state::{AppState, StateStore, TokioFrames};
pub use ui::{Document, TerminalPainter, ViewController};
