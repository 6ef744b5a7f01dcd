//! State module: the reactive key-path store

mod app_state;
mod frame;
mod path;
mod store;

pub use app_state::{AppState, ConnectionState, DataState, UiState, DEFAULT_STATUS};
pub use frame::{FrameScheduler, ManualFrames, TokioFrames};
pub use path::{Section, StateChange, StatePath, StateValue, UnknownPath};
pub use store::{Listener, SectionRenderer, StateStore, Subscription};
