//! Business logic module

mod app_controller;
mod command;

pub use app_controller::{AppController, UiEvent, NETWORK_ERROR_NOTICE, UNEXPECTED_ERROR_NOTICE};
pub use command::{resolve_personality, Command, HELP};
