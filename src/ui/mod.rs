//! UI module: retained document, view controller and terminal painter

mod dom;
mod terminal;
mod view_controller;

pub use dom::{Document, Element, ElementRef};
pub use terminal::TerminalPainter;
pub use view_controller::{connection_badge, ElementKey, StatusIcon, ViewController};
