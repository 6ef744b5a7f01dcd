//! Terminal painter
//!
//! Draws the visible part of the document as plain text lines.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use super::dom::{Document, Element, ElementRef};

fn glyph(icon: &str) -> &'static str {
    match icon {
        "microphone" => "🎤",
        "processing" => "⚙️",
        "speaker" => "🔊",
        "beer" => "🍺",
        "check" => "✅",
        "robot" => "🤖",
        "user" => "🧑",
        "exclamation-triangle" => "⚠️",
        "info-circle" => "ℹ️",
        _ => "•",
    }
}

/// Paints the document to stdout whenever its text form changes
pub struct TerminalPainter {
    document: Rc<Document>,
    last_frame: RefCell<String>,
}

impl TerminalPainter {
    pub fn new(document: Rc<Document>) -> Self {
        Self {
            document,
            last_frame: RefCell::new(String::new()),
        }
    }

    /// Text form of everything currently visible
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        render_node(&self.document.body(), 0, &mut lines);
        lines.join("\n")
    }

    /// Print a new frame if anything changed; returns whether it printed
    pub fn paint(&self) -> io::Result<bool> {
        let frame = self.render();
        if *self.last_frame.borrow() == frame {
            return Ok(false);
        }

        let mut out = io::stdout().lock();
        writeln!(out, "────────────────────────────────────────")?;
        writeln!(out, "{}", frame)?;
        out.flush()?;

        *self.last_frame.borrow_mut() = frame;
        Ok(true)
    }
}

fn is_shown(el: &Element) -> bool {
    if !el.visible || el.has_class("hidden") || el.has_class("pending") {
        return false;
    }
    if el.has_class("loading") || el.has_class("toast") {
        return el.has_class("show");
    }
    true
}

fn render_node(node: &ElementRef, depth: usize, lines: &mut Vec<String>) {
    let el = node.borrow();
    if !is_shown(&el) {
        return;
    }
    let indent = "  ".repeat(depth);

    if el.has_class("connection-indicator") {
        let dot = if el.has_class("connected") {
            "●"
        } else if el.has_class("connecting") {
            "◌"
        } else {
            "○"
        };
        let label = el
            .children
            .iter()
            .map(|c| c.borrow().text.clone())
            .find(|t| !t.is_empty())
            .unwrap_or_default();
        lines.push(format!("{}{} {}", indent, dot, label));
        return;
    }

    if el.has_class("message") {
        let mut body = String::new();
        let mut info = String::new();
        for child in &el.children {
            let child = child.borrow();
            if child.has_class("message-bubble") {
                body = child.text.clone();
            } else if child.has_class("message-info") {
                info = format!(
                    "{} {} {}",
                    glyph(child.attr("icon").unwrap_or_default()),
                    child.attr("timestamp").unwrap_or_default(),
                    child.text
                );
            }
        }
        lines.push(format!("{}{}: {}", indent, info.trim(), body));
        return;
    }

    match el.tag.as_str() {
        "select" => {
            for (n, option) in el.children.iter().enumerate() {
                let option = option.borrow();
                let value = option.attr("value").unwrap_or_default();
                if value.is_empty() {
                    lines.push(format!("{}{}", indent, option.text));
                } else {
                    let marker = if value == el.value { "▶" } else { " " };
                    lines.push(format!("{}{} {}) {}", indent, marker, n, option.text));
                }
            }
            return;
        }
        "option" => return,
        "button" => {
            let state = if el.disabled { " (disabled)" } else { "" };
            lines.push(format!("{}[ {} ]{}", indent, el.text, state));
            return;
        }
        "input" => {
            let shown = if el.value.is_empty() {
                el.attr("placeholder").unwrap_or_default().to_string()
            } else {
                el.value.clone()
            };
            let state = if el.disabled { " (disabled)" } else { "" };
            lines.push(format!("{}> {}{}", indent, shown, state));
            return;
        }
        _ => {}
    }

    let mut child_depth = depth;
    if !el.text.is_empty() {
        match el.attr("icon") {
            Some(icon) => lines.push(format!("{}{} {}", indent, glyph(icon), el.text)),
            None => lines.push(format!("{}{}", indent, el.text)),
        }
        child_depth += 1;
    }
    for child in &el.children {
        render_node(child, child_depth, lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_page_shows_overlay_and_hides_spinners() {
        let painter = TerminalPainter::new(Rc::new(Document::kiosk()));
        let frame = painter.render();

        assert!(frame.contains("TERRY THE TUBE"));
        assert!(frame.contains("○ Disconnected"));
        assert!(frame.contains("🍺 Ready to serve beer!"));
        assert!(frame.contains("[ Start Your Beer Journey ] (disabled)"));
        assert!(!frame.contains("Recording..."));
        assert!(!frame.contains("Terry is thinking..."));
        assert!(!frame.contains("Type a message..."));
    }

    #[test]
    fn pending_messages_stay_off_screen() {
        let doc = Rc::new(Document::kiosk());
        let messages = doc.element_by_id("messages").unwrap();
        for (id, (text, class)) in [("Cheers", "show"), ("Not yet", "pending")].iter().enumerate() {
            let node = Element::new("div")
                .with_class("message")
                .with_class(class)
                .with_attr("data-message-id", &id.to_string())
                .into_ref();
            node.borrow_mut().append(
                Element::new("div")
                    .with_class("message-bubble")
                    .with_text(text)
                    .into_ref(),
            );
            doc.append_child(&messages, node);
        }

        let frame = TerminalPainter::new(doc).render();
        assert!(frame.contains(": Cheers"));
        assert!(!frame.contains("Not yet"));
    }
}
