//! View Controller
//!
//! Translates state into document mutations. Element handles are looked up
//! once at construction; anything missing from the page turns the matching
//! update into a no-op.

use chrono::Utc;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::rc::{Rc, Weak};
use std::time::Duration;

use super::dom::{Document, Element, ElementRef};
use crate::data::{now_millis, ConnectionStatus, Message, Notice, NoticeKind, UiConfig};
use crate::state::{Section, SectionRenderer, StateChange, StatePath, StateStore};

const DEFAULT_PERSONALITY_LABEL: &str = "Your AI Bartender";
const CONFIRM_LABEL: &str = "Start Your Beer Journey";
const TALK_IDLE_LABEL: &str = "Hold to Talk";
const TALK_ACTIVE_LABEL: &str = "Release to Stop";

/// Logical handles cached by the view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKey {
    ConnectionIndicator,
    ConnectionText,
    ConnectionDot,
    RecordingIndicator,
    Status,
    Messages,
    ResponseLoading,
    TtsLoading,
    PersonalityOverlay,
    PersonalityDisplay,
    PersonalityDropdown,
    ConfirmPersonalityBtn,
    TextChatContainer,
    TextChatInput,
    TextChatSendBtn,
    TalkButton,
}

impl ElementKey {
    pub const ALL: [ElementKey; 16] = [
        Self::ConnectionIndicator,
        Self::ConnectionText,
        Self::ConnectionDot,
        Self::RecordingIndicator,
        Self::Status,
        Self::Messages,
        Self::ResponseLoading,
        Self::TtsLoading,
        Self::PersonalityOverlay,
        Self::PersonalityDisplay,
        Self::PersonalityDropdown,
        Self::ConfirmPersonalityBtn,
        Self::TextChatContainer,
        Self::TextChatInput,
        Self::TextChatSendBtn,
        Self::TalkButton,
    ];

    /// Element id in the page
    pub fn id(&self) -> &'static str {
        match self {
            Self::ConnectionIndicator => "connectionIndicator",
            Self::ConnectionText => "connectionText",
            Self::ConnectionDot => "connectionDot",
            Self::RecordingIndicator => "recordingIndicator",
            Self::Status => "status",
            Self::Messages => "messages",
            Self::ResponseLoading => "responseLoading",
            Self::TtsLoading => "ttsLoading",
            Self::PersonalityOverlay => "personalityOverlay",
            Self::PersonalityDisplay => "personalityDisplay",
            Self::PersonalityDropdown => "personalityDropdown",
            Self::ConfirmPersonalityBtn => "confirmPersonalityBtn",
            Self::TextChatContainer => "textChatContainer",
            Self::TextChatInput => "textChatInput",
            Self::TextChatSendBtn => "textChatSendBtn",
            Self::TalkButton => "talkButton",
        }
    }
}

/// Icon shown next to the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIcon {
    Microphone,
    Processing,
    Speaker,
    Beer,
    Check,
}

impl StatusIcon {
    /// Ordered substring checks; the first match wins
    pub fn for_status(status: &str) -> Self {
        if status.contains("Recording") {
            Self::Microphone
        } else if status.contains("Processing") {
            Self::Processing
        } else if status.contains("Speaking") {
            Self::Speaker
        } else if status.to_lowercase().contains("beer") {
            Self::Beer
        } else {
            Self::Check
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Microphone => "microphone",
            Self::Processing => "processing",
            Self::Speaker => "speaker",
            Self::Beer => "beer",
            Self::Check => "check",
        }
    }
}

/// CSS state class and label for the connection badge
pub fn connection_badge(status: ConnectionStatus, attempts: u32, max: u32) -> (&'static str, String) {
    match status {
        ConnectionStatus::Connected => ("connected", "Connected".to_string()),
        ConnectionStatus::Connecting if attempts > 0 => {
            ("connecting", format!("Connecting ({}/{})", attempts, max))
        }
        ConnectionStatus::Connecting => ("connecting", "Connecting...".to_string()),
        ConnectionStatus::Disconnected => ("disconnected", "Disconnected".to_string()),
        ConnectionStatus::Error => ("disconnected", "Connection Error".to_string()),
    }
}

/// Renders state into the kiosk document
pub struct ViewController {
    me: Weak<ViewController>,
    store: StateStore,
    document: Rc<Document>,
    elements: HashMap<ElementKey, ElementRef>,
    toast_duration: Duration,
    last_notice_id: Cell<u64>,
}

impl ViewController {
    pub fn new(store: StateStore, document: Rc<Document>, config: &UiConfig) -> Rc<Self> {
        let elements = ElementKey::ALL
            .iter()
            .filter_map(|key| document.element_by_id(key.id()).map(|el| (*key, el)))
            .collect::<HashMap<_, _>>();

        if elements.len() < ElementKey::ALL.len() {
            tracing::debug!(
                "View cached {}/{} elements",
                elements.len(),
                ElementKey::ALL.len()
            );
        }

        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            store,
            document,
            elements,
            toast_duration: config.toast_duration(),
            last_notice_id: Cell::new(0),
        })
    }

    pub fn element(&self, key: ElementKey) -> Option<ElementRef> {
        self.elements.get(&key).cloned()
    }

    pub fn document(&self) -> &Rc<Document> {
        &self.document
    }

    pub fn update_connection_status(&self) {
        let (Some(indicator), Some(text)) = (
            self.element(ElementKey::ConnectionIndicator),
            self.element(ElementKey::ConnectionText),
        ) else {
            return;
        };

        let (status, attempts, max) = self.store.read(|s| {
            (
                s.connection.status,
                s.connection.reconnect_attempts,
                s.connection.max_reconnect_attempts,
            )
        });
        let (class, label) = connection_badge(status, attempts, max);

        let mut indicator = indicator.borrow_mut();
        for state in ["connected", "connecting", "disconnected"] {
            indicator.remove_class(state);
        }
        indicator.add_class(class);
        text.borrow_mut().text = label;
    }

    pub fn update_recording_state(&self) {
        let recording = self.store.read(|s| s.ui.recording);

        if let Some(indicator) = self.element(ElementKey::RecordingIndicator) {
            indicator.borrow_mut().visible = recording;
        }
        if let Some(button) = self.element(ElementKey::TalkButton) {
            let mut button = button.borrow_mut();
            button.text = if recording { TALK_ACTIVE_LABEL } else { TALK_IDLE_LABEL }.to_string();
            button.toggle_class("recording", recording);
        }
    }

    pub fn update_loading_states(&self) {
        let loading = self.store.read(|s| s.ui.loading);

        if let Some(el) = self.element(ElementKey::ResponseLoading) {
            el.borrow_mut().toggle_class("show", loading.generating_response);
        }
        if let Some(el) = self.element(ElementKey::TtsLoading) {
            el.borrow_mut().toggle_class("show", loading.generating_audio);
        }
    }

    pub fn update_status(&self) {
        let Some(el) = self.element(ElementKey::Status) else {
            return;
        };
        let status = self.store.read(|s| s.data.current_status.clone());
        if status.is_empty() {
            return;
        }

        let icon = StatusIcon::for_status(&status);
        let mut el = el.borrow_mut();
        el.set_attr("icon", icon.name());
        el.text = status;
    }

    /// Append new messages, rebuild on a session reset, reveal released ones.
    pub fn update_messages(&self) {
        let Some(container) = self.element(ElementKey::Messages) else {
            return;
        };

        let (messages, last_count) = self
            .store
            .read(|s| (s.data.messages.clone(), s.ui.last_message_count as usize));

        if messages.len() > last_count {
            for (index, msg) in messages.iter().enumerate().skip(last_count) {
                self.document
                    .append_child(&container, message_element(msg, index));
            }
            container.borrow_mut().scrolled_to_end = true;
            self.store
                .set(StateChange::UiLastMessageCount(messages.len() as u32));
        } else if messages.len() < last_count {
            tracing::debug!(
                "Message list shrank from {} to {}, rebuilding",
                last_count,
                messages.len()
            );
            container.borrow_mut().clear_children();
            self.store.set(StateChange::UiLastMessageCount(0));

            for (index, msg) in messages.iter().enumerate() {
                self.document
                    .append_child(&container, message_element(msg, index));
            }
            container.borrow_mut().scrolled_to_end = true;
            self.store
                .set(StateChange::UiLastMessageCount(messages.len() as u32));
        }

        let container = container.borrow();
        for node in &container.children {
            let mut node = node.borrow_mut();
            let released = node
                .attr("data-message-id")
                .and_then(|id| id.parse::<usize>().ok())
                .and_then(|index| messages.get(index))
                .is_some_and(|msg| msg.show_immediately);

            if released && node.has_class("pending") {
                node.remove_class("pending");
                node.add_class("show");
            }
        }
    }

    /// Show or hide the personality overlay.
    ///
    /// The dropdown is reset only when the overlay goes from hidden to
    /// visible, never while it stays up.
    pub fn update_personality_state(&self) {
        let (overlay_visible, info) = self.store.read(|s| {
            (
                s.ui.personality_overlay_visible,
                s.data.personality_info.clone(),
            )
        });
        let overlay = self.element(ElementKey::PersonalityOverlay);
        let display = self.element(ElementKey::PersonalityDisplay);

        if overlay_visible {
            let was_hidden = overlay.is_some_and(|overlay| {
                let mut overlay = overlay.borrow_mut();
                let was_hidden = overlay.has_class("hidden");
                overlay.remove_class("hidden");
                was_hidden
            });

            if was_hidden {
                self.reset_personality_selection();
            }
            if let Some(display) = display {
                display.borrow_mut().text = DEFAULT_PERSONALITY_LABEL.to_string();
            }
        } else {
            if let Some(overlay) = overlay {
                overlay.borrow_mut().add_class("hidden");
            }
            if let (Some(display), Some(info)) = (display, info) {
                display.borrow_mut().text = format!("{} Bartender", info.display_name());
            }
        }
    }

    pub fn update_text_chat_visibility(&self) {
        let enabled = self.store.read(|s| s.ui.text_chat_enabled);
        if let Some(container) = self.element(ElementKey::TextChatContainer) {
            container.borrow_mut().visible = enabled;
        }
    }

    pub fn reset_personality_selection(&self) {
        if let Some(dropdown) = self.element(ElementKey::PersonalityDropdown) {
            dropdown.borrow_mut().value.clear();
        }
        if let Some(button) = self.element(ElementKey::ConfirmPersonalityBtn) {
            let mut button = button.borrow_mut();
            button.text = CONFIRM_LABEL.to_string();
            button.disabled = true;
        }
    }

    /// Rebuild the dropdown options from `data.availablePersonalities`
    pub fn populate_personality_dropdown(&self) {
        let Some(dropdown) = self.element(ElementKey::PersonalityDropdown) else {
            return;
        };
        let personalities = self.store.read(|s| s.data.available_personalities.clone());

        let mut dropdown = dropdown.borrow_mut();
        dropdown.clear_children();
        dropdown.append(
            Element::new("option")
                .with_attr("value", "")
                .with_text("Choose a personality...")
                .into_ref(),
        );
        for personality in &personalities {
            dropdown.append(
                Element::new("option")
                    .with_attr("value", &personality.key)
                    .with_text(&personality.name)
                    .into_ref(),
            );
        }

        if !personalities.iter().any(|p| p.key == dropdown.value) {
            dropdown.value.clear();
        }
    }

    /// Record a notice, show its toast and expire it after the toast duration.
    pub fn show_error(&self, message: &str, kind: NoticeKind) -> u64 {
        let id = self.next_notice_id();
        let notice = Notice {
            id,
            message: message.to_string(),
            kind,
            created_at: Utc::now(),
        };

        match kind {
            NoticeKind::Error => tracing::warn!("Notice #{}: {}", id, message),
            NoticeKind::Info => tracing::info!("Notice #{}: {}", id, message),
        }

        let mut errors = self.store.read(|s| s.ui.errors.clone());
        errors.push(notice.clone());
        self.store.set(StateChange::UiErrors(errors));
        self.create_toast(&notice);

        let me = self.me.clone();
        let delay = self.toast_duration;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if let Some(view) = me.upgrade() {
                view.remove_error(id);
            }
        });

        id
    }

    pub fn show_info(&self, message: &str) -> u64 {
        self.show_error(message, NoticeKind::Info)
    }

    /// Drop a notice from the state and its toast from the page
    pub fn remove_error(&self, id: u64) {
        let mut errors = self.store.read(|s| s.ui.errors.clone());
        let before = errors.len();
        errors.retain(|notice| notice.id != id);
        if errors.len() != before {
            self.store.set(StateChange::UiErrors(errors));
        }

        if let Some(toast) = self.document.find_by_attr("data-error-id", &id.to_string()) {
            toast.borrow_mut().remove_class("show");
            self.document.remove(&toast);
        }
    }

    fn create_toast(&self, notice: &Notice) {
        let container = match self.document.find_by_class("toast-container") {
            Some(container) => container,
            None => {
                let container = Element::new("div").with_class("toast-container").into_ref();
                self.document.append_child(&self.document.body(), container.clone());
                container
            }
        };

        let (class, icon) = match notice.kind {
            NoticeKind::Error => ("toast-error", "exclamation-triangle"),
            NoticeKind::Info => ("toast-info", "info-circle"),
        };
        let toast = Element::new("div")
            .with_class("toast")
            .with_class(class)
            .with_class("show")
            .with_attr("data-error-id", &notice.id.to_string())
            .with_attr("icon", icon)
            .with_text(&notice.message)
            .into_ref();
        self.document.append_child(&container, toast);
    }

    fn next_notice_id(&self) -> u64 {
        let now = u64::try_from(now_millis()).unwrap_or(0);
        let id = now.max(self.last_notice_id.get() + 1);
        self.last_notice_id.set(id);
        id
    }
}

impl SectionRenderer for ViewController {
    fn render_section(&self, section: Section, pending: &BTreeSet<StatePath>) {
        match section {
            Section::Connection => self.update_connection_status(),
            Section::Ui => {
                if pending.contains(&StatePath::UiRecording) {
                    self.update_recording_state();
                }
                if pending
                    .iter()
                    .any(|path| path.is_within(StatePath::UiLoadingStates))
                {
                    self.update_loading_states();
                }
            }
            Section::Data => {
                if pending.contains(&StatePath::DataMessages) {
                    self.update_messages();
                }
                if pending.contains(&StatePath::DataCurrentStatus) {
                    self.update_status();
                }
            }
        }
    }
}

fn message_element(msg: &Message, index: usize) -> ElementRef {
    let visibility = if msg.show_immediately { "show" } else { "pending" };
    let origin = if msg.is_ai { "ai-message" } else { "user-message" };

    let node = Element::new("div")
        .with_class("message")
        .with_class(visibility)
        .with_class(origin)
        .with_attr("data-message-id", &index.to_string())
        .into_ref();
    {
        let mut node = node.borrow_mut();
        node.append(
            Element::new("div")
                .with_class("message-bubble")
                .with_text(&msg.message)
                .into_ref(),
        );
        node.append(
            Element::new("div")
                .with_class("message-info")
                .with_attr("icon", if msg.is_ai { "robot" } else { "user" })
                .with_attr("timestamp", &msg.timestamp)
                .with_text(&msg.sender)
                .into_ref(),
        );
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PersonalityInfo;
    use crate::state::{AppState, ManualFrames};

    fn view() -> (StateStore, Rc<ViewController>) {
        let store = StateStore::new(AppState::default(), ManualFrames::default());
        let view = ViewController::new(
            store.clone(),
            Rc::new(Document::kiosk()),
            &UiConfig::default(),
        );
        (store, view)
    }

    fn msg(text: &str, show: bool) -> Message {
        Message {
            sender: "Terry".into(),
            message: text.into(),
            is_ai: true,
            timestamp: "12:00".into(),
            show_immediately: show,
        }
    }

    fn message_nodes(view: &ViewController) -> Vec<ElementRef> {
        let container = view.element(ElementKey::Messages).unwrap();
        let children = container.borrow().children.clone();
        children
    }

    #[test]
    fn status_icon_checks_in_order() {
        assert_eq!(StatusIcon::for_status("Recording... Processing"), StatusIcon::Microphone);
        assert_eq!(StatusIcon::for_status("Processing speech"), StatusIcon::Processing);
        assert_eq!(StatusIcon::for_status("Speaking about Beer"), StatusIcon::Speaker);
        assert_eq!(StatusIcon::for_status("Ready to serve BEER"), StatusIcon::Beer);
        assert_eq!(StatusIcon::for_status("Idle"), StatusIcon::Check);
    }

    #[test]
    fn connecting_label_shows_attempts_only_after_first_retry() {
        assert_eq!(
            connection_badge(ConnectionStatus::Connecting, 0, 5),
            ("connecting", "Connecting...".to_string())
        );
        assert_eq!(
            connection_badge(ConnectionStatus::Connecting, 2, 5),
            ("connecting", "Connecting (2/5)".to_string())
        );
        assert_eq!(
            connection_badge(ConnectionStatus::Error, 0, 5).0,
            "disconnected"
        );
    }

    #[test]
    fn connection_badge_swaps_state_class() {
        let (store, view) = view();
        store.set(StateChange::ConnectionStatus(ConnectionStatus::Connected));
        view.update_connection_status();

        let indicator = view.element(ElementKey::ConnectionIndicator).unwrap();
        assert!(indicator.borrow().has_class("connected"));
        assert!(!indicator.borrow().has_class("disconnected"));
        assert_eq!(
            view.element(ElementKey::ConnectionText).unwrap().borrow().text,
            "Connected"
        );
    }

    #[test]
    fn growing_list_appends_only_new_nodes() {
        let (store, view) = view();
        store.set(StateChange::DataMessages(vec![msg("a", true), msg("b", true)]));
        view.update_messages();
        let first = message_nodes(&view);
        assert_eq!(first.len(), 2);

        store.set(StateChange::DataMessages(vec![
            msg("a", true),
            msg("b", true),
            msg("c", true),
            msg("d", true),
            msg("e", true),
        ]));
        view.update_messages();

        let after = message_nodes(&view);
        assert_eq!(after.len(), 5);
        assert!(Rc::ptr_eq(&first[0], &after[0]));
        assert!(Rc::ptr_eq(&first[1], &after[1]));
        assert_eq!(store.read(|s| s.ui.last_message_count), 5);

        // A repeat call with the same list adds nothing.
        view.update_messages();
        assert_eq!(message_nodes(&view).len(), 5);
    }

    #[test]
    fn shrinking_list_rebuilds_from_scratch() {
        let (store, view) = view();
        store.set(StateChange::DataMessages(vec![msg("x", true); 5]));
        view.update_messages();
        let old = message_nodes(&view);

        store.set(StateChange::DataMessages(vec![msg("fresh", true)]));
        view.update_messages();
        let rebuilt = message_nodes(&view);
        assert_eq!(rebuilt.len(), 1);
        assert!(!Rc::ptr_eq(&old[0], &rebuilt[0]));
        assert_eq!(store.read(|s| s.ui.last_message_count), 1);

        store.set(StateChange::DataMessages(Vec::new()));
        view.update_messages();
        assert!(message_nodes(&view).is_empty());
        assert_eq!(store.read(|s| s.ui.last_message_count), 0);
    }

    #[test]
    fn pending_messages_are_revealed_once_released() {
        let (store, view) = view();
        store.set(StateChange::DataMessages(vec![msg("hi", true), msg("held", false)]));
        view.update_messages();
        let nodes = message_nodes(&view);
        assert!(nodes[1].borrow().has_class("pending"));

        store.set(StateChange::DataMessages(vec![
            msg("hi", true),
            msg("held", true),
            msg("new", true),
        ]));
        view.update_messages();

        let nodes = message_nodes(&view);
        assert_eq!(nodes.len(), 3);
        let held = nodes[1].borrow();
        assert!(held.has_class("show") && !held.has_class("pending"));
        let fresh = nodes[2].borrow();
        assert!(fresh.has_class("show") && !fresh.has_class("pending"));
    }

    #[test]
    fn overlay_reset_happens_only_on_hidden_to_visible() {
        let (store, view) = view();
        let dropdown = view.element(ElementKey::PersonalityDropdown).unwrap();
        let overlay = view.element(ElementKey::PersonalityOverlay).unwrap();

        // Visible and staying visible: an in-progress choice survives.
        dropdown.borrow_mut().value = "classic".into();
        view.update_personality_state();
        assert_eq!(dropdown.borrow().value, "classic");

        store.update([
            StateChange::UiPersonalityOverlayVisible(false),
            StateChange::DataPersonalityInfo(Some(PersonalityInfo {
                key: "classic".into(),
                name: "Classic Terry".into(),
                short_name: Some("Classic".into()),
            })),
        ]);
        view.update_personality_state();
        assert!(overlay.borrow().has_class("hidden"));
        assert_eq!(
            view.element(ElementKey::PersonalityDisplay).unwrap().borrow().text,
            "Classic Bartender"
        );

        store.set(StateChange::UiPersonalityOverlayVisible(true));
        view.update_personality_state();
        assert!(!overlay.borrow().has_class("hidden"));
        assert!(dropdown.borrow().value.is_empty());
        let confirm = view.element(ElementKey::ConfirmPersonalityBtn).unwrap();
        assert_eq!(confirm.borrow().text, CONFIRM_LABEL);
        assert!(confirm.borrow().disabled);
    }

    #[test]
    fn dropdown_lists_personalities_after_placeholder() {
        let (store, view) = view();
        store.set(StateChange::DataAvailablePersonalities(vec![
            PersonalityInfo {
                key: "classic".into(),
                name: "Classic Terry".into(),
                short_name: None,
            },
            PersonalityInfo {
                key: "librarian".into(),
                name: "Librarian".into(),
                short_name: None,
            },
        ]));
        view.populate_personality_dropdown();

        let dropdown = view.element(ElementKey::PersonalityDropdown).unwrap();
        let values: Vec<String> = dropdown
            .borrow()
            .children
            .iter()
            .map(|o| o.borrow().attr("value").unwrap_or_default().to_string())
            .collect();
        assert_eq!(values, vec!["", "classic", "librarian"]);
    }

    #[test]
    fn section_render_covers_loading_leaves() {
        let (store, view) = view();
        store.set(StateChange::UiLoadingGeneratingResponse(true));
        store.flush_renders();
        // No renderer attached yet, so nothing changed.
        let spinner = view.element(ElementKey::ResponseLoading).unwrap();
        assert!(!spinner.borrow().has_class("show"));

        let as_dyn: Rc<dyn SectionRenderer> = view.clone();
        store.set_renderer(Rc::downgrade(&as_dyn));
        store.set(StateChange::UiLoadingGeneratingResponse(true));
        store.set(StateChange::DataCurrentStatus("Processing your words".into()));
        store.flush_renders();

        assert!(spinner.borrow().has_class("show"));
        let status = view.element(ElementKey::Status).unwrap();
        assert_eq!(status.borrow().attr("icon"), Some("processing"));
    }

    #[test]
    fn missing_elements_turn_updates_into_no_ops() {
        let store = StateStore::new(AppState::default(), ManualFrames::default());
        let bare = Rc::new(Document::new(Element::new("body").into_ref()));
        let view = ViewController::new(store.clone(), bare, &UiConfig::default());

        store.set(StateChange::DataMessages(vec![msg("a", true)]));
        view.update_connection_status();
        view.update_recording_state();
        view.update_loading_states();
        view.update_status();
        view.update_messages();
        view.update_personality_state();
        view.update_text_chat_visibility();
        view.populate_personality_dropdown();
        assert_eq!(store.read(|s| s.ui.last_message_count), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn toast_expires_after_its_duration() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (store, view) = view();
                let id = view.show_error("Connection error occurred", NoticeKind::Error);

                assert_eq!(store.read(|s| s.ui.errors.len()), 1);
                let toast = view
                    .document()
                    .find_by_attr("data-error-id", &id.to_string())
                    .unwrap();
                assert!(toast.borrow().has_class("toast-error"));

                tokio::time::sleep(Duration::from_millis(4900)).await;
                assert_eq!(store.read(|s| s.ui.errors.len()), 1);

                tokio::time::sleep(Duration::from_millis(200)).await;
                assert!(store.read(|s| s.ui.errors.is_empty()));
                assert!(view
                    .document()
                    .find_by_attr("data-error-id", &id.to_string())
                    .is_none());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn dismissed_toast_is_not_removed_twice() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let (store, view) = view();
                let first = view.show_error("first", NoticeKind::Error);
                let second = view.show_info("second");
                assert!(second > first);

                view.remove_error(first);
                let remaining: Vec<u64> = store.read(|s| s.ui.errors.iter().map(|n| n.id).collect());
                assert_eq!(remaining, vec![second]);

                tokio::time::sleep(Duration::from_secs(6)).await;
                assert!(store.read(|s| s.ui.errors.is_empty()));
            })
            .await;
    }
}
