//! Application Controller
//!
//! Owns start-up order and turns user events into state writes and
//! transport actions.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};
use std::sync::Once;
use std::time::Duration;

use crate::connection::{ClientAction, ConnectionManager};
use crate::data::{ConnectionStatus, NoticeKind, UiConfig};
use crate::state::{StateChange, StatePath, StateStore, Subscription, DEFAULT_STATUS};
use crate::ui::{ElementKey, ViewController};

pub const UNEXPECTED_ERROR_NOTICE: &str = "An unexpected error occurred. Please refresh the page.";
pub const NETWORK_ERROR_NOTICE: &str = "A network error occurred. Please check your connection.";

const SEND_LABEL: &str = "Send";
const SENDING_LABEL: &str = "Sending...";
const STARTING_LABEL: &str = "Starting...";
const RETRY_LABEL: &str = "Try Again";

static PANIC_HOOK: Once = Once::new();

/// Input produced by the kiosk's controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    TalkPressed,
    TalkReleased,
    /// Replace the text chat input's value.
    TextInput(String),
    /// Key press in the text chat input.
    InputKey { key: String, shift: bool },
    SendText,
    PersonalityChanged(Option<String>),
    ConfirmPersonality,
    DismissNotice(u64),
}

pub struct AppController {
    me: Weak<AppController>,
    store: StateStore,
    view: Rc<ViewController>,
    connection: Rc<dyn ConnectionManager>,
    send_reenable_delay: Duration,
    initialized: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl AppController {
    pub fn new(
        store: StateStore,
        view: Rc<ViewController>,
        connection: Rc<dyn ConnectionManager>,
        config: &UiConfig,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            store,
            view,
            connection,
            send_reenable_delay: config.send_reenable_delay(),
            initialized: Cell::new(false),
            subscriptions: RefCell::new(Vec::new()),
        })
    }

    /// Wire everything up. Later calls do nothing.
    pub fn init(&self) {
        if self.initialized.get() {
            return;
        }
        tracing::info!("Initializing Terry the Tube kiosk...");

        self.initialize_state_listeners();
        self.setup_error_boundaries();
        self.connection.connect();
        self.load_personalities();

        self.store.update([
            StateChange::DataCurrentStatus(DEFAULT_STATUS.to_string()),
            StateChange::UiPersonalityOverlayVisible(true),
            StateChange::UiTextChatEnabled(false),
        ]);

        self.initialized.set(true);
        tracing::info!("App initialization complete");
    }

    fn initialize_state_listeners(&self) {
        let listeners: [(StatePath, fn(&ViewController)); 6] = [
            (StatePath::ConnectionStatus, ViewController::update_connection_status),
            (StatePath::UiRecording, ViewController::update_recording_state),
            (StatePath::UiLoadingStates, ViewController::update_loading_states),
            (StatePath::DataCurrentStatus, ViewController::update_status),
            (StatePath::DataMessages, ViewController::update_messages),
            (StatePath::UiTextChatEnabled, ViewController::update_text_chat_visibility),
        ];

        let mut subscriptions = self.subscriptions.borrow_mut();
        for (path, update) in listeners {
            let view = Rc::downgrade(&self.view);
            subscriptions.push(self.store.subscribe(path, move |_, _, _| {
                if let Some(view) = view.upgrade() {
                    update(&view);
                }
            }));
        }
        tracing::debug!("State listeners initialized");
    }

    fn setup_error_boundaries(&self) {
        PANIC_HOOK.call_once(install_panic_hook);
    }

    /// Run `task` on the local set, turning a panic or an `Err` into a notice
    pub fn spawn_guarded<F>(&self, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        let view = Rc::downgrade(&self.view);
        let handle = tokio::task::spawn_local(task);

        tokio::task::spawn_local(async move {
            let notice = match handle.await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => {
                    tracing::error!("Unhandled task failure: {:#}", e);
                    NETWORK_ERROR_NOTICE
                }
                Err(e) if e.is_panic() => {
                    tracing::error!("Task panicked: {}", e);
                    UNEXPECTED_ERROR_NOTICE
                }
                Err(_) => return,
            };
            if let Some(view) = view.upgrade() {
                view.show_error(notice, NoticeKind::Error);
            }
        });
    }

    pub fn handle_event(&self, event: UiEvent) {
        tracing::debug!("UI event: {:?}", event);
        let Some(me) = self.me.upgrade() else {
            return;
        };

        match event {
            UiEvent::TalkPressed => self.spawn_guarded(async move {
                me.start_recording().await;
                Ok(())
            }),
            UiEvent::TalkReleased => self.spawn_guarded(async move {
                me.stop_recording().await;
                Ok(())
            }),
            UiEvent::TextInput(text) => {
                if let Some(input) = self.view.element(ElementKey::TextChatInput) {
                    input.borrow_mut().value = text;
                }
            }
            UiEvent::InputKey { key, shift } => {
                if key == "Enter" && !shift {
                    self.handle_event(UiEvent::SendText);
                }
            }
            UiEvent::SendText => self.spawn_guarded(async move {
                me.send_text_message().await;
                Ok(())
            }),
            UiEvent::PersonalityChanged(choice) => self.select_personality(choice),
            UiEvent::ConfirmPersonality => self.spawn_guarded(async move {
                me.confirm_personality_selection().await;
                Ok(())
            }),
            UiEvent::DismissNotice(id) => self.view.remove_error(id),
        }
    }

    pub async fn start_recording(&self) {
        let (recording, status) = self
            .store
            .read(|s| (s.ui.recording, s.connection.status));

        if status != ConnectionStatus::Connected {
            self.view
                .show_error("Cannot record - not connected to server", NoticeKind::Error);
            return;
        }
        if recording {
            return;
        }

        self.store.set(StateChange::UiRecording(true));
        if self.connection.send_message(ClientAction::StartRecording).await {
            tracing::info!("Recording started");
        } else {
            self.store.set(StateChange::UiRecording(false));
        }
    }

    pub async fn stop_recording(&self) {
        let (recording, status) = self
            .store
            .read(|s| (s.ui.recording, s.connection.status));

        if !recording {
            return;
        }
        if status != ConnectionStatus::Connected {
            self.view.show_error(
                "Cannot stop recording - not connected to server",
                NoticeKind::Error,
            );
            return;
        }

        self.store.set(StateChange::UiRecording(false));
        if self.connection.send_message(ClientAction::StopRecording).await {
            tracing::info!("Recording stopped");
            self.store
                .set(StateChange::UiLoadingGeneratingResponse(true));
        } else {
            self.store.set(StateChange::UiRecording(true));
        }
    }

    /// Send the input's text. The controls stay disabled for the re-enable
    /// delay whether or not the send succeeded.
    pub async fn send_text_message(&self) {
        let (Some(input), Some(button)) = (
            self.view.element(ElementKey::TextChatInput),
            self.view.element(ElementKey::TextChatSendBtn),
        ) else {
            self.view
                .show_error("Text chat interface not available", NoticeKind::Error);
            return;
        };

        let message = input.borrow().value.trim().to_string();
        if message.is_empty() {
            return;
        }
        if self.store.read(|s| s.ui.loading.sending_message) || input.borrow().disabled {
            tracing::debug!("Text message already in flight");
            return;
        }

        self.store.set(StateChange::UiLoadingSendingMessage(true));
        input.borrow_mut().disabled = true;
        {
            let mut button = button.borrow_mut();
            button.disabled = true;
            button.text = SENDING_LABEL.to_string();
        }

        let sent = self
            .connection
            .send_message(ClientAction::SendTextMessage { message })
            .await;
        if sent {
            input.borrow_mut().value.clear();
        } else {
            self.view.show_error(
                "Failed to send message - not connected to server",
                NoticeKind::Error,
            );
        }

        tokio::time::sleep(self.send_reenable_delay).await;
        input.borrow_mut().disabled = false;
        {
            let mut button = button.borrow_mut();
            button.disabled = false;
            button.text = SEND_LABEL.to_string();
        }
        self.store.set(StateChange::UiLoadingSendingMessage(false));
    }

    /// Dropdown change: remember the choice and gate the confirm button
    pub fn select_personality(&self, choice: Option<String>) {
        let choice = choice.filter(|key| !key.is_empty());

        if let Some(dropdown) = self.view.element(ElementKey::PersonalityDropdown) {
            dropdown.borrow_mut().value = choice.clone().unwrap_or_default();
        }
        if let Some(button) = self.view.element(ElementKey::ConfirmPersonalityBtn) {
            button.borrow_mut().disabled = choice.is_none();
        }
        self.store.set(StateChange::DataSelectedPersonality(choice));
    }

    /// Hide the overlay as soon as the selection is sent; bring it back with
    /// a retry label if the send fails.
    pub async fn confirm_personality_selection(&self) {
        let (selected, status) = self.store.read(|s| {
            (
                s.data.selected_personality.clone(),
                s.connection.status,
            )
        });

        let Some(personality) = selected else {
            self.view
                .show_error("Please select a personality first", NoticeKind::Error);
            return;
        };
        if status != ConnectionStatus::Connected {
            self.view.show_error(
                "Cannot set personality - not connected to server",
                NoticeKind::Error,
            );
            return;
        }

        let button = self.view.element(ElementKey::ConfirmPersonalityBtn);
        let overlay = self.view.element(ElementKey::PersonalityOverlay);

        if let Some(button) = &button {
            let mut button = button.borrow_mut();
            button.text = STARTING_LABEL.to_string();
            button.disabled = true;
        }
        if let Some(overlay) = &overlay {
            overlay.borrow_mut().add_class("hidden");
        }
        self.store
            .set(StateChange::UiPersonalityOverlayVisible(false));

        let sent = self
            .connection
            .send_message(ClientAction::SelectPersonality { personality })
            .await;

        if !sent {
            if let Some(overlay) = &overlay {
                overlay.borrow_mut().remove_class("hidden");
            }
            if let Some(button) = &button {
                let mut button = button.borrow_mut();
                button.text = RETRY_LABEL.to_string();
                button.disabled = false;
            }
            self.store
                .set(StateChange::UiPersonalityOverlayVisible(true));
        }
    }

    pub fn load_personalities(&self) {
        let connection = self.connection.clone();
        self.spawn_guarded(async move {
            connection.request_personalities().await;
            Ok(())
        });
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn view(&self) -> &Rc<ViewController> {
        &self.view
    }
}

/// Log panics through tracing, then hand them to the hook that was
/// installed before
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("Global error: {}", info);
        previous(info);
    }));
}
