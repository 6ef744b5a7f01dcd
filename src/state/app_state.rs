//! The nested application state record

use crate::connection::SocketHandle;
use crate::data::{
    ConnectionStatus, KioskConfig, LinkQuality, LoadingStates, Message, Notice, PersonalityInfo,
};

pub const DEFAULT_STATUS: &str = "Ready to serve beer!";

/// Transport section
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub socket: Option<SocketHandle>,
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay in milliseconds.
    pub reconnect_delay_ms: u64,
    pub quality: LinkQuality,
    /// Epoch milliseconds of the last inbound message.
    pub last_ping: Option<i64>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            socket: None,
            reconnect_attempts: 0,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
            quality: LinkQuality::Unknown,
            last_ping: None,
        }
    }
}

/// Transient view flags
#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub recording: bool,
    pub text_chat_enabled: bool,
    pub text_only_mode: bool,
    pub personality_overlay_visible: bool,
    pub last_message_count: u32,
    pub last_status: String,
    pub errors: Vec<Notice>,
    pub loading: LoadingStates,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            recording: false,
            text_chat_enabled: false,
            text_only_mode: false,
            personality_overlay_visible: true,
            last_message_count: 0,
            last_status: String::new(),
            errors: Vec::new(),
            loading: LoadingStates::default(),
        }
    }
}

/// Domain data
#[derive(Debug, Clone, PartialEq)]
pub struct DataState {
    pub available_personalities: Vec<PersonalityInfo>,
    pub selected_personality: Option<String>,
    pub messages: Vec<Message>,
    pub current_status: String,
    pub personality_info: Option<PersonalityInfo>,
}

impl Default for DataState {
    fn default() -> Self {
        Self {
            available_personalities: Vec::new(),
            selected_personality: None,
            messages: Vec::new(),
            current_status: DEFAULT_STATUS.to_string(),
            personality_info: None,
        }
    }
}

/// The whole client state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub connection: ConnectionState,
    pub ui: UiState,
    pub data: DataState,
}

impl AppState {
    /// Initial state with reconnect tuning taken from the configuration
    pub fn from_config(config: &KioskConfig) -> Self {
        let mut state = Self::default();
        state.connection.max_reconnect_attempts = config.connection.max_reconnect_attempts;
        state.connection.reconnect_delay_ms = config.connection.reconnect_delay_ms;
        state
    }
}
