//! Typed key paths into [`AppState`]
//!
//! Every addressable location has a [`StatePath`]. Writes go through
//! [`StateChange`], which pairs a path with a value of the right type, and
//! reads come back as a [`StateValue`].

use std::fmt;
use std::str::FromStr;

use super::app_state::AppState;
use crate::connection::SocketHandle;
use crate::data::{
    ConnectionStatus, LinkQuality, LoadingStates, Message, Notice, PersonalityInfo,
};

/// Top-level section of the state tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    Connection,
    Ui,
    Data,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Ui => "ui",
            Self::Data => "data",
        }
    }
}

/// A known location in the state tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatePath {
    ConnectionStatus,
    ConnectionSocket,
    ConnectionReconnectAttempts,
    ConnectionMaxReconnectAttempts,
    ConnectionReconnectDelay,
    ConnectionQuality,
    ConnectionLastPing,
    UiRecording,
    UiTextChatEnabled,
    UiTextOnlyMode,
    UiPersonalityOverlayVisible,
    UiLastMessageCount,
    UiLastStatus,
    UiErrors,
    UiLoadingStates,
    UiLoadingConnecting,
    UiLoadingGeneratingResponse,
    UiLoadingGeneratingAudio,
    UiLoadingSendingMessage,
    DataAvailablePersonalities,
    DataSelectedPersonality,
    DataMessages,
    DataCurrentStatus,
    DataPersonalityInfo,
}

impl StatePath {
    pub const ALL: [StatePath; 24] = [
        Self::ConnectionStatus,
        Self::ConnectionSocket,
        Self::ConnectionReconnectAttempts,
        Self::ConnectionMaxReconnectAttempts,
        Self::ConnectionReconnectDelay,
        Self::ConnectionQuality,
        Self::ConnectionLastPing,
        Self::UiRecording,
        Self::UiTextChatEnabled,
        Self::UiTextOnlyMode,
        Self::UiPersonalityOverlayVisible,
        Self::UiLastMessageCount,
        Self::UiLastStatus,
        Self::UiErrors,
        Self::UiLoadingStates,
        Self::UiLoadingConnecting,
        Self::UiLoadingGeneratingResponse,
        Self::UiLoadingGeneratingAudio,
        Self::UiLoadingSendingMessage,
        Self::DataAvailablePersonalities,
        Self::DataSelectedPersonality,
        Self::DataMessages,
        Self::DataCurrentStatus,
        Self::DataPersonalityInfo,
    ];

    /// Dotted form, e.g. `ui.loadingStates.generatingResponse`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionStatus => "connection.status",
            Self::ConnectionSocket => "connection.ws",
            Self::ConnectionReconnectAttempts => "connection.reconnectAttempts",
            Self::ConnectionMaxReconnectAttempts => "connection.maxReconnectAttempts",
            Self::ConnectionReconnectDelay => "connection.reconnectDelay",
            Self::ConnectionQuality => "connection.quality",
            Self::ConnectionLastPing => "connection.lastPing",
            Self::UiRecording => "ui.recording",
            Self::UiTextChatEnabled => "ui.textChatEnabled",
            Self::UiTextOnlyMode => "ui.textOnlyMode",
            Self::UiPersonalityOverlayVisible => "ui.personalityOverlayVisible",
            Self::UiLastMessageCount => "ui.lastMessageCount",
            Self::UiLastStatus => "ui.lastStatus",
            Self::UiErrors => "ui.errors",
            Self::UiLoadingStates => "ui.loadingStates",
            Self::UiLoadingConnecting => "ui.loadingStates.connecting",
            Self::UiLoadingGeneratingResponse => "ui.loadingStates.generatingResponse",
            Self::UiLoadingGeneratingAudio => "ui.loadingStates.generatingAudio",
            Self::UiLoadingSendingMessage => "ui.loadingStates.sendingMessage",
            Self::DataAvailablePersonalities => "data.availablePersonalities",
            Self::DataSelectedPersonality => "data.selectedPersonality",
            Self::DataMessages => "data.messages",
            Self::DataCurrentStatus => "data.currentStatus",
            Self::DataPersonalityInfo => "data.personalityInfo",
        }
    }

    pub fn section(&self) -> Section {
        match self {
            Self::ConnectionStatus
            | Self::ConnectionSocket
            | Self::ConnectionReconnectAttempts
            | Self::ConnectionMaxReconnectAttempts
            | Self::ConnectionReconnectDelay
            | Self::ConnectionQuality
            | Self::ConnectionLastPing => Section::Connection,
            Self::UiRecording
            | Self::UiTextChatEnabled
            | Self::UiTextOnlyMode
            | Self::UiPersonalityOverlayVisible
            | Self::UiLastMessageCount
            | Self::UiLastStatus
            | Self::UiErrors
            | Self::UiLoadingStates
            | Self::UiLoadingConnecting
            | Self::UiLoadingGeneratingResponse
            | Self::UiLoadingGeneratingAudio
            | Self::UiLoadingSendingMessage => Section::Ui,
            Self::DataAvailablePersonalities
            | Self::DataSelectedPersonality
            | Self::DataMessages
            | Self::DataCurrentStatus
            | Self::DataPersonalityInfo => Section::Data,
        }
    }

    /// Enclosing path, if this path lives inside another addressable record
    pub fn parent(&self) -> Option<StatePath> {
        match self {
            Self::UiLoadingConnecting
            | Self::UiLoadingGeneratingResponse
            | Self::UiLoadingGeneratingAudio
            | Self::UiLoadingSendingMessage => Some(Self::UiLoadingStates),
            _ => None,
        }
    }

    /// True for `ancestor` itself and for every path nested below it
    pub fn is_within(&self, ancestor: StatePath) -> bool {
        *self == ancestor || self.parent() == Some(ancestor)
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path string that names no known location
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown state path: {0}")]
pub struct UnknownPath(pub String);

impl FromStr for StatePath {
    type Err = UnknownPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|path| path.as_str() == s)
            .ok_or_else(|| UnknownPath(s.to_string()))
    }
}

/// Value read from, or delivered about, one path
#[derive(Debug, Clone, PartialEq)]
pub enum StateValue {
    Status(ConnectionStatus),
    Socket(Option<SocketHandle>),
    Count(u32),
    Millis(u64),
    Quality(LinkQuality),
    Timestamp(Option<i64>),
    Flag(bool),
    Text(String),
    Notices(Vec<Notice>),
    Loading(LoadingStates),
    Personalities(Vec<PersonalityInfo>),
    Selection(Option<String>),
    Messages(Vec<Message>),
    Personality(Option<PersonalityInfo>),
}

impl StateValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u32> {
        match self {
            Self::Count(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_status(&self) -> Option<ConnectionStatus> {
        match self {
            Self::Status(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// A typed write to one path
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    ConnectionStatus(ConnectionStatus),
    ConnectionSocket(Option<SocketHandle>),
    ConnectionReconnectAttempts(u32),
    ConnectionMaxReconnectAttempts(u32),
    ConnectionReconnectDelay(u64),
    ConnectionQuality(LinkQuality),
    ConnectionLastPing(Option<i64>),
    UiRecording(bool),
    UiTextChatEnabled(bool),
    UiTextOnlyMode(bool),
    UiPersonalityOverlayVisible(bool),
    UiLastMessageCount(u32),
    UiLastStatus(String),
    UiErrors(Vec<Notice>),
    UiLoadingStates(LoadingStates),
    UiLoadingConnecting(bool),
    UiLoadingGeneratingResponse(bool),
    UiLoadingGeneratingAudio(bool),
    UiLoadingSendingMessage(bool),
    DataAvailablePersonalities(Vec<PersonalityInfo>),
    DataSelectedPersonality(Option<String>),
    DataMessages(Vec<Message>),
    DataCurrentStatus(String),
    DataPersonalityInfo(Option<PersonalityInfo>),
}

impl StateChange {
    pub fn path(&self) -> StatePath {
        match self {
            Self::ConnectionStatus(_) => StatePath::ConnectionStatus,
            Self::ConnectionSocket(_) => StatePath::ConnectionSocket,
            Self::ConnectionReconnectAttempts(_) => StatePath::ConnectionReconnectAttempts,
            Self::ConnectionMaxReconnectAttempts(_) => StatePath::ConnectionMaxReconnectAttempts,
            Self::ConnectionReconnectDelay(_) => StatePath::ConnectionReconnectDelay,
            Self::ConnectionQuality(_) => StatePath::ConnectionQuality,
            Self::ConnectionLastPing(_) => StatePath::ConnectionLastPing,
            Self::UiRecording(_) => StatePath::UiRecording,
            Self::UiTextChatEnabled(_) => StatePath::UiTextChatEnabled,
            Self::UiTextOnlyMode(_) => StatePath::UiTextOnlyMode,
            Self::UiPersonalityOverlayVisible(_) => StatePath::UiPersonalityOverlayVisible,
            Self::UiLastMessageCount(_) => StatePath::UiLastMessageCount,
            Self::UiLastStatus(_) => StatePath::UiLastStatus,
            Self::UiErrors(_) => StatePath::UiErrors,
            Self::UiLoadingStates(_) => StatePath::UiLoadingStates,
            Self::UiLoadingConnecting(_) => StatePath::UiLoadingConnecting,
            Self::UiLoadingGeneratingResponse(_) => StatePath::UiLoadingGeneratingResponse,
            Self::UiLoadingGeneratingAudio(_) => StatePath::UiLoadingGeneratingAudio,
            Self::UiLoadingSendingMessage(_) => StatePath::UiLoadingSendingMessage,
            Self::DataAvailablePersonalities(_) => StatePath::DataAvailablePersonalities,
            Self::DataSelectedPersonality(_) => StatePath::DataSelectedPersonality,
            Self::DataMessages(_) => StatePath::DataMessages,
            Self::DataCurrentStatus(_) => StatePath::DataCurrentStatus,
            Self::DataPersonalityInfo(_) => StatePath::DataPersonalityInfo,
        }
    }

    /// Write the value into `state` and return it as a [`StateValue`]
    pub(super) fn apply(self, state: &mut AppState) -> StateValue {
        let value = self.value();
        match self {
            Self::ConnectionStatus(v) => state.connection.status = v,
            Self::ConnectionSocket(v) => state.connection.socket = v,
            Self::ConnectionReconnectAttempts(v) => state.connection.reconnect_attempts = v,
            Self::ConnectionMaxReconnectAttempts(v) => state.connection.max_reconnect_attempts = v,
            Self::ConnectionReconnectDelay(v) => state.connection.reconnect_delay_ms = v,
            Self::ConnectionQuality(v) => state.connection.quality = v,
            Self::ConnectionLastPing(v) => state.connection.last_ping = v,
            Self::UiRecording(v) => state.ui.recording = v,
            Self::UiTextChatEnabled(v) => state.ui.text_chat_enabled = v,
            Self::UiTextOnlyMode(v) => state.ui.text_only_mode = v,
            Self::UiPersonalityOverlayVisible(v) => state.ui.personality_overlay_visible = v,
            Self::UiLastMessageCount(v) => state.ui.last_message_count = v,
            Self::UiLastStatus(v) => state.ui.last_status = v,
            Self::UiErrors(v) => state.ui.errors = v,
            Self::UiLoadingStates(v) => state.ui.loading = v,
            Self::UiLoadingConnecting(v) => state.ui.loading.connecting = v,
            Self::UiLoadingGeneratingResponse(v) => state.ui.loading.generating_response = v,
            Self::UiLoadingGeneratingAudio(v) => state.ui.loading.generating_audio = v,
            Self::UiLoadingSendingMessage(v) => state.ui.loading.sending_message = v,
            Self::DataAvailablePersonalities(v) => state.data.available_personalities = v,
            Self::DataSelectedPersonality(v) => state.data.selected_personality = v,
            Self::DataMessages(v) => state.data.messages = v,
            Self::DataCurrentStatus(v) => state.data.current_status = v,
            Self::DataPersonalityInfo(v) => state.data.personality_info = v,
        }
        value
    }

    fn value(&self) -> StateValue {
        match self {
            Self::ConnectionStatus(v) => StateValue::Status(*v),
            Self::ConnectionSocket(v) => StateValue::Socket(v.clone()),
            Self::ConnectionReconnectAttempts(v)
            | Self::ConnectionMaxReconnectAttempts(v)
            | Self::UiLastMessageCount(v) => StateValue::Count(*v),
            Self::ConnectionReconnectDelay(v) => StateValue::Millis(*v),
            Self::ConnectionQuality(v) => StateValue::Quality(*v),
            Self::ConnectionLastPing(v) => StateValue::Timestamp(*v),
            Self::UiRecording(v)
            | Self::UiTextChatEnabled(v)
            | Self::UiTextOnlyMode(v)
            | Self::UiPersonalityOverlayVisible(v)
            | Self::UiLoadingConnecting(v)
            | Self::UiLoadingGeneratingResponse(v)
            | Self::UiLoadingGeneratingAudio(v)
            | Self::UiLoadingSendingMessage(v) => StateValue::Flag(*v),
            Self::UiLastStatus(v) | Self::DataCurrentStatus(v) => StateValue::Text(v.clone()),
            Self::UiErrors(v) => StateValue::Notices(v.clone()),
            Self::UiLoadingStates(v) => StateValue::Loading(*v),
            Self::DataAvailablePersonalities(v) => StateValue::Personalities(v.clone()),
            Self::DataSelectedPersonality(v) => StateValue::Selection(v.clone()),
            Self::DataMessages(v) => StateValue::Messages(v.clone()),
            Self::DataPersonalityInfo(v) => StateValue::Personality(v.clone()),
        }
    }
}

/// Read the current value at `path`
pub(super) fn read(state: &AppState, path: StatePath) -> StateValue {
    let c = &state.connection;
    let ui = &state.ui;
    let data = &state.data;
    match path {
        StatePath::ConnectionStatus => StateValue::Status(c.status),
        StatePath::ConnectionSocket => StateValue::Socket(c.socket.clone()),
        StatePath::ConnectionReconnectAttempts => StateValue::Count(c.reconnect_attempts),
        StatePath::ConnectionMaxReconnectAttempts => StateValue::Count(c.max_reconnect_attempts),
        StatePath::ConnectionReconnectDelay => StateValue::Millis(c.reconnect_delay_ms),
        StatePath::ConnectionQuality => StateValue::Quality(c.quality),
        StatePath::ConnectionLastPing => StateValue::Timestamp(c.last_ping),
        StatePath::UiRecording => StateValue::Flag(ui.recording),
        StatePath::UiTextChatEnabled => StateValue::Flag(ui.text_chat_enabled),
        StatePath::UiTextOnlyMode => StateValue::Flag(ui.text_only_mode),
        StatePath::UiPersonalityOverlayVisible => {
            StateValue::Flag(ui.personality_overlay_visible)
        }
        StatePath::UiLastMessageCount => StateValue::Count(ui.last_message_count),
        StatePath::UiLastStatus => StateValue::Text(ui.last_status.clone()),
        StatePath::UiErrors => StateValue::Notices(ui.errors.clone()),
        StatePath::UiLoadingStates => StateValue::Loading(ui.loading),
        StatePath::UiLoadingConnecting => StateValue::Flag(ui.loading.connecting),
        StatePath::UiLoadingGeneratingResponse => StateValue::Flag(ui.loading.generating_response),
        StatePath::UiLoadingGeneratingAudio => StateValue::Flag(ui.loading.generating_audio),
        StatePath::UiLoadingSendingMessage => StateValue::Flag(ui.loading.sending_message),
        StatePath::DataAvailablePersonalities => {
            StateValue::Personalities(data.available_personalities.clone())
        }
        StatePath::DataSelectedPersonality => {
            StateValue::Selection(data.selected_personality.clone())
        }
        StatePath::DataMessages => StateValue::Messages(data.messages.clone()),
        StatePath::DataCurrentStatus => StateValue::Text(data.current_status.clone()),
        StatePath::DataPersonalityInfo => StateValue::Personality(data.personality_info.clone()),
    }
}
