//! Data module for configuration and domain records

mod config;
mod model;

pub use config::{
    ConnectionConfig, KioskConfig, PollingConfig, ServerConfig, TransportKind, UiConfig,
};
pub use model::{
    now_millis, ConnectionStatus, LinkQuality, LoadingStates, Message, Notice, NoticeKind,
    PersonalityInfo,
};
