//! Wire formats shared by the socket and polling transports

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::data::{Message, PersonalityInfo};
use crate::state::{StateChange, DEFAULT_STATUS};

/// An action the kiosk asks the backend to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    StartRecording,
    StopRecording,
    SendTextMessage { message: String },
    SelectPersonality { personality: String },
    GetPersonalities,
    Ping,
}

impl ClientAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartRecording => "start_recording",
            Self::StopRecording => "stop_recording",
            Self::SendTextMessage { .. } => "send_text_message",
            Self::SelectPersonality { .. } => "select_personality",
            Self::GetPersonalities => "get_personalities",
            Self::Ping => "ping",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::SendTextMessage { message } => json!({ "message": message }),
            Self::SelectPersonality { personality } => json!({ "personality": personality }),
            _ => json!({}),
        }
    }
}

/// Socket frame sent to the backend
#[derive(Debug, Clone, Serialize)]
pub struct ClientEnvelope {
    pub action: &'static str,
    pub data: Value,
    pub timestamp: i64,
}

impl ClientEnvelope {
    pub fn new(action: &ClientAction, timestamp: i64) -> Self {
        Self {
            action: action.name(),
            data: action.payload(),
            timestamp,
        }
    }
}

/// Body of `POST /api/action`
#[derive(Debug, Clone, Serialize)]
pub struct ActionRequest {
    pub action: &'static str,
    pub data: Value,
}

impl From<&ClientAction> for ActionRequest {
    fn from(action: &ClientAction) -> Self {
        Self {
            action: action.name(),
            data: action.payload(),
        }
    }
}

/// Socket frame from the backend before dispatch on its tag
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// Dispatched server frame
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    StateUpdate(StateSnapshot),
    PersonalitiesList(Vec<PersonalityInfo>),
    Pong,
    Error(Option<String>),
    Info(Option<String>),
    Unknown(String),
}

#[derive(Debug, Default, Deserialize)]
struct NoticePayload {
    #[serde(default)]
    message: Option<String>,
}

impl ServerMessage {
    /// Interpret a frame by its tag; unknown tags come back as `Unknown`
    pub fn from_frame(frame: InboundFrame) -> Result<Self, serde_json::Error> {
        let message = match frame.kind.as_str() {
            "state_update" => Self::StateUpdate(serde_json::from_value(frame.data)?),
            "personalities_list" => {
                let list: PersonalityList = serde_json::from_value(frame.data)?;
                Self::PersonalitiesList(list.personalities)
            }
            "pong" => Self::Pong,
            "error" => Self::Error(notice_text(frame.data)),
            "info" => Self::Info(notice_text(frame.data)),
            _ => Self::Unknown(frame.kind),
        };
        Ok(message)
    }
}

fn notice_text(data: Value) -> Option<String> {
    serde_json::from_value::<NoticePayload>(data)
        .unwrap_or_default()
        .message
        .filter(|m| !m.is_empty())
}

/// Full conversation snapshot
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub personality: Option<PersonalityInfo>,
    #[serde(default)]
    pub personality_selected: bool,
    #[serde(default)]
    pub text_chat_enabled: bool,
    #[serde(default)]
    pub text_only_mode: bool,
    #[serde(default)]
    pub generating_response: bool,
    #[serde(default)]
    pub generating_audio: bool,
}

impl StateSnapshot {
    /// State writes for this snapshot, in application order.
    ///
    /// The selected key is only written when the server reports a selection,
    /// so a pick still in progress on the overlay survives snapshots.
    pub fn into_changes(self) -> Vec<StateChange> {
        let selected = self.personality_selected;
        let status = self
            .status
            .filter(|status| !status.is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());

        let mut changes = vec![
            StateChange::DataCurrentStatus(status),
            StateChange::DataMessages(self.messages.unwrap_or_default()),
            StateChange::DataPersonalityInfo(self.personality.clone()),
        ];
        if selected {
            changes.push(StateChange::DataSelectedPersonality(
                self.personality.map(|p| p.key),
            ));
        }
        changes.extend([
            StateChange::UiTextChatEnabled(self.text_chat_enabled),
            StateChange::UiTextOnlyMode(self.text_only_mode),
            StateChange::UiLoadingGeneratingResponse(self.generating_response),
            StateChange::UiLoadingGeneratingAudio(self.generating_audio),
            StateChange::UiPersonalityOverlayVisible(!selected),
        ]);
        changes
    }
}

/// Body of `personalities_list` frames and `GET /api/personalities`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonalityList {
    #[serde(default)]
    pub personalities: Vec<PersonalityInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(raw: &str) -> ServerMessage {
        let frame: InboundFrame = serde_json::from_str(raw).unwrap();
        ServerMessage::from_frame(frame).unwrap()
    }

    #[test]
    fn envelope_carries_action_payload_and_timestamp() {
        let action = ClientAction::SendTextMessage {
            message: "one lager".into(),
        };
        let text = serde_json::to_value(ClientEnvelope::new(&action, 1700)).unwrap();
        assert_eq!(
            text,
            json!({"action": "send_text_message", "data": {"message": "one lager"}, "timestamp": 1700})
        );
    }

    #[test]
    fn bare_actions_send_empty_objects() {
        let body = serde_json::to_value(ActionRequest::from(&ClientAction::StopRecording)).unwrap();
        assert_eq!(body, json!({"action": "stop_recording", "data": {}}));
    }

    #[test]
    fn state_update_fills_defaults() {
        let msg = frame(r#"{"type":"state_update","data":{"status":"Speaking...","personality_selected":true}}"#);
        let ServerMessage::StateUpdate(snapshot) = msg else {
            panic!("expected state update");
        };
        assert_eq!(snapshot.status.as_deref(), Some("Speaking..."));
        assert!(snapshot.personality_selected);
        assert!(snapshot.messages.is_none());
        assert!(!snapshot.generating_audio);
    }

    #[test]
    fn personalities_list_reads_nested_array() {
        let msg = frame(
            r#"{"type":"personalities_list","data":{"personalities":[{"key":"classic","name":"Classic Terry"}]}}"#,
        );
        assert_eq!(
            msg,
            ServerMessage::PersonalitiesList(vec![PersonalityInfo {
                key: "classic".into(),
                name: "Classic Terry".into(),
                short_name: None,
            }])
        );
    }

    #[test]
    fn notices_without_text_fall_back_to_none() {
        assert_eq!(frame(r#"{"type":"error","data":{}}"#), ServerMessage::Error(None));
        assert_eq!(
            frame(r#"{"type":"info","data":{"message":"Restocking kegs"}}"#),
            ServerMessage::Info(Some("Restocking kegs".into()))
        );
    }

    #[test]
    fn unknown_tags_are_kept_for_logging() {
        assert_eq!(
            frame(r#"{"type":"weather","data":{"sunny":true}}"#),
            ServerMessage::Unknown("weather".into())
        );
        assert_eq!(frame(r#"{"type":"pong","timestamp":12.5}"#), ServerMessage::Pong);
    }

    #[test]
    fn empty_snapshot_falls_back_to_ready_status() {
        let changes = StateSnapshot::default().into_changes();
        assert_eq!(
            changes[0],
            StateChange::DataCurrentStatus(DEFAULT_STATUS.to_string())
        );
        assert!(changes.contains(&StateChange::UiPersonalityOverlayVisible(true)));
        assert!(!changes
            .iter()
            .any(|c| matches!(c, StateChange::DataSelectedPersonality(_))));
    }

    #[test]
    fn selected_snapshot_hides_overlay_and_records_key() {
        let snapshot = StateSnapshot {
            personality: Some(PersonalityInfo {
                key: "classic".into(),
                name: "Classic Terry".into(),
                short_name: Some("Classic".into()),
            }),
            personality_selected: true,
            text_only_mode: true,
            ..StateSnapshot::default()
        };
        let changes = snapshot.into_changes();
        assert!(changes.contains(&StateChange::DataSelectedPersonality(Some("classic".into()))));
        assert!(changes.contains(&StateChange::UiPersonalityOverlayVisible(false)));
        assert!(changes.contains(&StateChange::UiTextOnlyMode(true)));
    }

    #[test]
    fn frames_without_tag_are_rejected() {
        assert!(serde_json::from_str::<InboundFrame>(r#"{"data":{}}"#).is_err());
    }
}
