//! SSE event vocabulary for the web `ApplicationAdapter`: `status`,
//! `actions`, `output`, `phase-info`, `player-info`, `game-info`, `chat`,
//! `show-dialog`, `hide-dialog`, `install-app`, `shut-down`,
//! `settings-info`, `post-game-results`.
//!
//! Each variant serializes (externally tagged, kebab-case) to a single-key
//! JSON object whose key is the event kind, matching the wire format the
//! original `webauth.py` emits over the SSE channel.

use serde::{Deserialize, Serialize};

/// `[label, action_id, post_action_text]`.
pub type ActionEntry = (String, u32, String);

/// `[card_name, count]`.
pub type GameInfoEntry = (String, u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseInfoData {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfoData {
    pub user_id: String,
    pub card_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatData {
    pub sender: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppKind {
    #[serde(rename = "/lobby")]
    Lobby,
    #[serde(rename = "/werewolves")]
    Werewolves,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShutDownData {
    pub initiator: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsInfoData {
    pub werewolf_count: u32,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostGameResultsData {
    pub winner: String,
    pub player_cards_original: std::collections::BTreeMap<String, String>,
    pub player_cards_current: std::collections::BTreeMap<String, String>,
    pub table_cards_original: [String; 3],
    pub table_cards_current: [String; 3],
    pub eliminated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WebEvent {
    Status(String),
    Actions(Vec<ActionEntry>),
    Output(String),
    PhaseInfo(PhaseInfoData),
    PlayerInfo(PlayerInfoData),
    GameInfo(Vec<GameInfoEntry>),
    Chat(ChatData),
    ShowDialog(serde_json::Value),
    HideDialog(String),
    InstallApp(AppKind),
    ShutDown(ShutDownData),
    SettingsInfo(SettingsInfoData),
    PostGameResults(PostGameResultsData),
}

impl WebEvent {
    pub fn hide_dialog() -> Self {
        WebEvent::HideDialog(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_single_key_object() {
        let event = WebEvent::Status("You are not part of any session.".to_string());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "You are not part of any session."})
        );
    }

    #[test]
    fn phase_info_uses_kebab_case_key() {
        let event = WebEvent::PhaseInfo(PhaseInfoData {
            name: "Daybreak".to_string(),
            description: "Vote for who to eliminate.".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("phase-info").is_some());
    }

    #[test]
    fn hide_dialog_round_trips_through_json() {
        let event = WebEvent::hide_dialog();
        let json = serde_json::to_string(&event).unwrap();
        let decoded: WebEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn install_app_uses_path_style_values() {
        let event = WebEvent::InstallApp(AppKind::Werewolves);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"install-app": "/werewolves"}));
    }
}
