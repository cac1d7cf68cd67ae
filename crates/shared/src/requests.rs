//! POST request bodies accepted by the web transport: `/login`, `/action`,
//! `/chat`, `/settings`.

use serde::{Deserialize, Serialize};

/// `POST /login`, `name=<user_id>` (form-encoded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub name: String,
}

/// `POST /action`, `command=<int>` (form-encoded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub command: u32,
}

/// `POST /chat`, `message=<text>` (form-encoded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// `POST /settings` (JSON body): werewolf count plus the set of optional
/// role cards to include.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsRequest {
    pub werewolf_count: u32,
    pub roles: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_request_decodes_from_form_style_json() {
        let decoded: ActionRequest = serde_json::from_str(r#"{"command": 3}"#).unwrap();
        assert_eq!(decoded, ActionRequest { command: 3 });
    }

    #[test]
    fn settings_request_round_trips() {
        let req = SettingsRequest {
            werewolf_count: 2,
            roles: vec!["Seer".to_string(), "Robber".to_string()],
        };
        let json = serde_json::to_string(&req).unwrap();
        let decoded: SettingsRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, req);
    }
}
