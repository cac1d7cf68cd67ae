//! Wire types shared between `txwerewolves-engine` and the browser client:
//! the SSE event vocabulary the web `ApplicationAdapter` emits, and the POST
//! request bodies it accepts.

pub mod requests;
pub mod web_event;

pub use web_event::{
    ActionEntry, AppKind, ChatData, GameInfoEntry, PhaseInfoData, PlayerInfoData,
    PostGameResultsData, SettingsInfoData, ShutDownData, WebEvent,
};
pub use requests::{ActionRequest, ChatRequest, LoginRequest, SettingsRequest};
