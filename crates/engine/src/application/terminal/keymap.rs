//! Keystroke vocabulary and the application-level command table (§4.4).
//! The SSH transport translates raw terminal bytes + modifier bits into
//! `Key` before calling into the application; this keeps the dialog/app
//! dispatch code independent of any particular terminal escape dialect.

/// A single logical keystroke, already decoded from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Tab,
    Escape,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// A control character, e.g. `Ctrl('a')` for CTRL-A.
    Ctrl(char),
}

/// Application-level commands dispatched when no dialog consumes a key
/// (§4.4's key dispatch table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    Help,
    Chat,
    SessionAdmin,
    Shutdown,
    Drop,
}

/// The fixed table from §4.4: `h` help, TAB chat, CTRL-A session admin,
/// CTRL-X shutdown, CTRL-D drop connection.
pub fn app_level_command(key: Key) -> Option<AppCommand> {
    match key {
        Key::Char('h') => Some(AppCommand::Help),
        Key::Tab => Some(AppCommand::Chat),
        Key::Ctrl('a') => Some(AppCommand::SessionAdmin),
        Key::Ctrl('x') => Some(AppCommand::Shutdown),
        Key::Ctrl('d') => Some(AppCommand::Drop),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_opens_chat_regardless_of_state() {
        assert_eq!(app_level_command(Key::Tab), Some(AppCommand::Chat));
    }

    #[test]
    fn unmapped_key_falls_through() {
        assert_eq!(app_level_command(Key::Char('z')), None);
    }
}
