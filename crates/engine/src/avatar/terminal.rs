//! The SSH-side avatar: wraps a `TerminalSurface` and funnels keystrokes
//! into the bound terminal `Application` (§4.4, GLOSSARY).

use std::sync::Arc;

use txwerewolves_domain::UserId;

use crate::application::terminal::TerminalSurface;
use crate::application::ApplicationHandle;

use super::Avatar;

pub struct TerminalAvatar {
    user_id: UserId,
    surface: Arc<dyn TerminalSurface>,
    app: std::sync::Mutex<Option<ApplicationHandle>>,
}

impl TerminalAvatar {
    pub fn new(user_id: UserId, surface: Arc<dyn TerminalSurface>) -> Self {
        Self {
            user_id,
            surface,
            app: std::sync::Mutex::new(None),
        }
    }

    pub fn bind_app(&self, app: ApplicationHandle) {
        *self.app.lock().expect("terminal avatar mutex poisoned") = Some(app);
    }

    pub fn surface(&self) -> &Arc<dyn TerminalSurface> {
        &self.surface
    }
}

impl Avatar for TerminalAvatar {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// A fresh SSH login for the same user id supersedes this one (§8
    /// scenario 6): the superseded connection is told and then
    /// disconnected.
    fn notify_replaced(&self) {
        self.surface
            .write("\r\nAnother avatar has logged in. Disconnecting.\r\n");
        self.surface.lose_connection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSurface {
        written: StdMutex<Vec<String>>,
        lost: StdMutex<bool>,
    }

    impl TerminalSurface for RecordingSurface {
        fn reset(&self) {}
        fn cursor(&self, _x: u16, _y: u16) {}
        fn write(&self, text: &str) {
            self.written.lock().unwrap().push(text.to_string());
        }
        fn save_cursor(&self) {}
        fn restore_cursor(&self) {}
        fn lose_connection(&self) {
            *self.lost.lock().unwrap() = true;
        }
    }

    #[test]
    fn replacement_writes_a_notice_then_disconnects() {
        let surface = Arc::new(RecordingSurface::default());
        let avatar = TerminalAvatar::new(UserId::new("alice"), surface.clone());
        avatar.notify_replaced();
        assert!(surface
            .written
            .lock()
            .unwrap()
            .iter()
            .any(|line| line.contains("Another avatar has logged in")));
        assert!(*surface.lost.lock().unwrap());
    }
}
