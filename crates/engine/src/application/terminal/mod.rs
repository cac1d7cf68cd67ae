//! Terminal surface abstraction, redraw coalescing, the dialog stack, key
//! dispatch, and glyph table for the SSH-side renderer (§4.4, §9).

pub mod app;
pub mod dialogs;
pub mod glyphs;
pub mod keymap;
pub mod render;

pub use app::TerminalApplication;

use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// What a terminal avatar writes to. The SSH transport supplies the real
/// implementation (escape-sequence emission over the channel); tests use an
/// in-memory recorder.
pub trait TerminalSurface: Send + Sync {
    fn reset(&self);
    fn cursor(&self, x: u16, y: u16);
    fn write(&self, text: &str);
    fn save_cursor(&self);
    fn restore_cursor(&self);
    fn lose_connection(&self);
}

/// Coalesces redraw requests: multiple requests between ticks collapse into
/// one deferred repaint, matching the "schedule a one-shot deferred
/// callback" rule in §4.4/§9.
pub struct RedrawScheduler {
    notify: Arc<Notify>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self {
            notify: Arc::new(Notify::new()),
            task: std::sync::Mutex::new(None),
        }
    }

    /// Requests a redraw. If one is already pending, this is a no-op; the
    /// pending redraw will pick up whatever state exists when it fires.
    pub fn request<F>(&self, redraw: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut guard = self.task.lock().expect("redraw scheduler mutex poisoned");
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }
        let notify = self.notify.clone();
        *guard = Some(tokio::spawn(async move {
            notify.notified().await;
            redraw();
        }));
        self.notify.notify_one();
    }

    /// Cancels a pending redraw, e.g. on dialog uninstall.
    pub fn cancel(&self) {
        let mut guard = self.task.lock().expect("redraw scheduler mutex poisoned");
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new()
    }
}
