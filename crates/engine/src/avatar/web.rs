//! The browser-side avatar: a bounded buffer plus an optional long-lived
//! SSE sender (§4.5, §5). Ported from `webauth.py::WebAvatar`: events are
//! pushed through `send_event_to_client`, buffered while no event source
//! is attached, and flushed oldest-first on reattach.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;

use tokio::sync::mpsc;
use txwerewolves_domain::UserId;
use txwerewolves_shared::{ShutDownData, WebEvent};

use crate::application::ApplicationHandle;

use super::Avatar;

/// SSE event buffer capacity (§4.5, §5): overflow drops the oldest queued
/// event.
const EVENT_BUFFER_SIZE: usize = 20;

/// Frames one `WebEvent` exactly as `webauth.py::send_event_to_client`
/// does: serialize to JSON, split on `\n`, emit each line as
/// `data: {line}\r\n`, terminated by a bare `\r\n` (§6).
pub fn sse_frame(event: &WebEvent) -> String {
    let json = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    let mut framed = String::new();
    for line in json.split('\n') {
        framed.push_str("data: ");
        framed.push_str(line);
        framed.push_str("\r\n");
    }
    framed.push_str("\r\n");
    framed
}

pub struct WebAvatar {
    user_id: UserId,
    sender: StdMutex<Option<mpsc::Sender<String>>>,
    buffer: StdMutex<VecDeque<String>>,
    app: StdMutex<Option<ApplicationHandle>>,
}

impl WebAvatar {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            sender: StdMutex::new(None),
            buffer: StdMutex::new(VecDeque::with_capacity(EVENT_BUFFER_SIZE)),
            app: StdMutex::new(None),
        }
    }

    pub fn bind_app(&self, app: ApplicationHandle) {
        *self.app.lock().expect("web avatar mutex poisoned") = Some(app);
    }

    /// Attaches a fresh SSE channel, flushing whatever was buffered while
    /// disconnected, oldest first (§4.5).
    pub fn connect_event_source(&self, sender: mpsc::Sender<String>) {
        let backlog: Vec<String> = {
            let mut buffer = self.buffer.lock().expect("web avatar mutex poisoned");
            buffer.drain(..).collect()
        };
        for frame in backlog {
            let _ = sender.try_send(frame);
        }
        *self.sender.lock().expect("web avatar mutex poisoned") = Some(sender);
    }

    /// Sends `event` to the client, or buffers it if the SSE channel is not
    /// currently attached or the send fails (§4.5, §7: "drop the event
    /// sink, re-buffer the last event, keep the application alive").
    pub fn send_event(&self, event: &WebEvent) {
        let frame = sse_frame(event);
        let mut sender_guard = self.sender.lock().expect("web avatar mutex poisoned");
        let delivered = match sender_guard.as_ref() {
            Some(sender) => sender.try_send(frame.clone()).is_ok(),
            None => false,
        };
        if delivered {
            return;
        }
        *sender_guard = None;
        drop(sender_guard);
        let mut buffer = self.buffer.lock().expect("web avatar mutex poisoned");
        if buffer.len() >= EVENT_BUFFER_SIZE {
            buffer.pop_front();
        }
        buffer.push_back(frame);
    }
}

impl Avatar for WebAvatar {
    fn user_id(&self) -> &UserId {
        &self.user_id
    }

    fn notify_replaced(&self) {
        self.send_event(&WebEvent::ShutDown(ShutDownData {
            initiator: self.user_id.to_string(),
        }));
        *self.sender.lock().expect("web avatar mutex poisoned") = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_buffer_while_disconnected_and_flush_in_order() {
        let avatar = WebAvatar::new(UserId::new("alice"));
        avatar.send_event(&WebEvent::Status("one".to_string()));
        avatar.send_event(&WebEvent::Status("two".to_string()));

        let (tx, mut rx) = mpsc::channel(8);
        avatar.connect_event_source(tx);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(first.contains("\"one\""));
        assert!(second.contains("\"two\""));
    }

    #[test]
    fn buffer_overflow_drops_the_oldest_event() {
        let avatar = WebAvatar::new(UserId::new("alice"));
        for n in 0..(EVENT_BUFFER_SIZE + 5) {
            avatar.send_event(&WebEvent::Status(format!("event-{n}")));
        }
        let (tx, mut rx) = mpsc::channel(64);
        avatar.connect_event_source(tx);
        let first = rx.try_recv().unwrap();
        assert!(first.contains("event-5"));
    }

    #[test]
    fn sse_framing_splits_on_newlines_and_terminates_with_blank_line() {
        let frame = sse_frame(&WebEvent::Output("line one\nline two".to_string()));
        assert!(frame.contains("data: "));
        assert!(frame.ends_with("\r\n\r\n"));
    }
}
