//! Boundary adapters: the SSH terminal service and the HTTP/SSE web
//! service, each constructed once in `main.rs` against the same shared
//! [`Services`] and run concurrently (§6).

pub mod http;
pub mod ssh;

use std::sync::Arc;

use txwerewolves_domain::RandomPort;

use crate::registry::{SessionRegistry, UserRegistry};
use crate::signal::SignalBus;

/// The process-wide handles both transports are constructed against,
/// built once in the composition root and handed to each transport's own
/// state wrapper (§4.1, §6).
#[derive(Clone)]
pub struct Services {
    pub users: Arc<UserRegistry>,
    pub sessions: Arc<SessionRegistry>,
    pub bus: Arc<SignalBus>,
    pub rng: Arc<dyn RandomPort>,
}
