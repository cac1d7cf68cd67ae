//! Avatar: the per-connection handle that funnels input into an
//! [`crate::application::Application`] and carries its output back out,
//! regardless of which transport it rides.
//!
//! A user has at most one live avatar at a time (§3); a fresh login
//! replaces the old one after delivering a "replaced" notice.

pub mod terminal;
pub mod web;

pub use terminal::TerminalAvatar;
pub use web::WebAvatar;

use std::sync::Arc;

use txwerewolves_domain::UserId;

/// Per-connection handle. Terminal avatars write at cell positions through
/// a `TerminalSurface`; web avatars push `WebEvent`s over an SSE channel.
/// Both are reduced to this one trait so the registry and signal bus never
/// need to know which transport a given user is riding.
pub trait Avatar: Send + Sync {
    fn user_id(&self) -> &UserId;

    /// Tells this avatar's connection it has been superseded by a fresher
    /// login for the same user, then severs its transport.
    fn notify_replaced(&self);
}

pub type AvatarHandle = Arc<dyn Avatar>;
