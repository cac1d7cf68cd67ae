//! Process-wide user and session tables (§4.1). Both are `DashMap`-backed
//! for sharded, lock-free-at-the-API-surface lookup, wired as `Arc`-shared
//! services from the composition root.

pub mod session;
pub mod user;

pub use session::{SessionEntry, SessionRegistry, SessionSettings, SessionState};
pub use user::{UserEntry, UserRegistry};
