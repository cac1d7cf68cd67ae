//! Engine crate: registries, the signal bus, the terminal and web
//! `Application`/`Avatar` implementations, transport migration, and the
//! SSH/HTTP boundary adapters that sit on top of them.

pub mod application;
pub mod avatar;
pub mod config;
pub mod error;
pub mod migration;
pub mod random;
pub mod registry;
pub mod signal;
pub mod transport;
