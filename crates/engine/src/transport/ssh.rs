//! The SSH terminal transport (§4.4, §6): public-key auth against a JSON
//! user key database, a host key pair resolved per §6's three-tier path
//! fallback, one `Handler` per connection, and a [`TerminalSurface`] that
//! writes ANSI bytes straight to the channel. No pack example depends on
//! `russh`, so this file follows the crate's own published `server`
//! module idiom (a `Server` factory producing one `Handler` per client,
//! holding an `Arc`-shared state bundle) rather than a concrete corpus
//! file; see DESIGN.md for the note.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use russh::server::{Auth, Config, Handle, Handler, Msg, Server as RusshServer, Session};
use russh::{Channel, ChannelId, Pty};
use russh_keys::key::{KeyPair, PublicKey};

use txwerewolves_domain::UserId;

use crate::application::terminal::keymap::Key;
use crate::application::terminal::{TerminalApplication, TerminalSurface};
use crate::application::ApplicationHandle;
use crate::avatar::{AvatarHandle, TerminalAvatar};
use crate::error::EngineError;
use crate::migration;

use super::Services;

/// `user_id -> accepted public key lines`, loaded once at startup from the
/// path `AppConfig::user_db_path` resolves (§6). Each line is either a bare
/// base64 key blob or a full `type base64 comment` OpenSSH line; both are
/// accepted.
#[derive(Debug, Default, Clone)]
pub struct UserKeyDb(HashMap<String, Vec<String>>);

impl UserKeyDb {
    pub fn load(path: &FsPath) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(EngineError::Io)?;
        let map: HashMap<String, Vec<String>> = serde_json::from_str(&text)
            .map_err(|e| EngineError::Ssh(format!("malformed user key database: {e}")))?;
        Ok(Self(map))
    }

    fn authorizes(&self, user: &str, presented: &PublicKey) -> bool {
        match self.0.get(user) {
            Some(keys) => keys.iter().any(|line| {
                parse_authorized_key(line)
                    .map(|key| &key == presented)
                    .unwrap_or(false)
            }),
            None => false,
        }
    }
}

fn parse_authorized_key(line: &str) -> Option<PublicKey> {
    let blob = line.split_whitespace().nth(1).unwrap_or(line);
    russh_keys::parse_public_key_base64(blob).ok()
}

/// Loads the host key pair from `ssh_host_rsa_key`/`.pub` under `key_dir`
/// (§6), or falls back to a freshly generated ed25519 identity for this
/// run if no key is on disk yet. `russh_keys`' generation helper only
/// covers ed25519, not RSA, so the ephemeral fallback is a different key
/// type than the RSA file an administrator would drop in later; host key
/// fingerprints therefore change once a real key is installed.
pub fn load_or_generate_host_key(key_dir: &FsPath) -> Result<KeyPair, EngineError> {
    let (priv_path, _pub_path) = crate::config::host_key_paths(key_dir);
    match russh_keys::load_secret_key(&priv_path, None) {
        Ok(key) => Ok(key),
        Err(_) => {
            tracing::warn!(
                path = %priv_path.display(),
                "no host key on disk; generating an ephemeral ed25519 identity for this run"
            );
            KeyPair::generate_ed25519()
                .ok_or_else(|| EngineError::Ssh("failed to generate an ed25519 host key".to_string()))
        }
    }
}

/// Per-process SSH service: the `Server` factory russh clones a fresh
/// [`SshSession`] handler out of for every inbound connection.
#[derive(Clone)]
pub struct SshServer {
    services: Services,
    user_keys: Arc<UserKeyDb>,
}

impl SshServer {
    pub fn new(services: Services, user_keys: UserKeyDb) -> Self {
        Self {
            services,
            user_keys: Arc::new(user_keys),
        }
    }

    pub async fn run(self, endpoint: &str, host_key: KeyPair) -> Result<(), EngineError> {
        let config = Arc::new(Config {
            keys: vec![host_key],
            ..Default::default()
        });
        let addr: SocketAddr = endpoint
            .parse()
            .map_err(|e| EngineError::Ssh(format!("invalid SSH endpoint {endpoint}: {e}")))?;
        tracing::info!(%addr, "SSH transport listening");
        russh::server::run(config, addr, self)
            .await
            .map_err(|e| EngineError::Ssh(e.to_string()))
    }
}

impl RusshServer for SshServer {
    type Handler = SshSession;

    fn new_client(&mut self, peer_addr: Option<SocketAddr>) -> SshSession {
        tracing::debug!(?peer_addr, "accepted SSH connection");
        SshSession {
            services: self.services.clone(),
            user_keys: self.user_keys.clone(),
            user_id: None,
            app: None,
            surface: None,
        }
    }
}

/// Writes ANSI/VT bytes straight to one SSH channel. Every call hands off
/// to a spawned task against a cloned [`Handle`] rather than holding the
/// channel borrow, since [`TerminalApplication`] calls these methods from
/// outside any `Session`-borrowing callback (e.g. from the redraw
/// scheduler's own spawned task).
struct ChannelSurface {
    channel_id: ChannelId,
    handle: Handle,
    closed: AtomicBool,
}

impl TerminalSurface for ChannelSurface {
    fn reset(&self) {
        self.write("\x1b[2J\x1b[H");
    }

    fn cursor(&self, x: u16, y: u16) {
        self.write(&format!("\x1b[{};{}H", y + 1, x + 1));
    }

    fn write(&self, text: &str) {
        if self.closed.load(Ordering::Relaxed) {
            return;
        }
        let handle = self.handle.clone();
        let channel_id = self.channel_id;
        let data = text.replace('\n', "\r\n").into_bytes();
        tokio::spawn(async move {
            let _ = handle.data(channel_id, data.into()).await;
        });
    }

    fn save_cursor(&self) {
        self.write("\x1b[s");
    }

    fn restore_cursor(&self) {
        self.write("\x1b[u");
    }

    fn lose_connection(&self) {
        self.closed.store(true, Ordering::Relaxed);
        let handle = self.handle.clone();
        let channel_id = self.channel_id;
        tokio::spawn(async move {
            let _ = handle.close(channel_id).await;
        });
    }
}

pub struct SshSession {
    services: Services,
    user_keys: Arc<UserKeyDb>,
    user_id: Option<UserId>,
    app: Option<Arc<TerminalApplication>>,
    surface: Option<Arc<ChannelSurface>>,
}

#[async_trait]
impl Handler for SshSession {
    type Error = EngineError;

    async fn auth_publickey(
        &mut self,
        user: &str,
        public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        if self.user_keys.authorizes(user, public_key) {
            self.user_id = Some(UserId::new(user));
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject {
                proceed_with_methods: None,
            })
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        session: &mut Session,
    ) -> Result<bool, Self::Error> {
        let Some(user_id) = self.user_id.clone() else {
            return Ok(false);
        };
        self.services.users.register_user(&user_id);

        let surface = Arc::new(ChannelSurface {
            channel_id: channel.id(),
            handle: session.handle(),
            closed: AtomicBool::new(false),
        });
        let surface_handle: Arc<dyn TerminalSurface> = surface.clone();

        let avatar = Arc::new(TerminalAvatar::new(user_id.clone(), surface_handle.clone()));
        let app = Arc::new(TerminalApplication::new(
            user_id.clone(),
            self.services.users.clone(),
            self.services.sessions.clone(),
            self.services.bus.clone(),
            self.services.rng.clone(),
            surface_handle,
        ));

        let new_avatar: AvatarHandle = avatar.clone();
        let installed = migration::migrate(
            &self.services.users,
            &user_id,
            new_avatar,
            ApplicationHandle::Terminal(app.clone()),
        )
        .await;
        avatar.bind_app(installed);

        self.app = Some(app);
        self.surface = Some(surface);
        Ok(true)
    }

    async fn pty_request(
        &mut self,
        channel: ChannelId,
        _term: &str,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _modes: &[(Pty, u32)],
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Some(app) = &self.app {
            app.set_dimensions(col_width as u16, row_height as u16);
            app.request_redraw().await;
        }
        session.channel_success(channel);
        Ok(())
    }

    async fn shell_request(
        &mut self,
        channel: ChannelId,
        session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Some(app) = &self.app {
            app.initialize().await;
            app.request_redraw().await;
        }
        session.channel_success(channel);
        Ok(())
    }

    async fn window_change_request(
        &mut self,
        _channel: ChannelId,
        col_width: u32,
        row_height: u32,
        _pix_width: u32,
        _pix_height: u32,
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        if let Some(app) = &self.app {
            app.set_dimensions(col_width as u16, row_height as u16);
            app.request_redraw().await;
        }
        Ok(())
    }

    async fn data(
        &mut self,
        _channel: ChannelId,
        data: &[u8],
        _session: &mut Session,
    ) -> Result<(), Self::Error> {
        let Some(app) = self.app.clone() else {
            return Ok(());
        };
        for key in decode_keys(data) {
            app.handle_input(key).await;
        }
        Ok(())
    }
}

/// Translates a chunk of raw terminal bytes into logical [`Key`]s (§4.4):
/// the handful of CSI arrow-key sequences a standard terminal emulator
/// sends, the common control characters, and UTF-8 text falling through
/// byte-by-byte otherwise.
fn decode_keys(data: &[u8]) -> Vec<Key> {
    let mut keys = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            0x1b if data.get(i + 1) == Some(&b'[') && data.len() > i + 2 => {
                match data[i + 2] {
                    b'A' => keys.push(Key::ArrowUp),
                    b'B' => keys.push(Key::ArrowDown),
                    b'C' => keys.push(Key::ArrowRight),
                    b'D' => keys.push(Key::ArrowLeft),
                    _ => {}
                }
                i += 3;
            }
            0x1b => {
                keys.push(Key::Escape);
                i += 1;
            }
            b'\r' | b'\n' => {
                keys.push(Key::Enter);
                i += 1;
            }
            0x7f | 0x08 => {
                keys.push(Key::Backspace);
                i += 1;
            }
            b'\t' => {
                keys.push(Key::Tab);
                i += 1;
            }
            b if b < 0x20 => {
                keys.push(Key::Ctrl((b'a' + b - 1) as char));
                i += 1;
            }
            _ => match std::str::from_utf8(&data[i..]).ok().and_then(|s| s.chars().next()) {
                Some(c) => {
                    keys.push(Key::Char(c));
                    i += c.len_utf8();
                }
                None => {
                    keys.push(Key::Char(data[i] as char));
                    i += 1;
                }
            },
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_arrow_keys_and_plain_text() {
        let bytes = b"hi\x1b[A\r";
        let keys = decode_keys(bytes);
        assert_eq!(
            keys,
            vec![
                Key::Char('h'),
                Key::Char('i'),
                Key::ArrowUp,
                Key::Enter,
            ]
        );
    }

    #[test]
    fn decodes_control_characters() {
        assert_eq!(decode_keys(&[0x01]), vec![Key::Ctrl('a')]);
        assert_eq!(decode_keys(&[0x18]), vec![Key::Ctrl('x')]);
    }

    #[test]
    fn user_key_db_rejects_unknown_user() {
        let db = UserKeyDb(HashMap::new());
        let key = russh_keys::key::KeyPair::generate_ed25519().unwrap();
        let public = key.clone_public_key().unwrap();
        assert!(!db.authorizes("nobody", &public));
    }
}
