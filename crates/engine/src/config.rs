//! CLI flags and resolved runtime configuration.
//!
//! `clap`'s derive API, in the style of `rdaum-moor`'s `host` binary.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::EngineError;

#[derive(Parser, Debug, Clone)]
#[command(name = "txwerewolves-server", about = "One Night Werewolf server")]
pub struct Cli {
    /// Disable the SSH transport entirely.
    #[arg(long)]
    pub no_ssh: bool,

    /// Disable the web (HTTP/SSE) transport entirely.
    #[arg(long)]
    pub no_web: bool,

    /// SSH listen endpoint, e.g. `0.0.0.0:2022`.
    #[arg(long, default_value = "0.0.0.0:2022")]
    pub endpoint: String,

    /// HTTP listen endpoint, e.g. `0.0.0.0:8080`.
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub web_endpoint: String,

    /// Directory containing `ssh_host_rsa_key`/`ssh_host_rsa_key.pub`.
    /// Defaults to `~/.txwerewolvesrc/ssh_keys`, falling back to
    /// `/etc/txwerewolves/ssh_keys`.
    #[arg(long)]
    pub ssh_key_dir: Option<PathBuf>,

    /// Path to the user public-key database (JSON: `user_id -> [key, ...]`).
    /// Defaults to `~/.txwerewolvesrc/users/user_keys.json`, falling back to
    /// `/etc/txwerewolves/users/user_keys.json`.
    #[arg(long)]
    pub user_db: Option<PathBuf>,
}

/// Fully resolved runtime configuration, after applying the CLI's default
/// and fallback paths and validating the "both transports disabled" usage
/// error (§6).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub ssh_enabled: bool,
    pub web_enabled: bool,
    pub ssh_endpoint: String,
    pub web_endpoint: String,
    pub ssh_key_dir: PathBuf,
    pub user_db_path: PathBuf,
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, EngineError> {
        if cli.no_ssh && cli.no_web {
            return Err(EngineError::config(
                "both --no-ssh and --no-web were given; at least one transport must run",
            ));
        }

        let ssh_key_dir = cli
            .ssh_key_dir
            .or_else(default_ssh_key_dir)
            .unwrap_or_else(|| PathBuf::from("/etc/txwerewolves/ssh_keys"));

        let user_db_path = cli
            .user_db
            .or_else(default_user_db_path)
            .unwrap_or_else(|| PathBuf::from("/etc/txwerewolves/users/user_keys.json"));

        Ok(Self {
            ssh_enabled: !cli.no_ssh,
            web_enabled: !cli.no_web,
            ssh_endpoint: cli.endpoint,
            web_endpoint: cli.web_endpoint,
            ssh_key_dir,
            user_db_path,
        })
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn default_ssh_key_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".txwerewolvesrc").join("ssh_keys"))
}

fn default_user_db_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".txwerewolvesrc").join("users").join("user_keys.json"))
}

/// Host key pair paths within `key_dir` (§6's fixed file names).
pub fn host_key_paths(key_dir: &Path) -> (PathBuf, PathBuf) {
    (
        key_dir.join("ssh_host_rsa_key"),
        key_dir.join("ssh_host_rsa_key.pub"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_transports_disabled_is_a_usage_error() {
        let cli = Cli {
            no_ssh: true,
            no_web: true,
            endpoint: "0.0.0.0:2022".to_string(),
            web_endpoint: "0.0.0.0:8080".to_string(),
            ssh_key_dir: None,
            user_db: None,
        };
        assert!(AppConfig::from_cli(cli).is_err());
    }

    #[test]
    fn explicit_ssh_key_dir_overrides_defaults() {
        let cli = Cli {
            no_ssh: false,
            no_web: false,
            endpoint: "0.0.0.0:2022".to_string(),
            web_endpoint: "0.0.0.0:8080".to_string(),
            ssh_key_dir: Some(PathBuf::from("/tmp/keys")),
            user_db: None,
        };
        let config = AppConfig::from_cli(cli).unwrap();
        assert_eq!(config.ssh_key_dir, PathBuf::from("/tmp/keys"));
    }
}
