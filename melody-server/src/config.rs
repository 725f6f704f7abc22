//! Server configuration
//!
//! Every setting resolves in the same order: command line, environment
//! variable, TOML config file, compiled default. clap covers the first two.

use clap::Parser;
use melody_common::config::{parse_host_list, resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_UPLOAD_LIMIT_MB: u64 = 50;

/// Command-line arguments for melody-server
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "melody-server")]
#[command(about = "Music library and audio relay server for Melody")]
#[command(version)]
pub struct Args {
    /// Root folder holding the database and uploaded media
    #[arg(long, env = ROOT_FOLDER_ENV)]
    pub root_folder: Option<PathBuf>,

    /// TOML config file (defaults to <config dir>/melody/config.toml)
    #[arg(long, env = "MELODY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "MELODY_BIND")]
    pub bind: Option<IpAddr>,

    /// Port to listen on
    #[arg(short, long, env = "MELODY_PORT")]
    pub port: Option<u16>,

    /// Comma-separated hosts the audio relay may fetch from (`*.example.com` allowed)
    #[arg(long, env = "MELODY_PROXY_ALLOWED_HOSTS")]
    pub proxy_allowed_hosts: Option<String>,

    /// Seconds to wait for an upstream audio response
    #[arg(long, env = "MELODY_PROXY_TIMEOUT")]
    pub proxy_timeout: Option<u64>,

    /// Public base URL used for generated links
    #[arg(long, env = "MELODY_APP_URL")]
    pub app_url: Option<String>,

    /// Maximum request size for uploads, in megabytes
    #[arg(long, env = "MELODY_UPLOAD_LIMIT_MB")]
    pub upload_limit_mb: Option<u64>,

    /// Insert demo playlists when the library is empty
    #[arg(long)]
    pub seed: bool,
}

/// Fully resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub root_folder: PathBuf,
    pub bind: IpAddr,
    pub port: u16,
    pub proxy_allowed_hosts: Vec<String>,
    pub proxy_timeout: Duration,
    pub app_url: Option<Url>,
    pub upload_limit_mb: u64,
    pub seed: bool,
}

impl ServerConfig {
    /// Merge arguments (CLI or env) over the TOML file
    pub fn resolve(args: &Args, toml: &TomlConfig) -> melody_common::Result<Self> {
        // clap already folded the env var into `args.root_folder`
        let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, toml);

        let bind = match (args.bind, toml.bind.as_deref()) {
            (Some(addr), _) => addr,
            (None, Some(raw)) => raw.trim().parse().map_err(|_| {
                melody_common::Error::Config(format!("Invalid bind address: {}", raw))
            })?,
            (None, None) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let proxy_allowed_hosts = match &args.proxy_allowed_hosts {
            Some(list) => parse_host_list(list),
            None => toml
                .proxy_allowed_hosts
                .iter()
                .flatten()
                .map(|host| host.trim().to_ascii_lowercase())
                .filter(|host| !host.is_empty())
                .collect(),
        };

        let app_url = match args.app_url.as_deref().or(toml.app_url.as_deref()) {
            Some(raw) if !raw.trim().is_empty() => Some(Url::parse(raw.trim()).map_err(|e| {
                melody_common::Error::Config(format!("Invalid app url '{}': {}", raw, e))
            })?),
            _ => None,
        };

        Ok(Self {
            root_folder,
            bind,
            port: args.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            proxy_allowed_hosts,
            proxy_timeout: Duration::from_secs(
                args.proxy_timeout
                    .or(toml.proxy_timeout_secs)
                    .unwrap_or(DEFAULT_PROXY_TIMEOUT_SECS),
            ),
            app_url,
            upload_limit_mb: args
                .upload_limit_mb
                .or(toml.upload_limit_mb)
                .unwrap_or(DEFAULT_UPLOAD_LIMIT_MB),
            seed: args.seed,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(melody_common::config::DATABASE_FILE)
    }

    pub fn upload_limit_bytes(&self) -> u64 {
        self.upload_limit_mb.saturating_mul(1024 * 1024)
    }
}
