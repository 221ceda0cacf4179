use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::session::SessionConfig;
use crate::transport::websocket_url;

/// Environment variable prefix, e.g. `LOQA_CALL__SERVER__ORIGIN`
const ENV_PREFIX: &str = "LOQA_CALL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub audio: AudioConfig,
    pub session: SessionOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Page origin the websocket URL is derived from
    pub origin: String,
    /// Websocket path on the server
    pub path: String,
    /// Explicit websocket URL, overrides origin and path
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub frame_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionOptions {
    pub keep_open_without_capture: bool,
    pub recordings_path: Option<String>,
}

impl Config {
    /// Load defaults, then `path` (any supported extension, optional), then environment
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::defaults()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Built-in defaults only
    pub fn from_defaults() -> Result<Self> {
        let cfg: Self = Self::defaults()?.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("service.name", "loqa-call")?
            .set_default("server.origin", "http://localhost:8000")?
            .set_default("server.path", crate::transport::DEFAULT_PATH)?
            .set_default("audio.sample_rate", crate::audio::DEFAULT_SAMPLE_RATE as i64)?
            .set_default("audio.frame_length", crate::audio::DEFAULT_FRAME_LENGTH as i64)?
            .set_default("session.keep_open_without_capture", false)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be positive");
        }
        if self.audio.frame_length == 0 {
            bail!("audio.frame_length must be positive");
        }
        self.websocket_url()?;
        Ok(())
    }

    /// Websocket URL: the explicit `server.url`, else derived from the origin
    pub fn websocket_url(&self) -> Result<String> {
        match &self.server.url {
            Some(url) => {
                if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                    bail!("server.url must start with ws:// or wss://, got {:?}", url);
                }
                Ok(url.clone())
            }
            None => websocket_url(&self.server.origin, &self.server.path),
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            url: self.websocket_url()?,
            sample_rate: self.audio.sample_rate,
            frame_length: self.audio.frame_length,
            keep_open_without_capture: self.session.keep_open_without_capture,
            recordings_path: self.session.recordings_path.as_ref().map(PathBuf::from),
            ..SessionConfig::default()
        })
    }
}
