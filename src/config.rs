//! Session configuration read from the environment.

use std::env;
use std::fmt;
use std::time::Duration;

use crate::live::DEFAULT_POLL_INTERVAL;

pub const API_URL_ENV: &str = "SHELF_SYNC_API_URL";
pub const TOKEN_ENV: &str = "SHELF_SYNC_TOKEN";
pub const POLL_SECS_ENV: &str = "SHELF_SYNC_POLL_SECS";
pub const ADMIN_ROOM_ENV: &str = "SHELF_SYNC_ADMIN_ROOM";

pub const DEFAULT_ADMIN_ROOM: &str = "joinAdmin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "missing env: {}", name),
            ConfigError::Invalid { name, reason } => write!(f, "invalid {}: {}", name, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    pub poll_interval: Duration,
    /// Room-join signal sent on every channel (re)connect.
    pub admin_room: String,
}

impl SyncConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        SyncConfig {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            admin_room: DEFAULT_ADMIN_ROOM.to_string(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_admin_room(mut self, room: impl Into<String>) -> Self {
        self.admin_room = room.into();
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable lookup; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_url = get(API_URL_ENV).ok_or(ConfigError::Missing(API_URL_ENV))?;
        let mut config = SyncConfig::new(api_url);

        if let Some(token) = get(TOKEN_ENV) {
            config = config.with_token(token);
        }
        if let Some(secs) = get(POLL_SECS_ENV) {
            let secs: u64 = secs.trim().parse().map_err(|err| ConfigError::Invalid {
                name: POLL_SECS_ENV,
                reason: format!("{}", err),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    name: POLL_SECS_ENV,
                    reason: "must be at least 1".into(),
                });
            }
            config = config.with_poll_interval(Duration::from_secs(secs));
        }
        if let Some(room) = get(ADMIN_ROOM_ENV) {
            config = config.with_admin_room(room);
        }
        Ok(config)
    }
}
