use std::{
    env,
    io::{Error as IOError, ErrorKind},
    path::Path,
};

use serde::Deserialize;
use tokio::{fs::File, io::AsyncReadExt};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub lavalink: LavalinkConfig,
    pub permissions: PermissionsConfig,
    pub lyrics: LyricsConfig,
}

impl Config {
    /// Read configuration file
    ///
    /// A missing file yields the defaults, so a bot configured purely through
    /// the environment still starts.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IOError> {
        let mut file = match File::open(path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf).await?;

        Self::from_toml(&buf)
    }

    pub fn from_toml(buf: &str) -> Result<Self, IOError> {
        toml::from_str(buf).map_err(|e| IOError::new(ErrorKind::InvalidData, e))
    }

    /// Environment variables win over the file.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Some(prefix) = var("PREFIX") {
            self.discord.prefix = prefix;
        }
        if let Some(host) = var("LAVALINK_ADDRESS") {
            self.lavalink.host = host;
        }
        if let Some(password) = var("LAVALINK_PASS") {
            self.lavalink.password = password;
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub token: String,
    pub prefix: String,
    pub status: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            prefix: "-".to_string(),
            status: "music | -help".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LavalinkConfig {
    /// `host:port` of the node
    pub host: String,
    pub password: String,
    pub ssl: bool,
    /// Source used for plain-text queries, e.g. `ytsearch`, `scsearch` or
    /// `spsearch` when the node has the Spotify plugin.
    pub search_prefix: String,
}

impl Default for LavalinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:2333".to_string(),
            password: "youshallnotpass".to_string(),
            ssl: false,
            search_prefix: "ytsearch".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PermissionsConfig {
    /// Role names allowed to purge messages.
    pub purge_roles: Vec<String>,
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            purge_roles: vec!["Supreme leader".to_string(), "COMP".to_string()],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// Lyrics endpoint, queried with a `title` parameter.
    pub url: String,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            url: "https://some-random-api.com/lyrics".to_string(),
        }
    }
}
