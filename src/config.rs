//! Server configuration: TOML file, then `TEXSWAP_*` environment overrides.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_MAX_UPLOAD_MB: u64 = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    #[default]
    Production,
}

impl Mode {
    fn default_host(self) -> &'static str {
        match self {
            Mode::Development => "127.0.0.1",
            Mode::Production => "0.0.0.0",
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Mode::Development => 5000,
            Mode::Production => 5001,
        }
    }
}

/// Fields as written in the TOML file; everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    mode: Option<Mode>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    max_upload_mb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub host: String,
    pub port: u16,
    /// Holds `uploads/`, `extracted/` and `modified/`.
    pub data_dir: PathBuf,
    pub max_upload_mb: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_mode(Mode::default())
    }
}

impl Config {
    pub fn for_mode(mode: Mode) -> Self {
        Self {
            mode,
            host: mode.default_host().to_string(),
            port: mode.default_port(),
            data_dir: PathBuf::from("."),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("unity-texswap").join("config.toml"))
    }

    /// Loads `path` (which must exist), else the default location if present,
    /// then applies the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some(read_file(path)?),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Some(read_file(&path)?),
                _ => None,
            },
        };
        Self::resolve(file.unwrap_or_default(), |key| std::env::var(key).ok())
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file = toml::from_str(text).map_err(|source| ConfigError::Parse { path: PathBuf::from("<inline>"), source })?;
        Self::resolve(file, |_| None)
    }

    fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = match env("TEXSWAP_ENV") {
            Some(v) if v.eq_ignore_ascii_case("development") => Mode::Development,
            Some(_) => Mode::Production,
            None => file.mode.unwrap_or_default(),
        };
        let mut config = Self::for_mode(mode);
        if let Some(host) = file.host {
            config.host = host;
        }
        if let Some(port) = file.port {
            config.port = port;
        }
        if let Some(dir) = file.data_dir {
            config.data_dir = dir;
        }
        if let Some(mb) = file.max_upload_mb {
            config.max_upload_mb = mb;
        }

        if let Some(host) = env("TEXSWAP_HOST") {
            config.host = host;
        }
        if let Some(port) = env("TEXSWAP_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidValue { key: "TEXSWAP_PORT", value: port })?;
        }
        if let Some(dir) = env("TEXSWAP_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(mb) = env("TEXSWAP_MAX_UPLOAD_MB") {
            config.max_upload_mb =
                mb.parse().map_err(|_| ConfigError::InvalidValue { key: "TEXSWAP_MAX_UPLOAD_MB", value: mb })?;
        }
        Ok(config)
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_follow_mode() {
        let prod = Config::resolve(ConfigFile::default(), env(&[])).unwrap();
        assert_eq!(prod.address(), "0.0.0.0:5001");
        assert_eq!(prod.max_upload_bytes(), 500 * 1024 * 1024);

        let dev = Config::resolve(ConfigFile::default(), env(&[("TEXSWAP_ENV", "development")])).unwrap();
        assert_eq!(dev.address(), "127.0.0.1:5000");
    }

    #[test]
    fn environment_overrides_file() {
        let file: ConfigFile = toml::from_str("port = 8080\ndata_dir = \"/srv/tex\"\nmax_upload_mb = 10").unwrap();
        let config = Config::resolve(file, env(&[("TEXSWAP_PORT", "9000")])).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/srv/tex"));
        assert_eq!(config.max_upload_mb, 10);
    }

    #[test]
    fn bad_values_are_reported() {
        let err = Config::resolve(ConfigFile::default(), env(&[("TEXSWAP_PORT", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "TEXSWAP_PORT", .. }));
        assert!(Config::from_toml("colour = \"red\"").is_err());
    }

    #[test]
    fn reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mode = \"development\"\nhost = \"localhost\"").unwrap();
        let file = read_file(&path).unwrap();
        let config = Config::resolve(file, env(&[])).unwrap();
        assert_eq!(config.mode, Mode::Development);
        assert_eq!(config.address(), "localhost:5000");
        assert!(matches!(read_file(&dir.path().join("missing.toml")), Err(ConfigError::Read { .. })));
    }
}
