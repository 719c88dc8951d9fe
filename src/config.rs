use std::path::{Path, PathBuf};
use std::{env, fmt, fs};

use error_stack::{IntoReport, Report, ResultExt};
use ini::Ini;
use uuid::Uuid;

/// `AppConfig` holds static configuration values for the application,
/// such as the identity reported to Plex and the config file locations.
pub struct AppConfig;

impl AppConfig {
    /// Product name sent as `X-Plex-Product`.
    pub const PRODUCT: &'static str = "Plex.organize";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    /// Environment variable naming an alternate config file.
    pub const CONFIG_PATH_ENV: &'static str = "PLEXAPI_CONFIG_PATH";
    pub const CONFIG_FILE_NAME: &'static str = "config.ini";
    /// Tracks below this bitrate (kbps) are reported by the playlist analyzer.
    pub const DEFAULT_MIN_BITRATE: u32 = 320;
}

#[derive(Debug, Clone)]
pub struct ConfigError;

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Config error")
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = error_stack::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    pub myplex_username: Option<String>,
    pub myplex_password: Option<String>,
    pub server_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeConfig {
    pub force_all: bool,
    pub force_lossless: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeConfig {
    pub auth: AuthConfig,
    pub upgrade: UpgradeConfig,
    pub min_bitrate: u32,
    pub client_identifier: String,
    /// File the values were read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            auth: AuthConfig::default(),
            upgrade: UpgradeConfig::default(),
            min_bitrate: AppConfig::DEFAULT_MIN_BITRATE,
            client_identifier: Uuid::new_v4().to_string(),
            source: None,
        }
    }
}

impl OrganizeConfig {
    /// Loads the config file found by [`OrganizeConfig::get_config_file_path`].
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(Self::get_config_file_path().as_deref())
    }

    /// A missing file yields the defaults.
    pub fn load_from(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) if path.exists() => Self::read_config_file(path),
            Some(path) => {
                log::debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn read_config_file(path: &Path) -> ConfigResult<Self> {
        log::debug!("Reading config file from: {}", path.display());
        let content = fs::read_to_string(path)
            .into_report()
            .attach_printable(format!("Failed to read config file at {}", path.display()))
            .change_context(ConfigError)?;
        let mut config = Self::parse(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn parse(content: &str) -> ConfigResult<Self> {
        let ini = Ini::load_from_str(content)
            .into_report()
            .attach_printable("Failed to parse the config file. Ensure it is valid INI.")
            .change_context(ConfigError)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> ConfigResult<Self> {
        let value = |section: &str, key: &str| {
            ini.get_from(Some(section), key)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let auth = AuthConfig {
            myplex_username: value("auth", "myplex_username"),
            myplex_password: value("auth", "myplex_password"),
            server_token: value("auth", "server_token"),
        };
        let upgrade = UpgradeConfig {
            force_all: parse_flag("upgrade.force_all", value("upgrade", "force_all"))?,
            force_lossless: parse_flag("upgrade.force_lossless", value("upgrade", "force_lossless"))?,
        };
        let min_bitrate = match value("analyze", "min_bitrate") {
            Some(raw) => raw
                .parse::<u32>()
                .into_report()
                .attach_printable(format!("analyze.min_bitrate is not a number: {}", raw))
                .change_context(ConfigError)?,
            None => AppConfig::DEFAULT_MIN_BITRATE,
        };
        let client_identifier =
            value("header", "identifier").unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self {
            auth,
            upgrade,
            min_bitrate,
            client_identifier,
            source: None,
        })
    }

    /// Resolves the config file location: the environment override first, then a
    /// `config.ini` next to the executable, then `~/.config/plexapi/config.ini`.
    pub fn get_config_file_path() -> Option<PathBuf> {
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        resolve_config_path(
            env::var(AppConfig::CONFIG_PATH_ENV).ok().as_deref(),
            exe_dir.as_deref(),
            dirs::home_dir().as_deref(),
        )
    }
}

fn resolve_config_path(
    env_path: Option<&str>,
    exe_dir: Option<&Path>,
    home_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = env_path.filter(|path| !path.is_empty()) {
        return Some(expand_home(path, home_dir));
    }
    let local_config = exe_dir.map(|dir| dir.join(AppConfig::CONFIG_FILE_NAME));
    if let Some(local_config) = local_config.filter(|path| path.exists()) {
        return Some(local_config);
    }
    home_dir.map(|home| {
        home.join(".config")
            .join("plexapi")
            .join(AppConfig::CONFIG_FILE_NAME)
    })
}

fn parse_flag(name: &str, raw: Option<String>) -> ConfigResult<bool> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Report::new(ConfigError)
            .attach_printable(format!("{} must be 0 or 1, found {}", name, raw))),
    }
}

fn expand_home(path: &str, home_dir: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home_dir) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
