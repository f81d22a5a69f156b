//! Installer and launcher configuration
//!
//! The release version is fixed at build time; the release host and install
//! root can be overridden through `~/.tokenuse/config.toml` or the
//! environment. Both executables build one [`Config`] and hand it to the
//! installer or launcher explicitly.
//!
//! # Examples
//!
//! ```no_run
//! use tokenuse_shim::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! println!("Installing v{} into {}", config.version, config.install_root.display());
//! # Ok(())
//! # }
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Version of the wrapped binary shipped with this release
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GitHub releases prefix the artifacts are published under
pub const DEFAULT_RELEASE_HOST: &str = "https://github.com/TokenUse/tokenuse/releases/download";

/// Name of the directory holding the installation, next to the package's `bin/`
pub const INSTALL_DIR_NAME: &str = ".tokenuse";

#[derive(Debug, Clone)]
pub struct Config {
    /// Release version to install
    pub version: String,

    /// Base URL of the release host
    pub release_host: String,

    /// Root of the installation; the binary lives in `{install_root}/bin`
    pub install_root: PathBuf,

    /// Download settings
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// Maximum number of HTTP redirects followed per request
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_max_redirects() -> usize {
    10
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
        }
    }
}

/// On-disk shape of `config.toml`; every field is optional
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    release_host: Option<String>,
    install_root: Option<PathBuf>,
    #[serde(default)]
    download: DownloadConfig,
}

impl Config {
    pub fn new(
        version: impl Into<String>,
        release_host: impl Into<String>,
        install_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            version: version.into(),
            release_host: release_host.into(),
            install_root: install_root.into(),
            download: DownloadConfig::default(),
        }
    }

    /// Get the config file path
    ///
    /// Uses TOKENUSE_CONFIG_DIR if set, otherwise ~/.tokenuse/config.toml
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(config_dir) = std::env::var("TOKENUSE_CONFIG_DIR") {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".tokenuse").join("config.toml"))
    }

    /// Load the configuration
    ///
    /// Environment variable overrides:
    /// - `TOKENUSE_RELEASE_HOST`: overrides `release_host`
    /// - `TOKENUSE_INSTALL_ROOT`: overrides `install_root`
    /// - `TOKENUSE_CONFIG_DIR`: overrides the config directory location
    pub fn load() -> Result<Self> {
        Self::from_file(Self::read_default_file()?)
    }

    /// Load the configuration, logging and skipping a config file that can't
    /// be read or parsed
    ///
    /// Used by the launcher.
    pub fn load_lenient() -> Result<Self> {
        let file = Self::read_default_file().unwrap_or_else(|e| {
            warn!("Ignoring config file: {}", e);
            ConfigFile::default()
        });
        Self::from_file(file)
    }

    fn read_default_file() -> Result<ConfigFile> {
        // No home directory just means no config file
        match Self::default_path() {
            Ok(path) => Self::read_file(&path),
            Err(_) => Ok(ConfigFile::default()),
        }
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let release_host = non_empty_env("TOKENUSE_RELEASE_HOST")
            .or(file.release_host)
            .unwrap_or_else(|| DEFAULT_RELEASE_HOST.to_string());

        let install_root = match non_empty_env("TOKENUSE_INSTALL_ROOT").map(PathBuf::from) {
            Some(root) => root,
            None => match file.install_root {
                Some(root) => root,
                None => default_install_root()?,
            },
        };

        Ok(Self {
            version: VERSION.to_string(),
            release_host,
            install_root,
            download: file.download,
        })
    }

    fn read_file(path: &Path) -> Result<ConfigFile> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Directory the binary is extracted into
    pub fn bin_dir(&self) -> PathBuf {
        self.install_root.join("bin")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// `{dir of current exe}/../.tokenuse`
///
/// The launcher and installer are shipped side by side in the package's
/// `bin/` directory, so both resolve the same root.
pub fn default_install_root() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let exe_dir = exe
        .parent()
        .ok_or_else(|| Error::Other(format!("Executable has no parent: {}", exe.display())))?;
    let package_root = exe_dir.parent().unwrap_or(exe_dir);
    Ok(package_root.join(INSTALL_DIR_NAME))
}
