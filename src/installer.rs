//! Install pipeline
//!
//! Downloads the release archive for the running platform, checks it against
//! the release's checksum manifest, and extracts it into a staging directory
//! next to `{install_root}/bin`. Staged entries are moved over the previous
//! installation only once extraction has finished.
//!
//! # Examples
//!
//! ```no_run
//! use tokenuse_shim::{Config, Installer, PlatformInfo};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let installer = Installer::new(config, PlatformInfo::current()?)?;
//! let report = installer.install()?;
//! println!("Installed to: {:?}", report.binary_path);
//! # Ok(())
//! # }
//! ```

use crate::archive;
use crate::checksum::{self, VerificationOutcome};
use crate::config::Config;
use crate::download::Downloader;
use crate::platform::PlatformInfo;
use crate::release::{self, ReleaseArtifact};
use crate::{Error, Result};
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Progress callback for download/installation operations
///
/// Called with:
/// - `message`: Description of current operation (e.g., "Downloading")
/// - `current`: Current progress (bytes processed)
/// - `total`: Total bytes, or 0 when unknown
pub type ProgressCallback = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// File name the archive is downloaded to inside the bin directory
pub const ARCHIVE_NAME: &str = "tokenuse.tar.gz";

const LOCK_FILE_NAME: &str = ".install.lock";

/// Extraction target inside the install root, promoted into `bin/` on success
const STAGING_DIR_NAME: &str = ".staging-bin";

/// Result of a completed install
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub artifact: ReleaseArtifact,
    pub binary_path: PathBuf,
    pub verification: VerificationOutcome,
}

pub struct Installer {
    config: Config,
    platform: PlatformInfo,
    downloader: Downloader,
    progress: Option<ProgressCallback>,
}

impl Installer {
    pub fn new(config: Config, platform: PlatformInfo) -> Result<Self> {
        let downloader = Downloader::new(config.download.max_redirects)?;
        Ok(Self {
            config,
            platform,
            downloader,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Path the binary is installed at
    pub fn binary_path(&self) -> PathBuf {
        self.config.bin_dir().join(self.platform.binary_name())
    }

    /// Run the full pipeline
    ///
    /// The downloaded archive is removed before returning, whether or not the
    /// install succeeded.
    pub fn install(&self) -> Result<InstallReport> {
        let artifact = release::locate(&self.config.release_host, &self.config.version, &self.platform)?;
        info!(
            "Installing TokenUse CLI v{} for {}...",
            artifact.version, artifact.platform_tag
        );

        fs::create_dir_all(&self.config.install_root)?;
        let _lock = InstallLock::acquire(&self.config.install_root)?;

        let bin_dir = self.config.bin_dir();
        fs::create_dir_all(&bin_dir)?;

        let archive_path = bin_dir.join(ARCHIVE_NAME);
        let result = self.fetch_and_unpack(&artifact, &archive_path, &bin_dir);

        if archive_path.exists() {
            if let Err(e) = fs::remove_file(&archive_path) {
                warn!("Failed to remove {}: {}", archive_path.display(), e);
            }
        }

        let verification = result?;
        info!("TokenUse CLI installed successfully!");

        Ok(InstallReport {
            artifact,
            binary_path: self.binary_path(),
            verification,
        })
    }

    fn fetch_and_unpack(
        &self,
        artifact: &ReleaseArtifact,
        archive_path: &Path,
        bin_dir: &Path,
    ) -> Result<VerificationOutcome> {
        info!("Downloading from {}...", artifact.download_url);
        self.downloader
            .download(&artifact.download_url, archive_path, self.progress.as_ref())?;

        info!("Verifying checksum...");
        let verification = checksum::verify(
            &self.downloader,
            archive_path,
            &artifact.checksum_manifest_url,
            &artifact.expected_filename,
        )?;

        info!("Extracting...");
        let staging_dir = self.config.install_root.join(STAGING_DIR_NAME);
        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir)?;
        }

        let staged = archive::extract(archive_path, &staging_dir, Path::new(self.platform.binary_name()))
            .and_then(|()| promote_staged(&staging_dir, bin_dir));

        if staging_dir.exists() {
            if let Err(e) = fs::remove_dir_all(&staging_dir) {
                warn!("Failed to remove {}: {}", staging_dir.display(), e);
            }
        }

        staged?;
        Ok(verification)
    }
}

/// Move every top-level entry of `staging_dir` into `bin_dir`
///
/// Files replace their counterpart with a rename. A staged directory replaces
/// an existing entry of the same name wholesale.
fn promote_staged(staging_dir: &Path, bin_dir: &Path) -> Result<()> {
    for entry in fs::read_dir(staging_dir)? {
        let entry = entry?;
        let target = bin_dir.join(entry.file_name());

        if let Ok(existing) = fs::symlink_metadata(&target) {
            if existing.is_dir() {
                fs::remove_dir_all(&target)?;
            } else if entry.file_type()?.is_dir() {
                fs::remove_file(&target)?;
            }
        }

        debug!(from = %entry.path().display(), to = %target.display(), "Promoting");
        fs::rename(entry.path(), &target)?;
    }
    Ok(())
}

/// Exclusive lock on the install root, held for the duration of an install
///
/// Released when dropped. The lock file itself is left in place so that a
/// concurrent installer blocked on it keeps locking the same inode.
#[derive(Debug)]
struct InstallLock {
    _file: File,
    path: PathBuf,
}

impl InstallLock {
    fn acquire(install_root: &Path) -> Result<Self> {
        let path = install_root.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| Error::Lock {
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), "Waiting for install lock");
        FileExt::lock_exclusive(&file).map_err(|source| Error::Lock {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Install lock acquired");

        Ok(Self { _file: file, path })
    }
}

impl Drop for InstallLock {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Install lock released");
    }
}
