//! tokenuse-shim - installer and launcher for the prebuilt TokenUse CLI
//!
//! The package ships two small executables. `tokenuse-install` runs once at
//! package install time: it downloads the release archive for the running
//! platform, verifies it against the release's `checksums.txt`, and unpacks
//! it. `tokenuse` then forwards every invocation to the installed binary.
//!
//! # Examples
//!
//! ```no_run
//! use tokenuse_shim::{Config, Installer, Launcher, PlatformInfo};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//!
//! let report = Installer::new(config.clone(), PlatformInfo::current()?)?.install()?;
//! println!("Checksum: {:?}", report.verification);
//!
//! let code = Launcher::new(&config.install_root).run(["status"])?;
//! std::process::exit(code);
//! # }
//! ```
//!
//! # Modules
//!
//! - [`platform`] - Map OS/architecture to release platform tags
//! - [`release`] - Derive artifact and checksum manifest URLs
//! - [`download`] - HTTP downloads with bounded redirect following
//! - [`checksum`] - Parse `checksums.txt` and verify SHA-256 digests
//! - [`archive`] - Extract release tarballs
//! - [`installer`] - The install pipeline
//! - [`launcher`] - Run the installed binary
//! - [`config`] - Installer and launcher configuration
//! - [`logging`] - `tracing` subscriber setup for the executables
//! - [`error`] - Error types and result handling

pub mod archive;
pub mod checksum;
pub mod config;
pub mod download;
pub mod error;
pub mod installer;
pub mod launcher;
pub mod logging;
pub mod platform;
pub mod release;

pub use checksum::{parse_manifest, sha256_file, ChecksumManifest, VerificationOutcome};
pub use config::Config;
pub use download::Downloader;
pub use error::{Error, Result};
pub use installer::{InstallReport, Installer, ProgressCallback};
pub use launcher::Launcher;
pub use platform::{Arch, Os, PlatformInfo};
pub use release::{locate, ReleaseArtifact};
