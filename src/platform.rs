//! Platform detection
//!
//! Maps the running operating system and CPU architecture onto the tags used
//! in release artifact names (`linux_amd64`, `darwin_arm64`, ...).
//!
//! # Examples
//!
//! ```
//! use tokenuse_shim::PlatformInfo;
//!
//! let platform = PlatformInfo::from_raw("linux", "x86_64").unwrap();
//! assert_eq!(platform.tag(), "linux_amd64");
//! ```

use crate::{Error, Result};
use std::env;
use std::fmt;

/// Operating systems a release is published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Darwin,
    Linux,
    Windows,
}

impl Os {
    pub fn as_str(self) -> &'static str {
        match self {
            Os::Darwin => "darwin",
            Os::Linux => "linux",
            Os::Windows => "windows",
        }
    }

    /// Accepts Node-style (`win32`, `x64`) and Rust-style (`macos`) names
    fn from_raw(raw: &str) -> Result<Self> {
        match raw {
            "darwin" | "macos" => Ok(Os::Darwin),
            "linux" => Ok(Os::Linux),
            "win32" | "windows" => Ok(Os::Windows),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architectures a release is published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    fn from_raw(raw: &str) -> Result<Self> {
        match raw {
            "x64" | "amd64" | "x86_64" => Ok(Arch::Amd64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            other => Err(Error::UnsupportedPlatform(format!("architecture {}", other))),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized platform of the running process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformInfo {
    pub os: Os,
    pub arch: Arch,
}

impl PlatformInfo {
    pub fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the platform this process is running on
    ///
    /// Fails with [`Error::UnsupportedPlatform`] for anything outside the
    /// darwin/linux/windows x amd64/arm64 matrix. There is no fallback.
    pub fn current() -> Result<Self> {
        Self::from_raw(env::consts::OS, env::consts::ARCH)
    }

    /// Normalize raw OS and architecture names
    pub fn from_raw(os: &str, arch: &str) -> Result<Self> {
        let os = Os::from_raw(os)?;
        let arch = Arch::from_raw(arch)?;
        Ok(Self { os, arch })
    }

    /// Tag used in artifact names, e.g. `linux_amd64`
    pub fn tag(&self) -> String {
        format!("{}_{}", self.os, self.arch)
    }

    /// File name of the installed binary for this platform
    pub fn binary_name(&self) -> &'static str {
        match self.os {
            Os::Windows => "tokenuse.exe",
            Os::Darwin | Os::Linux => "tokenuse",
        }
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}
