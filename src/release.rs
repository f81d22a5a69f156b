//! Release artifact naming
//!
//! Derives the archive URL, the checksum manifest URL and the archive file
//! name for a version/platform pair. No network or filesystem access.

use crate::platform::PlatformInfo;
use crate::{Error, Result};

/// Everything needed to fetch and verify one release archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseArtifact {
    pub version: String,
    pub platform_tag: String,
    pub download_url: String,
    pub checksum_manifest_url: String,
    /// Archive name as listed in `checksums.txt`
    pub expected_filename: String,
}

/// Locate the release archive for `version` on `platform`
///
/// `release_host` is the `.../releases/download` prefix; a trailing slash is
/// ignored.
pub fn locate(release_host: &str, version: &str, platform: &PlatformInfo) -> Result<ReleaseArtifact> {
    semver::Version::parse(version).map_err(|e| Error::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })?;

    let host = release_host.trim_end_matches('/');
    let platform_tag = platform.tag();
    let expected_filename = format!("tokenuse_{}_{}.tar.gz", version, platform_tag);

    Ok(ReleaseArtifact {
        version: version.to_string(),
        download_url: format!("{}/v{}/{}", host, version, expected_filename),
        checksum_manifest_url: format!("{}/v{}/checksums.txt", host, version),
        platform_tag,
        expected_filename,
    })
}
