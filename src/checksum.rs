//! Checksum manifest verification
//!
//! Releases publish a `checksums.txt` with one `<sha256> <filename>` line per
//! artifact. A manifest that cannot be fetched, or that does not list the
//! archive, downgrades to a warning; only a hash mismatch is fatal.

use crate::download::Downloader;
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Archive filename -> hex SHA-256
pub type ChecksumManifest = HashMap<String, String>;

/// How the checksum step ended when it did not fail the install
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The archive matched its manifest entry
    Verified,
    /// The manifest had no entry for the archive
    SkippedNoEntry,
    /// The manifest could not be fetched; carries the reason
    SkippedFetchError(String),
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified)
    }
}

/// Parse `checksums.txt` content
///
/// Lines with fewer than two whitespace-separated tokens are skipped.
pub fn parse_manifest(content: &str) -> ChecksumManifest {
    let mut checksums = HashMap::new();
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if let (Some(hash), Some(filename)) = (parts.next(), parts.next()) {
            checksums.insert(filename.to_string(), hash.to_string());
        }
    }
    checksums
}

/// SHA-256 of a file as lowercase hex, read in 8KB blocks
pub fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path.as_ref())?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare a file against an expected hex digest (case-insensitive)
pub fn verify_file<P: AsRef<Path>>(path: P, expected: &str) -> Result<()> {
    let actual = sha256_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Verify `file` against the entry for `expected_filename` in the manifest
/// at `manifest_url`
pub fn verify(
    downloader: &Downloader,
    file: &Path,
    manifest_url: &str,
    expected_filename: &str,
) -> Result<VerificationOutcome> {
    let content = match downloader.fetch_text(manifest_url) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not verify checksum: {}", e);
            return Ok(VerificationOutcome::SkippedFetchError(e.to_string()));
        }
    };

    let manifest = parse_manifest(&content);
    let Some(expected) = manifest.get(expected_filename) else {
        warn!(
            "Checksum for {} not found in manifest, skipping verification",
            expected_filename
        );
        return Ok(VerificationOutcome::SkippedNoEntry);
    };

    verify_file(file, expected)?;
    info!("Checksum verified.");
    Ok(VerificationOutcome::Verified)
}
