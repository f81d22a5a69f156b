//! Release archive extraction
//!
//! Release tarballs wrap their payload in a single top-level directory
//! (`tokenuse_1.2.3_linux_amd64/tokenuse`). Extraction drops that first
//! component so the payload lands directly in the destination directory.

use crate::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::debug;

/// Extract a `.tar.gz` into `dest_dir`, stripping one leading path component
///
/// If `dest_dir/binary_relative_path` exists afterwards it is made executable.
/// Entries already written are left in place when extraction fails.
pub fn extract(archive_path: &Path, dest_dir: &Path, binary_relative_path: &Path) -> Result<()> {
    unpack_stripped(archive_path, dest_dir)
        .map_err(|e| Error::ExtractionFailed(format!("{}: {}", archive_path.display(), e)))?;

    let binary_path = dest_dir.join(binary_relative_path);
    if binary_path.exists() {
        make_executable(&binary_path)
            .map_err(|e| Error::ExtractionFailed(format!("{}: {}", binary_path.display(), e)))?;
    }

    Ok(())
}

fn unpack_stripped(archive_path: &Path, dest_dir: &Path) -> std::result::Result<(), String> {
    let tar_gz = File::open(archive_path).map_err(|e| e.to_string())?;
    let mut archive = Archive::new(GzDecoder::new(tar_gz));

    fs::create_dir_all(dest_dir).map_err(|e| e.to_string())?;

    let entries = archive.entries().map_err(|e| e.to_string())?;
    for entry in entries {
        let mut entry = entry.map_err(|e| e.to_string())?;
        let entry_type = entry.header().entry_type();

        match entry_type {
            EntryType::Regular | EntryType::Continuous | EntryType::Directory | EntryType::Symlink => {}
            EntryType::XGlobalHeader => continue,
            other => {
                let path = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
                return Err(format!("unsupported entry type {:?} for {}", other, path));
            }
        }

        let entry_path = entry.path().map_err(|e| e.to_string())?.into_owned();
        let Some(relative) = strip_first_component(&entry_path)? else {
            // The wrapper directory itself
            continue;
        };

        if entry_type == EntryType::Symlink {
            let link = entry.link_name().map_err(|e| e.to_string())?.unwrap_or_default();
            if link
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            {
                return Err(format!(
                    "unsafe symlink in archive: {} -> {}",
                    entry_path.display(),
                    link.display()
                ));
            }
        }

        let target = dest_dir.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        debug!(entry = %entry_path.display(), target = %target.display(), "Unpacking");
        entry
            .unpack(&target)
            .map_err(|e| format!("failed to unpack {}: {}", entry_path.display(), e))?;
    }

    Ok(())
}

/// Drop the first path component, rejecting paths that could escape the
/// destination
///
/// Returns `None` when nothing remains after stripping.
fn strip_first_component(path: &Path) -> std::result::Result<Option<PathBuf>, String> {
    let mut components = path.components().filter(|c| !matches!(c, Component::CurDir));

    match components.next() {
        None => return Ok(None),
        Some(Component::Normal(_)) => {}
        Some(_) => return Err(format!("unsafe path in archive: {}", path.display())),
    }

    let mut stripped = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => stripped.push(part),
            _ => return Err(format!("unsafe path in archive: {}", path.display())),
        }
    }

    if stripped.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(stripped))
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
