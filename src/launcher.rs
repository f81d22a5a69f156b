//! Launching the installed binary
//!
//! The launcher has no options of its own. Arguments, environment and stdio
//! are handed to the installed binary untouched, and its exit code becomes
//! ours.

use crate::{Error, Result};
use std::env::consts::EXE_SUFFIX;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub struct Launcher {
    install_root: PathBuf,
}

impl Launcher {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
        }
    }

    /// `{install_root}/bin/tokenuse` (`tokenuse.exe` on Windows)
    pub fn binary_path(&self) -> PathBuf {
        binary_path(&self.install_root)
    }

    /// Run the installed binary with `args` and wait for it
    ///
    /// Returns the child's exit code, or 0 when it has none (killed by a
    /// signal).
    pub fn run<I, S>(&self, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let path = self.binary_path();
        if !path.is_file() {
            return Err(Error::BinaryNotFound { path });
        }

        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        debug!(binary = %path.display(), args = args.len(), "Spawning");

        let status = Command::new(&path)
            .args(&args)
            .status()
            .map_err(|source| Error::Spawn {
                path: path.clone(),
                source,
            })?;

        Ok(status.code().unwrap_or(0))
    }
}

pub fn binary_path(install_root: &Path) -> PathBuf {
    install_root
        .join("bin")
        .join(format!("tokenuse{}", EXE_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_binary_path_layout() {
        let launcher = Launcher::new("/opt/pkg/.tokenuse");
        let path = launcher.binary_path();
        assert_eq!(path.parent().unwrap(), Path::new("/opt/pkg/.tokenuse/bin"));
        if cfg!(windows) {
            assert_eq!(path.file_name().unwrap(), "tokenuse.exe");
        } else {
            assert_eq!(path.file_name().unwrap(), "tokenuse");
        }
    }

    #[test]
    fn test_run_missing_binary() {
        let temp_dir = TempDir::new().unwrap();
        let launcher = Launcher::new(temp_dir.path());

        let err = launcher.run(["status"]).unwrap_err();
        assert!(matches!(err, Error::BinaryNotFound { .. }));
        assert!(err.to_string().contains("reinstall"));
    }

    #[cfg(unix)]
    fn install_script(root: &Path, script: &str, mode: u32) {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = root.join("bin");
        fs::create_dir_all(&bin_dir).unwrap();
        let path = bin_dir.join("tokenuse");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_run_propagates_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        install_script(temp_dir.path(), "#!/bin/sh\nexit 7\n", 0o755);

        let code = Launcher::new(temp_dir.path()).run(Vec::<String>::new()).unwrap();
        assert_eq!(code, 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_forwards_arguments_verbatim() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("args.txt");
        install_script(
            temp_dir.path(),
            &format!(
                "#!/bin/sh\nfor a in \"$@\"; do echo \"$a\" >> '{}'; done\n",
                out.display()
            ),
            0o755,
        );

        let code = Launcher::new(temp_dir.path())
            .run(["status", "--json", "two words"])
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "status\n--json\ntwo words\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_signal_termination_maps_to_zero() {
        let temp_dir = TempDir::new().unwrap();
        install_script(temp_dir.path(), "#!/bin/sh\nkill -9 $$\n", 0o755);

        let code = Launcher::new(temp_dir.path()).run(Vec::<String>::new()).unwrap();
        assert_eq!(code, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_spawn_error() {
        let temp_dir = TempDir::new().unwrap();
        install_script(temp_dir.path(), "#!/bin/sh\nexit 0\n", 0o644);

        let err = Launcher::new(temp_dir.path()).run(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
