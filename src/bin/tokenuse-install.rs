//! `tokenuse-install`: download and unpack the prebuilt TokenUse binary
//!
//! Meant to run once from the package manager's postinstall hook.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tokenuse_shim::{logging, Config, Installer, PlatformInfo, ProgressCallback, VerificationOutcome};

/// Install the TokenUse CLI binary for this platform
#[derive(Parser)]
#[command(name = "tokenuse-install")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to install into (binary goes to <DIR>/bin)
    #[arg(long, value_name = "DIR")]
    install_root: Option<PathBuf>,

    /// Release host to download from
    #[arg(long, value_name = "URL")]
    release_host: Option<String>,

    /// Don't show a download progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Indicatif download bar driven by the installer's progress callback
struct DownloadBar {
    bar: ProgressBar,
}

impl DownloadBar {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { bar }
    }

    fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |msg: &str, current: u64, total: u64| {
            if total > 0 && bar.length() != Some(total) {
                bar.set_length(total);
            }
            bar.set_message(msg.to_string());
            bar.set_position(current);
            if total > 0 && current >= total {
                bar.finish_and_clear();
            }
        })
    }

    /// Clear the bar, including when the server sent no length
    fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(root) = cli.install_root {
        config.install_root = root;
    }
    if let Some(host) = cli.release_host {
        config.release_host = host;
    }

    let platform = PlatformInfo::current()?;
    let mut installer = Installer::new(config, platform)?;
    let download_bar = (!cli.quiet).then(DownloadBar::new);
    if let Some(bar) = &download_bar {
        installer = installer.with_progress(bar.callback());
    }

    let result = installer.install();
    if let Some(bar) = &download_bar {
        bar.finish();
    }
    let report = result?;

    if !report.verification.is_verified() {
        let reason = match &report.verification {
            VerificationOutcome::SkippedFetchError(reason) => reason.as_str(),
            _ => "no checksum published for this archive",
        };
        eprintln!("Warning: installed without checksum verification ({})", reason);
    }

    println!();
    println!("Get started:");
    println!("  tokenuse          # Start tracking (auto signs in)");
    println!("  tokenuse status   # Check tracking status");

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "debug" } else { "info" });

    if let Err(e) = run(cli) {
        eprintln!("Installation failed: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidden_bar() -> DownloadBar {
        let download_bar = DownloadBar::new();
        download_bar.bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        download_bar
    }

    #[test]
    fn test_bar_finishes_without_content_length() {
        let download_bar = hidden_bar();
        let callback = download_bar.callback();

        callback("Downloading", 4096, 0);
        callback("Downloading", 8192, 0);
        assert!(!download_bar.bar.is_finished());

        download_bar.finish();
        assert!(download_bar.bar.is_finished());
    }

    #[test]
    fn test_bar_finishes_when_total_reached() {
        let download_bar = hidden_bar();
        let callback = download_bar.callback();

        callback("Downloading", 10, 10);
        assert!(download_bar.bar.is_finished());

        download_bar.finish();
        assert!(download_bar.bar.is_finished());
    }
}
