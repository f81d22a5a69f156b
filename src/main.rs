//! `tokenuse` launcher
//!
//! Takes no options of its own: every argument goes to the installed binary
//! and its exit code is returned unchanged.

use tokenuse_shim::{logging, Config, Launcher};

fn main() {
    logging::init("warn");

    let result = Config::load_lenient().and_then(|config| {
        Launcher::new(config.install_root).run(std::env::args_os().skip(1))
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
