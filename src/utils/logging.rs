//! Logging setup shared by the app and the widget extension.
//!
//! Everything in the crate logs through the `log` facade; hosts call
//! [`init_logging`] once at startup (extra calls are ignored).

use log::LevelFilter;

/// Installs `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
pub fn init_logging() {
    init_logging_with(LevelFilter::Info);
}

pub fn init_logging_with(default_level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    if builder.try_init().is_ok() {
        log::debug!("Logging initialised at {default_level}");
    }
}
