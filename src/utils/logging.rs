//! Logger setup and per-module log switches.
//!
//! The macros check a module-level `ENABLE_LOGS` const so noisy modules (the
//! sample loop runs once per GPS fix) can be silenced without touching
//! `RUST_LOG`:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_info!("lap {} closed", n);
//! ```

use log::LevelFilter;

/// Initialises `env_logger` at `default_level`; `RUST_LOG` still wins for
/// any module it names. Safe to call more than once.
pub fn init_logging(default_level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .try_init();
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
