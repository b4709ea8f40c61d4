//! Conditional logging macros that check a module-level `ENABLE_LOGS` flag.
//!
//! Each module that uses them defines its own flag:
//! ```rust
//! const ENABLE_LOGS: bool = true;
//! ```
//! and imports the macros from the crate root:
//! ```rust,ignore
//! use crate::{log_info, log_warn};
//! ```

/// Macro for conditional info logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Macro for conditional warn logging.
/// Checks the `ENABLE_LOGS` const in the calling module.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
