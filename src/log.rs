//! Global logging switch. Crate log macros write to the `log` facade only while
//! logging is enabled, `--quiet` turns it off.

use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(true);

#[inline(always)]
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::SeqCst)
}

pub fn disable() {
    ENABLED.store(false, Ordering::SeqCst)
}

pub fn enable() {
    ENABLED.store(true, Ordering::SeqCst)
}

/// Default log filter, used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "warn,debugger=debug,console=debug"
    } else {
        "warn"
    }
}

/// Forward a record to the `log` facade if logging is enabled.
#[doc(hidden)]
#[macro_export]
macro_rules! _sd_log {
    ($level: ident, $($arg:tt)+) => {
        if $crate::log::is_enabled() {
            ::log::$level!($($arg)+)
        }
    };
}

#[macro_export]
macro_rules! sd_info {
    ($($arg:tt)+) => {
        $crate::_sd_log!(info, $($arg)+)
    };
}

#[macro_export]
macro_rules! sd_warn {
    ($($arg:tt)+) => {
        $crate::_sd_log!(warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! sd_debug {
    ($($arg:tt)+) => {
        $crate::_sd_log!(debug, $($arg)+)
    };
}
