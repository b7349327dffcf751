//! Interrupt handling.
//!
//! SIGINT and SIGTERM only set a flag. The pipeline polls it between stages
//! and unwinds with [`MixError::Interrupted`], so the scratch workspace is
//! removed on the ordinary drop path. External tools keep the default signal
//! disposition and terminate on their own.

use crate::error::{MixError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn record_signal(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install SIGINT and SIGTERM handlers that record the interrupt.
#[cfg(unix)]
pub fn install_handlers() {
    let handler = record_signal as extern "C" fn(libc::c_int);
    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: the handler only performs an atomic store, which is
        // async-signal-safe.
        let previous = unsafe { libc::signal(signal, handler as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            log::warn!("failed to install handler for signal {signal}");
        }
    }
}

/// Install SIGINT and SIGTERM handlers that record the interrupt.
#[cfg(not(unix))]
pub fn install_handlers() {}

/// Flag raised by the installed signal handlers.
#[must_use]
pub fn signal_flag() -> &'static AtomicBool {
    &INTERRUPTED
}

/// Return an error if `flag` records an interrupt.
///
/// # Errors
///
/// Returns [`MixError::Interrupted`] once the flag is raised.
pub fn check(flag: &AtomicBool) -> Result<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(MixError::Interrupted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_flag_passes() {
        let flag = AtomicBool::new(false);
        assert!(check(&flag).is_ok());
    }

    #[test]
    fn raised_flag_interrupts() {
        let flag = AtomicBool::new(true);
        assert!(matches!(check(&flag), Err(MixError::Interrupted)));
    }

    #[test]
    fn signal_flag_starts_clear() {
        assert!(check(signal_flag()).is_ok());
    }
}
