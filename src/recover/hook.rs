//! Panic-site backtrace capture.
//!
//! `catch_unwind` only yields the panic payload; the stack has already
//! unwound by the time the wrapper sees it. To attach the trace of the panic
//! site to a [`super::PanicReport`], a process-wide panic hook snapshots
//! `Backtrace::force_capture()` into a thread-local slot at the moment the
//! panic is raised. The unwind is caught on the same thread that polled the
//! handler future, so the wrapper can take the snapshot right back out.

use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::sync::Once;

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Installs the backtrace-capturing panic hook. Idempotent.
///
/// Replaces the default hook, so recovered panics no longer print to stderr;
/// the recovery wrapper logs them through tracing instead.
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        std::panic::set_hook(Box::new(|_info| {
            LAST_BACKTRACE.with(|slot| {
                *slot.borrow_mut() = Some(Backtrace::force_capture());
            });
        }));
    });
}

/// Takes the backtrace captured by the most recent panic on this thread.
pub(crate) fn take_captured_backtrace() -> Option<Backtrace> {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    #[test]
    fn hook_snapshots_the_panic_site() {
        install_panic_hook();

        let result = catch_unwind(AssertUnwindSafe(|| panic!("boom")));
        assert!(result.is_err());

        let backtrace = take_captured_backtrace();
        assert!(backtrace.is_some());

        // the slot is cleared by take
        assert!(take_captured_backtrace().is_none());
    }
}
