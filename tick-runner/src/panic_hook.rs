//! Panic hook that records where a module panicked instead of printing it.
//!
//! The hook is process-wide but only acts on threads that called [`install`];
//! panics anywhere else go to the previously installed hook unchanged. On an
//! armed thread the location and a backtrace are stored in a thread-local
//! slot, and [`take_trace`] hands them to the fault that caught the panic.

use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, PanicHookInfo};
use std::sync::Once;

static HOOK: Once = Once::new();

thread_local! {
    static ARMED: Cell<bool> = const { Cell::new(false) };
    static LAST_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Install the recording hook once per process and arm the calling thread.
///
/// Safe to call repeatedly; later calls only re-arm the thread.
pub fn install() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if ARMED.with(Cell::get) {
                let trace = describe(info);
                LAST_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
    ARMED.with(|armed| armed.set(true));
}

/// Whether panics on this thread are being recorded.
pub fn is_armed() -> bool {
    ARMED.with(Cell::get)
}

/// Take the trace recorded for the most recent panic on this thread.
pub fn take_trace() -> Option<String> {
    LAST_TRACE.with(|slot| slot.borrow_mut().take())
}

fn describe(info: &PanicHookInfo<'_>) -> String {
    let location = info
        .location()
        .map_or_else(|| "unknown location".to_string(), ToString::to_string);
    format!("panicked at {location}\n{}", Backtrace::force_capture())
}
