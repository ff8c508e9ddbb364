//! Panic capture for framework code
//!
//! A panic payload carries only a message. The stack at the panic site is
//! recorded by a panic hook into a thread-local slot, and picked up by the
//! `catch_unwind` that stops the unwinding on the same thread.

use forkrun_foundation::{frames_from_backtrace, StackFrame};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::sync::Once;

thread_local! {
    static LAST_PANIC: RefCell<Option<Backtrace>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install the recording hook once per process. The previous hook still
/// runs, so the usual panic message reaches stderr.
pub(crate) fn install_hook() {
    HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(Backtrace::force_capture()));
            previous(info);
        }));
    });
}

/// A panic stopped by `catch_unwind`
#[derive(Debug)]
pub(crate) struct CaughtPanic {
    pub message: String,
    backtrace: Option<Backtrace>,
}

impl CaughtPanic {
    /// Take the payload and the stack recorded for it on this thread.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        Self {
            message: panic_message(payload.as_ref()),
            backtrace: LAST_PANIC.with(|slot| slot.borrow_mut().take()),
        }
    }

    /// Native failure carrying the panic message
    pub fn failure(&self) -> anyhow::Error {
        anyhow::anyhow!(self.message.clone())
    }

    /// Frames at the panic site; `None` when no hook was installed.
    pub fn frames(&self) -> Option<Vec<StackFrame>> {
        self.backtrace.as_ref().map(frames_from_backtrace)
    }
}

/// Text of a caught panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
