//! Abort controllers for connect callbacks and component handles.
//!
//! A controller is aborted exactly once, when the node or component that owns
//! it is removed. Work scoped to the signal (listeners, timers, pending
//! requests) registers an `on_abort` callback to tear itself down.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

#[derive(Default)]
struct AbortState {
    aborted: Cell<bool>,
    callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// Owner side: can abort.
#[derive(Clone, Default)]
pub struct AbortController(Rc<AbortState>);

/// Observer side: can only watch.
#[derive(Clone)]
pub struct AbortSignal(Rc<AbortState>);

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        AbortSignal(self.0.clone())
    }

    /// Abort and run every registered callback. Later calls do nothing.
    pub fn abort(&self) {
        if self.0.aborted.replace(true) {
            return;
        }
        let callbacks = std::mem::take(&mut *self.0.callbacks.borrow_mut());
        for callback in callbacks {
            callback();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.0.aborted.get()
    }
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        self.0.aborted.get()
    }

    /// Run `callback` on abort (immediately if already aborted).
    pub fn on_abort(&self, callback: impl FnOnce() + 'static) {
        if self.is_aborted() {
            callback();
        } else {
            self.0.callbacks.borrow_mut().push(Box::new(callback));
        }
    }
}

impl fmt::Debug for AbortController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortController")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_runs_callbacks_once() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        signal.on_abort(move || c.set(c.get() + 1));

        controller.abort();
        controller.abort();
        assert!(signal.is_aborted());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_late_subscriber_runs_immediately() {
        let controller = AbortController::new();
        controller.abort();
        let hit = Rc::new(Cell::new(false));
        let h = hit.clone();
        controller.signal().on_abort(move || h.set(true));
        assert!(hit.get());
    }
}
