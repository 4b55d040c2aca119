/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! AbortController / AbortSignal.
//!
//! A signal carries a list of abort algorithms. Registering a listener with
//! a `signal` option adds an algorithm that removes that listener; aborting
//! runs each algorithm exactly once and drops the list, so double-abort is
//! a no-op. `AbortSignal.timeout` needs a host tick source and lives in the
//! embedder, not here.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type AbortAlgorithm = Box<dyn Fn()>;

struct AbortSignalData {
    aborted: Cell<bool>,
    algorithms: RefCell<Vec<AbortAlgorithm>>,
}

/// <https://dom.spec.whatwg.org/#abortsignal>
#[derive(Clone)]
pub struct AbortSignal(Rc<AbortSignalData>);

impl PartialEq for AbortSignal {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl AbortSignal {
    fn new() -> AbortSignal {
        AbortSignal(Rc::new(AbortSignalData {
            aborted: Cell::new(false),
            algorithms: RefCell::new(Vec::new()),
        }))
    }

    /// <https://dom.spec.whatwg.org/#dom-abortsignal-abort>
    pub fn new_aborted() -> AbortSignal {
        let signal = AbortSignal::new();
        signal.0.aborted.set(true);
        signal
    }

    /// <https://dom.spec.whatwg.org/#dom-abortsignal-aborted>
    pub fn aborted(&self) -> bool {
        self.0.aborted.get()
    }

    /// <https://dom.spec.whatwg.org/#abortsignal-add>
    pub(crate) fn add_algorithm(&self, algorithm: AbortAlgorithm) {
        if self.aborted() {
            return;
        }
        self.0.algorithms.borrow_mut().push(algorithm);
    }

    /// <https://dom.spec.whatwg.org/#abortsignal-signal-abort>
    pub(crate) fn signal_abort(&self) {
        if self.aborted() {
            return;
        }
        self.0.aborted.set(true);
        // Move the list out before running anything: an algorithm may touch
        // this signal again.
        let algorithms = std::mem::take(&mut *self.0.algorithms.borrow_mut());
        for algorithm in algorithms {
            algorithm();
        }
    }
}

/// <https://dom.spec.whatwg.org/#abortcontroller>
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// <https://dom.spec.whatwg.org/#dom-abortcontroller-abortcontroller>
    pub fn new() -> AbortController {
        AbortController {
            signal: AbortSignal::new(),
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-abortcontroller-signal>
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// <https://dom.spec.whatwg.org/#dom-abortcontroller-abort>
    pub fn abort(&self) {
        self.signal.signal_abort();
    }
}

impl Default for AbortController {
    fn default() -> Self {
        AbortController::new()
    }
}
