/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Event and CustomEvent.
//!
//! All mutable event state lives in `Cell`s so listeners can flip flags
//! (`stopPropagation`, `preventDefault`) through a shared handle while the
//! dispatcher is iterating the path.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::node::NodeRef;

/// <https://dom.spec.whatwg.org/#dom-event-eventphase>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EventPhase {
    None = 0,
    Capturing = 1,
    AtTarget = 2,
    Bubbling = 3,
}

/// <https://dom.spec.whatwg.org/#dictdef-eventinit>
#[derive(Clone, Copy, Debug, Default)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
}

/// One step of the event path, built at dispatch time.
#[derive(Clone)]
pub(crate) struct EventPathEntry {
    /// The node whose listeners run at this step.
    pub invocation_target: NodeRef,
    /// What `event.target` reports while this step runs (shadow
    /// retargeting).
    pub shadow_adjusted_target: NodeRef,
}

struct EventData {
    type_: RefCell<String>,
    bubbles: bool,
    cancelable: bool,
    composed: bool,
    target: RefCell<Option<NodeRef>>,
    current_target: RefCell<Option<NodeRef>>,
    phase: Cell<EventPhase>,
    stop_propagation: Cell<bool>,
    stop_immediate_propagation: Cell<bool>,
    canceled: Cell<bool>,
    in_passive_listener: Cell<bool>,
    dispatching: Cell<bool>,
    is_trusted: Cell<bool>,
    time_stamp: Cell<f64>,
    path: RefCell<Vec<EventPathEntry>>,
    detail: RefCell<Option<Rc<dyn Any>>>,
}

/// <https://dom.spec.whatwg.org/#event>
#[derive(Clone)]
pub struct Event(Rc<EventData>);

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Event {
    /// <https://dom.spec.whatwg.org/#dom-event-event>
    pub fn new(type_: &str, init: EventInit) -> Event {
        Event(Rc::new(EventData {
            type_: RefCell::new(type_.to_owned()),
            bubbles: init.bubbles,
            cancelable: init.cancelable,
            composed: init.composed,
            target: RefCell::new(None),
            current_target: RefCell::new(None),
            phase: Cell::new(EventPhase::None),
            stop_propagation: Cell::new(false),
            stop_immediate_propagation: Cell::new(false),
            canceled: Cell::new(false),
            in_passive_listener: Cell::new(false),
            dispatching: Cell::new(false),
            is_trusted: Cell::new(false),
            time_stamp: Cell::new(0.0),
            path: RefCell::new(Vec::new()),
            detail: RefCell::new(None),
        }))
    }

    /// <https://dom.spec.whatwg.org/#dom-customevent-customevent>
    pub fn new_custom(type_: &str, init: EventInit, detail: Option<Rc<dyn Any>>) -> Event {
        let event = Event::new(type_, init);
        *event.0.detail.borrow_mut() = detail;
        event
    }

    pub fn type_(&self) -> String {
        self.0.type_.borrow().clone()
    }

    pub fn bubbles(&self) -> bool {
        self.0.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.0.cancelable
    }

    /// <https://dom.spec.whatwg.org/#dom-event-composed>
    pub fn composed(&self) -> bool {
        self.0.composed
    }

    pub fn target(&self) -> Option<NodeRef> {
        self.0.target.borrow().clone()
    }

    pub fn current_target(&self) -> Option<NodeRef> {
        self.0.current_target.borrow().clone()
    }

    pub fn event_phase(&self) -> EventPhase {
        self.0.phase.get()
    }

    /// <https://dom.spec.whatwg.org/#dom-event-stoppropagation>
    pub fn stop_propagation(&self) {
        self.0.stop_propagation.set(true);
    }

    /// <https://dom.spec.whatwg.org/#dom-event-stopimmediatepropagation>
    pub fn stop_immediate_propagation(&self) {
        self.0.stop_propagation.set(true);
        self.0.stop_immediate_propagation.set(true);
    }

    /// <https://dom.spec.whatwg.org/#dom-event-preventdefault>
    ///
    /// Ignored while a passive listener is running.
    pub fn prevent_default(&self) {
        if self.0.cancelable && !self.0.in_passive_listener.get() {
            self.0.canceled.set(true);
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-event-defaultprevented>
    pub fn default_prevented(&self) -> bool {
        self.0.canceled.get()
    }

    pub fn is_trusted(&self) -> bool {
        self.0.is_trusted.get()
    }

    pub fn set_is_trusted(&self, trusted: bool) {
        self.0.is_trusted.set(trusted);
    }

    pub fn time_stamp(&self) -> f64 {
        self.0.time_stamp.get()
    }

    /// Hosts with a clock stamp events themselves; the core has no timer
    /// source.
    pub fn set_time_stamp(&self, time_stamp: f64) {
        self.0.time_stamp.set(time_stamp);
    }

    /// The CustomEvent `detail` payload, if any.
    pub fn detail(&self) -> Option<Rc<dyn Any>> {
        self.0.detail.borrow().clone()
    }

    /// <https://dom.spec.whatwg.org/#dom-event-composedpath>
    pub fn composed_path(&self) -> Vec<NodeRef> {
        self.0
            .path
            .borrow()
            .iter()
            .map(|entry| entry.invocation_target.clone())
            .collect()
    }

    pub(crate) fn is_dispatching(&self) -> bool {
        self.0.dispatching.get()
    }

    pub(crate) fn set_dispatching(&self, dispatching: bool) {
        self.0.dispatching.set(dispatching);
    }

    pub(crate) fn propagation_stopped(&self) -> bool {
        self.0.stop_propagation.get()
    }

    pub(crate) fn immediate_propagation_stopped(&self) -> bool {
        self.0.stop_immediate_propagation.get()
    }

    pub(crate) fn set_phase(&self, phase: EventPhase) {
        self.0.phase.set(phase);
    }

    pub(crate) fn set_target(&self, target: Option<NodeRef>) {
        *self.0.target.borrow_mut() = target;
    }

    pub(crate) fn set_current_target(&self, target: Option<NodeRef>) {
        *self.0.current_target.borrow_mut() = target;
    }

    pub(crate) fn set_in_passive_listener(&self, passive: bool) {
        self.0.in_passive_listener.set(passive);
    }

    pub(crate) fn set_path(&self, path: Vec<EventPathEntry>) {
        *self.0.path.borrow_mut() = path;
    }
}

impl NodeRef {
    /// <https://dom.spec.whatwg.org/#dom-document-createevent>
    pub fn create_event(&self, type_: &str, init: EventInit) -> crate::error::Fallible<Event> {
        self.as_document()
            .ok_or(crate::error::Error::InvalidNodeType)?;
        Ok(Event::new(type_, init))
    }
}
