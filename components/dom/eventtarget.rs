/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The EventTarget surface of nodes: listener registration and the
//! capture/target/bubble dispatch algorithm.

use std::cell::Cell;
use std::rc::Rc;

use log::warn;
use smallvec::SmallVec;

use crate::abortsignal::AbortSignal;
use crate::atom::Atom;
use crate::error::{Error, Fallible};
use crate::event::{Event, EventPathEntry, EventPhase};
use crate::node::{NodeFlags, NodeRef};
use crate::shadowroot::ShadowRoot;

/// The callback invoked for a listener. Binding layers adapt their own
/// `(function pointer, context)` pairs into one of these.
pub type EventCallback = Rc<dyn Fn(&Event)>;

/// <https://dom.spec.whatwg.org/#concept-event-listener>
pub(crate) struct EventListener {
    pub id: u64,
    pub type_: Atom,
    pub callback: EventCallback,
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
    pub removed: Cell<bool>,
}

/// <https://dom.spec.whatwg.org/#dictdef-addeventlisteneroptions>
#[derive(Clone, Default)]
pub struct AddEventListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
    pub signal: Option<AbortSignal>,
}

impl NodeRef {
    /// <https://dom.spec.whatwg.org/#dom-eventtarget-addeventlistener>
    ///
    /// Returns an id usable with [`NodeRef::remove_event_listener_by_id`],
    /// or 0 when no listener was added (aborted signal, duplicate).
    pub fn add_event_listener(
        &self,
        type_: &str,
        callback: EventCallback,
        options: AddEventListenerOptions,
    ) -> Fallible<u64> {
        // An already-aborted signal means the listener is never added.
        if let Some(signal) = &options.signal {
            if signal.aborted() {
                return Ok(0);
            }
        }
        let document = self.node_document();
        let doc = document.as_document().ok_or(Error::InvalidState)?;
        let type_atom = doc.intern(type_);
        {
            let rare = self.rare_data_mut();
            // Same (type, callback, capture) tuple: no duplicate.
            if rare.listeners.iter().any(|listener| {
                listener.type_.text_eq(&type_atom) &&
                    Rc::ptr_eq(&listener.callback, &callback) &&
                    listener.capture == options.capture
            }) {
                return Ok(0);
            }
            if rare.listeners.len() >= doc.limits().max_listeners_per_target {
                warn!("listener quota exceeded on {:?}", self);
                return Err(Error::QuotaExceeded);
            }
        }
        let id = doc.next_listener_id();
        let listener = Rc::new(EventListener {
            id,
            type_: type_atom,
            callback,
            capture: options.capture,
            once: options.once,
            passive: options.passive,
            removed: Cell::new(false),
        });
        self.rare_data_mut().listeners.push(listener);
        self.set_flag(NodeFlags::HAS_EVENT_LISTENERS, true);
        if let Some(signal) = &options.signal {
            let node = self.downgrade();
            signal.add_algorithm(Box::new(move || {
                if let Some(node) = node.upgrade() {
                    node.remove_listener_by_id(id);
                }
            }));
        }
        Ok(id)
    }

    /// <https://dom.spec.whatwg.org/#dom-eventtarget-removeeventlistener>
    pub fn remove_event_listener(&self, type_: &str, callback: &EventCallback, capture: bool) {
        let mut rare = self.rare_data_mut();
        if let Some(position) = rare.listeners.iter().position(|listener| {
            listener.type_ == *type_ &&
                Rc::ptr_eq(&listener.callback, callback) &&
                listener.capture == capture
        }) {
            rare.listeners[position].removed.set(true);
            rare.listeners.remove(position);
        }
    }

    pub(crate) fn remove_listener_by_id(&self, id: u64) {
        let mut rare = self.rare_data_mut();
        if let Some(position) = rare.listeners.iter().position(|listener| listener.id == id) {
            rare.listeners[position].removed.set(true);
            rare.listeners.remove(position);
        }
    }

    /// Removes a listener by the id [`NodeRef::add_event_listener`]
    /// returned. FFI callers cannot compare callbacks for identity, so they
    /// remove by id instead.
    pub fn remove_event_listener_by_id(&self, id: u64) {
        if id != 0 {
            self.remove_listener_by_id(id);
        }
    }

    pub fn has_event_listeners(&self) -> bool {
        self.flags().contains(NodeFlags::HAS_EVENT_LISTENERS) &&
            self.rare_data()
                .map(|rare| !rare.listeners.is_empty())
                .unwrap_or(false)
    }

    /// <https://dom.spec.whatwg.org/#dom-eventtarget-dispatchevent>
    pub fn dispatch_event(&self, event: &Event) -> Fallible<bool> {
        // Step 1. Re-entrant dispatch of one event instance is an error.
        if event.is_dispatching() {
            return Err(Error::InvalidState);
        }
        // Step 2.
        event.set_is_trusted(false);
        Ok(dispatch(self, event))
    }
}

/// <https://dom.spec.whatwg.org/#concept-event-dispatch>
pub(crate) fn dispatch(target: &NodeRef, event: &Event) -> bool {
    event.set_dispatching(true);
    let path = build_event_path(target, event.composed());
    event.set_path(path.clone());
    event.set_target(Some(path[0].shadow_adjusted_target.clone()));

    // Capturing phase: outermost towards the target's parent.
    for entry in path.iter().skip(1).rev() {
        if event.propagation_stopped() {
            break;
        }
        invoke_listeners(entry, event, EventPhase::Capturing);
    }
    // Target phase: every listener on the target, in insertion order.
    if !event.propagation_stopped() {
        invoke_listeners(&path[0], event, EventPhase::AtTarget);
    }
    // Bubbling phase: the target's parent outwards.
    if event.bubbles() {
        for entry in path.iter().skip(1) {
            if event.propagation_stopped() {
                break;
            }
            invoke_listeners(entry, event, EventPhase::Bubbling);
        }
    }

    event.set_dispatching(false);
    event.set_phase(EventPhase::None);
    event.set_current_target(None);
    !event.default_prevented()
}

/// Builds the propagation path from the target to the outermost root,
/// crossing shadow boundaries according to `composed` and retargeting as it
/// goes.
fn build_event_path(target: &NodeRef, composed: bool) -> Vec<EventPathEntry> {
    let mut path = Vec::new();
    let mut current = target.clone();
    let mut adjusted = target.clone();
    loop {
        path.push(EventPathEntry {
            invocation_target: current.clone(),
            shadow_adjusted_target: adjusted.clone(),
        });
        let next = match current.parent_node() {
            Some(parent) => parent,
            None => match current.as_shadow_root().and_then(ShadowRoot::host) {
                Some(host) => {
                    if !composed {
                        break;
                    }
                    // Stepping out of a shadow tree: outer listeners see
                    // the host as the target.
                    adjusted = host.clone();
                    host
                },
                None => break,
            },
        };
        current = next;
    }
    path
}

/// <https://dom.spec.whatwg.org/#concept-event-listener-invoke>
fn invoke_listeners(entry: &EventPathEntry, event: &Event, phase: EventPhase) {
    let node = &entry.invocation_target;
    // Clone the list up front: listeners added during dispatch are not run
    // for this event, and removals are observed through the shared flag.
    let listeners: SmallVec<[Rc<EventListener>; 4]> = match node.rare_data() {
        Some(rare) => rare.listeners.iter().cloned().collect(),
        None => return,
    };
    if listeners.is_empty() {
        return;
    }
    let type_ = event.type_();
    event.set_phase(phase);
    event.set_target(Some(entry.shadow_adjusted_target.clone()));
    event.set_current_target(Some(node.clone()));
    for listener in listeners {
        if event.immediate_propagation_stopped() {
            break;
        }
        if listener.removed.get() || listener.type_ != *type_ {
            continue;
        }
        let run = match phase {
            EventPhase::Capturing => listener.capture,
            EventPhase::Bubbling => !listener.capture,
            _ => true,
        };
        if !run {
            continue;
        }
        // `once` listeners go away before the callback runs, so re-adding
        // from inside the callback works.
        if listener.once {
            node.remove_listener_by_id(listener.id);
        }
        event.set_in_passive_listener(listener.passive);
        (listener.callback)(event);
        event.set_in_passive_listener(false);
    }
    event.set_current_target(None);
}
