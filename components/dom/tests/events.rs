/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use dom::{
    AbortController, AddEventListenerOptions, Error, Event, EventInit, EventPhase, NodeRef,
};

use crate::{append_element, document_with_root};

fn listen(node: &NodeRef, type_: &str, log: &Rc<RefCell<Vec<String>>>, tag: &str, capture: bool) {
    let log = log.clone();
    let tag = tag.to_owned();
    node.add_event_listener(
        type_,
        Rc::new(move |_event: &Event| log.borrow_mut().push(tag.clone())),
        AddEventListenerOptions {
            capture,
            ..AddEventListenerOptions::default()
        },
    )
    .expect("add listener");
}

fn bubbling_event(type_: &str) -> Event {
    Event::new(
        type_,
        EventInit {
            bubbles: true,
            cancelable: true,
            composed: false,
        },
    )
}

#[test]
fn three_phase_ordering() {
    let (document, grand) = document_with_root();
    let parent = append_element(&document, &grand, "parent");
    let child = append_element(&document, &parent, "child");
    let log = Rc::new(RefCell::new(Vec::new()));

    listen(&grand, "ping", &log, "grand-capture", true);
    listen(&parent, "ping", &log, "parent-capture", true);
    listen(&child, "ping", &log, "child-target", false);
    listen(&child, "ping", &log, "child-target-capture", true);
    listen(&parent, "ping", &log, "parent-bubble", false);
    listen(&grand, "ping", &log, "grand-bubble", false);

    let event = bubbling_event("ping");
    assert!(child.dispatch_event(&event).expect("dispatch"));
    assert_eq!(
        *log.borrow(),
        vec![
            "grand-capture",
            "parent-capture",
            "child-target",
            "child-target-capture",
            "parent-bubble",
            "grand-bubble",
        ]
    );
    assert_eq!(event.event_phase(), EventPhase::None);
    assert_eq!(event.target(), Some(child));
}

#[test]
fn stop_propagation_cuts_remaining_path_only() {
    let (document, a) = document_with_root();
    let b = append_element(&document, &a, "b");
    let c = append_element(&document, &b, "c");
    let a_called = Rc::new(Cell::new(false));
    let b_called = Rc::new(Cell::new(false));
    let b_second_called = Rc::new(Cell::new(false));

    {
        let a_called = a_called.clone();
        a.add_event_listener(
            "ping",
            Rc::new(move |_| a_called.set(true)),
            AddEventListenerOptions::default(),
        )
        .expect("add");
    }
    {
        let b_called = b_called.clone();
        b.add_event_listener(
            "ping",
            Rc::new(move |event: &Event| {
                event.stop_propagation();
                b_called.set(true);
            }),
            AddEventListenerOptions::default(),
        )
        .expect("add");
    }
    {
        // A later listener on the same node still runs.
        let b_second_called = b_second_called.clone();
        b.add_event_listener(
            "ping",
            Rc::new(move |_| b_second_called.set(true)),
            AddEventListenerOptions::default(),
        )
        .expect("add");
    }

    c.dispatch_event(&bubbling_event("ping")).expect("dispatch");
    assert!(!a_called.get());
    assert!(b_called.get());
    assert!(b_second_called.get());
}

#[test]
fn stop_immediate_propagation_cuts_same_target_listeners() {
    let (document, root) = document_with_root();
    let target = append_element(&document, &root, "t");
    let second_called = Rc::new(Cell::new(false));

    target
        .add_event_listener(
            "ping",
            Rc::new(|event: &Event| event.stop_immediate_propagation()),
            AddEventListenerOptions::default(),
        )
        .expect("add");
    {
        let second_called = second_called.clone();
        target
            .add_event_listener(
                "ping",
                Rc::new(move |_| second_called.set(true)),
                AddEventListenerOptions::default(),
            )
            .expect("add");
    }

    target
        .dispatch_event(&bubbling_event("ping"))
        .expect("dispatch");
    assert!(!second_called.get());
}

#[test]
fn passive_listeners_cannot_cancel() {
    let (document, root) = document_with_root();
    let target = append_element(&document, &root, "t");
    target
        .add_event_listener(
            "scroll",
            Rc::new(|event: &Event| event.prevent_default()),
            AddEventListenerOptions {
                passive: true,
                ..AddEventListenerOptions::default()
            },
        )
        .expect("add");

    let event = bubbling_event("scroll");
    let not_canceled = target.dispatch_event(&event).expect("dispatch");
    assert!(not_canceled);
    assert!(!event.default_prevented());

    // Without passive the same callback cancels.
    target
        .add_event_listener(
            "wheel",
            Rc::new(|event: &Event| event.prevent_default()),
            AddEventListenerOptions::default(),
        )
        .expect("add");
    let event = bubbling_event("wheel");
    assert!(!target.dispatch_event(&event).expect("dispatch"));
    assert!(event.default_prevented());
}

#[test]
fn once_listeners_fire_exactly_once() {
    let (document, root) = document_with_root();
    let target = append_element(&document, &root, "t");
    let calls = Rc::new(Cell::new(0));
    {
        let calls = calls.clone();
        target
            .add_event_listener(
                "ping",
                Rc::new(move |_| calls.set(calls.get() + 1)),
                AddEventListenerOptions {
                    once: true,
                    ..AddEventListenerOptions::default()
                },
            )
            .expect("add");
    }
    target.dispatch_event(&bubbling_event("ping")).expect("one");
    target.dispatch_event(&bubbling_event("ping")).expect("two");
    assert_eq!(calls.get(), 1);
}

#[test]
fn duplicate_listeners_are_collapsed() {
    let (document, root) = document_with_root();
    let target = append_element(&document, &root, "t");
    let calls = Rc::new(Cell::new(0));
    let callback: dom::EventCallback = {
        let calls = calls.clone();
        Rc::new(move |_: &Event| calls.set(calls.get() + 1))
    };
    let id = target
        .add_event_listener("ping", callback.clone(), AddEventListenerOptions::default())
        .expect("add");
    assert_ne!(id, 0);
    let duplicate = target
        .add_event_listener("ping", callback.clone(), AddEventListenerOptions::default())
        .expect("add duplicate");
    assert_eq!(duplicate, 0);

    target.dispatch_event(&bubbling_event("ping")).expect("go");
    assert_eq!(calls.get(), 1);

    target.remove_event_listener("ping", &callback, false);
    target.dispatch_event(&bubbling_event("ping")).expect("go");
    assert_eq!(calls.get(), 1);
}

#[test]
fn redispatching_a_live_event_is_an_error() {
    let (document, root) = document_with_root();
    let target = append_element(&document, &root, "t");
    let failure = Rc::new(Cell::new(None));
    {
        let failure = failure.clone();
        let target_inner = target.clone();
        target
            .add_event_listener(
                "ping",
                Rc::new(move |event: &Event| {
                    failure.set(target_inner.dispatch_event(event).err());
                }),
                AddEventListenerOptions::default(),
            )
            .expect("add");
    }
    target
        .dispatch_event(&bubbling_event("ping"))
        .expect("outer dispatch");
    assert_eq!(failure.get(), Some(Error::InvalidState));
}

#[test]
fn listeners_may_dispatch_other_events() {
    let (document, root) = document_with_root();
    let target = append_element(&document, &root, "t");
    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let log = log.clone();
        let target_inner = target.clone();
        target
            .add_event_listener(
                "outer",
                Rc::new(move |_| {
                    log.borrow_mut().push("outer".to_owned());
                    target_inner
                        .dispatch_event(&bubbling_event("inner"))
                        .expect("inner dispatch");
                }),
                AddEventListenerOptions::default(),
            )
            .expect("add");
    }
    listen(&target, "inner", &log, "inner", false);
    // Reuse the string-logging helper for the nested event.
    target
        .dispatch_event(&bubbling_event("outer"))
        .expect("dispatch");
    assert_eq!(*log.borrow(), vec!["outer", "inner"]);
}

#[test]
fn abort_signal_removes_the_listener_exactly_once() {
    let (document, root) = document_with_root();
    let target = append_element(&document, &root, "t");
    let controller = AbortController::new();
    let calls = Rc::new(Cell::new(0));
    {
        let calls = calls.clone();
        target
            .add_event_listener(
                "ping",
                Rc::new(move |_| calls.set(calls.get() + 1)),
                AddEventListenerOptions {
                    signal: Some(controller.signal()),
                    ..AddEventListenerOptions::default()
                },
            )
            .expect("add");
    }
    target.dispatch_event(&bubbling_event("ping")).expect("go");
    assert_eq!(calls.get(), 1);

    controller.abort();
    controller.abort(); // double abort is a no-op
    target.dispatch_event(&bubbling_event("ping")).expect("go");
    assert_eq!(calls.get(), 1);

    // An already-aborted signal suppresses registration entirely.
    let id = target
        .add_event_listener(
            "ping",
            Rc::new(|_| panic!("must not run")),
            AddEventListenerOptions {
                signal: Some(controller.signal()),
                ..AddEventListenerOptions::default()
            },
        )
        .expect("add");
    assert_eq!(id, 0);
    target.dispatch_event(&bubbling_event("ping")).expect("go");
}

#[test]
fn composed_path_and_shadow_boundaries() {
    let (document, root) = document_with_root();
    let host = append_element(&document, &root, "host");
    let shadow = host
        .attach_shadow(
            dom::ShadowRootMode::Open,
            false,
            dom::SlotAssignmentMode::Named,
        )
        .expect("attach");
    let inner = append_element(&document, &shadow, "inner");

    // Non-composed events stop at the shadow root.
    let log = Rc::new(RefCell::new(Vec::new()));
    listen(&root, "closed", &log, "outer", false);
    listen(&inner, "closed", &log, "inner", false);
    let event = bubbling_event("closed");
    inner.dispatch_event(&event).expect("dispatch");
    assert_eq!(*log.borrow(), vec!["inner"]);
    let path = event.composed_path();
    assert_eq!(path.first(), Some(&inner));
    assert_eq!(path.last(), Some(&shadow));

    // Composed events cross, and outer listeners see the host as target.
    let seen_target = Rc::new(RefCell::new(None));
    {
        let seen_target = seen_target.clone();
        root.add_event_listener(
            "open",
            Rc::new(move |event: &Event| {
                *seen_target.borrow_mut() = event.target();
            }),
            AddEventListenerOptions::default(),
        )
        .expect("add");
    }
    let event = Event::new(
        "open",
        EventInit {
            bubbles: true,
            cancelable: false,
            composed: true,
        },
    );
    inner.dispatch_event(&event).expect("dispatch");
    assert_eq!(*seen_target.borrow(), Some(host));
    assert_eq!(event.composed_path().last(), Some(&document));
}
