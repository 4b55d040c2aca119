/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::RefCell;
use std::rc::Rc;

use dom::{define_custom_element, CustomElementReaction, Error, NodeRef};

use crate::{append_element, document_with_root};

type ReactionLog = Rc<RefCell<Vec<String>>>;

fn logging_registry(document: &NodeRef, name: &str, observed: &[&str]) -> ReactionLog {
    let log: ReactionLog = Rc::new(RefCell::new(Vec::new()));
    let sink = log.clone();
    define_custom_element(
        document,
        name,
        observed,
        Rc::new(move |_element: &NodeRef, reaction: &CustomElementReaction| {
            let entry = match reaction {
                CustomElementReaction::Upgrade => "upgrade".to_owned(),
                CustomElementReaction::Connected => "connected".to_owned(),
                CustomElementReaction::Disconnected => "disconnected".to_owned(),
                CustomElementReaction::Adopted { .. } => "adopted".to_owned(),
                CustomElementReaction::AttributeChanged {
                    name,
                    old_value,
                    new_value,
                    namespace,
                } => format!(
                    "attribute {} {:?} {:?} {:?}",
                    name, old_value, new_value, namespace
                ),
            };
            sink.borrow_mut().push(entry);
        }),
    )
    .expect("define");
    log
}

#[test]
fn create_connect_and_mutate_a_custom_element() {
    let (document, root) = document_with_root();
    let log = logging_registry(&document, "x-foo", &["v"]);

    let element = document.create_element("x-foo").expect("create");
    assert!(log.borrow().is_empty() || log.borrow().as_slice() == ["upgrade"]);
    root.append_child(&element).expect("connect");
    assert_eq!(*log.borrow(), vec!["upgrade", "connected"]);

    element.set_attribute("v", "1").expect("set");
    assert_eq!(
        log.borrow().last().map(String::as_str),
        Some("attribute v None Some(\"1\") None")
    );

    // Unobserved attributes never reach the trampoline.
    let before = log.borrow().len();
    element.set_attribute("other", "x").expect("set");
    assert_eq!(log.borrow().len(), before);

    element.remove().expect("disconnect");
    assert_eq!(log.borrow().last().map(String::as_str), Some("disconnected"));
}

#[test]
fn define_upgrades_existing_elements() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "x-late");
    element.set_attribute("v", "seed").expect("attr");

    let log = logging_registry(&document, "x-late", &["v"]);
    // The define-time walk upgrades in place: attribute replay, then
    // connected.
    assert_eq!(
        *log.borrow(),
        vec![
            "upgrade".to_owned(),
            "attribute v None Some(\"seed\") None".to_owned(),
            "connected".to_owned(),
        ]
    );
    assert_eq!(
        element
            .as_element()
            .expect("payload")
            .custom_state(),
        dom::CustomElementState::Custom
    );
}

#[test]
fn adoption_queues_adopted_reactions() {
    let (document, root) = document_with_root();
    let log = logging_registry(&document, "x-mover", &[]);
    let element = append_element(&document, &root, "x-mover");
    assert_eq!(*log.borrow(), vec!["upgrade", "connected"]);

    let (other_document, other_root) = document_with_root();
    other_document.adopt_node(&element).expect("adopt");
    assert_eq!(
        log.borrow().as_slice(),
        ["upgrade", "connected", "disconnected", "adopted"]
    );
    // Reconnection in the new document is an ordinary connected reaction.
    other_root.append_child(&element).expect("append");
    assert_eq!(log.borrow().last().map(String::as_str), Some("connected"));
}

#[test]
fn definition_name_rules() {
    let (document, _root) = document_with_root();
    let noop: dom::ReactionCallback = Rc::new(|_, _| {});

    for bad in ["nohyphen", "Upper-case", "font-face", "-leading", "1x-a"] {
        assert_eq!(
            define_custom_element(&document, bad, &[], noop.clone()),
            Err(Error::Syntax),
            "name {}",
            bad
        );
    }
    define_custom_element(&document, "x-ok", &[], noop.clone()).expect("define");
    assert_eq!(
        define_custom_element(&document, "x-ok", &[], noop),
        Err(Error::NotSupported)
    );
}

#[test]
fn reactions_drain_at_scope_exit_in_fifo_order() {
    let (document, root) = document_with_root();
    let log = logging_registry(&document, "x-batch", &["a", "b"]);
    let element = append_element(&document, &root, "x-batch");
    log.borrow_mut().clear();

    // Each public entry point is its own scope, so each drains before
    // returning, in call order.
    element.set_attribute("a", "1").expect("set");
    element.set_attribute("b", "2").expect("set");
    assert_eq!(
        *log.borrow(),
        vec![
            "attribute a None Some(\"1\") None".to_owned(),
            "attribute b None Some(\"2\") None".to_owned(),
        ]
    );
}

#[test]
fn reentrant_mutation_from_a_reaction_is_processed() {
    let (document, root) = document_with_root();
    let counter = Rc::new(RefCell::new(0u32));
    {
        let counter = counter.clone();
        define_custom_element(
            &document,
            "x-reent",
            &["n"],
            Rc::new(move |element: &NodeRef, reaction: &CustomElementReaction| {
                if let CustomElementReaction::AttributeChanged { new_value, .. } = reaction {
                    let mut depth = counter.borrow_mut();
                    *depth += 1;
                    if new_value.as_deref() == Some("first") {
                        // Mutating from inside a reaction queues and drains
                        // a follow-up reaction rather than being lost.
                        element.set_attribute("n", "second").expect("nested set");
                    }
                }
            }),
        )
        .expect("define");
    }
    let element = append_element(&document, &root, "x-reent");
    element.set_attribute("n", "first").expect("set");
    assert_eq!(*counter.borrow(), 2);
}
