/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cell::Cell;
use std::rc::Rc;

use dom::{Error, MutationObserver, MutationRecord, MutationRecordType, ObserverInit};

use crate::{append_element, document_with_root};

fn silent_observer() -> MutationObserver {
    MutationObserver::new(Rc::new(|_records: &[MutationRecord], _observer| {}))
}

fn child_list_subtree() -> ObserverInit {
    ObserverInit {
        child_list: true,
        subtree: true,
        ..ObserverInit::default()
    }
}

#[test]
fn five_appends_produce_five_ordered_records() {
    let (document, root) = document_with_root();
    let observer = silent_observer();
    observer.observe(&root, &child_list_subtree()).expect("observe");

    let mut appended = Vec::new();
    for _ in 0..5 {
        appended.push(append_element(&document, &root, "item"));
    }

    let records = observer.take_records();
    assert_eq!(records.len(), 5);
    for (record, node) in records.iter().zip(&appended) {
        assert_eq!(record.record_type(), MutationRecordType::ChildList);
        assert_eq!(record.target(), root);
        assert_eq!(record.added_nodes(), &[node.clone()]);
        assert!(record.removed_nodes().is_empty());
    }
    assert!(observer.take_records().is_empty());
}

#[test]
fn fragment_insertion_is_one_batched_record() {
    let (document, root) = document_with_root();
    let observer = silent_observer();
    observer.observe(&root, &child_list_subtree()).expect("observe");

    let fragment = document.create_document_fragment().expect("fragment");
    for _ in 0..4 {
        let child = document.create_element("leaf").expect("leaf");
        fragment.append_child(&child).expect("append");
    }
    root.append_child(&fragment).expect("insert fragment");

    let records = observer.take_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].added_nodes().len(), 4);
    assert!(records[0].removed_nodes().is_empty());
}

#[test]
fn removal_records_capture_siblings() {
    let (document, root) = document_with_root();
    let a = append_element(&document, &root, "a");
    let b = append_element(&document, &root, "b");
    let c = append_element(&document, &root, "c");

    let observer = silent_observer();
    observer.observe(&root, &child_list_subtree()).expect("observe");
    b.remove().expect("remove");

    let records = observer.take_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].removed_nodes(), &[b]);
    assert_eq!(records[0].previous_sibling(), Some(a));
    assert_eq!(records[0].next_sibling(), Some(c));
}

#[test]
fn attribute_records_carry_old_values_on_request() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    element.set_attribute("state", "old").expect("set");

    let observer = silent_observer();
    observer
        .observe(
            &element,
            &ObserverInit {
                attributes: Some(true),
                attribute_old_value: Some(true),
                ..ObserverInit::default()
            },
        )
        .expect("observe");

    // Setting the same value still records, with the old value included.
    element.set_attribute("state", "old").expect("set same");
    element.set_attribute("state", "new").expect("set new");
    element.remove_attribute("state").expect("remove");

    let records = observer.take_records();
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(record.record_type(), MutationRecordType::Attributes);
        assert_eq!(record.attribute_name(), Some("state"));
    }
    assert_eq!(records[0].old_value(), Some("old"));
    assert_eq!(records[1].old_value(), Some("old"));
    assert_eq!(records[2].old_value(), Some("new"));
}

#[test]
fn attribute_filter_limits_records() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let observer = silent_observer();
    observer
        .observe(
            &element,
            &ObserverInit {
                attributes: Some(true),
                attribute_filter: Some(vec!["watched".to_owned()]),
                ..ObserverInit::default()
            },
        )
        .expect("observe");

    element.set_attribute("watched", "1").expect("set");
    element.set_attribute("ignored", "1").expect("set");
    let records = observer.take_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].attribute_name(), Some("watched"));
}

#[test]
fn character_data_records() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let text = document.create_text_node("before").expect("text");
    element.append_child(&text).expect("append");

    let observer = silent_observer();
    observer
        .observe(
            &element,
            &ObserverInit {
                character_data: Some(true),
                character_data_old_value: Some(true),
                subtree: true,
                ..ObserverInit::default()
            },
        )
        .expect("observe");

    dom::characterdata::replace_data(&text, 0, 6, "after").expect("replace");
    let records = observer.take_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_type(), MutationRecordType::CharacterData);
    assert_eq!(records[0].old_value(), Some("before"));
}

#[test]
fn subtree_flag_gates_descendant_mutations() {
    let (document, root) = document_with_root();
    let parent = append_element(&document, &root, "parent");
    let observer = silent_observer();
    observer
        .observe(
            &root,
            &ObserverInit {
                child_list: true,
                subtree: false,
                ..ObserverInit::default()
            },
        )
        .expect("observe");

    append_element(&document, &parent, "deep");
    assert!(observer.take_records().is_empty());
    append_element(&document, &root, "shallow");
    assert_eq!(observer.take_records().len(), 1);
}

#[test]
fn observe_option_validation() {
    let (_document, root) = document_with_root();
    let observer = silent_observer();
    assert_eq!(
        observer.observe(&root, &ObserverInit::default()),
        Err(Error::Syntax)
    );
    assert_eq!(
        observer.observe(
            &root,
            &ObserverInit {
                attributes: Some(false),
                attribute_old_value: Some(true),
                ..ObserverInit::default()
            },
        ),
        Err(Error::Syntax)
    );
    // attributeOldValue implies attributes.
    observer
        .observe(
            &root,
            &ObserverInit {
                attribute_old_value: Some(true),
                ..ObserverInit::default()
            },
        )
        .expect("implied attributes");
}

#[test]
fn drain_hook_fires_once_per_round_and_callback_gets_the_batch() {
    let (document, root) = document_with_root();
    let doc = document.as_document().expect("payload");
    let scheduled = Rc::new(Cell::new(0));
    {
        let scheduled = scheduled.clone();
        doc.set_observer_drain_hook(Rc::new(move || scheduled.set(scheduled.get() + 1)));
    }

    let delivered = Rc::new(Cell::new(0));
    let observer = {
        let delivered = delivered.clone();
        MutationObserver::new(Rc::new(move |records: &[MutationRecord], _| {
            delivered.set(delivered.get() + records.len());
        }))
    };
    observer.observe(&root, &child_list_subtree()).expect("observe");

    append_element(&document, &root, "one");
    append_element(&document, &root, "two");
    // Two records, one scheduling request.
    assert_eq!(scheduled.get(), 1);

    dom::notify_observers(&document);
    assert_eq!(delivered.get(), 2);

    // The next round schedules again.
    append_element(&document, &root, "three");
    assert_eq!(scheduled.get(), 2);
    dom::notify_observers(&document);
    assert_eq!(delivered.get(), 3);
}

#[test]
fn disconnect_clears_registrations_and_queue() {
    let (document, root) = document_with_root();
    let observer = silent_observer();
    observer.observe(&root, &child_list_subtree()).expect("observe");
    append_element(&document, &root, "x");
    observer.disconnect();
    assert!(observer.take_records().is_empty());
    append_element(&document, &root, "y");
    assert!(observer.take_records().is_empty());
}
