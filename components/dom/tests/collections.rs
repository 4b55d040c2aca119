/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::{append_element, document_with_root};

#[test]
fn child_nodes_is_the_same_object_and_live() {
    let (document, root) = document_with_root();
    let list = root.child_nodes();
    assert!(list == root.child_nodes());
    assert_eq!(list.length(), 0);

    let a = append_element(&document, &root, "a");
    assert_eq!(list.length(), 1);
    assert_eq!(list.item(0), Some(a.clone()));
    assert_eq!(list.item(1), None);

    a.remove().expect("remove");
    assert_eq!(list.length(), 0);
}

#[test]
fn tag_collections_are_live() {
    let (document, root) = document_with_root();
    let items = document.document_elements_by_tag_name("item");
    assert_eq!(items.length(), 0);

    let first = append_element(&document, &root, "item");
    let second = append_element(&document, &root, "item");
    append_element(&document, &root, "other");
    assert_eq!(items.length(), 2);

    first.remove().expect("remove");
    assert_eq!(items.length(), 1);
    assert_eq!(items.item(0), Some(second));
}

#[test]
fn universal_tag_collection_counts_every_element() {
    let (document, root) = document_with_root();
    append_element(&document, &root, "a");
    let b = append_element(&document, &root, "b");
    append_element(&document, &b, "c");

    // The root element plus three descendants.
    assert_eq!(document.document_elements_by_tag_name("*").length(), 4);
}

#[test]
fn class_collections_intersect_tokens() {
    let (document, root) = document_with_root();
    let both = append_element(&document, &root, "a");
    both.set_attribute("class", "red bold").expect("attr");
    let red_only = append_element(&document, &root, "b");
    red_only.set_attribute("class", "red").expect("attr");

    assert_eq!(document.document_elements_by_class_name("red").length(), 2);
    assert_eq!(
        document.document_elements_by_class_name("red bold").length(),
        1
    );
    assert_eq!(
        document
            .document_elements_by_class_name("red bold")
            .item(0),
        Some(both)
    );
    assert_eq!(document.document_elements_by_class_name("").length(), 0);
}

#[test]
fn element_scoped_collections_walk_the_subtree() {
    let (document, root) = document_with_root();
    let section = append_element(&document, &root, "section");
    append_element(&document, &section, "item");
    append_element(&document, &root, "item");

    assert_eq!(section.get_elements_by_tag_name("item").length(), 1);
    assert_eq!(root.get_elements_by_tag_name("item").length(), 2);
}

#[test]
fn named_item_prefers_id() {
    let (document, root) = document_with_root();
    let by_id = append_element(&document, &root, "w");
    by_id.set_attribute("id", "target").expect("attr");
    let by_name = append_element(&document, &root, "w");
    by_name.set_attribute("name", "target").expect("attr");

    let collection = document.document_elements_by_tag_name("w");
    assert_eq!(collection.named_item("target"), Some(by_id));
    assert_eq!(collection.named_item("missing"), None);
}

#[test]
fn namespaced_tag_collections() {
    let (document, root) = document_with_root();
    let plain = document.create_element("x").expect("create");
    root.append_child(&plain).expect("append");
    let spaced = document
        .create_element_ns(Some("urn:example"), "p:x")
        .expect("create ns");
    root.append_child(&spaced).expect("append");

    let in_namespace = document.document_elements_by_tag_name_ns(Some("urn:example"), "x");
    assert_eq!(in_namespace.length(), 1);
    assert_eq!(in_namespace.item(0), Some(spaced.clone()));
    let any_namespace = document.document_elements_by_tag_name_ns(Some("*"), "x");
    assert_eq!(any_namespace.length(), 2);
    let no_namespace = document.document_elements_by_tag_name_ns(None, "x");
    assert_eq!(no_namespace.length(), 1);
    assert_eq!(no_namespace.item(0), Some(plain));
}

#[test]
fn attribute_map_is_a_live_view() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let map = element.attributes().expect("map");
    assert_eq!(map.length(), 0);

    element.set_attribute("one", "1").expect("set");
    element.set_attribute("two", "2").expect("set");
    assert_eq!(map.length(), 2);
    let one = map.get_named_item("one").expect("named");
    assert_eq!(
        one.as_attr().expect("attr").value().as_str(),
        "1"
    );
    assert_eq!(map.item(1).expect("item").node_name(), "two");

    map.remove_named_item("one").expect("remove");
    assert_eq!(element.get_attribute("one"), None);
    assert_eq!(map.length(), 1);
}
