/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use dom::{DocumentLimits, Error};

use crate::{append_element, document_with_root};

#[test]
fn set_get_remove_round_trip() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");

    assert_eq!(element.get_attribute("title"), None);
    element.set_attribute("title", "first").expect("set");
    assert_eq!(element.get_attribute("title").as_deref(), Some("first"));
    element.set_attribute("title", "second").expect("overwrite");
    assert_eq!(element.get_attribute("title").as_deref(), Some("second"));
    assert!(element.has_attribute("title"));

    element.remove_attribute("title").expect("remove");
    assert_eq!(element.get_attribute("title"), None);
    // Removing an absent attribute is a no-op.
    element.remove_attribute("title").expect("remove again");
}

#[test]
fn invalid_names_are_rejected() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    assert_eq!(
        element.set_attribute("1bad", "v"),
        Err(Error::InvalidCharacter)
    );
    assert_eq!(
        element.set_attribute("sp ace", "v"),
        Err(Error::InvalidCharacter)
    );
    assert_eq!(document.create_element("").unwrap_err(), Error::InvalidCharacter);
}

#[test]
fn namespace_validation() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");

    // A prefix requires a namespace.
    assert_eq!(
        element.set_attribute_ns(None, "p:x", "v"),
        Err(Error::Namespace)
    );
    // `xmlns` must pair with the XMLNS namespace, both ways.
    assert_eq!(
        element.set_attribute_ns(Some("urn:other"), "xmlns", "v"),
        Err(Error::Namespace)
    );
    element
        .set_attribute_ns(Some("http://www.w3.org/2000/xmlns/"), "xmlns", "v")
        .expect("xmlns ok");

    element
        .set_attribute_ns(Some("urn:example"), "p:local", "v")
        .expect("namespaced set");
    assert_eq!(
        element.get_attribute_ns(Some("urn:example"), "local").as_deref(),
        Some("v")
    );
    // The qualified-name lookup sees the prefixed form.
    assert_eq!(element.get_attribute("p:local").as_deref(), Some("v"));
}

#[test]
fn toggle_attribute_tristate() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");

    assert!(element.toggle_attribute("hidden", None).expect("toggle on"));
    assert!(element.has_attribute("hidden"));
    assert!(!element.toggle_attribute("hidden", None).expect("toggle off"));
    assert!(!element.has_attribute("hidden"));

    assert!(!element
        .toggle_attribute("hidden", Some(false))
        .expect("force off absent"));
    assert!(element
        .toggle_attribute("hidden", Some(true))
        .expect("force on"));
    assert!(element
        .toggle_attribute("hidden", Some(true))
        .expect("force on again"));
    assert!(element.has_attribute("hidden"));
}

#[test]
fn id_index_follows_attribute_changes() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");

    element.set_attribute("id", "one").expect("set");
    assert_eq!(document.get_element_by_id("one"), Some(element.clone()));

    element.set_attribute("id", "two").expect("change");
    assert_eq!(document.get_element_by_id("one"), None);
    assert_eq!(document.get_element_by_id("two"), Some(element.clone()));

    element.remove_attribute("id").expect("remove");
    assert_eq!(document.get_element_by_id("two"), None);
}

#[test]
fn duplicate_ids_resolve_first_writer_wins() {
    let (document, root) = document_with_root();
    let first = append_element(&document, &root, "a");
    first.set_attribute("id", "dup").expect("set");
    let second = append_element(&document, &root, "b");
    second.set_attribute("id", "dup").expect("set");

    assert_eq!(document.get_element_by_id("dup"), Some(first.clone()));
    first.remove().expect("remove winner");
    assert_eq!(document.get_element_by_id("dup"), Some(second));
}

#[test]
fn class_index_follows_attribute_changes() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    element.set_attribute("class", "red bold").expect("set");

    let reds = document.document_elements_by_class_name("red");
    assert_eq!(reds.length(), 1);
    element.set_attribute("class", "bold").expect("change");
    assert_eq!(reds.length(), 0);
    assert_eq!(document.document_elements_by_class_name("bold").length(), 1);
}

#[test]
fn index_equals_linear_walk_after_mutations() {
    let (document, root) = document_with_root();
    for index in 0..6 {
        let element = append_element(&document, &root, "item");
        element
            .set_attribute("class", if index % 2 == 0 { "even" } else { "odd" })
            .expect("class");
        element
            .set_attribute("id", &format!("n{}", index))
            .expect("id");
    }
    // Mutate: remove one, rename another's class.
    document
        .get_element_by_id("n2")
        .expect("n2")
        .remove()
        .expect("remove");
    document
        .get_element_by_id("n3")
        .expect("n3")
        .set_attribute("class", "even")
        .expect("reclass");

    for id in ["n0", "n1", "n3", "n4", "n5"] {
        let walked = document
            .traverse_preorder()
            .find(|node| node.get_attribute("id").as_deref() == Some(id));
        assert_eq!(document.get_element_by_id(id), walked, "id {}", id);
    }
    assert_eq!(document.get_element_by_id("n2"), None);

    let mut indexed: Vec<String> = document
        .document_elements_by_class_name("even")
        .to_vec()
        .iter()
        .map(|node| node.id())
        .collect();
    indexed.sort();
    let mut walked: Vec<String> = document
        .traverse_preorder()
        .filter(|node| {
            node.as_element()
                .map(|element| element.has_class("even"))
                .unwrap_or(false)
        })
        .map(|node| node.id())
        .collect();
    walked.sort();
    assert_eq!(indexed, walked);
}

#[test]
fn attribute_nodes_move_between_elements_explicitly() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    element.set_attribute("role", "button").expect("set");

    let attr = element.get_attribute_node("role").expect("attr node");
    let other = append_element(&document, &root, "f");
    // An attribute still owned elsewhere cannot be attached.
    assert_eq!(
        other.set_attribute_node(&attr),
        Err(Error::InUseAttribute)
    );

    let removed = element.remove_attribute_node(&attr).expect("detach");
    assert_eq!(removed, attr);
    assert!(!element.has_attribute("role"));
    other.set_attribute_node(&attr).expect("attach");
    assert_eq!(other.get_attribute("role").as_deref(), Some("button"));

    let stranger = document.create_attribute("role").expect("create");
    assert_eq!(
        other.remove_attribute_node(&stranger),
        Err(Error::NotFound)
    );
}

#[test]
fn attribute_names_preserve_insertion_order() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    element.set_attribute("b", "2").expect("set");
    element.set_attribute("a", "1").expect("set");
    element.set_attribute("c", "3").expect("set");
    assert_eq!(element.attribute_names(), vec!["b", "a", "c"]);
}

#[test]
fn class_list_writes_through_the_attribute() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let classes = element.class_list().expect("class list");
    // Same object on every access.
    assert!(classes == element.class_list().expect("class list"));

    classes.add(&["red", "bold"]).expect("add");
    assert_eq!(element.get_attribute("class").as_deref(), Some("red bold"));
    assert_eq!(document.document_elements_by_class_name("red").length(), 1);

    assert!(!classes.toggle("red", None).expect("toggle off"));
    assert_eq!(element.get_attribute("class").as_deref(), Some("bold"));

    assert!(classes.replace("bold", "thin").expect("replace"));
    assert!(classes.contains("thin"));
    assert_eq!(document.document_elements_by_class_name("bold").length(), 0);

    assert_eq!(classes.add(&[""]), Err(Error::Syntax));
    assert_eq!(classes.add(&["a b"]), Err(Error::InvalidCharacter));
}

#[test]
fn attribute_quota_is_enforced() {
    let (document, root) = document_with_root();
    let doc = document.as_document().expect("payload");
    doc.set_limits(DocumentLimits {
        max_attributes_per_element: 2,
        ..DocumentLimits::default()
    });
    let element = append_element(&document, &root, "e");
    element.set_attribute("one", "1").expect("set");
    element.set_attribute("two", "2").expect("set");
    assert_eq!(
        element.set_attribute("three", "3"),
        Err(Error::QuotaExceeded)
    );
    // Overwriting an existing attribute is still allowed.
    element.set_attribute("one", "1b").expect("overwrite");
}
