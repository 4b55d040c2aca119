/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use dom::node::{DocumentPosition, NodeOrText};
use dom::{Document, Error};

use crate::{append_element, assert_child_links_consistent, document_with_root};

#[test]
fn build_and_query_by_id_and_class() {
    let (document, root) = document_with_root();
    let element = document.create_element("a").expect("create");
    element.set_attribute("id", "x").expect("set id");
    element.set_attribute("class", "p q").expect("set class");
    root.append_child(&element).expect("append");

    assert_eq!(document.get_element_by_id("x"), Some(element.clone()));
    assert_eq!(
        document.query_selector(".q").expect("query"),
        Some(element.clone())
    );

    element.remove().expect("remove");
    assert_eq!(document.get_element_by_id("x"), None);
    assert_eq!(document.query_selector(".q").expect("query"), None);
}

#[test]
fn fragment_insertion_empties_the_fragment() {
    let (document, root) = document_with_root();
    let fragment = document.create_document_fragment().expect("fragment");
    for data in ["hello", " ", "world"] {
        let text = document.create_text_node(data).expect("text");
        fragment.append_child(&text).expect("append to fragment");
    }
    let element = append_element(&document, &root, "e");
    element.append_child(&fragment).expect("append fragment");

    assert!(!fragment.has_child_nodes());
    assert_eq!(element.child_nodes().length(), 3);
    assert_eq!(element.text_content().as_deref(), Some("hello world"));

    element.normalize();
    assert_eq!(element.child_nodes().length(), 1);
    assert_eq!(element.text_content().as_deref(), Some("hello world"));
    assert_child_links_consistent(&element);
}

#[test]
fn inserting_an_ancestor_is_a_hierarchy_error() {
    let (document, root) = document_with_root();
    let outer = append_element(&document, &root, "outer");
    let inner = append_element(&document, &outer, "inner");

    assert_eq!(inner.append_child(&outer), Err(Error::HierarchyRequest));
    assert_eq!(inner.append_child(&inner), Err(Error::HierarchyRequest));
}

#[test]
fn document_structure_constraints() {
    let document = Document::new_node();
    let doctype = document
        .create_document_type("d", "", "")
        .expect("doctype");
    document.append_child(&doctype).expect("append doctype");

    let second = document
        .create_document_type("d2", "", "")
        .expect("doctype");
    assert_eq!(
        document.append_child(&second),
        Err(Error::HierarchyRequest)
    );

    let root = document.create_element("root").expect("root");
    document.append_child(&root).expect("append root");
    let another = document.create_element("other").expect("other");
    assert_eq!(
        document.append_child(&another),
        Err(Error::HierarchyRequest)
    );

    // A doctype cannot follow the document element.
    assert_eq!(
        document.append_child(&second),
        Err(Error::HierarchyRequest)
    );

    // Documents can never be inserted anywhere.
    let foreign = Document::new_node();
    assert_eq!(root.append_child(&foreign), Err(Error::HierarchyRequest));

    // Text cannot be a document child.
    let text = document.create_text_node("x").expect("text");
    assert_eq!(document.append_child(&text), Err(Error::HierarchyRequest));
}

#[test]
fn remove_child_rejects_strangers() {
    let (document, root) = document_with_root();
    let other = append_element(&document, &root, "a");
    let not_a_child = document.create_element("b").expect("create");
    assert_eq!(root.remove_child(&not_a_child), Err(Error::NotFound));
    assert_eq!(root.remove_child(&other), Ok(other.clone()));
}

#[test]
fn is_connected_matches_ancestor_walk() {
    let (document, root) = document_with_root();
    let branch = document.create_element("branch").expect("create");
    let leaf = document.create_element("leaf").expect("create");
    branch.append_child(&leaf).expect("append");

    assert!(!branch.is_connected());
    assert!(!leaf.is_connected());

    root.append_child(&branch).expect("connect");
    for node in document.traverse_preorder() {
        let walked = node.get_root_node(false) == document;
        assert_eq!(node.is_connected(), walked);
    }

    branch.remove().expect("disconnect");
    assert!(!branch.is_connected());
    assert!(!leaf.is_connected());
}

#[test]
fn sibling_links_survive_mutation_sequences() {
    let (document, root) = document_with_root();
    let a = append_element(&document, &root, "a");
    let b = append_element(&document, &root, "b");
    let c = append_element(&document, &root, "c");
    assert_child_links_consistent(&root);

    root.insert_before(&c, Some(&a)).expect("move c first");
    assert_child_links_consistent(&root);
    assert_eq!(
        root.children().map(|n| n.node_name()).collect::<Vec<_>>(),
        vec!["c", "a", "b"]
    );

    b.remove().expect("remove b");
    assert_child_links_consistent(&root);
    root.append_child(&b).expect("re-append b");
    assert_child_links_consistent(&root);
    assert_eq!(
        root.children().map(|n| n.node_name()).collect::<Vec<_>>(),
        vec!["c", "a", "b"]
    );
}

#[test]
fn clone_deep_produces_an_equal_tree() {
    let (document, root) = document_with_root();
    let section = append_element(&document, &root, "section");
    section.set_attribute("id", "s1").expect("attr");
    section.set_attribute("class", "big").expect("attr");
    let text = document.create_text_node("payload").expect("text");
    section.append_child(&text).expect("append");

    let clone = section.clone_node(true).expect("clone");
    assert!(clone.is_equal_node(&section));
    assert!(!clone.is_same_node(Some(&section)));
    // The clone is detached; the original's connections are untouched.
    assert!(clone.parent_node().is_none());
    assert_eq!(document.get_element_by_id("s1"), Some(section.clone()));

    let shallow = section.clone_node(false).expect("clone");
    assert!(!shallow.has_child_nodes());
    assert_eq!(shallow.get_attribute("class").as_deref(), Some("big"));
}

#[test]
fn import_node_rehomes_into_the_target_document() {
    let (source_document, source_root) = document_with_root();
    let element = append_element(&source_document, &source_root, "widget");
    element.set_attribute("id", "w").expect("attr");

    let (target_document, target_root) = document_with_root();
    let imported = target_document.import_node(&element, true).expect("import");
    assert_eq!(imported.node_document(), target_document);
    target_root.append_child(&imported).expect("append");

    // Both documents now resolve the id independently.
    assert_eq!(source_document.get_element_by_id("w"), Some(element));
    assert_eq!(target_document.get_element_by_id("w"), Some(imported));
}

#[test]
fn adopt_node_moves_a_subtree_between_documents() {
    let (source_document, source_root) = document_with_root();
    let element = append_element(&source_document, &source_root, "widget");
    element.set_attribute("id", "w").expect("attr");

    let (target_document, target_root) = document_with_root();
    target_document.adopt_node(&element).expect("adopt");
    assert!(element.parent_node().is_none());
    assert_eq!(element.node_document(), target_document);
    assert_eq!(source_document.get_element_by_id("w"), None);

    target_root.append_child(&element).expect("append");
    assert_eq!(target_document.get_element_by_id("w"), Some(element));

    // Documents themselves cannot be adopted.
    assert_eq!(
        target_document.adopt_node(&source_document),
        Err(Error::NotSupported)
    );
}

#[test]
fn compare_document_position_reports_the_spec_bitmask() {
    let (document, root) = document_with_root();
    let first = append_element(&document, &root, "first");
    let second = append_element(&document, &root, "second");

    assert_eq!(
        first.compare_document_position(&first),
        DocumentPosition::empty()
    );
    assert_eq!(
        first.compare_document_position(&second),
        DocumentPosition::FOLLOWING
    );
    assert_eq!(
        second.compare_document_position(&first),
        DocumentPosition::PRECEDING
    );
    let position = root.compare_document_position(&first);
    assert!(position.contains(DocumentPosition::CONTAINED_BY));
    assert!(position.contains(DocumentPosition::FOLLOWING));
    let position = first.compare_document_position(&root);
    assert!(position.contains(DocumentPosition::CONTAINS));
    assert!(position.contains(DocumentPosition::PRECEDING));

    let detached = document.create_element("loner").expect("create");
    let position = first.compare_document_position(&detached);
    assert!(position.contains(DocumentPosition::DISCONNECTED));
    assert!(position.contains(DocumentPosition::IMPLEMENTATION_SPECIFIC));
}

#[test]
fn replace_children_and_convenience_methods() {
    let (document, root) = document_with_root();
    let a = append_element(&document, &root, "a");
    append_element(&document, &root, "b");

    root.replace_children(&[
        NodeOrText::Node(a.clone()),
        NodeOrText::Text("tail".to_owned()),
    ])
    .expect("replace children");
    assert_eq!(root.child_count(), 2);
    assert_eq!(root.first_child(), Some(a.clone()));
    assert_eq!(root.text_content().as_deref(), Some("tail"));

    let c = document.create_element("c").expect("create");
    a.before(&[NodeOrText::Node(c.clone())]).expect("before");
    assert_eq!(root.first_child(), Some(c.clone()));
    a.after(&[NodeOrText::Text("x".to_owned())]).expect("after");
    assert_eq!(
        a.next_sibling().and_then(|n| n.text_content()).as_deref(),
        Some("x")
    );
    assert_child_links_consistent(&root);

    let d = document.create_element("d").expect("create");
    c.replace_with(&[NodeOrText::Node(d.clone())])
        .expect("replace with");
    assert_eq!(root.first_child(), Some(d));
}

#[test]
fn move_before_preserves_subtrees_and_order() {
    let (document, root) = document_with_root();
    let list = append_element(&document, &root, "list");
    let a = append_element(&document, &list, "a");
    let b = append_element(&document, &list, "b");
    let inner = append_element(&document, &a, "inner");

    list.move_before(&b, Some(&a)).expect("move");
    assert_eq!(
        list.children().map(|n| n.node_name()).collect::<Vec<_>>(),
        vec!["b", "a"]
    );
    assert_eq!(inner.parent_node(), Some(a.clone()));
    assert!(inner.is_connected());
    assert_child_links_consistent(&list);

    // Moving to its current position is fine.
    list.move_before(&b, Some(&b)).expect("no-op move");
    assert_eq!(list.child_count(), 2);
}

#[test]
fn text_content_setter_replaces_children() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    append_element(&document, &element, "child");
    element.set_text_content("plain").expect("set");
    assert_eq!(element.child_count(), 1);
    assert_eq!(element.text_content().as_deref(), Some("plain"));

    element.set_text_content("").expect("clear");
    assert!(!element.has_child_nodes());
}

#[test]
fn shadow_trees_are_connected_through_their_host() {
    let (document, root) = document_with_root();
    let host = append_element(&document, &root, "host");
    let shadow = host
        .attach_shadow(
            dom::ShadowRootMode::Open,
            false,
            dom::SlotAssignmentMode::Named,
        )
        .expect("attach");
    let inside = document.create_element("inside").expect("create");
    inside.set_attribute("id", "hidden").expect("attr");
    shadow.append_child(&inside).expect("append");

    assert!(inside.is_connected());
    assert_eq!(inside.get_root_node(false), shadow);
    assert_eq!(inside.get_root_node(true), document);
    // Shadow content stays out of the document indexes.
    assert_eq!(document.get_element_by_id("hidden"), None);
    // A second shadow root is refused.
    assert_eq!(
        host.attach_shadow(
            dom::ShadowRootMode::Open,
            false,
            dom::SlotAssignmentMode::Named,
        )
        .unwrap_err(),
        Error::NotSupported
    );
}
