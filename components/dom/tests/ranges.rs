/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use dom::characterdata::{replace_data, split_text};
use dom::range::{END_TO_END, START_TO_START};
use dom::{Error, StaticRange};

use crate::{append_element, document_with_root};

#[test]
fn boundaries_track_insertions_and_removals() {
    let (document, root) = document_with_root();
    let a = append_element(&document, &root, "a");
    let b = append_element(&document, &root, "b");

    let range = document.create_range().expect("range");
    range.set_start(&root, 1).expect("start");
    range.set_end(&root, 2).expect("end");

    // Insert before the boundary: both offsets slide right.
    let zero = document.create_element("zero").expect("create");
    root.insert_before(&zero, Some(&a)).expect("insert");
    assert_eq!(range.start_offset(), 2);
    assert_eq!(range.end_offset(), 3);

    // Remove before the boundary: offsets slide back.
    zero.remove().expect("remove");
    assert_eq!(range.start_offset(), 1);
    assert_eq!(range.end_offset(), 2);

    // Removing the contained node collapses the boundary to the gap.
    b.remove().expect("remove");
    assert_eq!(range.start_offset(), 1);
    assert_eq!(range.end_offset(), 1);
    assert!(range.collapsed());
    let _ = a;
}

#[test]
fn boundaries_inside_removed_subtrees_reanchor() {
    let (document, root) = document_with_root();
    let branch = append_element(&document, &root, "branch");
    let leaf = append_element(&document, &branch, "leaf");

    let range = document.create_range().expect("range");
    range.set_start(&leaf, 0).expect("start");
    range.set_end(&leaf, 0).expect("end");

    branch.remove().expect("remove");
    assert_eq!(range.start_container(), root);
    assert_eq!(range.start_offset(), 0);
}

#[test]
fn character_data_edits_move_boundaries() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let text = document.create_text_node("0123456789").expect("text");
    element.append_child(&text).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&text, 4).expect("start");
    range.set_end(&text, 8).expect("end");

    // Delete [0,2): both boundaries shift left by two.
    replace_data(&text, 0, 2, "").expect("delete");
    assert_eq!(range.start_offset(), 2);
    assert_eq!(range.end_offset(), 6);

    // Replace across the start boundary: it collapses to the edit point.
    replace_data(&text, 1, 3, "").expect("delete");
    assert_eq!(range.start_offset(), 1);
    assert_eq!(range.end_offset(), 3);

    // Insertion before the boundaries shifts them right.
    replace_data(&text, 0, 0, "ab").expect("insert");
    assert_eq!(range.start_offset(), 3);
    assert_eq!(range.end_offset(), 5);
}

#[test]
fn split_text_rehomes_trailing_boundaries() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let text = document.create_text_node("hello world").expect("text");
    element.append_child(&text).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&text, 2).expect("start");
    range.set_end(&text, 8).expect("end");

    let tail = split_text(&text, 5).expect("split");
    assert_eq!(range.start_container(), text);
    assert_eq!(range.start_offset(), 2);
    assert_eq!(range.end_container(), tail);
    assert_eq!(range.end_offset(), 3);
}

#[test]
fn delete_contents_within_one_text_node() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let text = document.create_text_node("hello world").expect("text");
    element.append_child(&text).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&text, 5).expect("start");
    range.set_end(&text, 11).expect("end");
    range.delete_contents().expect("delete");

    assert_eq!(text.text_content().as_deref(), Some("hello"));
    assert!(range.collapsed());
}

#[test]
fn delete_contents_across_elements() {
    let (document, root) = document_with_root();
    let list = append_element(&document, &root, "list");
    append_element(&document, &list, "a");
    append_element(&document, &list, "b");
    append_element(&document, &list, "c");

    let range = document.create_range().expect("range");
    range.set_start(&list, 1).expect("start");
    range.set_end(&list, 3).expect("end");
    range.delete_contents().expect("delete");

    assert_eq!(
        list.children().map(|n| n.node_name()).collect::<Vec<_>>(),
        vec!["a"]
    );
    assert!(range.collapsed());
    assert_eq!(range.start_offset(), 1);
}

#[test]
fn extract_and_clone_contents() {
    let (document, root) = document_with_root();
    let paragraph = append_element(&document, &root, "p");
    let text = document.create_text_node("abcdef").expect("text");
    paragraph.append_child(&text).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&text, 2).expect("start");
    range.set_end(&text, 4).expect("end");

    let cloned = range.clone_contents().expect("clone");
    assert_eq!(cloned.text_content().as_deref(), Some("cd"));
    // Cloning leaves the original alone.
    assert_eq!(text.text_content().as_deref(), Some("abcdef"));

    let extracted = range.extract_contents().expect("extract");
    assert_eq!(extracted.text_content().as_deref(), Some("cd"));
    assert_eq!(text.text_content().as_deref(), Some("abef"));
}

#[test]
fn extract_contents_with_an_ancestor_start_boundary() {
    // start.node is an inclusive ancestor of end.node, so only the end
    // side has a partially contained child.
    let (document, root) = document_with_root();
    let paragraph = append_element(&document, &root, "p");
    let emphasis = append_element(&document, &paragraph, "em");
    let text = document.create_text_node("abcdef").expect("text");
    emphasis.append_child(&text).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&paragraph, 0).expect("start");
    range.set_end(&text, 2).expect("end");

    let fragment = range.extract_contents().expect("extract");
    // Only the slice before the end boundary moves, wrapped in a clone of
    // its partially contained ancestor.
    assert_eq!(fragment.text_content().as_deref(), Some("ab"));
    let wrapper = fragment.first_child().expect("cloned em");
    assert_eq!(wrapper.node_name(), "em");
    assert!(!wrapper.is_same_node(Some(&emphasis)));

    // The original keeps its structure and the tail of the text.
    assert_eq!(emphasis.parent_node(), Some(paragraph.clone()));
    assert_eq!(text.text_content().as_deref(), Some("cdef"));
    assert!(range.collapsed());
    assert_eq!(range.start_container(), paragraph);
    assert_eq!(range.start_offset(), 0);
}

#[test]
fn extract_contents_spanning_multiple_children() {
    let (document, root) = document_with_root();
    let paragraph = append_element(&document, &root, "p");
    let first = document.create_text_node("one").expect("text");
    paragraph.append_child(&first).expect("append");
    let emphasis = append_element(&document, &paragraph, "em");
    let middle = document.create_text_node("two").expect("text");
    emphasis.append_child(&middle).expect("append");
    let last = document.create_text_node("three").expect("text");
    paragraph.append_child(&last).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&first, 1).expect("start");
    range.set_end(&last, 2).expect("end");

    let fragment = range.extract_contents().expect("extract");
    // Partial slice of `first`, all of `em`, partial slice of `last`.
    assert_eq!(fragment.text_content().as_deref(), Some("netwoth"));
    assert_eq!(fragment.child_count(), 3);
    // The fully contained child moves rather than being copied.
    assert_eq!(fragment.child_at(1), Some(emphasis.clone()));
    assert_eq!(emphasis.parent_node(), Some(fragment.clone()));
    assert_eq!(middle.text_content().as_deref(), Some("two"));
    assert_eq!(paragraph.text_content().as_deref(), Some("oree"));
    assert_eq!(
        paragraph.children().map(|n| n.node_name()).collect::<Vec<_>>(),
        vec!["#text", "#text"]
    );
    assert!(range.collapsed());
    assert_eq!(range.start_container(), paragraph);
    assert_eq!(range.start_offset(), 1);
}

#[test]
fn clone_contents_spanning_multiple_children() {
    let (document, root) = document_with_root();
    let paragraph = append_element(&document, &root, "p");
    let first = document.create_text_node("one").expect("text");
    paragraph.append_child(&first).expect("append");
    let emphasis = append_element(&document, &paragraph, "em");
    let middle = document.create_text_node("two").expect("text");
    emphasis.append_child(&middle).expect("append");
    let last = document.create_text_node("three").expect("text");
    paragraph.append_child(&last).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&first, 1).expect("start");
    range.set_end(&last, 2).expect("end");

    let fragment = range.clone_contents().expect("clone");
    assert_eq!(fragment.text_content().as_deref(), Some("netwoth"));
    // Cloning copies; the tree and the boundaries stay put.
    assert_eq!(paragraph.text_content().as_deref(), Some("onetwothree"));
    assert_eq!(emphasis.parent_node(), Some(paragraph.clone()));
    assert_eq!(range.start_offset(), 1);
    assert_eq!(range.end_offset(), 2);

    // The directional case: an ancestor start boundary clones only the
    // end side's partial subtree.
    let deep = document.create_range().expect("range");
    deep.set_start(&paragraph, 0).expect("start");
    deep.set_end(&middle, 1).expect("end");
    let partial = deep.clone_contents().expect("clone");
    assert_eq!(partial.text_content().as_deref(), Some("onet"));
    assert_eq!(paragraph.text_content().as_deref(), Some("onetwothree"));
}

#[test]
fn insert_node_at_a_collapsed_range() {
    let (document, root) = document_with_root();
    let list = append_element(&document, &root, "list");
    append_element(&document, &list, "a");

    let range = document.create_range().expect("range");
    range.set_start(&list, 1).expect("start");
    range.collapse(true);

    let b = document.create_element("b").expect("create");
    range.insert_node(&b).expect("insert");
    assert_eq!(
        list.children().map(|n| n.node_name()).collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    // A collapsed range grows to cover the insertion.
    assert_eq!(range.end_offset(), 2);
}

#[test]
fn surround_contents_wraps_the_selection() {
    let (document, root) = document_with_root();
    let paragraph = append_element(&document, &root, "p");
    let text = document.create_text_node("wrap me please").expect("text");
    paragraph.append_child(&text).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&text, 5).expect("start");
    range.set_end(&text, 7).expect("end");

    let wrapper = document.create_element("em").expect("create");
    range.surround_contents(&wrapper).expect("surround");
    assert_eq!(wrapper.parent_node(), Some(paragraph.clone()));
    assert_eq!(wrapper.text_content().as_deref(), Some("me"));
    assert_eq!(paragraph.text_content().as_deref(), Some("wrap me please"));
}

#[test]
fn point_comparisons() {
    let (document, root) = document_with_root();
    let list = append_element(&document, &root, "list");
    append_element(&document, &list, "a");
    append_element(&document, &list, "b");

    let range = document.create_range().expect("range");
    range.set_start(&list, 1).expect("start");
    range.set_end(&list, 2).expect("end");

    assert_eq!(range.compare_point(&list, 0).expect("cmp"), -1);
    assert_eq!(range.compare_point(&list, 1).expect("cmp"), 0);
    assert_eq!(range.compare_point(&list, 2).expect("cmp"), 0);
    assert!(range.is_point_in_range(&list, 1).expect("in range"));

    let other = document.create_range().expect("range");
    other.set_start(&list, 0).expect("start");
    other.set_end(&list, 2).expect("end");
    assert_eq!(
        range.compare_boundary_points(START_TO_START, &other).expect("cmp"),
        1
    );
    assert_eq!(
        range.compare_boundary_points(END_TO_END, &other).expect("cmp"),
        0
    );
}

#[test]
fn boundary_validation_errors() {
    let (document, root) = document_with_root();
    let range = document.create_range().expect("range");
    assert_eq!(range.set_start(&root, 99), Err(Error::IndexSize));

    let doctype = document.create_document_type("d", "", "").expect("doctype");
    assert_eq!(range.set_start(&doctype, 0), Err(Error::InvalidNodeType));
    assert_eq!(range.select_node(&document), Err(Error::InvalidNodeType));
    assert_eq!(
        range.select_node_contents(&doctype),
        Err(Error::InvalidNodeType)
    );
}

#[test]
fn static_ranges_do_not_track_mutations() {
    let (document, root) = document_with_root();
    let a = append_element(&document, &root, "a");
    append_element(&document, &root, "b");

    let snapshot = StaticRange::new(&root, 1, &root, 2).expect("static range");
    assert!(snapshot.is_valid());

    // Mutations shift live ranges but never a static one.
    a.remove().expect("remove");
    assert_eq!(snapshot.start_offset(), 1);
    assert_eq!(snapshot.end_offset(), 2);
    assert!(!snapshot.is_valid());

    let doctype = document.create_document_type("d", "", "").expect("doctype");
    assert_eq!(
        StaticRange::new(&doctype, 0, &doctype, 0).unwrap_err(),
        Error::InvalidNodeType
    );
}

#[test]
fn range_stringifier_concatenates_contained_text() {
    let (document, root) = document_with_root();
    let paragraph = append_element(&document, &root, "p");
    let first = document.create_text_node("one ").expect("text");
    paragraph.append_child(&first).expect("append");
    let emphasis = append_element(&document, &paragraph, "em");
    let middle = document.create_text_node("two").expect("text");
    emphasis.append_child(&middle).expect("append");
    let last = document.create_text_node(" three").expect("text");
    paragraph.append_child(&last).expect("append");

    let range = document.create_range().expect("range");
    range.set_start(&first, 0).expect("start");
    range.set_end(&last, 6).expect("end");
    assert_eq!(range.text(), "one two three");
}
