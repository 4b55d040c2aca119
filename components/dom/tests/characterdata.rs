/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use dom::characterdata::{
    append_data, delete_data, insert_data, replace_data, split_text, substring_data, whole_text,
};
use dom::Error;

use crate::{append_element, document_with_root};

#[test]
fn replace_data_edits_in_place() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let text = document.create_text_node("hello world").expect("text");
    element.append_child(&text).expect("append");

    replace_data(&text, 6, 5, "dom").expect("replace");
    assert_eq!(text.text_content().as_deref(), Some("hello dom"));

    insert_data(&text, 0, ">> ").expect("insert");
    assert_eq!(text.text_content().as_deref(), Some(">> hello dom"));

    delete_data(&text, 0, 3).expect("delete");
    append_data(&text, "!").expect("append");
    assert_eq!(text.text_content().as_deref(), Some("hello dom!"));
}

#[test]
fn out_of_range_offsets_are_index_errors() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let text = document.create_text_node("abc").expect("text");
    element.append_child(&text).expect("append");

    assert_eq!(replace_data(&text, 4, 0, "x"), Err(Error::IndexSize));
    assert_eq!(substring_data(&text, 9, 1), Err(Error::IndexSize));
    // A count past the end clamps instead of failing.
    assert_eq!(substring_data(&text, 1, 99).expect("clamped"), "bc");
    delete_data(&text, 1, 99).expect("clamped delete");
    assert_eq!(text.text_content().as_deref(), Some("a"));
}

#[test]
fn split_text_divides_and_links_the_new_node() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "e");
    let text = document.create_text_node("hello world").expect("text");
    element.append_child(&text).expect("append");

    let tail = split_text(&text, 5).expect("split");
    assert_eq!(text.text_content().as_deref(), Some("hello"));
    assert_eq!(tail.text_content().as_deref(), Some(" world"));
    assert_eq!(text.next_sibling(), Some(tail.clone()));
    assert_eq!(element.child_count(), 2);

    assert_eq!(split_text(&tail, 50), Err(Error::IndexSize));
    assert_eq!(whole_text(&text).expect("whole"), "hello world");
}

#[test]
fn substring_data_returns_slices() {
    let (document, _root) = document_with_root();
    let comment = document.create_comment("0123456789").expect("comment");
    assert_eq!(substring_data(&comment, 2, 3).expect("slice"), "234");
    assert_eq!(comment.length(), 10);
}

#[test]
fn cdata_and_pi_payload_validation() {
    let (document, _root) = document_with_root();
    assert_eq!(
        document.create_cdata_section("a ]]> b").unwrap_err(),
        Error::InvalidCharacter
    );
    assert_eq!(
        document.create_processing_instruction("tgt", "a ?> b").unwrap_err(),
        Error::InvalidCharacter
    );
    assert_eq!(
        document.create_processing_instruction("1bad", "ok").unwrap_err(),
        Error::InvalidCharacter
    );
    let pi = document
        .create_processing_instruction("style", "href=x")
        .expect("pi");
    assert_eq!(pi.node_name(), "style");
    assert_eq!(pi.node_value().as_deref(), Some("href=x"));
}
