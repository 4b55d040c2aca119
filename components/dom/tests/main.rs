/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![cfg(test)]

mod attributes;
mod characterdata;
mod collections;
mod customelements;
mod events;
mod observers;
mod ranges;
mod selectors;
mod tree;

use dom::{Document, NodeRef};

/// A fresh document with a connected `root` document element.
pub fn document_with_root() -> (NodeRef, NodeRef) {
    let document = Document::new_node();
    let root = document.create_element("root").expect("create root");
    document.append_child(&root).expect("append root");
    (document, root)
}

/// Creates and appends a child element with the given local name.
pub fn append_element(document: &NodeRef, parent: &NodeRef, name: &str) -> NodeRef {
    let element = document.create_element(name).expect("create element");
    parent.append_child(&element).expect("append element");
    element
}

/// Checks the doubly-linked child list invariants of one parent.
pub fn assert_child_links_consistent(parent: &NodeRef) {
    let children: Vec<NodeRef> = parent.children().collect();
    assert_eq!(parent.first_child(), children.first().cloned());
    assert_eq!(parent.last_child(), children.last().cloned());
    for (index, child) in children.iter().enumerate() {
        assert_eq!(child.parent_node().as_ref(), Some(parent));
        assert_eq!(child.index(), index as u32);
        let previous = if index == 0 {
            None
        } else {
            children.get(index - 1).cloned()
        };
        assert_eq!(child.previous_sibling(), previous);
        assert_eq!(child.next_sibling(), children.get(index + 1).cloned());
    }
}
