/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! CharacterData: the shared text buffer behind Text, Comment, CDATASection
//! and ProcessingInstruction nodes, and the single algorithm every text
//! mutation goes through.
//!
//! Offsets are byte offsets into the UTF-8 buffer. An offset that does not
//! land on a character boundary is out of range for the same reason an
//! offset past the end is.

use std::cell::RefCell;

use crate::atom::Atom;
use crate::error::{Error, ErrorResult, Fallible};
use crate::mutationobserver;
use crate::node::{NodeData, NodeRef, SuppressObserver};
use crate::range;

/// The data payload of a Text, Comment or CDATASection node.
pub struct CharacterData {
    data: RefCell<String>,
}

impl CharacterData {
    pub(crate) fn new(data: String) -> CharacterData {
        CharacterData {
            data: RefCell::new(data),
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-characterdata-data>
    pub fn data(&self) -> String {
        self.data.borrow().clone()
    }

    /// <https://dom.spec.whatwg.org/#dom-characterdata-length>
    pub fn length(&self) -> u32 {
        self.data.borrow().len() as u32
    }

    fn check_offset(&self, offset: u32) -> ErrorResult {
        let data = self.data.borrow();
        let offset = offset as usize;
        if offset > data.len() || !data.is_char_boundary(offset) {
            return Err(Error::IndexSize);
        }
        Ok(())
    }
}

/// The data payload of a ProcessingInstruction node.
pub struct ProcessingInstruction {
    cdata: CharacterData,
    target: RefCell<Atom>,
}

impl ProcessingInstruction {
    pub(crate) fn new(target: Atom, data: String) -> ProcessingInstruction {
        ProcessingInstruction {
            cdata: CharacterData::new(data),
            target: RefCell::new(target),
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-processinginstruction-target>
    pub fn target(&self) -> Atom {
        self.target.borrow().clone()
    }

    /// Rehomes the interned target when the node changes documents.
    pub(crate) fn reintern(&self, pool: &crate::document::Document) {
        let target = pool.intern(self.target.borrow().as_str());
        *self.target.borrow_mut() = target;
    }

    pub fn character_data(&self) -> &CharacterData {
        &self.cdata
    }
}

/// <https://dom.spec.whatwg.org/#concept-cd-replace>
///
/// The funnel for every CharacterData mutation: records, range adjustment
/// and collection invalidation all happen here.
pub fn replace_data(node: &NodeRef, offset: u32, count: u32, replacement: &str) -> ErrorResult {
    let cdata = node.as_character_data().ok_or(Error::InvalidNodeType)?;
    // Steps 1-2.
    let length = cdata.length();
    if offset > length {
        return Err(Error::IndexSize);
    }
    cdata.check_offset(offset)?;
    // Step 3. Clamp the count to the end of the data.
    let count = count.min(length - offset);
    let end = clamp_to_char_boundary(&cdata.data.borrow(), (offset + count) as usize) as u32;
    let count = end - offset;
    // Step 4. Queue the record before touching the buffer so the old value
    // survives for observers that asked for it.
    let old = cdata.data.borrow().clone();
    mutationobserver::queue_character_data_mutation_record(node, old);
    // Steps 5-7.
    {
        let mut data = cdata.data.borrow_mut();
        data.replace_range(offset as usize..end as usize, replacement);
    }
    // Steps 8-11. Boundary points inside or after the replaced run move.
    let document = node.node_document();
    if let Some(doc) = document.as_document() {
        range::adjust_for_replace_data(doc, node, offset, count, replacement.len() as u32);
        doc.note_mutation();
    }
    Ok(())
}

fn clamp_to_char_boundary(data: &str, mut offset: usize) -> usize {
    offset = offset.min(data.len());
    while offset < data.len() && !data.is_char_boundary(offset) {
        offset += 1;
    }
    offset
}

/// <https://dom.spec.whatwg.org/#dom-characterdata-substringdata>
pub fn substring_data(node: &NodeRef, offset: u32, count: u32) -> Fallible<String> {
    let cdata = node.as_character_data().ok_or(Error::InvalidNodeType)?;
    let length = cdata.length();
    if offset > length {
        return Err(Error::IndexSize);
    }
    cdata.check_offset(offset)?;
    let data = cdata.data.borrow();
    let end = clamp_to_char_boundary(&data, (offset + count.min(length - offset)) as usize);
    Ok(data[offset as usize..end].to_owned())
}

/// <https://dom.spec.whatwg.org/#dom-characterdata-appenddata>
pub fn append_data(node: &NodeRef, data: &str) -> ErrorResult {
    let length = node
        .as_character_data()
        .ok_or(Error::InvalidNodeType)?
        .length();
    replace_data(node, length, 0, data)
}

/// <https://dom.spec.whatwg.org/#dom-characterdata-insertdata>
pub fn insert_data(node: &NodeRef, offset: u32, data: &str) -> ErrorResult {
    replace_data(node, offset, 0, data)
}

/// <https://dom.spec.whatwg.org/#dom-characterdata-deletedata>
pub fn delete_data(node: &NodeRef, offset: u32, count: u32) -> ErrorResult {
    replace_data(node, offset, count, "")
}

/// <https://dom.spec.whatwg.org/#concept-text-split>
pub fn split_text(node: &NodeRef, offset: u32) -> Fallible<NodeRef> {
    if !node.is_text() {
        return Err(Error::InvalidNodeType);
    }
    let cdata = node.as_character_data().expect("text node");
    // Steps 1-2.
    let length = cdata.length();
    if offset > length {
        return Err(Error::IndexSize);
    }
    cdata.check_offset(offset)?;
    // Steps 3-5.
    let count = length - offset;
    let new_data = substring_data(node, offset, count)?;
    let document = node.node_document();
    let new_node = document.create_text_node(&new_data)?;
    let parent = node.parent_node();
    // Step 7. The new node slides in after the split point; ranges that
    // pointed past the split follow their text into the new node.
    if let Some(parent) = &parent {
        parent.insert(&new_node, node.next_sibling().as_ref(), SuppressObserver::Unsuppressed);
        if let Some(doc) = document.as_document() {
            range::adjust_for_split(doc, node, &new_node, offset);
        }
    }
    // Step 8.
    replace_data(node, offset, count, "")?;
    Ok(new_node)
}

/// <https://dom.spec.whatwg.org/#dom-text-wholetext>
pub fn whole_text(node: &NodeRef) -> Fallible<String> {
    if !node.is_text() {
        return Err(Error::InvalidNodeType);
    }
    let mut first = node.clone();
    while let Some(previous) = first.previous_sibling() {
        if !previous.is_text() {
            break;
        }
        first = previous;
    }
    let mut text = String::new();
    let mut current = Some(first);
    while let Some(sibling) = current {
        if !sibling.is_text() {
            break;
        }
        if let NodeData::Text(cdata) = sibling.data() {
            text.push_str(&cdata.data());
        }
        current = sibling.next_sibling();
    }
    Ok(text)
}
