/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Range and StaticRange.
//!
//! A live Range registers itself with its document; the mutation funnel
//! calls the `adjust_for_*` hooks here after every child-list or
//! character-data change so boundary points track the tree. A StaticRange
//! skips registration entirely and is allowed to go stale.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::characterdata;
use crate::document::Document;
use crate::error::{Error, ErrorResult, Fallible};
use crate::node::{NodeData, NodeRef, SuppressObserver};

/// <https://dom.spec.whatwg.org/#dom-range-start_to_start>
pub const START_TO_START: u16 = 0;
pub const START_TO_END: u16 = 1;
pub const END_TO_END: u16 = 2;
pub const END_TO_START: u16 = 3;

#[derive(Clone)]
struct Boundary {
    node: NodeRef,
    offset: u32,
}

/// Shared state of one live range; the document holds these weakly.
pub struct LiveRangeData {
    start: RefCell<Boundary>,
    end: RefCell<Boundary>,
}

/// <https://dom.spec.whatwg.org/#range>
#[derive(Clone)]
pub struct Range(Rc<LiveRangeData>);

/// <https://dom.spec.whatwg.org/#staticrange>
#[derive(Debug)]
pub struct StaticRange {
    start_container: NodeRef,
    start_offset: u32,
    end_container: NodeRef,
    end_offset: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum BoundaryPosition {
    Before,
    Equal,
    After,
}

impl NodeRef {
    /// <https://dom.spec.whatwg.org/#dom-document-createrange>
    pub fn create_range(&self) -> Fallible<Range> {
        let doc = self.as_document().ok_or(Error::InvalidNodeType)?;
        let data = Rc::new(LiveRangeData {
            start: RefCell::new(Boundary {
                node: self.clone(),
                offset: 0,
            }),
            end: RefCell::new(Boundary {
                node: self.clone(),
                offset: 0,
            }),
        });
        let mut ranges = doc.ranges.borrow_mut();
        ranges.retain(|entry| entry.upgrade().is_some());
        ranges.push(Rc::downgrade(&data));
        Ok(Range(data))
    }
}

/// True if `a` comes after `b` in tree order (same tree assumed).
fn is_following(a: &NodeRef, b: &NodeRef) -> bool {
    if a == b {
        return false;
    }
    for node in a.root().traverse_preorder() {
        if &node == b {
            return true;
        }
        if &node == a {
            return false;
        }
    }
    false
}

/// <https://dom.spec.whatwg.org/#concept-range-bp-position>
fn position_of(node_a: &NodeRef, offset_a: u32, node_b: &NodeRef, offset_b: u32) -> BoundaryPosition {
    // Step 2.
    if node_a == node_b {
        return if offset_a == offset_b {
            BoundaryPosition::Equal
        } else if offset_a < offset_b {
            BoundaryPosition::Before
        } else {
            BoundaryPosition::After
        };
    }
    // Step 3.
    if is_following(node_a, node_b) {
        return match position_of(node_b, offset_b, node_a, offset_a) {
            BoundaryPosition::Before => BoundaryPosition::After,
            BoundaryPosition::After => BoundaryPosition::Before,
            BoundaryPosition::Equal => BoundaryPosition::Equal,
        };
    }
    // Step 4.
    if node_a.contains(node_b) {
        let mut child = node_b.clone();
        while let Some(parent) = child.parent_node() {
            if &parent == node_a {
                break;
            }
            child = parent;
        }
        if child.index() < offset_a {
            return BoundaryPosition::After;
        }
    }
    // Step 5.
    BoundaryPosition::Before
}

impl Range {
    fn start(&self) -> Boundary {
        self.0.start.borrow().clone()
    }

    fn end(&self) -> Boundary {
        self.0.end.borrow().clone()
    }

    pub fn start_container(&self) -> NodeRef {
        self.start().node
    }

    pub fn start_offset(&self) -> u32 {
        self.start().offset
    }

    pub fn end_container(&self) -> NodeRef {
        self.end().node
    }

    pub fn end_offset(&self) -> u32 {
        self.end().offset
    }

    /// <https://dom.spec.whatwg.org/#dom-range-collapsed>
    pub fn collapsed(&self) -> bool {
        let start = self.start();
        let end = self.end();
        start.node == end.node && start.offset == end.offset
    }

    fn root(&self) -> NodeRef {
        self.start().node.root()
    }

    /// <https://dom.spec.whatwg.org/#dom-range-commonancestorcontainer>
    pub fn common_ancestor_container(&self) -> NodeRef {
        let end = self.end();
        for ancestor in self.start().node.inclusive_ancestors() {
            if ancestor.contains(&end.node) {
                return ancestor;
            }
        }
        self.root()
    }

    fn check_boundary(node: &NodeRef, offset: u32) -> ErrorResult {
        if node.is_doctype() {
            return Err(Error::InvalidNodeType);
        }
        if offset > node.length() {
            return Err(Error::IndexSize);
        }
        // Offsets into character data must land between characters.
        if let Some(cdata) = node.as_character_data() {
            if !cdata.data().is_char_boundary(offset as usize) {
                return Err(Error::IndexSize);
            }
        }
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#concept-range-bp-set>
    pub fn set_start(&self, node: &NodeRef, offset: u32) -> ErrorResult {
        Range::check_boundary(node, offset)?;
        let boundary = Boundary {
            node: node.clone(),
            offset,
        };
        let end = self.end();
        let same_root = node.root() == self.root();
        let after_end = same_root &&
            position_of(node, offset, &end.node, end.offset) == BoundaryPosition::After;
        if !same_root || after_end {
            *self.0.end.borrow_mut() = boundary.clone();
        }
        *self.0.start.borrow_mut() = boundary;
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#concept-range-bp-set>
    pub fn set_end(&self, node: &NodeRef, offset: u32) -> ErrorResult {
        Range::check_boundary(node, offset)?;
        let boundary = Boundary {
            node: node.clone(),
            offset,
        };
        let start = self.start();
        let same_root = node.root() == self.root();
        let before_start = same_root &&
            position_of(node, offset, &start.node, start.offset) == BoundaryPosition::Before;
        if !same_root || before_start {
            *self.0.start.borrow_mut() = boundary.clone();
        }
        *self.0.end.borrow_mut() = boundary;
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#dom-range-setstartbefore>
    pub fn set_start_before(&self, node: &NodeRef) -> ErrorResult {
        let parent = node.parent_node().ok_or(Error::InvalidNodeType)?;
        self.set_start(&parent, node.index())
    }

    /// <https://dom.spec.whatwg.org/#dom-range-setstartafter>
    pub fn set_start_after(&self, node: &NodeRef) -> ErrorResult {
        let parent = node.parent_node().ok_or(Error::InvalidNodeType)?;
        self.set_start(&parent, node.index() + 1)
    }

    /// <https://dom.spec.whatwg.org/#dom-range-setendbefore>
    pub fn set_end_before(&self, node: &NodeRef) -> ErrorResult {
        let parent = node.parent_node().ok_or(Error::InvalidNodeType)?;
        self.set_end(&parent, node.index())
    }

    /// <https://dom.spec.whatwg.org/#dom-range-setendafter>
    pub fn set_end_after(&self, node: &NodeRef) -> ErrorResult {
        let parent = node.parent_node().ok_or(Error::InvalidNodeType)?;
        self.set_end(&parent, node.index() + 1)
    }

    /// <https://dom.spec.whatwg.org/#dom-range-collapse>
    pub fn collapse(&self, to_start: bool) {
        if to_start {
            *self.0.end.borrow_mut() = self.start();
        } else {
            *self.0.start.borrow_mut() = self.end();
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-range-selectnode>
    pub fn select_node(&self, node: &NodeRef) -> ErrorResult {
        let parent = node.parent_node().ok_or(Error::InvalidNodeType)?;
        let index = node.index();
        *self.0.start.borrow_mut() = Boundary {
            node: parent.clone(),
            offset: index,
        };
        *self.0.end.borrow_mut() = Boundary {
            node: parent,
            offset: index + 1,
        };
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#dom-range-selectnodecontents>
    pub fn select_node_contents(&self, node: &NodeRef) -> ErrorResult {
        if node.is_doctype() {
            return Err(Error::InvalidNodeType);
        }
        *self.0.start.borrow_mut() = Boundary {
            node: node.clone(),
            offset: 0,
        };
        *self.0.end.borrow_mut() = Boundary {
            node: node.clone(),
            offset: node.length(),
        };
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#dom-range-compareboundarypoints>
    pub fn compare_boundary_points(&self, how: u16, source: &Range) -> Fallible<i16> {
        if how > END_TO_START {
            return Err(Error::NotSupported);
        }
        if self.root() != source.root() {
            return Err(Error::WrongDocument);
        }
        let (this, that) = match how {
            START_TO_START => (self.start(), source.start()),
            START_TO_END => (self.end(), source.start()),
            END_TO_END => (self.end(), source.end()),
            _ => (self.start(), source.end()),
        };
        Ok(
            match position_of(&this.node, this.offset, &that.node, that.offset) {
                BoundaryPosition::Before => -1,
                BoundaryPosition::Equal => 0,
                BoundaryPosition::After => 1,
            },
        )
    }

    /// <https://dom.spec.whatwg.org/#dom-range-comparepoint>
    pub fn compare_point(&self, node: &NodeRef, offset: u32) -> Fallible<i16> {
        if node.root() != self.root() {
            return Err(Error::WrongDocument);
        }
        Range::check_boundary(node, offset)?;
        let start = self.start();
        if position_of(node, offset, &start.node, start.offset) == BoundaryPosition::Before {
            return Ok(-1);
        }
        let end = self.end();
        if position_of(node, offset, &end.node, end.offset) == BoundaryPosition::After {
            return Ok(1);
        }
        Ok(0)
    }

    /// <https://dom.spec.whatwg.org/#dom-range-ispointinrange>
    pub fn is_point_in_range(&self, node: &NodeRef, offset: u32) -> Fallible<bool> {
        if node.root() != self.root() {
            return Ok(false);
        }
        Range::check_boundary(node, offset)?;
        Ok(self.compare_point(node, offset)? == 0)
    }

    /// <https://dom.spec.whatwg.org/#dom-range-intersectsnode>
    pub fn intersects_node(&self, node: &NodeRef) -> bool {
        if node.root() != self.root() {
            return false;
        }
        let parent = match node.parent_node() {
            Some(parent) => parent,
            None => return true,
        };
        let index = node.index();
        let start = self.start();
        let end = self.end();
        position_of(&parent, index, &end.node, end.offset) == BoundaryPosition::Before &&
            position_of(&parent, index + 1, &start.node, start.offset) == BoundaryPosition::After
    }

    /// <https://dom.spec.whatwg.org/#contained>
    fn contains_node(&self, node: &NodeRef) -> bool {
        if node.root() != self.root() {
            return false;
        }
        let start = self.start();
        let end = self.end();
        position_of(node, 0, &start.node, start.offset) == BoundaryPosition::After &&
            position_of(node, node.length(), &end.node, end.offset) == BoundaryPosition::Before
    }

    /// <https://dom.spec.whatwg.org/#partially-contained>
    fn partially_contains_node(&self, node: &NodeRef) -> bool {
        let contains_start = node.contains(&self.start().node);
        let contains_end = node.contains(&self.end().node);
        contains_start != contains_end
    }

    /// The topmost contained nodes, in tree order.
    fn contained_children(&self) -> Fallible<Vec<NodeRef>> {
        let common = self.common_ancestor_container();
        let contained: Vec<NodeRef> = common
            .children()
            .filter(|child| self.contains_node(child))
            .collect();
        if contained.iter().any(|node| node.is_doctype()) {
            return Err(Error::HierarchyRequest);
        }
        Ok(contained)
    }

    /// The boundary both ends collapse to after removing the contents.
    fn removal_boundary(&self) -> Boundary {
        let start = self.start();
        let end = self.end();
        if start.node.contains(&end.node) {
            return start;
        }
        let mut reference = start.node.clone();
        loop {
            let parent = match reference.parent_node() {
                Some(parent) => parent,
                None => return start,
            };
            if parent.contains(&end.node) {
                return Boundary {
                    offset: reference.index() + 1,
                    node: parent,
                };
            }
            reference = parent;
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-range-deletecontents>
    pub fn delete_contents(&self) -> ErrorResult {
        // Step 1.
        if self.collapsed() {
            return Ok(());
        }
        let start = self.start();
        let end = self.end();
        // Step 2. Entirely inside one CharacterData node.
        if start.node == end.node && start.node.as_character_data().is_some() {
            return characterdata::delete_data(&start.node, start.offset, end.offset - start.offset);
        }
        // Steps 3-5.
        let to_remove: Vec<NodeRef> = {
            let common = self.common_ancestor_container();
            common
                .traverse_preorder()
                .filter(|node| {
                    self.contains_node(node) &&
                        !node.parent_node().map(|p| self.contains_node(&p)).unwrap_or(false)
                })
                .collect()
        };
        let new_boundary = self.removal_boundary();
        // Step 6.
        if start.node.as_character_data().is_some() {
            let length = start.node.length();
            characterdata::delete_data(&start.node, start.offset, length - start.offset)?;
        }
        // Step 7.
        for node in to_remove {
            crate::node::remove_node(&node, SuppressObserver::Unsuppressed);
        }
        // Step 8.
        if end.node.as_character_data().is_some() {
            characterdata::delete_data(&end.node, 0, end.offset)?;
        }
        // Step 9.
        *self.0.start.borrow_mut() = new_boundary.clone();
        *self.0.end.borrow_mut() = new_boundary;
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#concept-range-extract>
    pub fn extract_contents(&self) -> Fallible<NodeRef> {
        let document = self.start().node.node_document();
        let fragment = document.create_document_fragment()?;
        if self.collapsed() {
            return Ok(fragment);
        }
        let start = self.start();
        let end = self.end();
        // One CharacterData container: slice it out.
        if start.node == end.node && start.node.as_character_data().is_some() {
            let clone = start.node.clone_node_internal(&document, false)?;
            let text =
                characterdata::substring_data(&start.node, start.offset, end.offset - start.offset)?;
            characterdata::replace_data(&clone, 0, clone.length(), &text)?;
            fragment.insert(&clone, None, SuppressObserver::Suppressed);
            characterdata::delete_data(&start.node, start.offset, end.offset - start.offset)?;
            return Ok(fragment);
        }
        let common = self.common_ancestor_container();
        // Steps 5-6. These are directional: a boundary container that is an
        // inclusive ancestor of the other boundary has no partially
        // contained child on its side.
        let first_partial = if start.node.contains(&end.node) {
            None
        } else {
            common.children().find(|child| child.contains(&start.node))
        };
        let last_partial = if end.node.contains(&start.node) {
            None
        } else {
            common.children().find(|child| child.contains(&end.node))
        };
        let contained = self.contained_children()?;
        let new_boundary = self.removal_boundary();

        if let Some(first) = &first_partial {
            if first.as_character_data().is_some() {
                // first == start node here.
                let clone = first.clone_node_internal(&document, false)?;
                let length = first.length();
                let text = characterdata::substring_data(first, start.offset, length - start.offset)?;
                characterdata::replace_data(&clone, 0, clone.length(), &text)?;
                fragment.insert(&clone, None, SuppressObserver::Suppressed);
                characterdata::delete_data(first, start.offset, length - start.offset)?;
            } else {
                let clone = first.clone_node_internal(&document, false)?;
                fragment.insert(&clone, None, SuppressObserver::Suppressed);
                let subrange = document.create_range()?;
                subrange.set_start(&start.node, start.offset)?;
                subrange.set_end(first, first.length())?;
                let subfragment = subrange.extract_contents()?;
                clone.insert(&subfragment, None, SuppressObserver::Suppressed);
            }
        }
        for node in &contained {
            fragment.insert(node, None, SuppressObserver::Unsuppressed);
        }
        if let Some(last) = &last_partial {
            if last.as_character_data().is_some() {
                let clone = last.clone_node_internal(&document, false)?;
                let text = characterdata::substring_data(last, 0, end.offset)?;
                characterdata::replace_data(&clone, 0, clone.length(), &text)?;
                fragment.insert(&clone, None, SuppressObserver::Suppressed);
                characterdata::delete_data(last, 0, end.offset)?;
            } else {
                let clone = last.clone_node_internal(&document, false)?;
                fragment.insert(&clone, None, SuppressObserver::Suppressed);
                let subrange = document.create_range()?;
                subrange.set_start(last, 0)?;
                subrange.set_end(&end.node, end.offset)?;
                let subfragment = subrange.extract_contents()?;
                clone.insert(&subfragment, None, SuppressObserver::Suppressed);
            }
        }
        *self.0.start.borrow_mut() = new_boundary.clone();
        *self.0.end.borrow_mut() = new_boundary;
        Ok(fragment)
    }

    /// <https://dom.spec.whatwg.org/#concept-range-clone>
    pub fn clone_contents(&self) -> Fallible<NodeRef> {
        let document = self.start().node.node_document();
        let fragment = document.create_document_fragment()?;
        if self.collapsed() {
            return Ok(fragment);
        }
        let start = self.start();
        let end = self.end();
        if start.node == end.node && start.node.as_character_data().is_some() {
            let clone = start.node.clone_node_internal(&document, false)?;
            let text =
                characterdata::substring_data(&start.node, start.offset, end.offset - start.offset)?;
            characterdata::replace_data(&clone, 0, clone.length(), &text)?;
            fragment.insert(&clone, None, SuppressObserver::Suppressed);
            return Ok(fragment);
        }
        let common = self.common_ancestor_container();
        for child in common.children() {
            if self.contains_node(&child) {
                let clone = child.clone_node_internal(&document, true)?;
                fragment.insert(&clone, None, SuppressObserver::Suppressed);
            } else if self.partially_contains_node(&child) {
                if child.as_character_data().is_some() {
                    let clone = child.clone_node_internal(&document, false)?;
                    let (from, count) = if child == start.node {
                        (start.offset, child.length() - start.offset)
                    } else {
                        (0, end.offset)
                    };
                    let text = characterdata::substring_data(&child, from, count)?;
                    characterdata::replace_data(&clone, 0, clone.length(), &text)?;
                    fragment.insert(&clone, None, SuppressObserver::Suppressed);
                } else {
                    let clone = child.clone_node_internal(&document, false)?;
                    fragment.insert(&clone, None, SuppressObserver::Suppressed);
                    let subrange = document.create_range()?;
                    if child.contains(&start.node) {
                        subrange.set_start(&start.node, start.offset)?;
                        subrange.set_end(&child, child.length())?;
                    } else {
                        subrange.set_start(&child, 0)?;
                        subrange.set_end(&end.node, end.offset)?;
                    }
                    let subfragment = subrange.clone_contents()?;
                    clone.insert(&subfragment, None, SuppressObserver::Suppressed);
                }
            }
        }
        Ok(fragment)
    }

    /// <https://dom.spec.whatwg.org/#dom-range-insertnode>
    pub fn insert_node(&self, node: &NodeRef) -> ErrorResult {
        let start = self.start();
        // Step 1.
        let start_is_text = start.node.is_text();
        match start.node.data() {
            NodeData::ProcessingInstruction(_) | NodeData::Comment(_) => {
                return Err(Error::HierarchyRequest);
            },
            NodeData::Text(_) if start.node.parent_node().is_none() => {
                return Err(Error::HierarchyRequest);
            },
            _ => {},
        }
        if &start.node == node {
            return Err(Error::HierarchyRequest);
        }
        // Steps 2-3.
        let mut reference = if start_is_text {
            Some(start.node.clone())
        } else {
            start.node.child_at(start.offset)
        };
        let parent = match &reference {
            Some(reference) => reference.parent_node().ok_or(Error::HierarchyRequest)?,
            None => start.node.clone(),
        };
        // Step 4.
        parent.ensure_pre_insert_validity(node, reference.as_ref())?;
        // Step 5.
        if start_is_text {
            reference = Some(characterdata::split_text(&start.node, start.offset)?);
        }
        // Step 6.
        if Some(node) == reference.as_ref() {
            reference = node.next_sibling();
        }
        // Step 7.
        if node.parent_node().is_some() {
            crate::node::remove_node(node, SuppressObserver::Unsuppressed);
        }
        // Step 8.
        let mut new_offset = match &reference {
            Some(reference) => reference.index(),
            None => parent.length(),
        };
        new_offset += match node.data() {
            NodeData::DocumentFragment(_) => node.child_count(),
            _ => 1,
        };
        // Step 9.
        parent.pre_insert(node, reference.as_ref())?;
        // Step 10.
        if self.collapsed() {
            *self.0.end.borrow_mut() = Boundary {
                node: parent,
                offset: new_offset,
            };
        }
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#dom-range-surroundcontents>
    pub fn surround_contents(&self, new_parent: &NodeRef) -> ErrorResult {
        // Step 1. A partially contained non-Text node cannot be split.
        let common = self.common_ancestor_container();
        for node in common.traverse_preorder() {
            if !node.is_text() && self.partially_contains_node(&node) {
                return Err(Error::InvalidState);
            }
        }
        // Step 2.
        match new_parent.data() {
            NodeData::Document(_) | NodeData::DocumentType(_) | NodeData::DocumentFragment(_) => {
                return Err(Error::InvalidNodeType);
            },
            _ => {},
        }
        // Steps 3-4.
        let fragment = self.extract_contents()?;
        if new_parent.has_child_nodes() {
            new_parent.replace_all(None);
        }
        // Steps 5-6.
        self.insert_node(new_parent)?;
        new_parent.pre_insert(&fragment, None)?;
        // Step 7.
        self.select_node(new_parent)
    }

    /// <https://dom.spec.whatwg.org/#dom-range-clonerange>
    pub fn clone_range(&self) -> Fallible<Range> {
        let start = self.start();
        let end = self.end();
        let clone = start.node.node_document().create_range()?;
        clone.set_start(&start.node, start.offset)?;
        clone.set_end(&end.node, end.offset)?;
        Ok(clone)
    }

    /// The range stringifier: the text between the boundary points.
    /// <https://dom.spec.whatwg.org/#dom-range-stringifier>
    pub fn text(&self) -> String {
        let start = self.start();
        let end = self.end();
        if start.node == end.node && start.node.as_character_data().is_some() {
            return characterdata::substring_data(&start.node, start.offset, end.offset - start.offset)
                .unwrap_or_default();
        }
        let mut result = String::new();
        if let Some(cdata) = start.node.as_character_data() {
            let data = cdata.data();
            result.push_str(&data[start.offset as usize..]);
        }
        let common = self.common_ancestor_container();
        for node in common.traverse_preorder() {
            if node.is_text() && self.contains_node(&node) {
                if let Some(cdata) = node.as_character_data() {
                    result.push_str(&cdata.data());
                }
            }
        }
        if let Some(cdata) = end.node.as_character_data() {
            if end.node != start.node {
                let data = cdata.data();
                result.push_str(&data[..end.offset as usize]);
            }
        }
        result
    }
}

impl StaticRange {
    /// <https://dom.spec.whatwg.org/#dom-staticrange-staticrange>
    pub fn new(
        start_container: &NodeRef,
        start_offset: u32,
        end_container: &NodeRef,
        end_offset: u32,
    ) -> Fallible<StaticRange> {
        for node in [start_container, end_container] {
            if node.is_doctype() || node.as_attr().is_some() {
                return Err(Error::InvalidNodeType);
            }
        }
        Ok(StaticRange {
            start_container: start_container.clone(),
            start_offset,
            end_container: end_container.clone(),
            end_offset,
        })
    }

    pub fn start_container(&self) -> NodeRef {
        self.start_container.clone()
    }

    pub fn start_offset(&self) -> u32 {
        self.start_offset
    }

    pub fn end_container(&self) -> NodeRef {
        self.end_container.clone()
    }

    pub fn end_offset(&self) -> u32 {
        self.end_offset
    }

    /// StaticRange boundaries may be stale; validity is checked on use.
    /// <https://dom.spec.whatwg.org/#staticrange-valid>
    pub fn is_valid(&self) -> bool {
        let same_root = self.start_container.root() == self.end_container.root();
        same_root &&
            self.start_offset <= self.start_container.length() &&
            self.end_offset <= self.end_container.length() &&
            position_of(
                &self.start_container,
                self.start_offset,
                &self.end_container,
                self.end_offset,
            ) != BoundaryPosition::After
    }
}

// ---------------------------------------------------------------------------
// Boundary adjustments driven by the mutation funnel.
// ---------------------------------------------------------------------------

fn for_each_live_range(doc: &Document, mut f: impl FnMut(&LiveRangeData)) {
    let ranges: SmallVec<[Rc<LiveRangeData>; 4]> = {
        let mut registered = doc.ranges.borrow_mut();
        registered.retain(|entry| entry.upgrade().is_some());
        registered.iter().filter_map(std::rc::Weak::upgrade).collect()
    };
    for range in ranges {
        f(&range);
    }
}

fn adjust_boundary(boundary: &RefCell<Boundary>, f: &impl Fn(&Boundary) -> Option<Boundary>) {
    let updated = f(&boundary.borrow());
    if let Some(updated) = updated {
        *boundary.borrow_mut() = updated;
    }
}

/// <https://dom.spec.whatwg.org/#concept-node-insert> step 3.
pub(crate) fn adjust_for_insert(doc: &Document, parent: &NodeRef, child_index: u32, count: u32) {
    for_each_live_range(doc, |range| {
        let rule = |boundary: &Boundary| {
            if &boundary.node == parent && boundary.offset > child_index {
                Some(Boundary {
                    node: boundary.node.clone(),
                    offset: boundary.offset + count,
                })
            } else {
                None
            }
        };
        adjust_boundary(&range.start, &rule);
        adjust_boundary(&range.end, &rule);
    });
}

/// <https://dom.spec.whatwg.org/#concept-node-remove> steps 2-4.
pub(crate) fn adjust_for_remove(doc: &Document, node: &NodeRef, parent: &NodeRef, index: u32) {
    for_each_live_range(doc, |range| {
        let rule = |boundary: &Boundary| {
            if node.contains(&boundary.node) {
                Some(Boundary {
                    node: parent.clone(),
                    offset: index,
                })
            } else if &boundary.node == parent && boundary.offset > index {
                Some(Boundary {
                    node: boundary.node.clone(),
                    offset: boundary.offset - 1,
                })
            } else {
                None
            }
        };
        adjust_boundary(&range.start, &rule);
        adjust_boundary(&range.end, &rule);
    });
}

/// <https://dom.spec.whatwg.org/#concept-cd-replace> steps 8-11.
pub(crate) fn adjust_for_replace_data(
    doc: &Document,
    node: &NodeRef,
    offset: u32,
    count: u32,
    data_length: u32,
) {
    for_each_live_range(doc, |range| {
        let rule = |boundary: &Boundary| {
            if &boundary.node != node {
                return None;
            }
            if boundary.offset > offset && boundary.offset <= offset + count {
                Some(Boundary {
                    node: boundary.node.clone(),
                    offset,
                })
            } else if boundary.offset > offset + count {
                Some(Boundary {
                    node: boundary.node.clone(),
                    offset: boundary.offset + data_length - count,
                })
            } else {
                None
            }
        };
        adjust_boundary(&range.start, &rule);
        adjust_boundary(&range.end, &rule);
    });
}

/// <https://dom.spec.whatwg.org/#concept-text-split> step 7.
pub(crate) fn adjust_for_split(
    doc: &Document,
    node: &NodeRef,
    new_node: &NodeRef,
    offset: u32,
) {
    let parent_and_index = node.parent_node().map(|parent| (parent, node.index()));
    for_each_live_range(doc, |range| {
        let rule = |boundary: &Boundary| {
            if &boundary.node == node && boundary.offset > offset {
                return Some(Boundary {
                    node: new_node.clone(),
                    offset: boundary.offset - offset,
                });
            }
            if let Some((parent, index)) = &parent_and_index {
                if &boundary.node == parent && boundary.offset == index + 1 {
                    return Some(Boundary {
                        node: boundary.node.clone(),
                        offset: boundary.offset + 1,
                    });
                }
            }
            None
        };
        adjust_boundary(&range.start, &rule);
        adjust_boundary(&range.end, &rule);
    });
}
