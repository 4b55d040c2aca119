/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! NodeIterator.
//!
//! Iterators register with their document so the mutation funnel can run
//! the pre-removal steps, which slide the reference node out of a subtree
//! that is about to go away.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::document::Document;
use crate::error::{Error, Fallible};
use crate::node::{self, NodeRef};
use crate::nodefilter::{filter_node, FilterResult, NodeFilter, WhatToShow};

pub(crate) struct NodeIteratorData {
    root: NodeRef,
    reference: RefCell<NodeRef>,
    pointer_before_reference: Cell<bool>,
    what_to_show: WhatToShow,
    filter: Option<NodeFilter>,
    active: Cell<bool>,
}

/// <https://dom.spec.whatwg.org/#nodeiterator>
#[derive(Clone)]
pub struct NodeIterator(Rc<NodeIteratorData>);

impl NodeRef {
    /// <https://dom.spec.whatwg.org/#dom-document-createnodeiterator>
    pub fn create_node_iterator(
        &self,
        root: &NodeRef,
        what_to_show: WhatToShow,
        filter: Option<NodeFilter>,
    ) -> Fallible<NodeIterator> {
        let doc = self.as_document().ok_or(Error::InvalidNodeType)?;
        let data = Rc::new(NodeIteratorData {
            root: root.clone(),
            reference: RefCell::new(root.clone()),
            pointer_before_reference: Cell::new(true),
            what_to_show,
            filter,
            active: Cell::new(false),
        });
        let mut iterators = doc.iterators.borrow_mut();
        iterators.retain(|entry| entry.upgrade().is_some());
        iterators.push(Rc::downgrade(&data));
        Ok(NodeIterator(data))
    }
}

impl NodeIterator {
    pub fn root(&self) -> NodeRef {
        self.0.root.clone()
    }

    pub fn reference_node(&self) -> NodeRef {
        self.0.reference.borrow().clone()
    }

    pub fn pointer_before_reference_node(&self) -> bool {
        self.0.pointer_before_reference.get()
    }

    pub fn what_to_show(&self) -> WhatToShow {
        self.0.what_to_show
    }

    /// <https://dom.spec.whatwg.org/#concept-nodeiterator-traverse>
    fn traverse(&self, forward: bool) -> Fallible<Option<NodeRef>> {
        let data = &self.0;
        let mut node = data.reference.borrow().clone();
        let mut before = data.pointer_before_reference.get();
        loop {
            if forward {
                if !before {
                    node = match node::following_node_within(&node, &data.root) {
                        Some(next) => next,
                        None => return Ok(None),
                    };
                } else {
                    before = false;
                }
            } else if before {
                node = match node::preceding_node_within(&node, &data.root) {
                    Some(previous) => previous,
                    None => return Ok(None),
                };
            } else {
                before = true;
            }
            if filter_node(&node, data.what_to_show, &data.filter, &data.active)? ==
                FilterResult::Accept
            {
                break;
            }
        }
        *data.reference.borrow_mut() = node.clone();
        data.pointer_before_reference.set(before);
        Ok(Some(node))
    }

    /// <https://dom.spec.whatwg.org/#dom-nodeiterator-nextnode>
    pub fn next_node(&self) -> Fallible<Option<NodeRef>> {
        self.traverse(true)
    }

    /// <https://dom.spec.whatwg.org/#dom-nodeiterator-previousnode>
    pub fn previous_node(&self) -> Fallible<Option<NodeRef>> {
        self.traverse(false)
    }

    /// <https://dom.spec.whatwg.org/#nodeiterator-pre-removing-steps>
    fn pre_remove(&self, to_be_removed: &NodeRef) {
        let data = &self.0;
        let reference = data.reference.borrow().clone();
        if !to_be_removed.contains(&reference) || to_be_removed == &data.root {
            return;
        }
        if data.pointer_before_reference.get() {
            // Find the first following node still under the root but outside
            // the doomed subtree.
            let mut candidate = last_inclusive_descendant(to_be_removed);
            let next = loop {
                match node::following_node_within(&candidate, &data.root) {
                    Some(next) => {
                        if !to_be_removed.contains(&next) {
                            break Some(next);
                        }
                        candidate = next;
                    },
                    None => break None,
                }
            };
            if let Some(next) = next {
                *data.reference.borrow_mut() = next;
                return;
            }
            data.pointer_before_reference.set(false);
        }
        let replacement = match to_be_removed.previous_sibling() {
            Some(sibling) => last_inclusive_descendant(&sibling),
            None => match to_be_removed.parent_node() {
                Some(parent) => parent,
                None => return,
            },
        };
        *data.reference.borrow_mut() = replacement;
    }
}

fn last_inclusive_descendant(node: &NodeRef) -> NodeRef {
    let mut current = node.clone();
    while let Some(child) = current.last_child() {
        current = child;
    }
    current
}

/// Runs the pre-removal steps of every live iterator of `doc`.
pub(crate) fn adjust_for_remove(doc: &Document, node: &NodeRef) {
    let iterators: Vec<Rc<NodeIteratorData>> = {
        let mut registered = doc.iterators.borrow_mut();
        registered.retain(|entry| entry.upgrade().is_some());
        registered
            .iter()
            .filter_map(std::rc::Weak::upgrade)
            .collect()
    };
    for iterator in iterators {
        NodeIterator(iterator).pre_remove(node);
    }
}
