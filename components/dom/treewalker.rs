/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! TreeWalker.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{Error, Fallible};
use crate::node::NodeRef;
use crate::nodefilter::{filter_node, FilterResult, NodeFilter, WhatToShow};

struct TreeWalkerData {
    root: NodeRef,
    current: RefCell<NodeRef>,
    what_to_show: WhatToShow,
    filter: Option<NodeFilter>,
    active: Cell<bool>,
}

/// <https://dom.spec.whatwg.org/#treewalker>
#[derive(Clone)]
pub struct TreeWalker(Rc<TreeWalkerData>);

impl NodeRef {
    /// <https://dom.spec.whatwg.org/#dom-document-createtreewalker>
    pub fn create_tree_walker(
        &self,
        root: &NodeRef,
        what_to_show: WhatToShow,
        filter: Option<NodeFilter>,
    ) -> Fallible<TreeWalker> {
        self.as_document().ok_or(Error::InvalidNodeType)?;
        Ok(TreeWalker(Rc::new(TreeWalkerData {
            root: root.clone(),
            current: RefCell::new(root.clone()),
            what_to_show,
            filter,
            active: Cell::new(false),
        })))
    }
}

impl TreeWalker {
    pub fn root(&self) -> NodeRef {
        self.0.root.clone()
    }

    pub fn what_to_show(&self) -> WhatToShow {
        self.0.what_to_show
    }

    /// <https://dom.spec.whatwg.org/#dom-treewalker-currentnode>
    pub fn current_node(&self) -> NodeRef {
        self.0.current.borrow().clone()
    }

    /// Setting currentNode is unchecked; traversal re-anchors from wherever
    /// it points.
    pub fn set_current_node(&self, node: &NodeRef) {
        *self.0.current.borrow_mut() = node.clone();
    }

    fn accept(&self, node: &NodeRef) -> Fallible<FilterResult> {
        filter_node(node, self.0.what_to_show, &self.0.filter, &self.0.active)
    }

    /// <https://dom.spec.whatwg.org/#dom-treewalker-parentnode>
    pub fn parent_node(&self) -> Fallible<Option<NodeRef>> {
        let mut node = self.current_node();
        while node != self.0.root {
            node = match node.parent_node() {
                Some(parent) => parent,
                None => break,
            };
            if self.accept(&node)? == FilterResult::Accept {
                *self.0.current.borrow_mut() = node.clone();
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// <https://dom.spec.whatwg.org/#concept-traverse-children>
    fn traverse_children(&self, first: bool) -> Fallible<Option<NodeRef>> {
        // Step 1.
        let mut node = match if first {
            self.current_node().first_child()
        } else {
            self.current_node().last_child()
        } {
            Some(child) => child,
            None => return Ok(None),
        };
        // Step 2.
        loop {
            match self.accept(&node)? {
                FilterResult::Accept => {
                    *self.0.current.borrow_mut() = node.clone();
                    return Ok(Some(node));
                },
                FilterResult::Skip => {
                    // Skip descends; reject prunes.
                    let child = if first {
                        node.first_child()
                    } else {
                        node.last_child()
                    };
                    if let Some(child) = child {
                        node = child;
                        continue;
                    }
                },
                FilterResult::Reject => {},
            }
            // Step 3. No acceptable descendant: move to the next sibling,
            // climbing out while there is none.
            loop {
                let sibling = if first {
                    node.next_sibling()
                } else {
                    node.previous_sibling()
                };
                if let Some(sibling) = sibling {
                    node = sibling;
                    break;
                }
                let parent = match node.parent_node() {
                    Some(parent) => parent,
                    None => return Ok(None),
                };
                if parent == self.0.root || parent == self.current_node() {
                    return Ok(None);
                }
                node = parent;
            }
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-treewalker-firstchild>
    pub fn first_child(&self) -> Fallible<Option<NodeRef>> {
        self.traverse_children(true)
    }

    /// <https://dom.spec.whatwg.org/#dom-treewalker-lastchild>
    pub fn last_child(&self) -> Fallible<Option<NodeRef>> {
        self.traverse_children(false)
    }

    /// <https://dom.spec.whatwg.org/#concept-traverse-siblings>
    fn traverse_siblings(&self, next: bool) -> Fallible<Option<NodeRef>> {
        // Step 1.
        let mut node = self.current_node();
        if node == self.0.root {
            return Ok(None);
        }
        // Step 2.
        loop {
            let mut sibling = if next {
                node.next_sibling()
            } else {
                node.previous_sibling()
            };
            while let Some(current) = sibling {
                node = current.clone();
                match self.accept(&node)? {
                    FilterResult::Accept => {
                        *self.0.current.borrow_mut() = node.clone();
                        return Ok(Some(node));
                    },
                    FilterResult::Reject => {
                        sibling = if next {
                            node.next_sibling()
                        } else {
                            node.previous_sibling()
                        };
                    },
                    FilterResult::Skip => {
                        // Descend into skipped nodes before moving on.
                        let child = if next {
                            node.first_child()
                        } else {
                            node.last_child()
                        };
                        sibling = match child {
                            Some(child) => Some(child),
                            None => {
                                if next {
                                    node.next_sibling()
                                } else {
                                    node.previous_sibling()
                                }
                            },
                        };
                    },
                }
            }
            // Step 3.
            node = match node.parent_node() {
                Some(parent) => parent,
                None => return Ok(None),
            };
            if node == self.0.root {
                return Ok(None);
            }
            if self.accept(&node)? == FilterResult::Accept {
                return Ok(None);
            }
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-treewalker-nextsibling>
    pub fn next_sibling(&self) -> Fallible<Option<NodeRef>> {
        self.traverse_siblings(true)
    }

    /// <https://dom.spec.whatwg.org/#dom-treewalker-previoussibling>
    pub fn previous_sibling(&self) -> Fallible<Option<NodeRef>> {
        self.traverse_siblings(false)
    }

    /// <https://dom.spec.whatwg.org/#dom-treewalker-nextnode>
    pub fn next_node(&self) -> Fallible<Option<NodeRef>> {
        let mut node = self.current_node();
        let mut result = FilterResult::Accept;
        loop {
            // Step 2.1: descend, unless the last filter result pruned.
            while result != FilterResult::Reject {
                let child = match node.first_child() {
                    Some(child) => child,
                    None => break,
                };
                node = child;
                result = self.accept(&node)?;
                if result == FilterResult::Accept {
                    *self.0.current.borrow_mut() = node.clone();
                    return Ok(Some(node));
                }
            }
            // Step 2.2: the following node that is not a descendant.
            let mut temporary = node.clone();
            let sibling = loop {
                if temporary == self.0.root {
                    break None;
                }
                if let Some(sibling) = temporary.next_sibling() {
                    break Some(sibling);
                }
                temporary = match temporary.parent_node() {
                    Some(parent) => parent,
                    None => break None,
                };
            };
            node = match sibling {
                Some(sibling) => sibling,
                None => return Ok(None),
            };
            result = self.accept(&node)?;
            if result == FilterResult::Accept {
                *self.0.current.borrow_mut() = node.clone();
                return Ok(Some(node));
            }
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-treewalker-previousnode>
    pub fn previous_node(&self) -> Fallible<Option<NodeRef>> {
        let mut node = self.current_node();
        while node != self.0.root {
            // Step 2.1.
            let mut sibling = node.previous_sibling();
            while let Some(current) = sibling {
                node = current;
                let mut result = self.accept(&node)?;
                // Step 2.1.2: descend to the last acceptable leaf.
                while result != FilterResult::Reject {
                    let child = match node.last_child() {
                        Some(child) => child,
                        None => break,
                    };
                    node = child;
                    result = self.accept(&node)?;
                }
                if result == FilterResult::Accept {
                    *self.0.current.borrow_mut() = node.clone();
                    return Ok(Some(node));
                }
                sibling = node.previous_sibling();
            }
            // Step 2.2.
            if node == self.0.root {
                return Ok(None);
            }
            node = match node.parent_node() {
                Some(parent) => parent,
                None => return Ok(None),
            };
            if self.accept(&node)? == FilterResult::Accept {
                *self.0.current.borrow_mut() = node.clone();
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}
