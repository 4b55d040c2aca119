/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! NodeList: the live childNodes view and static snapshots.
//!
//! Live lists are lazily materialized. Each list remembers the document
//! generation it was built against and rebuilds itself when the document
//! has mutated since, which costs nothing on the mutation path itself.

use std::cell::RefCell;
use std::rc::Rc;

use crate::node::{NodeRef, WeakNodeRef};

enum NodeListKind {
    /// The children of one node, live.
    Children(WeakNodeRef),
    /// A frozen list of nodes (querySelectorAll results).
    Static(Vec<NodeRef>),
}

struct NodeListData {
    kind: NodeListKind,
    cache: RefCell<NodeListCache>,
}

#[derive(Default)]
struct NodeListCache {
    generation: u64,
    valid: bool,
    items: Vec<WeakNodeRef>,
}

/// <https://dom.spec.whatwg.org/#nodelist>
#[derive(Clone)]
pub struct NodeList(Rc<NodeListData>);

impl PartialEq for NodeList {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl NodeList {
    pub(crate) fn new_child_list(parent: &NodeRef) -> NodeList {
        NodeList(Rc::new(NodeListData {
            kind: NodeListKind::Children(parent.downgrade()),
            cache: RefCell::new(NodeListCache::default()),
        }))
    }

    /// A frozen list over the given nodes (for snapshot results).
    pub fn new_snapshot(items: Vec<NodeRef>) -> NodeList {
        NodeList(Rc::new(NodeListData {
            kind: NodeListKind::Static(items),
            cache: RefCell::new(NodeListCache::default()),
        }))
    }

    /// <https://dom.spec.whatwg.org/#dom-nodelist-length>
    pub fn length(&self) -> u32 {
        match &self.0.kind {
            NodeListKind::Static(items) => items.len() as u32,
            NodeListKind::Children(_) => {
                self.refresh();
                self.0.cache.borrow().items.len() as u32
            },
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-nodelist-item>
    pub fn item(&self, index: u32) -> Option<NodeRef> {
        match &self.0.kind {
            NodeListKind::Static(items) => items.get(index as usize).cloned(),
            NodeListKind::Children(_) => {
                self.refresh();
                self.0
                    .cache
                    .borrow()
                    .items
                    .get(index as usize)
                    .and_then(WeakNodeRef::upgrade)
            },
        }
    }

    pub fn to_vec(&self) -> Vec<NodeRef> {
        match &self.0.kind {
            NodeListKind::Static(items) => items.clone(),
            NodeListKind::Children(_) => {
                self.refresh();
                self.0
                    .cache
                    .borrow()
                    .items
                    .iter()
                    .filter_map(WeakNodeRef::upgrade)
                    .collect()
            },
        }
    }

    fn refresh(&self) {
        let parent = match &self.0.kind {
            NodeListKind::Children(parent) => match parent.upgrade() {
                Some(parent) => parent,
                None => {
                    let mut cache = self.0.cache.borrow_mut();
                    cache.items.clear();
                    cache.valid = true;
                    return;
                },
            },
            NodeListKind::Static(_) => return,
        };
        let generation = parent
            .node_document()
            .as_document()
            .map(|doc| doc.generation())
            .unwrap_or(0);
        let mut cache = self.0.cache.borrow_mut();
        if cache.valid && cache.generation == generation {
            return;
        }
        cache.items = parent.children().map(|child| child.downgrade()).collect();
        cache.generation = generation;
        cache.valid = true;
    }
}
