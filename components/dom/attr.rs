/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Attr nodes. The element owns its attributes; an attribute knows its
//! element only weakly.

use std::cell::RefCell;

use crate::atom::Atom;
use crate::element::{self, QualName};
use crate::error::ErrorResult;
use crate::node::{NodeData, NodeRef, WeakNodeRef};

/// The data payload of an Attr node.
pub struct Attr {
    name: RefCell<QualName>,
    qualified: RefCell<Atom>,
    value: RefCell<Atom>,
    owner: RefCell<Option<WeakNodeRef>>,
}

impl Attr {
    pub(crate) fn new_node(document: &NodeRef, name: QualName, value: Atom) -> NodeRef {
        let doc = document.as_document().expect("attribute owner document");
        let qualified = element::qualified_atom(doc, name.prefix.as_ref(), &name.local);
        NodeRef::new(
            NodeData::Attr(Attr {
                name: RefCell::new(name),
                qualified: RefCell::new(qualified),
                value: RefCell::new(value),
                owner: RefCell::new(None),
            }),
            Some(document),
        )
    }

    pub fn local_name(&self) -> Atom {
        self.name.borrow().local.clone()
    }

    pub fn namespace(&self) -> Option<Atom> {
        self.name.borrow().namespace.clone()
    }

    pub fn prefix(&self) -> Option<Atom> {
        self.name.borrow().prefix.clone()
    }

    /// <https://dom.spec.whatwg.org/#concept-attribute-qualified-name>
    pub fn qualified_name(&self) -> Atom {
        self.qualified.borrow().clone()
    }

    pub fn value(&self) -> Atom {
        self.value.borrow().clone()
    }

    pub(crate) fn set_value_atom(&self, value: Atom) {
        *self.value.borrow_mut() = value;
    }

    /// <https://dom.spec.whatwg.org/#dom-attr-ownerelement>
    pub fn owner_element(&self) -> Option<NodeRef> {
        self.owner.borrow().as_ref().and_then(WeakNodeRef::upgrade)
    }

    pub(crate) fn set_owner_element(&self, owner: Option<&NodeRef>) {
        *self.owner.borrow_mut() = owner.map(NodeRef::downgrade);
    }

    /// Rehomes every interned piece of this attribute into `pool`.
    pub(crate) fn reintern(&self, pool: &crate::document::Document) {
        let reinterned = {
            let name = self.name.borrow();
            QualName {
                namespace: name.namespace.as_ref().map(|ns| pool.intern(ns.as_str())),
                prefix: name.prefix.as_ref().map(|p| pool.intern(p.as_str())),
                local: pool.intern(name.local.as_str()),
            }
        };
        let qualified = element::qualified_atom(pool, reinterned.prefix.as_ref(), &reinterned.local);
        let value = pool.intern(self.value.borrow().as_str());
        *self.name.borrow_mut() = reinterned;
        *self.qualified.borrow_mut() = qualified;
        *self.value.borrow_mut() = value;
    }
}

/// <https://dom.spec.whatwg.org/#set-an-existing-attribute-value>
pub(crate) fn set_attr_value(attr_node: &NodeRef, value: &str) -> ErrorResult {
    let attr = attr_node.as_attr().expect("attr node");
    match attr.owner_element() {
        Some(element) => element::change_attribute(&element, attr_node, value),
        None => {
            let document = attr_node.node_document();
            let doc = document.as_document().expect("document payload");
            attr.set_value_atom(doc.intern(value));
            Ok(())
        },
    }
}
