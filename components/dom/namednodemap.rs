/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! NamedNodeMap: the live view over an element's attribute list.

use std::rc::Rc;

use crate::error::{Error, Fallible};
use crate::node::{NodeRef, WeakNodeRef};

struct NamedNodeMapData {
    element: WeakNodeRef,
}

/// <https://dom.spec.whatwg.org/#namednodemap>
#[derive(Clone)]
pub struct NamedNodeMap(Rc<NamedNodeMapData>);

impl NamedNodeMap {
    pub(crate) fn new(element: &NodeRef) -> NamedNodeMap {
        NamedNodeMap(Rc::new(NamedNodeMapData {
            element: element.downgrade(),
        }))
    }

    fn element(&self) -> Option<NodeRef> {
        self.0.element.upgrade()
    }

    /// <https://dom.spec.whatwg.org/#dom-namednodemap-length>
    pub fn length(&self) -> u32 {
        self.element()
            .and_then(|node| node.as_element().map(|element| element.attr_count() as u32))
            .unwrap_or(0)
    }

    /// <https://dom.spec.whatwg.org/#dom-namednodemap-item>
    pub fn item(&self, index: u32) -> Option<NodeRef> {
        let node = self.element()?;
        let element = node.as_element()?;
        element.attr_at(index as usize)
    }

    /// <https://dom.spec.whatwg.org/#dom-namednodemap-getnameditem>
    pub fn get_named_item(&self, qualified_name: &str) -> Option<NodeRef> {
        self.element()?.get_attribute_node(qualified_name)
    }

    /// <https://dom.spec.whatwg.org/#dom-namednodemap-getnameditemns>
    pub fn get_named_item_ns(
        &self,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<NodeRef> {
        self.element()?.get_attribute_node_ns(namespace, local_name)
    }

    /// <https://dom.spec.whatwg.org/#dom-namednodemap-setnameditem>
    pub fn set_named_item(&self, attr: &NodeRef) -> Fallible<Option<NodeRef>> {
        let element = self.element().ok_or(Error::InvalidState)?;
        element.set_attribute_node(attr)
    }

    /// <https://dom.spec.whatwg.org/#dom-namednodemap-removenameditem>
    pub fn remove_named_item(&self, qualified_name: &str) -> Fallible<NodeRef> {
        let element = self.element().ok_or(Error::InvalidState)?;
        let attr = element
            .get_attribute_node(qualified_name)
            .ok_or(Error::NotFound)?;
        element.remove_attribute_node(&attr)
    }

    /// <https://dom.spec.whatwg.org/#dom-namednodemap-removenameditemns>
    pub fn remove_named_item_ns(
        &self,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Fallible<NodeRef> {
        let element = self.element().ok_or(Error::InvalidState)?;
        let attr = element
            .get_attribute_node_ns(namespace, local_name)
            .ok_or(Error::NotFound)?;
        element.remove_attribute_node(&attr)
    }
}
