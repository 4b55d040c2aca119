/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! DocumentFragment nodes.

use std::cell::RefCell;

use crate::node::{NodeRef, WeakNodeRef};

/// The data payload of a DocumentFragment node.
pub struct DocumentFragment {
    /// Non-null only for template-content-style fragments created by a
    /// binding layer; participates in the host-including ancestor check.
    host: RefCell<Option<WeakNodeRef>>,
}

impl DocumentFragment {
    pub(crate) fn new() -> DocumentFragment {
        DocumentFragment {
            host: RefCell::new(None),
        }
    }

    /// <https://dom.spec.whatwg.org/#concept-documentfragment-host>
    pub fn host(&self) -> Option<NodeRef> {
        self.host.borrow().as_ref().and_then(WeakNodeRef::upgrade)
    }

    pub fn set_host(&self, host: Option<&NodeRef>) {
        *self.host.borrow_mut() = host.map(NodeRef::downgrade);
    }
}
