/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! ShadowRoot nodes.
//!
//! A shadow root is not a child of its host; it hangs off the element's
//! payload and ordinary child traversal never sees it. Event paths and the
//! connectivity walk cross the boundary explicitly.

use std::cell::RefCell;

use crate::node::{NodeData, NodeRef, WeakNodeRef};

/// <https://dom.spec.whatwg.org/#dom-shadowroot-mode>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShadowRootMode {
    Open,
    Closed,
}

/// <https://dom.spec.whatwg.org/#dom-shadowroot-slotassignment>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SlotAssignmentMode {
    Named,
    Manual,
}

/// The data payload of a ShadowRoot node.
pub struct ShadowRoot {
    host: RefCell<Option<WeakNodeRef>>,
    mode: ShadowRootMode,
    delegates_focus: bool,
    slot_assignment: SlotAssignmentMode,
}

impl ShadowRoot {
    pub(crate) fn new_node(
        document: &NodeRef,
        host: &NodeRef,
        mode: ShadowRootMode,
        delegates_focus: bool,
        slot_assignment: SlotAssignmentMode,
    ) -> NodeRef {
        NodeRef::new(
            NodeData::ShadowRoot(ShadowRoot {
                host: RefCell::new(Some(host.downgrade())),
                mode,
                delegates_focus,
                slot_assignment,
            }),
            Some(document),
        )
    }

    /// <https://dom.spec.whatwg.org/#dom-shadowroot-host>
    pub fn host(&self) -> Option<NodeRef> {
        self.host.borrow().as_ref().and_then(WeakNodeRef::upgrade)
    }

    pub fn mode(&self) -> ShadowRootMode {
        self.mode
    }

    /// <https://dom.spec.whatwg.org/#dom-shadowroot-delegatesfocus>
    pub fn delegates_focus(&self) -> bool {
        self.delegates_focus
    }

    /// <https://dom.spec.whatwg.org/#dom-shadowroot-slotassignment>
    pub fn slot_assignment(&self) -> SlotAssignmentMode {
        self.slot_assignment
    }
}
