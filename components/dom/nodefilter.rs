/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! NodeFilter: the whatToShow mask and the filter callback shared by
//! NodeIterator and TreeWalker.

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::error::{Error, Fallible};
use crate::node::NodeRef;

bitflags! {
    /// <https://dom.spec.whatwg.org/#dom-nodefilter-show_all>
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct WhatToShow: u32 {
        const SHOW_ELEMENT = 0x1;
        const SHOW_ATTRIBUTE = 0x2;
        const SHOW_TEXT = 0x4;
        const SHOW_CDATA_SECTION = 0x8;
        const SHOW_PROCESSING_INSTRUCTION = 0x40;
        const SHOW_COMMENT = 0x80;
        const SHOW_DOCUMENT = 0x100;
        const SHOW_DOCUMENT_TYPE = 0x200;
        const SHOW_DOCUMENT_FRAGMENT = 0x400;
        const SHOW_ALL = 0xFFFF_FFFF;
    }
}

/// <https://dom.spec.whatwg.org/#dom-nodefilter-filter_accept>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterResult {
    Accept = 1,
    Reject = 2,
    Skip = 3,
}

/// The filter trampoline. Hosts adapt their callbacks into one of these.
pub type NodeFilter = Rc<dyn Fn(&NodeRef) -> FilterResult>;

/// <https://dom.spec.whatwg.org/#concept-node-filter>
pub(crate) fn filter_node(
    node: &NodeRef,
    what_to_show: WhatToShow,
    filter: &Option<NodeFilter>,
    active: &Cell<bool>,
) -> Fallible<FilterResult> {
    // Step 1. A filter that traverses its own walker is an error.
    if active.get() {
        return Err(Error::InvalidState);
    }
    // Steps 2-3.
    let mask = 1u32 << (node.node_type() - 1);
    if what_to_show.bits() & mask == 0 {
        return Ok(FilterResult::Skip);
    }
    // Step 4.
    let filter = match filter {
        Some(filter) => filter.clone(),
        None => return Ok(FilterResult::Accept),
    };
    // Steps 5-7.
    active.set(true);
    let result = filter(node);
    active.set(false);
    Ok(result)
}
