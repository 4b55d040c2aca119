/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! DocumentType nodes.

use crate::node::{NodeData, NodeRef};

/// The data payload of a DocumentType node.
pub struct DocumentType {
    name: String,
    public_id: String,
    system_id: String,
}

impl DocumentType {
    pub(crate) fn new_node(
        document: &NodeRef,
        name: &str,
        public_id: &str,
        system_id: &str,
    ) -> NodeRef {
        NodeRef::new(
            NodeData::DocumentType(DocumentType {
                name: name.to_owned(),
                public_id: public_id.to_owned(),
                system_id: system_id.to_owned(),
            }),
            Some(document),
        )
    }

    /// <https://dom.spec.whatwg.org/#dom-documenttype-name>
    pub fn name(&self) -> &str {
        &self.name
    }

    /// <https://dom.spec.whatwg.org/#dom-documenttype-publicid>
    pub fn public_id(&self) -> &str {
        &self.public_id
    }

    /// <https://dom.spec.whatwg.org/#dom-documenttype-systemid>
    pub fn system_id(&self) -> &str {
        &self.system_id
    }
}
