/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The selector engine: compile (`parser`), match (`matching`), and the
//! query entry points on nodes.

pub(crate) mod bloom;
pub(crate) mod matching;
pub(crate) mod parser;

pub use parser::SelectorList;

use crate::error::{Error, Fallible};
use crate::node::{NodeData, NodeRef};
use crate::selectors::matching::{matches_selector_list, MatchingContext};
use crate::selectors::parser::SimpleSelector;

impl NodeRef {
    fn check_query_scope(&self) -> Fallible<()> {
        match self.data() {
            NodeData::Document(_) |
            NodeData::DocumentFragment(_) |
            NodeData::ShadowRoot(_) |
            NodeData::Element(_) => Ok(()),
            _ => Err(Error::InvalidNodeType),
        }
    }

    fn compile_selectors(&self, selectors: &str) -> Fallible<SelectorList> {
        let document = self.node_document();
        let doc = document.as_document().ok_or(Error::InvalidNodeType)?;
        SelectorList::parse(doc, selectors)
    }

    /// <https://dom.spec.whatwg.org/#dom-parentnode-queryselector>
    pub fn query_selector(&self, selectors: &str) -> Fallible<Option<NodeRef>> {
        self.check_query_scope()?;
        let list = self.compile_selectors(selectors)?;
        let ctx = MatchingContext::new();
        // Fast path: a lone `#id` at document scope reads the id index.
        if self.is_document() {
            if let Some(id) = lone_id(&list) {
                let found = self
                    .node_document()
                    .as_document()
                    .and_then(|doc| doc.get_element_by_id(id.as_str()));
                return Ok(found);
            }
        }
        for node in self.descendants() {
            if node.is_element() && matches_selector_list(&node, &list, &ctx)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    /// <https://dom.spec.whatwg.org/#dom-parentnode-queryselectorall>
    ///
    /// Returns a snapshot, not a live collection.
    pub fn query_selector_all(&self, selectors: &str) -> Fallible<Vec<NodeRef>> {
        self.check_query_scope()?;
        let list = self.compile_selectors(selectors)?;
        let ctx = MatchingContext::new();
        let mut results = Vec::new();
        for node in self.descendants() {
            if node.is_element() && matches_selector_list(&node, &list, &ctx)? {
                results.push(node);
            }
        }
        Ok(results)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-matches>
    pub fn matches(&self, selectors: &str) -> Fallible<bool> {
        if !self.is_element() {
            return Err(Error::InvalidNodeType);
        }
        let list = self.compile_selectors(selectors)?;
        let ctx = MatchingContext::new();
        matches_selector_list(self, &list, &ctx)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-closest>
    pub fn closest(&self, selectors: &str) -> Fallible<Option<NodeRef>> {
        if !self.is_element() {
            return Err(Error::InvalidNodeType);
        }
        let list = self.compile_selectors(selectors)?;
        let ctx = MatchingContext::new();
        for ancestor in self.inclusive_ancestors() {
            if !ancestor.is_element() {
                break;
            }
            if matches_selector_list(&ancestor, &list, &ctx)? {
                return Ok(Some(ancestor));
            }
        }
        Ok(None)
    }
}

/// Detects a selector list that is exactly one `#id` compound.
fn lone_id(list: &SelectorList) -> Option<&crate::atom::Atom> {
    if list.selectors.len() != 1 {
        return None;
    }
    let complex = &list.selectors[0];
    if complex.compounds.len() != 1 || complex.compounds[0].simples.len() != 1 {
        return None;
    }
    match &complex.compounds[0].simples[0] {
        SimpleSelector::Id(id) => Some(id),
        _ => None,
    }
}
