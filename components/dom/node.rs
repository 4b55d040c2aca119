/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The node kernel: the tree links every node carries, the typed payloads
//! hanging off them, and the mutation funnel every tree-altering operation
//! goes through.
//!
//! Ownership follows the usual refcounted-DOM shape: a parent owns its first
//! child, each child owns its next sibling, and everything else (parent,
//! previous sibling, last child, owner document) is a weak edge. Dropping the
//! last handle to a detached subtree frees the whole thing without touching
//! a cycle collector.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use log::debug;
use smallvec::SmallVec;

use crate::atom::Atom;
use crate::attr::Attr;
use crate::characterdata::{CharacterData, ProcessingInstruction};
use crate::customelementregistry::{self, CeReactionsScope, CustomElementReaction};
use crate::document::Document;
use crate::documentfragment::DocumentFragment;
use crate::documenttype::DocumentType;
use crate::element::Element;
use crate::error::{Error, ErrorResult, Fallible};
use crate::eventtarget::EventListener;
use crate::mutationobserver::{self, RegisteredObserver};
use crate::nodeiterator;
use crate::nodelist::NodeList;
use crate::range;
use crate::shadowroot::ShadowRoot;

/// <https://dom.spec.whatwg.org/#dom-node-element_node>
pub const ELEMENT_NODE: u16 = 1;
pub const ATTRIBUTE_NODE: u16 = 2;
pub const TEXT_NODE: u16 = 3;
pub const CDATA_SECTION_NODE: u16 = 4;
pub const PROCESSING_INSTRUCTION_NODE: u16 = 7;
pub const COMMENT_NODE: u16 = 8;
pub const DOCUMENT_NODE: u16 = 9;
pub const DOCUMENT_TYPE_NODE: u16 = 10;
pub const DOCUMENT_FRAGMENT_NODE: u16 = 11;

bitflags! {
    /// Flags for [`Node`] packed into one word.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct NodeFlags: u16 {
        /// Whether this node's root is a Document. Maintained by the
        /// mutation funnel, never recomputed on read.
        const IS_CONNECTED = 1 << 0;
        /// Whether this node has ever had event listeners attached.
        const HAS_EVENT_LISTENERS = 1 << 1;
        /// Whether mutation observers are registered on this node.
        const HAS_MUTATION_OBSERVERS = 1 << 2;
        /// Whether this element is a custom element (state is `custom`).
        const IS_CUSTOM = 1 << 3;
        /// Whether this node lives inside a shadow tree.
        const IS_IN_SHADOW_TREE = 1 << 4;
    }
}

bitflags! {
    /// <https://dom.spec.whatwg.org/#dom-node-document_position_disconnected>
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct DocumentPosition: u16 {
        const DISCONNECTED = 0x01;
        const PRECEDING = 0x02;
        const FOLLOWING = 0x04;
        const CONTAINS = 0x08;
        const CONTAINED_BY = 0x10;
        const IMPLEMENTATION_SPECIFIC = 0x20;
    }
}

/// Whether to queue mutation records for an operation. The funnel runs with
/// `Suppressed` when a caller is about to queue one batched record itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SuppressObserver {
    Suppressed,
    Unsuppressed,
}

/// The type-specific payload of a node.
pub enum NodeData {
    Document(Document),
    DocumentType(DocumentType),
    DocumentFragment(DocumentFragment),
    ShadowRoot(ShadowRoot),
    Element(Element),
    Attr(Attr),
    Text(CharacterData),
    CdataSection(CharacterData),
    Comment(CharacterData),
    ProcessingInstruction(ProcessingInstruction),
}

/// State most nodes never have, boxed off to the side so the common node
/// pays one pointer for it.
#[derive(Default)]
pub(crate) struct NodeRareData {
    /// The `[SameObject]` childNodes list.
    pub child_nodes: Option<NodeList>,
    /// Event listeners, in insertion order. Shared with in-flight dispatch
    /// snapshots, which observe removal through the listener's flag.
    pub listeners: Vec<Rc<EventListener>>,
    /// Mutation observer registrations targeting this node.
    pub registered_observers: Vec<RegisteredObserver>,
}

/// A DOM node. Public access goes through [`NodeRef`].
pub struct Node {
    flags: Cell<NodeFlags>,
    parent: RefCell<Option<WeakNodeRef>>,
    previous_sibling: RefCell<Option<WeakNodeRef>>,
    next_sibling: RefCell<Option<NodeRef>>,
    first_child: RefCell<Option<NodeRef>>,
    last_child: RefCell<Option<WeakNodeRef>>,
    /// Back-pointer to the owning document; `None` only on Document nodes.
    owner_document: RefCell<Option<WeakNodeRef>>,
    rare_data: RefCell<Option<Box<NodeRareData>>>,
    data: NodeData,
}

/// A strong handle to a [`Node`].
pub struct NodeRef(pub(crate) Rc<Node>);

/// A weak handle to a [`Node`].
pub struct WeakNodeRef(pub(crate) Weak<Node>);

impl Clone for NodeRef {
    fn clone(&self) -> Self {
        NodeRef(Rc::clone(&self.0))
    }
}

impl Clone for WeakNodeRef {
    fn clone(&self) -> Self {
        WeakNodeRef(Weak::clone(&self.0))
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl Deref for NodeRef {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.0
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{:p}", self.node_name(), Rc::as_ptr(&self.0))
    }
}

impl WeakNodeRef {
    pub fn upgrade(&self) -> Option<NodeRef> {
        self.0.upgrade().map(NodeRef)
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if let Some(doc) = self
            .owner_document
            .borrow()
            .as_ref()
            .and_then(WeakNodeRef::upgrade)
        {
            if let Some(document) = doc.as_document() {
                document.note_node_destroyed();
            }
        }
        // Detach the strong edges iteratively so dropping a deep or wide
        // subtree cannot overflow the stack.
        let mut pending: Vec<NodeRef> = Vec::new();
        if let Some(child) = self.first_child.borrow_mut().take() {
            pending.push(child);
        }
        if let Some(next) = self.next_sibling.borrow_mut().take() {
            pending.push(next);
        }
        while let Some(node) = pending.pop() {
            if Rc::strong_count(&node.0) == 1 {
                if let Some(child) = node.first_child.borrow_mut().take() {
                    pending.push(child);
                }
                if let Some(next) = node.next_sibling.borrow_mut().take() {
                    pending.push(next);
                }
            }
        }
    }
}

impl Node {
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags.get()
    }

    pub(crate) fn set_flag(&self, flag: NodeFlags, value: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, value);
        self.flags.set(flags);
    }

    pub fn is_connected(&self) -> bool {
        self.flags.get().contains(NodeFlags::IS_CONNECTED)
    }

    pub(crate) fn is_in_shadow_tree(&self) -> bool {
        self.flags.get().contains(NodeFlags::IS_IN_SHADOW_TREE)
    }

    /// <https://dom.spec.whatwg.org/#dom-node-nodetype>
    pub fn node_type(&self) -> u16 {
        match self.data {
            NodeData::Element(_) => ELEMENT_NODE,
            NodeData::Attr(_) => ATTRIBUTE_NODE,
            NodeData::Text(_) => TEXT_NODE,
            NodeData::CdataSection(_) => CDATA_SECTION_NODE,
            NodeData::ProcessingInstruction(_) => PROCESSING_INSTRUCTION_NODE,
            NodeData::Comment(_) => COMMENT_NODE,
            NodeData::Document(_) => DOCUMENT_NODE,
            NodeData::DocumentType(_) => DOCUMENT_TYPE_NODE,
            NodeData::DocumentFragment(_) | NodeData::ShadowRoot(_) => DOCUMENT_FRAGMENT_NODE,
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-nodename>
    pub fn node_name(&self) -> String {
        match &self.data {
            NodeData::Element(element) => element.qualified_name().as_str().to_owned(),
            NodeData::Attr(attr) => attr.qualified_name().as_str().to_owned(),
            NodeData::Text(_) => "#text".to_owned(),
            NodeData::CdataSection(_) => "#cdata-section".to_owned(),
            NodeData::ProcessingInstruction(pi) => pi.target().as_str().to_owned(),
            NodeData::Comment(_) => "#comment".to_owned(),
            NodeData::Document(_) => "#document".to_owned(),
            NodeData::DocumentType(doctype) => doctype.name().to_owned(),
            NodeData::DocumentFragment(_) | NodeData::ShadowRoot(_) => {
                "#document-fragment".to_owned()
            },
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match &self.data {
            NodeData::Document(document) => Some(document),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_attr(&self) -> Option<&Attr> {
        match &self.data {
            NodeData::Attr(attr) => Some(attr),
            _ => None,
        }
    }

    pub fn as_doctype(&self) -> Option<&DocumentType> {
        match &self.data {
            NodeData::DocumentType(doctype) => Some(doctype),
            _ => None,
        }
    }

    pub fn as_fragment(&self) -> Option<&DocumentFragment> {
        match &self.data {
            NodeData::DocumentFragment(fragment) => Some(fragment),
            _ => None,
        }
    }

    pub fn as_shadow_root(&self) -> Option<&ShadowRoot> {
        match &self.data {
            NodeData::ShadowRoot(shadow) => Some(shadow),
            _ => None,
        }
    }

    /// Text, CDATASection, Comment and ProcessingInstruction all expose the
    /// CharacterData surface.
    pub fn as_character_data(&self) -> Option<&CharacterData> {
        match &self.data {
            NodeData::Text(cdata) | NodeData::CdataSection(cdata) | NodeData::Comment(cdata) => {
                Some(cdata)
            },
            NodeData::ProcessingInstruction(pi) => Some(pi.character_data()),
            _ => None,
        }
    }

    pub fn as_processing_instruction(&self) -> Option<&ProcessingInstruction> {
        match &self.data {
            NodeData::ProcessingInstruction(pi) => Some(pi),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self.data, NodeData::Document(_))
    }

    pub fn is_doctype(&self) -> bool {
        matches!(self.data, NodeData::DocumentType(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub fn is_shadow_root(&self) -> bool {
        matches!(self.data, NodeData::ShadowRoot(_))
    }

    pub fn parent_node(&self) -> Option<NodeRef> {
        self.parent.borrow().as_ref().and_then(WeakNodeRef::upgrade)
    }

    /// <https://dom.spec.whatwg.org/#parent-element>
    pub fn parent_element(&self) -> Option<NodeRef> {
        self.parent_node().filter(|parent| parent.is_element())
    }

    pub fn first_child(&self) -> Option<NodeRef> {
        self.first_child.borrow().clone()
    }

    pub fn last_child(&self) -> Option<NodeRef> {
        self.last_child
            .borrow()
            .as_ref()
            .and_then(WeakNodeRef::upgrade)
    }

    pub fn previous_sibling(&self) -> Option<NodeRef> {
        self.previous_sibling
            .borrow()
            .as_ref()
            .and_then(WeakNodeRef::upgrade)
    }

    pub fn next_sibling(&self) -> Option<NodeRef> {
        self.next_sibling.borrow().clone()
    }

    pub fn has_child_nodes(&self) -> bool {
        self.first_child.borrow().is_some()
    }

    pub(crate) fn rare_data(&self) -> Option<Ref<Box<NodeRareData>>> {
        let borrowed = self.rare_data.borrow();
        if borrowed.is_none() {
            return None;
        }
        Some(Ref::map(borrowed, |data| {
            data.as_ref().expect("checked above")
        }))
    }

    pub(crate) fn rare_data_mut(&self) -> RefMut<Box<NodeRareData>> {
        RefMut::map(self.rare_data.borrow_mut(), |data| {
            data.get_or_insert_with(Box::default)
        })
    }
}

impl NodeRef {
    pub(crate) fn new(data: NodeData, owner: Option<&NodeRef>) -> NodeRef {
        let node = NodeRef(Rc::new(Node {
            flags: Cell::new(NodeFlags::empty()),
            parent: RefCell::new(None),
            previous_sibling: RefCell::new(None),
            next_sibling: RefCell::new(None),
            first_child: RefCell::new(None),
            last_child: RefCell::new(None),
            owner_document: RefCell::new(owner.map(NodeRef::downgrade)),
            rare_data: RefCell::new(None),
            data,
        }));
        if let Some(owner) = owner {
            if let Some(document) = owner.as_document() {
                document.note_node_created();
            }
        }
        node
    }

    pub fn downgrade(&self) -> WeakNodeRef {
        WeakNodeRef(Rc::downgrade(&self.0))
    }

    /// Unwraps the handle; used by FFI layers that manage raw refcounts.
    pub fn into_rc(self) -> Rc<Node> {
        self.0
    }

    /// Rewraps an `Rc` produced by [`NodeRef::into_rc`].
    pub fn from_rc(rc: Rc<Node>) -> NodeRef {
        NodeRef(rc)
    }

    /// <https://dom.spec.whatwg.org/#concept-node-document>
    ///
    /// Every node has a node document for its whole lifetime; a node that has
    /// outlived its document indicates a host bug, and we treat it as fatal.
    pub fn node_document(&self) -> NodeRef {
        if self.is_document() {
            return self.clone();
        }
        self.owner_document
            .borrow()
            .as_ref()
            .and_then(WeakNodeRef::upgrade)
            .expect("node outlived its owner document")
    }

    /// `ownerDocument` as WebIDL exposes it: null on Document nodes.
    pub fn owner_document(&self) -> Option<NodeRef> {
        if self.is_document() {
            None
        } else {
            Some(self.node_document())
        }
    }

    pub(crate) fn set_owner_document(&self, document: &NodeRef) {
        *self.owner_document.borrow_mut() = Some(document.downgrade());
    }

    /// Zero-based position among the parent's children.
    /// <https://dom.spec.whatwg.org/#concept-tree-index>
    pub fn index(&self) -> u32 {
        let mut index = 0;
        let mut current = self.previous_sibling();
        while let Some(node) = current {
            index += 1;
            current = node.previous_sibling();
        }
        index
    }

    pub fn children(&self) -> Children {
        Children {
            next: self.first_child(),
        }
    }

    pub fn child_count(&self) -> u32 {
        self.children().count() as u32
    }

    pub fn child_at(&self, index: u32) -> Option<NodeRef> {
        self.children().nth(index as usize)
    }

    /// Pre-order traversal of this node's subtree, including this node.
    /// Does not descend into shadow trees.
    pub fn traverse_preorder(&self) -> TreeIterator {
        TreeIterator {
            current: Some(self.clone()),
            root: self.clone(),
        }
    }

    /// All descendants of this node, in tree order.
    pub fn descendants(&self) -> impl Iterator<Item = NodeRef> {
        self.traverse_preorder().skip(1)
    }

    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            current: self.parent_node(),
        }
    }

    pub fn inclusive_ancestors(&self) -> Ancestors {
        Ancestors {
            current: Some(self.clone()),
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-contains>
    pub fn contains(&self, other: &NodeRef) -> bool {
        other.inclusive_ancestors().any(|ancestor| &ancestor == self)
    }

    /// <https://dom.spec.whatwg.org/#concept-tree-root>
    pub fn root(&self) -> NodeRef {
        let mut current = self.clone();
        while let Some(parent) = current.parent_node() {
            current = parent;
        }
        current
    }

    /// <https://dom.spec.whatwg.org/#dom-node-getrootnode>
    pub fn get_root_node(&self, composed: bool) -> NodeRef {
        let mut root = self.root();
        if composed {
            while let Some(host) = root.as_shadow_root().and_then(ShadowRoot::host) {
                root = host.root();
            }
        }
        root
    }

    /// The root, crossing shadow boundaries unconditionally.
    /// <https://dom.spec.whatwg.org/#concept-shadow-including-root>
    pub(crate) fn shadow_including_root(&self) -> NodeRef {
        self.get_root_node(true)
    }

    /// Walks the subtree including any shadow trees hanging off its elements.
    pub(crate) fn for_each_shadow_including_inclusive_descendant(
        &self,
        f: &mut impl FnMut(&NodeRef),
    ) {
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            f(&node);
            if let Some(shadow) = node.as_element().and_then(Element::shadow_root) {
                stack.push(shadow);
            }
            let mut child = node.last_child();
            while let Some(current) = child {
                child = current.previous_sibling();
                stack.push(current);
            }
        }
    }

    /// <https://dom.spec.whatwg.org/#concept-tree-host-including-inclusive-ancestor>
    pub(crate) fn is_host_including_inclusive_ancestor_of(&self, node: &NodeRef) -> bool {
        if self.contains(node) {
            return true;
        }
        let root = node.root();
        let host = match &root.data {
            NodeData::ShadowRoot(shadow) => shadow.host(),
            NodeData::DocumentFragment(fragment) => fragment.host(),
            _ => None,
        };
        match host {
            Some(host) => self.is_host_including_inclusive_ancestor_of(&host),
            None => false,
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-comparedocumentposition>
    pub fn compare_document_position(&self, other: &NodeRef) -> DocumentPosition {
        // Step 1.
        if self == other {
            return DocumentPosition::empty();
        }

        // Steps 2-4: attribute nodes compare through their owner elements.
        let mut node1 = other.clone();
        let mut node2 = self.clone();
        let attr1 = node1.as_attr().map(|_| node1.clone());
        let attr2 = node2.as_attr().map(|_| node2.clone());
        if let Some(attr) = &attr1 {
            if let Some(owner) = attr.as_attr().and_then(Attr::owner_element) {
                node1 = owner;
            }
        }
        if let Some(attr) = &attr2 {
            if let Some(owner) = attr.as_attr().and_then(Attr::owner_element) {
                node2 = owner;
                if let (Some(a1), true) = (&attr1, node1 == node2) {
                    // Both are attributes of the same element: order by
                    // position in the attribute list.
                    if let Some(element) = node2.as_element() {
                        for attr in element.attrs() {
                            if &attr == a1 {
                                return DocumentPosition::IMPLEMENTATION_SPECIFIC |
                                    DocumentPosition::PRECEDING;
                            }
                            if attr == *self {
                                return DocumentPosition::IMPLEMENTATION_SPECIFIC |
                                    DocumentPosition::FOLLOWING;
                            }
                        }
                    }
                }
            }
        }

        // Step 5: disconnected trees get a consistent, arbitrary order.
        let root1 = node1.root();
        let root2 = node2.root();
        if root1 != root2 {
            let order = if (Rc::as_ptr(&node1.0) as usize) < (Rc::as_ptr(&node2.0) as usize) {
                DocumentPosition::PRECEDING
            } else {
                DocumentPosition::FOLLOWING
            };
            return DocumentPosition::DISCONNECTED |
                DocumentPosition::IMPLEMENTATION_SPECIFIC |
                order;
        }

        // Step 6.
        if node1.contains(&node2) && attr1.is_none() {
            return DocumentPosition::CONTAINS | DocumentPosition::PRECEDING;
        }
        // Step 7.
        if node2.contains(&node1) && attr2.is_none() {
            return DocumentPosition::CONTAINED_BY | DocumentPosition::FOLLOWING;
        }

        // Step 8: first in tree order precedes.
        for node in root1.traverse_preorder() {
            if node == node1 {
                return DocumentPosition::PRECEDING;
            }
            if node == node2 {
                return DocumentPosition::FOLLOWING;
            }
        }
        DocumentPosition::FOLLOWING
    }

    /// <https://dom.spec.whatwg.org/#dom-node-textcontent>
    pub fn text_content(&self) -> Option<String> {
        match &self.data {
            NodeData::Element(_) | NodeData::DocumentFragment(_) | NodeData::ShadowRoot(_) => {
                let mut content = String::new();
                for node in self.traverse_preorder() {
                    match &node.data {
                        NodeData::Text(cdata) | NodeData::CdataSection(cdata) => {
                            content.push_str(&cdata.data());
                        },
                        _ => {},
                    }
                }
                Some(content)
            },
            NodeData::Attr(attr) => Some(attr.value().as_str().to_owned()),
            NodeData::Text(cdata) |
            NodeData::CdataSection(cdata) |
            NodeData::Comment(cdata) => Some(cdata.data()),
            NodeData::ProcessingInstruction(pi) => Some(pi.character_data().data()),
            NodeData::Document(_) | NodeData::DocumentType(_) => None,
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-textcontent>
    pub fn set_text_content(&self, value: &str) -> ErrorResult {
        let _scope = CeReactionsScope::enter(&self.node_document());
        match &self.data {
            NodeData::Element(_) | NodeData::DocumentFragment(_) | NodeData::ShadowRoot(_) => {
                let node = if value.is_empty() {
                    None
                } else {
                    Some(self.node_document().create_text_node(value)?)
                };
                self.replace_all(node);
                Ok(())
            },
            NodeData::Attr(_) => crate::attr::set_attr_value(self, value),
            NodeData::Text(_) |
            NodeData::CdataSection(_) |
            NodeData::Comment(_) |
            NodeData::ProcessingInstruction(_) => {
                let length = self.as_character_data().expect("character data").length();
                crate::characterdata::replace_data(self, 0, length, value)
            },
            NodeData::Document(_) | NodeData::DocumentType(_) => Ok(()),
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-nodevalue>
    pub fn node_value(&self) -> Option<String> {
        match &self.data {
            NodeData::Attr(attr) => Some(attr.value().as_str().to_owned()),
            NodeData::Text(cdata) |
            NodeData::CdataSection(cdata) |
            NodeData::Comment(cdata) => Some(cdata.data()),
            NodeData::ProcessingInstruction(pi) => Some(pi.character_data().data()),
            _ => None,
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-nodevalue>
    pub fn set_node_value(&self, value: &str) -> ErrorResult {
        match &self.data {
            NodeData::Attr(_) => crate::attr::set_attr_value(self, value),
            NodeData::Text(_) |
            NodeData::CdataSection(_) |
            NodeData::Comment(_) |
            NodeData::ProcessingInstruction(_) => {
                let length = self.as_character_data().expect("character data").length();
                crate::characterdata::replace_data(self, 0, length, value)
            },
            _ => Ok(()),
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-length>
    pub fn length(&self) -> u32 {
        match &self.data {
            NodeData::DocumentType(_) | NodeData::Attr(_) => 0,
            _ => match self.as_character_data() {
                Some(cdata) => cdata.length(),
                None => self.child_count(),
            },
        }
    }

    /// The `[SameObject]` childNodes list.
    /// <https://dom.spec.whatwg.org/#dom-node-childnodes>
    pub fn child_nodes(&self) -> NodeList {
        if let Some(rare) = self.rare_data() {
            if let Some(list) = &rare.child_nodes {
                return list.clone();
            }
        }
        let list = NodeList::new_child_list(self);
        self.rare_data_mut().child_nodes = Some(list.clone());
        list
    }

    /// <https://dom.spec.whatwg.org/#locate-a-namespace-prefix>
    pub fn lookup_prefix(&self, namespace: &str) -> Option<String> {
        if namespace.is_empty() {
            return None;
        }
        let element = match &self.data {
            NodeData::Element(_) => Some(self.clone()),
            NodeData::Document(_) => self.document_element(),
            NodeData::Attr(attr) => attr.owner_element(),
            _ => self.parent_element(),
        }?;
        element
            .inclusive_ancestors()
            .filter_map(|ancestor| {
                let el = ancestor.as_element()?;
                if el.namespace().map(|ns| ns == *namespace).unwrap_or(false) {
                    el.prefix().map(|prefix| prefix.as_str().to_owned())
                } else {
                    None
                }
            })
            .next()
    }

    /// <https://dom.spec.whatwg.org/#locate-a-namespace>
    pub fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        let element = match &self.data {
            NodeData::Element(_) => Some(self.clone()),
            NodeData::Document(_) => self.document_element(),
            NodeData::Attr(attr) => attr.owner_element(),
            _ => self.parent_element(),
        }?;
        for ancestor in element.inclusive_ancestors() {
            let ns = match ancestor.as_element() {
                Some(el) if el.prefix().as_ref().map(Atom::as_str) == prefix => el.namespace(),
                Some(_) => continue,
                None => break,
            };
            if let Some(ns) = ns {
                return Some(ns.as_str().to_owned());
            }
        }
        None
    }

    /// <https://dom.spec.whatwg.org/#dom-node-isdefaultnamespace>
    pub fn is_default_namespace(&self, namespace: &str) -> bool {
        let default = self.lookup_namespace_uri(None);
        match default {
            Some(ns) => ns == namespace,
            None => namespace.is_empty(),
        }
    }

    /// The document element, if this is a document.
    pub fn document_element(&self) -> Option<NodeRef> {
        self.children().find(|child| child.is_element())
    }
}

/// Iterator over a node's children.
pub struct Children {
    next: Option<NodeRef>,
}

impl Iterator for Children {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let node = self.next.take()?;
        self.next = node.next_sibling();
        Some(node)
    }
}

/// Pre-order subtree iterator.
pub struct TreeIterator {
    current: Option<NodeRef>,
    root: NodeRef,
}

impl Iterator for TreeIterator {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let current = self.current.take()?;
        self.current = following_node_within(&current, &self.root);
        Some(current)
    }
}

/// The next node after `node` in tree order, bounded by `root`.
pub(crate) fn following_node_within(node: &NodeRef, root: &NodeRef) -> Option<NodeRef> {
    if let Some(child) = node.first_child() {
        return Some(child);
    }
    let mut current = node.clone();
    loop {
        if &current == root {
            return None;
        }
        if let Some(sibling) = current.next_sibling() {
            return Some(sibling);
        }
        current = current.parent_node()?;
    }
}

/// The node before `node` in tree order, bounded by `root`.
pub(crate) fn preceding_node_within(node: &NodeRef, root: &NodeRef) -> Option<NodeRef> {
    if node == root {
        return None;
    }
    match node.previous_sibling() {
        Some(mut current) => {
            while let Some(child) = current.last_child() {
                current = child;
            }
            Some(current)
        },
        None => node.parent_node(),
    }
}

/// Iterator over ancestors.
pub struct Ancestors {
    current: Option<NodeRef>,
}

impl Iterator for Ancestors {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        let node = self.current.take()?;
        self.current = node.parent_node();
        Some(node)
    }
}

// ---------------------------------------------------------------------------
// The mutation funnel.
// ---------------------------------------------------------------------------

impl NodeRef {
    /// <https://dom.spec.whatwg.org/#concept-node-ensure-pre-insertion-validity>
    pub fn ensure_pre_insert_validity(
        &self,
        node: &NodeRef,
        child: Option<&NodeRef>,
    ) -> ErrorResult {
        // Step 1. Parent must be a Document, DocumentFragment or Element.
        match self.data {
            NodeData::Document(_) |
            NodeData::DocumentFragment(_) |
            NodeData::ShadowRoot(_) |
            NodeData::Element(_) => {},
            _ => return Err(Error::HierarchyRequest),
        }
        // Step 2. No cycles, including through fragment/shadow hosts.
        if node.is_host_including_inclusive_ancestor_of(self) {
            return Err(Error::HierarchyRequest);
        }
        // Step 3. The reference child must actually be ours.
        if let Some(child) = child {
            if child.parent_node().as_ref() != Some(self) {
                return Err(Error::NotFound);
            }
        }
        // Step 4. Only fragments, doctypes, elements and character data can
        // be inserted. Documents, attributes and shadow roots cannot.
        match node.data {
            NodeData::DocumentFragment(_) |
            NodeData::DocumentType(_) |
            NodeData::Element(_) |
            NodeData::Text(_) |
            NodeData::CdataSection(_) |
            NodeData::Comment(_) |
            NodeData::ProcessingInstruction(_) => {},
            NodeData::Document(_) | NodeData::Attr(_) | NodeData::ShadowRoot(_) => {
                return Err(Error::HierarchyRequest);
            },
        }
        // Step 5.
        if (node.is_text() && self.is_document()) || (node.is_doctype() && !self.is_document()) {
            return Err(Error::HierarchyRequest);
        }
        // Step 6. Document structure constraints.
        if self.is_document() {
            self.ensure_document_structure(node, child, None)?;
        }
        Ok(())
    }

    /// The document-parent cases of pre-insert validity, shared with
    /// `replace` (which excludes the child being replaced from the counts).
    fn ensure_document_structure(
        &self,
        node: &NodeRef,
        child: Option<&NodeRef>,
        ignore: Option<&NodeRef>,
    ) -> ErrorResult {
        let element_child_count = |skip: Option<&NodeRef>| {
            self.children()
                .filter(|c| c.is_element() && Some(c) != skip)
                .count()
        };
        let has_doctype_after = |reference: &NodeRef| {
            let mut seen = false;
            for c in self.children() {
                if &c == reference {
                    seen = true;
                } else if seen && c.is_doctype() {
                    return true;
                }
            }
            false
        };
        let has_element_before = |reference: &NodeRef| {
            for c in self.children() {
                if &c == reference {
                    return false;
                }
                if c.is_element() && Some(&c) != ignore {
                    return true;
                }
            }
            false
        };
        match &node.data {
            NodeData::DocumentFragment(_) => {
                let element_children = node.children().filter(|c| c.is_element()).count();
                if element_children > 1 || node.children().any(|c| c.is_text()) {
                    return Err(Error::HierarchyRequest);
                }
                if element_children == 1 {
                    if element_child_count(ignore) > 0 {
                        return Err(Error::HierarchyRequest);
                    }
                    if let Some(child) = child {
                        if child.is_doctype() || has_doctype_after(child) {
                            return Err(Error::HierarchyRequest);
                        }
                    }
                }
            },
            NodeData::Element(_) => {
                if element_child_count(ignore) > 0 {
                    return Err(Error::HierarchyRequest);
                }
                if let Some(child) = child {
                    if child.is_doctype() || has_doctype_after(child) {
                        return Err(Error::HierarchyRequest);
                    }
                }
            },
            NodeData::DocumentType(_) => {
                if self
                    .children()
                    .any(|c| c.is_doctype() && Some(&c) != ignore)
                {
                    return Err(Error::HierarchyRequest);
                }
                match child {
                    Some(child) => {
                        if has_element_before(child) {
                            return Err(Error::HierarchyRequest);
                        }
                    },
                    None => {
                        if element_child_count(ignore) > 0 {
                            return Err(Error::HierarchyRequest);
                        }
                    },
                }
            },
            _ => {},
        }
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#concept-node-pre-insert>
    pub fn pre_insert(&self, node: &NodeRef, child: Option<&NodeRef>) -> Fallible<NodeRef> {
        // Step 1.
        self.ensure_pre_insert_validity(node, child)?;
        // Steps 2-3. If the reference child is the inserted node itself, the
        // insertion point slides to its next sibling.
        let reference = match child {
            Some(child) if child == node => node.next_sibling(),
            Some(child) => Some(child.clone()),
            None => None,
        };
        // Step 4.
        self.insert(node, reference.as_ref(), SuppressObserver::Unsuppressed);
        Ok(node.clone())
    }

    /// <https://dom.spec.whatwg.org/#concept-node-insert>
    pub(crate) fn insert(
        &self,
        node: &NodeRef,
        child: Option<&NodeRef>,
        suppress: SuppressObserver,
    ) {
        // Step 1. A fragment donates its children; it is emptied as part of
        // the insertion.
        let nodes: SmallVec<[NodeRef; 8]> = match node.data {
            NodeData::DocumentFragment(_) | NodeData::ShadowRoot(_) => node.children().collect(),
            _ => {
                let mut single = SmallVec::new();
                single.push(node.clone());
                single
            },
        };
        // Step 2.
        let count = nodes.len() as u32;
        if count == 0 {
            return;
        }
        let document = self.node_document();
        // Step 3. Empty the fragment and queue one removal record on it.
        if matches!(node.data, NodeData::DocumentFragment(_) | NodeData::ShadowRoot(_)) {
            for inner in &nodes {
                remove_node(inner, SuppressObserver::Suppressed);
            }
            if suppress == SuppressObserver::Unsuppressed {
                mutationobserver::queue_tree_mutation_record(node, &[], &nodes, None, None);
            }
        }
        // Step 4. Live range boundaries after the insertion point shift.
        if let Some(child) = child {
            if let Some(doc) = document.as_document() {
                range::adjust_for_insert(doc, self, child.index(), count);
            }
        }
        // Step 5. Capture the record's previousSibling before linking.
        let previous_sibling = match child {
            Some(child) => child.previous_sibling(),
            None => self.last_child(),
        };
        // Step 6. Adopt and link each node, in order.
        let parent_connected = self.is_connected();
        let parent_in_shadow =
            self.is_in_shadow_tree() || matches!(self.data, NodeData::ShadowRoot(_));
        for inner in nodes.iter() {
            document.adopt(inner);
            link_before(self, inner, child);
            note_subtree_inserted(inner, parent_connected, parent_in_shadow);
        }
        // Step 7. One childList record covering the whole set.
        if suppress == SuppressObserver::Unsuppressed {
            mutationobserver::queue_tree_mutation_record(
                self,
                &nodes,
                &[],
                previous_sibling,
                child.cloned(),
            );
        }
        // Step 8. Invalidate live collections.
        if let Some(doc) = document.as_document() {
            doc.note_mutation();
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-appendchild>
    pub fn append_child(&self, node: &NodeRef) -> Fallible<NodeRef> {
        let _scope = CeReactionsScope::enter(&self.node_document());
        self.pre_insert(node, None)
    }

    /// <https://dom.spec.whatwg.org/#dom-node-insertbefore>
    pub fn insert_before(&self, node: &NodeRef, child: Option<&NodeRef>) -> Fallible<NodeRef> {
        let _scope = CeReactionsScope::enter(&self.node_document());
        self.pre_insert(node, child)
    }

    /// <https://dom.spec.whatwg.org/#dom-node-removechild>
    pub fn remove_child(&self, child: &NodeRef) -> Fallible<NodeRef> {
        if child.parent_node().as_ref() != Some(self) {
            return Err(Error::NotFound);
        }
        let _scope = CeReactionsScope::enter(&self.node_document());
        remove_node(child, SuppressObserver::Unsuppressed);
        Ok(child.clone())
    }

    /// <https://dom.spec.whatwg.org/#dom-childnode-remove>
    pub fn remove(&self) -> ErrorResult {
        if self.parent_node().is_none() {
            return Ok(());
        }
        let _scope = CeReactionsScope::enter(&self.node_document());
        remove_node(self, SuppressObserver::Unsuppressed);
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#concept-node-replace>
    pub fn replace_child(&self, node: &NodeRef, child: &NodeRef) -> Fallible<NodeRef> {
        let _scope = CeReactionsScope::enter(&self.node_document());
        // Steps 1-6 mirror pre-insert validity, with `child` carved out of
        // the document structure counts.
        match self.data {
            NodeData::Document(_) |
            NodeData::DocumentFragment(_) |
            NodeData::ShadowRoot(_) |
            NodeData::Element(_) => {},
            _ => return Err(Error::HierarchyRequest),
        }
        if node.is_host_including_inclusive_ancestor_of(self) {
            return Err(Error::HierarchyRequest);
        }
        if child.parent_node().as_ref() != Some(self) {
            return Err(Error::NotFound);
        }
        match node.data {
            NodeData::DocumentFragment(_) |
            NodeData::DocumentType(_) |
            NodeData::Element(_) |
            NodeData::Text(_) |
            NodeData::CdataSection(_) |
            NodeData::Comment(_) |
            NodeData::ProcessingInstruction(_) => {},
            _ => return Err(Error::HierarchyRequest),
        }
        if (node.is_text() && self.is_document()) || (node.is_doctype() && !self.is_document()) {
            return Err(Error::HierarchyRequest);
        }
        if self.is_document() {
            self.ensure_document_structure(node, Some(child), Some(child))?;
        }
        // Steps 7-8.
        let reference = match child.next_sibling() {
            Some(sibling) if &sibling == node => node.next_sibling(),
            other => other,
        };
        let previous_sibling = child.previous_sibling();
        // Steps 10-12: remove and insert with observers suppressed, then
        // queue the one combined record.
        let removed = [child.clone()];
        remove_node(child, SuppressObserver::Suppressed);
        let added: SmallVec<[NodeRef; 8]> = match node.data {
            NodeData::DocumentFragment(_) => node.children().collect(),
            _ => {
                let mut single = SmallVec::new();
                single.push(node.clone());
                single
            },
        };
        self.insert(node, reference.as_ref(), SuppressObserver::Suppressed);
        mutationobserver::queue_tree_mutation_record(
            self,
            &added,
            &removed,
            previous_sibling,
            reference,
        );
        Ok(child.clone())
    }

    /// <https://dom.spec.whatwg.org/#concept-node-replace-all>
    pub(crate) fn replace_all(&self, node: Option<NodeRef>) {
        let removed: Vec<NodeRef> = self.children().collect();
        let added: Vec<NodeRef> = match &node {
            Some(node) => match node.data {
                NodeData::DocumentFragment(_) => node.children().collect(),
                _ => vec![node.clone()],
            },
            None => Vec::new(),
        };
        for child in &removed {
            remove_node(child, SuppressObserver::Suppressed);
        }
        if let Some(node) = &node {
            self.insert(node, None, SuppressObserver::Suppressed);
        }
        if !removed.is_empty() || !added.is_empty() {
            mutationobserver::queue_tree_mutation_record(self, &added, &removed, None, None);
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-normalize>
    pub fn normalize(&self) {
        let _scope = CeReactionsScope::enter(&self.node_document());
        let mut current = Some(self.clone());
        while let Some(node) = current {
            current = following_node_within(&node, self);
            if !node.is_text() {
                continue;
            }
            let length = node.as_character_data().expect("text node").length();
            if length == 0 {
                remove_node(&node, SuppressObserver::Unsuppressed);
                continue;
            }
            // Fold the data of the contiguous Text siblings into this node,
            // then drop them. Range boundaries inside the dropped nodes are
            // rehomed by the character-data and removal adjustments.
            let mut data = String::new();
            let mut contiguous = Vec::new();
            let mut sibling = node.next_sibling();
            while let Some(next) = sibling {
                if !next.is_text() {
                    break;
                }
                data.push_str(&next.as_character_data().expect("text node").data());
                sibling = next.next_sibling();
                contiguous.push(next);
            }
            if contiguous.is_empty() {
                continue;
            }
            let _ = crate::characterdata::replace_data(&node, length, 0, &data);
            // Skip past the siblings we are about to remove.
            loop {
                let advance = match &current {
                    Some(next) if contiguous.contains(next) => {
                        Some(following_node_within(next, self))
                    },
                    _ => None,
                };
                match advance {
                    Some(next) => current = next,
                    None => break,
                }
            }
            for next in contiguous {
                remove_node(&next, SuppressObserver::Unsuppressed);
            }
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-clonenode>
    pub fn clone_node(&self, deep: bool) -> Fallible<NodeRef> {
        if self.is_shadow_root() {
            return Err(Error::NotSupported);
        }
        let document = self.node_document();
        self.clone_node_internal(&document, deep)
    }

    /// <https://dom.spec.whatwg.org/#concept-node-clone>
    pub(crate) fn clone_node_internal(
        &self,
        target_document: &NodeRef,
        deep: bool,
    ) -> Fallible<NodeRef> {
        let target = target_document
            .as_document()
            .ok_or(Error::InvalidNodeType)?;
        let copy = match &self.data {
            NodeData::Document(_) => Document::new_node(),
            NodeData::Element(element) => {
                let namespace = element.namespace();
                let copy = target_document.create_element_ns(
                    namespace.as_ref().map(Atom::as_str),
                    element.qualified_name().as_str(),
                )?;
                crate::element::copy_attributes(element, &copy, target)?;
                copy
            },
            NodeData::Attr(attr) => {
                let name = crate::element::QualName {
                    namespace: attr.namespace().map(|ns| target.intern(ns.as_str())),
                    prefix: attr.prefix().map(|p| target.intern(p.as_str())),
                    local: target.intern(attr.local_name().as_str()),
                };
                Attr::new_node(target_document, name, target.intern(attr.value().as_str()))
            },
            NodeData::Text(cdata) => target_document.create_text_node(&cdata.data())?,
            NodeData::CdataSection(cdata) => {
                target_document.create_cdata_section(&cdata.data())?
            },
            NodeData::Comment(cdata) => target_document.create_comment(&cdata.data())?,
            NodeData::ProcessingInstruction(pi) => target_document
                .create_processing_instruction(pi.target().as_str(), &pi.character_data().data())?,
            NodeData::DocumentType(doctype) => DocumentType::new_node(
                target_document,
                doctype.name(),
                doctype.public_id(),
                doctype.system_id(),
            ),
            NodeData::DocumentFragment(_) => target_document.create_document_fragment()?,
            NodeData::ShadowRoot(_) => return Err(Error::NotSupported),
        };
        let copy_document = if copy.is_document() {
            copy.clone()
        } else {
            target_document.clone()
        };
        if deep {
            for child in self.children() {
                let child_copy = child.clone_node_internal(&copy_document, true)?;
                copy.insert(&child_copy, None, SuppressObserver::Suppressed);
            }
        }
        Ok(copy)
    }

    /// <https://dom.spec.whatwg.org/#dom-node-isequalnode>
    pub fn is_equal_node(&self, other: &NodeRef) -> bool {
        if self.node_type() != other.node_type() {
            return false;
        }
        let equal_here = match (&self.data, &other.data) {
            (NodeData::DocumentType(a), NodeData::DocumentType(b)) => {
                a.name() == b.name() &&
                    a.public_id() == b.public_id() &&
                    a.system_id() == b.system_id()
            },
            (NodeData::Element(a), NodeData::Element(b)) => crate::element::is_equal_element(a, b),
            (NodeData::Attr(a), NodeData::Attr(b)) => {
                atom_opt_text_eq(a.namespace().as_ref(), b.namespace().as_ref()) &&
                    a.local_name().text_eq(&b.local_name()) &&
                    a.value().text_eq(&b.value())
            },
            (NodeData::ProcessingInstruction(a), NodeData::ProcessingInstruction(b)) => {
                a.target().text_eq(&b.target()) &&
                    a.character_data().data() == b.character_data().data()
            },
            (NodeData::Text(a), NodeData::Text(b)) |
            (NodeData::CdataSection(a), NodeData::CdataSection(b)) |
            (NodeData::Comment(a), NodeData::Comment(b)) => a.data() == b.data(),
            _ => true,
        };
        if !equal_here {
            return false;
        }
        if self.child_count() != other.child_count() {
            return false;
        }
        self.children()
            .zip(other.children())
            .all(|(a, b)| a.is_equal_node(&b))
    }

    /// <https://dom.spec.whatwg.org/#dom-node-issamenode>
    pub fn is_same_node(&self, other: Option<&NodeRef>) -> bool {
        other == Some(self)
    }

    // -----------------------------------------------------------------
    // ParentNode / ChildNode convenience methods. All funnel through the
    // primitives above.
    // -----------------------------------------------------------------

    /// <https://dom.spec.whatwg.org/#dom-parentnode-append>
    pub fn append(&self, nodes: &[NodeOrText]) -> ErrorResult {
        let _scope = CeReactionsScope::enter(&self.node_document());
        let node = convert_nodes(&self.node_document(), nodes)?;
        self.pre_insert(&node, None).map(|_| ())
    }

    /// <https://dom.spec.whatwg.org/#dom-parentnode-prepend>
    pub fn prepend(&self, nodes: &[NodeOrText]) -> ErrorResult {
        let _scope = CeReactionsScope::enter(&self.node_document());
        let node = convert_nodes(&self.node_document(), nodes)?;
        let first = self.first_child();
        self.pre_insert(&node, first.as_ref()).map(|_| ())
    }

    /// <https://dom.spec.whatwg.org/#dom-parentnode-replacechildren>
    pub fn replace_children(&self, nodes: &[NodeOrText]) -> ErrorResult {
        let _scope = CeReactionsScope::enter(&self.node_document());
        let node = convert_nodes(&self.node_document(), nodes)?;
        self.ensure_pre_insert_validity(&node, None)?;
        self.replace_all(Some(node));
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#dom-childnode-before>
    pub fn before(&self, nodes: &[NodeOrText]) -> ErrorResult {
        let parent = match self.parent_node() {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let _scope = CeReactionsScope::enter(&self.node_document());
        // Find the closest preceding sibling not in the inserted set.
        let viable = self
            .preceding_siblings()
            .find(|sibling| !nodes_contain(nodes, sibling));
        let node = convert_nodes(&self.node_document(), nodes)?;
        let reference = match viable {
            Some(sibling) => sibling.next_sibling(),
            None => parent.first_child(),
        };
        parent.pre_insert(&node, reference.as_ref()).map(|_| ())
    }

    /// <https://dom.spec.whatwg.org/#dom-childnode-after>
    pub fn after(&self, nodes: &[NodeOrText]) -> ErrorResult {
        let parent = match self.parent_node() {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let _scope = CeReactionsScope::enter(&self.node_document());
        let viable = self
            .following_siblings()
            .find(|sibling| !nodes_contain(nodes, sibling));
        let node = convert_nodes(&self.node_document(), nodes)?;
        parent.pre_insert(&node, viable.as_ref()).map(|_| ())
    }

    /// <https://dom.spec.whatwg.org/#dom-childnode-replacewith>
    pub fn replace_with(&self, nodes: &[NodeOrText]) -> ErrorResult {
        let parent = match self.parent_node() {
            Some(parent) => parent,
            None => return Ok(()),
        };
        let _scope = CeReactionsScope::enter(&self.node_document());
        let viable = self
            .following_siblings()
            .find(|sibling| !nodes_contain(nodes, sibling));
        let node = convert_nodes(&self.node_document(), nodes)?;
        if self.parent_node().as_ref() == Some(&parent) {
            parent.replace_child(&node, self).map(|_| ())
        } else {
            parent.pre_insert(&node, viable.as_ref()).map(|_| ())
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-node-movebefore>
    pub fn move_before(&self, node: &NodeRef, child: Option<&NodeRef>) -> ErrorResult {
        let _scope = CeReactionsScope::enter(&self.node_document());
        // The relink fast path applies when the move stays within one
        // document and one shadow-including tree; otherwise this degrades to
        // an ordinary remove + insert.
        let same_document = node.node_document() == self.node_document();
        let same_tree = node.shadow_including_root() == self.shadow_including_root();
        if !same_document || !same_tree || node.parent_node().is_none() {
            self.pre_insert(node, child)?;
            return Ok(());
        }
        self.ensure_pre_insert_validity(node, child)?;
        match node.data {
            NodeData::Element(_) |
            NodeData::Text(_) |
            NodeData::CdataSection(_) |
            NodeData::Comment(_) |
            NodeData::ProcessingInstruction(_) => {},
            // Fragments and doctypes gain nothing from the fast path.
            _ => {
                self.pre_insert(node, child)?;
                return Ok(());
            },
        }
        let reference = match child {
            Some(child) if child == node => node.next_sibling(),
            Some(child) => Some(child.clone()),
            None => None,
        };
        // Observable behavior is contractually the remove+insert pair, so
        // both records and both reaction sets are produced even though the
        // links are rewired in place.
        remove_node(node, SuppressObserver::Unsuppressed);
        self.insert(node, reference.as_ref(), SuppressObserver::Unsuppressed);
        Ok(())
    }

    pub(crate) fn preceding_siblings(&self) -> impl Iterator<Item = NodeRef> {
        std::iter::successors(self.previous_sibling(), |node| node.previous_sibling())
    }

    pub(crate) fn following_siblings(&self) -> impl Iterator<Item = NodeRef> {
        std::iter::successors(self.next_sibling(), |node| node.next_sibling())
    }
}

fn atom_opt_text_eq(a: Option<&Atom>, b: Option<&Atom>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.text_eq(b),
        (None, None) => true,
        _ => false,
    }
}

/// A member of a variadic `(Node or DOMString)` argument list.
pub enum NodeOrText {
    Node(NodeRef),
    Text(String),
}

fn nodes_contain(nodes: &[NodeOrText], node: &NodeRef) -> bool {
    nodes.iter().any(|entry| match entry {
        NodeOrText::Node(n) => n == node,
        NodeOrText::Text(_) => false,
    })
}

/// <https://dom.spec.whatwg.org/#converting-nodes-into-a-node>
fn convert_nodes(document: &NodeRef, nodes: &[NodeOrText]) -> Fallible<NodeRef> {
    if nodes.len() == 1 {
        return match &nodes[0] {
            NodeOrText::Node(node) => Ok(node.clone()),
            NodeOrText::Text(text) => document.create_text_node(text),
        };
    }
    let fragment = document.create_document_fragment()?;
    for entry in nodes {
        let node = match entry {
            NodeOrText::Node(node) => node.clone(),
            NodeOrText::Text(text) => document.create_text_node(text)?,
        };
        fragment.pre_insert(&node, None)?;
    }
    Ok(fragment)
}

/// Links `node` into `parent`'s child list before `child` (or at the end).
fn link_before(parent: &NodeRef, node: &NodeRef, child: Option<&NodeRef>) {
    *node.parent.borrow_mut() = Some(parent.downgrade());
    match child {
        Some(child) => {
            let previous = child.previous_sibling();
            *node.next_sibling.borrow_mut() = Some(child.clone());
            *child.previous_sibling.borrow_mut() = Some(node.downgrade());
            match previous {
                Some(previous) => {
                    *node.previous_sibling.borrow_mut() = Some(previous.downgrade());
                    *previous.next_sibling.borrow_mut() = Some(node.clone());
                },
                None => {
                    *node.previous_sibling.borrow_mut() = None;
                    *parent.first_child.borrow_mut() = Some(node.clone());
                },
            }
        },
        None => {
            let last = parent.last_child();
            *node.next_sibling.borrow_mut() = None;
            match last {
                Some(last) => {
                    *node.previous_sibling.borrow_mut() = Some(last.downgrade());
                    *last.next_sibling.borrow_mut() = Some(node.clone());
                },
                None => {
                    *node.previous_sibling.borrow_mut() = None;
                    *parent.first_child.borrow_mut() = Some(node.clone());
                },
            }
            *parent.last_child.borrow_mut() = Some(node.downgrade());
        },
    }
}

/// Unlinks `node` from its parent's child list. The caller keeps a strong
/// handle, so the node cannot die mid-operation.
fn unlink(parent: &NodeRef, node: &NodeRef) {
    let previous = node.previous_sibling();
    let next = node.next_sibling();
    match &previous {
        Some(previous) => *previous.next_sibling.borrow_mut() = next.clone(),
        None => *parent.first_child.borrow_mut() = next.clone(),
    }
    match &next {
        Some(next) => {
            *next.previous_sibling.borrow_mut() = previous.as_ref().map(NodeRef::downgrade)
        },
        None => *parent.last_child.borrow_mut() = previous.as_ref().map(NodeRef::downgrade),
    }
    *node.parent.borrow_mut() = None;
    *node.previous_sibling.borrow_mut() = None;
    *node.next_sibling.borrow_mut() = None;
}

/// <https://dom.spec.whatwg.org/#concept-node-remove>
pub(crate) fn remove_node(node: &NodeRef, suppress: SuppressObserver) {
    let parent = match node.parent_node() {
        Some(parent) => parent,
        None => return,
    };
    let document = node.node_document();
    let index = node.index();
    // Live ranges and iterators react to the removal before the links go.
    if let Some(doc) = document.as_document() {
        range::adjust_for_remove(doc, node, &parent, index);
        nodeiterator::adjust_for_remove(doc, node);
    }
    let old_previous = node.previous_sibling();
    let old_next = node.next_sibling();
    if suppress == SuppressObserver::Unsuppressed {
        mutationobserver::queue_tree_mutation_record(
            &parent,
            &[],
            &[node.clone()],
            old_previous,
            old_next,
        );
    }
    unlink(&parent, node);
    note_subtree_removed(node);
    if let Some(doc) = document.as_document() {
        doc.note_mutation();
    }
}

/// Post-link steps for one inserted root: connectedness flags, document
/// indexes, and custom-element reactions across the shadow-including subtree.
fn note_subtree_inserted(node: &NodeRef, parent_connected: bool, parent_in_shadow: bool) {
    let document = node.node_document();
    node.for_each_shadow_including_inclusive_descendant(&mut |descendant| {
        // Parents precede children in this walk, so the parent's flag is
        // already up to date when a child is visited.
        let in_shadow = if descendant == node {
            parent_in_shadow
        } else {
            descendant
                .parent_node()
                .map(|p| p.is_in_shadow_tree() || p.is_shadow_root())
                .unwrap_or(true)
        };
        descendant.set_flag(NodeFlags::IS_IN_SHADOW_TREE, in_shadow);
        if parent_connected {
            descendant.set_flag(NodeFlags::IS_CONNECTED, true);
            if descendant.is_element() {
                if !in_shadow {
                    if let Some(doc) = document.as_document() {
                        doc.register_element(descendant);
                    }
                }
                if descendant.flags().contains(NodeFlags::IS_CUSTOM) {
                    customelementregistry::enqueue_callback_reaction(
                        descendant,
                        CustomElementReaction::Connected,
                    );
                } else {
                    customelementregistry::try_upgrade(descendant);
                }
            }
        }
    });
}

/// Post-unlink steps for one removed root.
fn note_subtree_removed(node: &NodeRef) {
    let was_connected = node.is_connected();
    let document = node.node_document();
    node.for_each_shadow_including_inclusive_descendant(&mut |descendant| {
        // A detached subtree is only a shadow tree below a ShadowRoot it
        // still contains.
        let in_shadow = if descendant == node {
            false
        } else {
            descendant
                .parent_node()
                .map(|p| p.is_in_shadow_tree() || p.is_shadow_root())
                .unwrap_or(true)
        };
        descendant.set_flag(NodeFlags::IS_IN_SHADOW_TREE, in_shadow);
        if was_connected {
            descendant.set_flag(NodeFlags::IS_CONNECTED, false);
            if descendant.is_element() {
                if !in_shadow {
                    if let Some(doc) = document.as_document() {
                        doc.unregister_element(descendant);
                    }
                }
                if descendant.flags().contains(NodeFlags::IS_CUSTOM) {
                    customelementregistry::enqueue_callback_reaction(
                        descendant,
                        CustomElementReaction::Disconnected,
                    );
                }
            }
        }
    });
    if was_connected {
        debug!("disconnected subtree rooted at {:?}", node);
    }
}

/// Marks a whole newly attached shadow tree as connected. Used by
/// `attach_shadow` when the host is already in the document.
pub(crate) fn note_shadow_tree_connected(shadow_root: &NodeRef) {
    note_subtree_inserted(shadow_root, true, true);
}
