/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The Document payload: string pool, accelerator indexes, generation
//! counter, node factories and adoption.
//!
//! The three indexes (`id`, `tag`, `class`) hold weak references and track
//! exactly the elements connected to this document outside shadow trees.
//! The mutation funnel and the attribute store keep them current; queries
//! prune entries whose nodes have died.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use log::warn;
use rustc_hash::FxHashMap;

use crate::atom::{Atom, StringPool};
use crate::attr::Attr;
use crate::characterdata::{CharacterData, ProcessingInstruction};
use crate::customelementregistry::{self, CustomElementRegistry};
use crate::documentfragment::DocumentFragment;
use crate::documenttype::DocumentType;
use crate::element::{self, Element, QualName};
use crate::error::{Error, Fallible};
use crate::htmlcollection::HtmlCollection;
use crate::node::{NodeData, NodeRef, WeakNodeRef};

/// Hard ceilings a document enforces on its own growth.
#[derive(Clone, Copy, Debug)]
pub struct DocumentLimits {
    pub max_nodes: usize,
    pub max_attributes_per_element: usize,
    pub max_listeners_per_target: usize,
}

impl Default for DocumentLimits {
    fn default() -> Self {
        DocumentLimits {
            max_nodes: 1 << 24,
            max_attributes_per_element: 4096,
            max_listeners_per_target: 65_536,
        }
    }
}

/// The data payload of a Document node.
pub struct Document {
    pool: StringPool,
    ids: RefCell<FxHashMap<Atom, Vec<WeakNodeRef>>>,
    tags: RefCell<FxHashMap<Atom, Vec<WeakNodeRef>>>,
    classes: RefCell<FxHashMap<Atom, Vec<WeakNodeRef>>>,
    /// Bumped on every mutation; live collections use it to decide whether
    /// their cached contents are still good.
    generation: Cell<u64>,
    node_count: Cell<usize>,
    limits: Cell<DocumentLimits>,
    pub(crate) registry: CustomElementRegistry,
    pub(crate) observers: RefCell<Vec<crate::mutationobserver::MutationObserver>>,
    pub(crate) observer_drain_pending: Cell<bool>,
    pub(crate) observer_drain_hook: RefCell<Option<Rc<dyn Fn()>>>,
    pub(crate) ranges: RefCell<Vec<Weak<crate::range::LiveRangeData>>>,
    pub(crate) iterators: RefCell<Vec<Weak<crate::nodeiterator::NodeIteratorData>>>,
    element_hook: RefCell<Option<Rc<dyn Fn(&NodeRef)>>>,
    next_listener_id: Cell<u64>,
}

impl Document {
    /// Creates a new, empty document node.
    pub fn new_node() -> NodeRef {
        NodeRef::new(
            NodeData::Document(Document {
                pool: StringPool::new(),
                ids: RefCell::new(FxHashMap::default()),
                tags: RefCell::new(FxHashMap::default()),
                classes: RefCell::new(FxHashMap::default()),
                generation: Cell::new(0),
                node_count: Cell::new(0),
                limits: Cell::new(DocumentLimits::default()),
                registry: CustomElementRegistry::default(),
                observers: RefCell::new(Vec::new()),
                observer_drain_pending: Cell::new(false),
                observer_drain_hook: RefCell::new(None),
                ranges: RefCell::new(Vec::new()),
                iterators: RefCell::new(Vec::new()),
                element_hook: RefCell::new(None),
                next_listener_id: Cell::new(1),
            }),
            None,
        )
    }

    pub fn intern(&self, text: &str) -> Atom {
        self.pool.intern(text)
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Invalidates every live collection derived from this document.
    pub(crate) fn note_mutation(&self) {
        self.generation.set(self.generation.get() + 1);
    }

    pub fn limits(&self) -> DocumentLimits {
        self.limits.get()
    }

    pub fn set_limits(&self, limits: DocumentLimits) {
        self.limits.set(limits);
    }

    pub fn node_count(&self) -> usize {
        self.node_count.get()
    }

    pub(crate) fn note_node_created(&self) {
        self.node_count.set(self.node_count.get() + 1);
    }

    pub(crate) fn note_node_destroyed(&self) {
        self.node_count.set(self.node_count.get().saturating_sub(1));
    }

    fn check_node_budget(&self) -> Fallible<()> {
        if self.node_count.get() >= self.limits.get().max_nodes {
            warn!("node quota exhausted ({} nodes)", self.node_count.get());
            return Err(Error::QuotaExceeded);
        }
        Ok(())
    }

    pub(crate) fn next_listener_id(&self) -> u64 {
        let id = self.next_listener_id.get();
        self.next_listener_id.set(id + 1);
        id
    }

    /// Installs a hook invoked for every element this document creates.
    /// Binding layers use it to attach their own per-element state.
    pub fn set_element_creation_hook(&self, hook: Rc<dyn Fn(&NodeRef)>) {
        *self.element_hook.borrow_mut() = Some(hook);
    }

    /// Installs the observer drain scheduler. It fires when a record lands
    /// on an empty delivery round; the host should then arrange to call
    /// [`crate::mutationobserver::notify_observers`].
    pub fn set_observer_drain_hook(&self, hook: Rc<dyn Fn()>) {
        *self.observer_drain_hook.borrow_mut() = Some(hook);
    }

    // -----------------------------------------------------------------
    // Accelerator indexes.
    // -----------------------------------------------------------------

    /// Adds a freshly connected element to the id/tag/class maps.
    pub(crate) fn register_element(&self, node: &NodeRef) {
        let element = match node.as_element() {
            Some(element) => element,
            None => return,
        };
        self.tags
            .borrow_mut()
            .entry(element.local_name())
            .or_default()
            .push(node.downgrade());
        if let Some(id) = element.id_atom() {
            if !id.is_empty() {
                self.ids.borrow_mut().entry(id).or_default().push(node.downgrade());
            }
        }
        if let Some(classes) = element.class_value() {
            let mut map = self.classes.borrow_mut();
            for token in classes.as_str().split_ascii_whitespace() {
                map.entry(self.pool.intern(token))
                    .or_default()
                    .push(node.downgrade());
            }
        }
    }

    /// Drops a disconnected element from the id/tag/class maps.
    pub(crate) fn unregister_element(&self, node: &NodeRef) {
        let element = match node.as_element() {
            Some(element) => element,
            None => return,
        };
        remove_entry(&mut self.tags.borrow_mut(), &element.local_name(), node);
        if let Some(id) = element.id_atom() {
            remove_entry(&mut self.ids.borrow_mut(), &id, node);
        }
        if let Some(classes) = element.class_value() {
            let mut map = self.classes.borrow_mut();
            for token in classes.as_str().split_ascii_whitespace() {
                if let Some(atom) = self.pool.get(token) {
                    remove_entry(&mut map, &atom, node);
                }
            }
        }
    }

    /// An `id` attribute changed on a connected element.
    pub(crate) fn refresh_element_id(
        &self,
        node: &NodeRef,
        old: Option<&Atom>,
        new: Option<&Atom>,
    ) {
        if let Some(old) = old {
            remove_entry(&mut self.ids.borrow_mut(), old, node);
        }
        if let Some(new) = new {
            if !new.is_empty() {
                self.ids
                    .borrow_mut()
                    .entry(new.clone())
                    .or_default()
                    .push(node.downgrade());
            }
        }
    }

    /// A `class` attribute changed on a connected element.
    pub(crate) fn refresh_element_classes(
        &self,
        node: &NodeRef,
        old: Option<&str>,
        new: Option<&str>,
    ) {
        let mut map = self.classes.borrow_mut();
        if let Some(old) = old {
            for token in old.split_ascii_whitespace() {
                if let Some(atom) = self.pool.get(token) {
                    remove_entry(&mut map, &atom, node);
                }
            }
        }
        if let Some(new) = new {
            for token in new.split_ascii_whitespace() {
                let atom = self.pool.intern(token);
                let bucket = map.entry(atom).or_default();
                if !bucket
                    .iter()
                    .any(|entry| entry.upgrade().as_ref() == Some(node))
                {
                    bucket.push(node.downgrade());
                }
            }
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-nonelementparentnode-getelementbyid>
    ///
    /// First-writer-wins on duplicate ids, matching browser behavior.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeRef> {
        let atom = self.pool.get(id)?;
        let mut bucket = self.ids.borrow_mut();
        let entries = bucket.get_mut(&atom)?;
        entries.retain(|entry| entry.upgrade().is_some());
        entries
            .iter()
            .filter_map(WeakNodeRef::upgrade)
            .find(|node| node.is_connected())
    }

    /// A pruned snapshot of one tag bucket, in registration order.
    pub(crate) fn tag_bucket_snapshot(&self, name: &str) -> Vec<NodeRef> {
        let atom = match self.pool.get(name) {
            Some(atom) => atom,
            None => return Vec::new(),
        };
        snapshot_bucket(&mut self.tags.borrow_mut(), &atom)
    }

    /// A pruned snapshot of one class bucket, in registration order.
    pub(crate) fn class_bucket_snapshot(&self, name: &str) -> Vec<NodeRef> {
        let atom = match self.pool.get(name) {
            Some(atom) => atom,
            None => return Vec::new(),
        };
        snapshot_bucket(&mut self.classes.borrow_mut(), &atom)
    }
}

fn remove_entry(map: &mut FxHashMap<Atom, Vec<WeakNodeRef>>, key: &Atom, node: &NodeRef) {
    let emptied = match map.get_mut(key) {
        Some(bucket) => {
            bucket.retain(|entry| match entry.upgrade() {
                Some(entry) => &entry != node,
                None => false,
            });
            bucket.is_empty()
        },
        None => return,
    };
    if emptied {
        map.remove(key);
    }
}

fn snapshot_bucket(map: &mut FxHashMap<Atom, Vec<WeakNodeRef>>, key: &Atom) -> Vec<NodeRef> {
    match map.get_mut(key) {
        Some(bucket) => {
            bucket.retain(|entry| entry.upgrade().is_some());
            bucket
                .iter()
                .filter_map(WeakNodeRef::upgrade)
                .filter(|node| node.is_connected())
                .collect()
        },
        None => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Factories and document-level operations on the document *node*.
// ---------------------------------------------------------------------------

impl NodeRef {
    fn document_payload(&self) -> Fallible<&Document> {
        self.as_document().ok_or(Error::InvalidNodeType)
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createelement>
    pub fn create_element(&self, local_name: &str) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        element::validate_xml_name(local_name)?;
        self.create_element_with_name(QualName {
            namespace: None,
            prefix: None,
            local: doc.intern(local_name),
        })
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createelementns>
    pub fn create_element_ns(
        &self,
        namespace: Option<&str>,
        qualified_name: &str,
    ) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        let name = element::validate_and_extract(doc, namespace, qualified_name)?;
        self.create_element_with_name(name)
    }

    fn create_element_with_name(&self, name: QualName) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        doc.check_node_budget()?;
        let qualified = element::qualified_atom(doc, name.prefix.as_ref(), &name.local);
        let node = NodeRef::new(
            NodeData::Element(Element::new(name, qualified)),
            Some(self),
        );
        let hook = doc.element_hook.borrow().clone();
        if let Some(hook) = hook {
            hook(&node);
        }
        customelementregistry::try_upgrade(&node);
        Ok(node)
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createtextnode>
    pub fn create_text_node(&self, data: &str) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        doc.check_node_budget()?;
        Ok(NodeRef::new(
            NodeData::Text(CharacterData::new(data.to_owned())),
            Some(self),
        ))
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createcomment>
    pub fn create_comment(&self, data: &str) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        doc.check_node_budget()?;
        Ok(NodeRef::new(
            NodeData::Comment(CharacterData::new(data.to_owned())),
            Some(self),
        ))
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createcdatasection>
    pub fn create_cdata_section(&self, data: &str) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        if data.contains("]]>") {
            return Err(Error::InvalidCharacter);
        }
        doc.check_node_budget()?;
        Ok(NodeRef::new(
            NodeData::CdataSection(CharacterData::new(data.to_owned())),
            Some(self),
        ))
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createprocessinginstruction>
    pub fn create_processing_instruction(&self, target: &str, data: &str) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        element::validate_xml_name(target)?;
        if data.contains("?>") {
            return Err(Error::InvalidCharacter);
        }
        doc.check_node_budget()?;
        Ok(NodeRef::new(
            NodeData::ProcessingInstruction(ProcessingInstruction::new(
                doc.intern(target),
                data.to_owned(),
            )),
            Some(self),
        ))
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createdocumentfragment>
    pub fn create_document_fragment(&self) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        doc.check_node_budget()?;
        Ok(NodeRef::new(
            NodeData::DocumentFragment(DocumentFragment::new()),
            Some(self),
        ))
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createattribute>
    pub fn create_attribute(&self, local_name: &str) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        element::validate_xml_name(local_name)?;
        doc.check_node_budget()?;
        let name = QualName {
            namespace: None,
            prefix: None,
            local: doc.intern(local_name),
        };
        let empty = doc.intern("");
        Ok(Attr::new_node(self, name, empty))
    }

    /// <https://dom.spec.whatwg.org/#dom-document-createattributens>
    pub fn create_attribute_ns(
        &self,
        namespace: Option<&str>,
        qualified_name: &str,
    ) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        let name = element::validate_and_extract(doc, namespace, qualified_name)?;
        doc.check_node_budget()?;
        let empty = doc.intern("");
        Ok(Attr::new_node(self, name, empty))
    }

    /// <https://dom.spec.whatwg.org/#dom-domimplementation-createdocumenttype>
    pub fn create_document_type(
        &self,
        qualified_name: &str,
        public_id: &str,
        system_id: &str,
    ) -> Fallible<NodeRef> {
        let doc = self.document_payload()?;
        element::validate_xml_name(qualified_name)?;
        doc.check_node_budget()?;
        Ok(DocumentType::new_node(
            self,
            qualified_name,
            public_id,
            system_id,
        ))
    }

    /// <https://dom.spec.whatwg.org/#dom-document-doctype>
    pub fn doctype(&self) -> Option<NodeRef> {
        self.children().find(|child| child.is_doctype())
    }

    /// <https://dom.spec.whatwg.org/#dom-document-adoptnode>
    pub fn adopt_node(&self, node: &NodeRef) -> Fallible<NodeRef> {
        self.document_payload()?;
        if node.is_document() {
            return Err(Error::NotSupported);
        }
        if node.is_shadow_root() {
            return Err(Error::HierarchyRequest);
        }
        // The removal half queues reactions against the source document's
        // stack, the adoption half against ours; the source scope drains
        // first so `disconnected` precedes `adopted`.
        let _target_scope = customelementregistry::CeReactionsScope::enter(self);
        let _source_scope = customelementregistry::CeReactionsScope::enter(&node.node_document());
        self.adopt(node);
        Ok(node.clone())
    }

    /// <https://dom.spec.whatwg.org/#dom-document-importnode>
    pub fn import_node(&self, node: &NodeRef, deep: bool) -> Fallible<NodeRef> {
        self.document_payload()?;
        if node.is_document() || node.is_shadow_root() {
            return Err(Error::NotSupported);
        }
        node.clone_node_internal(self, deep)
    }

    /// <https://dom.spec.whatwg.org/#concept-node-adopt>
    pub(crate) fn adopt(&self, node: &NodeRef) {
        // Step 1-2.
        let old_document = node.node_document();
        if node.parent_node().is_some() {
            crate::node::remove_node(node, crate::node::SuppressObserver::Unsuppressed);
        }
        // Step 3. Rehome the subtree: owner pointers, node budgets, interned
        // strings and adopted reactions.
        if &old_document == self {
            return;
        }
        let new_doc = match self.as_document() {
            Some(doc) => doc,
            None => return,
        };
        log::debug!("adopting {:?} into new document", node);
        node.for_each_shadow_including_inclusive_descendant(&mut |descendant| {
            if let Some(old) = old_document.as_document() {
                old.note_node_destroyed();
            }
            new_doc.note_node_created();
            descendant.set_owner_document(self);
            match descendant.data() {
                NodeData::Element(element) => {
                    element.reintern(new_doc);
                    if element.definition().is_some() {
                        customelementregistry::enqueue_callback_reaction(
                            descendant,
                            customelementregistry::CustomElementReaction::Adopted {
                                old_document: old_document.clone(),
                                new_document: self.clone(),
                            },
                        );
                    }
                },
                NodeData::Attr(attr) => attr.reintern(new_doc),
                NodeData::ProcessingInstruction(pi) => pi.reintern(new_doc),
                _ => {},
            }
            // Attribute nodes hang off their element, not the child list.
            if let Some(element) = descendant.as_element() {
                for attr_node in element.attrs() {
                    if let Some(old) = old_document.as_document() {
                        old.note_node_destroyed();
                    }
                    new_doc.note_node_created();
                    attr_node.set_owner_document(self);
                }
            }
        });
    }

    /// <https://dom.spec.whatwg.org/#dom-nonelementparentnode-getelementbyid>
    ///
    /// O(1) through the id index on documents; fragments fall back to a
    /// subtree walk.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeRef> {
        if let Some(doc) = self.as_document() {
            return doc.get_element_by_id(id);
        }
        self.descendants().find(|node| {
            node.as_element()
                .and_then(|element| element.id_atom())
                .map(|atom| atom == *id)
                .unwrap_or(false)
        })
    }

    /// <https://dom.spec.whatwg.org/#dom-document-getelementsbytagname>
    pub fn document_elements_by_tag_name(&self, qualified_name: &str) -> HtmlCollection {
        HtmlCollection::document_by_tag(self, qualified_name)
    }

    /// <https://dom.spec.whatwg.org/#dom-document-getelementsbytagnamens>
    pub fn document_elements_by_tag_name_ns(
        &self,
        namespace: Option<&str>,
        local_name: &str,
    ) -> HtmlCollection {
        HtmlCollection::by_ns_and_local(self, namespace, local_name)
    }

    /// <https://dom.spec.whatwg.org/#dom-document-getelementsbyclassname>
    pub fn document_elements_by_class_name(&self, class_names: &str) -> HtmlCollection {
        HtmlCollection::document_by_class(self, class_names)
    }
}
