/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Elements and their attribute store.
//!
//! Attributes live in an ordered list of Attr nodes owned by the element.
//! Every attribute mutation funnels through [`change_attribute`],
//! [`append_attribute`] or [`remove_attribute_node_internal`] so that
//! mutation records, custom-element reactions, the document indexes and the
//! class bloom bits stay coherent no matter which public method triggered
//! the change.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::atom::Atom;
use crate::attr::Attr;
use crate::customelementregistry::{
    self, CeReactionsScope, CustomElementDefinition, CustomElementReaction,
};
use crate::document::Document;
use crate::domtokenlist::DomTokenList;
use crate::error::{Error, ErrorResult, Fallible};
use crate::htmlcollection::HtmlCollection;
use crate::mutationobserver;
use crate::namednodemap::NamedNodeMap;
use crate::node::{NodeFlags, NodeRef};
use crate::shadowroot::{ShadowRoot, ShadowRootMode, SlotAssignmentMode};

/// <https://infra.spec.whatwg.org/#xml-namespace>
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// <https://infra.spec.whatwg.org/#xmlns-namespace>
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A namespace-qualified name: interned namespace, prefix and local name.
#[derive(Clone)]
pub struct QualName {
    pub namespace: Option<Atom>,
    pub prefix: Option<Atom>,
    pub local: Atom,
}

/// Computes the interned qualified name (`prefix:local` or `local`).
pub(crate) fn qualified_atom(pool: &Document, prefix: Option<&Atom>, local: &Atom) -> Atom {
    match prefix {
        Some(prefix) => pool.intern(&format!("{}:{}", prefix, local)),
        None => local.clone(),
    }
}

/// <https://dom.spec.whatwg.org/#concept-element-custom-element-state>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CustomElementState {
    Undefined,
    Failed,
    Custom,
}

/// The data payload of an Element node.
pub struct Element {
    name: RefCell<QualName>,
    qualified: RefCell<Atom>,
    attrs: RefCell<SmallVec<[NodeRef; 4]>>,
    /// One bit per class token; selector matching uses this for early
    /// rejection before looking at any string.
    class_bloom: Cell<u64>,
    shadow_root: RefCell<Option<NodeRef>>,
    class_list: RefCell<Option<DomTokenList>>,
    attr_map: RefCell<Option<NamedNodeMap>>,
    custom_state: Cell<CustomElementState>,
    definition: RefCell<Option<Rc<CustomElementDefinition>>>,
    pub(crate) reaction_queue: RefCell<VecDeque<CustomElementReaction>>,
    /// Opaque slot for a binding layer's per-element state.
    host_data: RefCell<Option<Rc<dyn Any>>>,
}

impl Element {
    pub(crate) fn new(name: QualName, qualified: Atom) -> Element {
        Element {
            name: RefCell::new(name),
            qualified: RefCell::new(qualified),
            attrs: RefCell::new(SmallVec::new()),
            class_bloom: Cell::new(0),
            shadow_root: RefCell::new(None),
            class_list: RefCell::new(None),
            attr_map: RefCell::new(None),
            custom_state: Cell::new(CustomElementState::Undefined),
            definition: RefCell::new(None),
            reaction_queue: RefCell::new(VecDeque::new()),
            host_data: RefCell::new(None),
        }
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

    /// <https://dom.spec.whatwg.org/#concept-element-qualified-name>
    pub fn qualified_name(&self) -> Atom {
        self.qualified.borrow().clone()
    }

    /// A snapshot of the attribute list, in order.
    pub fn attrs(&self) -> Vec<NodeRef> {
        self.attrs.borrow().iter().cloned().collect()
    }

    pub fn attr_count(&self) -> usize {
        self.attrs.borrow().len()
    }

    pub fn attr_at(&self, index: usize) -> Option<NodeRef> {
        self.attrs.borrow().get(index).cloned()
    }

    /// <https://dom.spec.whatwg.org/#concept-element-attributes-get-by-name>
    pub fn find_attr(&self, qualified_name: &str) -> Option<NodeRef> {
        self.attrs
            .borrow()
            .iter()
            .find(|attr_node| {
                let attr = attr_node.as_attr().expect("attribute list holds attrs");
                attr.qualified_name() == *qualified_name
            })
            .cloned()
    }

    /// <https://dom.spec.whatwg.org/#concept-element-attributes-get-by-namespace>
    pub fn find_attr_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<NodeRef> {
        let namespace = namespace.filter(|ns| !ns.is_empty());
        self.attrs
            .borrow()
            .iter()
            .find(|attr_node| {
                let attr = attr_node.as_attr().expect("attribute list holds attrs");
                attr.local_name() == *local_name &&
                    attr.namespace().as_ref().map(Atom::as_str) == namespace
            })
            .cloned()
    }

    pub fn get_attr_value(&self, qualified_name: &str) -> Option<String> {
        self.find_attr(qualified_name).map(|attr_node| {
            attr_node
                .as_attr()
                .expect("attribute node")
                .value()
                .as_str()
                .to_owned()
        })
    }

    pub fn shadow_root(&self) -> Option<NodeRef> {
        self.shadow_root.borrow().clone()
    }

    pub fn class_bloom(&self) -> u64 {
        self.class_bloom.get()
    }

    /// The current value of the `id` attribute, interned.
    pub(crate) fn id_atom(&self) -> Option<Atom> {
        self.find_attr("id")
            .map(|attr_node| attr_node.as_attr().expect("attribute node").value())
    }

    /// The current value of the `class` attribute.
    pub(crate) fn class_value(&self) -> Option<Atom> {
        self.find_attr("class")
            .map(|attr_node| attr_node.as_attr().expect("attribute node").value())
    }

    pub fn has_class(&self, name: &str) -> bool {
        match self.class_value() {
            Some(value) => value.as_str().split_ascii_whitespace().any(|t| t == name),
            None => false,
        }
    }

    pub fn custom_state(&self) -> CustomElementState {
        self.custom_state.get()
    }

    pub(crate) fn set_custom_state(&self, state: CustomElementState) {
        self.custom_state.set(state);
    }

    pub fn definition(&self) -> Option<Rc<CustomElementDefinition>> {
        self.definition.borrow().clone()
    }

    pub(crate) fn set_definition(&self, definition: Rc<CustomElementDefinition>) {
        *self.definition.borrow_mut() = Some(definition);
    }

    pub fn host_data(&self) -> Option<Rc<dyn Any>> {
        self.host_data.borrow().clone()
    }

    pub fn set_host_data(&self, data: Option<Rc<dyn Any>>) {
        *self.host_data.borrow_mut() = data;
    }

    pub(crate) fn class_list_cache(&self) -> &RefCell<Option<DomTokenList>> {
        &self.class_list
    }

    pub(crate) fn set_shadow_root_slot(&self, shadow: Option<NodeRef>) {
        *self.shadow_root.borrow_mut() = shadow;
    }

    fn recompute_class_bloom(&self) {
        let mut bloom = 0u64;
        if let Some(value) = self.class_value() {
            for token in value.as_str().split_ascii_whitespace() {
                bloom |= crate::selectors::bloom::class_bit(token);
            }
        }
        self.class_bloom.set(bloom);
    }

    /// Rehomes every interned piece of this element into `pool`.
    pub(crate) fn reintern(&self, pool: &Document) {
        let reinterned = {
            let name = self.name.borrow();
            QualName {
                namespace: name.namespace.as_ref().map(|ns| pool.intern(ns.as_str())),
                prefix: name.prefix.as_ref().map(|p| pool.intern(p.as_str())),
                local: pool.intern(name.local.as_str()),
            }
        };
        let qualified = qualified_atom(pool, reinterned.prefix.as_ref(), &reinterned.local);
        *self.name.borrow_mut() = reinterned;
        *self.qualified.borrow_mut() = qualified;
        for attr_node in self.attrs() {
            attr_node
                .as_attr()
                .expect("attribute node")
                .reintern(pool);
        }
    }
}

/// <https://www.w3.org/TR/xml/#NT-Name>
pub(crate) fn validate_xml_name(name: &str) -> ErrorResult {
    fn is_name_start(c: char) -> bool {
        matches!(c,
            ':' | '_' | 'A'..='Z' | 'a'..='z' |
            '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
            '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
            '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
            '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
            '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
            '\u{10000}'..='\u{EFFFF}')
    }
    fn is_name_char(c: char) -> bool {
        is_name_start(c) ||
            matches!(c,
                '-' | '.' | '0'..='9' | '\u{B7}' |
                '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start(c) => {},
        _ => return Err(Error::InvalidCharacter),
    }
    if chars.all(is_name_char) {
        Ok(())
    } else {
        Err(Error::InvalidCharacter)
    }
}

/// <https://dom.spec.whatwg.org/#validate-and-extract>
pub(crate) fn validate_and_extract(
    pool: &Document,
    namespace: Option<&str>,
    qualified_name: &str,
) -> Fallible<QualName> {
    // Step 1.
    let namespace = namespace.filter(|ns| !ns.is_empty());
    // Step 2.
    validate_xml_name(qualified_name)?;
    // Steps 3-5: split a `prefix:local` qualified name, rejecting malformed
    // QNames (empty halves, more than one colon).
    let (prefix, local) = match qualified_name.find(':') {
        Some(position) => {
            let (prefix, rest) = qualified_name.split_at(position);
            let local = &rest[1..];
            if prefix.is_empty() || local.is_empty() || local.contains(':') {
                return Err(Error::InvalidCharacter);
            }
            (Some(prefix), local)
        },
        None => (None, qualified_name),
    };
    // Steps 6-10.
    if prefix.is_some() && namespace.is_none() {
        return Err(Error::Namespace);
    }
    if prefix == Some("xml") && namespace != Some(XML_NAMESPACE) {
        return Err(Error::Namespace);
    }
    if (qualified_name == "xmlns" || prefix == Some("xmlns")) != (namespace == Some(XMLNS_NAMESPACE))
    {
        return Err(Error::Namespace);
    }
    Ok(QualName {
        namespace: namespace.map(|ns| pool.intern(ns)),
        prefix: prefix.map(|p| pool.intern(p)),
        local: pool.intern(local),
    })
}

impl NodeRef {
    fn element_payload(&self) -> Fallible<&Element> {
        self.as_element().ok_or(Error::InvalidNodeType)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-getattribute>
    pub fn get_attribute(&self, qualified_name: &str) -> Option<String> {
        self.as_element()
            .and_then(|element| element.get_attr_value(qualified_name))
    }

    /// <https://dom.spec.whatwg.org/#dom-element-getattributens>
    pub fn get_attribute_ns(&self, namespace: Option<&str>, local_name: &str) -> Option<String> {
        self.as_element()
            .and_then(|element| element.find_attr_ns(namespace, local_name))
            .map(|attr_node| {
                attr_node
                    .as_attr()
                    .expect("attribute node")
                    .value()
                    .as_str()
                    .to_owned()
            })
    }

    /// <https://dom.spec.whatwg.org/#dom-element-setattribute>
    pub fn set_attribute(&self, qualified_name: &str, value: &str) -> ErrorResult {
        let element = self.element_payload()?;
        // Step 1.
        validate_xml_name(qualified_name)?;
        let _scope = CeReactionsScope::enter(&self.node_document());
        // Steps 3-5.
        match element.find_attr(qualified_name) {
            Some(attr_node) => change_attribute(self, &attr_node, value),
            None => {
                let document = self.node_document();
                let doc = document.as_document().expect("document payload");
                let name = QualName {
                    namespace: None,
                    prefix: None,
                    local: doc.intern(qualified_name),
                };
                let attr_node = Attr::new_node(&document, name, doc.intern(value));
                append_attribute(self, &attr_node)
            },
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-element-setattributens>
    pub fn set_attribute_ns(
        &self,
        namespace: Option<&str>,
        qualified_name: &str,
        value: &str,
    ) -> ErrorResult {
        let element = self.element_payload()?;
        let document = self.node_document();
        let doc = document.as_document().expect("document payload");
        let name = validate_and_extract(doc, namespace, qualified_name)?;
        let _scope = CeReactionsScope::enter(&document);
        let existing = element.find_attr_ns(
            name.namespace.as_ref().map(Atom::as_str),
            name.local.as_str(),
        );
        match existing {
            Some(attr_node) => change_attribute(self, &attr_node, value),
            None => {
                let attr_node = Attr::new_node(&document, name, doc.intern(value));
                append_attribute(self, &attr_node)
            },
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-element-removeattribute>
    pub fn remove_attribute(&self, qualified_name: &str) -> ErrorResult {
        let element = self.element_payload()?;
        if let Some(attr_node) = element.find_attr(qualified_name) {
            let _scope = CeReactionsScope::enter(&self.node_document());
            remove_attribute_node_internal(self, &attr_node);
        }
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#dom-element-removeattributens>
    pub fn remove_attribute_ns(&self, namespace: Option<&str>, local_name: &str) -> ErrorResult {
        let element = self.element_payload()?;
        if let Some(attr_node) = element.find_attr_ns(namespace, local_name) {
            let _scope = CeReactionsScope::enter(&self.node_document());
            remove_attribute_node_internal(self, &attr_node);
        }
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#dom-element-toggleattribute>
    pub fn toggle_attribute(&self, qualified_name: &str, force: Option<bool>) -> Fallible<bool> {
        let element = self.element_payload()?;
        validate_xml_name(qualified_name)?;
        match element.find_attr(qualified_name) {
            Some(attr_node) => match force {
                Some(true) => Ok(true),
                _ => {
                    let _scope = CeReactionsScope::enter(&self.node_document());
                    remove_attribute_node_internal(self, &attr_node);
                    Ok(false)
                },
            },
            None => match force {
                Some(false) => Ok(false),
                _ => {
                    self.set_attribute(qualified_name, "")?;
                    Ok(true)
                },
            },
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-element-hasattribute>
    pub fn has_attribute(&self, qualified_name: &str) -> bool {
        self.as_element()
            .map(|element| element.find_attr(qualified_name).is_some())
            .unwrap_or(false)
    }

    pub fn has_attribute_ns(&self, namespace: Option<&str>, local_name: &str) -> bool {
        self.as_element()
            .map(|element| element.find_attr_ns(namespace, local_name).is_some())
            .unwrap_or(false)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-hasattributes>
    pub fn has_attributes(&self) -> bool {
        self.as_element()
            .map(|element| element.attr_count() > 0)
            .unwrap_or(false)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-getattributenames>
    pub fn attribute_names(&self) -> Vec<String> {
        match self.as_element() {
            Some(element) => element
                .attrs()
                .iter()
                .map(|attr_node| {
                    attr_node
                        .as_attr()
                        .expect("attribute node")
                        .qualified_name()
                        .as_str()
                        .to_owned()
                })
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn get_attribute_node(&self, qualified_name: &str) -> Option<NodeRef> {
        self.as_element()
            .and_then(|element| element.find_attr(qualified_name))
    }

    pub fn get_attribute_node_ns(
        &self,
        namespace: Option<&str>,
        local_name: &str,
    ) -> Option<NodeRef> {
        self.as_element()
            .and_then(|element| element.find_attr_ns(namespace, local_name))
    }

    /// <https://dom.spec.whatwg.org/#concept-element-attributes-set>
    pub fn set_attribute_node(&self, attr_node: &NodeRef) -> Fallible<Option<NodeRef>> {
        let element = self.element_payload()?;
        let attr = attr_node.as_attr().ok_or(Error::InvalidNodeType)?;
        if let Some(owner) = attr.owner_element() {
            if &owner != self {
                return Err(Error::InUseAttribute);
            }
            return Ok(Some(attr_node.clone()));
        }
        let _scope = CeReactionsScope::enter(&self.node_document());
        let old = element.find_attr_ns(
            attr.namespace().as_ref().map(Atom::as_str),
            attr.local_name().as_str(),
        );
        if let Some(old_node) = &old {
            replace_attribute(self, old_node, attr_node);
        } else {
            append_attribute(self, attr_node)?;
        }
        Ok(old)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-removeattributenode>
    pub fn remove_attribute_node(&self, attr_node: &NodeRef) -> Fallible<NodeRef> {
        let element = self.element_payload()?;
        let owned = element
            .attrs
            .borrow()
            .iter()
            .any(|candidate| candidate == attr_node);
        if !owned {
            return Err(Error::NotFound);
        }
        let _scope = CeReactionsScope::enter(&self.node_document());
        remove_attribute_node_internal(self, attr_node);
        Ok(attr_node.clone())
    }

    /// <https://dom.spec.whatwg.org/#dom-element-id>
    pub fn id(&self) -> String {
        self.get_attribute("id").unwrap_or_default()
    }

    /// <https://dom.spec.whatwg.org/#dom-element-classname>
    pub fn class_name(&self) -> String {
        self.get_attribute("class").unwrap_or_default()
    }

    /// The `[SameObject]` attributes map.
    /// <https://dom.spec.whatwg.org/#dom-element-attributes>
    pub fn attributes(&self) -> Fallible<NamedNodeMap> {
        let element = self.element_payload()?;
        if let Some(map) = element.attr_map.borrow().as_ref() {
            return Ok(map.clone());
        }
        let map = NamedNodeMap::new(self);
        *element.attr_map.borrow_mut() = Some(map.clone());
        Ok(map)
    }

    /// The `[SameObject]` classList view.
    /// <https://dom.spec.whatwg.org/#dom-element-classlist>
    pub fn class_list(&self) -> Fallible<DomTokenList> {
        let element = self.element_payload()?;
        if let Some(list) = element.class_list_cache().borrow().as_ref() {
            return Ok(list.clone());
        }
        let list = DomTokenList::new(self, "class");
        *element.class_list_cache().borrow_mut() = Some(list.clone());
        Ok(list)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-attachshadow>
    pub fn attach_shadow(
        &self,
        mode: ShadowRootMode,
        delegates_focus: bool,
        slot_assignment: SlotAssignmentMode,
    ) -> Fallible<NodeRef> {
        let element = self.element_payload()?;
        if element.shadow_root().is_some() {
            return Err(Error::NotSupported);
        }
        let document = self.node_document();
        let shadow = ShadowRoot::new_node(&document, self, mode, delegates_focus, slot_assignment);
        element.set_shadow_root_slot(Some(shadow.clone()));
        if self.is_connected() {
            crate::node::note_shadow_tree_connected(&shadow);
        }
        if let Some(doc) = document.as_document() {
            doc.note_mutation();
        }
        Ok(shadow)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-insertadjacentelement>
    pub fn insert_adjacent_element(
        &self,
        where_: AdjacentPosition,
        element: &NodeRef,
    ) -> Fallible<Option<NodeRef>> {
        self.insert_adjacent(where_, element)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-insertadjacenttext>
    pub fn insert_adjacent_text(&self, where_: AdjacentPosition, data: &str) -> ErrorResult {
        let text = self.node_document().create_text_node(data)?;
        self.insert_adjacent(where_, &text).map(|_| ())
    }

    /// <https://dom.spec.whatwg.org/#insert-adjacent>
    fn insert_adjacent(
        &self,
        where_: AdjacentPosition,
        node: &NodeRef,
    ) -> Fallible<Option<NodeRef>> {
        let _scope = CeReactionsScope::enter(&self.node_document());
        match where_ {
            AdjacentPosition::BeforeBegin | AdjacentPosition::AfterEnd => {
                // With no parent there is nowhere to insert; this is a no-op,
                // not an error.
                let parent = match self.parent_node() {
                    Some(parent) => parent,
                    None => return Ok(None),
                };
                match where_ {
                    AdjacentPosition::BeforeBegin => parent.pre_insert(node, Some(self)).map(Some),
                    _ => parent
                        .pre_insert(node, self.next_sibling().as_ref())
                        .map(Some),
                }
            },
            AdjacentPosition::AfterBegin => self
                .pre_insert(node, self.first_child().as_ref())
                .map(Some),
            AdjacentPosition::BeforeEnd => self.pre_insert(node, None).map(Some),
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-element-getelementsbytagname>
    pub fn get_elements_by_tag_name(&self, qualified_name: &str) -> HtmlCollection {
        HtmlCollection::by_qualified_name(self, qualified_name)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-getelementsbytagnamens>
    pub fn get_elements_by_tag_name_ns(
        &self,
        namespace: Option<&str>,
        local_name: &str,
    ) -> HtmlCollection {
        HtmlCollection::by_ns_and_local(self, namespace, local_name)
    }

    /// <https://dom.spec.whatwg.org/#dom-element-getelementsbyclassname>
    pub fn get_elements_by_class_name(&self, class_names: &str) -> HtmlCollection {
        HtmlCollection::by_class_names(self, class_names)
    }
}

/// <https://dom.spec.whatwg.org/#dom-element-insertadjacentelement>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdjacentPosition {
    BeforeBegin,
    AfterBegin,
    BeforeEnd,
    AfterEnd,
}

impl AdjacentPosition {
    pub fn parse(position: &str) -> Fallible<AdjacentPosition> {
        if position.eq_ignore_ascii_case("beforebegin") {
            Ok(AdjacentPosition::BeforeBegin)
        } else if position.eq_ignore_ascii_case("afterbegin") {
            Ok(AdjacentPosition::AfterBegin)
        } else if position.eq_ignore_ascii_case("beforeend") {
            Ok(AdjacentPosition::BeforeEnd)
        } else if position.eq_ignore_ascii_case("afterend") {
            Ok(AdjacentPosition::AfterEnd)
        } else {
            Err(Error::Syntax)
        }
    }
}

/// <https://dom.spec.whatwg.org/#concept-element-attributes-change>
pub(crate) fn change_attribute(
    element_node: &NodeRef,
    attr_node: &NodeRef,
    value: &str,
) -> ErrorResult {
    let document = element_node.node_document();
    let doc = document.as_document().expect("document payload");
    let attr = attr_node.as_attr().expect("attribute node");
    let old = attr.value();
    let new = doc.intern(value);
    attr.set_value_atom(new.clone());
    attribute_mutated(
        element_node,
        &attr.local_name(),
        attr.namespace().as_ref(),
        Some(old),
        Some(new),
    );
    Ok(())
}

/// <https://dom.spec.whatwg.org/#concept-element-attributes-append>
pub(crate) fn append_attribute(element_node: &NodeRef, attr_node: &NodeRef) -> ErrorResult {
    let element = element_node.as_element().expect("element node");
    let document = element_node.node_document();
    let doc = document.as_document().expect("document payload");
    if element.attr_count() >= doc.limits().max_attributes_per_element {
        log::warn!(
            "attribute quota exceeded on <{}>",
            element.qualified_name()
        );
        return Err(Error::QuotaExceeded);
    }
    let attr = attr_node.as_attr().expect("attribute node");
    attr.set_owner_element(Some(element_node));
    element.attrs.borrow_mut().push(attr_node.clone());
    let new = attr.value();
    attribute_mutated(
        element_node,
        &attr.local_name(),
        attr.namespace().as_ref(),
        None,
        Some(new),
    );
    Ok(())
}

/// <https://dom.spec.whatwg.org/#concept-element-attributes-replace>
pub(crate) fn replace_attribute(element_node: &NodeRef, old_node: &NodeRef, new_node: &NodeRef) {
    let element = element_node.as_element().expect("element node");
    let old_attr = old_node.as_attr().expect("attribute node");
    let new_attr = new_node.as_attr().expect("attribute node");
    {
        let mut attrs = element.attrs.borrow_mut();
        if let Some(position) = attrs.iter().position(|candidate| candidate == old_node) {
            attrs[position] = new_node.clone();
        }
    }
    old_attr.set_owner_element(None);
    new_attr.set_owner_element(Some(element_node));
    attribute_mutated(
        element_node,
        &new_attr.local_name(),
        new_attr.namespace().as_ref(),
        Some(old_attr.value()),
        Some(new_attr.value()),
    );
}

/// <https://dom.spec.whatwg.org/#concept-element-attributes-remove>
pub(crate) fn remove_attribute_node_internal(element_node: &NodeRef, attr_node: &NodeRef) {
    let element = element_node.as_element().expect("element node");
    let attr = attr_node.as_attr().expect("attribute node");
    {
        let mut attrs = element.attrs.borrow_mut();
        if let Some(position) = attrs.iter().position(|candidate| candidate == attr_node) {
            attrs.remove(position);
        }
    }
    attr.set_owner_element(None);
    attribute_mutated(
        element_node,
        &attr.local_name(),
        attr.namespace().as_ref(),
        Some(attr.value()),
        None,
    );
}

/// The shared tail of every attribute mutation: mutation record,
/// `attributeChanged` reaction, index and bloom upkeep, generation bump.
fn attribute_mutated(
    element_node: &NodeRef,
    local: &Atom,
    namespace: Option<&Atom>,
    old: Option<Atom>,
    new: Option<Atom>,
) {
    let element = element_node.as_element().expect("element node");
    let document = element_node.node_document();

    mutationobserver::queue_attribute_mutation_record(
        element_node,
        local,
        namespace,
        old.as_ref().map(|value| value.as_str().to_owned()),
    );

    customelementregistry::enqueue_callback_reaction(
        element_node,
        CustomElementReaction::AttributeChanged {
            name: local.clone(),
            old_value: old.as_ref().map(|value| value.as_str().to_owned()),
            new_value: new.as_ref().map(|value| value.as_str().to_owned()),
            namespace: namespace.map(|ns| ns.as_str().to_owned()),
        },
    );

    if namespace.is_none() {
        let indexed = element_node.is_connected() &&
            !element_node.flags().contains(NodeFlags::IS_IN_SHADOW_TREE);
        if local.as_str() == "id" {
            if let Some(doc) = document.as_document() {
                if indexed {
                    doc.refresh_element_id(element_node, old.as_ref(), new.as_ref());
                }
            }
        } else if local.as_str() == "class" {
            element.recompute_class_bloom();
            if let Some(doc) = document.as_document() {
                if indexed {
                    doc.refresh_element_classes(
                        element_node,
                        old.as_ref().map(Atom::as_str),
                        new.as_ref().map(Atom::as_str),
                    );
                }
            }
        }
    }

    if let Some(doc) = document.as_document() {
        doc.note_mutation();
    }
}

/// Copies `source`'s attributes onto a freshly cloned element. The clone is
/// detached, so no records, reactions or index updates apply yet.
pub(crate) fn copy_attributes(
    source: &Element,
    target_node: &NodeRef,
    target_pool: &Document,
) -> ErrorResult {
    let target = target_node.as_element().expect("element node");
    let target_document = target_node.node_document();
    for attr_node in source.attrs() {
        let attr = attr_node.as_attr().expect("attribute node");
        let name = QualName {
            namespace: attr
                .namespace()
                .map(|ns| target_pool.intern(ns.as_str())),
            prefix: attr.prefix().map(|p| target_pool.intern(p.as_str())),
            local: target_pool.intern(attr.local_name().as_str()),
        };
        let value = target_pool.intern(attr.value().as_str());
        let copy = Attr::new_node(&target_document, name, value);
        copy.as_attr()
            .expect("attribute node")
            .set_owner_element(Some(target_node));
        target.attrs.borrow_mut().push(copy);
    }
    target.recompute_class_bloom();
    Ok(())
}

/// The element half of `isEqualNode`.
pub(crate) fn is_equal_element(a: &Element, b: &Element) -> bool {
    let names_equal = {
        let a_name = a.name.borrow();
        let b_name = b.name.borrow();
        opt_atom_text_eq(a_name.namespace.as_ref(), b_name.namespace.as_ref()) &&
            opt_atom_text_eq(a_name.prefix.as_ref(), b_name.prefix.as_ref()) &&
            a_name.local.text_eq(&b_name.local)
    };
    if !names_equal || a.attr_count() != b.attr_count() {
        return false;
    }
    a.attrs().iter().zip(b.attrs()).all(|(x, y)| {
        let x = x.as_attr().expect("attribute node");
        let y = y.as_attr().expect("attribute node");
        opt_atom_text_eq(x.namespace().as_ref(), y.namespace().as_ref()) &&
            x.local_name().text_eq(&y.local_name()) &&
            x.value().text_eq(&y.value())
    })
}

fn opt_atom_text_eq(a: Option<&Atom>, b: Option<&Atom>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.text_eq(b),
        (None, None) => true,
        _ => false,
    }
}
