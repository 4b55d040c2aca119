/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Custom element definitions and the `[CEReactions]` machinery.
//!
//! Reactions are queued per element and invoked through one host trampoline
//! when the innermost `[CEReactions]` scope exits. Outside any scope the
//! backup queue drains synchronously at enqueue time, since the core has no
//! microtask source of its own.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::atom::Atom;
use crate::element::CustomElementState;
use crate::error::{Error, ErrorResult};
use crate::node::{NodeFlags, NodeRef};

/// One queued reaction.
/// <https://html.spec.whatwg.org/multipage/#concept-custom-element-reaction-queue>
#[derive(Clone)]
pub enum CustomElementReaction {
    Upgrade,
    Connected,
    Disconnected,
    Adopted {
        old_document: NodeRef,
        new_document: NodeRef,
    },
    AttributeChanged {
        name: Atom,
        old_value: Option<String>,
        new_value: Option<String>,
        namespace: Option<String>,
    },
}

/// The host trampoline: receives the element and the reaction, routes to
/// author code.
pub type ReactionCallback = Rc<dyn Fn(&NodeRef, &CustomElementReaction)>;

/// <https://html.spec.whatwg.org/multipage/#custom-element-definition>
pub struct CustomElementDefinition {
    name: Atom,
    observed_attributes: Vec<Atom>,
    callback: ReactionCallback,
}

impl CustomElementDefinition {
    pub fn name(&self) -> &Atom {
        &self.name
    }

    pub fn observes(&self, attribute: &Atom) -> bool {
        self.observed_attributes
            .iter()
            .any(|observed| observed.text_eq(attribute))
    }
}

/// <https://html.spec.whatwg.org/multipage/#customelementregistry>
#[derive(Default)]
pub struct CustomElementRegistry {
    definitions: RefCell<FxHashMap<String, Rc<CustomElementDefinition>>>,
    reaction_stack: RefCell<Vec<Vec<NodeRef>>>,
    backup_queue: RefCell<Vec<NodeRef>>,
    processing_backup_queue: Cell<bool>,
}

impl CustomElementRegistry {
    pub fn get(&self, name: &str) -> Option<Rc<CustomElementDefinition>> {
        self.definitions.borrow().get(name).cloned()
    }
}

/// <https://html.spec.whatwg.org/multipage/#valid-custom-element-name>
fn validate_custom_element_name(name: &str) -> ErrorResult {
    const RESERVED: &[&str] = &[
        "annotation-xml",
        "color-profile",
        "font-face",
        "font-face-src",
        "font-face-uri",
        "font-face-format",
        "font-face-name",
        "missing-glyph",
    ];
    let mut chars = name.chars();
    match chars.next() {
        Some('a'..='z') => {},
        _ => return Err(Error::Syntax),
    }
    let valid_rest = chars.all(|c| {
        matches!(c, 'a'..='z' | '0'..='9' | '-' | '_' | '.') || c as u32 >= 0x80
    });
    if !valid_rest || !name.contains('-') || RESERVED.contains(&name) {
        return Err(Error::Syntax);
    }
    Ok(())
}

/// <https://html.spec.whatwg.org/multipage/#dom-customelementregistry-define>
pub fn define(
    document: &NodeRef,
    name: &str,
    observed_attributes: &[&str],
    callback: ReactionCallback,
) -> ErrorResult {
    let doc = document.as_document().ok_or(Error::InvalidNodeType)?;
    validate_custom_element_name(name)?;
    let registry = &doc.registry;
    if registry.definitions.borrow().contains_key(name) {
        return Err(Error::NotSupported);
    }
    let definition = Rc::new(CustomElementDefinition {
        name: doc.intern(name),
        observed_attributes: observed_attributes
            .iter()
            .map(|attribute| doc.intern(attribute))
            .collect(),
        callback,
    });
    registry
        .definitions
        .borrow_mut()
        .insert(name.to_owned(), definition);
    debug!("defined custom element <{}>", name);
    // Upgrade every element already in the tree with this name.
    let _scope = CeReactionsScope::enter(document);
    document.for_each_shadow_including_inclusive_descendant(&mut |node| {
        if node.is_element() {
            try_upgrade(node);
        }
    });
    Ok(())
}

/// <https://html.spec.whatwg.org/multipage/#concept-try-upgrade>
pub(crate) fn try_upgrade(node: &NodeRef) {
    let element = match node.as_element() {
        Some(element) => element,
        None => return,
    };
    if element.custom_state() != CustomElementState::Undefined ||
        element.definition().is_some()
    {
        return;
    }
    let document = node.node_document();
    let doc = match document.as_document() {
        Some(doc) => doc,
        None => return,
    };
    let definition = match doc.registry.get(element.local_name().as_str()) {
        Some(definition) => definition,
        None => return,
    };
    element.set_definition(definition);
    enqueue_reaction_raw(node, CustomElementReaction::Upgrade);
}

/// Marks an element's upgrade as failed. Called by binding layers whose
/// constructor threw; the element never becomes custom.
pub fn mark_upgrade_failed(node: &NodeRef) {
    if let Some(element) = node.as_element() {
        element.set_custom_state(CustomElementState::Failed);
        node.set_flag(NodeFlags::IS_CUSTOM, false);
    }
}

/// <https://html.spec.whatwg.org/multipage/#enqueue-a-custom-element-callback-reaction>
pub(crate) fn enqueue_callback_reaction(node: &NodeRef, reaction: CustomElementReaction) {
    let element = match node.as_element() {
        Some(element) => element,
        None => return,
    };
    // Only upgraded elements receive callback reactions; pre-upgrade
    // attribute state replays during the upgrade itself.
    if element.custom_state() != CustomElementState::Custom {
        return;
    }
    let definition = match element.definition() {
        Some(definition) => definition,
        None => return,
    };
    if let CustomElementReaction::AttributeChanged { name, .. } = &reaction {
        if !definition.observes(name) {
            return;
        }
    }
    enqueue_reaction_raw(node, reaction);
}

/// Pushes a reaction onto the element's queue and enqueues the element on
/// the current scope's queue (or the backup queue).
/// <https://html.spec.whatwg.org/multipage/#enqueue-an-element-on-the-appropriate-element-queue>
fn enqueue_reaction_raw(node: &NodeRef, reaction: CustomElementReaction) {
    let element = node.as_element().expect("custom element reactions target elements");
    element.reaction_queue.borrow_mut().push_back(reaction);

    let document = node.node_document();
    let doc = match document.as_document() {
        Some(doc) => doc,
        None => return,
    };
    let registry = &doc.registry;
    let in_scope = !registry.reaction_stack.borrow().is_empty();
    if in_scope {
        registry
            .reaction_stack
            .borrow_mut()
            .last_mut()
            .expect("non-empty reaction stack")
            .push(node.clone());
        return;
    }
    registry.backup_queue.borrow_mut().push(node.clone());
    if registry.processing_backup_queue.get() {
        return;
    }
    // No scope and no microtask source: drain the backup queue in place.
    registry.processing_backup_queue.set(true);
    let mut index = 0;
    loop {
        let next = registry.backup_queue.borrow().get(index).cloned();
        match next {
            Some(element_node) => {
                invoke_reactions(&element_node);
                index += 1;
            },
            None => break,
        }
    }
    registry.backup_queue.borrow_mut().clear();
    registry.processing_backup_queue.set(false);
}

/// Runs every queued reaction for one element, FIFO. Reactions enqueued by
/// a running reaction (upgrade does this) are picked up in the same pass.
fn invoke_reactions(node: &NodeRef) {
    let element = match node.as_element() {
        Some(element) => element,
        None => return,
    };
    loop {
        let reaction = element.reaction_queue.borrow_mut().pop_front();
        let reaction = match reaction {
            Some(reaction) => reaction,
            None => break,
        };
        match &reaction {
            CustomElementReaction::Upgrade => upgrade(node),
            _ => {
                if let Some(definition) = element.definition() {
                    (definition.callback)(node, &reaction);
                }
            },
        }
    }
}

/// <https://html.spec.whatwg.org/multipage/#upgrades>
fn upgrade(node: &NodeRef) {
    let element = node.as_element().expect("upgrade targets elements");
    let definition = match element.definition() {
        Some(definition) => definition,
        None => return,
    };
    element.set_custom_state(CustomElementState::Custom);
    node.set_flag(NodeFlags::IS_CUSTOM, true);
    // Existing attributes replay through attributeChanged, then the element
    // connects, all behind the upgrade in this element's queue.
    for attr_node in element.attrs() {
        let attr = attr_node.as_attr().expect("attribute node");
        let local = attr.local_name();
        if definition.observes(&local) {
            element
                .reaction_queue
                .borrow_mut()
                .push_back(CustomElementReaction::AttributeChanged {
                    name: local,
                    old_value: None,
                    new_value: Some(attr.value().as_str().to_owned()),
                    namespace: attr.namespace().map(|ns| ns.as_str().to_owned()),
                });
        }
    }
    if node.is_connected() {
        element
            .reaction_queue
            .borrow_mut()
            .push_back(CustomElementReaction::Connected);
    }
    debug!("upgraded <{}>", definition.name());
    (definition.callback)(node, &CustomElementReaction::Upgrade);
}

/// A `[CEReactions]` scope. Entering pushes an element queue; dropping
/// drains it FIFO and invokes the queued reactions.
/// <https://html.spec.whatwg.org/multipage/#cereactions>
pub(crate) struct CeReactionsScope {
    document: NodeRef,
}

impl CeReactionsScope {
    pub(crate) fn enter(document: &NodeRef) -> CeReactionsScope {
        if let Some(doc) = document.as_document() {
            doc.registry.reaction_stack.borrow_mut().push(Vec::new());
        }
        CeReactionsScope {
            document: document.clone(),
        }
    }
}

impl Drop for CeReactionsScope {
    fn drop(&mut self) {
        let doc = match self.document.as_document() {
            Some(doc) => doc,
            None => return,
        };
        let registry = &doc.registry;
        // Drain with a running index: reactions enqueued while we drain
        // land on this same queue and are picked up before the pop.
        let mut index = 0;
        loop {
            let next = {
                let stack = registry.reaction_stack.borrow();
                match stack.last() {
                    Some(queue) => queue.get(index).cloned(),
                    None => None,
                }
            };
            match next {
                Some(element_node) => {
                    invoke_reactions(&element_node);
                    index += 1;
                },
                None => break,
            }
        }
        registry.reaction_stack.borrow_mut().pop();
    }
}
