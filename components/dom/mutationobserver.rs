/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! MutationObserver, MutationRecord and the queueing half of the mutation
//! funnel.
//!
//! The funnel calls one of the `queue_*` functions below after every
//! mutation. Interested observers are found by walking the target's
//! inclusive ancestors; each gets its own record (old values are
//! per-observer) appended to a bounded queue. Delivery is host-driven: the
//! first record queued after a drain asks the host to schedule one via the
//! document's drain hook, and [`notify_observers`] hands each observer its
//! batch.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use log::warn;

use crate::atom::Atom;
use crate::error::{Error, ErrorResult, Fallible};
use crate::node::{NodeFlags, NodeRef, WeakNodeRef};

/// Records pending per observer before the oldest get dropped.
const MAX_PENDING_RECORDS: usize = 4096;

/// <https://dom.spec.whatwg.org/#mutationrecord>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MutationRecordType {
    ChildList,
    Attributes,
    CharacterData,
}

impl MutationRecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationRecordType::ChildList => "childList",
            MutationRecordType::Attributes => "attributes",
            MutationRecordType::CharacterData => "characterData",
        }
    }
}

struct MutationRecordData {
    type_: MutationRecordType,
    target: NodeRef,
    added_nodes: Vec<NodeRef>,
    removed_nodes: Vec<NodeRef>,
    previous_sibling: Option<NodeRef>,
    next_sibling: Option<NodeRef>,
    attribute_name: Option<String>,
    attribute_namespace: Option<String>,
    old_value: Option<String>,
}

/// <https://dom.spec.whatwg.org/#mutationrecord>
#[derive(Clone)]
pub struct MutationRecord(Rc<MutationRecordData>);

impl MutationRecord {
    pub fn record_type(&self) -> MutationRecordType {
        self.0.type_
    }

    pub fn target(&self) -> NodeRef {
        self.0.target.clone()
    }

    pub fn added_nodes(&self) -> &[NodeRef] {
        &self.0.added_nodes
    }

    pub fn removed_nodes(&self) -> &[NodeRef] {
        &self.0.removed_nodes
    }

    pub fn previous_sibling(&self) -> Option<NodeRef> {
        self.0.previous_sibling.clone()
    }

    pub fn next_sibling(&self) -> Option<NodeRef> {
        self.0.next_sibling.clone()
    }

    pub fn attribute_name(&self) -> Option<&str> {
        self.0.attribute_name.as_deref()
    }

    pub fn attribute_namespace(&self) -> Option<&str> {
        self.0.attribute_namespace.as_deref()
    }

    pub fn old_value(&self) -> Option<&str> {
        self.0.old_value.as_deref()
    }
}

/// <https://dom.spec.whatwg.org/#dictdef-mutationobserverinit>
#[derive(Clone, Debug, Default)]
pub struct ObserverInit {
    pub child_list: bool,
    pub attributes: Option<bool>,
    pub attribute_filter: Option<Vec<String>>,
    pub attribute_old_value: Option<bool>,
    pub character_data: Option<bool>,
    pub character_data_old_value: Option<bool>,
    pub subtree: bool,
}

/// The resolved form of [`ObserverInit`] stored on the node.
#[derive(Clone, Debug)]
pub(crate) struct ObserverOptions {
    pub child_list: bool,
    pub attributes: bool,
    pub attribute_filter: Option<Vec<String>>,
    pub attribute_old_value: bool,
    pub character_data: bool,
    pub character_data_old_value: bool,
    pub subtree: bool,
}

impl ObserverInit {
    /// <https://dom.spec.whatwg.org/#dom-mutationobserver-observe> steps 1-5.
    fn resolve(&self) -> Fallible<ObserverOptions> {
        let attributes = self.attributes.unwrap_or(
            self.attribute_old_value.is_some() || self.attribute_filter.is_some(),
        );
        let character_data = self
            .character_data
            .unwrap_or(self.character_data_old_value.is_some());
        if !self.child_list && !attributes && !character_data {
            return Err(Error::Syntax);
        }
        if self.attribute_old_value == Some(true) && !attributes {
            return Err(Error::Syntax);
        }
        if self.attribute_filter.is_some() && !attributes {
            return Err(Error::Syntax);
        }
        if self.character_data_old_value == Some(true) && !character_data {
            return Err(Error::Syntax);
        }
        Ok(ObserverOptions {
            child_list: self.child_list,
            attributes,
            attribute_filter: self.attribute_filter.clone(),
            attribute_old_value: self.attribute_old_value.unwrap_or(false),
            character_data,
            character_data_old_value: self.character_data_old_value.unwrap_or(false),
            subtree: self.subtree,
        })
    }
}

/// A registration of one observer on one node, stored in the node's rare
/// data.
pub(crate) struct RegisteredObserver {
    pub observer: MutationObserver,
    pub options: ObserverOptions,
}

/// The batch callback. Invoked with the drained records and the observer
/// itself (for re-observation from inside the callback).
pub type MutationCallback = Rc<dyn Fn(&[MutationRecord], &MutationObserver)>;

struct MutationObserverData {
    callback: MutationCallback,
    queue: RefCell<VecDeque<MutationRecord>>,
    dropped: Cell<u64>,
    observed: RefCell<Vec<WeakNodeRef>>,
}

/// <https://dom.spec.whatwg.org/#mutationobserver>
#[derive(Clone)]
pub struct MutationObserver(Rc<MutationObserverData>);

impl PartialEq for MutationObserver {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl MutationObserver {
    /// <https://dom.spec.whatwg.org/#dom-mutationobserver-mutationobserver>
    pub fn new(callback: MutationCallback) -> MutationObserver {
        MutationObserver(Rc::new(MutationObserverData {
            callback,
            queue: RefCell::new(VecDeque::new()),
            dropped: Cell::new(0),
            observed: RefCell::new(Vec::new()),
        }))
    }

    /// <https://dom.spec.whatwg.org/#dom-mutationobserver-observe>
    pub fn observe(&self, target: &NodeRef, init: &ObserverInit) -> ErrorResult {
        let options = init.resolve()?;
        {
            let mut rare = target.rare_data_mut();
            match rare
                .registered_observers
                .iter_mut()
                .find(|registered| registered.observer == *self)
            {
                Some(registered) => registered.options = options,
                None => rare.registered_observers.push(RegisteredObserver {
                    observer: self.clone(),
                    options,
                }),
            }
        }
        target.set_flag(NodeFlags::HAS_MUTATION_OBSERVERS, true);
        let mut observed = self.0.observed.borrow_mut();
        if !observed
            .iter()
            .any(|entry| entry.upgrade().as_ref() == Some(target))
        {
            observed.push(target.downgrade());
        }
        // Join the document's roster so a drain can find us.
        let document = target.node_document();
        if let Some(doc) = document.as_document() {
            let mut roster = doc.observers.borrow_mut();
            if !roster.iter().any(|observer| observer == self) {
                roster.push(self.clone());
            }
        }
        Ok(())
    }

    /// <https://dom.spec.whatwg.org/#dom-mutationobserver-disconnect>
    pub fn disconnect(&self) {
        for node in self.0.observed.borrow_mut().drain(..) {
            if let Some(node) = node.upgrade() {
                let mut rare = node.rare_data_mut();
                rare.registered_observers
                    .retain(|registered| registered.observer != *self);
            }
        }
        self.0.queue.borrow_mut().clear();
    }

    /// <https://dom.spec.whatwg.org/#dom-mutationobserver-takerecords>
    pub fn take_records(&self) -> Vec<MutationRecord> {
        self.0.queue.borrow_mut().drain(..).collect()
    }

    fn enqueue(&self, record: MutationRecord, document: &NodeRef) {
        {
            let mut queue = self.0.queue.borrow_mut();
            if queue.len() >= MAX_PENDING_RECORDS {
                queue.pop_front();
                self.0.dropped.set(self.0.dropped.get() + 1);
                warn!(
                    "mutation record queue overflow; {} records dropped so far",
                    self.0.dropped.get()
                );
            }
            queue.push_back(record);
        }
        if let Some(doc) = document.as_document() {
            if !doc.observer_drain_pending.get() {
                doc.observer_drain_pending.set(true);
                let hook = doc.observer_drain_hook.borrow().clone();
                if let Some(hook) = hook {
                    hook();
                }
            }
        }
    }
}

/// Delivers every pending batch for the document's observers. Hosts call
/// this from the task their drain hook scheduled; tests call it directly.
/// <https://dom.spec.whatwg.org/#notify-mutation-observers>
pub fn notify_observers(document: &NodeRef) {
    let doc = match document.as_document() {
        Some(doc) => doc,
        None => return,
    };
    doc.observer_drain_pending.set(false);
    let observers: Vec<MutationObserver> = doc.observers.borrow().clone();
    for observer in observers {
        let records = observer.take_records();
        if !records.is_empty() {
            (observer.0.callback.clone())(&records, &observer);
        }
    }
}

/// Finds the observers interested in a mutation of `kind` at `target`,
/// walking the inclusive ancestor chain for `subtree` registrations.
/// <https://dom.spec.whatwg.org/#queueing-a-mutation-record>
fn interested_observers(
    target: &NodeRef,
    for_each: &mut impl FnMut(&MutationObserver, &ObserverOptions),
) {
    let document = target.node_document();
    match document.as_document() {
        Some(doc) if !doc.observers.borrow().is_empty() => {},
        _ => return,
    }
    for ancestor in target.inclusive_ancestors() {
        if !ancestor.flags().contains(NodeFlags::HAS_MUTATION_OBSERVERS) {
            continue;
        }
        let rare = match ancestor.rare_data() {
            Some(rare) => rare,
            None => continue,
        };
        for registered in &rare.registered_observers {
            if &ancestor != target && !registered.options.subtree {
                continue;
            }
            for_each(&registered.observer, &registered.options);
        }
    }
}

/// Queues one `childList` record describing an insertion and/or removal.
pub(crate) fn queue_tree_mutation_record(
    target: &NodeRef,
    added: &[NodeRef],
    removed: &[NodeRef],
    previous_sibling: Option<NodeRef>,
    next_sibling: Option<NodeRef>,
) {
    let document = target.node_document();
    let mut receivers: Vec<MutationObserver> = Vec::new();
    interested_observers(target, &mut |observer, options| {
        if options.child_list && !receivers.iter().any(|existing| existing == observer) {
            receivers.push(observer.clone());
        }
    });
    for observer in receivers {
        let record = MutationRecord(Rc::new(MutationRecordData {
            type_: MutationRecordType::ChildList,
            target: target.clone(),
            added_nodes: added.to_vec(),
            removed_nodes: removed.to_vec(),
            previous_sibling: previous_sibling.clone(),
            next_sibling: next_sibling.clone(),
            attribute_name: None,
            attribute_namespace: None,
            old_value: None,
        }));
        observer.enqueue(record, &document);
    }
}

/// Queues an `attributes` record. `old_value` is included per observer,
/// depending on its `attributeOldValue` option.
pub(crate) fn queue_attribute_mutation_record(
    target: &NodeRef,
    local_name: &Atom,
    namespace: Option<&Atom>,
    old_value: Option<String>,
) {
    let document = target.node_document();
    let mut receivers: Vec<(MutationObserver, bool)> = Vec::new();
    interested_observers(target, &mut |observer, options| {
        if !options.attributes {
            return;
        }
        if let Some(filter) = &options.attribute_filter {
            if namespace.is_some() || !filter.iter().any(|name| local_name.as_str() == name) {
                return;
            }
        }
        if !receivers.iter().any(|(existing, _)| existing == observer) {
            receivers.push((observer.clone(), options.attribute_old_value));
        }
    });
    for (observer, wants_old_value) in receivers {
        let record = MutationRecord(Rc::new(MutationRecordData {
            type_: MutationRecordType::Attributes,
            target: target.clone(),
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(local_name.as_str().to_owned()),
            attribute_namespace: namespace.map(|ns| ns.as_str().to_owned()),
            old_value: wants_old_value.then(|| old_value.clone()).flatten(),
        }));
        observer.enqueue(record, &document);
    }
}

/// Queues a `characterData` record.
pub(crate) fn queue_character_data_mutation_record(target: &NodeRef, old_value: String) {
    let document = target.node_document();
    let mut receivers: Vec<(MutationObserver, bool)> = Vec::new();
    interested_observers(target, &mut |observer, options| {
        if !options.character_data {
            return;
        }
        if !receivers.iter().any(|(existing, _)| existing == observer) {
            receivers.push((observer.clone(), options.character_data_old_value));
        }
    });
    for (observer, wants_old_value) in receivers {
        let record = MutationRecord(Rc::new(MutationRecordData {
            type_: MutationRecordType::CharacterData,
            target: target.clone(),
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            attribute_namespace: None,
            old_value: wants_old_value.then(|| old_value.clone()),
        }));
        observer.enqueue(record, &document);
    }
}
