/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! HTMLCollection: live, generation-cached element collections.
//!
//! Document-scoped tag and class collections read the accelerator indexes
//! and therefore come back in registration order; subtree-scoped ones walk
//! the tree and come back in tree order.

use std::cell::RefCell;
use std::rc::Rc;

use crate::node::{NodeRef, WeakNodeRef};

enum CollectionSource {
    /// Walks `root`'s descendants applying `filter`.
    Subtree {
        root: WeakNodeRef,
        filter: CollectionFilter,
    },
    /// Reads the document tag index.
    DocumentTag {
        document: WeakNodeRef,
        name: String,
    },
    /// Intersects document class index buckets.
    DocumentClass {
        document: WeakNodeRef,
        names: Vec<String>,
    },
}

enum CollectionFilter {
    /// `*` matches every element.
    QualifiedName(String),
    /// Namespace (`None` = no namespace, `Some("*")` = any) plus local
    /// name (`*` = any).
    NamespaceLocal(Option<String>, String),
    ClassNames(Vec<String>),
}

struct HtmlCollectionData {
    source: CollectionSource,
    cache: RefCell<CollectionCache>,
}

#[derive(Default)]
struct CollectionCache {
    generation: u64,
    valid: bool,
    items: Vec<WeakNodeRef>,
}

/// <https://dom.spec.whatwg.org/#htmlcollection>
#[derive(Clone)]
pub struct HtmlCollection(Rc<HtmlCollectionData>);

impl HtmlCollection {
    pub(crate) fn by_qualified_name(root: &NodeRef, name: &str) -> HtmlCollection {
        HtmlCollection::new(CollectionSource::Subtree {
            root: root.downgrade(),
            filter: CollectionFilter::QualifiedName(name.to_owned()),
        })
    }

    pub(crate) fn by_ns_and_local(
        root: &NodeRef,
        namespace: Option<&str>,
        local_name: &str,
    ) -> HtmlCollection {
        HtmlCollection::new(CollectionSource::Subtree {
            root: root.downgrade(),
            filter: CollectionFilter::NamespaceLocal(
                namespace.filter(|ns| !ns.is_empty()).map(str::to_owned),
                local_name.to_owned(),
            ),
        })
    }

    pub(crate) fn by_class_names(root: &NodeRef, names: &str) -> HtmlCollection {
        HtmlCollection::new(CollectionSource::Subtree {
            root: root.downgrade(),
            filter: CollectionFilter::ClassNames(
                names.split_ascii_whitespace().map(str::to_owned).collect(),
            ),
        })
    }

    pub(crate) fn document_by_tag(document: &NodeRef, name: &str) -> HtmlCollection {
        if name == "*" || name.contains(':') {
            // The universal form has no single bucket to read, and the tag
            // index is keyed by local name, so prefixed lookups walk.
            return HtmlCollection::by_qualified_name(document, name);
        }
        HtmlCollection::new(CollectionSource::DocumentTag {
            document: document.downgrade(),
            name: name.to_owned(),
        })
    }

    pub(crate) fn document_by_class(document: &NodeRef, names: &str) -> HtmlCollection {
        HtmlCollection::new(CollectionSource::DocumentClass {
            document: document.downgrade(),
            names: names.split_ascii_whitespace().map(str::to_owned).collect(),
        })
    }

    fn new(source: CollectionSource) -> HtmlCollection {
        HtmlCollection(Rc::new(HtmlCollectionData {
            source,
            cache: RefCell::new(CollectionCache::default()),
        }))
    }

    /// <https://dom.spec.whatwg.org/#dom-htmlcollection-length>
    pub fn length(&self) -> u32 {
        self.refresh();
        self.0.cache.borrow().items.len() as u32
    }

    /// <https://dom.spec.whatwg.org/#dom-htmlcollection-item>
    pub fn item(&self, index: u32) -> Option<NodeRef> {
        self.refresh();
        self.0
            .cache
            .borrow()
            .items
            .get(index as usize)
            .and_then(WeakNodeRef::upgrade)
    }

    /// <https://dom.spec.whatwg.org/#dom-htmlcollection-nameditem>
    pub fn named_item(&self, name: &str) -> Option<NodeRef> {
        if name.is_empty() {
            return None;
        }
        self.refresh();
        self.0
            .cache
            .borrow()
            .items
            .iter()
            .filter_map(WeakNodeRef::upgrade)
            .find(|node| match node.as_element() {
                Some(element) => {
                    element.get_attr_value("id").as_deref() == Some(name) ||
                        element.get_attr_value("name").as_deref() == Some(name)
                },
                None => false,
            })
    }

    pub fn to_vec(&self) -> Vec<NodeRef> {
        self.refresh();
        self.0
            .cache
            .borrow()
            .items
            .iter()
            .filter_map(WeakNodeRef::upgrade)
            .collect()
    }

    fn anchor(&self) -> Option<NodeRef> {
        match &self.0.source {
            CollectionSource::Subtree { root, .. } => root.upgrade(),
            CollectionSource::DocumentTag { document, .. } |
            CollectionSource::DocumentClass { document, .. } => document.upgrade(),
        }
    }

    fn refresh(&self) {
        let anchor = match self.anchor() {
            Some(anchor) => anchor,
            None => {
                let mut cache = self.0.cache.borrow_mut();
                cache.items.clear();
                cache.valid = true;
                return;
            },
        };
        let generation = anchor
            .node_document()
            .as_document()
            .map(|doc| doc.generation())
            .unwrap_or(0);
        {
            let cache = self.0.cache.borrow();
            if cache.valid && cache.generation == generation {
                return;
            }
        }
        let items = self.materialize(&anchor);
        let mut cache = self.0.cache.borrow_mut();
        cache.items = items;
        cache.generation = generation;
        cache.valid = true;
    }

    fn materialize(&self, anchor: &NodeRef) -> Vec<WeakNodeRef> {
        match &self.0.source {
            CollectionSource::Subtree { filter, .. } => anchor
                .descendants()
                .filter(|node| match node.as_element() {
                    Some(element) => match filter {
                        CollectionFilter::QualifiedName(name) => {
                            name == "*" || element.qualified_name() == **name
                        },
                        CollectionFilter::NamespaceLocal(namespace, local) => {
                            let element_ns = element.namespace();
                            let ns_matches = match namespace.as_deref() {
                                Some("*") => true,
                                expected => {
                                    element_ns.as_ref().map(|ns| ns.as_str()) == expected
                                },
                            };
                            ns_matches && (local == "*" || element.local_name() == **local)
                        },
                        CollectionFilter::ClassNames(names) => {
                            !names.is_empty() &&
                                names.iter().all(|name| element.has_class(name))
                        },
                    },
                    None => false,
                })
                .map(|node| node.downgrade())
                .collect(),
            CollectionSource::DocumentTag { name, .. } => {
                let doc = match anchor.as_document() {
                    Some(doc) => doc,
                    None => return Vec::new(),
                };
                doc.tag_bucket_snapshot(name)
                    .iter()
                    .map(NodeRef::downgrade)
                    .collect()
            },
            CollectionSource::DocumentClass { names, .. } => {
                let doc = match anchor.as_document() {
                    Some(doc) => doc,
                    None => return Vec::new(),
                };
                match names.split_first() {
                    None => Vec::new(),
                    Some((first, rest)) => doc
                        .class_bucket_snapshot(first)
                        .into_iter()
                        .filter(|node| {
                            let element = node.as_element().expect("class index holds elements");
                            rest.iter().all(|name| element.has_class(name))
                        })
                        .map(|node| node.downgrade())
                        .collect(),
                }
            },
        }
    }
}
