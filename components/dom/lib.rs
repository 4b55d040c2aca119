/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A headless WHATWG DOM core: the refcounted node tree, attribute store
//! and per-document interning, the tree mutation algorithms, accelerator
//! indexes and live collections, a selector engine, event dispatch,
//! mutation observers, custom-element reactions, ranges and traversal.
//!
//! The crate is single-threaded by design; a [`Document`](document::Document)
//! and every node it owns belong to one host thread. Embedders drive
//! callbacks (listeners, observer batches, custom-element reactions, node
//! filters) through plain `Rc<dyn Fn>` trampolines; the C ABI in the
//! `dom_ffi` crate adapts function-pointer pairs onto the same surface.

#![deny(unsafe_code)]

pub mod abortsignal;
pub mod atom;
pub mod attr;
pub mod characterdata;
pub mod customelementregistry;
pub mod document;
pub mod documentfragment;
pub mod documenttype;
pub mod domtokenlist;
pub mod element;
pub mod error;
pub mod event;
pub mod eventtarget;
pub mod htmlcollection;
pub mod mutationobserver;
pub mod namednodemap;
pub mod node;
pub mod nodefilter;
pub mod nodeiterator;
pub mod nodelist;
pub mod range;
pub mod selectors;
pub mod shadowroot;
pub mod treewalker;

pub use abortsignal::{AbortController, AbortSignal};
pub use atom::Atom;
pub use customelementregistry::{
    define as define_custom_element, mark_upgrade_failed, CustomElementReaction, ReactionCallback,
};
pub use document::{Document, DocumentLimits};
pub use element::{AdjacentPosition, CustomElementState, Element, QualName};
pub use error::{Error, ErrorResult, Fallible};
pub use event::{Event, EventInit, EventPhase};
pub use eventtarget::{AddEventListenerOptions, EventCallback};
pub use mutationobserver::{
    notify_observers, MutationObserver, MutationRecord, MutationRecordType, ObserverInit,
};
pub use node::{NodeOrText, NodeRef, WeakNodeRef};
pub use nodefilter::{FilterResult, NodeFilter, WhatToShow};
pub use nodeiterator::NodeIterator;
pub use nodelist::NodeList;
pub use htmlcollection::HtmlCollection;
pub use domtokenlist::DomTokenList;
pub use namednodemap::NamedNodeMap;
pub use range::{Range, StaticRange};
pub use selectors::SelectorList;
pub use shadowroot::{ShadowRootMode, SlotAssignmentMode};
pub use treewalker::TreeWalker;
