/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The C ABI over the `dom` crate.
//!
//! Conventions:
//!
//! - Handles are opaque pointers. Node handles share one type regardless of
//!   interface; the underlying node is type-checked by the core and misuse
//!   reports `InvalidNodeType`. Every handle returned from a function is
//!   owned: release it with the matching `_release`/`_free`. `_acquire`
//!   duplicates an owned reference.
//! - Strings cross the boundary as UTF-8 `(pointer, length)` pairs. Getter
//!   output backed by document-owned storage is borrowed and valid until
//!   the next mutation or document release; computed strings come back as
//!   an owned [`DomString`] which must be freed with `dom_string_free`.
//! - Fallible operations return [`DomStatus`] and write results through out
//!   parameters. Nullable node results use null pointers.
//! - Optional booleans are a tri-state byte: 0 = false, 1 = true,
//!   0xff = unset.
//! - Callbacks are `(function pointer, opaque context)` pairs; the context
//!   lifetime is the host's business. Pointers handed to a callback are
//!   borrowed for the duration of the call.

use std::os::raw::c_void;
use std::rc::Rc;

use dom::element::Element;
use dom::mutationobserver::{MutationObserver, MutationRecord, ObserverInit};
use dom::node::Node;
use dom::nodefilter::{FilterResult, WhatToShow};
use dom::range::{Range, StaticRange};
use dom::shadowroot::{ShadowRootMode, SlotAssignmentMode};
use dom::{
    AbortController, AbortSignal, AddEventListenerOptions, AdjacentPosition,
    CustomElementReaction, Document, DomTokenList, Error, Event, EventInit, HtmlCollection,
    NamedNodeMap, NodeIterator, NodeRef, TreeWalker,
};

/// Error codes mirroring the core's `Error` enum, plus `Ok`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DomStatus {
    Ok = 0,
    OutOfMemory,
    HierarchyRequestError,
    NotFoundError,
    InvalidCharacterError,
    InvalidStateError,
    NamespaceError,
    SyntaxError,
    IndexSizeError,
    InvalidNodeTypeError,
    WrongDocumentError,
    QuotaExceededError,
    NotSupported,
    SecurityError,
    InUseAttributeError,
    InvalidUtf8,
    NullPointer,
}

fn status(error: Error) -> DomStatus {
    match error {
        Error::OutOfMemory => DomStatus::OutOfMemory,
        Error::HierarchyRequest => DomStatus::HierarchyRequestError,
        Error::NotFound => DomStatus::NotFoundError,
        Error::InvalidCharacter => DomStatus::InvalidCharacterError,
        Error::InvalidState => DomStatus::InvalidStateError,
        Error::Namespace => DomStatus::NamespaceError,
        Error::Syntax => DomStatus::SyntaxError,
        Error::IndexSize => DomStatus::IndexSizeError,
        Error::InvalidNodeType => DomStatus::InvalidNodeTypeError,
        Error::WrongDocument => DomStatus::WrongDocumentError,
        Error::QuotaExceeded => DomStatus::QuotaExceededError,
        Error::NotSupported => DomStatus::NotSupported,
        Error::Security => DomStatus::SecurityError,
        Error::InUseAttribute => DomStatus::InUseAttributeError,
    }
}

/// An owned UTF-8 buffer returned to the host.
#[repr(C)]
pub struct DomString {
    pub ptr: *mut u8,
    pub len: usize,
    pub cap: usize,
}

/// A borrowed UTF-8 slice passed either way.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DomStringPiece {
    pub ptr: *const u8,
    pub len: usize,
}

const EMPTY_PIECE: DomStringPiece = DomStringPiece {
    ptr: std::ptr::null(),
    len: 0,
};

fn export_string(value: String) -> DomString {
    let mut value = std::mem::ManuallyDrop::new(value);
    DomString {
        ptr: value.as_mut_ptr(),
        len: value.len(),
        cap: value.capacity(),
    }
}

const NULL_STRING: DomString = DomString {
    ptr: std::ptr::null_mut(),
    len: 0,
    cap: 0,
};

/// Frees a [`DomString`] returned by any getter here.
#[no_mangle]
pub unsafe extern "C" fn dom_string_free(string: DomString) {
    if !string.ptr.is_null() {
        drop(String::from_raw_parts(string.ptr, string.len, string.cap));
    }
}

unsafe fn str_arg<'a>(ptr: *const u8, len: usize) -> Result<&'a str, DomStatus> {
    if ptr.is_null() {
        if len == 0 {
            return Ok("");
        }
        return Err(DomStatus::NullPointer);
    }
    std::str::from_utf8(std::slice::from_raw_parts(ptr, len)).map_err(|_| DomStatus::InvalidUtf8)
}

unsafe fn opt_str_arg<'a>(ptr: *const u8, len: usize) -> Result<Option<&'a str>, DomStatus> {
    if ptr.is_null() && len == 0 {
        return Ok(None);
    }
    str_arg(ptr, len).map(Some)
}

/// 0 = false, 1 = true, 0xff = unset.
pub type DomTristate = u8;

fn tristate(value: DomTristate) -> Option<bool> {
    match value {
        0 => Some(false),
        0xff => None,
        _ => Some(true),
    }
}

// ---------------------------------------------------------------------------
// Node handles.
// ---------------------------------------------------------------------------

unsafe fn node_handle(ptr: *const Node) -> NodeRef {
    debug_assert!(!ptr.is_null());
    Rc::increment_strong_count(ptr);
    NodeRef::from_rc(Rc::from_raw(ptr))
}

unsafe fn opt_node_handle(ptr: *const Node) -> Option<NodeRef> {
    if ptr.is_null() {
        None
    } else {
        Some(node_handle(ptr))
    }
}

fn export_node(node: NodeRef) -> *const Node {
    Rc::into_raw(node.into_rc())
}

fn export_opt_node(node: Option<NodeRef>) -> *const Node {
    match node {
        Some(node) => export_node(node),
        None => std::ptr::null(),
    }
}

fn export_node_out(
    result: Result<NodeRef, Error>,
    out: *mut *const Node,
) -> DomStatus {
    match result {
        Ok(node) => {
            if !out.is_null() {
                unsafe { *out = export_node(node) };
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

/// Duplicates an owned node reference.
#[no_mangle]
pub unsafe extern "C" fn dom_node_acquire(node: *const Node) -> *const Node {
    Rc::increment_strong_count(node);
    node
}

/// Releases an owned node reference.
#[no_mangle]
pub unsafe extern "C" fn dom_node_release(node: *const Node) {
    drop(Rc::from_raw(node));
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_new() -> *const Node {
    export_node(Document::new_node())
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_type(node: *const Node) -> u16 {
    node_handle(node).node_type()
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_name(node: *const Node) -> DomString {
    export_string(node_handle(node).node_name())
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_is_connected(node: *const Node) -> bool {
    node_handle(node).is_connected()
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_parent(node: *const Node) -> *const Node {
    export_opt_node(node_handle(node).parent_node())
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_first_child(node: *const Node) -> *const Node {
    export_opt_node(node_handle(node).first_child())
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_last_child(node: *const Node) -> *const Node {
    export_opt_node(node_handle(node).last_child())
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_next_sibling(node: *const Node) -> *const Node {
    export_opt_node(node_handle(node).next_sibling())
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_previous_sibling(node: *const Node) -> *const Node {
    export_opt_node(node_handle(node).previous_sibling())
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_owner_document(node: *const Node) -> *const Node {
    export_opt_node(node_handle(node).owner_document())
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_child_count(node: *const Node) -> u32 {
    node_handle(node).child_count()
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_contains(node: *const Node, other: *const Node) -> bool {
    match opt_node_handle(other) {
        Some(other) => node_handle(node).contains(&other),
        None => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_compare_document_position(
    node: *const Node,
    other: *const Node,
) -> u16 {
    node_handle(node)
        .compare_document_position(&node_handle(other))
        .bits()
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_is_equal(node: *const Node, other: *const Node) -> bool {
    node_handle(node).is_equal_node(&node_handle(other))
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_append_child(
    parent: *const Node,
    node: *const Node,
) -> DomStatus {
    match node_handle(parent).append_child(&node_handle(node)) {
        Ok(_) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_insert_before(
    parent: *const Node,
    node: *const Node,
    child: *const Node,
) -> DomStatus {
    let child = opt_node_handle(child);
    match node_handle(parent).insert_before(&node_handle(node), child.as_ref()) {
        Ok(_) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_remove_child(
    parent: *const Node,
    child: *const Node,
) -> DomStatus {
    match node_handle(parent).remove_child(&node_handle(child)) {
        Ok(_) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_replace_child(
    parent: *const Node,
    node: *const Node,
    child: *const Node,
) -> DomStatus {
    match node_handle(parent).replace_child(&node_handle(node), &node_handle(child)) {
        Ok(_) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_move_before(
    parent: *const Node,
    node: *const Node,
    child: *const Node,
) -> DomStatus {
    let child = opt_node_handle(child);
    match node_handle(parent).move_before(&node_handle(node), child.as_ref()) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_remove(node: *const Node) -> DomStatus {
    match node_handle(node).remove() {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_clone(
    node: *const Node,
    deep: bool,
    out: *mut *const Node,
) -> DomStatus {
    export_node_out(node_handle(node).clone_node(deep), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_normalize(node: *const Node) {
    node_handle(node).normalize();
}

/// Computed text; free with `dom_string_free`. `has_value` is false for
/// Document and DocumentType nodes.
#[no_mangle]
pub unsafe extern "C" fn dom_node_text_content(
    node: *const Node,
    has_value: *mut bool,
) -> DomString {
    match node_handle(node).text_content() {
        Some(text) => {
            if !has_value.is_null() {
                *has_value = true;
            }
            export_string(text)
        },
        None => {
            if !has_value.is_null() {
                *has_value = false;
            }
            NULL_STRING
        },
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_set_text_content(
    node: *const Node,
    value_ptr: *const u8,
    value_len: usize,
) -> DomStatus {
    let value = match str_arg(value_ptr, value_len) {
        Ok(value) => value,
        Err(status) => return status,
    };
    match node_handle(node).set_text_content(value) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

// ---------------------------------------------------------------------------
// Document factories and queries.
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_element(
    document: *const Node,
    name_ptr: *const u8,
    name_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    export_node_out(node_handle(document).create_element(name), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_element_ns(
    document: *const Node,
    ns_ptr: *const u8,
    ns_len: usize,
    name_ptr: *const u8,
    name_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let namespace = match opt_str_arg(ns_ptr, ns_len) {
        Ok(namespace) => namespace,
        Err(status) => return status,
    };
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    export_node_out(node_handle(document).create_element_ns(namespace, name), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_text_node(
    document: *const Node,
    data_ptr: *const u8,
    data_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let data = match str_arg(data_ptr, data_len) {
        Ok(data) => data,
        Err(status) => return status,
    };
    export_node_out(node_handle(document).create_text_node(data), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_comment(
    document: *const Node,
    data_ptr: *const u8,
    data_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let data = match str_arg(data_ptr, data_len) {
        Ok(data) => data,
        Err(status) => return status,
    };
    export_node_out(node_handle(document).create_comment(data), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_cdata_section(
    document: *const Node,
    data_ptr: *const u8,
    data_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let data = match str_arg(data_ptr, data_len) {
        Ok(data) => data,
        Err(status) => return status,
    };
    export_node_out(node_handle(document).create_cdata_section(data), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_processing_instruction(
    document: *const Node,
    target_ptr: *const u8,
    target_len: usize,
    data_ptr: *const u8,
    data_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let target = match str_arg(target_ptr, target_len) {
        Ok(target) => target,
        Err(status) => return status,
    };
    let data = match str_arg(data_ptr, data_len) {
        Ok(data) => data,
        Err(status) => return status,
    };
    export_node_out(
        node_handle(document).create_processing_instruction(target, data),
        out,
    )
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_document_fragment(
    document: *const Node,
    out: *mut *const Node,
) -> DomStatus {
    export_node_out(node_handle(document).create_document_fragment(), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_attribute(
    document: *const Node,
    name_ptr: *const u8,
    name_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    export_node_out(node_handle(document).create_attribute(name), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_document_type(
    document: *const Node,
    name_ptr: *const u8,
    name_len: usize,
    public_ptr: *const u8,
    public_len: usize,
    system_ptr: *const u8,
    system_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    let public_id = match str_arg(public_ptr, public_len) {
        Ok(public_id) => public_id,
        Err(status) => return status,
    };
    let system_id = match str_arg(system_ptr, system_len) {
        Ok(system_id) => system_id,
        Err(status) => return status,
    };
    export_node_out(
        node_handle(document).create_document_type(name, public_id, system_id),
        out,
    )
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_adopt_node(
    document: *const Node,
    node: *const Node,
) -> DomStatus {
    match node_handle(document).adopt_node(&node_handle(node)) {
        Ok(_) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_import_node(
    document: *const Node,
    node: *const Node,
    deep: bool,
    out: *mut *const Node,
) -> DomStatus {
    export_node_out(node_handle(document).import_node(&node_handle(node), deep), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_get_element_by_id(
    document: *const Node,
    id_ptr: *const u8,
    id_len: usize,
) -> *const Node {
    let id = match str_arg(id_ptr, id_len) {
        Ok(id) => id,
        Err(_) => return std::ptr::null(),
    };
    export_opt_node(node_handle(document).get_element_by_id(id))
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_element(document: *const Node) -> *const Node {
    export_opt_node(node_handle(document).document_element())
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_doctype(document: *const Node) -> *const Node {
    export_opt_node(node_handle(document).doctype())
}

// ---------------------------------------------------------------------------
// Element attributes.
// ---------------------------------------------------------------------------

/// Borrowed from document-owned storage; valid until the next mutation.
#[no_mangle]
pub unsafe extern "C" fn dom_element_get_attribute(
    element: *const Node,
    name_ptr: *const u8,
    name_len: usize,
    out_ptr: *mut *const u8,
    out_len: *mut usize,
) -> bool {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(_) => return false,
    };
    let node = node_handle(element);
    let payload = match node.as_element() {
        Some(payload) => payload,
        None => return false,
    };
    match payload.find_attr(name) {
        Some(attr_node) => {
            let value = attr_node.as_attr().expect("attribute node").value();
            // The pool keeps the canonical allocation alive for the
            // document's lifetime.
            *out_ptr = value.as_str().as_ptr();
            *out_len = value.len();
            true
        },
        None => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_set_attribute(
    element: *const Node,
    name_ptr: *const u8,
    name_len: usize,
    value_ptr: *const u8,
    value_len: usize,
) -> DomStatus {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    let value = match str_arg(value_ptr, value_len) {
        Ok(value) => value,
        Err(status) => return status,
    };
    match node_handle(element).set_attribute(name, value) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_set_attribute_ns(
    element: *const Node,
    ns_ptr: *const u8,
    ns_len: usize,
    name_ptr: *const u8,
    name_len: usize,
    value_ptr: *const u8,
    value_len: usize,
) -> DomStatus {
    let namespace = match opt_str_arg(ns_ptr, ns_len) {
        Ok(namespace) => namespace,
        Err(status) => return status,
    };
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    let value = match str_arg(value_ptr, value_len) {
        Ok(value) => value,
        Err(status) => return status,
    };
    match node_handle(element).set_attribute_ns(namespace, name, value) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_remove_attribute(
    element: *const Node,
    name_ptr: *const u8,
    name_len: usize,
) -> DomStatus {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    match node_handle(element).remove_attribute(name) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_has_attribute(
    element: *const Node,
    name_ptr: *const u8,
    name_len: usize,
) -> bool {
    match str_arg(name_ptr, name_len) {
        Ok(name) => node_handle(element).has_attribute(name),
        Err(_) => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_toggle_attribute(
    element: *const Node,
    name_ptr: *const u8,
    name_len: usize,
    force: DomTristate,
    out_present: *mut bool,
) -> DomStatus {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    match node_handle(element).toggle_attribute(name, tristate(force)) {
        Ok(present) => {
            if !out_present.is_null() {
                *out_present = present;
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_attribute_count(element: *const Node) -> u32 {
    node_handle(element)
        .as_element()
        .map(Element::attr_count)
        .unwrap_or(0) as u32
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_attach_shadow(
    element: *const Node,
    closed: bool,
    delegates_focus: bool,
    manual_slotting: bool,
    out: *mut *const Node,
) -> DomStatus {
    let mode = if closed {
        ShadowRootMode::Closed
    } else {
        ShadowRootMode::Open
    };
    let slotting = if manual_slotting {
        SlotAssignmentMode::Manual
    } else {
        SlotAssignmentMode::Named
    };
    export_node_out(
        node_handle(element).attach_shadow(mode, delegates_focus, slotting),
        out,
    )
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_insert_adjacent_text(
    element: *const Node,
    where_ptr: *const u8,
    where_len: usize,
    data_ptr: *const u8,
    data_len: usize,
) -> DomStatus {
    let where_ = match str_arg(where_ptr, where_len) {
        Ok(where_) => where_,
        Err(status) => return status,
    };
    let data = match str_arg(data_ptr, data_len) {
        Ok(data) => data,
        Err(status) => return status,
    };
    let position = match AdjacentPosition::parse(where_) {
        Ok(position) => position,
        Err(error) => return status(error),
    };
    match node_handle(element).insert_adjacent_text(position, data) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

// ---------------------------------------------------------------------------
// Collections.
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn dom_document_get_elements_by_tag_name(
    document: *const Node,
    name_ptr: *const u8,
    name_len: usize,
) -> *mut HtmlCollection {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(_) => return std::ptr::null_mut(),
    };
    Box::into_raw(Box::new(
        node_handle(document).document_elements_by_tag_name(name),
    ))
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_get_elements_by_class_name(
    document: *const Node,
    names_ptr: *const u8,
    names_len: usize,
) -> *mut HtmlCollection {
    let names = match str_arg(names_ptr, names_len) {
        Ok(names) => names,
        Err(_) => return std::ptr::null_mut(),
    };
    Box::into_raw(Box::new(
        node_handle(document).document_elements_by_class_name(names),
    ))
}

#[no_mangle]
pub unsafe extern "C" fn dom_html_collection_length(collection: *const HtmlCollection) -> u32 {
    (*collection).length()
}

#[no_mangle]
pub unsafe extern "C" fn dom_html_collection_item(
    collection: *const HtmlCollection,
    index: u32,
) -> *const Node {
    export_opt_node((*collection).item(index))
}

#[no_mangle]
pub unsafe extern "C" fn dom_html_collection_free(collection: *mut HtmlCollection) {
    drop(Box::from_raw(collection));
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_child_nodes(node: *const Node) -> *mut dom::NodeList {
    Box::into_raw(Box::new(node_handle(node).child_nodes()))
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_list_length(list: *const dom::NodeList) -> u32 {
    (*list).length()
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_list_item(
    list: *const dom::NodeList,
    index: u32,
) -> *const Node {
    export_opt_node((*list).item(index))
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_list_free(list: *mut dom::NodeList) {
    drop(Box::from_raw(list));
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_class_list(element: *const Node) -> *mut DomTokenList {
    match node_handle(element).class_list() {
        Ok(list) => Box::into_raw(Box::new(list)),
        Err(_) => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_token_list_length(list: *const DomTokenList) -> u32 {
    (*list).length()
}

#[no_mangle]
pub unsafe extern "C" fn dom_token_list_contains(
    list: *const DomTokenList,
    token_ptr: *const u8,
    token_len: usize,
) -> bool {
    match str_arg(token_ptr, token_len) {
        Ok(token) => (*list).contains(token),
        Err(_) => false,
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_token_list_add(
    list: *const DomTokenList,
    token_ptr: *const u8,
    token_len: usize,
) -> DomStatus {
    let token = match str_arg(token_ptr, token_len) {
        Ok(token) => token,
        Err(status) => return status,
    };
    match (*list).add(&[token]) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_token_list_remove(
    list: *const DomTokenList,
    token_ptr: *const u8,
    token_len: usize,
) -> DomStatus {
    let token = match str_arg(token_ptr, token_len) {
        Ok(token) => token,
        Err(status) => return status,
    };
    match (*list).remove(&[token]) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_token_list_toggle(
    list: *const DomTokenList,
    token_ptr: *const u8,
    token_len: usize,
    force: DomTristate,
    out_present: *mut bool,
) -> DomStatus {
    let token = match str_arg(token_ptr, token_len) {
        Ok(token) => token,
        Err(status) => return status,
    };
    match (*list).toggle(token, tristate(force)) {
        Ok(present) => {
            if !out_present.is_null() {
                *out_present = present;
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_token_list_free(list: *mut DomTokenList) {
    drop(Box::from_raw(list));
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_attributes(element: *const Node) -> *mut NamedNodeMap {
    match node_handle(element).attributes() {
        Ok(map) => Box::into_raw(Box::new(map)),
        Err(_) => std::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_named_node_map_length(map: *const NamedNodeMap) -> u32 {
    (*map).length()
}

#[no_mangle]
pub unsafe extern "C" fn dom_named_node_map_item(
    map: *const NamedNodeMap,
    index: u32,
) -> *const Node {
    export_opt_node((*map).item(index))
}

#[no_mangle]
pub unsafe extern "C" fn dom_named_node_map_get_named_item(
    map: *const NamedNodeMap,
    name_ptr: *const u8,
    name_len: usize,
) -> *const Node {
    match str_arg(name_ptr, name_len) {
        Ok(name) => export_opt_node((*map).get_named_item(name)),
        Err(_) => std::ptr::null(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_named_node_map_free(map: *mut NamedNodeMap) {
    drop(Box::from_raw(map));
}

// ---------------------------------------------------------------------------
// Selectors.
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn dom_query_selector(
    scope: *const Node,
    selectors_ptr: *const u8,
    selectors_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let selectors = match str_arg(selectors_ptr, selectors_len) {
        Ok(selectors) => selectors,
        Err(status) => return status,
    };
    match node_handle(scope).query_selector(selectors) {
        Ok(result) => {
            if !out.is_null() {
                *out = export_opt_node(result);
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_query_selector_all(
    scope: *const Node,
    selectors_ptr: *const u8,
    selectors_len: usize,
    out: *mut *mut dom::NodeList,
) -> DomStatus {
    let selectors = match str_arg(selectors_ptr, selectors_len) {
        Ok(selectors) => selectors,
        Err(status) => return status,
    };
    match node_handle(scope).query_selector_all(selectors) {
        Ok(results) => {
            if !out.is_null() {
                *out = Box::into_raw(Box::new(dom::NodeList::new_snapshot(results)));
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_matches(
    element: *const Node,
    selectors_ptr: *const u8,
    selectors_len: usize,
    out_matches: *mut bool,
) -> DomStatus {
    let selectors = match str_arg(selectors_ptr, selectors_len) {
        Ok(selectors) => selectors,
        Err(status) => return status,
    };
    match node_handle(element).matches(selectors) {
        Ok(matched) => {
            if !out_matches.is_null() {
                *out_matches = matched;
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_element_closest(
    element: *const Node,
    selectors_ptr: *const u8,
    selectors_len: usize,
    out: *mut *const Node,
) -> DomStatus {
    let selectors = match str_arg(selectors_ptr, selectors_len) {
        Ok(selectors) => selectors,
        Err(status) => return status,
    };
    match node_handle(element).closest(selectors) {
        Ok(result) => {
            if !out.is_null() {
                *out = export_opt_node(result);
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

// ---------------------------------------------------------------------------
// Events.
// ---------------------------------------------------------------------------

pub type DomEventListenerCallback = extern "C" fn(context: *mut c_void, event: *const Event);

#[no_mangle]
pub unsafe extern "C" fn dom_event_new(
    type_ptr: *const u8,
    type_len: usize,
    bubbles: bool,
    cancelable: bool,
    composed: bool,
) -> *mut Event {
    let type_ = match str_arg(type_ptr, type_len) {
        Ok(type_) => type_,
        Err(_) => return std::ptr::null_mut(),
    };
    Box::into_raw(Box::new(Event::new(
        type_,
        EventInit {
            bubbles,
            cancelable,
            composed,
        },
    )))
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_acquire(event: *const Event) -> *mut Event {
    Box::into_raw(Box::new((*event).clone()))
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_free(event: *mut Event) {
    drop(Box::from_raw(event));
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_type(event: *const Event) -> DomString {
    export_string((*event).type_())
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_phase(event: *const Event) -> u16 {
    (*event).event_phase() as u16
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_target(event: *const Event) -> *const Node {
    export_opt_node((*event).target())
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_current_target(event: *const Event) -> *const Node {
    export_opt_node((*event).current_target())
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_stop_propagation(event: *const Event) {
    (*event).stop_propagation();
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_stop_immediate_propagation(event: *const Event) {
    (*event).stop_immediate_propagation();
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_prevent_default(event: *const Event) {
    (*event).prevent_default();
}

#[no_mangle]
pub unsafe extern "C" fn dom_event_default_prevented(event: *const Event) -> bool {
    (*event).default_prevented()
}

/// The event path at the last dispatch; free with `dom_node_list_free`.
#[no_mangle]
pub unsafe extern "C" fn dom_event_composed_path(event: *const Event) -> *mut dom::NodeList {
    Box::into_raw(Box::new(dom::NodeList::new_snapshot(
        (*event).composed_path(),
    )))
}

/// Returns the listener id (non-zero) through `out_id`; 0 means the
/// listener was not installed (duplicate or already-aborted signal).
#[no_mangle]
pub unsafe extern "C" fn dom_node_add_event_listener(
    node: *const Node,
    type_ptr: *const u8,
    type_len: usize,
    callback: DomEventListenerCallback,
    context: *mut c_void,
    capture: bool,
    once: bool,
    passive: bool,
    signal: *const AbortSignal,
    out_id: *mut u64,
) -> DomStatus {
    let type_ = match str_arg(type_ptr, type_len) {
        Ok(type_) => type_,
        Err(status) => return status,
    };
    let signal = if signal.is_null() {
        None
    } else {
        Some((*signal).clone())
    };
    let trampoline: dom::EventCallback =
        Rc::new(move |event: &Event| callback(context, event as *const Event));
    let options = AddEventListenerOptions {
        capture,
        once,
        passive,
        signal,
    };
    match node_handle(node).add_event_listener(type_, trampoline, options) {
        Ok(id) => {
            if !out_id.is_null() {
                *out_id = id;
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_remove_event_listener(node: *const Node, id: u64) {
    node_handle(node).remove_event_listener_by_id(id);
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_dispatch_event(
    node: *const Node,
    event: *const Event,
    out_not_canceled: *mut bool,
) -> DomStatus {
    match node_handle(node).dispatch_event(&*event) {
        Ok(not_canceled) => {
            if !out_not_canceled.is_null() {
                *out_not_canceled = not_canceled;
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

// ---------------------------------------------------------------------------
// AbortController / AbortSignal.
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn dom_abort_controller_new() -> *mut AbortController {
    Box::into_raw(Box::new(AbortController::new()))
}

#[no_mangle]
pub unsafe extern "C" fn dom_abort_controller_signal(
    controller: *const AbortController,
) -> *mut AbortSignal {
    Box::into_raw(Box::new((*controller).signal()))
}

#[no_mangle]
pub unsafe extern "C" fn dom_abort_controller_abort(controller: *const AbortController) {
    (*controller).abort();
}

#[no_mangle]
pub unsafe extern "C" fn dom_abort_controller_free(controller: *mut AbortController) {
    drop(Box::from_raw(controller));
}

#[no_mangle]
pub unsafe extern "C" fn dom_abort_signal_aborted(signal: *const AbortSignal) -> bool {
    (*signal).aborted()
}

#[no_mangle]
pub unsafe extern "C" fn dom_abort_signal_free(signal: *mut AbortSignal) {
    drop(Box::from_raw(signal));
}

// ---------------------------------------------------------------------------
// Mutation observers.
// ---------------------------------------------------------------------------

pub type DomMutationObserverCallback = extern "C" fn(
    context: *mut c_void,
    records: *const *const MutationRecord,
    record_count: usize,
);

#[repr(C)]
pub struct DomObserverOptions {
    pub child_list: bool,
    pub attributes: DomTristate,
    pub attribute_old_value: DomTristate,
    pub character_data: DomTristate,
    pub character_data_old_value: DomTristate,
    pub subtree: bool,
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_observer_new(
    callback: DomMutationObserverCallback,
    context: *mut c_void,
) -> *mut MutationObserver {
    let trampoline: dom::mutationobserver::MutationCallback =
        Rc::new(move |records: &[MutationRecord], _observer: &MutationObserver| {
            let pointers: Vec<*const MutationRecord> =
                records.iter().map(|record| record as *const _).collect();
            callback(context, pointers.as_ptr(), pointers.len());
        });
    Box::into_raw(Box::new(MutationObserver::new(trampoline)))
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_observer_observe(
    observer: *const MutationObserver,
    target: *const Node,
    options: *const DomObserverOptions,
) -> DomStatus {
    let options = &*options;
    let init = ObserverInit {
        child_list: options.child_list,
        attributes: tristate(options.attributes),
        attribute_filter: None,
        attribute_old_value: tristate(options.attribute_old_value),
        character_data: tristate(options.character_data),
        character_data_old_value: tristate(options.character_data_old_value),
        subtree: options.subtree,
    };
    match (*observer).observe(&node_handle(target), &init) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_observer_disconnect(observer: *const MutationObserver) {
    (*observer).disconnect();
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_observer_free(observer: *mut MutationObserver) {
    drop(Box::from_raw(observer));
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_acquire(
    record: *const MutationRecord,
) -> *mut MutationRecord {
    Box::into_raw(Box::new((*record).clone()))
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_free(record: *mut MutationRecord) {
    drop(Box::from_raw(record));
}

/// 0 = childList, 1 = attributes, 2 = characterData.
#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_type(record: *const MutationRecord) -> u32 {
    match (*record).record_type() {
        dom::MutationRecordType::ChildList => 0,
        dom::MutationRecordType::Attributes => 1,
        dom::MutationRecordType::CharacterData => 2,
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_target(record: *const MutationRecord) -> *const Node {
    export_node((*record).target())
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_added_count(record: *const MutationRecord) -> usize {
    (*record).added_nodes().len()
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_added_at(
    record: *const MutationRecord,
    index: usize,
) -> *const Node {
    export_opt_node((*record).added_nodes().get(index).cloned())
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_removed_count(record: *const MutationRecord) -> usize {
    (*record).removed_nodes().len()
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_removed_at(
    record: *const MutationRecord,
    index: usize,
) -> *const Node {
    export_opt_node((*record).removed_nodes().get(index).cloned())
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_attribute_name(
    record: *const MutationRecord,
) -> DomString {
    match (*record).attribute_name() {
        Some(name) => export_string(name.to_owned()),
        None => NULL_STRING,
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_mutation_record_old_value(
    record: *const MutationRecord,
    has_value: *mut bool,
) -> DomString {
    match (*record).old_value() {
        Some(value) => {
            if !has_value.is_null() {
                *has_value = true;
            }
            export_string(value.to_owned())
        },
        None => {
            if !has_value.is_null() {
                *has_value = false;
            }
            NULL_STRING
        },
    }
}

pub type DomHookCallback = extern "C" fn(context: *mut c_void);

/// Installs the drain-scheduling hook; the host should arrange for
/// `dom_document_notify_observers` to run soon after it fires.
#[no_mangle]
pub unsafe extern "C" fn dom_document_set_observer_drain_hook(
    document: *const Node,
    callback: DomHookCallback,
    context: *mut c_void,
) -> DomStatus {
    let node = node_handle(document);
    let doc = match node.as_document() {
        Some(doc) => doc,
        None => return DomStatus::InvalidNodeTypeError,
    };
    doc.set_observer_drain_hook(Rc::new(move || callback(context)));
    DomStatus::Ok
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_notify_observers(document: *const Node) {
    dom::notify_observers(&node_handle(document));
}

// ---------------------------------------------------------------------------
// Custom elements.
// ---------------------------------------------------------------------------

/// Reaction kinds passed to the custom-element trampoline.
pub const DOM_REACTION_UPGRADE: u32 = 0;
pub const DOM_REACTION_CONNECTED: u32 = 1;
pub const DOM_REACTION_DISCONNECTED: u32 = 2;
pub const DOM_REACTION_ADOPTED: u32 = 3;
pub const DOM_REACTION_ATTRIBUTE_CHANGED: u32 = 4;

#[repr(C)]
pub struct DomReactionInfo {
    pub kind: u32,
    pub name: DomStringPiece,
    pub has_old_value: bool,
    pub old_value: DomStringPiece,
    pub has_new_value: bool,
    pub new_value: DomStringPiece,
    pub has_namespace: bool,
    pub namespace: DomStringPiece,
}

pub type DomReactionCallback =
    extern "C" fn(context: *mut c_void, element: *const Node, info: *const DomReactionInfo);

fn piece(value: &str) -> DomStringPiece {
    DomStringPiece {
        ptr: value.as_ptr(),
        len: value.len(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_define_custom_element(
    document: *const Node,
    name_ptr: *const u8,
    name_len: usize,
    observed: *const DomStringPiece,
    observed_count: usize,
    callback: DomReactionCallback,
    context: *mut c_void,
) -> DomStatus {
    let name = match str_arg(name_ptr, name_len) {
        Ok(name) => name,
        Err(status) => return status,
    };
    let mut observed_names: Vec<&str> = Vec::with_capacity(observed_count);
    if observed_count > 0 {
        if observed.is_null() {
            return DomStatus::NullPointer;
        }
        for index in 0..observed_count {
            let entry = &*observed.add(index);
            match str_arg(entry.ptr, entry.len) {
                Ok(attribute) => observed_names.push(attribute),
                Err(status) => return status,
            }
        }
    }
    let trampoline: dom::ReactionCallback =
        Rc::new(move |element: &NodeRef, reaction: &CustomElementReaction| {
            let mut info = DomReactionInfo {
                kind: DOM_REACTION_UPGRADE,
                name: EMPTY_PIECE,
                has_old_value: false,
                old_value: EMPTY_PIECE,
                has_new_value: false,
                new_value: EMPTY_PIECE,
                has_namespace: false,
                namespace: EMPTY_PIECE,
            };
            let name_storage;
            match reaction {
                CustomElementReaction::Upgrade => info.kind = DOM_REACTION_UPGRADE,
                CustomElementReaction::Connected => info.kind = DOM_REACTION_CONNECTED,
                CustomElementReaction::Disconnected => info.kind = DOM_REACTION_DISCONNECTED,
                CustomElementReaction::Adopted { .. } => info.kind = DOM_REACTION_ADOPTED,
                CustomElementReaction::AttributeChanged {
                    name,
                    old_value,
                    new_value,
                    namespace,
                } => {
                    info.kind = DOM_REACTION_ATTRIBUTE_CHANGED;
                    name_storage = name.as_str().to_owned();
                    info.name = piece(&name_storage);
                    if let Some(old_value) = old_value {
                        info.has_old_value = true;
                        info.old_value = piece(old_value);
                    }
                    if let Some(new_value) = new_value {
                        info.has_new_value = true;
                        info.new_value = piece(new_value);
                    }
                    if let Some(namespace) = namespace {
                        info.has_namespace = true;
                        info.namespace = piece(namespace);
                    }
                },
            }
            let element_ptr = export_node(element.clone());
            callback(context, element_ptr, &info as *const DomReactionInfo);
            // The callback borrowed the element; drop our temporary count.
            drop(Rc::from_raw(element_ptr));
        });
    match dom::define_custom_element(&node_handle(document), name, &observed_names, trampoline) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

// ---------------------------------------------------------------------------
// Ranges.
// ---------------------------------------------------------------------------

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_range(
    document: *const Node,
    out: *mut *mut Range,
) -> DomStatus {
    match node_handle(document).create_range() {
        Ok(range) => {
            if !out.is_null() {
                *out = Box::into_raw(Box::new(range));
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_free(range: *mut Range) {
    drop(Box::from_raw(range));
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_set_start(
    range: *const Range,
    node: *const Node,
    offset: u32,
) -> DomStatus {
    match (*range).set_start(&node_handle(node), offset) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_set_end(
    range: *const Range,
    node: *const Node,
    offset: u32,
) -> DomStatus {
    match (*range).set_end(&node_handle(node), offset) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_start_container(range: *const Range) -> *const Node {
    export_node((*range).start_container())
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_start_offset(range: *const Range) -> u32 {
    (*range).start_offset()
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_end_container(range: *const Range) -> *const Node {
    export_node((*range).end_container())
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_end_offset(range: *const Range) -> u32 {
    (*range).end_offset()
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_collapsed(range: *const Range) -> bool {
    (*range).collapsed()
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_collapse(range: *const Range, to_start: bool) {
    (*range).collapse(to_start);
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_select_node(
    range: *const Range,
    node: *const Node,
) -> DomStatus {
    match (*range).select_node(&node_handle(node)) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_select_node_contents(
    range: *const Range,
    node: *const Node,
) -> DomStatus {
    match (*range).select_node_contents(&node_handle(node)) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_delete_contents(range: *const Range) -> DomStatus {
    match (*range).delete_contents() {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_extract_contents(
    range: *const Range,
    out: *mut *const Node,
) -> DomStatus {
    export_node_out((*range).extract_contents(), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_clone_contents(
    range: *const Range,
    out: *mut *const Node,
) -> DomStatus {
    export_node_out((*range).clone_contents(), out)
}

#[no_mangle]
pub unsafe extern "C" fn dom_range_insert_node(
    range: *const Range,
    node: *const Node,
) -> DomStatus {
    match (*range).insert_node(&node_handle(node)) {
        Ok(()) => DomStatus::Ok,
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_static_range_new(
    start_container: *const Node,
    start_offset: u32,
    end_container: *const Node,
    end_offset: u32,
    out: *mut *mut StaticRange,
) -> DomStatus {
    match StaticRange::new(
        &node_handle(start_container),
        start_offset,
        &node_handle(end_container),
        end_offset,
    ) {
        Ok(range) => {
            if !out.is_null() {
                *out = Box::into_raw(Box::new(range));
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_static_range_free(range: *mut StaticRange) {
    drop(Box::from_raw(range));
}

// ---------------------------------------------------------------------------
// Traversal.
// ---------------------------------------------------------------------------

pub type DomNodeFilterCallback = extern "C" fn(context: *mut c_void, node: *const Node) -> u16;

unsafe fn make_filter(
    callback: Option<DomNodeFilterCallback>,
    context: *mut c_void,
) -> Option<dom::NodeFilter> {
    let callback = callback?;
    Some(Rc::new(move |node: &NodeRef| {
        let node_ptr = export_node(node.clone());
        let verdict = callback(context, node_ptr);
        drop(Rc::from_raw(node_ptr));
        match verdict {
            1 => FilterResult::Accept,
            2 => FilterResult::Reject,
            _ => FilterResult::Skip,
        }
    }))
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_node_iterator(
    document: *const Node,
    root: *const Node,
    what_to_show: u32,
    callback: Option<DomNodeFilterCallback>,
    context: *mut c_void,
    out: *mut *mut NodeIterator,
) -> DomStatus {
    let filter = make_filter(callback, context);
    match node_handle(document).create_node_iterator(
        &node_handle(root),
        WhatToShow::from_bits_retain(what_to_show),
        filter,
    ) {
        Ok(iterator) => {
            if !out.is_null() {
                *out = Box::into_raw(Box::new(iterator));
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_iterator_next(
    iterator: *const NodeIterator,
    out: *mut *const Node,
) -> DomStatus {
    match (*iterator).next_node() {
        Ok(node) => {
            if !out.is_null() {
                *out = export_opt_node(node);
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_iterator_previous(
    iterator: *const NodeIterator,
    out: *mut *const Node,
) -> DomStatus {
    match (*iterator).previous_node() {
        Ok(node) => {
            if !out.is_null() {
                *out = export_opt_node(node);
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_node_iterator_free(iterator: *mut NodeIterator) {
    drop(Box::from_raw(iterator));
}

#[no_mangle]
pub unsafe extern "C" fn dom_document_create_tree_walker(
    document: *const Node,
    root: *const Node,
    what_to_show: u32,
    callback: Option<DomNodeFilterCallback>,
    context: *mut c_void,
    out: *mut *mut TreeWalker,
) -> DomStatus {
    let filter = make_filter(callback, context);
    match node_handle(document).create_tree_walker(
        &node_handle(root),
        WhatToShow::from_bits_retain(what_to_show),
        filter,
    ) {
        Ok(walker) => {
            if !out.is_null() {
                *out = Box::into_raw(Box::new(walker));
            }
            DomStatus::Ok
        },
        Err(error) => status(error),
    }
}

#[no_mangle]
pub unsafe extern "C" fn dom_tree_walker_current(walker: *const TreeWalker) -> *const Node {
    export_node((*walker).current_node())
}

macro_rules! tree_walker_move {
    ($name:ident, $method:ident) => {
        #[no_mangle]
        pub unsafe extern "C" fn $name(
            walker: *const TreeWalker,
            out: *mut *const Node,
        ) -> DomStatus {
            match (*walker).$method() {
                Ok(node) => {
                    if !out.is_null() {
                        *out = export_opt_node(node);
                    }
                    DomStatus::Ok
                },
                Err(error) => status(error),
            }
        }
    };
}

tree_walker_move!(dom_tree_walker_parent, parent_node);
tree_walker_move!(dom_tree_walker_first_child, first_child);
tree_walker_move!(dom_tree_walker_last_child, last_child);
tree_walker_move!(dom_tree_walker_next_sibling, next_sibling);
tree_walker_move!(dom_tree_walker_previous_sibling, previous_sibling);
tree_walker_move!(dom_tree_walker_next, next_node);
tree_walker_move!(dom_tree_walker_previous, previous_node);

#[no_mangle]
pub unsafe extern "C" fn dom_tree_walker_free(walker: *mut TreeWalker) {
    drop(Box::from_raw(walker));
}
