/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! DOMTokenList: the live token view over a space-separated attribute.
//!
//! Writes go through `setAttribute` on the owning element, so the class
//! index, bloom bits, mutation records and custom-element reactions all see
//! token-list edits exactly like any other attribute mutation.

use std::rc::Rc;

use crate::error::{Error, ErrorResult, Fallible};
use crate::node::{NodeRef, WeakNodeRef};

struct DomTokenListData {
    element: WeakNodeRef,
    local_name: String,
}

/// <https://dom.spec.whatwg.org/#domtokenlist>
#[derive(Clone)]
pub struct DomTokenList(Rc<DomTokenListData>);

impl PartialEq for DomTokenList {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl DomTokenList {
    pub(crate) fn new(element: &NodeRef, local_name: &str) -> DomTokenList {
        DomTokenList(Rc::new(DomTokenListData {
            element: element.downgrade(),
            local_name: local_name.to_owned(),
        }))
    }

    fn element(&self) -> Option<NodeRef> {
        self.0.element.upgrade()
    }

    /// The attribute value parsed as an ordered set of unique tokens.
    fn tokens(&self) -> Vec<String> {
        let element = match self.element() {
            Some(element) => element,
            None => return Vec::new(),
        };
        let value = element.get_attribute(&self.0.local_name).unwrap_or_default();
        let mut tokens: Vec<String> = Vec::new();
        for token in value.split_ascii_whitespace() {
            if !tokens.iter().any(|existing| existing == token) {
                tokens.push(token.to_owned());
            }
        }
        tokens
    }

    fn write_tokens(&self, tokens: &[String]) -> ErrorResult {
        let element = match self.element() {
            Some(element) => element,
            None => return Ok(()),
        };
        element.set_attribute(&self.0.local_name, &tokens.join(" "))
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-length>
    pub fn length(&self) -> u32 {
        self.tokens().len() as u32
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-item>
    pub fn item(&self, index: u32) -> Option<String> {
        self.tokens().into_iter().nth(index as usize)
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-contains>
    pub fn contains(&self, token: &str) -> bool {
        self.tokens().iter().any(|existing| existing == token)
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-add>
    pub fn add(&self, tokens_to_add: &[&str]) -> ErrorResult {
        for token in tokens_to_add {
            validate_token(token)?;
        }
        let mut tokens = self.tokens();
        for token in tokens_to_add {
            if !tokens.iter().any(|existing| existing == token) {
                tokens.push((*token).to_owned());
            }
        }
        self.write_tokens(&tokens)
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-remove>
    pub fn remove(&self, tokens_to_remove: &[&str]) -> ErrorResult {
        for token in tokens_to_remove {
            validate_token(token)?;
        }
        let mut tokens = self.tokens();
        tokens.retain(|existing| !tokens_to_remove.iter().any(|token| existing == token));
        self.write_tokens(&tokens)
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-toggle>
    pub fn toggle(&self, token: &str, force: Option<bool>) -> Fallible<bool> {
        validate_token(token)?;
        let present = self.contains(token);
        match (present, force) {
            (true, Some(true)) => Ok(true),
            (true, _) => {
                self.remove(&[token])?;
                Ok(false)
            },
            (false, Some(false)) => Ok(false),
            (false, _) => {
                self.add(&[token])?;
                Ok(true)
            },
        }
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-replace>
    pub fn replace(&self, token: &str, new_token: &str) -> Fallible<bool> {
        validate_token(token)?;
        validate_token(new_token)?;
        let mut tokens = self.tokens();
        let position = match tokens.iter().position(|existing| existing == token) {
            Some(position) => position,
            None => return Ok(false),
        };
        if !tokens.iter().any(|existing| existing == new_token) {
            tokens[position] = new_token.to_owned();
        } else {
            tokens.remove(position);
        }
        self.write_tokens(&tokens)?;
        Ok(true)
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-value>
    pub fn value(&self) -> String {
        self.element()
            .and_then(|element| element.get_attribute(&self.0.local_name))
            .unwrap_or_default()
    }

    /// <https://dom.spec.whatwg.org/#dom-domtokenlist-value>
    pub fn set_value(&self, value: &str) -> ErrorResult {
        match self.element() {
            Some(element) => element.set_attribute(&self.0.local_name, value),
            None => Ok(()),
        }
    }
}

/// <https://dom.spec.whatwg.org/#concept-domtokenlist-validation>
fn validate_token(token: &str) -> ErrorResult {
    if token.is_empty() {
        return Err(Error::Syntax);
    }
    if token.chars().any(|c| c.is_ascii_whitespace()) {
        return Err(Error::InvalidCharacter);
    }
    Ok(())
}
