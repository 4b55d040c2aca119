/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Selector matching: right-to-left over the combinator chain with
//! backtracking, bloom-filter early rejection, and a step budget that
//! bounds pathological `:has` walks.

use std::cell::Cell;

use crate::element::Element;
use crate::error::{Error, Fallible};
use crate::node::NodeRef;
use crate::selectors::bloom;
use crate::selectors::parser::{
    AttrOperator, AttrSelector, Combinator, ComplexSelector, Compound, PseudoClass,
    SelectorList, SimpleSelector,
};

/// Upper bound on match work per top-level query.
const MATCH_STEP_BUDGET: usize = 1 << 20;

pub(crate) struct MatchingContext {
    steps: Cell<usize>,
}

impl MatchingContext {
    pub(crate) fn new() -> MatchingContext {
        MatchingContext {
            steps: Cell::new(MATCH_STEP_BUDGET),
        }
    }

    fn step(&self) -> Fallible<()> {
        let remaining = self.steps.get();
        if remaining == 0 {
            return Err(Error::QuotaExceeded);
        }
        self.steps.set(remaining - 1);
        Ok(())
    }
}

/// True if any selector in the list matches `element`.
pub(crate) fn matches_selector_list(
    element: &NodeRef,
    list: &SelectorList,
    ctx: &MatchingContext,
) -> Fallible<bool> {
    for complex in &list.selectors {
        if matches_complex(element, complex, ctx, None)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Matches `complex` with its subject at `element`. With an `anchor`, the
/// leftmost compound must additionally relate to the anchor element via the
/// given combinator (the `:has` case).
fn matches_complex(
    element: &NodeRef,
    complex: &ComplexSelector,
    ctx: &MatchingContext,
    anchor: Option<(&NodeRef, Combinator)>,
) -> Fallible<bool> {
    if !matches_compound(element, &complex.compounds[0], ctx)? {
        return Ok(false);
    }
    matches_leftward(element, complex, 0, ctx, anchor)
}

/// The compound at `index` has matched at `element`; continue leftward.
fn matches_leftward(
    element: &NodeRef,
    complex: &ComplexSelector,
    index: usize,
    ctx: &MatchingContext,
    anchor: Option<(&NodeRef, Combinator)>,
) -> Fallible<bool> {
    if index + 1 == complex.compounds.len() {
        return Ok(match anchor {
            None => true,
            Some((anchor_element, combinator)) => {
                related_to_anchor(anchor_element, combinator, element)
            },
        });
    }
    let next = &complex.compounds[index + 1];
    match complex.combinators[index] {
        Combinator::Child => {
            let parent = match element.parent_element() {
                Some(parent) => parent,
                None => return Ok(false),
            };
            ctx.step()?;
            if matches_compound(&parent, next, ctx)? {
                matches_leftward(&parent, complex, index + 1, ctx, anchor)
            } else {
                Ok(false)
            }
        },
        Combinator::Descendant => {
            let mut current = element.parent_element();
            while let Some(ancestor) = current {
                ctx.step()?;
                if matches_compound(&ancestor, next, ctx)? &&
                    matches_leftward(&ancestor, complex, index + 1, ctx, anchor)?
                {
                    return Ok(true);
                }
                current = ancestor.parent_element();
            }
            Ok(false)
        },
        Combinator::NextSibling => {
            let sibling = match previous_element_sibling(element) {
                Some(sibling) => sibling,
                None => return Ok(false),
            };
            ctx.step()?;
            if matches_compound(&sibling, next, ctx)? {
                matches_leftward(&sibling, complex, index + 1, ctx, anchor)
            } else {
                Ok(false)
            }
        },
        Combinator::LaterSibling => {
            let mut current = previous_element_sibling(element);
            while let Some(sibling) = current {
                ctx.step()?;
                if matches_compound(&sibling, next, ctx)? &&
                    matches_leftward(&sibling, complex, index + 1, ctx, anchor)?
                {
                    return Ok(true);
                }
                current = previous_element_sibling(&sibling);
            }
            Ok(false)
        },
    }
}

fn related_to_anchor(anchor: &NodeRef, combinator: Combinator, leftmost: &NodeRef) -> bool {
    match combinator {
        Combinator::Descendant => anchor != leftmost && anchor.contains(leftmost),
        Combinator::Child => leftmost.parent_node().as_ref() == Some(anchor),
        Combinator::NextSibling => {
            next_element_sibling(anchor).as_ref() == Some(leftmost)
        },
        Combinator::LaterSibling => anchor
            .following_siblings()
            .any(|sibling| &sibling == leftmost),
    }
}

fn previous_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    node.preceding_siblings().find(|sibling| sibling.is_element())
}

fn next_element_sibling(node: &NodeRef) -> Option<NodeRef> {
    node.following_siblings().find(|sibling| sibling.is_element())
}

fn matches_compound(element: &NodeRef, compound: &Compound, ctx: &MatchingContext) -> Fallible<bool> {
    let payload = match element.as_element() {
        Some(payload) => payload,
        None => return Ok(false),
    };
    // Bloom rejection first; this is the common exit.
    if !bloom::may_match(compound.class_bloom, payload.class_bloom()) {
        return Ok(false);
    }
    for simple in &compound.simples {
        if !matches_simple(element, payload, simple, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_simple(
    element: &NodeRef,
    payload: &Element,
    simple: &SimpleSelector,
    ctx: &MatchingContext,
) -> Fallible<bool> {
    Ok(match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(name) => payload.local_name() == *name,
        SimpleSelector::Id(id) => payload.id_atom().as_ref() == Some(id),
        SimpleSelector::Class(class) => payload.has_class(class.as_str()),
        SimpleSelector::Attribute(selector) => matches_attribute(payload, selector),
        SimpleSelector::PseudoClass(pseudo) => {
            return matches_pseudo_class(element, payload, pseudo, ctx);
        },
    })
}

fn matches_attribute(payload: &Element, selector: &AttrSelector) -> bool {
    for attr_node in payload.attrs() {
        let attr = attr_node.as_attr().expect("attribute node");
        if attr.local_name() != selector.name {
            continue;
        }
        if selector.operator == AttrOperator::Exists {
            return true;
        }
        let value = attr.value();
        let value = value.as_str();
        let expected = selector.value.as_deref().unwrap_or("");
        if attribute_value_matches(selector.operator, value, expected, selector.case_insensitive) {
            return true;
        }
    }
    false
}

fn attribute_value_matches(
    operator: AttrOperator,
    value: &str,
    expected: &str,
    case_insensitive: bool,
) -> bool {
    let eq = |a: &str, b: &str| {
        if case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    };
    // The substring operators lowercase both sides up front when the `i`
    // flag is present.
    let folded_value;
    let folded_expected;
    let (value, expected) = if case_insensitive {
        folded_value = value.to_ascii_lowercase();
        folded_expected = expected.to_ascii_lowercase();
        (folded_value.as_str(), folded_expected.as_str())
    } else {
        (value, expected)
    };
    match operator {
        AttrOperator::Exists => true,
        AttrOperator::Equal => eq(value, expected),
        AttrOperator::Includes => {
            !expected.is_empty() && value.split_ascii_whitespace().any(|token| eq(token, expected))
        },
        AttrOperator::DashMatch => {
            value == expected ||
                (value.len() > expected.len() &&
                    value.starts_with(expected) &&
                    value.as_bytes()[expected.len()] == b'-')
        },
        AttrOperator::Prefix => !expected.is_empty() && value.starts_with(expected),
        AttrOperator::Suffix => !expected.is_empty() && value.ends_with(expected),
        AttrOperator::Substring => !expected.is_empty() && value.contains(expected),
    }
}

/// `An+B` membership: some n ≥ 0 with `A·n + B == index`.
fn nth_matches(a: i32, b: i32, index: u32) -> bool {
    let index = index as i64;
    let a = a as i64;
    let b = b as i64;
    if a == 0 {
        return index == b;
    }
    let difference = index - b;
    difference % a == 0 && difference / a >= 0
}

fn element_index(element: &NodeRef) -> u32 {
    1 + element
        .preceding_siblings()
        .filter(|sibling| sibling.is_element())
        .count() as u32
}

fn element_index_of_type(element: &NodeRef, payload: &Element) -> u32 {
    let name = payload.local_name();
    1 + element
        .preceding_siblings()
        .filter(|sibling| {
            sibling
                .as_element()
                .map(|e| e.local_name() == name)
                .unwrap_or(false)
        })
        .count() as u32
}

fn matches_pseudo_class(
    element: &NodeRef,
    payload: &Element,
    pseudo: &PseudoClass,
    ctx: &MatchingContext,
) -> Fallible<bool> {
    Ok(match pseudo {
        PseudoClass::Root => element
            .parent_node()
            .map(|parent| parent.is_document())
            .unwrap_or(false),
        PseudoClass::Empty => element.children().all(|child| match child.data() {
            crate::node::NodeData::Comment(_) |
            crate::node::NodeData::ProcessingInstruction(_) => true,
            crate::node::NodeData::Text(cdata) | crate::node::NodeData::CdataSection(cdata) => {
                cdata.length() == 0
            },
            _ => false,
        }),
        PseudoClass::FirstChild => previous_element_sibling(element).is_none(),
        PseudoClass::LastChild => next_element_sibling(element).is_none(),
        PseudoClass::OnlyChild => {
            previous_element_sibling(element).is_none() && next_element_sibling(element).is_none()
        },
        PseudoClass::FirstOfType => element_index_of_type(element, payload) == 1,
        PseudoClass::LastOfType => {
            let name = payload.local_name();
            !element.following_siblings().any(|sibling| {
                sibling
                    .as_element()
                    .map(|e| e.local_name() == name)
                    .unwrap_or(false)
            })
        },
        PseudoClass::OnlyOfType => {
            let name = payload.local_name();
            element_index_of_type(element, payload) == 1 &&
                !element.following_siblings().any(|sibling| {
                    sibling
                        .as_element()
                        .map(|e| e.local_name() == name)
                        .unwrap_or(false)
                })
        },
        PseudoClass::NthChild(a, b) => nth_matches(*a, *b, element_index(element)),
        PseudoClass::NthOfType(a, b) => {
            nth_matches(*a, *b, element_index_of_type(element, payload))
        },
        PseudoClass::Not(list) => !matches_selector_list(element, list, ctx)?,
        PseudoClass::Is(list) | PseudoClass::Where(list) => {
            matches_selector_list(element, list, ctx)?
        },
        PseudoClass::Has(list) => matches_has(element, list, ctx)?,
    })
}

/// <https://drafts.csswg.org/selectors/#relational>
fn matches_has(element: &NodeRef, list: &SelectorList, ctx: &MatchingContext) -> Fallible<bool> {
    for complex in &list.selectors {
        let leading = complex.leading_combinator;
        let found = match leading {
            Combinator::Descendant | Combinator::Child => {
                search_has(element.descendants(), element, complex, leading, ctx)?
            },
            Combinator::NextSibling | Combinator::LaterSibling => {
                let mut found = false;
                for sibling in element.following_siblings() {
                    if search_has(sibling.traverse_preorder(), element, complex, leading, ctx)? {
                        found = true;
                        break;
                    }
                }
                found
            },
        };
        if found {
            return Ok(true);
        }
    }
    Ok(false)
}

fn search_has(
    candidates: impl Iterator<Item = NodeRef>,
    anchor: &NodeRef,
    complex: &ComplexSelector,
    leading: Combinator,
    ctx: &MatchingContext,
) -> Fallible<bool> {
    for candidate in candidates {
        ctx.step()?;
        if !candidate.is_element() {
            continue;
        }
        if matches_complex(&candidate, complex, ctx, Some((anchor, leading)))? {
            return Ok(true);
        }
    }
    Ok(false)
}
