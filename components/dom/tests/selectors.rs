/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use dom::Error;

use crate::{append_element, document_with_root};

#[test]
fn nth_child_and_not_select_the_even_elements() {
    let (document, root) = document_with_root();
    let parent = append_element(&document, &root, "parent");
    for index in 0..10 {
        let child = append_element(&document, &parent, "item");
        child
            .set_attribute("class", if index % 2 == 0 { "odd" } else { "even" })
            .expect("class");
    }

    let selected = document
        .query_selector_all(":nth-child(2n):not(.odd)")
        .expect("query");
    assert_eq!(selected.len(), 5);
    for node in &selected {
        assert!(node.as_element().expect("element").has_class("even"));
    }
}

#[test]
fn matches_agrees_with_query_selector_all() {
    let (document, root) = document_with_root();
    let section = append_element(&document, &root, "section");
    section.set_attribute("class", "wide").expect("attr");
    let inner = append_element(&document, &section, "p");
    inner.set_attribute("data-kind", "Note").expect("attr");
    append_element(&document, &inner, "span");

    for selector in [
        "p",
        "section > p",
        "section.wide p span",
        "[data-kind=Note]",
        "[data-kind=note i]",
        "section + p",
        "p ~ span",
        ":root",
        "section:has(> p)",
        "*",
    ] {
        let selected = document.query_selector_all(selector).expect("query");
        assert_eq!(
            document.query_selector(selector).expect("query"),
            selected.first().cloned(),
            "first match for {}",
            selector
        );
        for node in document.traverse_preorder().filter(|node| node.is_element()) {
            let in_results = selected.contains(&node);
            assert_eq!(
                node.matches(selector).expect("matches"),
                in_results,
                "element {:?} vs {}",
                node,
                selector
            );
        }
    }
}

#[test]
fn universal_selector_counts_every_element() {
    let (document, root) = document_with_root();
    let a = append_element(&document, &root, "a");
    append_element(&document, &a, "b");
    append_element(&document, &root, "c");

    let all = document.query_selector_all("*").expect("query");
    let elements = document
        .traverse_preorder()
        .filter(|node| node.is_element())
        .count();
    assert_eq!(all.len(), elements);
}

#[test]
fn id_fast_path_and_scoped_queries() {
    let (document, root) = document_with_root();
    let section = append_element(&document, &root, "section");
    let target = append_element(&document, &section, "div");
    target.set_attribute("id", "pick-me").expect("attr");

    assert_eq!(
        document.query_selector("#pick-me").expect("query"),
        Some(target.clone())
    );
    // Element-scoped queries only see descendants.
    assert_eq!(
        section.query_selector("#pick-me").expect("query"),
        Some(target.clone())
    );
    assert_eq!(target.query_selector("#pick-me").expect("query"), None);
}

#[test]
fn combinators() {
    let (document, root) = document_with_root();
    let list = append_element(&document, &root, "ul");
    let first = append_element(&document, &list, "li");
    let second = append_element(&document, &list, "li");
    let third = append_element(&document, &list, "li");
    let nested = append_element(&document, &second, "li");

    assert_eq!(
        document.query_selector_all("ul > li").expect("query"),
        vec![first.clone(), second.clone(), third.clone()]
    );
    assert_eq!(
        document.query_selector_all("ul li").expect("query"),
        vec![first.clone(), second.clone(), nested.clone(), third.clone()]
    );
    assert_eq!(
        document.query_selector_all("li + li").expect("query"),
        vec![second.clone(), third.clone()]
    );
    assert_eq!(
        document.query_selector_all("li:first-child ~ li").expect("query"),
        vec![second, third]
    );
    let _ = first;
}

#[test]
fn attribute_operators() {
    let (document, root) = document_with_root();
    let element = append_element(&document, &root, "a");
    element.set_attribute("href", "https://example.test/page.html").expect("attr");
    element.set_attribute("lang", "en-US").expect("attr");
    element.set_attribute("rel", "prev next").expect("attr");

    for (selector, expected) in [
        ("[href]", true),
        ("[missing]", false),
        ("[lang=en-US]", true),
        ("[lang=en]", false),
        ("[lang|=en]", true),
        ("[rel~=next]", true),
        ("[rel~=nex]", false),
        ("[href^='https://']", true),
        ("[href$='.html']", true),
        ("[href*=example]", true),
        ("[href*=EXAMPLE]", false),
        ("[href*=EXAMPLE i]", true),
    ] {
        assert_eq!(
            element.matches(selector).expect("matches"),
            expected,
            "selector {}",
            selector
        );
    }
}

#[test]
fn structural_pseudo_classes() {
    let (document, root) = document_with_root();
    let parent = append_element(&document, &root, "p");
    let only_text = document.create_text_node("x").expect("text");
    parent.append_child(&only_text).expect("append");
    let a = append_element(&document, &root, "a");
    let b1 = append_element(&document, &a, "b");
    append_element(&document, &a, "c");
    let b2 = append_element(&document, &a, "b");

    assert!(!parent.matches(":empty").expect("matches"));
    assert!(b1.matches(":first-child").expect("matches"));
    assert!(!b1.matches(":last-child").expect("matches"));
    assert!(b1.matches(":first-of-type").expect("matches"));
    assert!(b2.matches(":last-of-type").expect("matches"));
    assert!(!b1.matches(":only-of-type").expect("matches"));
    assert_eq!(
        document.query_selector_all("c:only-of-type").expect("q").len(),
        1
    );
    assert!(root.matches(":root").expect("matches"));
    assert!(!a.matches(":root").expect("matches"));

    let empty = append_element(&document, &root, "void");
    assert!(empty.matches(":empty").expect("matches"));
}

#[test]
fn is_where_and_has() {
    let (document, root) = document_with_root();
    let article = append_element(&document, &root, "article");
    let aside = append_element(&document, &root, "aside");
    append_element(&document, &aside, "mark");

    assert!(article.matches(":is(article, aside)").expect("matches"));
    assert!(article.matches(":where(article, aside)").expect("matches"));
    assert!(!article.matches(":is(aside)").expect("matches"));

    assert!(aside.matches(":has(mark)").expect("matches"));
    assert!(aside.matches(":has(> mark)").expect("matches"));
    assert!(!article.matches(":has(mark)").expect("matches"));
    // Sibling-relative :has.
    assert!(article.matches(":has(+ aside)").expect("matches"));
    assert!(!aside.matches(":has(+ article)").expect("matches"));
}

#[test]
fn selector_errors() {
    let (document, _root) = document_with_root();
    for bad in ["", "..x", "[unclosed", "p >", "::first-line", ":nth-child(q)"] {
        assert_eq!(
            document.query_selector(bad).unwrap_err(),
            Error::Syntax,
            "input {:?}",
            bad
        );
    }
    let oversized = format!("a{}", ".b".repeat(4096));
    assert_eq!(
        document.query_selector(&oversized).unwrap_err(),
        Error::QuotaExceeded
    );

    let text = document.create_text_node("t").expect("text");
    assert_eq!(text.query_selector("a").unwrap_err(), Error::InvalidNodeType);
    assert_eq!(text.matches("a").unwrap_err(), Error::InvalidNodeType);
}

#[test]
fn closest_walks_inclusive_ancestors() {
    let (document, root) = document_with_root();
    let section = append_element(&document, &root, "section");
    section.set_attribute("class", "boxed").expect("attr");
    let deep = append_element(&document, &section, "span");

    assert_eq!(
        deep.closest(".boxed").expect("closest"),
        Some(section.clone())
    );
    assert_eq!(deep.closest("span").expect("closest"), Some(deep.clone()));
    assert_eq!(deep.closest("missing").expect("closest"), None);
}

#[test]
fn bloom_filter_rejects_do_not_cause_false_negatives() {
    let (document, root) = document_with_root();
    for index in 0..64 {
        let element = append_element(&document, &root, "n");
        element
            .set_attribute("class", &format!("c{} shared", index))
            .expect("attr");
    }
    assert_eq!(document.query_selector_all(".shared").expect("q").len(), 64);
    assert_eq!(document.query_selector_all(".c10.shared").expect("q").len(), 1);
    assert_eq!(
        document.query_selector_all(".c10.missing").expect("q").len(),
        0
    );
}
