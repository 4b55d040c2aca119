/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Selector compilation: text to AST.
//!
//! Names mentioned by a selector are interned into the document's pool at
//! compile time, so matching compares pointers. Input length and nesting
//! depth are capped up front; an unparseable selector is a `SyntaxError`.

use smallvec::SmallVec;

use crate::atom::Atom;
use crate::document::Document;
use crate::error::{Error, Fallible};
use crate::selectors::bloom;

/// Inputs longer than this are rejected before parsing.
pub(crate) const MAX_SELECTOR_LENGTH: usize = 4096;
/// `:not(:is(:not(…)))` nesting deeper than this is rejected.
pub(crate) const MAX_NESTING_DEPTH: usize = 16;

/// A parsed selector list (comma-separated complex selectors).
#[derive(Debug)]
pub struct SelectorList {
    pub(crate) selectors: SmallVec<[ComplexSelector; 1]>,
}

/// One complex selector, stored right-to-left: `compounds[0]` is the
/// subject compound, `combinators[i]` links `compounds[i]` to
/// `compounds[i + 1]` on its left.
#[derive(Debug)]
pub(crate) struct ComplexSelector {
    pub compounds: Vec<Compound>,
    pub combinators: Vec<Combinator>,
    /// Only used inside `:has(…)`: how the leftmost compound relates to
    /// the anchor element.
    pub leading_combinator: Combinator,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Combinator {
    Descendant,
    Child,
    NextSibling,
    LaterSibling,
}

#[derive(Debug)]
pub(crate) struct Compound {
    pub simples: Vec<SimpleSelector>,
    /// Bits of every class this compound mentions.
    pub class_bloom: u64,
}

#[derive(Debug)]
pub(crate) enum SimpleSelector {
    Universal,
    Type(Atom),
    Id(Atom),
    Class(Atom),
    Attribute(AttrSelector),
    PseudoClass(PseudoClass),
}

#[derive(Debug)]
pub(crate) struct AttrSelector {
    pub name: Atom,
    pub operator: AttrOperator,
    pub value: Option<String>,
    pub case_insensitive: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum AttrOperator {
    Exists,
    Equal,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

#[derive(Debug)]
pub(crate) enum PseudoClass {
    Root,
    Empty,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    /// `An+B` with the `A` and `B` resolved at compile time.
    NthChild(i32, i32),
    NthOfType(i32, i32),
    Not(SelectorList),
    Is(SelectorList),
    /// Identical to `:is` here; specificity does not exist in this engine.
    Where(SelectorList),
    Has(SelectorList),
}

impl SelectorList {
    /// Compiles `input` against `pool`'s interned names.
    pub fn parse(pool: &Document, input: &str) -> Fallible<SelectorList> {
        if input.len() > MAX_SELECTOR_LENGTH {
            return Err(Error::QuotaExceeded);
        }
        let mut parser = Parser {
            input: input.chars().collect(),
            position: 0,
            pool,
        };
        let list = parser.parse_selector_list(0, false)?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(Error::Syntax);
        }
        Ok(list)
    }
}

struct Parser<'a> {
    input: Vec<char>,
    position: usize,
    pool: &'a Document,
}

impl<'a> Parser<'a> {
    fn at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.position += 1;
        }
        self.position != start
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-name>
    fn parse_identifier(&mut self) -> Fallible<String> {
        let mut name = String::new();
        // Leading hyphen is allowed; a lone hyphen is not a name.
        if self.peek() == Some('-') {
            name.push('-');
            self.position += 1;
        }
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '\\' || c as u32 >= 0x80 => {},
            _ => return Err(Error::Syntax),
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c as u32 >= 0x80 {
                name.push(c);
                self.position += 1;
            } else if c == '\\' {
                self.position += 1;
                name.push(self.parse_escape()?);
            } else {
                break;
            }
        }
        if name.is_empty() || name == "-" {
            return Err(Error::Syntax);
        }
        Ok(name)
    }

    /// <https://drafts.csswg.org/css-syntax/#consume-escaped-code-point>
    fn parse_escape(&mut self) -> Fallible<char> {
        let first = self.bump().ok_or(Error::Syntax)?;
        if !first.is_ascii_hexdigit() {
            return Ok(first);
        }
        let mut value = first.to_digit(16).unwrap_or(0);
        let mut digits = 1;
        while digits < 6 {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    value = value * 16 + c.to_digit(16).unwrap_or(0);
                    self.position += 1;
                    digits += 1;
                },
                _ => break,
            }
        }
        // One whitespace character after a hex escape is consumed.
        if matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
            self.position += 1;
        }
        char::from_u32(value).ok_or(Error::Syntax)
    }

    fn parse_string(&mut self, quote: char) -> Fallible<String> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(value),
                Some('\\') => value.push(self.parse_escape()?),
                Some(c) => value.push(c),
                None => return Err(Error::Syntax),
            }
        }
    }

    fn parse_selector_list(&mut self, depth: usize, relative: bool) -> Fallible<SelectorList> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::QuotaExceeded);
        }
        let mut selectors = SmallVec::new();
        loop {
            selectors.push(self.parse_complex_selector(depth, relative)?);
            self.skip_whitespace();
            if !self.eat(',') {
                break;
            }
        }
        Ok(SelectorList { selectors })
    }

    fn parse_combinator_symbol(&mut self) -> Option<Combinator> {
        if self.eat('>') {
            Some(Combinator::Child)
        } else if self.eat('+') {
            Some(Combinator::NextSibling)
        } else if self.eat('~') {
            Some(Combinator::LaterSibling)
        } else {
            None
        }
    }

    fn parse_complex_selector(
        &mut self,
        depth: usize,
        relative: bool,
    ) -> Fallible<ComplexSelector> {
        self.skip_whitespace();
        // A relative selector (inside :has) may lead with a combinator.
        let leading = if relative {
            let explicit = self.parse_combinator_symbol();
            self.skip_whitespace();
            explicit.unwrap_or(Combinator::Descendant)
        } else {
            Combinator::Descendant
        };
        // Parsed left-to-right, stored right-to-left.
        let mut compounds = vec![self.parse_compound(depth)?];
        let mut combinators = Vec::new();
        loop {
            let had_whitespace = self.skip_whitespace();
            let combinator = match self.parse_combinator_symbol() {
                Some(combinator) => {
                    self.skip_whitespace();
                    combinator
                },
                None => {
                    // Only whitespace: a descendant combinator, if another
                    // compound follows.
                    if !had_whitespace || !self.starts_compound() {
                        break;
                    }
                    Combinator::Descendant
                },
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound(depth)?);
        }
        compounds.reverse();
        combinators.reverse();
        Ok(ComplexSelector {
            compounds,
            combinators,
            leading_combinator: leading,
        })
    }

    fn starts_compound(&self) -> bool {
        matches!(
            self.peek(),
            Some(c) if c == '*' || c == '#' || c == '.' || c == '[' || c == ':' ||
                c == '_' || c == '-' || c == '\\' || c.is_ascii_alphabetic() || c as u32 >= 0x80
        )
    }

    fn parse_compound(&mut self, depth: usize) -> Fallible<Compound> {
        let mut simples = Vec::new();
        let mut class_bloom = 0u64;
        // Type or universal selector first, if present.
        if self.eat('*') {
            simples.push(SimpleSelector::Universal);
        } else if matches!(
            self.peek(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '\\' || c as u32 >= 0x80
        ) {
            let name = self.parse_identifier()?;
            simples.push(SimpleSelector::Type(self.pool.intern(&name)));
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.position += 1;
                    let name = self.parse_identifier()?;
                    simples.push(SimpleSelector::Id(self.pool.intern(&name)));
                },
                Some('.') => {
                    self.position += 1;
                    let name = self.parse_identifier()?;
                    class_bloom |= bloom::class_bit(&name);
                    simples.push(SimpleSelector::Class(self.pool.intern(&name)));
                },
                Some('[') => {
                    self.position += 1;
                    simples.push(SimpleSelector::Attribute(self.parse_attribute()?));
                },
                Some(':') => {
                    self.position += 1;
                    if self.peek() == Some(':') {
                        // Pseudo-elements have no rendering model here.
                        return Err(Error::Syntax);
                    }
                    simples.push(SimpleSelector::PseudoClass(self.parse_pseudo_class(depth)?));
                },
                _ => break,
            }
        }
        if simples.is_empty() {
            return Err(Error::Syntax);
        }
        Ok(Compound {
            simples,
            class_bloom,
        })
    }

    /// <https://drafts.csswg.org/selectors/#attribute-selectors>
    fn parse_attribute(&mut self) -> Fallible<AttrSelector> {
        self.skip_whitespace();
        let name = self.parse_identifier()?;
        self.skip_whitespace();
        let operator = if self.eat(']') {
            return Ok(AttrSelector {
                name: self.pool.intern(&name),
                operator: AttrOperator::Exists,
                value: None,
                case_insensitive: false,
            });
        } else if self.eat('=') {
            AttrOperator::Equal
        } else if self.eat('~') {
            if !self.eat('=') {
                return Err(Error::Syntax);
            }
            AttrOperator::Includes
        } else if self.eat('|') {
            if !self.eat('=') {
                return Err(Error::Syntax);
            }
            AttrOperator::DashMatch
        } else if self.eat('^') {
            if !self.eat('=') {
                return Err(Error::Syntax);
            }
            AttrOperator::Prefix
        } else if self.eat('$') {
            if !self.eat('=') {
                return Err(Error::Syntax);
            }
            AttrOperator::Suffix
        } else if self.eat('*') {
            if !self.eat('=') {
                return Err(Error::Syntax);
            }
            AttrOperator::Substring
        } else {
            return Err(Error::Syntax);
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.position += 1;
                self.parse_string(quote)?
            },
            _ => self.parse_identifier()?,
        };
        self.skip_whitespace();
        let mut case_insensitive = false;
        if matches!(self.peek(), Some('i' | 'I')) {
            self.position += 1;
            case_insensitive = true;
            self.skip_whitespace();
        } else if matches!(self.peek(), Some('s' | 'S')) {
            // Explicit case-sensitive flag; the default.
            self.position += 1;
            self.skip_whitespace();
        }
        if !self.eat(']') {
            return Err(Error::Syntax);
        }
        Ok(AttrSelector {
            name: self.pool.intern(&name),
            operator,
            value: Some(value),
            case_insensitive,
        })
    }

    fn parse_pseudo_class(&mut self, depth: usize) -> Fallible<PseudoClass> {
        let name = self.parse_identifier()?;
        let lower = name.to_ascii_lowercase();
        let takes_argument = self.eat('(');
        let pseudo = match (lower.as_str(), takes_argument) {
            ("root", false) => PseudoClass::Root,
            ("empty", false) => PseudoClass::Empty,
            ("first-child", false) => PseudoClass::FirstChild,
            ("last-child", false) => PseudoClass::LastChild,
            ("only-child", false) => PseudoClass::OnlyChild,
            ("first-of-type", false) => PseudoClass::FirstOfType,
            ("last-of-type", false) => PseudoClass::LastOfType,
            ("only-of-type", false) => PseudoClass::OnlyOfType,
            ("nth-child", true) => {
                let (a, b) = self.parse_nth()?;
                PseudoClass::NthChild(a, b)
            },
            ("nth-of-type", true) => {
                let (a, b) = self.parse_nth()?;
                PseudoClass::NthOfType(a, b)
            },
            ("not", true) => PseudoClass::Not(self.parse_selector_list(depth + 1, false)?),
            ("is", true) => PseudoClass::Is(self.parse_selector_list(depth + 1, false)?),
            ("where", true) => PseudoClass::Where(self.parse_selector_list(depth + 1, false)?),
            ("has", true) => PseudoClass::Has(self.parse_selector_list(depth + 1, true)?),
            _ => return Err(Error::Syntax),
        };
        if takes_argument {
            self.skip_whitespace();
            if !self.eat(')') {
                return Err(Error::Syntax);
            }
        }
        Ok(pseudo)
    }

    /// <https://drafts.csswg.org/css-syntax/#anb-microsyntax>
    fn parse_nth(&mut self) -> Fallible<(i32, i32)> {
        self.skip_whitespace();
        // odd | even
        if matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() && c != 'n' && c != 'N' && c != '-')
        {
            let word = self.parse_identifier()?;
            return match word.to_ascii_lowercase().as_str() {
                "odd" => Ok((2, 1)),
                "even" => Ok((2, 0)),
                _ => Err(Error::Syntax),
            };
        }
        let mut negative = false;
        if self.eat('-') {
            negative = true;
        } else {
            let _ = self.eat('+');
        }
        let digits = self.parse_digits();
        let has_n = matches!(self.peek(), Some('n' | 'N'));
        if has_n {
            self.position += 1;
            let a = match digits {
                Some(a) => {
                    if negative {
                        -a
                    } else {
                        a
                    }
                },
                None => {
                    if negative {
                        -1
                    } else {
                        1
                    }
                },
            };
            self.skip_whitespace();
            let b_negative = if self.eat('+') {
                false
            } else if self.eat('-') {
                true
            } else {
                return Ok((a, 0));
            };
            self.skip_whitespace();
            let b = self.parse_digits().ok_or(Error::Syntax)?;
            Ok((a, if b_negative { -b } else { b }))
        } else {
            let b = digits.ok_or(Error::Syntax)?;
            Ok((0, if negative { -b } else { b }))
        }
    }

    fn parse_digits(&mut self) -> Option<i32> {
        let mut value: i64 = 0;
        let mut any = false;
        while let Some(c) = self.peek() {
            match c.to_digit(10) {
                Some(digit) => {
                    any = true;
                    value = (value * 10 + digit as i64).min(i32::MAX as i64);
                    self.position += 1;
                },
                None => break,
            }
        }
        if any {
            Some(value as i32)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn parse(input: &str) -> Fallible<SelectorList> {
        let document = Document::new_node();
        let doc = document.as_document().expect("document payload");
        SelectorList::parse(doc, input)
    }

    #[test]
    fn parses_compound_chain() {
        let list = parse("div.note > p#intro + span[data-x=\"1\" i]").expect("should parse");
        assert_eq!(list.selectors.len(), 1);
        let complex = &list.selectors[0];
        assert_eq!(complex.compounds.len(), 3);
        assert_eq!(
            complex.combinators,
            vec![Combinator::NextSibling, Combinator::Child]
        );
    }

    #[test]
    fn parses_nth_forms() {
        for (input, expected) in [
            (":nth-child(odd)", (2, 1)),
            (":nth-child(even)", (2, 0)),
            (":nth-child(3)", (0, 3)),
            (":nth-child(2n)", (2, 0)),
            (":nth-child(2n+1)", (2, 1)),
            (":nth-child(-n+4)", (-1, 4)),
            (":nth-child(n)", (1, 0)),
        ] {
            let list = parse(input).expect("should parse");
            match &list.selectors[0].compounds[0].simples[0] {
                SimpleSelector::PseudoClass(PseudoClass::NthChild(a, b)) => {
                    assert_eq!((*a, *b), expected, "for {}", input);
                },
                _ => panic!("expected nth-child for {}", input),
            }
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("..foo").is_err());
        assert!(parse("div >").is_err());
        assert!(parse("[attr=").is_err());
        assert!(parse(":nth-child(x)").is_err());
        assert!(parse("::before").is_err());
    }

    #[test]
    fn rejects_oversized_input() {
        let oversized = "a".repeat(MAX_SELECTOR_LENGTH + 1);
        assert_eq!(parse(&oversized).unwrap_err(), Error::QuotaExceeded);
    }

    #[test]
    fn nesting_depth_is_bounded() {
        let mut nested = String::from("a");
        for _ in 0..MAX_NESTING_DEPTH + 1 {
            nested = format!(":not({})", nested);
        }
        assert_eq!(parse(&nested).unwrap_err(), Error::QuotaExceeded);
    }
}
