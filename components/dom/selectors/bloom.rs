/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A 64-bit bloom filter over class tokens.
//!
//! Elements carry the union of their class tokens' bits; each compound
//! selector carries the bits of the classes it mentions. A compound whose
//! bits are not a subset of the element's cannot match, which rejects most
//! candidates without a single string comparison. The hash depends only on
//! the token's bytes, so bits survive adoption across documents.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// The bit for one class token.
pub(crate) fn class_bit(token: &str) -> u64 {
    let mut hasher = FxHasher::default();
    token.hash(&mut hasher);
    1u64 << (hasher.finish() % 64)
}

/// True if a compound with `needed` bits can possibly match an element
/// carrying `available` bits.
pub(crate) fn may_match(needed: u64, available: u64) -> bool {
    needed & !available == 0
}

#[cfg(test)]
mod tests {
    use super::{class_bit, may_match};

    #[test]
    fn subset_may_match() {
        let a = class_bit("alpha");
        let b = class_bit("beta");
        assert!(may_match(a, a | b));
        assert!(may_match(0, a));
    }

    #[test]
    fn missing_bit_rejects() {
        let a = class_bit("alpha");
        let b = class_bit("beta");
        if a != b {
            assert!(!may_match(a | b, a));
        }
    }
}
