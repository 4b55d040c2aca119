/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! DOM exceptions, one variant per name the core can raise.

use std::fmt;

/// An error generated by a DOM operation. Variants correspond to
/// <https://webidl.spec.whatwg.org/#idl-DOMException-error-names>.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// IndexSizeError DOMException
    IndexSize,
    /// HierarchyRequestError DOMException
    HierarchyRequest,
    /// WrongDocumentError DOMException
    WrongDocument,
    /// InvalidCharacterError DOMException
    InvalidCharacter,
    /// NotFoundError DOMException
    NotFound,
    /// NotSupportedError DOMException
    NotSupported,
    /// InvalidStateError DOMException
    InvalidState,
    /// SyntaxError DOMException
    Syntax,
    /// InvalidNodeTypeError DOMException
    InvalidNodeType,
    /// NamespaceError DOMException
    Namespace,
    /// SecurityError DOMException
    Security,
    /// InUseAttributeError DOMException
    InUseAttribute,
    /// QuotaExceededError DOMException
    QuotaExceeded,
    /// The allocator refused to give us more memory.
    OutOfMemory,
}

impl Error {
    /// The WebIDL name of the exception, as a binding layer would expose it.
    pub fn name(self) -> &'static str {
        match self {
            Error::IndexSize => "IndexSizeError",
            Error::HierarchyRequest => "HierarchyRequestError",
            Error::WrongDocument => "WrongDocumentError",
            Error::InvalidCharacter => "InvalidCharacterError",
            Error::NotFound => "NotFoundError",
            Error::NotSupported => "NotSupportedError",
            Error::InvalidState => "InvalidStateError",
            Error::Syntax => "SyntaxError",
            Error::InvalidNodeType => "InvalidNodeTypeError",
            Error::Namespace => "NamespaceError",
            Error::Security => "SecurityError",
            Error::InUseAttribute => "InUseAttributeError",
            Error::QuotaExceeded => "QuotaExceededError",
            Error::OutOfMemory => "OutOfMemoryError",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::error::Error for Error {}

/// The result of a fallible DOM operation.
pub type Fallible<T> = Result<T, Error>;

/// The result of a DOM operation that only fails exceptionally.
pub type ErrorResult = Fallible<()>;
