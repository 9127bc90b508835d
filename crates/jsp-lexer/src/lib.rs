//! JSP Lexer
//!
//! Context-sensitive scanner for JSP templates that mix HTML, server-page
//! regions (`<% %>`, `<%= %>`, `<%! %>`, `<%-- --%>`, `<%@ %>`), EL
//! expressions (`${...}`, `#{...}`) and mustache interpolation (`{{ }}`).
//!
//! The scanner never runs on its own: a grammar asks it for one token at a
//! time, naming the token kinds it can accept. The scanner answers from the
//! source and its open-tag stack, which is the only state it keeps.
//!
//! # Example
//!
//! ```
//! use jsp_lexer::{Scanner, TokenKind, ValidTokens};
//!
//! let mut scanner = Scanner::new("<%= user %>");
//! let token = scanner.scan(0, ValidTokens::CONTENT).unwrap();
//! assert_eq!(token.kind, TokenKind::JspExpression);
//! assert_eq!(token.span.end, 11);
//! ```

pub mod delimiters;
pub mod options;
pub mod scanner;
pub mod state;
pub mod tag;
pub mod token;

pub use options::ScanOptions;
pub use scanner::{scan, Scanner};
pub use state::{LexMode, ScannerState, SERIALIZATION_BUFFER_SIZE};
pub use tag::{Tag, TagCategory};
pub use token::{Span, Token, TokenKind, ValidTokens};

/// Failure to restore a [`ScannerState`] from a serialized blob.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state blob truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("tag name at byte {offset} is not valid UTF-8")]
    InvalidTagName { offset: usize },

    #[error("state blob lists {serialized} tags but a depth of only {total}")]
    CountMismatch { serialized: usize, total: usize },
}
