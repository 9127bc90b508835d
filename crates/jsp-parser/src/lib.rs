//! JSP Parser
//!
//! Builds a lossless concrete syntax tree for JSP templates: HTML markup with
//! server-page regions, EL expressions, mustache interpolation and reactive
//! directive attributes. Parsing is infallible; malformed input yields
//! `ERROR` leaves and [`Diagnostic`]s next to an otherwise complete tree.
//!
//! # Example
//!
//! ```
//! let parse = jsp_parser::parse("<p>Hello ${user}</p>");
//! assert_eq!(
//!     parse.tree.to_sexp(),
//!     "(component (element (start_tag (tag_name)) (text) (el_expression) (end_tag (tag_name))))"
//! );
//! assert_eq!(parse.tree.reconstruct(), "<p>Hello ${user}</p>");
//! ```

pub mod diagnostic;
pub mod incremental;
pub mod parser;
pub mod syntax_kind;
pub mod token_source;
pub mod tree;

pub use diagnostic::Diagnostic;
pub use incremental::{EditError, ReuseStats, Session, TextEdit};
pub use parser::Parser;
pub use syntax_kind::SyntaxKind;
pub use token_source::TokenSource;
pub use tree::{Node, NodeId, Tree};

use jsp_lexer::{ScanOptions, Token};

/// Result of one parse pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    pub tree: Tree,
    pub diagnostics: Vec<Diagnostic>,
    /// Every token the grammar obtained from the scanner, in request order.
    pub tokens: Vec<Token>,
}

impl Parse {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Parse with default options.
pub fn parse(source: &str) -> Parse {
    Parser::parse(source)
}

pub fn parse_with_options(source: &str, options: ScanOptions) -> Parse {
    Parser::parse_with_options(source, options)
}
