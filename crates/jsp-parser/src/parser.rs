//! Document grammar for JSP templates.
//!
//! A hand-written recursive-descent parser with one method per production.
//! Context-sensitive tokens (tag names, text, raw text, server-page regions,
//! EL spans, implicit end tags) come from a [`TokenSource`]; punctuation,
//! attribute words and whitespace are lexed here directly from the bytes.
//!
//! Parsing never fails. Input that fits no production becomes `ERROR` leaves
//! and a [`Diagnostic`], and the parser carries on.

mod attributes;

use jsp_lexer::delimiters;
use jsp_lexer::{ScanOptions, Scanner, Span, Tag, Token, TokenKind, ValidTokens};
use tracing::debug;

use crate::diagnostic::{Diagnostic, LineIndex};
use crate::syntax_kind::SyntaxKind;
use crate::token_source::TokenSource;
use crate::tree::TreeBuilder;
use crate::Parse;

/// JSP template parser.
///
/// Owns its token source for the duration of one pass and builds the tree
/// as it goes.
pub struct Parser<'s, S> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    scanner: S,
    options: ScanOptions,
    builder: TreeBuilder,
    tokens: Vec<Token>,
    errors: Vec<(String, Span)>,
    error_run_end: Option<usize>,
}

/// How a start tag ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagEnd {
    Open,
    SelfClosing,
}

/// What one step of the node loop did to the stack of open elements.
#[derive(Debug)]
enum Step {
    Continue,
    /// An element with child nodes started.
    Open(Tag),
    /// The innermost open element ended.
    Close,
    Done,
}

impl<'s> Parser<'s, Scanner<'s>> {
    /// Parse source text with default options.
    pub fn parse(source: &'s str) -> Parse {
        Self::parse_with_options(source, ScanOptions::default())
    }

    pub fn parse_with_options(source: &'s str, options: ScanOptions) -> Parse {
        Parser::new(source, Scanner::with_options(source, options), options).run()
    }

    /// The tokens the grammar requested from the scanner, in order.
    pub fn tokens(source: &'s str) -> Vec<Token> {
        Self::parse(source).tokens
    }
}

impl<'s, S: TokenSource> Parser<'s, S> {
    pub fn new(source: &'s str, scanner: S, options: ScanOptions) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            scanner,
            options,
            builder: TreeBuilder::new(),
            tokens: Vec::new(),
            errors: Vec::new(),
            error_run_end: None,
        }
    }

    /// Parse the whole input.
    pub fn run(mut self) -> Parse {
        self.component();

        let index = LineIndex::new(self.source);
        let diagnostics: Vec<Diagnostic> = self
            .errors
            .into_iter()
            .map(|(message, span)| index.diagnostic(message, span))
            .collect();
        let tree = self.builder.finish(self.source.to_string());
        debug!(
            nodes = tree.node_count(),
            tokens = self.tokens.len(),
            diagnostics = diagnostics.len(),
            "parsed component"
        );

        Parse {
            tree,
            diagnostics,
            tokens: self.tokens,
        }
    }

    // =========================================================================
    // Documents and nodes
    // =========================================================================

    /// `component := (node | doc_type)*`
    ///
    /// Elements nest through an explicit stack of open tags, not recursion:
    /// the element node stays open in the builder while its tag is on the
    /// stack, so nesting depth is bounded only by memory.
    fn component(&mut self) {
        self.builder.start_node(SyntaxKind::Component, 0);
        let mut open: Vec<Tag> = Vec::new();
        loop {
            let step = match open.last() {
                Some(tag) => self.element_body(tag),
                None => self.top_level(),
            };
            match step {
                Step::Continue => {}
                Step::Open(tag) => open.push(tag),
                Step::Close => {
                    open.pop();
                    self.builder.finish_node();
                }
                Step::Done => break,
            }
        }
        self.builder.finish_node();
    }

    /// One node or doc type outside any element.
    fn top_level(&mut self) -> Step {
        if self.at_eof() {
            return Step::Done;
        }
        if let Some(token) = self.scan(ValidTokens::CONTENT) {
            self.content_token(token);
            return Step::Continue;
        }
        self.trivia();
        if self.at_eof() {
            return Step::Done;
        }
        if self.at(b"<!") {
            self.doc_type();
            return Step::Continue;
        }
        self.markup_node()
    }

    /// A node the scanner handed back whole, or a directive it opened.
    fn content_token(&mut self, token: Token) {
        match token.kind {
            TokenKind::JspDirectiveStart => self.jsp_directive(token),
            kind => self.token(leaf_kind(kind), token),
        }
    }

    /// A node that starts with punctuation the scanner declined: an element,
    /// an end tag, or an interpolation. Anything else is an error.
    fn markup_node(&mut self) -> Step {
        let first = self.peek();
        let second = self.peek_at(1);
        match (first, second) {
            (Some(b'<'), Some(b'/')) => {
                self.end_tag();
            }
            (Some(b'<'), Some(b)) if delimiters::is_tag_name_start(b) => return self.element(),
            (Some(a), b) if self.options.opens_interpolation(a, b) => self.interpolation(),
            _ => self.error_char(),
        }
        Step::Continue
    }

    // =========================================================================
    // Elements
    // =========================================================================

    /// `element := start_tag node* (end_tag | implicit_end_tag) | self_closing_tag`
    ///
    /// Parses the start tag and, for script and style, the raw-text body.
    /// Returns [`Step::Open`] when the element takes child nodes; it stays
    /// open in the builder until its body reports [`Step::Close`].
    fn element(&mut self) -> Step {
        let element = self.builder.start_node(SyntaxKind::Element, self.pos);
        let start_tag = self.builder.start_node(SyntaxKind::StartTag, self.pos);
        self.bump(SyntaxKind::LAngle, 1);

        let Some(name) = self.scan(ValidTokens::START_TAG_NAME) else {
            self.error("expected a tag name", Span::empty(self.pos));
            self.builder.finish_node();
            self.builder.finish_node();
            return Step::Continue;
        };
        let kind = match name.kind {
            TokenKind::TemplateStartTagName => SyntaxKind::TemplateElement,
            TokenKind::ScriptStartTagName => SyntaxKind::ScriptElement,
            TokenKind::StyleStartTagName => SyntaxKind::StyleElement,
            _ => SyntaxKind::Element,
        };
        self.builder.retag(element, kind);
        self.token(SyntaxKind::TagName, name);
        let tag = Tag::new(name.text(self.source));

        if self.start_tag_rest(&tag) == TagEnd::SelfClosing {
            self.builder.retag(start_tag, SyntaxKind::SelfClosingTag);
            self.builder.finish_node();
            self.builder.finish_node();
            return Step::Continue;
        }
        self.builder.finish_node();

        if matches!(kind, SyntaxKind::ScriptElement | SyntaxKind::StyleElement) {
            if let Some(raw) = self.scan(ValidTokens::RAW_TEXT) {
                self.token(SyntaxKind::RawText, raw);
            }
        }
        Step::Open(tag)
    }

    /// Attributes and server-page extras up to `>` or `/>`.
    fn start_tag_rest(&mut self, tag: &Tag) -> TagEnd {
        loop {
            let next = delimiters::skip_whitespace(self.bytes, self.pos);
            if self.bytes[next..].starts_with(b"<%") {
                if let Some(extra) = self.scan(ValidTokens::JSP_EXTRAS) {
                    self.token(leaf_kind(extra.kind), extra);
                    continue;
                }
            }

            self.trivia();
            match (self.peek(), self.peek_at(1)) {
                (Some(b'>'), _) => {
                    self.bump(SyntaxKind::RAngle, 1);
                    return TagEnd::Open;
                }
                (Some(b'/'), Some(b'>')) => {
                    match self.scan(ValidTokens::SELF_CLOSING_TAG_DELIMITER) {
                        Some(token) => {
                            self.token(SyntaxKind::SlashRAngle, token);
                            return TagEnd::SelfClosing;
                        }
                        None => self.error_char(),
                    }
                }
                (None, _) | (Some(b'<'), _) => {
                    self.error(
                        format!("missing `>` after `<{}`", tag.name()),
                        Span::empty(self.pos),
                    );
                    return TagEnd::Open;
                }
                (Some(b'"' | b'\'' | b'=' | b'/'), _) => self.error_char(),
                _ => self.attribute(attributes::Context::Tag),
            }
        }
    }

    /// One child node of the open element `tag`, or the end of it.
    fn element_body(&mut self, tag: &Tag) -> Step {
        match self.scan(ValidTokens::CONTENT | ValidTokens::IMPLICIT_END_TAG) {
            Some(token) if token.kind == TokenKind::ImplicitEndTag => {
                self.token(SyntaxKind::ImplicitEndTag, token);
                if !tag.end_tag_optional() {
                    self.error(
                        format!("missing end tag for `<{}>`", tag.name()),
                        token.span,
                    );
                }
                return Step::Close;
            }
            Some(token) => {
                self.content_token(token);
                return Step::Continue;
            }
            None => {}
        }

        self.trivia();
        if self.at_eof() {
            return Step::Close;
        }
        if self.at(b"</") {
            return if self.end_tag() {
                Step::Close
            } else {
                Step::Continue
            };
        }
        self.markup_node()
    }

    /// `end_tag := "</" tag_name ">"`, or an erroneous end tag when the name
    /// does not close the open element. Returns whether it closed one.
    fn end_tag(&mut self) -> bool {
        let node = self.builder.start_node(SyntaxKind::EndTag, self.pos);
        self.bump(SyntaxKind::LAngleSlash, 2);

        let closed = match self.scan(ValidTokens::ANY_END_TAG_NAME) {
            Some(token) if token.kind == TokenKind::EndTagName => {
                self.token(SyntaxKind::TagName, token);
                true
            }
            Some(token) => {
                self.builder.retag(node, SyntaxKind::ErroneousEndTag);
                self.token(SyntaxKind::ErroneousEndTagName, token);
                self.error(
                    format!("unexpected end tag `</{}>`", token.text(self.source)),
                    token.span,
                );
                false
            }
            None => {
                self.builder.retag(node, SyntaxKind::ErroneousEndTag);
                self.error("expected a tag name", Span::empty(self.pos));
                false
            }
        };

        self.close_angle();
        self.builder.finish_node();
        closed
    }

    /// Expect `>`, turning stray bytes before it into errors.
    fn close_angle(&mut self) {
        loop {
            self.trivia();
            match self.peek() {
                Some(b'>') => {
                    self.bump(SyntaxKind::RAngle, 1);
                    return;
                }
                None | Some(b'<') => {
                    self.error("missing `>`", Span::empty(self.pos));
                    return;
                }
                Some(_) => self.error_char(),
            }
        }
    }

    // =========================================================================
    // Other constructs
    // =========================================================================

    /// `doc_type := "<!" text ">"`
    fn doc_type(&mut self) {
        self.builder.start_node(SyntaxKind::DocType, self.pos);
        self.bump(SyntaxKind::OpenDocType, 2);
        self.trivia();

        let close = self.bytes[self.pos..]
            .iter()
            .position(|&b| b == b'>')
            .map(|offset| self.pos + offset);
        let mut end = close.unwrap_or(self.bytes.len());
        while end > self.pos && delimiters::is_whitespace(self.bytes[end - 1]) {
            end -= 1;
        }
        if end > self.pos {
            self.bump(SyntaxKind::Text, end - self.pos);
        }
        self.trivia();
        match close {
            Some(_) => self.bump(SyntaxKind::RAngle, 1),
            None => self.error("unterminated doctype", Span::empty(self.pos)),
        }
        self.builder.finish_node();
    }

    /// `interpolation := "{{" raw_text? "}}"`
    fn interpolation(&mut self) {
        self.builder.start_node(SyntaxKind::Interpolation, self.pos);
        self.bump(SyntaxKind::OpenInterpolation, 2);
        if let Some(body) = self.scan(ValidTokens::INTERPOLATION_TEXT) {
            self.token(SyntaxKind::RawText, body);
        }
        if self.at(b"}}") {
            self.bump(SyntaxKind::CloseInterpolation, 2);
        } else {
            self.error("unterminated interpolation", Span::empty(self.pos));
        }
        self.builder.finish_node();
    }

    /// `jsp_directive := "<%@" jsp_directive_name attribute* "%>"`
    fn jsp_directive(&mut self, open: Token) {
        self.builder
            .start_node(SyntaxKind::JspDirective, open.span.start);
        self.token(SyntaxKind::OpenJspDirective, open);
        self.trivia();

        let name_end = self.bytes[self.pos..]
            .iter()
            .position(|b| !b.is_ascii_alphabetic())
            .map_or(self.bytes.len(), |offset| self.pos + offset);
        let source = self.source;
        let name = &source[self.pos..name_end];
        if matches!(name, "page" | "taglib" | "include") {
            self.bump(SyntaxKind::JspDirectiveName, name.len());
        } else if name.is_empty() {
            self.error("missing directive name", Span::empty(self.pos));
        } else {
            let span = Span::new(self.pos, name_end);
            self.builder.leaf(SyntaxKind::Error, span);
            self.error(format!("unknown directive `{name}`"), span);
            self.pos = name_end;
        }

        loop {
            self.trivia();
            if self.at(b"%>") {
                self.bump(SyntaxKind::CloseJspDirective, 2);
                break;
            }
            match self.peek() {
                None | Some(b'<') => {
                    self.error("unterminated directive", open.span);
                    break;
                }
                Some(b'"' | b'\'' | b'=' | b'/' | b'>') => self.error_char(),
                Some(_) => self.attribute(attributes::Context::JspDirective),
            }
        }
        self.builder.finish_node();
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn scan(&mut self, valid: ValidTokens) -> Option<Token> {
        let token = self.scanner.scan(self.pos, valid)?;
        self.tokens.push(token);
        Some(token)
    }

    /// Emit a scanned token, with the whitespace the scanner skipped as
    /// trivia in front of it.
    fn token(&mut self, kind: SyntaxKind, token: Token) {
        if token.span.start > self.pos {
            self.builder
                .leaf(SyntaxKind::Trivia, Span::new(self.pos, token.span.start));
        }
        self.builder.leaf(kind, token.span);
        self.pos = token.span.end;
        if !token.terminated {
            self.error(format!("unterminated {kind}"), token.span);
        }
    }

    fn bump(&mut self, kind: SyntaxKind, len: usize) {
        let end = (self.pos + len).min(self.bytes.len());
        self.builder.leaf(kind, Span::new(self.pos, end));
        self.pos = end;
    }

    fn trivia(&mut self) {
        let end = delimiters::skip_whitespace(self.bytes, self.pos);
        if end > self.pos {
            self.bump(SyntaxKind::Trivia, end - self.pos);
        }
    }

    /// Consume one character as an `ERROR` leaf. Adjacent error characters
    /// share one diagnostic.
    fn error_char(&mut self) {
        let len = self.source[self.pos..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        let span = Span::new(self.pos, (self.pos + len).min(self.bytes.len()));
        self.builder.leaf(SyntaxKind::Error, span);

        match self.errors.last_mut() {
            Some((message, last)) if self.error_run_end == Some(span.start) => {
                last.end = span.end;
                *message = format!("unexpected `{}`", &self.source[last.start..last.end]);
            }
            _ => self.error(
                format!("unexpected `{}`", &self.source[span.start..span.end]),
                span,
            ),
        }
        self.error_run_end = Some(span.end);
        self.pos = span.end;
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        let message = message.into();
        debug!(start = span.start, end = span.end, %message, "recovered");
        self.errors.push((message, span));
        self.error_run_end = None;
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn at(&self, prefix: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(prefix)
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}

/// Tree kind for a token the scanner returns whole.
fn leaf_kind(kind: TokenKind) -> SyntaxKind {
    match kind {
        TokenKind::JspScriptlet => SyntaxKind::JspScriptlet,
        TokenKind::JspExpression => SyntaxKind::JspExpression,
        TokenKind::JspDeclaration => SyntaxKind::JspDeclaration,
        TokenKind::JspComment => SyntaxKind::JspComment,
        TokenKind::JspDirectiveStart => SyntaxKind::OpenJspDirective,
        TokenKind::ElExpression => SyntaxKind::ElExpression,
        TokenKind::TextFragment => SyntaxKind::Text,
        TokenKind::InterpolationText | TokenKind::RawText => SyntaxKind::RawText,
        TokenKind::StartTagName
        | TokenKind::TemplateStartTagName
        | TokenKind::ScriptStartTagName
        | TokenKind::StyleStartTagName
        | TokenKind::EndTagName => SyntaxKind::TagName,
        TokenKind::ErroneousEndTagName => SyntaxKind::ErroneousEndTagName,
        TokenKind::SelfClosingTagDelimiter => SyntaxKind::SlashRAngle,
        TokenKind::ImplicitEndTag => SyntaxKind::ImplicitEndTag,
        TokenKind::Comment => SyntaxKind::Comment,
    }
}
