//! Attribute productions: plain attributes, directive attributes and their
//! values.
//!
//! Directive attributes are recognized by a dry run over the word first. If
//! any adjacent piece the directive needs is missing, nothing is consumed and
//! the word is parsed as a plain attribute instead.

use jsp_lexer::delimiters::{self, is_whitespace};
use jsp_lexer::{Span, Token, ValidTokens};

use super::{leaf_kind, Parser};
use crate::syntax_kind::SyntaxKind;
use crate::token_source::TokenSource;

/// Where an attribute appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Context {
    /// Inside a start tag: directives and EL values are allowed.
    Tag,
    /// Inside `<%@ ... %>`: plain attributes only, `%>` ends words.
    JspDirective,
}

/// A region inside a quoted value that the scanner returns whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Embedded {
    El,
    Jsp,
}

// ---------------------------------------------------------------------------
// Byte classes
// ---------------------------------------------------------------------------

/// `[^<>"'=/\s]`
fn is_name_byte(b: u8) -> bool {
    !matches!(b, b'<' | b'>' | b'"' | b'\'' | b'=' | b'/') && !is_whitespace(b)
}

/// `[^<>"'=\s]`
fn is_unquoted_value_byte(b: u8) -> bool {
    !matches!(b, b'<' | b'>' | b'"' | b'\'' | b'=') && !is_whitespace(b)
}

fn is_directive_name_byte(b: u8) -> bool {
    is_name_byte(b) && b != b':' && b != b'.'
}

/// Arguments and modifiers: `[^<>"'/=\s.]`
fn is_argument_byte(b: u8) -> bool {
    is_name_byte(b) && b != b'.'
}

fn is_dynamic_value_byte(b: u8) -> bool {
    is_name_byte(b) && b != b']'
}

fn run_end(bytes: &[u8], from: usize, pred: fn(u8) -> bool) -> usize {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|&b| !pred(b))
        .map_or(bytes.len(), |offset| from + offset)
}

// ---------------------------------------------------------------------------
// Directive shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Argument {
    Static(Span),
    Dynamic { value: Option<Span> },
}

/// The lexical pieces of a directive attribute, without its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Directive {
    pub name: Span,
    pub colon: bool,
    pub argument: Option<Argument>,
    pub modifiers: Vec<Span>,
}

/// Dry-run a directive attribute at `start`.
///
/// `v-name[:arg | :[dyn]][.mod]*` or a shorthand (`:`, `@`, `#`) followed
/// immediately by an argument. Returns `None` when the word does not have
/// that shape.
pub(super) fn lex_directive(bytes: &[u8], start: usize) -> Option<Directive> {
    let (name_end, shorthand) = if bytes[start..].starts_with(b"v-") {
        let end = run_end(bytes, start + 2, is_directive_name_byte);
        if end == start + 2 {
            return None;
        }
        (end, false)
    } else if matches!(bytes.get(start), Some(b':' | b'@' | b'#')) {
        (start + 1, true)
    } else {
        return None;
    };

    let mut end = name_end;
    let mut colon = false;
    let mut argument = None;
    if shorthand {
        let (arg, arg_end) = lex_argument(bytes, end)?;
        argument = Some(arg);
        end = arg_end;
    } else if bytes.get(end) == Some(&b':') {
        let (arg, arg_end) = lex_argument(bytes, end + 1)?;
        colon = true;
        argument = Some(arg);
        end = arg_end;
    }

    let mut modifiers = Vec::new();
    while bytes.get(end) == Some(&b'.') {
        let modifier_end = run_end(bytes, end + 1, is_argument_byte);
        if modifier_end == end + 1 {
            return None;
        }
        modifiers.push(Span::new(end + 1, modifier_end));
        end = modifier_end;
    }

    Some(Directive {
        name: Span::new(start, name_end),
        colon,
        argument,
        modifiers,
    })
}

fn lex_argument(bytes: &[u8], at: usize) -> Option<(Argument, usize)> {
    if bytes.get(at) == Some(&b'[') {
        let value_end = run_end(bytes, at + 1, is_dynamic_value_byte);
        if bytes.get(value_end) != Some(&b']') {
            return None;
        }
        let value = (value_end > at + 1).then(|| Span::new(at + 1, value_end));
        Some((Argument::Dynamic { value }, value_end + 1))
    } else {
        let end = run_end(bytes, at, is_argument_byte);
        (end > at).then(|| (Argument::Static(Span::new(at, end)), end))
    }
}

// ---------------------------------------------------------------------------
// Productions
// ---------------------------------------------------------------------------

impl<S: TokenSource> Parser<'_, S> {
    pub(super) fn attribute(&mut self, context: Context) {
        if context == Context::Tag {
            if let Some(directive) = lex_directive(self.bytes, self.pos) {
                self.directive_attribute(directive);
                return;
            }
        }
        self.plain_attribute(context);
    }

    /// `attribute := attribute_name ("=" value)?`
    fn plain_attribute(&mut self, context: Context) {
        let end = self.word_end(is_name_byte, context);
        if end == self.pos {
            self.error_char();
            return;
        }

        self.builder.start_node(SyntaxKind::Attribute, self.pos);
        self.bump(SyntaxKind::AttributeName, end - self.pos);
        if self.equals_follows() {
            self.trivia();
            self.bump(SyntaxKind::Equals, 1);
            self.attribute_value(context, true);
        }
        self.builder.finish_node();
    }

    fn directive_attribute(&mut self, directive: Directive) {
        self.builder
            .start_node(SyntaxKind::DirectiveAttribute, self.pos);
        self.bump(SyntaxKind::DirectiveName, directive.name.len());
        if directive.colon {
            self.bump(SyntaxKind::Colon, 1);
        }

        match directive.argument {
            Some(Argument::Static(argument)) => {
                self.bump(SyntaxKind::DirectiveArgument, argument.len());
            }
            Some(Argument::Dynamic { value }) => {
                self.builder
                    .start_node(SyntaxKind::DirectiveDynamicArgument, self.pos);
                self.bump(SyntaxKind::LBracket, 1);
                if let Some(value) = value {
                    self.bump(SyntaxKind::DirectiveDynamicArgumentValue, value.len());
                }
                self.bump(SyntaxKind::RBracket, 1);
                self.builder.finish_node();
            }
            None => {}
        }

        if !directive.modifiers.is_empty() {
            self.builder
                .start_node(SyntaxKind::DirectiveModifiers, self.pos);
            for modifier in &directive.modifiers {
                self.bump(SyntaxKind::Dot, 1);
                self.bump(SyntaxKind::DirectiveModifier, modifier.len());
            }
            self.builder.finish_node();
        }

        if self.equals_follows() {
            self.trivia();
            self.bump(SyntaxKind::Equals, 1);
            self.attribute_value(Context::Tag, false);
        }
        self.builder.finish_node();
    }

    /// Unquoted, quoted, or (where `allow_el`) a bare EL span.
    fn attribute_value(&mut self, context: Context, allow_el: bool) {
        let next = delimiters::skip_whitespace(self.bytes, self.pos);
        let missing = match self.bytes.get(next) {
            None | Some(b'<' | b'>') => true,
            Some(b'%') => {
                context == Context::JspDirective && self.bytes.get(next + 1) == Some(&b'>')
            }
            Some(_) => false,
        };
        if missing {
            self.error("missing attribute value", Span::empty(next));
            return;
        }

        self.trivia();
        match (self.peek(), self.peek_at(1)) {
            (Some(quote @ (b'"' | b'\'')), _) => self.quoted_attribute_value(quote),
            (Some(first), second) if allow_el && self.options.opens_el(first, second) => {
                if let Some(el) = self.scan(ValidTokens::EL_EXPRESSION) {
                    self.token(SyntaxKind::ElExpression, el);
                }
            }
            _ => {
                let end = self.word_end(is_unquoted_value_byte, context);
                if end > self.pos {
                    self.bump(SyntaxKind::AttributeValue, end - self.pos);
                } else {
                    self.error_char();
                }
            }
        }
    }

    /// `quoted_attribute_value := quote (attribute_value | el_expression | jsp_extra)* quote`
    fn quoted_attribute_value(&mut self, quote: u8) {
        let quote_kind = if quote == b'"' {
            SyntaxKind::DoubleQuote
        } else {
            SyntaxKind::SingleQuote
        };
        let start = self.pos;
        self.builder
            .start_node(SyntaxKind::QuotedAttributeValue, start);
        self.bump(quote_kind, 1);

        let (limit, closed) = self.closing_quote(quote);
        while self.pos < limit {
            if let Some(token) = self.embedded_region() {
                self.token(leaf_kind(token.kind), token);
                continue;
            }
            let mut end = self.pos + 1;
            while end < limit && self.region_at(end).is_none() {
                end += 1;
            }
            self.bump(SyntaxKind::AttributeValue, end - self.pos);
        }

        if closed {
            self.bump(quote_kind, 1);
        } else {
            self.error(
                "unterminated quoted attribute value",
                Span::new(start, self.pos),
            );
        }
        self.builder.finish_node();
    }

    /// An EL span or server-page region starting at the current position.
    fn embedded_region(&mut self) -> Option<Token> {
        let valid = match self.region_at(self.pos)? {
            Embedded::El => ValidTokens::EL_EXPRESSION,
            Embedded::Jsp => ValidTokens::JSP_EXTRAS,
        };
        self.scan(valid)
    }

    /// Which embedded region, if any, opens at `i`. A directive start
    /// (`<%@`) is not one of them.
    fn region_at(&self, i: usize) -> Option<Embedded> {
        let b = *self.bytes.get(i)?;
        let next = self.bytes.get(i + 1).copied();
        if self.options.opens_el(b, next) {
            Some(Embedded::El)
        } else if b == b'<' && next == Some(b'%') && self.bytes.get(i + 2) != Some(&b'@') {
            Some(Embedded::Jsp)
        } else {
            None
        }
    }

    /// Find the quote that closes a value starting at the current position.
    /// Quotes inside EL spans and server-page regions do not count. Without
    /// one, the value ends at the next `>` or end of input.
    fn closing_quote(&self, quote: u8) -> (usize, bool) {
        let mut first_angle = None;
        let mut i = self.pos;
        while i < self.bytes.len() {
            let b = self.bytes[i];
            if b == quote {
                return (i, true);
            }
            match self.region_at(i) {
                Some(Embedded::El) => {
                    i = delimiters::el_span(self.bytes, i).end;
                    continue;
                }
                Some(Embedded::Jsp) if self.bytes[i..].starts_with(b"<%--") => {
                    i = delimiters::jsp_comment(self.bytes, i).end;
                    continue;
                }
                Some(Embedded::Jsp) => {
                    i = delimiters::jsp_code(self.bytes, i + 2).end;
                    continue;
                }
                None => {}
            }
            if b == b'>' && first_angle.is_none() {
                first_angle = Some(i);
            }
            i += 1;
        }
        (first_angle.unwrap_or(self.bytes.len()), false)
    }

    fn equals_follows(&self) -> bool {
        let next = delimiters::skip_whitespace(self.bytes, self.pos);
        self.bytes.get(next) == Some(&b'=')
    }

    /// End of the run of `pred` bytes at the current position. In a JSP
    /// directive, `%>` also ends the run.
    fn word_end(&self, pred: fn(u8) -> bool, context: Context) -> usize {
        let mut end = self.pos;
        while let Some(&b) = self.bytes.get(end) {
            if !pred(b)
                || (context == Context::JspDirective
                    && b == b'%'
                    && self.bytes.get(end + 1) == Some(&b'>'))
            {
                break;
            }
            end += 1;
        }
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Parse;
    use pretty_assertions::assert_eq;

    fn lex(word: &str) -> Option<Directive> {
        lex_directive(word.as_bytes(), 0)
    }

    fn parse(source: &str) -> Parse {
        crate::parse(source)
    }

    fn texts_of(parse: &Parse, kind: SyntaxKind) -> Vec<String> {
        parse
            .tree
            .root()
            .descendants()
            .filter(|node| node.kind() == kind)
            .map(|node| node.text().to_string())
            .collect()
    }

    // =========================================================================
    // Directive lexing
    // =========================================================================

    #[test]
    fn test_lex_full_directive() {
        let directive = lex("v-on:click.stop.prevent=\"go\"").unwrap();
        assert_eq!(directive.name, Span::new(0, 4));
        assert!(directive.colon);
        assert_eq!(directive.argument, Some(Argument::Static(Span::new(5, 10))));
        assert_eq!(
            directive.modifiers,
            vec![Span::new(11, 15), Span::new(16, 23)]
        );
    }

    #[test]
    fn test_lex_shorthands() {
        for word in [":href", "@click", "#default"] {
            let directive = lex(word).unwrap();
            assert_eq!(directive.name.len(), 1, "{word}");
            assert!(!directive.colon);
        }
    }

    #[test]
    fn test_lex_dynamic_argument() {
        let directive = lex(":[key]").unwrap();
        assert_eq!(
            directive.argument,
            Some(Argument::Dynamic {
                value: Some(Span::new(2, 5))
            })
        );
        let directive = lex("v-bind:[]").unwrap();
        assert_eq!(directive.argument, Some(Argument::Dynamic { value: None }));
    }

    #[test]
    fn test_lex_argument_keeps_colons() {
        let directive = lex("v-bind:xlink:href").unwrap();
        assert_eq!(directive.argument, Some(Argument::Static(Span::new(7, 17))));
    }

    #[test]
    fn test_lex_rejects_incomplete() {
        for word in ["v-", "v-bind:", "@", ": x", ":[a", "v-on:click.", "href", "v-if.", "vif"] {
            assert_eq!(lex(word), None, "{word}");
        }
    }

    // =========================================================================
    // Directive attributes
    // =========================================================================

    #[test]
    fn test_directive_attributes() {
        let parse = parse(r#"<a v-if="x > 1" v-bind:href="url" v-on:click.stop="go"></a>"#);
        assert_eq!(
            parse.tree.to_sexp(),
            "(component (element (start_tag (tag_name) \
             (directive_attribute (directive_name) (quoted_attribute_value (attribute_value))) \
             (directive_attribute (directive_name) (directive_argument) (quoted_attribute_value (attribute_value))) \
             (directive_attribute (directive_name) (directive_argument) (directive_modifiers (directive_modifier)) \
             (quoted_attribute_value (attribute_value)))) \
             (end_tag (tag_name))))"
        );
        assert_eq!(
            texts_of(&parse, SyntaxKind::DirectiveName),
            vec!["v-if", "v-bind", "v-on"]
        );
        assert_eq!(
            texts_of(&parse, SyntaxKind::DirectiveArgument),
            vec!["href", "click"]
        );
        assert_eq!(texts_of(&parse, SyntaxKind::DirectiveModifier), vec!["stop"]);
        assert!(parse.diagnostics.is_empty());
    }

    #[test]
    fn test_shorthand_directives() {
        let parse = parse(r#"<comp :title="t" @update.once="save" #header :[dyn]="v"/>"#);
        let directives: Vec<String> = texts_of(&parse, SyntaxKind::DirectiveAttribute);
        assert_eq!(
            directives,
            vec![r#":title="t""#, r#"@update.once="save""#, "#header", r#":[dyn]="v""#]
        );
        assert_eq!(
            texts_of(&parse, SyntaxKind::DirectiveDynamicArgumentValue),
            vec!["dyn"]
        );
    }

    #[test]
    fn test_incomplete_directives_degrade() {
        let parse = parse(r#"<div v-bind:="x" @ :[a v-on:click.></div>"#);
        assert_eq!(
            texts_of(&parse, SyntaxKind::AttributeName),
            vec!["v-bind:", "@", ":[a", "v-on:click."]
        );
        assert!(texts_of(&parse, SyntaxKind::DirectiveAttribute).is_empty());
        assert!(parse.diagnostics.is_empty());
    }

    #[test]
    fn test_directive_value_has_no_bare_el() {
        let parse = parse("<i v-text=${x}></i>");
        assert_eq!(texts_of(&parse, SyntaxKind::AttributeValue), vec!["${x}"]);
        assert!(texts_of(&parse, SyntaxKind::ElExpression).is_empty());
    }

    // =========================================================================
    // Plain attributes and values
    // =========================================================================

    #[test]
    fn test_quoted_value_with_el() {
        let parse = parse(r#"<input value="pre${a+b}post">"#);
        let value = parse
            .tree
            .root()
            .descendants()
            .find(|node| node.kind() == SyntaxKind::QuotedAttributeValue)
            .unwrap();
        let children: Vec<(&str, &str)> = value
            .named_children()
            .map(|node| (node.kind().as_str(), node.text()))
            .collect();
        assert_eq!(
            children,
            vec![
                ("attribute_value", "pre"),
                ("el_expression", "${a+b}"),
                ("attribute_value", "post")
            ]
        );
    }

    #[test]
    fn test_quote_inside_el_does_not_close() {
        let parse = parse(r#"<a title="${m["k"]}!">x</a>"#);
        assert_eq!(texts_of(&parse, SyntaxKind::ElExpression), vec![r#"${m["k"]}"#]);
        assert_eq!(texts_of(&parse, SyntaxKind::AttributeValue), vec!["!"]);
        assert!(parse.diagnostics.is_empty());
    }

    #[test]
    fn test_jsp_expression_in_double_quotes() {
        let parse = parse(r#"<a title="<%= m.get("k") %>">x</a>"#);
        assert_eq!(
            parse.tree.to_sexp(),
            "(component (element (start_tag (tag_name) \
             (attribute (attribute_name) (quoted_attribute_value (jsp_expression)))) \
             (text) (end_tag (tag_name))))"
        );
        assert_eq!(
            texts_of(&parse, SyntaxKind::JspExpression),
            vec![r#"<%= m.get("k") %>"#]
        );
        assert!(parse.diagnostics.is_empty());
    }

    #[test]
    fn test_jsp_expression_in_single_quotes() {
        let parse = parse("<input value='<%= bean.get('n') %>'>");
        let value = parse
            .tree
            .root()
            .descendants()
            .find(|node| node.kind() == SyntaxKind::Attribute)
            .and_then(|attribute| attribute.child_by_kind(SyntaxKind::QuotedAttributeValue))
            .unwrap();
        assert_eq!(value.text(), "'<%= bean.get('n') %>'");
        assert_eq!(value.to_sexp(), "(quoted_attribute_value (jsp_expression))");
        assert!(parse.diagnostics.is_empty());
    }

    #[test]
    fn test_jsp_regions_mixed_with_value_text() {
        let parse = parse(r#"<a href="/item?id=<%= id %>&x=${x}<%-- " --%><% if (a) { %>b<% } %>">x</a>"#);
        let value = parse
            .tree
            .root()
            .descendants()
            .find(|node| node.kind() == SyntaxKind::QuotedAttributeValue)
            .unwrap();
        let children: Vec<&str> = value
            .named_children()
            .map(|node| node.kind().as_str())
            .collect();
        assert_eq!(
            children,
            vec![
                "attribute_value",
                "jsp_expression",
                "attribute_value",
                "el_expression",
                "jsp_comment",
                "jsp_scriptlet",
                "attribute_value",
                "jsp_scriptlet"
            ]
        );
        assert_eq!(texts_of(&parse, SyntaxKind::Text), vec!["x"]);
        assert!(parse.diagnostics.is_empty());
    }

    #[test]
    fn test_directive_start_in_quotes_is_value_text() {
        let parse = parse(r#"<a title="<%@ x">y</a>"#);
        assert_eq!(texts_of(&parse, SyntaxKind::AttributeValue), vec!["<%@ x"]);
        assert!(parse.diagnostics.is_empty());
    }

    #[test]
    fn test_bare_el_value() {
        let parse = parse("<a href=${url}>x</a>");
        assert_eq!(texts_of(&parse, SyntaxKind::ElExpression), vec!["${url}"]);
    }

    #[test]
    fn test_whitespace_around_equals() {
        let parse = parse("<td colspan = 2 nowrap>x</td>");
        assert_eq!(
            texts_of(&parse, SyntaxKind::Attribute),
            vec!["colspan = 2", "nowrap"]
        );
    }

    #[test]
    fn test_unterminated_quote_stops_at_angle() {
        let parse = parse("<a href=\"x>link</a>");
        assert_eq!(texts_of(&parse, SyntaxKind::QuotedAttributeValue), vec!["\"x"]);
        assert_eq!(texts_of(&parse, SyntaxKind::Text), vec!["link"]);
        assert_eq!(parse.diagnostics[0].message, "unterminated quoted attribute value");
    }

    #[test]
    fn test_missing_value() {
        let parse = parse("<a href=>x</a>");
        assert_eq!(texts_of(&parse, SyntaxKind::Attribute), vec!["href="]);
        assert_eq!(parse.diagnostics[0].message, "missing attribute value");
    }
}
