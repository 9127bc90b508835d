use std::cell::Cell;

use tracing::{debug, trace};

use crate::delimiters::{self, Region};
use crate::options::ScanOptions;
use crate::state::{LexMode, ScannerState};
use crate::tag::{Tag, TagCategory};
use crate::token::{Span, Token, TokenKind, ValidTokens};

/// Context-sensitive scanner for server-page templates.
///
/// The grammar drives it one token at a time: each call names a position and
/// the set of token kinds acceptable there, and the scanner answers with at
/// most one token. Every decision that needs memory (which elements are open,
/// whether we are inside a raw-text element) reads and updates the
/// [`ScannerState`] it owns, and nothing else.
///
/// Leading whitespace is skipped and left for the caller to keep as trivia,
/// except in raw text and interpolation bodies where it is payload.
pub struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    state: ScannerState,
    options: ScanOptions,
    examined: Cell<usize>,
}

impl<'a> Scanner<'a> {
    /// Create a scanner in the initial state with default options.
    pub fn new(source: &'a str) -> Self {
        Self::with_options(source, ScanOptions::default())
    }

    pub fn with_options(source: &'a str, options: ScanOptions) -> Self {
        Self::with_state(source, ScannerState::new(), options)
    }

    /// Resume scanning from a previously captured state.
    pub fn with_state(source: &'a str, state: ScannerState, options: ScanOptions) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            state,
            options,
            examined: Cell::new(0),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// Mutable access for callers that replay a cached scan's stack change.
    pub fn state_mut(&mut self) -> &mut ScannerState {
        &mut self.state
    }

    pub fn into_state(self) -> ScannerState {
        self.state
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Exclusive bound of the bytes the most recent [`Scanner::scan`] looked
    /// at. The result of that scan depends on nothing at or past this offset.
    pub fn examined(&self) -> usize {
        self.examined.get()
    }

    /// Scan one token at `pos`, restricted to the kinds in `valid`.
    ///
    /// Returns `None` without touching the state when nothing acceptable
    /// starts here.
    pub fn scan(&mut self, pos: usize, valid: ValidTokens) -> Option<Token> {
        self.examined.set(pos + 1);
        let raw_text = match self.state.mode() {
            LexMode::RawText(name) if valid.contains(ValidTokens::RAW_TEXT) => {
                Some(delimiters::raw_text(self.bytes, pos, name))
            }
            _ => None,
        };

        let token = if let Some(region) = raw_text {
            self.touch(region.examined);
            (region.end > pos).then(|| Token::new(TokenKind::RawText, Span::new(pos, region.end)))
        } else if valid.contains(ValidTokens::INTERPOLATION_TEXT) {
            self.scan_interpolation_text(pos)
        } else {
            self.scan_content(pos, valid)
        };

        if let Some(token) = &token {
            trace!(
                kind = token.kind.name(),
                start = token.span.start,
                end = token.span.end,
                depth = self.state.depth(),
                "scanned token"
            );
        }
        token
    }

    // --- Dispatch ---

    fn scan_content(&mut self, pos: usize, valid: ValidTokens) -> Option<Token> {
        let start = delimiters::skip_whitespace(self.bytes, pos);
        self.touch(start + 1);

        if valid.contains(ValidTokens::IMPLICIT_END_TAG) {
            if let Some(token) = self.close_void_element(pos, start) {
                return Some(token);
            }
        }

        match self.byte(start) {
            None => {
                if valid.contains(ValidTokens::IMPLICIT_END_TAG) {
                    let tag = self.state.pop()?;
                    debug!(tag = tag.name(), "closing element at end of input");
                    return Some(Token::new(TokenKind::ImplicitEndTag, Span::empty(pos)));
                }
                None
            }
            Some(b'<') => self.scan_markup(pos, start, valid),
            Some(b'/') if valid.contains(ValidTokens::SELF_CLOSING_TAG_DELIMITER) => {
                self.scan_self_closing_delimiter(start)
            }
            Some(b) if valid.contains(ValidTokens::EL_EXPRESSION)
                && self.options.opens_el(b, self.byte(start + 1)) =>
            {
                self.scan_el_expression(start)
            }
            Some(_) => {
                if valid.contains(ValidTokens::TEXT_FRAGMENT) {
                    self.scan_text_fragment(start, valid)
                } else if valid.contains(ValidTokens::START_TAG_NAME) {
                    self.scan_start_tag_name(start)
                } else if valid.intersects(ValidTokens::ANY_END_TAG_NAME) {
                    self.scan_end_tag_name(start, valid)
                } else {
                    None
                }
            }
        }
    }

    fn scan_markup(&mut self, pos: usize, start: usize, valid: ValidTokens) -> Option<Token> {
        match self.byte(start + 1) {
            Some(b'!') if self.starts_with_at(start, "<!--") => {
                if !valid.contains(ValidTokens::COMMENT) {
                    return None;
                }
                let region = delimiters::html_comment(self.bytes, start);
                Some(self.region_token(TokenKind::Comment, start, region))
            }
            Some(b'%') => self.scan_jsp_construct(start, valid),
            _ => {
                if valid.contains(ValidTokens::IMPLICIT_END_TAG) {
                    if let Some(token) = self.scan_implicit_end_tag(pos, start) {
                        return Some(token);
                    }
                }
                // A `<` that opens nothing is text.
                self.touch(start + 3);
                if valid.contains(ValidTokens::TEXT_FRAGMENT)
                    && !delimiters::starts_markup(self.bytes, start)
                {
                    return self.scan_text_fragment(start, valid);
                }
                None
            }
        }
    }

    // --- Server-page regions ---

    /// `<%` has been seen at `start`; pick the construct from what follows.
    fn scan_jsp_construct(&mut self, start: usize, valid: ValidTokens) -> Option<Token> {
        let (kind, body) = if self.starts_with_at(start, "<%--") {
            (TokenKind::JspComment, start + 4)
        } else if self.starts_with_at(start, "<%@") {
            (TokenKind::JspDirectiveStart, start + 3)
        } else if self.starts_with_at(start, "<%=") {
            (TokenKind::JspExpression, start + 3)
        } else if self.starts_with_at(start, "<%!") {
            (TokenKind::JspDeclaration, start + 3)
        } else {
            (TokenKind::JspScriptlet, start + 2)
        };

        if !valid.contains(kind.flag()) {
            return None;
        }

        let region = match kind {
            // The directive's name and attributes belong to the grammar.
            TokenKind::JspDirectiveStart => {
                return Some(Token::new(kind, Span::new(start, body)));
            }
            TokenKind::JspComment => delimiters::jsp_comment(self.bytes, start),
            _ => delimiters::jsp_code(self.bytes, body),
        };
        Some(self.region_token(kind, start, region))
    }

    fn scan_el_expression(&self, start: usize) -> Option<Token> {
        let region = delimiters::el_span(self.bytes, start);
        Some(self.region_token(TokenKind::ElExpression, start, region))
    }

    // --- Text ---

    fn scan_text_fragment(&self, start: usize, valid: ValidTokens) -> Option<Token> {
        let el = valid.contains(ValidTokens::EL_EXPRESSION);
        let region = delimiters::text_fragment(self.bytes, start, &self.options, el);
        self.touch(region.examined);

        let mut end = region.end;
        while end > start && delimiters::is_whitespace(self.bytes[end - 1]) {
            end -= 1;
        }
        (end > start).then(|| Token::new(TokenKind::TextFragment, Span::new(start, end)))
    }

    fn scan_interpolation_text(&self, pos: usize) -> Option<Token> {
        let region = delimiters::interpolation_body(self.bytes, pos);
        self.touch(region.examined);
        if region.end == pos {
            return None;
        }
        let span = Span::new(pos, region.end);
        Some(if region.terminated {
            Token::new(TokenKind::InterpolationText, span)
        } else {
            Token::unterminated(TokenKind::InterpolationText, span)
        })
    }

    // --- Tags ---

    fn scan_start_tag_name(&mut self, start: usize) -> Option<Token> {
        let end = self.tag_name_end(start);
        if end == start {
            return None;
        }

        let tag = Tag::new(&self.source[start..end]);
        let kind = match tag.category() {
            TagCategory::Template => TokenKind::TemplateStartTagName,
            TagCategory::Script => TokenKind::ScriptStartTagName,
            TagCategory::Style => TokenKind::StyleStartTagName,
            TagCategory::Plain | TagCategory::Void => TokenKind::StartTagName,
        };
        self.state.push(tag);
        Some(Token::new(kind, Span::new(start, end)))
    }

    /// An end-tag name closes the top element when it matches; anything else
    /// is erroneous and leaves the stack alone.
    fn scan_end_tag_name(&mut self, start: usize, valid: ValidTokens) -> Option<Token> {
        let end = self.tag_name_end(start);
        if end == start {
            return None;
        }

        let name = &self.source[start..end];
        let span = Span::new(start, end);
        if self.state.top().is_some_and(|top| top.matches(name)) {
            if !valid.contains(ValidTokens::END_TAG_NAME) {
                return None;
            }
            self.state.pop();
            Some(Token::new(TokenKind::EndTagName, span))
        } else if valid.contains(ValidTokens::ERRONEOUS_END_TAG_NAME) {
            debug!(name, depth = self.state.depth(), "erroneous end tag");
            Some(Token::new(TokenKind::ErroneousEndTagName, span))
        } else {
            None
        }
    }

    fn scan_self_closing_delimiter(&mut self, start: usize) -> Option<Token> {
        if self.byte(start + 1) != Some(b'>') {
            return None;
        }
        self.state.pop();
        Some(Token::new(
            TokenKind::SelfClosingTagDelimiter,
            Span::new(start, start + 2),
        ))
    }

    // --- Implicit end tags ---

    /// A void element on top of the stack closes before anything except its
    /// own explicit end tag.
    fn close_void_element(&mut self, pos: usize, start: usize) -> Option<Token> {
        let top = self.state.top().filter(|tag| tag.is_void())?;
        if self.byte(start) == Some(b'<') && self.byte(start + 1) == Some(b'/') {
            let name_end = self.tag_name_end(start + 2);
            if top.matches(&self.source[start + 2..name_end]) {
                return None;
            }
        }
        self.state.pop();
        Some(Token::new(TokenKind::ImplicitEndTag, Span::empty(pos)))
    }

    /// `<` is at `start`. Decide whether the open element must close before
    /// the tag that follows.
    fn scan_implicit_end_tag(&mut self, pos: usize, start: usize) -> Option<Token> {
        let parent = self.state.top()?;

        let closing = self.byte(start + 1) == Some(b'/');
        let name_start = if closing { start + 2 } else { start + 1 };
        let name_end = self.tag_name_end(name_start);
        if name_end == name_start {
            return None;
        }
        let name = &self.source[name_start..name_end];

        let close = if closing {
            // The top element is closed by this tag itself; otherwise close
            // the top only if some enclosing element will be.
            !parent.matches(name) && self.state.contains(name)
        } else {
            !parent.can_contain(name)
        };
        if !close {
            return None;
        }

        let popped = self.state.pop();
        debug!(
            closed = popped.as_ref().map(Tag::name),
            next = name,
            closing,
            "implicit end tag"
        );
        Some(Token::new(TokenKind::ImplicitEndTag, Span::empty(pos)))
    }

    // --- Helpers ---

    fn region_token(&self, kind: TokenKind, start: usize, region: Region) -> Token {
        self.touch(region.examined);
        let span = Span::new(start, region.end);
        if region.terminated {
            Token::new(kind, span)
        } else {
            debug!(kind = kind.name(), start, "unterminated region");
            Token::unterminated(kind, span)
        }
    }

    fn tag_name_end(&self, from: usize) -> usize {
        let end = delimiters::tag_name_end(self.bytes, from);
        self.touch(end + 1);
        end
    }

    fn starts_with_at(&self, at: usize, prefix: &str) -> bool {
        self.touch(at + prefix.len());
        self.bytes
            .get(at..)
            .is_some_and(|rest| rest.starts_with(prefix.as_bytes()))
    }

    fn byte(&self, index: usize) -> Option<u8> {
        self.touch(index + 1);
        self.bytes.get(index).copied()
    }

    fn touch(&self, bound: usize) {
        self.examined.set(self.examined.get().max(bound));
    }
}

/// Scanner protocol as a pure function: token plus the state after it.
///
/// The input state is never modified; identical arguments always produce
/// identical results.
pub fn scan(
    source: &str,
    pos: usize,
    state: &ScannerState,
    valid: ValidTokens,
    options: ScanOptions,
) -> (Option<Token>, ScannerState) {
    let mut scanner = Scanner::with_state(source, state.clone(), options);
    let token = scanner.scan(pos, valid);
    (token, scanner.into_state())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Helper: scan once from a fresh state.
    fn scan_once(source: &str, pos: usize, valid: ValidTokens) -> Option<(TokenKind, String)> {
        let mut scanner = Scanner::new(source);
        scanner
            .scan(pos, valid)
            .map(|t| (t.kind, t.text(source).to_string()))
    }

    /// Helper: a scanner whose stack already holds `open`.
    fn scanner_with<'a>(source: &'a str, open: &[&str]) -> Scanner<'a> {
        let mut state = ScannerState::new();
        for name in open {
            state.push(Tag::new(name));
        }
        Scanner::with_state(source, state, ScanOptions::default())
    }

    fn open_names(scanner: &Scanner<'_>) -> Vec<String> {
        scanner
            .state()
            .tags()
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    // =========================================================================
    // Server-page regions
    // =========================================================================

    #[test]
    fn test_scriptlet() {
        assert_eq!(
            scan_once("<% out.print(1); %>", 0, ValidTokens::CONTENT),
            Some((TokenKind::JspScriptlet, "<% out.print(1); %>".into()))
        );
    }

    #[test]
    fn test_expression_and_declaration() {
        assert_eq!(
            scan_once("<%= user.name %>", 0, ValidTokens::CONTENT).unwrap().0,
            TokenKind::JspExpression
        );
        assert_eq!(
            scan_once("<%! int n; %>", 0, ValidTokens::CONTENT).unwrap().0,
            TokenKind::JspDeclaration
        );
    }

    #[test]
    fn test_jsp_comment() {
        assert_eq!(
            scan_once("<%-- note %> still --%>x", 0, ValidTokens::CONTENT),
            Some((TokenKind::JspComment, "<%-- note %> still --%>".into()))
        );
    }

    #[test]
    fn test_directive_start_is_three_bytes() {
        assert_eq!(
            scan_once("<%@ page import=\"java.util.*\" %>", 0, ValidTokens::CONTENT),
            Some((TokenKind::JspDirectiveStart, "<%@".into()))
        );
    }

    #[test]
    fn test_single_dash_is_scriptlet() {
        assert_eq!(
            scan_once("<%-1 %>", 0, ValidTokens::CONTENT).unwrap().0,
            TokenKind::JspScriptlet
        );
    }

    #[test]
    fn test_jsp_kind_must_be_accepted() {
        assert_eq!(scan_once("<%= x %>", 0, ValidTokens::JSP_SCRIPTLET), None);
    }

    #[test]
    fn test_unterminated_scriptlet_consumes_input() {
        let mut scanner = Scanner::new("<% if (x) {");
        let token = scanner.scan(0, ValidTokens::CONTENT).unwrap();
        assert_eq!(token.span, Span::new(0, 11));
        assert!(!token.terminated);
    }

    // =========================================================================
    // Comments, EL, text
    // =========================================================================

    #[test]
    fn test_html_comment_skips_leading_whitespace() {
        let mut scanner = Scanner::new("  <!-- hi -->");
        let token = scanner.scan(0, ValidTokens::CONTENT).unwrap();
        assert_eq!(token.kind, TokenKind::Comment);
        assert_eq!(token.span, Span::new(2, 13));
    }

    #[test]
    fn test_el_expression() {
        assert_eq!(
            scan_once("${a.b['}']} rest", 0, ValidTokens::CONTENT),
            Some((TokenKind::ElExpression, "${a.b['}']}".into()))
        );
        assert_eq!(
            scan_once("#{bean.value}", 0, ValidTokens::CONTENT).unwrap().0,
            TokenKind::ElExpression
        );
    }

    #[test]
    fn test_deferred_el_can_be_disabled() {
        let options = ScanOptions {
            deferred_el: false,
            ..ScanOptions::default()
        };
        let (token, _) = scan("#{x}", 0, &ScannerState::new(), ValidTokens::CONTENT, options);
        assert_eq!(token.unwrap().kind, TokenKind::TextFragment);
    }

    #[test]
    fn test_text_fragment_trims_whitespace() {
        let mut scanner = Scanner::new("  hello world \n<b>");
        let token = scanner.scan(0, ValidTokens::CONTENT).unwrap();
        assert_eq!(token.kind, TokenKind::TextFragment);
        assert_eq!(token.span, Span::new(2, 13));
    }

    #[test]
    fn test_text_stops_before_el() {
        assert_eq!(
            scan_once("Total: ${sum}", 0, ValidTokens::CONTENT),
            Some((TokenKind::TextFragment, "Total:".into()))
        );
    }

    #[test]
    fn test_lone_angle_is_text() {
        assert_eq!(
            scan_once("< 3 apples", 0, ValidTokens::CONTENT),
            Some((TokenKind::TextFragment, "< 3 apples".into()))
        );
    }

    #[test]
    fn test_unclosed_interpolation_is_text() {
        assert_eq!(
            scan_once("{{ never closed", 0, ValidTokens::CONTENT),
            Some((TokenKind::TextFragment, "{{ never closed".into()))
        );
        assert_eq!(scan_once("{{ x }}", 0, ValidTokens::CONTENT), None);
    }

    #[test]
    fn test_whitespace_only_is_no_token() {
        assert_eq!(scan_once("   \n\t", 0, ValidTokens::CONTENT), None);
    }

    #[test]
    fn test_interpolation_text_keeps_spaces() {
        assert_eq!(
            scan_once("{{ msg }}", 2, ValidTokens::INTERPOLATION_TEXT),
            Some((TokenKind::InterpolationText, " msg ".into()))
        );
        assert_eq!(scan_once("{{}}", 2, ValidTokens::INTERPOLATION_TEXT), None);
    }

    // =========================================================================
    // Tag names and the stack
    // =========================================================================

    #[test]
    fn test_start_tag_name_pushes() {
        let mut scanner = Scanner::new("<DIV class=x>");
        let token = scanner.scan(1, ValidTokens::START_TAG_NAME).unwrap();
        assert_eq!(token.kind, TokenKind::StartTagName);
        assert_eq!(token.span, Span::new(1, 4));
        assert_eq!(open_names(&scanner), vec!["div"]);
    }

    #[test]
    fn test_start_tag_categories() {
        for (src, kind) in [
            ("<template>", TokenKind::TemplateStartTagName),
            ("<script>", TokenKind::ScriptStartTagName),
            ("<style>", TokenKind::StyleStartTagName),
            ("<br>", TokenKind::StartTagName),
            ("<c:forEach>", TokenKind::StartTagName),
        ] {
            assert_eq!(
                scan_once(src, 1, ValidTokens::START_TAG_NAME).unwrap().0,
                kind,
                "{src}"
            );
        }
    }

    #[test]
    fn test_end_tag_name_pops_matching_top() {
        let mut scanner = scanner_with("</Div>", &["body", "div"]);
        let token = scanner.scan(2, ValidTokens::ANY_END_TAG_NAME).unwrap();
        assert_eq!(token.kind, TokenKind::EndTagName);
        assert_eq!(open_names(&scanner), vec!["body"]);
    }

    #[test]
    fn test_erroneous_end_tag_leaves_stack() {
        let mut scanner = scanner_with("</foo>", &["div"]);
        let token = scanner.scan(2, ValidTokens::ANY_END_TAG_NAME).unwrap();
        assert_eq!(token.kind, TokenKind::ErroneousEndTagName);
        assert_eq!(open_names(&scanner), vec!["div"]);
    }

    #[test]
    fn test_self_closing_pops() {
        let mut scanner = scanner_with("/>", &["div", "img"]);
        let token = scanner
            .scan(0, ValidTokens::SELF_CLOSING_TAG_DELIMITER)
            .unwrap();
        assert_eq!(token.kind, TokenKind::SelfClosingTagDelimiter);
        assert_eq!(open_names(&scanner), vec!["div"]);
    }

    // =========================================================================
    // Implicit end tags
    // =========================================================================

    #[test]
    fn test_paragraph_closed_by_paragraph() {
        let mut scanner = scanner_with("a<p>b", &["p"]);
        let token = scanner.scan(1, ValidTokens::IMPLICIT_END_TAG).unwrap();
        assert_eq!(token.kind, TokenKind::ImplicitEndTag);
        assert_eq!(token.span, Span::empty(1));
        assert!(scanner.state().is_empty());
    }

    #[test]
    fn test_paragraph_keeps_inline_child() {
        let mut scanner = scanner_with("<span>", &["p"]);
        assert_eq!(scanner.scan(0, ValidTokens::IMPLICIT_END_TAG), None);
        assert_eq!(open_names(&scanner), vec!["p"]);
    }

    #[test]
    fn test_implicit_close_is_zero_width_before_whitespace() {
        let mut scanner = scanner_with("\n  <li>", &["ul", "li"]);
        let token = scanner.scan(0, ValidTokens::IMPLICIT_END_TAG).unwrap();
        assert_eq!(token.span, Span::empty(0));
        assert_eq!(open_names(&scanner), vec!["ul"]);
    }

    #[test]
    fn test_end_tag_of_ancestor_closes_top() {
        let mut scanner = scanner_with("</ul>", &["ul", "li"]);
        assert_eq!(
            scanner.scan(0, ValidTokens::IMPLICIT_END_TAG).unwrap().kind,
            TokenKind::ImplicitEndTag
        );
        assert_eq!(open_names(&scanner), vec!["ul"]);
        // Now the explicit end tag matches the top.
        assert_eq!(scanner.scan(0, ValidTokens::IMPLICIT_END_TAG), None);
    }

    #[test]
    fn test_unknown_end_tag_is_not_implicit() {
        let mut scanner = scanner_with("</span>", &["div"]);
        assert_eq!(scanner.scan(0, ValidTokens::IMPLICIT_END_TAG), None);
    }

    #[test]
    fn test_void_element_closes_immediately() {
        let mut scanner = scanner_with("text after br", &["div", "br"]);
        let token = scanner
            .scan(0, ValidTokens::IMPLICIT_END_TAG | ValidTokens::CONTENT)
            .unwrap();
        assert_eq!(token.kind, TokenKind::ImplicitEndTag);
        assert_eq!(open_names(&scanner), vec!["div"]);
    }

    #[test]
    fn test_void_element_accepts_own_end_tag() {
        let mut scanner = scanner_with("</br>", &["br"]);
        assert_eq!(scanner.scan(0, ValidTokens::IMPLICIT_END_TAG), None);
    }

    #[test]
    fn test_end_of_input_closes_open_element() {
        let mut scanner = scanner_with("  ", &["div"]);
        let token = scanner.scan(0, ValidTokens::IMPLICIT_END_TAG).unwrap();
        assert_eq!(token.span, Span::empty(0));
        assert!(scanner.state().is_empty());
        assert_eq!(scanner.scan(0, ValidTokens::IMPLICIT_END_TAG), None);
    }

    // =========================================================================
    // Raw text
    // =========================================================================

    #[test]
    fn test_raw_text_in_script() {
        let src = r#"<script>var x = "</div>";</script>"#;
        let mut scanner = scanner_with(src, &["script"]);
        let token = scanner
            .scan(8, ValidTokens::RAW_TEXT | ValidTokens::IMPLICIT_END_TAG)
            .unwrap();
        assert_eq!(token.kind, TokenKind::RawText);
        assert_eq!(token.text(src), r#"var x = "</div>";"#);
    }

    #[test]
    fn test_raw_text_keeps_leading_whitespace() {
        let src = "<style>\n  p { }\n</style>";
        let mut scanner = scanner_with(src, &["style"]);
        let token = scanner.scan(7, ValidTokens::RAW_TEXT).unwrap();
        assert_eq!(token.text(src), "\n  p { }\n");
    }

    #[test]
    fn test_raw_text_ignores_el_and_markup() {
        let src = "${x} <b>{{y}}</b></script>";
        let mut scanner = scanner_with(src, &["script"]);
        let token = scanner
            .scan(0, ValidTokens::RAW_TEXT | ValidTokens::CONTENT)
            .unwrap();
        assert_eq!(token.text(src), "${x} <b>{{y}}</b>");
    }

    #[test]
    fn test_empty_raw_text_is_no_token() {
        let mut scanner = scanner_with("</script>", &["script"]);
        assert_eq!(scanner.scan(0, ValidTokens::RAW_TEXT), None);
    }

    // =========================================================================
    // Protocol properties
    // =========================================================================

    #[test]
    fn test_pure_scan_leaves_input_state() {
        let mut state = ScannerState::new();
        state.push(Tag::new("p"));
        let (token, after) = scan(
            "<div>",
            0,
            &state,
            ValidTokens::IMPLICIT_END_TAG,
            ScanOptions::default(),
        );
        assert_eq!(token.unwrap().kind, TokenKind::ImplicitEndTag);
        assert_eq!(state.depth(), 1);
        assert!(after.is_empty());
    }

    #[test]
    fn test_examined_bound() {
        let src = "<!-- a --> tail";
        let mut scanner = Scanner::new(src);
        scanner.scan(0, ValidTokens::CONTENT).unwrap();
        assert_eq!(scanner.examined(), 10);

        let mut scanner = Scanner::new("<% open");
        scanner.scan(0, ValidTokens::CONTENT).unwrap();
        assert_eq!(scanner.examined(), 8);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn markup() -> impl Strategy<Value = String> {
            proptest::collection::vec(
                prop_oneof![
                    Just("<p>"),
                    Just("</p>"),
                    Just("<li>"),
                    Just("<script>"),
                    Just("</script>"),
                    Just("<%= x %>"),
                    Just("${a}"),
                    Just("{{ b }}"),
                    Just("text "),
                    Just("<br>"),
                    Just(" "),
                ],
                0..12,
            )
            .prop_map(|parts| parts.concat())
        }

        proptest! {
            #[test]
            fn scan_is_deterministic(src in markup(), pos_seed in 0usize..64, depth in 0usize..3) {
                let pos = pos_seed % (src.len() + 1);
                if !src.is_char_boundary(pos) {
                    return Ok(());
                }
                let mut state = ScannerState::new();
                for name in ["div", "p", "script"].iter().take(depth) {
                    state.push(Tag::new(name));
                }
                let valid = ValidTokens::CONTENT | ValidTokens::IMPLICIT_END_TAG | ValidTokens::RAW_TEXT;
                let first = scan(&src, pos, &state, valid, ScanOptions::default());
                let second = scan(&src, pos, &state, valid, ScanOptions::default());
                prop_assert_eq!(first, second);
            }

            #[test]
            fn examined_covers_token(src in markup()) {
                let mut scanner = Scanner::new(&src);
                if let Some(token) = scanner.scan(0, ValidTokens::CONTENT) {
                    prop_assert!(scanner.examined() >= token.span.end);
                }
            }
        }
    }
}
