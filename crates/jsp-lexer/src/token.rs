use bitflags::bitflags;
use serde::Serialize;

/// A byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span start {start} past end {end}");
        Self { start, end }
    }

    /// A zero-width span at `at`.
    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Shift both ends by a signed byte delta.
    pub fn shifted(self, delta: isize) -> Self {
        Self {
            start: self.start.saturating_add_signed(delta),
            end: self.end.saturating_add_signed(delta),
        }
    }
}

/// Token kinds produced by the context-sensitive scanner.
///
/// Everything that cannot be decided by a context-free rule lives here:
/// opaque delimiter regions, tag names (which depend on the open-tag stack),
/// raw text and the zero-width implicit end tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    // Server-page regions
    JspScriptlet,
    JspExpression,
    JspDeclaration,
    JspComment,
    JspDirectiveStart,

    // Embedded expressions and text
    ElExpression,
    TextFragment,
    InterpolationText,

    // Tags
    StartTagName,
    TemplateStartTagName,
    ScriptStartTagName,
    StyleStartTagName,
    EndTagName,
    ErroneousEndTagName,
    SelfClosingTagDelimiter,
    ImplicitEndTag,

    // Opaque bodies
    RawText,
    Comment,
}

impl TokenKind {
    /// The accepted-set flag corresponding to this kind.
    pub fn flag(self) -> ValidTokens {
        match self {
            TokenKind::JspScriptlet => ValidTokens::JSP_SCRIPTLET,
            TokenKind::JspExpression => ValidTokens::JSP_EXPRESSION,
            TokenKind::JspDeclaration => ValidTokens::JSP_DECLARATION,
            TokenKind::JspComment => ValidTokens::JSP_COMMENT,
            TokenKind::JspDirectiveStart => ValidTokens::JSP_DIRECTIVE_START,
            TokenKind::ElExpression => ValidTokens::EL_EXPRESSION,
            TokenKind::TextFragment => ValidTokens::TEXT_FRAGMENT,
            TokenKind::InterpolationText => ValidTokens::INTERPOLATION_TEXT,
            TokenKind::StartTagName => ValidTokens::START_TAG_NAME,
            TokenKind::TemplateStartTagName => ValidTokens::START_TAG_NAME,
            TokenKind::ScriptStartTagName => ValidTokens::START_TAG_NAME,
            TokenKind::StyleStartTagName => ValidTokens::START_TAG_NAME,
            TokenKind::EndTagName => ValidTokens::END_TAG_NAME,
            TokenKind::ErroneousEndTagName => ValidTokens::ERRONEOUS_END_TAG_NAME,
            TokenKind::SelfClosingTagDelimiter => ValidTokens::SELF_CLOSING_TAG_DELIMITER,
            TokenKind::ImplicitEndTag => ValidTokens::IMPLICIT_END_TAG,
            TokenKind::RawText => ValidTokens::RAW_TEXT,
            TokenKind::Comment => ValidTokens::COMMENT,
        }
    }

    /// Stable snake_case name, used by the CLI token dump.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::JspScriptlet => "jsp_scriptlet",
            TokenKind::JspExpression => "jsp_expression",
            TokenKind::JspDeclaration => "jsp_declaration",
            TokenKind::JspComment => "jsp_comment",
            TokenKind::JspDirectiveStart => "jsp_directive_start",
            TokenKind::ElExpression => "el_expression",
            TokenKind::TextFragment => "text_fragment",
            TokenKind::InterpolationText => "interpolation_text",
            TokenKind::StartTagName => "start_tag_name",
            TokenKind::TemplateStartTagName => "template_start_tag_name",
            TokenKind::ScriptStartTagName => "script_start_tag_name",
            TokenKind::StyleStartTagName => "style_start_tag_name",
            TokenKind::EndTagName => "end_tag_name",
            TokenKind::ErroneousEndTagName => "erroneous_end_tag_name",
            TokenKind::SelfClosingTagDelimiter => "self_closing_tag_delimiter",
            TokenKind::ImplicitEndTag => "implicit_end_tag",
            TokenKind::RawText => "raw_text",
            TokenKind::Comment => "comment",
        }
    }
}

bitflags! {
    /// The set of token kinds the grammar accepts at the current position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValidTokens: u32 {
        const JSP_SCRIPTLET = 1 << 0;
        const JSP_EXPRESSION = 1 << 1;
        const JSP_DECLARATION = 1 << 2;
        const JSP_COMMENT = 1 << 3;
        const JSP_DIRECTIVE_START = 1 << 4;
        const EL_EXPRESSION = 1 << 5;
        const TEXT_FRAGMENT = 1 << 6;
        const INTERPOLATION_TEXT = 1 << 7;
        const START_TAG_NAME = 1 << 8;
        const END_TAG_NAME = 1 << 9;
        const ERRONEOUS_END_TAG_NAME = 1 << 10;
        const SELF_CLOSING_TAG_DELIMITER = 1 << 11;
        const IMPLICIT_END_TAG = 1 << 12;
        const RAW_TEXT = 1 << 13;
        const COMMENT = 1 << 14;

        /// Server-page code regions that may appear anywhere, including
        /// between attributes.
        const JSP_EXTRAS = Self::JSP_SCRIPTLET.bits()
            | Self::JSP_EXPRESSION.bits()
            | Self::JSP_DECLARATION.bits()
            | Self::JSP_COMMENT.bits();

        /// Everything a node position accepts from the scanner.
        const CONTENT = Self::JSP_EXTRAS.bits()
            | Self::JSP_DIRECTIVE_START.bits()
            | Self::EL_EXPRESSION.bits()
            | Self::TEXT_FRAGMENT.bits()
            | Self::COMMENT.bits();

        /// Either outcome of an end-tag name.
        const ANY_END_TAG_NAME = Self::END_TAG_NAME.bits() | Self::ERRONEOUS_END_TAG_NAME.bits();
    }
}

/// A token produced by the scanner.
///
/// The payload of opaque regions is the source slice covered by `span`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// False when a delimited region ran to end of input without its closer.
    pub terminated: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            terminated: true,
        }
    }

    pub fn unterminated(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            terminated: false,
        }
    }

    /// The raw payload of this token.
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.start..self.span.end]
    }

    pub fn shifted(self, delta: isize) -> Self {
        Self {
            span: self.span.shifted(delta),
            ..self
        }
    }
}
