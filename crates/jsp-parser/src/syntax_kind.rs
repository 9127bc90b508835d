//! Node-kind vocabulary of the concrete syntax tree.
//!
//! Kind names are stable: tools match on the strings returned by
//! [`SyntaxKind::as_str`], which follow tree-sitter's naming for the
//! grammar. Punctuation kinds render as their literal text.

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    // ---------------------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------------------
    Component,
    Element,
    TemplateElement,
    ScriptElement,
    StyleElement,
    StartTag,
    EndTag,
    ErroneousEndTag,
    SelfClosingTag,
    DocType,

    // ---------------------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------------------
    Attribute,
    AttributeName,
    AttributeValue,
    QuotedAttributeValue,
    DirectiveAttribute,
    DirectiveName,
    DirectiveArgument,
    DirectiveDynamicArgument,
    DirectiveDynamicArgumentValue,
    DirectiveModifiers,
    DirectiveModifier,

    // ---------------------------------------------------------------------------
    // Server pages and expressions
    // ---------------------------------------------------------------------------
    JspDirective,
    JspDirectiveName,
    JspScriptlet,
    JspExpression,
    JspDeclaration,
    JspComment,
    ElExpression,
    Interpolation,

    // ---------------------------------------------------------------------------
    // Leaves
    // ---------------------------------------------------------------------------
    Text,
    Comment,
    TagName,
    ErroneousEndTagName,
    RawText,
    /// Zero-width close emitted by the auto-close rules.
    ImplicitEndTag,
    /// Whitespace between tokens.
    Trivia,
    /// A byte sequence no production accepts.
    Error,

    // ---------------------------------------------------------------------------
    // Punctuation
    // ---------------------------------------------------------------------------
    LAngle,
    RAngle,
    LAngleSlash,
    SlashRAngle,
    Equals,
    DoubleQuote,
    SingleQuote,
    OpenInterpolation,
    CloseInterpolation,
    OpenJspDirective,
    CloseJspDirective,
    OpenDocType,
    Colon,
    LBracket,
    RBracket,
    Dot,
}

impl SyntaxKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SyntaxKind::Component => "component",
            SyntaxKind::Element => "element",
            SyntaxKind::TemplateElement => "template_element",
            SyntaxKind::ScriptElement => "script_element",
            SyntaxKind::StyleElement => "style_element",
            SyntaxKind::StartTag => "start_tag",
            SyntaxKind::EndTag => "end_tag",
            SyntaxKind::ErroneousEndTag => "erroneous_end_tag",
            SyntaxKind::SelfClosingTag => "self_closing_tag",
            SyntaxKind::DocType => "doc_type",
            SyntaxKind::Attribute => "attribute",
            SyntaxKind::AttributeName => "attribute_name",
            SyntaxKind::AttributeValue => "attribute_value",
            SyntaxKind::QuotedAttributeValue => "quoted_attribute_value",
            SyntaxKind::DirectiveAttribute => "directive_attribute",
            SyntaxKind::DirectiveName => "directive_name",
            SyntaxKind::DirectiveArgument => "directive_argument",
            SyntaxKind::DirectiveDynamicArgument => "directive_dynamic_argument",
            SyntaxKind::DirectiveDynamicArgumentValue => "directive_dynamic_argument_value",
            SyntaxKind::DirectiveModifiers => "directive_modifiers",
            SyntaxKind::DirectiveModifier => "directive_modifier",
            SyntaxKind::JspDirective => "jsp_directive",
            SyntaxKind::JspDirectiveName => "jsp_directive_name",
            SyntaxKind::JspScriptlet => "jsp_scriptlet",
            SyntaxKind::JspExpression => "jsp_expression",
            SyntaxKind::JspDeclaration => "jsp_declaration",
            SyntaxKind::JspComment => "jsp_comment",
            SyntaxKind::ElExpression => "el_expression",
            SyntaxKind::Interpolation => "interpolation",
            SyntaxKind::Text => "text",
            SyntaxKind::Comment => "comment",
            SyntaxKind::TagName => "tag_name",
            SyntaxKind::ErroneousEndTagName => "erroneous_end_tag_name",
            SyntaxKind::RawText => "raw_text",
            SyntaxKind::ImplicitEndTag => "implicit_end_tag",
            SyntaxKind::Trivia => "trivia",
            SyntaxKind::Error => "ERROR",
            SyntaxKind::LAngle => "<",
            SyntaxKind::RAngle => ">",
            SyntaxKind::LAngleSlash => "</",
            SyntaxKind::SlashRAngle => "/>",
            SyntaxKind::Equals => "=",
            SyntaxKind::DoubleQuote => "\"",
            SyntaxKind::SingleQuote => "'",
            SyntaxKind::OpenInterpolation => "{{",
            SyntaxKind::CloseInterpolation => "}}",
            SyntaxKind::OpenJspDirective => "<%@",
            SyntaxKind::CloseJspDirective => "%>",
            SyntaxKind::OpenDocType => "<!",
            SyntaxKind::Colon => ":",
            SyntaxKind::LBracket => "[",
            SyntaxKind::RBracket => "]",
            SyntaxKind::Dot => ".",
        }
    }

    /// Named kinds appear in s-expressions; punctuation and trivia do not.
    pub fn is_named(self) -> bool {
        !self.is_punctuation() && self != SyntaxKind::Trivia
    }

    pub fn is_punctuation(self) -> bool {
        matches!(
            self,
            SyntaxKind::LAngle
                | SyntaxKind::RAngle
                | SyntaxKind::LAngleSlash
                | SyntaxKind::SlashRAngle
                | SyntaxKind::Equals
                | SyntaxKind::DoubleQuote
                | SyntaxKind::SingleQuote
                | SyntaxKind::OpenInterpolation
                | SyntaxKind::CloseInterpolation
                | SyntaxKind::OpenJspDirective
                | SyntaxKind::CloseJspDirective
                | SyntaxKind::OpenDocType
                | SyntaxKind::Colon
                | SyntaxKind::LBracket
                | SyntaxKind::RBracket
                | SyntaxKind::Dot
        )
    }

    /// Element kinds, the nodes that own a tag-stack entry.
    pub fn is_element(self) -> bool {
        matches!(
            self,
            SyntaxKind::Element
                | SyntaxKind::TemplateElement
                | SyntaxKind::ScriptElement
                | SyntaxKind::StyleElement
        )
    }
}

impl std::fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SyntaxKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
