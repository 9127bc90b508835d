//! Tag classification and the HTML auto-close policy.

use serde::{Deserialize, Serialize};

/// How an element's body is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    /// Ordinary element; body is nested nodes.
    Plain,
    /// `<template>`; body is nested nodes.
    Template,
    /// `<script>`; body is raw text.
    Script,
    /// `<style>`; body is raw text.
    Style,
    /// Void element; never has content.
    Void,
}

impl TagCategory {
    pub fn is_raw_text(self) -> bool {
        matches!(self, TagCategory::Script | TagCategory::Style)
    }
}

/// HTML void elements, including the legacy ones browsers still treat as void.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "command", "embed", "frame", "hr",
    "image", "img", "input", "isindex", "keygen", "link", "menuitem", "meta", "nextid", "param",
    "source", "track", "wbr",
];

/// Block-level starts that implicitly close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "div",
    "dl",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
];

/// Elements whose end tag HTML allows to be omitted.
const OPTIONAL_END_TAG: &[&str] = &[
    "body", "colgroup", "dd", "dt", "head", "html", "li", "optgroup", "option", "p", "rb", "rp",
    "rt", "tbody", "td", "tfoot", "th", "thead", "tr",
];

/// Check if a (lowercased) tag name is an HTML void element.
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Classify a lowercased tag name.
pub fn classify(name: &str) -> TagCategory {
    match name {
        "template" => TagCategory::Template,
        "script" => TagCategory::Script,
        "style" => TagCategory::Style,
        n if is_void_element(n) => TagCategory::Void,
        _ => TagCategory::Plain,
    }
}

/// An entry on the open-tag stack.
///
/// Names are stored ASCII-lowercased so comparisons are case-insensitive;
/// custom and namespaced tags (`c:forEach`) compare by their full name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    name: String,
    category: TagCategory,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        let category = classify(&name);
        Self { name, category }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> TagCategory {
        self.category
    }

    pub fn is_void(&self) -> bool {
        self.category == TagCategory::Void
    }

    /// Whether closing this element without an end tag is well-formed HTML.
    pub fn end_tag_optional(&self) -> bool {
        self.is_void() || OPTIONAL_END_TAG.contains(&self.name.as_str())
    }

    /// Case-insensitive comparison against a raw tag name from the source.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Whether this element may stay open when `child` starts inside it.
    ///
    /// Mirrors the HTML implied-end-tag rules: list items, definition
    /// terms, paragraphs before block content, table rows and cells, ruby
    /// annotations, option groups and column groups.
    pub fn can_contain(&self, child: &str) -> bool {
        let child = child.to_ascii_lowercase();
        let child = child.as_str();
        match self.name.as_str() {
            "li" => child != "li",
            "dt" | "dd" => !matches!(child, "dt" | "dd"),
            "p" => !CLOSES_PARAGRAPH.contains(&child),
            "colgroup" => child == "col",
            "rb" | "rt" | "rp" => !matches!(child, "rb" | "rt" | "rp"),
            "optgroup" => child != "optgroup",
            "tr" => child != "tr",
            "td" | "th" => !matches!(child, "td" | "th" | "tr"),
            _ => true,
        }
    }
}
