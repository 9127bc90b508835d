//! Recovery reports attached to a parse.

use jsp_lexer::Span;
use serde::Serialize;

/// A recovery the parser made. The tree is complete regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("line {line}, column {column}: {message}")]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

/// Byte offset to line/column conversion.
pub struct LineIndex<'s> {
    source: &'s str,
    line_starts: Vec<usize>,
    /// Per line: every byte is ASCII, so columns are byte distances.
    ascii: Vec<bool>,
}

impl<'s> LineIndex<'s> {
    pub fn new(source: &'s str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| i + 1),
        );
        let ascii = line_starts
            .iter()
            .enumerate()
            .map(|(line, &start)| {
                let end = line_starts.get(line + 1).copied().unwrap_or(source.len());
                source.as_bytes()[start..end].is_ascii()
            })
            .collect();
        Self {
            source,
            line_starts,
            ascii,
        }
    }

    /// 1-based line and column of `offset`.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        if self.ascii[line] {
            return (line + 1, offset - line_start + 1);
        }
        let column = self
            .source
            .get(line_start..offset)
            .map_or(offset - line_start, |prefix| prefix.chars().count());
        (line + 1, column + 1)
    }

    pub fn diagnostic(&self, message: impl Into<String>, span: Span) -> Diagnostic {
        let (line, column) = self.line_col(span.start);
        Diagnostic {
            message: message.into(),
            span,
            line,
            column,
        }
    }
}
