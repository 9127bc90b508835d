//! Incremental reparsing.
//!
//! A [`Session`] remembers every scanner call of its last parse, keyed by
//! position, accepted token set and scanner state. States are interned, so
//! a key is small however deeply the document nests. After an edit, calls that
//! only looked at bytes before the edit are kept, calls that started after
//! it are shifted by the length change, and the rest are dropped. The next
//! parse answers matching calls from that cache instead of rescanning.
//!
//! The resulting tree is always identical to a fresh parse of the new text.

use std::cmp::Ordering;
use std::collections::HashMap;

use jsp_lexer::{ScanOptions, Scanner, Tag, Token, ValidTokens};
use tracing::debug;

use crate::parser::Parser;
use crate::token_source::TokenSource;
use crate::tree::Tree;
use crate::Parse;

/// Replace `start..old_end` of the source with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub old_end: usize,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(start: usize, old_end: usize, new_text: impl Into<String>) -> Self {
        Self {
            start,
            old_end,
            new_text: new_text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::new(start, end, String::new())
    }

    pub fn new_end(&self) -> usize {
        self.start + self.new_text.len()
    }

    /// Change in source length.
    pub fn delta(&self) -> isize {
        self.new_text.len() as isize - (self.old_end - self.start) as isize
    }

    fn apply(&self, source: &str) -> Result<String, EditError> {
        if self.start > self.old_end {
            return Err(EditError::InvertedRange {
                start: self.start,
                old_end: self.old_end,
            });
        }
        if self.old_end > source.len() {
            return Err(EditError::OutOfBounds {
                start: self.start,
                old_end: self.old_end,
                len: source.len(),
            });
        }
        for offset in [self.start, self.old_end] {
            if !source.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary { offset });
            }
        }

        let mut edited = String::with_capacity(source.len() + self.new_text.len());
        edited.push_str(&source[..self.start]);
        edited.push_str(&self.new_text);
        edited.push_str(&source[self.old_end..]);
        Ok(edited)
    }
}

/// An edit that cannot be applied to the current source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("edit range {start}..{old_end} is inverted")]
    InvertedRange { start: usize, old_end: usize },

    #[error("edit range {start}..{old_end} is outside the source (length {len})")]
    OutOfBounds {
        start: usize,
        old_end: usize,
        len: usize,
    },

    #[error("edit offset {offset} is not on a character boundary")]
    NotCharBoundary { offset: usize },
}

/// Cache accounting for the most recent parse of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReuseStats {
    /// Scanner calls answered from the cache.
    pub reused: usize,
    /// Scanner calls that ran the scanner.
    pub rescanned: usize,
    /// Records carried over unchanged from before the edit.
    pub kept: usize,
    /// Records carried over from after the edit, shifted.
    pub shifted: usize,
    /// Records the edit invalidated.
    pub dropped: usize,
}

// ---------------------------------------------------------------------------
// Scan cache
// ---------------------------------------------------------------------------

/// An interned scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct StateId(u32);

impl StateId {
    /// The empty tag stack.
    const INITIAL: StateId = StateId(0);
}

/// Every tag stack a session has seen, stored as a trie.
///
/// A stack is identified by the id of its top entry, so equal stacks share
/// one id and a cache key costs the same at any nesting depth. Ids stay
/// valid for the lifetime of the session.
#[derive(Debug)]
struct StateTable {
    /// Parent of each id. The initial state is its own parent.
    parents: Vec<StateId>,
    children: HashMap<(StateId, Tag), StateId>,
}

impl StateTable {
    fn new() -> Self {
        Self {
            parents: vec![StateId::INITIAL],
            children: HashMap::new(),
        }
    }

    fn push(&mut self, parent: StateId, tag: Tag) -> StateId {
        let next = StateId(self.parents.len() as u32);
        let id = *self.children.entry((parent, tag)).or_insert(next);
        if id == next {
            self.parents.push(parent);
        }
        id
    }

    fn pop(&self, id: StateId) -> StateId {
        self.parents[id.0 as usize]
    }

    fn len(&self) -> usize {
        self.parents.len()
    }
}

/// What one scan did to the tag stack.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StackChange {
    None,
    Push(Tag),
    Pop,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ScanKey {
    pos: usize,
    valid: ValidTokens,
    state: StateId,
}

#[derive(Debug, Clone)]
struct ScanRecord {
    token: Option<Token>,
    change: StackChange,
    after: StateId,
    examined: usize,
}

type ScanCache = HashMap<ScanKey, ScanRecord>;

/// Carry cached records across an edit.
fn translate(cache: ScanCache, edit: &TextEdit, stats: &mut ReuseStats) -> ScanCache {
    let delta = edit.delta();
    let mut translated = HashMap::with_capacity(cache.len());
    for (key, record) in cache {
        if record.examined <= edit.start {
            stats.kept += 1;
            translated.insert(key, record);
        } else if key.pos >= edit.old_end {
            stats.shifted += 1;
            translated.insert(
                ScanKey {
                    pos: key.pos.saturating_add_signed(delta),
                    ..key
                },
                ScanRecord {
                    token: record.token.map(|token| token.shifted(delta)),
                    examined: record.examined.saturating_add_signed(delta),
                    ..record
                },
            );
        } else {
            stats.dropped += 1;
        }
    }
    translated
}

/// Token source that answers from a previous parse where it can and
/// records every call for the next one.
struct CachingSource<'s, 'c> {
    scanner: Scanner<'s>,
    /// Interned form of the scanner's current state.
    state: StateId,
    states: &'c mut StateTable,
    previous: &'c ScanCache,
    next: ScanCache,
    stats: &'c mut ReuseStats,
}

impl CachingSource<'_, '_> {
    fn replay(&mut self, change: &StackChange) {
        let state = self.scanner.state_mut();
        match change {
            StackChange::None => {}
            StackChange::Push(tag) => state.push(tag.clone()),
            StackChange::Pop => {
                state.pop();
            }
        }
    }

    fn observe(&mut self, depth_before: usize) -> (StackChange, StateId) {
        let state = self.scanner.state();
        match (state.depth().cmp(&depth_before), state.top()) {
            (Ordering::Greater, Some(top)) => {
                let tag = top.clone();
                let after = self.states.push(self.state, tag.clone());
                (StackChange::Push(tag), after)
            }
            (Ordering::Less, _) => (StackChange::Pop, self.states.pop(self.state)),
            _ => (StackChange::None, self.state),
        }
    }
}

impl TokenSource for CachingSource<'_, '_> {
    fn scan(&mut self, pos: usize, valid: ValidTokens) -> Option<Token> {
        let key = ScanKey {
            pos,
            valid,
            state: self.state,
        };
        let previous = self.previous;
        if let Some(record) = previous.get(&key) {
            self.stats.reused += 1;
            self.replay(&record.change);
            self.state = record.after;
            let token = record.token;
            self.next.insert(key, record.clone());
            return token;
        }

        self.stats.rescanned += 1;
        let depth_before = self.scanner.state().depth();
        let token = self.scanner.scan(pos, valid);
        let (change, after) = self.observe(depth_before);
        self.state = after;
        let record = ScanRecord {
            token,
            change,
            after,
            examined: self.scanner.examined(),
        };
        self.next.insert(key, record);
        token
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An editable document with its current parse.
pub struct Session {
    options: ScanOptions,
    parse: Parse,
    cache: ScanCache,
    states: StateTable,
    stats: ReuseStats,
}

impl Session {
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_options(source, ScanOptions::default())
    }

    pub fn with_options(source: impl Into<String>, options: ScanOptions) -> Self {
        let source = source.into();
        let mut stats = ReuseStats::default();
        let mut states = StateTable::new();
        let (parse, cache) = reparse(
            &source,
            options,
            &mut states,
            &ScanCache::new(),
            &mut stats,
        );
        Self {
            options,
            parse,
            cache,
            states,
            stats,
        }
    }

    pub fn source(&self) -> &str {
        self.parse.tree.source()
    }

    pub fn tree(&self) -> &Tree {
        &self.parse.tree
    }

    pub fn parse(&self) -> &Parse {
        &self.parse
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    /// Cache accounting for the most recent parse.
    pub fn stats(&self) -> ReuseStats {
        self.stats
    }

    /// Apply an edit and reparse, reusing scanner results it did not touch.
    pub fn edit(&mut self, edit: &TextEdit) -> Result<&Parse, EditError> {
        let source = edit.apply(self.source())?;

        let mut stats = ReuseStats::default();
        let previous = translate(std::mem::take(&mut self.cache), edit, &mut stats);
        let (parse, cache) = reparse(
            &source,
            self.options,
            &mut self.states,
            &previous,
            &mut stats,
        );
        debug!(
            start = edit.start,
            old_end = edit.old_end,
            new_len = edit.new_text.len(),
            reused = stats.reused,
            rescanned = stats.rescanned,
            kept = stats.kept,
            shifted = stats.shifted,
            dropped = stats.dropped,
            states = self.states.len(),
            "incremental reparse"
        );

        self.parse = parse;
        self.cache = cache;
        self.stats = stats;
        Ok(&self.parse)
    }
}

fn reparse(
    source: &str,
    options: ScanOptions,
    states: &mut StateTable,
    previous: &ScanCache,
    stats: &mut ReuseStats,
) -> (Parse, ScanCache) {
    let mut tokens = CachingSource {
        scanner: Scanner::with_options(source, options),
        state: StateId::INITIAL,
        states,
        previous,
        next: ScanCache::new(),
        stats,
    };
    let parse = Parser::new(source, &mut tokens, options).run();
    (parse, tokens.next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<%@ page contentType="text/html" %>
<html>
<body>
  <ul>
    <li>${first}
    <li>${second}
  </ul>
  <script>var a = "</div>";</script>
  <p class="note">Total: ${total}</p>
</body>
</html>
"#;

    fn assert_matches_fresh(session: &Session) {
        let fresh = crate::parse(session.source());
        assert_eq!(session.parse(), &fresh);
    }

    // =========================================================================
    // Edits
    // =========================================================================

    #[test]
    fn test_apply_edit() {
        let edit = TextEdit::new(1, 3, "XY Z");
        assert_eq!(edit.apply("abcd").unwrap(), "aXY Zd");
        assert_eq!(edit.delta(), 2);
        assert_eq!(edit.new_end(), 5);
    }

    #[test]
    fn test_invalid_edits() {
        assert_eq!(
            TextEdit::delete(3, 1).apply("abcd"),
            Err(EditError::InvertedRange {
                start: 3,
                old_end: 1
            })
        );
        assert_eq!(
            TextEdit::insert(9, "x").apply("abcd"),
            Err(EditError::OutOfBounds {
                start: 9,
                old_end: 9,
                len: 4
            })
        );
        assert_eq!(
            TextEdit::insert(1, "x").apply("éa"),
            Err(EditError::NotCharBoundary { offset: 1 })
        );
    }

    #[test]
    fn test_failed_edit_keeps_session() {
        let mut session = Session::new("<p>a</p>");
        assert!(session.edit(&TextEdit::delete(2, 50)).is_err());
        assert_eq!(session.source(), "<p>a</p>");
    }

    // =========================================================================
    // Reuse
    // =========================================================================

    #[test]
    fn test_edit_inside_text() {
        let mut session = Session::new(PAGE);
        let at = PAGE.find("Total").unwrap();
        session.edit(&TextEdit::new(at, at + 5, "Sum")).unwrap();

        assert!(session.source().contains("Sum: ${total}"));
        assert_matches_fresh(&session);
        let stats = session.stats();
        assert!(stats.reused > 0, "{stats:?}");
        assert!(stats.kept > 0 && stats.shifted > 0, "{stats:?}");
    }

    #[test]
    fn test_edit_that_changes_structure() {
        let mut session = Session::new(PAGE);
        let at = PAGE.find("<li>${second}").unwrap();
        session.edit(&TextEdit::insert(at, "</ul><ol>")).unwrap();
        assert_matches_fresh(&session);

        let at = session.source().find("<script>").unwrap();
        session.edit(&TextEdit::delete(at, at + 8)).unwrap();
        assert_matches_fresh(&session);
    }

    #[test]
    fn test_edit_opening_a_comment() {
        let mut session = Session::new("<!-x <b>bold</b> -->");
        session.edit(&TextEdit::insert(2, "-")).unwrap();
        assert_eq!(session.tree().to_sexp(), "(component (comment))");
        assert_matches_fresh(&session);
    }

    #[test]
    fn test_edit_closing_an_interpolation() {
        let mut session = Session::new("<p>{{ a </p> tail");
        assert_eq!(session.tree().to_sexp().matches("interpolation").count(), 0);
        session.edit(&TextEdit::insert(17, " }}")).unwrap();
        assert_matches_fresh(&session);
    }

    #[test]
    fn test_edit_at_end_and_start() {
        let mut session = Session::new("<div>x");
        session.edit(&TextEdit::insert(6, "</div>")).unwrap();
        assert_matches_fresh(&session);
        session.edit(&TextEdit::insert(0, "<section>")).unwrap();
        assert_matches_fresh(&session);
        session.edit(&TextEdit::delete(0, session.source().len())).unwrap();
        assert_eq!(session.tree().to_sexp(), "(component)");
    }

    #[test]
    fn test_append_reuses_most_scans() {
        let mut session = Session::new(PAGE);
        session.edit(&TextEdit::insert(PAGE.len(), "<footer/>")).unwrap();
        let stats = session.stats();
        assert!(stats.reused > stats.rescanned, "{stats:?}");
        assert_matches_fresh(&session);
    }

    #[test]
    fn test_session_is_send_and_sync() {
        fn check<T: Send + Sync>() {}
        check::<Session>();
        check::<Tree>();
        check::<jsp_lexer::ScannerState>();
    }

    // =========================================================================
    // Interned states
    // =========================================================================

    #[test]
    fn test_state_table_shares_equal_stacks() {
        let mut states = StateTable::new();
        let div = states.push(StateId::INITIAL, Tag::new("div"));
        let p = states.push(div, Tag::new("p"));
        assert_eq!(states.push(StateId::INITIAL, Tag::new("DIV")), div);
        assert_eq!(states.push(div, Tag::new("p")), p);
        assert_ne!(states.push(StateId::INITIAL, Tag::new("p")), p);
        assert_eq!(states.pop(p), div);
        assert_eq!(states.pop(div), StateId::INITIAL);
        assert_eq!(states.pop(StateId::INITIAL), StateId::INITIAL);
        assert_eq!(states.len(), 4);
    }

    #[test]
    fn test_sibling_elements_reuse_states() {
        let session = Session::new("<ul><li>a</li><li>b</li><li>c</li></ul>");
        // initial, ul, ul > li
        assert_eq!(session.states.len(), 3);
    }

    #[test]
    fn test_deep_nesting_edit() {
        let depth = 20_000;
        let source = format!("{}x{}", "<b>".repeat(depth), "</b>".repeat(depth));
        let mut session = Session::new(source.as_str());
        assert_eq!(session.states.len(), depth + 1);

        let at = source.find('x').unwrap();
        session.edit(&TextEdit::new(at, at + 1, "yz")).unwrap();
        assert_matches_fresh(&session);
        assert_eq!(session.states.len(), depth + 1);
        assert!(session.stats().reused > session.stats().rescanned);
    }
}
