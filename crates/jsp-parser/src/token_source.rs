//! The seam between the grammar and the scanner.

use jsp_lexer::{Scanner, Token, ValidTokens};

/// Anything that can answer the grammar's scan requests.
///
/// The grammar never inspects scanner internals; it asks for a token at a
/// position with the set of kinds it accepts. Implementations may answer from
/// a cache as long as the answer equals what a fresh scanner in the same
/// state would give.
pub trait TokenSource {
    fn scan(&mut self, pos: usize, valid: ValidTokens) -> Option<Token>;
}

impl TokenSource for Scanner<'_> {
    fn scan(&mut self, pos: usize, valid: ValidTokens) -> Option<Token> {
        Scanner::scan(self, pos, valid)
    }
}

impl<T: TokenSource + ?Sized> TokenSource for &mut T {
    fn scan(&mut self, pos: usize, valid: ValidTokens) -> Option<Token> {
        (**self).scan(pos, valid)
    }
}
