//! Delimiter sub-scanners.
//!
//! Each function scans one opaque region over raw bytes and reports where it
//! ends, whether its closer was found, and how far it looked. The `examined`
//! bound is what makes cached tokens safe to reuse after an edit: a scan
//! depends on nothing at or beyond it. Reaching end of input counts as
//! examining one byte past the end.

use crate::options::ScanOptions;

/// Result of scanning one delimited region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Exclusive end of the region.
    pub end: usize,
    /// Whether the closing delimiter was found.
    pub terminated: bool,
    /// Exclusive bound on the bytes inspected.
    pub examined: usize,
}

impl Region {
    fn closed(end: usize) -> Self {
        Self {
            end,
            terminated: true,
            examined: end,
        }
    }

    fn open(len: usize) -> Self {
        Self {
            end: len,
            terminated: false,
            examined: len + 1,
        }
    }
}

pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C')
}

pub fn skip_whitespace(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && is_whitespace(bytes[i]) {
        i += 1;
    }
    i
}

/// First byte of a tag name: an ASCII letter or any non-ASCII byte.
pub fn is_tag_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b >= 0x80
}

pub fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b >= 0x80
}

pub fn tag_name_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && is_tag_name_byte(bytes[i]) {
        i += 1;
    }
    i
}

/// Whether a `<` at `at` opens markup rather than being literal text.
pub fn starts_markup(bytes: &[u8], at: usize) -> bool {
    if bytes.get(at) != Some(&b'<') {
        return false;
    }
    match bytes.get(at + 1) {
        Some(b'!' | b'%') => true,
        Some(b'/') => bytes.get(at + 2).is_some_and(|&b| is_tag_name_start(b)),
        Some(&b) => is_tag_name_start(b),
        None => false,
    }
}

/// `<!-- ... -->`; `start` is the `<`. Closes on `>` preceded by two dashes.
pub fn html_comment(bytes: &[u8], start: usize) -> Region {
    let mut dashes = 0;
    let mut i = start + 4;
    while i < bytes.len() {
        match bytes[i] {
            b'-' => dashes += 1,
            b'>' if dashes >= 2 => return Region::closed(i + 1),
            _ => dashes = 0,
        }
        i += 1;
    }
    Region::open(bytes.len())
}

/// `<%-- ... --%>`; `start` is the `<`.
pub fn jsp_comment(bytes: &[u8], start: usize) -> Region {
    let mut i = start + 4;
    while i + 4 <= bytes.len() {
        if &bytes[i..i + 4] == b"--%>" {
            return Region::closed(i + 4);
        }
        i += 1;
    }
    Region::open(bytes.len())
}

/// Body of a scriptlet, expression or declaration, up to and including `%>`.
///
/// Quoted literals are skipped so a `%>` inside one does not close the
/// region. A literal still open at a newline is dropped there.
pub fn jsp_code(bytes: &[u8], from: usize) -> Region {
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q || b == b'\n' {
                    quote = None;
                }
            }
            None => {
                if b == b'%' && bytes.get(i + 1) == Some(&b'>') {
                    return Region::closed(i + 2);
                }
                if b == b'"' || b == b'\'' {
                    quote = Some(b);
                }
            }
        }
        i += 1;
    }
    Region::open(bytes.len())
}

/// `${ ... }` or `#{ ... }`; `start` is the sigil. Braces are balanced and
/// ignored inside EL string literals.
pub fn el_span(bytes: &[u8], start: usize) -> Region {
    let mut depth = 1usize;
    let mut quote: Option<u8> = None;
    let mut i = start + 2;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Region::closed(i + 1);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    Region::open(bytes.len())
}

/// Interpolation body starting at `from`; `end` is the index of the first
/// unescaped `}}`.
pub fn interpolation_body(bytes: &[u8], from: usize) -> Region {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                return Region {
                    end: i,
                    terminated: true,
                    examined: i + 2,
                };
            }
            _ => {}
        }
        i += 1;
    }
    Region::open(bytes.len())
}

/// Raw element body starting at `from`; `end` is the `<` of the closing
/// `</name>` (name compared ASCII case-insensitively, whitespace allowed
/// before `>`), or end of input.
pub fn raw_text(bytes: &[u8], from: usize, name: &str) -> Region {
    let mut examined = from;
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
            match closing_tag_at(bytes, i + 2, name) {
                Ok(seen) => {
                    return Region {
                        end: i,
                        terminated: true,
                        examined: examined.max(seen),
                    };
                }
                Err(seen) => examined = examined.max(seen),
            }
        }
        i += 1;
    }
    Region::open(bytes.len())
}

/// Checks for `name` + optional whitespace + `>` (or end of input) at `at`.
/// Either way returns the exclusive bound of the bytes it looked at.
fn closing_tag_at(bytes: &[u8], at: usize, name: &str) -> Result<usize, usize> {
    let name_end = at + name.len();
    match bytes.get(at..name_end) {
        Some(candidate) if candidate.eq_ignore_ascii_case(name.as_bytes()) => {}
        _ => return Err(name_end.min(bytes.len() + 1)),
    }
    let j = skip_whitespace(bytes, name_end);
    match bytes.get(j) {
        Some(b'>') | None => Ok(j + 1),
        Some(_) => Err(j + 1),
    }
}

/// Text up to the next markup, EL span or interpolation.
///
/// `el` is false where the grammar does not accept an EL span, in which case
/// `${` is ordinary text. A `{{` with no `}}` anywhere after it does not open
/// an interpolation and stays in the text.
pub fn text_fragment(bytes: &[u8], from: usize, options: &ScanOptions, el: bool) -> Region {
    let mut interpolation_closes = true;
    let mut examined = 0;
    let mut i = from;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        if b == b'<' && starts_markup(bytes, i) {
            return Region {
                end: i,
                terminated: true,
                examined: examined.max(i + 3),
            };
        }
        if el && options.opens_el(b, next) {
            return Region {
                end: i,
                terminated: true,
                examined: examined.max(i + 2),
            };
        }
        if interpolation_closes && options.opens_interpolation(b, next) {
            let body = interpolation_body(bytes, i + 2);
            if body.terminated {
                return Region {
                    end: i,
                    terminated: true,
                    examined: body.examined,
                };
            }
            // No later `{{` can close either.
            interpolation_closes = false;
            examined = body.examined;
        }
        i += 1;
    }
    Region::open(bytes.len())
}
