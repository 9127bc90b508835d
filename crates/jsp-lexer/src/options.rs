use serde::{Deserialize, Serialize};

/// Dialect switches fixed for the lifetime of a parse session.
///
/// Options are not part of [`ScannerState`](crate::ScannerState): a session
/// never changes them, so cached tokens stay valid across edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Recognize deferred EL (`#{...}`) alongside immediate EL (`${...}`).
    pub deferred_el: bool,
    /// Recognize mustache interpolation (`{{ ... }}`).
    pub interpolation: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            deferred_el: true,
            interpolation: true,
        }
    }
}

impl ScanOptions {
    /// Whether `first` followed by `second` opens an EL span.
    pub fn opens_el(&self, first: u8, second: Option<u8>) -> bool {
        second == Some(b'{') && (first == b'$' || (first == b'#' && self.deferred_el))
    }

    /// Whether `first` followed by `second` opens an interpolation.
    pub fn opens_interpolation(&self, first: u8, second: Option<u8>) -> bool {
        self.interpolation && first == b'{' && second == Some(b'{')
    }
}
