//! Scanner state: the open-tag stack carried between scanner invocations.

use serde::{Deserialize, Serialize};

use crate::tag::Tag;
use crate::StateError;

/// Upper bound on a serialized state blob, matching the buffer a tree-sitter
/// external scanner is given.
pub const SERIALIZATION_BUFFER_SIZE: usize = 1024;

/// Lexing mode derived from the top of the tag stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode<'s> {
    /// Markup, text, expressions and server-page regions.
    Content,
    /// Inside `<script>`/`<style>`: opaque until `</` + this name.
    RawText(&'s str),
}

/// The state threaded through every scanner call.
///
/// Two states compare equal exactly when the scanner would behave the same
/// from them, so a state can key a token cache during incremental reparse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ScannerState {
    tags: Vec<Tag>,
}

impl ScannerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn depth(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn top(&self) -> Option<&Tag> {
        self.tags.last()
    }

    pub fn push(&mut self, tag: Tag) {
        self.tags.push(tag);
    }

    pub fn pop(&mut self) -> Option<Tag> {
        self.tags.pop()
    }

    /// Whether any open element (not just the top) has this name.
    pub fn contains(&self, name: &str) -> bool {
        self.tags.iter().any(|tag| tag.matches(name))
    }

    pub fn mode(&self) -> LexMode<'_> {
        match self.top() {
            Some(tag) if tag.category().is_raw_text() => LexMode::RawText(tag.name()),
            _ => LexMode::Content,
        }
    }

    /// Encode the stack as an opaque blob.
    ///
    /// Layout: `u16` count of serialized tags, `u16` total depth, then one
    /// length-prefixed name per serialized tag. Tags that do not fit in
    /// [`SERIALIZATION_BUFFER_SIZE`] are counted but not written, and names
    /// are cut at 255 bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let total = self.tags.len().min(u16::MAX as usize) as u16;
        let mut buffer = Vec::with_capacity(4 + self.tags.len() * 8);
        buffer.extend_from_slice(&0u16.to_le_bytes());
        buffer.extend_from_slice(&total.to_le_bytes());

        let mut serialized: u16 = 0;
        for tag in self.tags.iter().take(total as usize) {
            let name = truncate_name(tag.name());
            if buffer.len() + 1 + name.len() > SERIALIZATION_BUFFER_SIZE {
                break;
            }
            buffer.push(name.len() as u8);
            buffer.extend_from_slice(name.as_bytes());
            serialized += 1;
        }

        buffer[0..2].copy_from_slice(&serialized.to_le_bytes());
        buffer
    }

    /// Decode a blob produced by [`ScannerState::serialize`].
    ///
    /// An empty blob is the initial state. Tags that were counted but not
    /// written are restored as nameless placeholders.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, StateError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        if bytes.len() < 4 {
            return Err(StateError::Truncated { offset: bytes.len() });
        }

        let serialized = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        let total = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
        if serialized > total {
            return Err(StateError::CountMismatch { serialized, total });
        }

        let mut tags = Vec::with_capacity(total);
        let mut offset = 4;
        for _ in 0..serialized {
            let len = *bytes
                .get(offset)
                .ok_or(StateError::Truncated { offset })? as usize;
            let name = bytes
                .get(offset + 1..offset + 1 + len)
                .ok_or(StateError::Truncated { offset: offset + 1 })?;
            let name =
                std::str::from_utf8(name).map_err(|_| StateError::InvalidTagName { offset })?;
            tags.push(Tag::new(name));
            offset += 1 + len;
        }
        tags.resize_with(total, || Tag::new(""));

        Ok(Self { tags })
    }
}

fn truncate_name(name: &str) -> &str {
    let mut end = name.len().min(u8::MAX as usize);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
