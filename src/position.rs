//! Two-level scan positions over a `(class, item)` key space, and their
//! opaque token form.
//!
//! A token is 8 bytes: class index then item index, both big-endian u32.
//! The string form is URL-safe base64 without padding. Decoding only checks
//! the shape; whether a position still addresses a row is decided on seek.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tracing::warn;

use crate::error::{TableError, TableResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DoubleIndexPos {
    pub class_index: u32,
    pub item_index: u32,
}

impl DoubleIndexPos {
    pub const fn new(class_index: u32, item_index: u32) -> Self {
        Self { class_index, item_index }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_at(&mut self, other: &DoubleIndexPos) {
        *self = *other;
    }

    /// Position of the item following `other` within the same class.
    pub fn set_after(&mut self, other: &DoubleIndexPos) {
        self.class_index = other.class_index;
        self.item_index = other.item_index.saturating_add(1);
    }

    pub fn has_more_item(&self, items: u32) -> bool {
        self.item_index < items
    }

    pub fn next_item(&mut self) {
        self.item_index = self.item_index.saturating_add(1);
    }

    pub fn next_class(&mut self) {
        self.class_index = self.class_index.saturating_add(1);
        self.item_index = 0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PositionToken([u8; PositionToken::LEN]);

impl PositionToken {
    pub const LEN: usize = 8;

    pub fn from_pos(pos: &DoubleIndexPos) -> Self {
        let mut b = [0u8; Self::LEN];
        b[..4].copy_from_slice(&pos.class_index.to_be_bytes());
        b[4..].copy_from_slice(&pos.item_index.to_be_bytes());
        Self(b)
    }

    pub fn to_pos(&self) -> DoubleIndexPos {
        let mut class = [0u8; 4];
        let mut item = [0u8; 4];
        class.copy_from_slice(&self.0[..4]);
        item.copy_from_slice(&self.0[4..]);
        DoubleIndexPos::new(u32::from_be_bytes(class), u32::from_be_bytes(item))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] { &self.0 }

    pub fn from_bytes(bytes: &[u8]) -> TableResult<Self> {
        let arr: [u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| TableError::BadToken(format!("expected {} bytes, got {}", Self::LEN, bytes.len())))?;
        Ok(Self(arr))
    }

    pub fn encode(&self) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn decode(s: &str) -> TableResult<Self> {
        let token = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(s.trim())
            .map_err(|e| TableError::BadToken(e.to_string()))
            .and_then(|b| Self::from_bytes(&b));
        if let Err(e) = &token {
            warn!(target: "perfschema::position", "rejected position token '{}': {}", s, e);
        }
        token
    }
}

impl From<DoubleIndexPos> for PositionToken {
    fn from(pos: DoubleIndexPos) -> Self { Self::from_pos(&pos) }
}

impl Display for PositionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Live scan cursor: `current` addresses the row being produced, `next` is
/// where the following step starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeySpaceCursor {
    current: DoubleIndexPos,
    next: DoubleIndexPos,
}

impl KeySpaceCursor {
    pub fn new() -> Self { Self::default() }

    pub fn current(&self) -> DoubleIndexPos { self.current }
    pub fn next_pos(&self) -> DoubleIndexPos { self.next }

    pub fn reset(&mut self) {
        self.current.reset();
        self.next.reset();
    }

    /// Start a step from the saved `next` position.
    pub fn begin_step(&mut self) {
        let next = self.next;
        self.current.set_at(&next);
    }

    /// Move `current` past the end of its class.
    pub fn skip_class(&mut self) {
        self.current.next_class();
    }

    /// The row at `current` was produced; the next step starts after it.
    pub fn advance(&mut self) {
        let current = self.current;
        self.next.set_after(&current);
    }

    pub fn seek(&mut self, pos: DoubleIndexPos) {
        self.current.set_at(&pos);
    }
}

#[cfg(test)]
#[path = "position_tests.rs"]
mod position_tests;
