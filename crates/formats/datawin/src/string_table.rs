use std::collections::HashMap;

use crate::cursor::Cursor;
use crate::error::{Error, Result};

/// A reference to a string by its absolute file offset.
///
/// String references appear throughout the container. The offset points to
/// the character data; the u32 length prefix sits at `offset - 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringRef(pub u32);

impl StringRef {
    /// Resolve this reference against the full file data.
    pub fn resolve(&self, data: &[u8]) -> Result<String> {
        let offset = self.0 as usize;
        if offset < 4 {
            return Err(Error::InvalidStringOffset { offset });
        }
        let len_offset = offset - 4;
        if len_offset + 4 > data.len() {
            return Err(Error::InvalidStringOffset { offset });
        }
        let mut cursor = Cursor::new(data);
        cursor.seek(len_offset);
        cursor.read_gm_string()
    }
}

/// Parsed string table from the STRG chunk.
///
/// Holds every string eagerly decoded in table order, plus a map from the
/// character-data file offset back to the table index so that inline
/// `StringRef`s elsewhere in the container can be converted to indices.
pub struct StringTable {
    strings: Vec<String>,
    /// Character-data absolute offset → table index.
    by_offset: HashMap<u32, u32>,
    /// STRG entry offsets as stored in the file (length-prefix offsets).
    offsets: Vec<u32>,
}

impl StringTable {
    /// Parse the STRG chunk.
    ///
    /// `chunk_data` is the raw STRG chunk content (after the 8-byte header).
    /// `data` is the full file for resolving the absolute entry offsets.
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(chunk_data);
        let offsets = cursor.read_pointer_list()?;

        let mut strings = Vec::with_capacity(offsets.len());
        let mut by_offset = HashMap::with_capacity(offsets.len());
        for (index, &offset) in offsets.iter().enumerate() {
            let offset = offset as usize;
            if offset + 4 > data.len() {
                return Err(Error::InvalidStringOffset { offset });
            }
            let mut c = Cursor::new(data);
            c.seek(offset);
            strings.push(c.read_gm_string()?);
            // Inline references point at the character data, 4 past the prefix.
            by_offset.insert(offset as u32 + 4, index as u32);
        }

        Ok(Self {
            strings,
            by_offset,
            offsets,
        })
    }

    /// Number of strings in the table.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// String at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(|s| s.as_str())
    }

    /// Convert an inline `StringRef` (file offset) to a table index.
    pub fn index_of(&self, string_ref: StringRef) -> Option<u32> {
        self.by_offset.get(&string_ref.0).copied()
    }

    /// Resolve an inline `StringRef` to the interned string.
    pub fn resolve(&self, string_ref: StringRef) -> Result<&str> {
        let index = self
            .index_of(string_ref)
            .ok_or(Error::InvalidStringOffset {
                offset: string_ref.0 as usize,
            })?;
        Ok(&self.strings[index as usize])
    }

    /// The raw STRG entry offsets, in table order.
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// All strings in table order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }
}
