//! Reader for GameMaker: Studio 1.x compiled containers (`data.win` / `game.unx`).
//!
//! Two-layer architecture:
//! - **Layer 1** (`reader`): Raw chunk I/O — FORM envelope, chunk index
//! - **Layer 2** (`chunks`): Typed parsers for individual chunk formats
//!
//! Cross-reference resolution (string offsets to table indices, texture page
//! item addresses to indices) is the consumer's job, once all tables are
//! parsed. The runtime crate does this in its asset graph.

pub mod bytecode;
pub mod chunks;
pub mod cursor;
pub mod error;
pub mod reader;
pub mod string_table;
pub mod version;

pub use error::{Error, Result};
pub use reader::ChunkIndex;
pub use version::BytecodeVersion;

/// Locate the FORM payload inside raw file bytes.
///
/// A `game.exe` is a Windows PE executable with the GameMaker FORM blob
/// embedded after the PE image. Every `FORM` occurrence is validated against
/// its declared size before accepting, since PE sections can contain
/// false-positive byte sequences.
pub fn find_form(data: &[u8]) -> Option<usize> {
    if !data.starts_with(b"MZ") {
        return data.starts_with(b"FORM").then_some(0);
    }
    const FORM: &[u8] = b"FORM";
    for offset in 0..data.len().saturating_sub(7) {
        if &data[offset..offset + 4] != FORM {
            continue;
        }
        let size_bytes: [u8; 4] = data[offset + 4..offset + 8].try_into().ok()?;
        let form_size = u32::from_le_bytes(size_bytes) as usize;
        if offset + 8 + form_size <= data.len() {
            return Some(offset);
        }
    }
    None
}
