use std::collections::HashMap;

use crate::cursor::Cursor;
use crate::error::Result;

/// A texture page item in the TPAG chunk.
///
/// Describes a rectangular region on a texture atlas page plus where the
/// region sits inside the original (pre-trim) sprite frame.
#[derive(Debug, Clone)]
pub struct TexturePageItem {
    /// Source rectangle on the texture page.
    pub source_x: u16,
    pub source_y: u16,
    pub source_width: u16,
    pub source_height: u16,
    /// Placement of the trimmed region inside the original frame.
    pub target_x: u16,
    pub target_y: u16,
    pub target_width: u16,
    pub target_height: u16,
    /// Original (pre-trim) frame dimensions.
    pub dest_width: u16,
    pub dest_height: u16,
    /// Index into the TXTR chunk (which texture atlas page).
    pub texture_page: u16,
}

/// Parsed TPAG chunk.
#[derive(Debug)]
pub struct Tpag {
    /// Texture page items.
    pub items: Vec<TexturePageItem>,
    /// Absolute file address of each item, in item order. Sprites, fonts and
    /// backgrounds reference items by address; the asset graph maps them to
    /// indices through this table.
    pub addresses: Vec<u32>,
}

impl Tpag {
    /// Parse the TPAG chunk.
    ///
    /// `chunk_data` is the raw chunk content (after the 8-byte header).
    /// `data` is the full file data (for following absolute pointers).
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let pointers = c.read_pointer_list()?;

        let mut items = Vec::with_capacity(pointers.len());
        for &ptr in &pointers {
            let mut ec = Cursor::new(data);
            ec.seek(ptr as usize);

            items.push(TexturePageItem {
                source_x: ec.read_u16()?,
                source_y: ec.read_u16()?,
                source_width: ec.read_u16()?,
                source_height: ec.read_u16()?,
                target_x: ec.read_u16()?,
                target_y: ec.read_u16()?,
                target_width: ec.read_u16()?,
                target_height: ec.read_u16()?,
                dest_width: ec.read_u16()?,
                dest_height: ec.read_u16()?,
                texture_page: ec.read_u16()?,
            });
        }

        Ok(Self {
            items,
            addresses: pointers,
        })
    }

    /// Build the address → index map used for cross-reference resolution.
    pub fn index_by_address(&self) -> HashMap<u32, u32> {
        self.addresses
            .iter()
            .enumerate()
            .map(|(i, &addr)| (addr, i as u32))
            .collect()
    }
}
