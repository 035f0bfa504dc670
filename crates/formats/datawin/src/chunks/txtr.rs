use crate::cursor::Cursor;
use crate::error::Result;

/// A texture page entry in the TXTR chunk.
#[derive(Debug)]
pub struct TextureEntry {
    /// Absolute file offset of the raw page data (PNG).
    pub data_offset: u32,
}

/// Parsed TXTR chunk.
#[derive(Debug)]
pub struct Txtr {
    /// Texture page entries.
    pub textures: Vec<TextureEntry>,
}

impl Txtr {
    /// Parse the TXTR chunk.
    ///
    /// `chunk_data` is the raw chunk content (after the 8-byte header).
    /// `data` is the full file data (for following absolute pointers).
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let pointers = c.read_pointer_list()?;

        let mut textures = Vec::with_capacity(pointers.len());
        for ptr in &pointers {
            let mut ec = Cursor::new(data);
            ec.seek(*ptr as usize);
            let _scaled = ec.read_u32()?;
            let data_offset = ec.read_u32()?;
            textures.push(TextureEntry { data_offset });
        }

        Ok(Self { textures })
    }

    /// Raw page bytes (PNG) for a texture entry.
    ///
    /// Reads from `data_offset` until the next page's data or end of file.
    pub fn texture_data<'a>(&self, index: usize, data: &'a [u8]) -> Option<&'a [u8]> {
        let entry = self.textures.get(index)?;
        let start = entry.data_offset as usize;
        if start >= data.len() {
            return None;
        }
        let end = self
            .textures
            .get(index + 1)
            .map(|next| next.data_offset as usize)
            .unwrap_or(data.len());
        if end < start || end > data.len() {
            return None;
        }
        Some(&data[start..end])
    }
}
