use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// A glyph entry within a font.
#[derive(Debug, Clone)]
pub struct Glyph {
    /// Unicode code point.
    pub character: u16,
    /// Source rectangle on the font's texture region.
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Horizontal advance to the next glyph.
    pub shift: i16,
    /// Horizontal offset applied before drawing.
    pub offset: i16,
}

/// A font entry in the FONT chunk.
#[derive(Debug)]
pub struct FontEntry {
    /// Reference to the font name string (code name).
    pub name: StringRef,
    /// Reference to the display name string.
    pub display_name: StringRef,
    /// Point size.
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
    /// First character code in the range.
    pub range_start: u16,
    /// Character set/codepage.
    pub charset: u8,
    /// Anti-alias level.
    pub antialias: u8,
    /// Last character code in the range.
    pub range_end: u32,
    /// Absolute TPAG item address for this font's texture region.
    pub texture_addr: u32,
    /// Scale factors, typically 1.0.
    pub scale_x: f32,
    pub scale_y: f32,
    /// Glyph definitions.
    pub glyphs: Vec<Glyph>,
}

/// Parsed FONT chunk.
#[derive(Debug)]
pub struct Font {
    /// Font entries.
    pub fonts: Vec<FontEntry>,
}

impl Font {
    /// Parse the FONT chunk.
    ///
    /// `chunk_data` is the raw chunk content (after the 8-byte header).
    /// `data` is the full file data (for following absolute pointers).
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let pointers = c.read_pointer_list()?;

        let mut fonts = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let font = Self::parse_font(data, ptr as usize)?;
            fonts.push(font);
        }

        Ok(Self { fonts })
    }

    fn parse_font(data: &[u8], offset: usize) -> Result<FontEntry> {
        let mut c = Cursor::new(data);
        c.seek(offset);

        let name = StringRef(c.read_u32()?);
        let display_name = StringRef(c.read_u32()?);
        let size = c.read_u32()?;
        let bold = c.read_u32()? != 0;
        let italic = c.read_u32()? != 0;
        let range_start = c.read_u16()?;
        let charset = c.read_u8()?;
        let antialias = c.read_u8()?;
        let range_end = c.read_u32()?;
        let texture_addr = c.read_u32()?;
        let scale_x = c.read_f32()?;
        let scale_y = c.read_f32()?;

        let glyph_ptrs = c.read_pointer_list()?;
        let mut glyphs = Vec::with_capacity(glyph_ptrs.len());
        for gp in glyph_ptrs {
            let mut gc = Cursor::new(data);
            gc.seek(gp as usize);
            glyphs.push(Glyph {
                character: gc.read_u16()?,
                x: gc.read_u16()?,
                y: gc.read_u16()?,
                width: gc.read_u16()?,
                height: gc.read_u16()?,
                shift: gc.read_i16()?,
                offset: gc.read_i16()?,
            });
        }

        Ok(FontEntry {
            name,
            display_name,
            size,
            bold,
            italic,
            range_start,
            charset,
            antialias,
            range_end,
            texture_addr,
            scale_x,
            scale_y,
            glyphs,
        })
    }
}
