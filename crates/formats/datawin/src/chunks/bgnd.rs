use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// A background entry in the BGND chunk.
#[derive(Debug)]
pub struct BackgroundEntry {
    /// Reference to the background name string.
    pub name: StringRef,
    /// Whether the background has transparency.
    pub transparent: bool,
    /// Whether edges are smoothed when scaled.
    pub smooth: bool,
    /// Whether the background is preloaded.
    pub preload: bool,
    /// Absolute TPAG item address for the background image.
    pub texture_addr: u32,
}

/// Parsed BGND chunk.
#[derive(Debug)]
pub struct Bgnd {
    pub backgrounds: Vec<BackgroundEntry>,
}

impl Bgnd {
    /// Parse the BGND chunk.
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let pointers = c.read_pointer_list()?;

        let mut backgrounds = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let mut ec = Cursor::new(data);
            ec.seek(ptr as usize);
            let name = StringRef(ec.read_u32()?);
            let transparent = ec.read_u32()? != 0;
            let smooth = ec.read_u32()? != 0;
            let preload = ec.read_u32()? != 0;
            let texture_addr = ec.read_u32()?;
            backgrounds.push(BackgroundEntry {
                name,
                transparent,
                smooth,
                preload,
                texture_addr,
            });
        }

        Ok(Self { backgrounds })
    }
}
