use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// A sprite entry in the SPRT chunk.
#[derive(Debug)]
pub struct SpriteEntry {
    /// Reference to the sprite name string.
    pub name: StringRef,
    /// Sprite dimensions in pixels.
    pub width: u32,
    pub height: u32,
    /// Bounding box, inclusive pixel coordinates relative to the origin-less
    /// frame.
    pub bbox_left: i32,
    pub bbox_right: i32,
    pub bbox_bottom: i32,
    pub bbox_top: i32,
    /// Bounding box mode.
    pub bbox_mode: u32,
    /// Collision mask kind (0 = axis-aligned rectangle, 1 = precise).
    pub sep_masks: u32,
    /// Origin point.
    pub origin_x: i32,
    pub origin_y: i32,
    /// Absolute TPAG item addresses, one per animation frame.
    pub frame_addrs: Vec<u32>,
}

/// Parsed SPRT chunk.
#[derive(Debug)]
pub struct Sprt {
    /// Sprite entries.
    pub sprites: Vec<SpriteEntry>,
}

impl Sprt {
    /// Parse the SPRT chunk.
    ///
    /// `chunk_data` is the raw chunk content (after the 8-byte header).
    /// `data` is the full file data (for following absolute pointers).
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let pointers = c.read_pointer_list()?;

        let mut sprites = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let sprite = Self::parse_sprite(data, ptr as usize)?;
            sprites.push(sprite);
        }

        Ok(Self { sprites })
    }

    fn parse_sprite(data: &[u8], offset: usize) -> Result<SpriteEntry> {
        let mut c = Cursor::new(data);
        c.seek(offset);

        let name = StringRef(c.read_u32()?);
        let width = c.read_u32()?;
        let height = c.read_u32()?;
        let bbox_left = c.read_i32()?;
        let bbox_right = c.read_i32()?;
        let bbox_bottom = c.read_i32()?;
        let bbox_top = c.read_i32()?;
        let _transparent = c.read_u32()?;
        let _smooth = c.read_u32()?;
        let _preload = c.read_u32()?;
        let bbox_mode = c.read_u32()?;
        let sep_masks = c.read_u32()?;
        let origin_x = c.read_i32()?;
        let origin_y = c.read_i32()?;

        // Frame count + TPAG item addresses. The per-frame collision masks
        // that follow are not read; collision is bounding-box based.
        let frame_count = c.read_i32()?;
        let mut frame_addrs = Vec::new();
        if frame_count > 0 {
            frame_addrs.reserve(frame_count as usize);
            for _ in 0..frame_count {
                frame_addrs.push(c.read_u32()?);
            }
        }

        Ok(SpriteEntry {
            name,
            width,
            height,
            bbox_left,
            bbox_right,
            bbox_bottom,
            bbox_top,
            bbox_mode,
            sep_masks,
            origin_x,
            origin_y,
            frame_addrs,
        })
    }
}
