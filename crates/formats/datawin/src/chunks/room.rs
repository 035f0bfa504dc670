use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// A background layer placed in a room.
#[derive(Debug, Clone)]
pub struct RoomBackground {
    /// Whether the layer is drawn.
    pub enabled: bool,
    /// Whether the layer draws above instances (foreground pass).
    pub foreground: bool,
    /// Index into the BGND chunk, or -1.
    pub background_index: i32,
    /// Layer offset in room coordinates.
    pub x: i32,
    pub y: i32,
    /// Tiling flags.
    pub tile_x: bool,
    pub tile_y: bool,
    /// Per-frame scroll speed.
    pub speed_x: i32,
    pub speed_y: i32,
    /// Whether the image is stretched to the room.
    pub stretch: bool,
}

/// A view/port pair in a room.
#[derive(Debug, Clone)]
pub struct RoomView {
    /// Whether the view is enabled.
    pub enabled: bool,
    /// Source rectangle in room coordinates.
    pub view_x: i32,
    pub view_y: i32,
    pub view_width: i32,
    pub view_height: i32,
    /// Destination port rectangle on the window.
    pub port_x: i32,
    pub port_y: i32,
    pub port_width: i32,
    pub port_height: i32,
    /// Horizontal/vertical border for object following.
    pub border_x: i32,
    pub border_y: i32,
    /// Following speed (-1 = instant).
    pub speed_x: i32,
    pub speed_y: i32,
    /// Object index the view follows, or -1.
    pub follow_object: i32,
}

/// A static tile placed in a room.
#[derive(Debug, Clone)]
pub struct RoomTile {
    /// Room position.
    pub x: i32,
    pub y: i32,
    /// Index into the BGND chunk the tile samples from.
    pub background_index: i32,
    /// Source rectangle on the background image.
    pub source_x: u32,
    pub source_y: u32,
    pub width: u32,
    pub height: u32,
    /// Depth key (higher draws earlier).
    pub depth: i32,
    /// Tile id from the editor.
    pub id: u32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Blend color (ABGR).
    pub color: u32,
}

/// An object instance placed in a room.
#[derive(Debug, Clone)]
pub struct RoomInstance {
    /// Room position.
    pub x: i32,
    pub y: i32,
    /// Index into the OBJT chunk.
    pub object_index: i32,
    /// Instance id assigned by the editor.
    pub id: u32,
    /// Index into the CODE chunk for instance creation code, or -1.
    pub creation_code: i32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Blend color (ABGR).
    pub color: u32,
    /// Rotation in degrees.
    pub rotation: f32,
}

/// A room entry in the ROOM chunk.
#[derive(Debug)]
pub struct RoomEntry {
    /// Reference to the room name string.
    pub name: StringRef,
    /// Reference to the room caption string.
    pub caption: StringRef,
    /// Room size in pixels.
    pub width: u32,
    pub height: u32,
    /// Room speed (steps per second).
    pub speed: u32,
    /// Whether the room is persistent.
    pub persistent: bool,
    /// Background color (BGR).
    pub background_color: u32,
    /// Whether to clear with the background color.
    pub draw_background_color: bool,
    /// Creation code entry index into the CODE chunk, or -1.
    pub creation_code: i32,
    /// Room flags (bit 0: views enabled).
    pub flags: u32,
    /// Background layers in layer order.
    pub backgrounds: Vec<RoomBackground>,
    /// Views in view order.
    pub views: Vec<RoomView>,
    /// Placed instances in editor order.
    pub instances: Vec<RoomInstance>,
    /// Static tiles.
    pub tiles: Vec<RoomTile>,
}

/// Parsed ROOM chunk.
#[derive(Debug)]
pub struct Room {
    /// Room entries.
    pub rooms: Vec<RoomEntry>,
}

impl Room {
    /// Parse the ROOM chunk.
    ///
    /// `chunk_data` is the raw chunk content (after the 8-byte header).
    /// `data` is the full file data (for following absolute pointers).
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let pointers = c.read_pointer_list()?;

        let mut rooms = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let room = Self::parse_room(data, ptr as usize)?;
            rooms.push(room);
        }

        Ok(Self { rooms })
    }

    fn parse_room(data: &[u8], offset: usize) -> Result<RoomEntry> {
        let mut c = Cursor::new(data);
        c.seek(offset);

        let name = StringRef(c.read_u32()?);
        let caption = StringRef(c.read_u32()?);
        let width = c.read_u32()?;
        let height = c.read_u32()?;
        let speed = c.read_u32()?;
        let persistent = c.read_u32()? != 0;
        let background_color = c.read_u32()?;
        let draw_background_color = c.read_u32()? != 0;
        let creation_code = c.read_i32()?;
        let flags = c.read_u32()?;

        // Sub-list pointers
        let bg_ptr = c.read_u32()?;
        let views_ptr = c.read_u32()?;
        let instances_ptr = c.read_u32()?;
        let tiles_ptr = c.read_u32()?;

        // Physics world block is present but unused by this runtime.

        let backgrounds = Self::parse_backgrounds(data, bg_ptr as usize)?;
        let views = Self::parse_views(data, views_ptr as usize)?;
        let instances = Self::parse_instances(data, instances_ptr as usize)?;
        let tiles = Self::parse_tiles(data, tiles_ptr as usize)?;

        Ok(RoomEntry {
            name,
            caption,
            width,
            height,
            speed,
            persistent,
            background_color,
            draw_background_color,
            creation_code,
            flags,
            backgrounds,
            views,
            instances,
            tiles,
        })
    }

    fn parse_backgrounds(data: &[u8], offset: usize) -> Result<Vec<RoomBackground>> {
        let mut c = Cursor::new(data);
        c.seek(offset);
        let pointers = c.read_pointer_list()?;

        let mut backgrounds = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let mut bc = Cursor::new(data);
            bc.seek(ptr as usize);
            backgrounds.push(RoomBackground {
                enabled: bc.read_u32()? != 0,
                foreground: bc.read_u32()? != 0,
                background_index: bc.read_i32()?,
                x: bc.read_i32()?,
                y: bc.read_i32()?,
                tile_x: bc.read_u32()? != 0,
                tile_y: bc.read_u32()? != 0,
                speed_x: bc.read_i32()?,
                speed_y: bc.read_i32()?,
                stretch: bc.read_u32()? != 0,
            });
        }
        Ok(backgrounds)
    }

    fn parse_views(data: &[u8], offset: usize) -> Result<Vec<RoomView>> {
        let mut c = Cursor::new(data);
        c.seek(offset);
        let pointers = c.read_pointer_list()?;

        let mut views = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let mut vc = Cursor::new(data);
            vc.seek(ptr as usize);
            views.push(RoomView {
                enabled: vc.read_u32()? != 0,
                view_x: vc.read_i32()?,
                view_y: vc.read_i32()?,
                view_width: vc.read_i32()?,
                view_height: vc.read_i32()?,
                port_x: vc.read_i32()?,
                port_y: vc.read_i32()?,
                port_width: vc.read_i32()?,
                port_height: vc.read_i32()?,
                border_x: vc.read_i32()?,
                border_y: vc.read_i32()?,
                speed_x: vc.read_i32()?,
                speed_y: vc.read_i32()?,
                follow_object: vc.read_i32()?,
            });
        }
        Ok(views)
    }

    fn parse_instances(data: &[u8], offset: usize) -> Result<Vec<RoomInstance>> {
        let mut c = Cursor::new(data);
        c.seek(offset);
        let pointers = c.read_pointer_list()?;

        let mut instances = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let mut ic = Cursor::new(data);
            ic.seek(ptr as usize);
            instances.push(RoomInstance {
                x: ic.read_i32()?,
                y: ic.read_i32()?,
                object_index: ic.read_i32()?,
                id: ic.read_u32()?,
                creation_code: ic.read_i32()?,
                scale_x: ic.read_f32()?,
                scale_y: ic.read_f32()?,
                color: ic.read_u32()?,
                rotation: ic.read_f32()?,
            });
        }
        Ok(instances)
    }

    fn parse_tiles(data: &[u8], offset: usize) -> Result<Vec<RoomTile>> {
        let mut c = Cursor::new(data);
        c.seek(offset);
        let pointers = c.read_pointer_list()?;

        let mut tiles = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let mut tc = Cursor::new(data);
            tc.seek(ptr as usize);
            tiles.push(RoomTile {
                x: tc.read_i32()?,
                y: tc.read_i32()?,
                background_index: tc.read_i32()?,
                source_x: tc.read_u32()?,
                source_y: tc.read_u32()?,
                width: tc.read_u32()?,
                height: tc.read_u32()?,
                depth: tc.read_i32()?,
                id: tc.read_u32()?,
                scale_x: tc.read_f32()?,
                scale_y: tc.read_f32()?,
                color: tc.read_u32()?,
            });
        }
        Ok(tiles)
    }
}
