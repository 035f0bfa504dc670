use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;
use crate::version::BytecodeVersion;

/// Parsed GEN8 chunk — game metadata.
#[derive(Debug)]
pub struct Gen8 {
    /// Whether the debugger is disabled.
    pub is_debug_disabled: bool,
    /// Bytecode format version.
    pub bytecode_version: BytecodeVersion,
    /// Reference to the filename string.
    pub filename: StringRef,
    /// Reference to the config string.
    pub config: StringRef,
    /// Last object ID + 1.
    pub last_obj: u32,
    /// Last tile ID + 1.
    pub last_tile: u32,
    /// Unique game ID.
    pub game_id: u32,
    /// Reference to the game name string.
    pub name: StringRef,
    /// IDE version: major.minor.release.build.
    pub major: u32,
    pub minor: u32,
    pub release: u32,
    pub build: u32,
    /// Default window size in pixels.
    pub default_window_width: u32,
    pub default_window_height: u32,
    /// Game info flags.
    pub info: u32,
    /// Compilation timestamp (Unix epoch).
    pub timestamp: u64,
    /// Reference to the display name string.
    pub display_name: StringRef,
    /// Room execution order (list of ROOM indices); the start room is the
    /// first entry, not ROOM index 0.
    pub room_order: Vec<u32>,
}

impl Gen8 {
    /// Parse the GEN8 chunk.
    ///
    /// `chunk_data` is the raw chunk content (after the 8-byte header).
    pub fn parse(chunk_data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);

        // First u32: debug(u8) + bytecodeVersion(u8) + padding(u16)
        let is_debug_disabled = c.read_u8()? != 0;
        let bytecode_version = BytecodeVersion(c.read_u8()?);
        let _padding = c.read_u16()?;

        let filename = StringRef(c.read_u32()?);
        let config = StringRef(c.read_u32()?);
        let last_obj = c.read_u32()?;
        let last_tile = c.read_u32()?;
        let game_id = c.read_u32()?;
        c.skip(16)?; // DirectPlay GUID, always zeroed

        let name = StringRef(c.read_u32()?);
        let major = c.read_u32()?;
        let minor = c.read_u32()?;
        let release = c.read_u32()?;
        let build = c.read_u32()?;
        let default_window_width = c.read_u32()?;
        let default_window_height = c.read_u32()?;
        let info = c.read_u32()?;
        c.skip(4)?; // license CRC32
        c.skip(16)?; // license MD5

        let timestamp = c.read_u64()?;
        let display_name = StringRef(c.read_u32()?);
        c.skip(8)?; // active targets
        c.skip(8)?; // function classifications
        c.skip(4)?; // Steam app id
        c.skip(4)?; // debugger port

        let room_count = c.read_u32()? as usize;
        let mut room_order = Vec::with_capacity(room_count);
        for _ in 0..room_count {
            room_order.push(c.read_u32()?);
        }

        Ok(Self {
            is_debug_disabled,
            bytecode_version,
            filename,
            config,
            last_obj,
            last_tile,
            game_id,
            name,
            major,
            minor,
            release,
            build,
            default_window_width,
            default_window_height,
            info,
            timestamp,
            display_name,
            room_order,
        })
    }
}
