use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// An event sub-entry (e.g. Alarm 3, Collision with object 12).
///
/// Every action of interest carries a CODE entry index; GameMaker: Studio
/// compiles both GML and drag-and-drop events down to bytecode, so a single
/// code action per event is the norm.
#[derive(Debug)]
pub struct EventEntry {
    /// Event subtype (alarm number, key code, colliding object index, …).
    pub subtype: u32,
    /// CODE entry indices for this event's actions, in action order.
    pub code_ids: Vec<u32>,
}

/// An object definition in the OBJT chunk.
#[derive(Debug)]
pub struct ObjectEntry {
    /// Reference to the object name string.
    pub name: StringRef,
    /// Sprite index (-1 = none).
    pub sprite_index: i32,
    /// Whether instances start visible.
    pub visible: bool,
    /// Whether instances are solid.
    pub solid: bool,
    /// Depth layer.
    pub depth: i32,
    /// Whether instances persist across rooms.
    pub persistent: bool,
    /// Parent object index (negative = none).
    pub parent_index: i32,
    /// Mask sprite index (-1 = use own sprite).
    pub mask_index: i32,
    /// Events indexed by event kind; each slot holds that kind's sub-entries.
    pub events: Vec<Vec<EventEntry>>,
}

/// Parsed OBJT chunk.
#[derive(Debug)]
pub struct Objt {
    /// Object definitions.
    pub objects: Vec<ObjectEntry>,
}

impl Objt {
    /// Parse the OBJT chunk.
    ///
    /// `chunk_data` is the raw chunk content (after the 8-byte header).
    /// `data` is the full file data (for following absolute pointers).
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let pointers = c.read_pointer_list()?;

        let mut objects = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let obj = Self::parse_object(data, ptr as usize)?;
            objects.push(obj);
        }

        Ok(Self { objects })
    }

    fn parse_object(data: &[u8], offset: usize) -> Result<ObjectEntry> {
        let mut c = Cursor::new(data);
        c.seek(offset);

        let name = StringRef(c.read_u32()?);
        let sprite_index = c.read_i32()?;
        let visible = c.read_u32()? != 0;
        let solid = c.read_u32()? != 0;
        let depth = c.read_i32()?;
        let persistent = c.read_u32()? != 0;
        let parent_index = c.read_i32()?;
        let mask_index = c.read_i32()?;

        // Physics block: enabled, sensor, shape, density, restitution, group,
        // linear/angular damping, vertex count, friction, awake, kinematic,
        // then the vertex floats. The runtime has no physics world; the block
        // is skipped but the vertex count still sizes the skip.
        c.skip(8 * 4)?;
        let vert_count = c.read_u32()? as usize;
        c.skip(3 * 4)?;
        c.skip(vert_count * 8)?;

        // Event type lists
        let event_ptrs = c.read_pointer_list()?;
        let mut events = Vec::with_capacity(event_ptrs.len());
        for ptr in event_ptrs {
            let entries = Self::parse_event_list(data, ptr as usize)?;
            events.push(entries);
        }

        Ok(ObjectEntry {
            name,
            sprite_index,
            visible,
            solid,
            depth,
            persistent,
            parent_index,
            mask_index,
            events,
        })
    }

    fn parse_event_list(data: &[u8], offset: usize) -> Result<Vec<EventEntry>> {
        let mut c = Cursor::new(data);
        c.seek(offset);
        let pointers = c.read_pointer_list()?;

        let mut entries = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let entry = Self::parse_event_entry(data, ptr as usize)?;
            entries.push(entry);
        }

        Ok(entries)
    }

    fn parse_event_entry(data: &[u8], offset: usize) -> Result<EventEntry> {
        let mut c = Cursor::new(data);
        c.seek(offset);

        let subtype = c.read_u32()?;
        let action_ptrs = c.read_pointer_list()?;

        let mut code_ids = Vec::with_capacity(action_ptrs.len());
        for ptr in action_ptrs {
            let mut ac = Cursor::new(data);
            ac.seek(ptr as usize);
            // Action record: lib_id, action_id, kind, has_relative,
            // is_question, applies_to, exec_type, func_name, code_id, …
            ac.skip(7 * 4)?;
            let _func_name = StringRef(ac.read_u32()?);
            let code_id = ac.read_u32()?;
            code_ids.push(code_id);
        }

        Ok(EventEntry { subtype, code_ids })
    }
}
