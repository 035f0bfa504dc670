use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// A single code entry in the CODE chunk (bytecode-16 layout).
#[derive(Debug)]
pub struct CodeEntry {
    /// Reference to the entry's name string (e.g. "gml_Script_scr_foo",
    /// "gml_Object_obj_mainchara_Step_0").
    pub name: StringRef,
    /// Length of bytecode in bytes.
    pub length: u32,
    /// Number of local variable slots.
    pub locals_count: u16,
    /// Number of declared arguments (bit 15 is a compiler flag).
    pub args_count: u16,
    /// Absolute file offset where this entry's bytecode begins.
    pub bytecode_offset: usize,
}

impl CodeEntry {
    /// Declared argument count with the compiler flag bit stripped.
    pub fn arg_count(&self) -> u16 {
        self.args_count & 0x7FFF
    }
}

/// Parsed CODE chunk.
#[derive(Debug)]
pub struct Code {
    pub entries: Vec<CodeEntry>,
}

impl Code {
    /// Parse the CODE chunk.
    ///
    /// `chunk_data` is the raw chunk content (after the 8-byte header).
    /// `chunk_data_offset` is the absolute file offset where `chunk_data`
    /// begins; entry pointers are absolute.
    pub fn parse(chunk_data: &[u8], chunk_data_offset: usize) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let ptrs = c.read_pointer_list()?;

        // BC16 entry: name, length, locals:u16, args:u16, then a relative
        // address to the bytecode (relative to the field that holds it, at
        // ptr + 12) and an offset within that blob (0 for BC16).
        let mut entries = Vec::with_capacity(ptrs.len());
        for &ptr in &ptrs {
            let rel = ptr as usize - chunk_data_offset;
            let mut ec = Cursor::new(chunk_data);
            ec.seek(rel);

            let name = StringRef(ec.read_u32()?);
            let length = ec.read_u32()?;
            let locals_count = ec.read_u16()?;
            let args_count = ec.read_u16()?;
            let bc_rel_addr = ec.read_i32()?;
            let offset_in_blob = ec.read_u32()?;

            let bytecode_offset =
                (ptr as i64 + 12 + bc_rel_addr as i64 + offset_in_blob as i64) as usize;

            entries.push(CodeEntry {
                name,
                length,
                locals_count,
                args_count,
                bytecode_offset,
            });
        }

        Ok(Self { entries })
    }

    /// Extract bytecode bytes for a specific entry from the full file data.
    pub fn entry_bytecode<'a>(&self, index: usize, data: &'a [u8]) -> Option<&'a [u8]> {
        let entry = self.entries.get(index)?;
        let start = entry.bytecode_offset;
        let end = start + entry.length as usize;
        if end <= data.len() {
            Some(&data[start..end])
        } else {
            None
        }
    }
}
