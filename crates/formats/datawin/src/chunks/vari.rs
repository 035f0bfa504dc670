use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// A variable definition in the VARI chunk.
///
/// The VARI entry index is the slot id that variable instructions carry in
/// their 24-bit operand field.
#[derive(Debug)]
pub struct VariableEntry {
    /// Reference to the variable name string.
    pub name: StringRef,
    /// Scope the variable was registered under (-1 self, -5 global, …).
    pub instance_type: i32,
    /// Variable id within its scope.
    pub var_id: i32,
    /// Number of occurrences in bytecode.
    pub occurrences: u32,
    /// Address of the first occurrence, or -1 if none.
    pub first_address: i32,
}

/// Parsed VARI chunk.
#[derive(Debug)]
pub struct Vari {
    /// Number of instance variables with instance_type >= 0.
    pub instance_var_count: u32,
    /// Total number of instance variable ids used.
    pub instance_var_count_max: u32,
    /// Maximum local variable count across all code entries.
    pub max_local_var_count: u32,
    /// Variable entries, indexed by slot id.
    pub variables: Vec<VariableEntry>,
}

impl Vari {
    /// Parse the VARI chunk (bytecode-16 layout: three u32 header fields,
    /// then 20-byte entries).
    pub fn parse(chunk_data: &[u8]) -> Result<Self> {
        if chunk_data.is_empty() {
            return Ok(Self {
                instance_var_count: 0,
                instance_var_count_max: 0,
                max_local_var_count: 0,
                variables: Vec::new(),
            });
        }

        let mut c = Cursor::new(chunk_data);
        let instance_var_count = c.read_u32()?;
        let instance_var_count_max = c.read_u32()?;
        let max_local_var_count = c.read_u32()?;

        let entry_count = c.remaining() / 20;
        let mut variables = Vec::with_capacity(entry_count);
        for _ in 0..entry_count {
            let name = StringRef(c.read_u32()?);
            let instance_type = c.read_i32()?;
            let var_id = c.read_i32()?;
            let occurrences = c.read_u32()?;
            let first_address = c.read_i32()?;
            variables.push(VariableEntry {
                name,
                instance_type,
                var_id,
                occurrences,
                first_address,
            });
        }

        Ok(Self {
            instance_var_count,
            instance_var_count_max,
            max_local_var_count,
            variables,
        })
    }
}
