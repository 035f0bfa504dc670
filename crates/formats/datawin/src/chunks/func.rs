use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// A function definition in the FUNC chunk.
///
/// The FUNC entry index is what `call` instructions carry as function id.
/// Built-ins and scripts share this table; scripts are distinguished by
/// their name appearing in SCPT.
#[derive(Debug)]
pub struct FunctionEntry {
    /// Reference to the function name string.
    pub name: StringRef,
    /// Number of call sites referencing this function.
    pub occurrences: u32,
    /// Address of the first occurrence in bytecode, or -1 if none.
    pub first_address: i32,
}

/// Local variable information for a single code entry.
#[derive(Debug)]
pub struct CodeLocals {
    /// Reference to the code entry name.
    pub name: StringRef,
    /// Local variables used in this code entry: (local index, name ref).
    pub locals: Vec<(u32, StringRef)>,
}

/// Parsed FUNC chunk.
#[derive(Debug)]
pub struct Func {
    /// Function definitions.
    pub functions: Vec<FunctionEntry>,
    /// Per-code-entry local variable information.
    pub code_locals: Vec<CodeLocals>,
}

impl Func {
    /// Parse the FUNC chunk (bytecode-16 layout: function list with count
    /// header, then code-locals list with count header).
    pub fn parse(chunk_data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        if c.remaining() == 0 {
            return Ok(Self {
                functions: Vec::new(),
                code_locals: Vec::new(),
            });
        }

        let func_count = c.read_u32()? as usize;
        let mut functions = Vec::with_capacity(func_count);
        for _ in 0..func_count {
            let name = StringRef(c.read_u32()?);
            let occurrences = c.read_u32()?;
            let first_address = c.read_i32()?;
            functions.push(FunctionEntry {
                name,
                occurrences,
                first_address,
            });
        }

        let mut code_locals = Vec::new();
        if c.remaining() >= 4 {
            let locals_count = c.read_u32()? as usize;
            code_locals.reserve(locals_count);
            for _ in 0..locals_count {
                let var_count = c.read_u32()? as usize;
                let name = StringRef(c.read_u32()?);
                let mut locals = Vec::with_capacity(var_count);
                for _ in 0..var_count {
                    let index = c.read_u32()?;
                    let var_name = StringRef(c.read_u32()?);
                    locals.push((index, var_name));
                }
                code_locals.push(CodeLocals { name, locals });
            }
        }

        Ok(Self {
            functions,
            code_locals,
        })
    }
}
