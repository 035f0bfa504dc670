//! Instruction decoding for the bytecode-16 VM format.

pub mod decode;
pub mod opcode;
pub mod types;

pub use decode::{decode, Instruction, Operand};
pub use opcode::Opcode;
pub use types::{ComparisonKind, DataType, ScopeCode, VariableRef};
