//! Typed parsers for individual chunk formats (Layer 2).
//!
//! Each parser takes the raw chunk content plus, where entries hold absolute
//! pointers, the full file data. Parsers keep `StringRef`s and texture-item
//! addresses raw; the asset graph resolves them to table indices.

pub mod bgnd;
pub mod code;
pub mod font;
pub mod func;
pub mod gen8;
pub mod objt;
pub mod path;
pub mod room;
pub mod scpt;
pub mod sprt;
pub mod tpag;
pub mod txtr;
pub mod vari;
