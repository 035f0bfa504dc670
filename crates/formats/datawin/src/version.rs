/// Bytecode version extracted from GEN8.
///
/// GameMaker: Studio 1.4.9999 ships bytecode 16 (adds the LANG and GLOB
/// chunks over 15). This runtime targets 16 exclusively; anything else is
/// rejected at load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BytecodeVersion(pub u8);

impl BytecodeVersion {
    pub const V16: Self = Self(16);

    /// Whether this runtime can execute the container.
    pub fn is_supported(self) -> bool {
        self.0 == 16
    }
}

impl std::fmt::Display for BytecodeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
