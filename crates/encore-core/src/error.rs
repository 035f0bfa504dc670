use thiserror::Error;

/// Runtime error taxonomy.
///
/// Load and asset-reference errors are fatal at startup (process exit 2);
/// VM errors are fatal at the offending frame (exit 1). Stub calls and
/// absent handlers are warnings, logged and never fatal.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("load error: {0}")]
    Load(#[from] datawin::Error),

    #[error("asset reference error: {context} (index {index})")]
    AssetRef { context: &'static str, index: i64 },

    #[error("vm error in {code_entry} at ip {ip}: {message}")]
    Vm {
        message: String,
        code_entry: String,
        ip: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input recording error: {0}")]
    Recording(#[from] serde_json::Error),
}

impl RuntimeError {
    /// Process exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            RuntimeError::Load(_) | RuntimeError::AssetRef { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
