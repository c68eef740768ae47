use std::fmt;

/// Fatal binary decode errors.
#[derive(Debug, thiserror::Error)]
pub enum AdmError {
    #[error("unexpected end of stream at offset {offset}")]
    UnexpectedEof { offset: usize },

    #[error("unknown attribute type tag {tag} at offset {offset}")]
    UnknownAttributeType { tag: u32, offset: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Recoverable oddities in a binary stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmWarning {
    /// The header version differs from the one this codec writes.
    VersionMismatch { found: u32 },
}

impl fmt::Display for AdmWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmWarning::VersionMismatch { found } => write!(
                f,
                "version mismatch, expected {}, got {found}; expect errors",
                crate::VERSION
            ),
        }
    }
}
