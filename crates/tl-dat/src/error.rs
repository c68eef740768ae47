use std::fmt;

/// Fatal DAT parse errors. Line numbers are 1-based.
#[derive(Debug, thiserror::Error)]
pub enum DatError {
    #[error("line {line}: section \"{section}\" is being closed, but no section is open")]
    CloseWithoutOpen { line: usize, section: String },

    #[error("line {line}: section \"{open}\" is open, but section \"{closed}\" is being closed")]
    WrongSectionClosed {
        line: usize,
        open: String,
        closed: String,
    },

    #[error("line {line}: second root section found")]
    MultipleRootSections { line: usize },

    #[error("line {line}: attribute found outside of any section")]
    RootLevelAttribute { line: usize },

    #[error("no root section found")]
    MissingRootSection,

    #[error("line {line}: invalid attribute type \"{type_name}\"")]
    InvalidAttributeType { line: usize, type_name: String },

    #[error("line {line}: {message}")]
    MalformedAttribute { line: usize, message: String },

    #[error("section \"{section}\" not closed at end of file")]
    UnclosedSection { section: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Recoverable oddities the parser reports without aborting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatWarning {
    /// `[SECTION` without a closing bracket; the rest of the line was taken
    /// as the name.
    MissingBracket { line: usize },
    /// A close tag named a different section than the open one, and the
    /// parser was asked to tolerate it.
    WrongSectionClosed {
        line: usize,
        open: String,
        closed: String,
    },
}

impl fmt::Display for DatWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatWarning::MissingBracket { line } => {
                write!(
                    f,
                    "line {line}: missing closing ']' bracket at the end of section name"
                )
            }
            DatWarning::WrongSectionClosed { line, open, closed } => {
                write!(
                    f,
                    "line {line}: section \"{closed}\" is being closed but section \"{open}\" is open"
                )
            }
        }
    }
}
