//! Validated asset filename.
//!
//! Upload filenames come from the client and may carry directories,
//! traversal segments or Windows separators. Only the final component is
//! kept, and names that cannot be a plain visible file are rejected.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Filename reduced to one safe path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SafeFileName(String);

/// Rejection reasons for client-supplied filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileNameError {
    /// Nothing left after stripping directories.
    Empty,
    /// Final component is `.` or `..`.
    Traversal,
    /// Final component starts with `.`; that namespace holds upload temporaries.
    Hidden(String),
    /// Contains a NUL byte.
    InvalidCharacter,
}

impl Display for FileNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "file name is empty"),
            Self::Traversal => write!(f, "file name is a directory traversal segment"),
            Self::Hidden(name) => write!(f, "hidden file name `{name}` is not accepted"),
            Self::InvalidCharacter => write!(f, "file name contains a NUL byte"),
        }
    }
}

impl Error for FileNameError {}

impl SafeFileName {
    /// Reduces `raw` to its final path component and validates it.
    ///
    /// Both `/` and `\` count as separators regardless of platform, so
    /// `..\\..\\boot.ini` and `../../etc/cat.png` both lose their directories.
    pub fn sanitize(raw: &str) -> Result<Self, FileNameError> {
        if raw.contains('\0') {
            return Err(FileNameError::InvalidCharacter);
        }

        let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
        match base {
            "" => Err(FileNameError::Empty),
            "." | ".." => Err(FileNameError::Traversal),
            hidden if hidden.starts_with('.') => Err(FileNameError::Hidden(hidden.to_string())),
            name => Ok(Self(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for SafeFileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for SafeFileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
