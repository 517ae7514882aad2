//! Checks applied to the untrusted `file` parameter before any filesystem access.

use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeError {
    #[error("Filename is required")]
    Missing,

    #[error("Invalid filename")]
    Invalid,
}

/// A file name proven to be a single bare path component.
///
/// Only [`sanitize_file_name`] constructs it, so joining one onto a directory
/// always yields a direct child of that directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportName<'a>(&'a str);

impl<'a> ExportName<'a> {
    pub fn as_str(&self) -> &'a str {
        self.0
    }
}

impl AsRef<Path> for ExportName<'_> {
    fn as_ref(&self) -> &Path {
        Path::new(self.0)
    }
}

impl fmt::Display for ExportName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Accepts the requested name only when it equals its own basename.
///
/// Backslashes and control characters (NUL included) are refused on every
/// platform, even where the OS would not treat them as separators.
pub fn sanitize_file_name(requested: Option<&str>) -> Result<ExportName<'_>, SanitizeError> {
    let name = match requested {
        Some(name) if !name.is_empty() => name,
        _ => return Err(SanitizeError::Missing),
    };

    if name.contains('\\') || name.chars().any(char::is_control) {
        return Err(SanitizeError::Invalid);
    }

    match basename(name) {
        Some(base) if base == name => Ok(ExportName(name)),
        _ => Err(SanitizeError::Invalid),
    }
}

/// Last path component of `name`, or `None` for `.`, `..` and bare roots.
pub fn basename(name: &str) -> Option<&str> {
    Path::new(name).file_name().and_then(|base| base.to_str())
}
