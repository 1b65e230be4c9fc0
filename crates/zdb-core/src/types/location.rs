//! Source location type.

use std::fmt;

/// A (file, line) pair produced by the line-table resolver.
///
/// `file_index` indexes [`DebugData::source_files`](crate::DebugData::source_files).
/// Lines are one-based; the line program tracks them as signed deltas so the
/// value is kept signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation
{
    /// Index into the store's source file list.
    pub file_index: u32,
    /// One-based line number.
    pub line: i32,
}

impl SourceLocation
{
    #[must_use]
    pub const fn new(file_index: u32, line: i32) -> Self
    {
        Self { file_index, line }
    }
}

impl fmt::Display for SourceLocation
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "file #{}:{}", self.file_index, self.line)
    }
}
