use crate::editing::location::{Path, Range};

/// Result of applying an operation
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Root of the subtree the operation touched
    pub changed: Path,
    pub new_selection: Option<Range>,
    pub version: u64,
}
