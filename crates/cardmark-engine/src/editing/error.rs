use crate::editing::location::{Path, Point};

/// Why an operation or editing command was refused. A refused operation
/// leaves the document exactly as it was.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("no node at path {0}")]
    InvalidPath(Path),
    #[error("node at {0} is not a text leaf")]
    NotText(Path),
    #[error("node at {0} is not an element")]
    NotElement(Path),
    #[error("offset is outside the leaf or not on a char boundary: {0}")]
    InvalidOffset(Point),
    #[error("operation would leave the element at {0} without children")]
    EmptyElement(Path),
    #[error("cannot merge {0} into a previous sibling of a different shape")]
    MergeMismatch(Path),
    #[error("position {position} does not match node at {path}")]
    PositionMismatch { path: Path, position: usize },
    #[error("removed text does not match the leaf at {0}")]
    TextMismatch(Path),
    #[error("property does not apply to the node at {0}")]
    InvalidProperty(Path),
    #[error("the document has no selection")]
    NoSelection,
    #[error("{0}")]
    Unsupported(String),
}
