pub mod autoformat;
pub mod editing;
pub mod io;
pub mod markdown;
pub mod model;
pub mod session;

// Re-export key types for easier usage
pub use autoformat::{InputContext, InputEvent, Pipeline};
pub use editing::{Document, EditError, Path, Point, Range};
pub use markdown::{document_to_markdown, markdown_to_document};
pub use model::*;
pub use session::{ContentObserver, EditorSession, FormatSnapshot, KeyChord, SessionRegistry};
