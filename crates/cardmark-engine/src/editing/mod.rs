/*!
 * # Editing Core Module
 *
 * The mutation engine behind every card editor.
 *
 * ## Architecture Overview
 *
 * ### 1. Tree of Nodes
 * - A document is a non-empty list of block elements (see [`crate::model::node`])
 * - Locations are **Paths** (child indices), **Points** (leaf + byte offset) and **Ranges**
 *
 * ### 2. Primitive Operations
 * - Every change is an [`Operation`]: insert/remove text, insert/remove node,
 *   split, merge, wrap, unwrap, set properties
 * - Operations are validated before they touch the tree; invalid ones are
 *   rejected with an [`EditError`] and logged
 *
 * ### 3. Location Transforms
 * - After each operation the selection and every registered **Anchor** is
 *   rewritten so it still points at the same logical place
 * - Anchors whose node disappears read as deleted
 *
 * ### 4. Commands
 * - `transforms` builds editor commands (delete a range, split a block,
 *   wrap items in a list, set marks, paste a fragment) from primitives
 * - `movement` steps the caret by grapheme, word or line
 * - [`Document::transaction`] rolls a failed command back as a unit
 *
 * ## Module Structure
 *
 * - **`location`**: `Path`, `Point`, `Range`
 * - **`tree`**: read-only navigation helpers
 * - **`operation`**: `Operation` and the transform rules
 * - **`document`**: `Document` with selection, anchors and transactions
 * - **`anchors`**: tracked locations
 * - **`transforms`**, **`movement`**: editing commands
 * - **`patch`**: result of applying an operation
 */

pub mod anchors;
pub mod document;
pub mod error;
pub mod location;
pub mod movement;
pub mod operation;
pub mod patch;
pub mod transforms;
pub mod tree;

pub use anchors::{Anchor, AnchorId};
pub use document::Document;
pub use error::EditError;
pub use location::{Path, Point, Range};
pub use movement::{Movement, Unit};
pub use operation::{NodeProperties, Operation};
pub use patch::Patch;
