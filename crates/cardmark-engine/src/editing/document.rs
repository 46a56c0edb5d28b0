use serde_json::Value;

use crate::editing::anchors::{Anchor, AnchorId, AnchorSet};
use crate::editing::error::EditError;
use crate::editing::location::{Path, Point, Range};
use crate::editing::operation::Operation;
use crate::editing::patch::Patch;
use crate::editing::tree;
use crate::model::node::{Node, Text};
use crate::model::normalize::{nodes_from_value, normalize_document};

/// A card's rich-text document and everything that must move with it.
///
/// Document keeps three things consistent with each other:
///
/// ## 1. The tree
/// - **Top-level blocks**: a non-empty `Vec<Node>` satisfying the structural
///   invariants (lists hold list items, every element has children)
/// - **Loaded leniently**: trees from outside are normalized on construction
///
/// ## 2. The selection
/// - **Optional range**: `None` while the card is not focused
/// - **Rewritten on every operation**: when the node under a selection point
///   is removed, the selection collapses to the start of the following leaf,
///   or the end of the document
///
/// ## 3. Anchors
/// - **Tracked locations**: paths, points and ranges registered by callers
/// - **Deletion is observable**: an anchor whose node is removed reads as `None`
///
/// All changes flow through [`Document::apply`] as primitive [`Operation`]s.
/// An operation that would break an invariant is rejected, logged, and leaves
/// the document untouched.
///
/// ```rust
/// # use cardmark_engine::editing::{Document, Operation, Path, Point};
/// # use cardmark_engine::model::Node;
/// let mut doc = Document::new(vec![Node::paragraph(vec![Node::text("Hello")])]);
/// doc.select(Point::new([0, 0], 5)).unwrap();
///
/// doc.apply(Operation::InsertText {
///     path: Path::from([0, 0]),
///     offset: 5,
///     text: " world".to_string(),
/// })
/// .unwrap();
///
/// assert_eq!(doc.plain_text(), "Hello world");
/// assert_eq!(doc.selection().unwrap().focus, Point::new([0, 0], 11));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) children: Vec<Node>,
    pub(crate) selection: Option<Range>,
    /// Incremented on each committed operation
    pub(crate) version: u64,
    pub(crate) anchors: AnchorSet,
}

struct Snapshot {
    children: Vec<Node>,
    selection: Option<Range>,
    version: u64,
    anchors: AnchorSet,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            children: normalize_document(children),
            selection: None,
            version: 0,
            anchors: AnchorSet::default(),
        }
    }

    /// Build from untrusted JSON, substituting a default paragraph for anything unusable
    pub fn from_value(value: Value) -> Self {
        Self::new(nodes_from_value(value))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn node(&self, path: &Path) -> Option<&Node> {
        tree::node(&self.children, path)
    }

    pub fn leaf(&self, path: &Path) -> Option<&Text> {
        tree::leaf(&self.children, path)
    }

    /// Text of each block, one block per line
    pub fn plain_text(&self) -> String {
        self.children
            .iter()
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn selection(&self) -> Option<&Range> {
        self.selection.as_ref()
    }

    /// Replace the selection. Both points must address a leaf at a char boundary.
    pub fn set_selection(&mut self, selection: Option<Range>) -> Result<(), EditError> {
        if let Some(range) = &selection {
            for point in [&range.anchor, &range.focus] {
                if !tree::is_valid_point(&self.children, point) {
                    return Err(EditError::InvalidOffset(point.clone()));
                }
            }
        }
        self.selection = selection;
        Ok(())
    }

    pub fn select(&mut self, point: Point) -> Result<(), EditError> {
        self.set_selection(Some(Range::collapsed(point)))
    }

    pub fn deselect(&mut self) {
        self.selection = None;
    }

    /// The caret, when the selection is collapsed
    pub fn caret(&self) -> Option<&Point> {
        self.selection
            .as_ref()
            .filter(|range| range.is_collapsed())
            .map(|range| &range.focus)
    }

    /// Apply one primitive operation, then rewrite the selection and every anchor.
    pub fn apply(&mut self, op: Operation) -> Result<Patch, EditError> {
        if let Err(e) = op.apply_to(&mut self.children) {
            log::warn!("rejected {op:?}: {e}");
            return Err(e);
        }

        self.selection = match self.selection.take() {
            None => None,
            Some(range) => range
                .transform(&op)
                .or_else(|| tree::nearest_point_from(&self.children, op.path()).map(Range::collapsed)),
        };
        self.anchors.transform(&op);
        self.version += 1;

        Ok(Patch {
            changed: op.changed_path(),
            new_selection: self.selection.clone(),
            version: self.version,
        })
    }

    /// Run `f` against this document; if it fails, restore the tree, selection
    /// and anchors to their state before the call.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, EditError>) -> Result<T, EditError> {
        let snapshot = Snapshot {
            children: self.children.clone(),
            selection: self.selection.clone(),
            version: self.version,
            anchors: self.anchors.clone(),
        };
        let result = f(self);
        if result.is_err() {
            self.children = snapshot.children;
            self.selection = snapshot.selection;
            self.version = snapshot.version;
            self.anchors = snapshot.anchors;
        }
        result
    }

    pub fn track_path(&mut self, path: Path) -> AnchorId {
        self.anchors.track(Anchor::Path(path))
    }

    pub fn track_point(&mut self, point: Point) -> AnchorId {
        self.anchors.track(Anchor::Point(point))
    }

    pub fn track_range(&mut self, range: Range) -> AnchorId {
        self.anchors.track(Anchor::Range(range))
    }

    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor> {
        self.anchors.get(id)
    }

    pub fn is_anchor_deleted(&self, id: AnchorId) -> bool {
        self.anchors.is_deleted(id)
    }

    pub fn release_anchor(&mut self, id: AnchorId) -> Option<Anchor> {
        self.anchors.release(id)
    }

    /// Release a point anchor, returning where it ended up
    pub(crate) fn release_point(&mut self, id: AnchorId) -> Option<Point> {
        match self.anchors.release(id)? {
            Anchor::Point(point) => Some(point),
            _ => None,
        }
    }

    pub(crate) fn release_path(&mut self, id: AnchorId) -> Option<Path> {
        match self.anchors.release(id)? {
            Anchor::Path(path) => Some(path),
            _ => None,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::ElementKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn two_paragraphs() -> Document {
        Document::new(vec![
            Node::paragraph(vec![Node::text("first")]),
            Node::paragraph(vec![Node::text("second")]),
        ])
    }

    #[test]
    fn test_new_document_is_normalized() {
        let doc = Document::new(Vec::new());
        assert_eq!(doc.children(), &[Node::empty_paragraph()]);
        assert_eq!(doc.version(), 0);
        assert!(doc.selection().is_none());
    }

    #[test]
    fn test_from_value_substitutes_default_for_garbage() {
        let doc = Document::from_value(json!("nope"));
        assert_eq!(doc.children(), &[Node::empty_paragraph()]);
    }

    #[test]
    fn test_invalid_selection_is_refused() {
        let mut doc = two_paragraphs();
        assert!(doc.select(Point::new([0], 0)).is_err());
        assert!(doc.select(Point::new([0, 0], 99)).is_err());
        assert!(doc.select(Point::new([1, 0], 6)).is_ok());
    }

    #[test]
    fn test_rejected_operation_changes_nothing() {
        let mut doc = two_paragraphs();
        doc.select(Point::new([0, 0], 2)).unwrap();

        let result = doc.apply(Operation::RemoveNode {
            path: Path::from([0, 0]),
        });

        assert!(result.is_err());
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.plain_text(), "first\nsecond");
        assert_eq!(doc.caret(), Some(&Point::new([0, 0], 2)));
    }

    #[test]
    fn test_selection_in_removed_block_moves_to_following_leaf() {
        let mut doc = Document::new(vec![
            Node::paragraph(vec![Node::text("a")]),
            Node::paragraph(vec![Node::text("b")]),
            Node::paragraph(vec![Node::text("c")]),
        ]);
        doc.select(Point::new([1, 0], 1)).unwrap();

        let patch = doc.apply(Operation::RemoveNode { path: Path::from([1]) }).unwrap();

        assert_eq!(patch.new_selection, Some(Range::collapsed(Point::new([1, 0], 0))));
        assert_eq!(patch.version, 1);
    }

    #[test]
    fn test_selection_in_removed_last_block_moves_to_document_end() {
        let mut doc = two_paragraphs();
        doc.select(Point::new([1, 0], 3)).unwrap();

        doc.apply(Operation::RemoveNode { path: Path::from([1]) }).unwrap();

        assert_eq!(doc.caret(), Some(&Point::new([0, 0], 5)));
    }

    #[test]
    fn test_range_outside_edits_keeps_its_text() {
        let mut doc = two_paragraphs();
        let range = Range::new(Point::new([1, 0], 1), Point::new([1, 0], 4));
        let id = doc.track_range(range);

        doc.apply(Operation::InsertNode {
            path: Path::from([0]),
            node: Node::element(ElementKind::heading(1), vec![Node::text("title")]),
        })
        .unwrap();
        doc.apply(Operation::InsertText {
            path: Path::from([1, 0]),
            offset: 0,
            text: ">> ".to_string(),
        })
        .unwrap();

        let Some(Anchor::Range(moved)) = doc.anchor(id).cloned() else {
            panic!("range anchor lost");
        };
        let (start, end) = moved.edges();
        assert_eq!(tree::text_between(doc.children(), start, end), "eco");
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut doc = two_paragraphs();
        doc.select(Point::new([0, 0], 0)).unwrap();

        let result: Result<(), EditError> = doc.transaction(|doc| {
            doc.apply(Operation::InsertText {
                path: Path::from([0, 0]),
                offset: 0,
                text: "x".to_string(),
            })?;
            doc.apply(Operation::RemoveNode {
                path: Path::from([5]),
            })?;
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(doc.plain_text(), "first\nsecond");
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.caret(), Some(&Point::new([0, 0], 0)));
    }
}
