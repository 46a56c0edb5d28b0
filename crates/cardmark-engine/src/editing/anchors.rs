use crate::editing::location::{Path, Point, Range};
use crate::editing::operation::Operation;

/// Handle for a location registered with a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnchorId(pub u64);

/// A tracked location that survives edits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    Path(Path),
    Point(Point),
    Range(Range),
}

impl Anchor {
    fn transform(&self, op: &Operation) -> Option<Anchor> {
        match self {
            Anchor::Path(path) => path.transform(op).map(Anchor::Path),
            Anchor::Point(point) => point.transform(op).map(Anchor::Point),
            Anchor::Range(range) => range.transform(op).map(Anchor::Range),
        }
    }
}

/// Registered anchors. An anchor whose node was removed stays registered as
/// deleted until it is released, so callers can tell "gone" from "unknown".
#[derive(Debug, Clone, Default)]
pub struct AnchorSet {
    next_id: u64,
    entries: Vec<(AnchorId, Option<Anchor>)>,
}

impl AnchorSet {
    pub fn track(&mut self, anchor: Anchor) -> AnchorId {
        let id = AnchorId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Some(anchor)));
        id
    }

    /// Current location; `None` if the anchor was deleted or never existed
    pub fn get(&self, id: AnchorId) -> Option<&Anchor> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .and_then(|(_, anchor)| anchor.as_ref())
    }

    pub fn is_deleted(&self, id: AnchorId) -> bool {
        self.entries
            .iter()
            .any(|(entry_id, anchor)| *entry_id == id && anchor.is_none())
    }

    /// Stop tracking, returning the final location
    pub fn release(&mut self, id: AnchorId) -> Option<Anchor> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        self.entries.remove(index).1
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn transform(&mut self, op: &Operation) {
        for (id, entry) in &mut self.entries {
            if let Some(anchor) = entry {
                let moved = anchor.transform(op);
                if moved.is_none() {
                    log::debug!("anchor {} deleted by {:?}", id.0, op.path());
                }
                *entry = moved;
            }
        }
    }
}
