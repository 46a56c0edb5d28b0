use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Location of a node as the child indices walked from the document root.
///
/// Paths are only meaningful for the tree version they were taken from; every
/// applied [`Operation`](crate::editing::Operation) rewrites tracked paths.
/// Ordering is lexicographic, which for paths that are not ancestors of each
/// other is document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// The empty path, addressing the document itself
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the node within its parent
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Next sibling. The root is its own next sibling.
    pub fn next(&self) -> Path {
        let mut indices = self.0.clone();
        if let Some(last) = indices.last_mut() {
            *last += 1;
        }
        Self(indices)
    }

    pub fn previous(&self) -> Option<Path> {
        let mut indices = self.0.clone();
        let last = indices.last_mut()?;
        *last = last.checked_sub(1)?;
        Some(Self(indices))
    }

    /// Strict ancestor test
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// True when `self` is `other` or one of its ancestors
    pub fn contains(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn is_sibling_of(&self, other: &Path) -> bool {
        !self.0.is_empty()
            && self.0.len() == other.0.len()
            && self.0[..self.0.len() - 1] == other.0[..other.0.len() - 1]
            && self.0 != other.0
    }

    /// True when `self` is an earlier sibling of `other` or of one of its ancestors.
    pub fn ends_before(&self, other: &Path) -> bool {
        let Some((&last, prefix)) = self.0.split_last() else {
            return false;
        };
        other.0.len() > prefix.len() && other.0.starts_with(prefix) && last < other.0[prefix.len()]
    }

    pub fn common_ancestor(&self, other: &Path) -> Path {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect();
        Self(shared)
    }

    /// Every strict ancestor, from the top-level block down to the parent.
    /// The root itself is not included.
    pub fn ancestors(&self) -> impl Iterator<Item = Path> + '_ {
        (1..self.0.len()).map(|len| Self(self.0[..len].to_vec()))
    }

    /// Path with the index at `depth` replaced
    pub(crate) fn with_index(&self, depth: usize, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices[depth] = index;
        Self(indices)
    }

    pub(crate) fn index_at(&self, depth: usize) -> Option<usize> {
        self.0.get(depth).copied()
    }

    pub(crate) fn truncated(&self, len: usize) -> Path {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    pub(crate) fn tail_from(&self, depth: usize) -> &[usize] {
        &self.0[depth.min(self.0.len())..]
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "[{}]", parts.join(","))
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

/// A caret position: a leaf plus a UTF-8 byte offset into its text.
///
/// Offsets always sit on a char boundary. Points order by path, then offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: impl Into<Path>, offset: usize) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.offset)
    }
}

/// Selection as typed by the user: `anchor` is where it started, `focus`
/// where it ends, so `focus` may come before `anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: Point,
    pub focus: Point,
}

impl Range {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    pub fn is_expanded(&self) -> bool {
        !self.is_collapsed()
    }

    pub fn is_backward(&self) -> bool {
        self.focus < self.anchor
    }

    /// `(start, end)` in document order, whatever direction the range was made in
    pub fn edges(&self) -> (&Point, &Point) {
        match self.anchor.cmp(&self.focus) {
            Ordering::Greater => (&self.focus, &self.anchor),
            _ => (&self.anchor, &self.focus),
        }
    }

    pub fn start(&self) -> &Point {
        self.edges().0
    }

    pub fn end(&self) -> &Point {
        self.edges().1
    }

    pub fn contains(&self, point: &Point) -> bool {
        let (start, end) = self.edges();
        start <= point && point <= end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.anchor, self.focus)
    }
}
