use crate::editing::error::EditError;
use crate::editing::location::{Path, Point, Range};
use crate::editing::tree;
use crate::model::node::{Align, Element, ElementKind, MarkChange, Node};

/// Partial update of a node's own properties. Element fields are rejected on
/// leaves and mark changes are rejected on elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeProperties {
    pub kind: Option<ElementKind>,
    /// `Some(None)` clears the alignment
    pub align: Option<Option<Align>>,
    pub marks: Vec<MarkChange>,
}

impl NodeProperties {
    pub fn kind(kind: ElementKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn align(align: Option<Align>) -> Self {
        Self {
            align: Some(align),
            ..Self::default()
        }
    }

    pub fn mark(change: MarkChange) -> Self {
        Self {
            marks: vec![change],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.align.is_none() && self.marks.is_empty()
    }

    fn apply_to(&self, node: &mut Node, path: &Path) -> Result<(), EditError> {
        match node {
            Node::Element(element) => {
                if !self.marks.is_empty() {
                    return Err(EditError::InvalidProperty(path.clone()));
                }
                if let Some(kind) = &self.kind {
                    element.kind = kind.clone();
                }
                if let Some(align) = self.align {
                    element.align = align;
                }
            }
            Node::Text(text) => {
                if self.kind.is_some() || self.align.is_some() {
                    return Err(EditError::InvalidProperty(path.clone()));
                }
                for change in &self.marks {
                    text.marks.apply(change);
                }
            }
        }
        Ok(())
    }
}

/// Primitive tree edits. Everything the editor does is a sequence of these,
/// and each one carries enough information to rewrite tracked locations.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    InsertText {
        path: Path,
        offset: usize,
        text: String,
    },
    RemoveText {
        path: Path,
        offset: usize,
        text: String,
    },
    InsertNode {
        path: Path,
        node: Node,
    },
    RemoveNode {
        path: Path,
    },
    /// Split the node at `path`: bytes (leaf) or children (element) from
    /// `position` onward move into a new next sibling which copies the node's
    /// properties, then has `properties` applied.
    SplitNode {
        path: Path,
        position: usize,
        properties: NodeProperties,
    },
    /// Append the node at `path` to its previous sibling. `position` is the
    /// previous sibling's length before the merge.
    MergeNode {
        path: Path,
        position: usize,
    },
    /// Move `count` siblings starting at `path` into a new element of `wrapper` kind
    WrapNode {
        path: Path,
        count: usize,
        wrapper: ElementKind,
    },
    /// Replace the element at `path` with its `count` children
    UnwrapNode {
        path: Path,
        count: usize,
    },
    SetNode {
        path: Path,
        properties: NodeProperties,
    },
}

impl Operation {
    pub fn path(&self) -> &Path {
        match self {
            Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::InsertNode { path, .. }
            | Operation::RemoveNode { path }
            | Operation::SplitNode { path, .. }
            | Operation::MergeNode { path, .. }
            | Operation::WrapNode { path, .. }
            | Operation::UnwrapNode { path, .. }
            | Operation::SetNode { path, .. } => path,
        }
    }

    /// Root of the subtree this operation touches
    pub fn changed_path(&self) -> Path {
        match self {
            Operation::InsertText { path, .. }
            | Operation::RemoveText { path, .. }
            | Operation::SetNode { path, .. } => path.clone(),
            _ => self.path().parent().unwrap_or_default(),
        }
    }

    /// Validate against `root`, then mutate it. On error `root` is untouched.
    pub(crate) fn apply_to(&self, root: &mut Vec<Node>) -> Result<(), EditError> {
        match self {
            Operation::InsertText { path, offset, text } => {
                let leaf = leaf_mut(root, path)?;
                if !leaf.text.is_char_boundary(*offset) {
                    return Err(EditError::InvalidOffset(Point::new(path.clone(), *offset)));
                }
                leaf.text.insert_str(*offset, text);
            }
            Operation::RemoveText { path, offset, text } => {
                let leaf = leaf_mut(root, path)?;
                let end = offset + text.len();
                if leaf.text.get(*offset..end) != Some(text.as_str()) {
                    return Err(EditError::TextMismatch(path.clone()));
                }
                leaf.text.replace_range(*offset..end, "");
            }
            Operation::InsertNode { path, node } => {
                let (parent, index) = split_path(path)?;
                let siblings = siblings_mut(root, &parent, path)?;
                if index > siblings.len() {
                    return Err(EditError::InvalidPath(path.clone()));
                }
                if let Node::Element(element) = node
                    && has_empty_element(element)
                {
                    return Err(EditError::EmptyElement(path.clone()));
                }
                siblings.insert(index, node.clone());
            }
            Operation::RemoveNode { path } => {
                let (parent, index) = split_path(path)?;
                let siblings = siblings_mut(root, &parent, path)?;
                if index >= siblings.len() {
                    return Err(EditError::InvalidPath(path.clone()));
                }
                if siblings.len() == 1 {
                    return Err(EditError::EmptyElement(parent));
                }
                siblings.remove(index);
            }
            Operation::SplitNode {
                path,
                position,
                properties,
            } => {
                let (parent, index) = split_path(path)?;
                let siblings = siblings_mut(root, &parent, path)?;
                let target = siblings
                    .get_mut(index)
                    .ok_or_else(|| EditError::InvalidPath(path.clone()))?;
                let mut second = match target {
                    Node::Text(text) => {
                        if *position > text.text.len() || !text.text.is_char_boundary(*position) {
                            return Err(EditError::InvalidOffset(Point::new(path.clone(), *position)));
                        }
                        let mut second = text.clone();
                        second.text = text.text[*position..].to_string();
                        Node::Text(second)
                    }
                    Node::Element(element) => {
                        if *position == 0 || *position >= element.children.len() {
                            return Err(EditError::EmptyElement(path.clone()));
                        }
                        Node::Element(Element {
                            kind: element.kind.clone(),
                            align: element.align,
                            children: Vec::new(),
                        })
                    }
                };
                properties.apply_to(&mut second, &path.next())?;
                match (target, &mut second) {
                    (Node::Text(first), Node::Text(_)) => first.text.truncate(*position),
                    (Node::Element(first), Node::Element(second)) => {
                        second.children = first.children.split_off(*position);
                    }
                    _ => unreachable!("split halves share a shape"),
                }
                siblings.insert(index + 1, second);
            }
            Operation::MergeNode { path, position } => {
                let (parent, index) = split_path(path)?;
                let siblings = siblings_mut(root, &parent, path)?;
                if index == 0 || index >= siblings.len() {
                    return Err(EditError::InvalidPath(path.clone()));
                }
                if siblings[index - 1].len() != *position {
                    return Err(EditError::PositionMismatch {
                        path: path.clone(),
                        position: *position,
                    });
                }
                match (&siblings[index - 1], &siblings[index]) {
                    (Node::Text(_), Node::Text(_)) | (Node::Element(_), Node::Element(_)) => {}
                    _ => return Err(EditError::MergeMismatch(path.clone())),
                }
                let merged = siblings.remove(index);
                match (&mut siblings[index - 1], merged) {
                    (Node::Text(previous), Node::Text(text)) => previous.text.push_str(&text.text),
                    (Node::Element(previous), Node::Element(element)) => {
                        previous.children.extend(element.children);
                    }
                    _ => unreachable!("shapes checked above"),
                }
            }
            Operation::WrapNode {
                path,
                count,
                wrapper,
            } => {
                let (parent, index) = split_path(path)?;
                let siblings = siblings_mut(root, &parent, path)?;
                if *count == 0 || index + count > siblings.len() {
                    return Err(EditError::InvalidPath(path.clone()));
                }
                let wrapped: Vec<Node> = siblings.drain(index..index + count).collect();
                siblings.insert(index, Node::element(wrapper.clone(), wrapped));
            }
            Operation::UnwrapNode { path, count } => {
                let (parent, index) = split_path(path)?;
                let siblings = siblings_mut(root, &parent, path)?;
                match siblings.get(index) {
                    Some(Node::Element(element)) if element.children.len() == *count => {}
                    Some(Node::Element(_)) => {
                        return Err(EditError::PositionMismatch {
                            path: path.clone(),
                            position: *count,
                        });
                    }
                    Some(Node::Text(_)) => return Err(EditError::NotElement(path.clone())),
                    None => return Err(EditError::InvalidPath(path.clone())),
                }
                if let Node::Element(element) = siblings.remove(index) {
                    for (offset, child) in element.children.into_iter().enumerate() {
                        siblings.insert(index + offset, child);
                    }
                }
            }
            Operation::SetNode { path, properties } => {
                let target = tree::node_mut(root, path).ok_or_else(|| EditError::InvalidPath(path.clone()))?;
                let mut updated = target.clone();
                properties.apply_to(&mut updated, path)?;
                *target = updated;
            }
        }
        Ok(())
    }
}

fn split_path(path: &Path) -> Result<(Path, usize), EditError> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(index)) => Ok((parent, index)),
        _ => Err(EditError::InvalidPath(path.clone())),
    }
}

fn siblings_mut<'a>(root: &'a mut Vec<Node>, parent: &Path, path: &Path) -> Result<&'a mut Vec<Node>, EditError> {
    tree::children_mut(root, parent).ok_or_else(|| EditError::InvalidPath(path.clone()))
}

fn leaf_mut<'a>(root: &'a mut [Node], path: &Path) -> Result<&'a mut crate::model::node::Text, EditError> {
    match tree::node_mut(root, path) {
        Some(Node::Text(text)) => Ok(text),
        Some(Node::Element(_)) => Err(EditError::NotText(path.clone())),
        None => Err(EditError::InvalidPath(path.clone())),
    }
}

fn has_empty_element(element: &Element) -> bool {
    element.children.is_empty()
        || element
            .children
            .iter()
            .filter_map(Node::as_element)
            .any(has_empty_element)
}

impl Path {
    /// Rewrite this path so it points at the same node after `op`.
    /// Returns `None` when the node no longer exists.
    pub fn transform(&self, op: &Operation) -> Option<Path> {
        let p = self;
        if p.is_empty() {
            return Some(p.clone());
        }
        match op {
            Operation::InsertText { .. } | Operation::RemoveText { .. } | Operation::SetNode { .. } => {
                Some(p.clone())
            }
            Operation::InsertNode { path, .. } => {
                if path == p || path.ends_before(p) || path.is_ancestor_of(p) {
                    let depth = path.len() - 1;
                    Some(p.with_index(depth, p.index_at(depth)? + 1))
                } else {
                    Some(p.clone())
                }
            }
            Operation::RemoveNode { path } => {
                if path.contains(p) {
                    None
                } else if path.ends_before(p) {
                    let depth = path.len() - 1;
                    Some(p.with_index(depth, p.index_at(depth)? - 1))
                } else {
                    Some(p.clone())
                }
            }
            Operation::MergeNode { path, position } => {
                let depth = path.len() - 1;
                if path == p || path.ends_before(p) {
                    Some(p.with_index(depth, p.index_at(depth)?.checked_sub(1)?))
                } else if path.is_ancestor_of(p) {
                    let moved = p.with_index(depth, p.index_at(depth)?.checked_sub(1)?);
                    Some(moved.with_index(depth + 1, p.index_at(depth + 1)? + position))
                } else {
                    Some(p.clone())
                }
            }
            Operation::SplitNode { path, position, .. } => {
                let depth = path.len() - 1;
                if path.ends_before(p) {
                    Some(p.with_index(depth, p.index_at(depth)? + 1))
                } else if path.is_ancestor_of(p) && p.index_at(depth + 1)? >= *position {
                    let moved = p.with_index(depth, p.index_at(depth)? + 1);
                    Some(moved.with_index(depth + 1, p.index_at(depth + 1)? - position))
                } else {
                    Some(p.clone())
                }
            }
            Operation::WrapNode { path, count, .. } => {
                let depth = path.len() - 1;
                let parent = path.truncated(depth);
                let first = path.index_at(depth)?;
                if p.len() <= depth || !parent.is_ancestor_of(p) {
                    return Some(p.clone());
                }
                let index = p.index_at(depth)?;
                if index >= first && index < first + count {
                    let mut indices = parent.as_slice().to_vec();
                    indices.push(first);
                    indices.push(index - first);
                    indices.extend_from_slice(p.tail_from(depth + 1));
                    Some(Path::new(indices))
                } else if index >= first + count {
                    Some(p.with_index(depth, index - (count - 1)))
                } else {
                    Some(p.clone())
                }
            }
            Operation::UnwrapNode { path, count } => {
                let depth = path.len() - 1;
                let index = path.index_at(depth)?;
                if path == p {
                    None
                } else if path.is_ancestor_of(p) {
                    let mut indices = path.truncated(depth).as_slice().to_vec();
                    indices.push(index + p.index_at(depth + 1)?);
                    indices.extend_from_slice(p.tail_from(depth + 2));
                    Some(Path::new(indices))
                } else if path.ends_before(p) {
                    Some(p.with_index(depth, p.index_at(depth)? + count - 1))
                } else {
                    Some(p.clone())
                }
            }
        }
    }
}

impl Point {
    /// Rewrite this point through `op`. Text inserted exactly at the point
    /// pushes it forward, and a split at the point carries it into the new node.
    pub fn transform(&self, op: &Operation) -> Option<Point> {
        let mut point = self.clone();
        match op {
            Operation::InsertText { path, offset, text } if path == &point.path => {
                if *offset <= point.offset {
                    point.offset += text.len();
                }
            }
            Operation::RemoveText { path, offset, text } if path == &point.path => {
                if *offset <= point.offset {
                    point.offset -= (point.offset - offset).min(text.len());
                }
            }
            Operation::MergeNode { path, position } if path == &point.path => {
                point.offset += position;
                point.path = point.path.transform(op)?;
            }
            Operation::SplitNode { path, position, .. } if path == &point.path => {
                if *position <= point.offset {
                    point.offset -= position;
                    point.path = point.path.next();
                }
            }
            _ => point.path = point.path.transform(op)?,
        }
        Some(point)
    }
}

impl Range {
    pub fn transform(&self, op: &Operation) -> Option<Range> {
        Some(Range::new(self.anchor.transform(op)?, self.focus.transform(op)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::ElementType;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn doc() -> Vec<Node> {
        vec![
            Node::paragraph(vec![Node::text("hello"), Node::text(" world")]),
            Node::paragraph(vec![Node::text("second")]),
        ]
    }

    #[test]
    fn test_remove_last_child_is_rejected() {
        let mut root = doc();
        let op = Operation::RemoveNode {
            path: Path::from([1, 0]),
        };
        assert_eq!(op.apply_to(&mut root), Err(EditError::EmptyElement(Path::from([1]))));
        assert_eq!(root, doc());
    }

    #[test]
    fn test_insert_text_off_char_boundary_is_rejected() {
        let mut root = vec![Node::paragraph(vec![Node::text("é")])];
        let op = Operation::InsertText {
            path: Path::from([0, 0]),
            offset: 1,
            text: "x".to_string(),
        };
        assert!(matches!(op.apply_to(&mut root), Err(EditError::InvalidOffset(_))));
    }

    #[test]
    fn test_split_element_copies_kind_and_applies_overrides() {
        let mut root = vec![Node::element(
            ElementKind::heading(1),
            vec![Node::text("a"), Node::text("b")],
        )];
        Operation::SplitNode {
            path: Path::from([0]),
            position: 1,
            properties: NodeProperties::kind(ElementKind::Paragraph),
        }
        .apply_to(&mut root)
        .unwrap();

        assert_eq!(root[0].element_type(), Some(ElementType::Heading));
        assert_eq!(root[1].element_type(), Some(ElementType::Paragraph));
        assert_eq!(root[1].text_content(), "b");
    }

    #[test]
    fn test_split_element_at_edge_is_rejected() {
        let mut root = doc();
        let op = Operation::SplitNode {
            path: Path::from([1]),
            position: 1,
            properties: NodeProperties::default(),
        };
        assert!(op.apply_to(&mut root).is_err());
    }

    #[test]
    fn test_merge_text_into_element_is_rejected() {
        let mut root = vec![Node::paragraph(vec![
            Node::text("a"),
            Node::element(ElementKind::boxed(None, None), vec![Node::text("b")]),
        ])];
        let op = Operation::MergeNode {
            path: Path::from([0, 1]),
            position: 1,
        };
        assert_eq!(op.apply_to(&mut root), Err(EditError::MergeMismatch(Path::from([0, 1]))));
    }

    #[test]
    fn test_wrap_and_unwrap_are_inverse() {
        let mut root = doc();
        let wrap = Operation::WrapNode {
            path: Path::from([0]),
            count: 2,
            wrapper: ElementKind::BulletedList,
        };
        wrap.apply_to(&mut root).unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].children().len(), 2);

        Operation::UnwrapNode {
            path: Path::from([0]),
            count: 2,
        }
        .apply_to(&mut root)
        .unwrap();
        assert_eq!(root, doc());
    }

    #[rstest]
    #[case::insert_before(Operation::InsertNode { path: Path::from([0]), node: Node::empty_paragraph() }, Some(vec![2, 0]))]
    #[case::insert_after(Operation::InsertNode { path: Path::from([2]), node: Node::empty_paragraph() }, Some(vec![1, 0]))]
    #[case::remove_before(Operation::RemoveNode { path: Path::from([0]) }, Some(vec![0, 0]))]
    #[case::remove_ancestor(Operation::RemoveNode { path: Path::from([1]) }, None)]
    #[case::merge_into_previous(Operation::MergeNode { path: Path::from([1]), position: 3 }, Some(vec![0, 3]))]
    #[case::split_before(Operation::SplitNode { path: Path::from([0]), position: 1, properties: NodeProperties::default() }, Some(vec![2, 0]))]
    #[case::wrap_into(Operation::WrapNode { path: Path::from([0]), count: 2, wrapper: ElementKind::BulletedList }, Some(vec![0, 1, 0]))]
    #[case::unwrap_parent(Operation::UnwrapNode { path: Path::from([1]), count: 1 }, Some(vec![1]))]
    fn test_path_transform(#[case] op: Operation, #[case] expected: Option<Vec<usize>>) {
        let path = Path::from([1, 0]);
        assert_eq!(path.transform(&op), expected.map(Path::new));
    }

    #[test]
    fn test_split_ancestor_moves_trailing_children() {
        let op = Operation::SplitNode {
            path: Path::from([0]),
            position: 2,
            properties: NodeProperties::default(),
        };
        assert_eq!(Path::from([0, 3]).transform(&op), Some(Path::from([1, 1])));
        assert_eq!(Path::from([0, 1]).transform(&op), Some(Path::from([0, 1])));
    }

    #[test]
    fn test_unwrap_shifts_later_siblings_by_child_count() {
        let op = Operation::UnwrapNode {
            path: Path::from([0]),
            count: 3,
        };
        assert_eq!(Path::from([2]).transform(&op), Some(Path::from([4])));
        assert_eq!(Path::from([0, 2, 1]).transform(&op), Some(Path::from([2, 1])));
        assert_eq!(Path::from([0]).transform(&op), None);
    }

    #[test]
    fn test_point_follows_text_edits() {
        let point = Point::new([0, 0], 3);
        let insert = Operation::InsertText {
            path: Path::from([0, 0]),
            offset: 3,
            text: "xy".to_string(),
        };
        assert_eq!(point.transform(&insert), Some(Point::new([0, 0], 5)));

        let remove = Operation::RemoveText {
            path: Path::from([0, 0]),
            offset: 1,
            text: "abcd".to_string(),
        };
        assert_eq!(point.transform(&remove), Some(Point::new([0, 0], 1)));
    }

    #[test]
    fn test_point_moves_into_split_and_back_on_merge() {
        let point = Point::new([0, 0], 4);
        let split = Operation::SplitNode {
            path: Path::from([0, 0]),
            position: 2,
            properties: NodeProperties::default(),
        };
        let split_point = point.transform(&split).unwrap();
        assert_eq!(split_point, Point::new([0, 1], 2));

        let merge = Operation::MergeNode {
            path: Path::from([0, 1]),
            position: 2,
        };
        assert_eq!(split_point.transform(&merge), Some(point));
    }
}
