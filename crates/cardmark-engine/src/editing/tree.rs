//! Read-only navigation over a document's top-level blocks.

use crate::editing::location::{Path, Point, Range};
use crate::model::node::{Element, ElementType, Node, Text};

pub fn node<'a>(root: &'a [Node], path: &Path) -> Option<&'a Node> {
    let (first, rest) = path.as_slice().split_first()?;
    let mut current = root.get(*first)?;
    for index in rest {
        current = current.children().get(*index)?;
    }
    Some(current)
}

pub fn node_mut<'a>(root: &'a mut [Node], path: &Path) -> Option<&'a mut Node> {
    let (first, rest) = path.as_slice().split_first()?;
    let mut current = root.get_mut(*first)?;
    for index in rest {
        current = current.as_element_mut()?.children.get_mut(*index)?;
    }
    Some(current)
}

pub fn element<'a>(root: &'a [Node], path: &Path) -> Option<&'a Element> {
    node(root, path)?.as_element()
}

pub fn leaf<'a>(root: &'a [Node], path: &Path) -> Option<&'a Text> {
    node(root, path)?.as_text()
}

/// Children of the node at `path`; the empty path yields the top-level blocks.
pub fn children<'a>(root: &'a [Node], path: &Path) -> Option<&'a [Node]> {
    if path.is_empty() {
        return Some(root);
    }
    match node(root, path)? {
        Node::Element(element) => Some(&element.children),
        Node::Text(_) => None,
    }
}

pub fn children_mut<'a>(root: &'a mut Vec<Node>, path: &Path) -> Option<&'a mut Vec<Node>> {
    if path.is_empty() {
        return Some(root);
    }
    match node_mut(root, path)? {
        Node::Element(element) => Some(&mut element.children),
        Node::Text(_) => None,
    }
}

/// Elements whose children are inline content: everything but lists and boxes
pub fn is_text_block(element: &Element) -> bool {
    !element.is_list() && !element.is_inline()
}

/// Every leaf under `root`, in document order.
pub fn leaves(root: &[Node]) -> Vec<(Path, &Text)> {
    let mut out = Vec::new();
    for (index, node) in root.iter().enumerate() {
        collect_leaves(node, Path::new(vec![index]), &mut out);
    }
    out
}

/// Every leaf under the node at `path`, in document order.
pub fn leaves_under<'a>(root: &'a [Node], path: &Path) -> Vec<(Path, &'a Text)> {
    let mut out = Vec::new();
    if let Some(node) = node(root, path) {
        collect_leaves(node, path.clone(), &mut out);
    }
    out
}

fn collect_leaves<'a>(node: &'a Node, path: Path, out: &mut Vec<(Path, &'a Text)>) {
    match node {
        Node::Text(text) => out.push((path, text)),
        Node::Element(element) => {
            for (index, child) in element.children.iter().enumerate() {
                collect_leaves(child, path.child(index), out);
            }
        }
    }
}

/// Paths of every text block in document order
pub fn text_blocks(root: &[Node]) -> Vec<Path> {
    let mut out = Vec::new();
    for (index, node) in root.iter().enumerate() {
        collect_text_blocks(node, Path::new(vec![index]), &mut out);
    }
    out
}

fn collect_text_blocks(node: &Node, path: Path, out: &mut Vec<Path>) {
    let Node::Element(element) = node else {
        return;
    };
    if is_text_block(element) {
        out.push(path);
    } else if element.is_list() {
        for (index, child) in element.children.iter().enumerate() {
            collect_text_blocks(child, path.child(index), out);
        }
    }
}

/// Every node path whose subtree overlaps `range`, in pre-order.
pub fn paths_in_range(root: &[Node], range: &Range) -> Vec<Path> {
    let (start, end) = range.edges();
    let mut out = Vec::new();
    for (index, node) in root.iter().enumerate() {
        collect_in_range(node, Path::new(vec![index]), &start.path, &end.path, &mut out);
    }
    out
}

fn collect_in_range(node: &Node, path: Path, start: &Path, end: &Path, out: &mut Vec<Path>) {
    let overlaps = path.contains(start) || path.contains(end) || (&path > start && &path < end);
    if !overlaps {
        return;
    }
    out.push(path.clone());
    for (index, child) in node.children().iter().enumerate() {
        collect_in_range(child, path.child(index), start, end, out);
    }
}

/// Lowest ancestor (or the node itself) matching `predicate`.
pub fn above<'a>(
    root: &'a [Node],
    path: &Path,
    predicate: impl Fn(&Element) -> bool,
) -> Option<(Path, &'a Element)> {
    let mut current = Some(path.clone());
    while let Some(candidate) = current {
        if candidate.is_empty() {
            break;
        }
        if let Some(element) = element(root, &candidate)
            && predicate(element)
        {
            return Some((candidate, element));
        }
        current = candidate.parent();
    }
    None
}

/// The text block holding the node at `path`
pub fn block_above<'a>(root: &'a [Node], path: &Path) -> Option<(Path, &'a Element)> {
    above(root, path, is_text_block)
}

pub fn box_above<'a>(root: &'a [Node], path: &Path) -> Option<(Path, &'a Element)> {
    above(root, path, Element::is_inline)
}

pub fn type_above<'a>(root: &'a [Node], path: &Path, kind: ElementType) -> Option<(Path, &'a Element)> {
    above(root, path, |element| element.element_type() == kind)
}

pub fn first_leaf(root: &[Node], path: &Path) -> Option<Path> {
    let mut current = path.clone();
    loop {
        match node(root, &current)? {
            Node::Text(_) => return Some(current),
            Node::Element(_) => current = current.child(0),
        }
    }
}

pub fn last_leaf(root: &[Node], path: &Path) -> Option<Path> {
    let mut current = path.clone();
    loop {
        match node(root, &current)? {
            Node::Text(_) => return Some(current),
            Node::Element(element) => {
                current = current.child(element.children.len().checked_sub(1)?);
            }
        }
    }
}

pub fn start_point(root: &[Node], path: &Path) -> Option<Point> {
    Some(Point::new(first_leaf(root, path)?, 0))
}

pub fn end_point(root: &[Node], path: &Path) -> Option<Point> {
    let leaf_path = last_leaf(root, path)?;
    let offset = leaf(root, &leaf_path)?.text.len();
    Some(Point::new(leaf_path, offset))
}

pub fn document_start(root: &[Node]) -> Option<Point> {
    leaves(root).first().map(|(path, _)| Point::new(path.clone(), 0))
}

pub fn document_end(root: &[Node]) -> Option<Point> {
    leaves(root)
        .last()
        .map(|(path, text)| Point::new(path.clone(), text.text.len()))
}

/// Start of the first leaf at or after `path` in document order, falling back
/// to the end of the last leaf. Used to re-home a selection whose node was removed.
pub fn nearest_point_from(root: &[Node], path: &Path) -> Option<Point> {
    let all = leaves(root);
    if let Some((found, _)) = all.iter().find(|(leaf_path, _)| leaf_path >= path) {
        return Some(Point::new(found.clone(), 0));
    }
    all.last()
        .map(|(leaf_path, text)| Point::new(leaf_path.clone(), text.text.len()))
}

/// Point is on a leaf and the offset is a char boundary inside it
pub fn is_valid_point(root: &[Node], point: &Point) -> bool {
    leaf(root, &point.path).is_some_and(|text| text.text.is_char_boundary(point.offset))
}

pub fn is_start(root: &[Node], point: &Point, path: &Path) -> bool {
    start_point(root, path).as_ref() == Some(point)
}

pub fn is_end(root: &[Node], point: &Point, path: &Path) -> bool {
    end_point(root, path).as_ref() == Some(point)
}

pub fn is_edge(root: &[Node], point: &Point, path: &Path) -> bool {
    is_start(root, point, path) || is_end(root, point, path)
}

/// Text of the leaves between two points, concatenated without separators
pub fn text_between(root: &[Node], start: &Point, end: &Point) -> String {
    let mut out = String::new();
    for (path, text) in leaves(root) {
        if path < start.path || path > end.path {
            continue;
        }
        let from = if path == start.path { start.offset } else { 0 };
        let to = if path == end.path { end.offset } else { text.text.len() };
        if let Some(slice) = text.text.get(from..to.max(from)) {
            out.push_str(slice);
        }
    }
    out
}

/// Byte offset of `point` within the concatenated text of the block at `block`
pub fn block_offset(root: &[Node], block: &Path, point: &Point) -> Option<usize> {
    let mut offset = 0;
    for (path, text) in leaves_under(root, block) {
        if path == point.path {
            return Some(offset + point.offset);
        }
        offset += text.text.len();
    }
    None
}

/// Inverse of [`block_offset`]. A boundary between two leaves resolves to the
/// end of the earlier leaf.
pub fn point_at_block_offset(root: &[Node], block: &Path, offset: usize) -> Option<Point> {
    let leaves = leaves_under(root, block);
    let mut consumed = 0;
    for (path, text) in &leaves {
        let len = text.text.len();
        if offset <= consumed + len {
            return Some(Point::new(path.clone(), offset - consumed));
        }
        consumed += len;
    }
    leaves
        .last()
        .map(|(path, text)| Point::new(path.clone(), text.text.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::ElementKind;
    use pretty_assertions::assert_eq;

    fn sample() -> Vec<Node> {
        vec![
            Node::paragraph(vec![
                Node::text("ab"),
                Node::element(ElementKind::boxed(None, None), vec![Node::text("cd")]),
                Node::text("ef"),
            ]),
            Node::element(
                ElementKind::BulletedList,
                vec![
                    Node::element(ElementKind::ListItem, vec![Node::text("one")]),
                    Node::element(ElementKind::ListItem, vec![Node::text("two")]),
                ],
            ),
        ]
    }

    #[test]
    fn test_leaves_are_in_document_order() {
        let doc = sample();
        let paths: Vec<Path> = leaves(&doc).into_iter().map(|(path, _)| path).collect();
        assert_eq!(
            paths,
            vec![
                Path::from([0, 0]),
                Path::from([0, 1, 0]),
                Path::from([0, 2]),
                Path::from([1, 0, 0]),
                Path::from([1, 1, 0]),
            ]
        );
    }

    #[test]
    fn test_text_blocks_skip_lists_and_boxes() {
        let doc = sample();
        assert_eq!(
            text_blocks(&doc),
            vec![Path::from([0]), Path::from([1, 0]), Path::from([1, 1])]
        );
    }

    #[test]
    fn test_block_above_passes_through_box() {
        let doc = sample();
        let (path, element) = block_above(&doc, &Path::from([0, 1, 0])).unwrap();
        assert_eq!(path, Path::from([0]));
        assert_eq!(element.element_type(), ElementType::Paragraph);

        let (path, _) = box_above(&doc, &Path::from([0, 1, 0])).unwrap();
        assert_eq!(path, Path::from([0, 1]));
        assert!(box_above(&doc, &Path::from([0, 0])).is_none());
    }

    #[test]
    fn test_block_offsets_round_trip() {
        let doc = sample();
        let block = Path::from([0]);
        let point = Point::new([0, 2], 1);

        assert_eq!(block_offset(&doc, &block, &point), Some(5));
        assert_eq!(point_at_block_offset(&doc, &block, 5), Some(point));
        assert_eq!(
            point_at_block_offset(&doc, &block, 2),
            Some(Point::new([0, 0], 2))
        );
    }

    #[test]
    fn test_nearest_point_from_falls_back_to_end() {
        let doc = sample();
        assert_eq!(
            nearest_point_from(&doc, &Path::from([1])),
            Some(Point::new([1, 0, 0], 0))
        );
        assert_eq!(
            nearest_point_from(&doc, &Path::from([2])),
            Some(Point::new([1, 1, 0], 3))
        );
    }

    #[test]
    fn test_paths_in_range() {
        let doc = sample();
        let range = Range::new(Point::new([0, 2], 1), Point::new([1, 0, 0], 1));
        assert_eq!(
            paths_in_range(&doc, &range),
            vec![
                Path::from([0]),
                Path::from([0, 2]),
                Path::from([1]),
                Path::from([1, 0]),
                Path::from([1, 0, 0]),
            ]
        );
    }

    #[test]
    fn test_text_between_spans_blocks() {
        let doc = sample();
        let text = text_between(&doc, &Point::new([0, 1, 0], 1), &Point::new([1, 0, 0], 2));
        assert_eq!(text, "defon");
    }
}
