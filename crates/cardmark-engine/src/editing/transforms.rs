//! High-level editing commands, each expressed as a sequence of primitive
//! operations so selection and anchors stay correct.

use crate::editing::document::Document;
use crate::editing::error::EditError;
use crate::editing::location::{Path, Point, Range};
use crate::editing::movement::Unit;
use crate::editing::operation::{NodeProperties, Operation};
use crate::editing::tree;
use crate::model::node::{Element, ElementKind, ElementType, MarkChange, Marks, Node, Text};
use crate::model::normalize::normalize_document;

impl Document {
    pub fn insert_text(&mut self, point: &Point, text: &str) -> Result<(), EditError> {
        if text.is_empty() {
            return Ok(());
        }
        self.apply(Operation::InsertText {
            path: point.path.clone(),
            offset: point.offset,
            text: text.to_string(),
        })?;
        Ok(())
    }

    /// Type `text` at the selection, replacing any selected content. When
    /// `marks` differ from the leaf under the caret the text gets its own leaf.
    pub fn insert_text_at_selection(&mut self, text: &str, marks: Option<&Marks>) -> Result<(), EditError> {
        let range = self.selection.clone().ok_or(EditError::NoSelection)?;
        if range.is_expanded() {
            self.delete_range(&range)?;
        }
        let point = self.caret().cloned().ok_or(EditError::NoSelection)?;
        let leaf = self
            .leaf(&point.path)
            .ok_or_else(|| EditError::NotText(point.path.clone()))?;

        match marks {
            Some(marks) if &leaf.marks != marks => {
                let leaf_len = leaf.text.len();
                let insert_at = if point.offset == 0 {
                    point.path.clone()
                } else if point.offset == leaf_len {
                    point.path.next()
                } else {
                    self.apply(Operation::SplitNode {
                        path: point.path.clone(),
                        position: point.offset,
                        properties: NodeProperties::default(),
                    })?;
                    point.path.next()
                };
                self.apply(Operation::InsertNode {
                    path: insert_at.clone(),
                    node: Node::Text(Text::with_marks(text, marks.clone())),
                })?;
                self.select(Point::new(insert_at.clone(), text.len()))?;
                self.normalize_block_of(&insert_at)
            }
            _ => self.insert_text(&point, text),
        }
    }

    /// Delete everything between the edges of `range`, joining the blocks at
    /// either end. The selection collapses to the start of the range.
    pub fn delete_range(&mut self, range: &Range) -> Result<(), EditError> {
        let (start, end) = range.edges();
        let (start, end) = (start.clone(), end.clone());
        if start == end {
            return Ok(());
        }

        if start.path == end.path {
            let text = self.leaf_slice(&start.path, start.offset, end.offset)?;
            self.apply(Operation::RemoveText {
                path: start.path.clone(),
                offset: start.offset,
                text,
            })?;
            self.select(start)?;
            return Ok(());
        }

        let start_block = self.block_path(&start.path)?;
        let end_block = self.block_path(&end.path)?;

        if end.offset > 0 {
            let text = self.leaf_slice(&end.path, 0, end.offset)?;
            self.apply(Operation::RemoveText {
                path: end.path.clone(),
                offset: 0,
                text,
            })?;
        }
        let start_len = self.leaf_len(&start.path)?;
        if start.offset < start_len {
            let text = self.leaf_slice(&start.path, start.offset, start_len)?;
            self.apply(Operation::RemoveText {
                path: start.path.clone(),
                offset: start.offset,
                text,
            })?;
        }

        let end_anchor = self.track_path(end_block);
        let mut covered = Vec::new();
        collect_covered(&self.children, &Path::root(), &start.path, &end.path, &mut covered);
        for path in covered.iter().rev() {
            self.apply(Operation::RemoveNode { path: path.clone() })?;
        }
        let end_block = self
            .release_path(end_anchor)
            .ok_or_else(|| EditError::InvalidPath(end.path.clone()))?;

        if start_block != end_block {
            self.join_blocks(&start_block, &end_block)?;
        }
        self.select(start)?;
        self.normalize_leaves(&start_block)
    }

    /// Delete the selection if it is expanded. Returns whether anything was deleted.
    pub fn delete_selection(&mut self) -> Result<bool, EditError> {
        match self.selection.clone() {
            Some(range) if range.is_expanded() => {
                self.delete_range(&range)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn insert_node(&mut self, path: &Path, node: Node) -> Result<(), EditError> {
        self.apply(Operation::InsertNode {
            path: path.clone(),
            node,
        })?;
        Ok(())
    }

    pub fn remove_node(&mut self, path: &Path) -> Result<(), EditError> {
        self.apply(Operation::RemoveNode { path: path.clone() })?;
        Ok(())
    }

    /// Remove an inline element, leaving an empty leaf behind if it was its
    /// parent's only child.
    pub fn remove_inline(&mut self, path: &Path) -> Result<(), EditError> {
        let parent = path.parent().ok_or_else(|| EditError::InvalidPath(path.clone()))?;
        let siblings = tree::children(&self.children, &parent).map_or(0, <[Node]>::len);
        if siblings == 1 {
            self.insert_node(path, Node::text(""))?;
            self.remove_node(&path.next())
        } else {
            self.remove_node(path)
        }
    }

    /// Remove a block together with any ancestors it would leave empty. The
    /// last block of a document is replaced by an empty paragraph instead.
    pub fn remove_block(&mut self, path: &Path) -> Result<(), EditError> {
        let mut target = path.clone();
        loop {
            let Some(parent) = target.parent() else {
                break;
            };
            if parent.is_empty() {
                break;
            }
            match tree::children(&self.children, &parent) {
                Some(children) if children.len() == 1 => target = parent,
                _ => break,
            }
        }
        if target.len() == 1 && self.children.len() == 1 {
            self.insert_node(&target.next(), Node::empty_paragraph())?;
        }
        self.remove_node(&target)
    }

    pub fn set_node_properties(&mut self, path: &Path, properties: NodeProperties) -> Result<(), EditError> {
        if properties.is_empty() {
            return Ok(());
        }
        self.apply(Operation::SetNode {
            path: path.clone(),
            properties,
        })?;
        Ok(())
    }

    /// Split from the leaf at `point` up to its text block. Returns the path
    /// of the block holding the content after the point.
    pub fn split_node(&mut self, point: &Point, always: bool) -> Result<Path, EditError> {
        let block = self.block_path(&point.path)?;
        self.split_nodes(point, &block, always)
    }

    /// Split every node from the leaf at `point` up to and including `top`.
    ///
    /// A level is split when `always` is set or the point is inside it rather
    /// than at one of its edges. Returns the path of the node that follows the
    /// point at the `top` level.
    pub fn split_nodes(&mut self, point: &Point, top: &Path, always: bool) -> Result<Path, EditError> {
        if !top.contains(&point.path) || top.is_empty() {
            return Err(EditError::InvalidPath(top.clone()));
        }
        let mut position = point.offset;
        let mut top_split = false;
        for depth in (top.len()..=point.path.len()).rev() {
            let path = point.path.truncated(depth);
            let is_end = tree::is_end(&self.children, point, &path);
            let split = always || !tree::is_edge(&self.children, point, &path);
            if split {
                self.apply(Operation::SplitNode {
                    path: path.clone(),
                    position,
                    properties: NodeProperties::default(),
                })?;
            }
            top_split = split;
            let index = path.last().ok_or_else(|| EditError::InvalidPath(path.clone()))?;
            position = index + usize::from(split || is_end);
        }
        if top_split || tree::is_end(&self.children, point, top) {
            Ok(top.next())
        } else {
            Ok(top.clone())
        }
    }

    /// Merge the node at `path` into its previous sibling
    pub fn merge_node(&mut self, path: &Path) -> Result<(), EditError> {
        let previous = path.previous().ok_or_else(|| EditError::InvalidPath(path.clone()))?;
        let position = self
            .node(&previous)
            .ok_or_else(|| EditError::InvalidPath(previous.clone()))?
            .len();
        self.apply(Operation::MergeNode {
            path: path.clone(),
            position,
        })?;
        Ok(())
    }

    /// Wrap each run of adjacent matching nodes in `range` in a new `wrapper` element
    pub fn wrap_nodes(
        &mut self,
        range: &Range,
        wrapper: ElementKind,
        predicate: impl Fn(&Element) -> bool,
    ) -> Result<(), EditError> {
        let matched = self.highest_matches(range, &predicate);

        let mut groups: Vec<(Path, usize)> = Vec::new();
        for path in matched {
            match groups.last_mut() {
                Some((first, count)) if first.is_sibling_of(&path) && first.last().map(|i| i + *count) == path.last() => {
                    *count += 1;
                }
                _ => groups.push((path, 1)),
            }
        }

        for (path, count) in groups.into_iter().rev() {
            self.apply(Operation::WrapNode {
                path,
                count,
                wrapper: wrapper.clone(),
            })?;
        }
        Ok(())
    }

    /// Replace matching elements in `range` by their children. With `split`,
    /// only the children inside the range are lifted out; the rest stay
    /// wrapped in copies of the element before and after.
    pub fn unwrap_nodes(
        &mut self,
        range: &Range,
        predicate: impl Fn(&Element) -> bool,
        split: bool,
    ) -> Result<(), EditError> {
        let (start, end) = range.edges();
        let matched: Vec<Path> = tree::paths_in_range(&self.children, range)
            .into_iter()
            .filter(|path| tree::element(&self.children, path).is_some_and(&predicate))
            .collect();

        for path in matched.into_iter().rev() {
            let len = tree::children(&self.children, &path).map_or(0, <[Node]>::len);
            let depth = path.len();
            let (first, last) = if split {
                let first = if path.is_ancestor_of(&start.path) {
                    start.path.index_at(depth).unwrap_or(0)
                } else {
                    0
                };
                let last = if path.is_ancestor_of(&end.path) {
                    end.path.index_at(depth).unwrap_or(len - 1)
                } else {
                    len - 1
                };
                (first, last)
            } else {
                (0, len - 1)
            };

            if last + 1 < len {
                self.apply(Operation::SplitNode {
                    path: path.clone(),
                    position: last + 1,
                    properties: NodeProperties::default(),
                })?;
            }
            let target = if first > 0 {
                self.apply(Operation::SplitNode {
                    path: path.clone(),
                    position: first,
                    properties: NodeProperties::default(),
                })?;
                path.next()
            } else {
                path
            };
            let count = tree::children(&self.children, &target).map_or(0, <[Node]>::len);
            self.apply(Operation::UnwrapNode { path: target, count })?;
        }
        Ok(())
    }

    /// Apply a mark change to the text covered by `range`, splitting leaves at
    /// the range edges. A collapsed range is a no-op.
    pub fn set_marks(&mut self, range: &Range, change: &MarkChange) -> Result<(), EditError> {
        let (start, end) = range.edges();
        if start == end {
            return Ok(());
        }

        let mut targets = Vec::new();
        for (path, text) in tree::leaves(&self.children) {
            if path < start.path || path > end.path {
                continue;
            }
            let from = if path == start.path { start.offset } else { 0 };
            let to = if path == end.path { end.offset } else { text.text.len() };
            if from < to || (text.text.is_empty() && path != start.path && path != end.path) {
                targets.push((path, from, to, text.text.len()));
            }
        }
        let blocks = self.blocks_in_range(range);

        for (path, from, to, len) in targets.into_iter().rev() {
            if to < len {
                self.apply(Operation::SplitNode {
                    path: path.clone(),
                    position: to,
                    properties: NodeProperties::default(),
                })?;
            }
            let target = if from > 0 {
                self.apply(Operation::SplitNode {
                    path: path.clone(),
                    position: from,
                    properties: NodeProperties::default(),
                })?;
                path.next()
            } else {
                path
            };
            self.apply(Operation::SetNode {
                path: target,
                properties: NodeProperties::mark(change.clone()),
            })?;
        }

        for block in blocks.iter().rev() {
            self.normalize_leaves(block)?;
        }
        Ok(())
    }

    /// Insert pasted content at `point`.
    ///
    /// A lone plain paragraph is spliced into the current block. Anything else
    /// is inserted as top-level blocks: before or after the current top-level
    /// block when the point is at its edge, in place of it when it is empty,
    /// and otherwise after splitting it at the point. The caret ends up at the
    /// end of the inserted content.
    pub fn insert_fragment(&mut self, point: &Point, nodes: Vec<Node>) -> Result<(), EditError> {
        if nodes.is_empty() {
            return Err(EditError::Unsupported("empty fragment".to_string()));
        }

        if let [Node::Element(paragraph)] = nodes.as_slice()
            && is_plain_paragraph(paragraph)
        {
            return self.insert_inline_fragment(point, paragraph.children.clone());
        }

        let nodes = normalize_document(nodes);
        let count = nodes.len();
        let top_index = point
            .path
            .index_at(0)
            .ok_or_else(|| EditError::InvalidPath(point.path.clone()))?;
        let top = Path::new(vec![top_index]);
        let top_node = self
            .node(&top)
            .ok_or_else(|| EditError::InvalidPath(top.clone()))?;
        let top_is_empty = top_node.is_empty() && !contains_inline_element(top_node);

        let first = if top_is_empty {
            for (offset, node) in nodes.into_iter().enumerate() {
                self.insert_node(&Path::new(vec![top_index + 1 + offset]), node)?;
            }
            self.remove_node(&top)?;
            top
        } else {
            let at = if tree::is_start(&self.children, point, &top) {
                top
            } else if tree::is_end(&self.children, point, &top) {
                top.next()
            } else {
                self.split_nodes(point, &top, true)?
            };
            let at_index = at.last().unwrap_or(top_index);
            for (offset, node) in nodes.into_iter().enumerate() {
                self.insert_node(&Path::new(vec![at_index + offset]), node)?;
            }
            at
        };

        let last_index = first.last().unwrap_or(top_index) + count - 1;
        let end = tree::end_point(&self.children, &Path::new(vec![last_index]))
            .ok_or_else(|| EditError::InvalidPath(first.clone()))?;
        self.select(end)
    }

    fn insert_inline_fragment(&mut self, point: &Point, leaves: Vec<Node>) -> Result<(), EditError> {
        let leaf_len = self.leaf_len(&point.path)?;
        let insert_at = if point.offset == 0 {
            point.path.clone()
        } else if point.offset == leaf_len {
            point.path.next()
        } else {
            self.apply(Operation::SplitNode {
                path: point.path.clone(),
                position: point.offset,
                properties: NodeProperties::default(),
            })?;
            point.path.next()
        };

        let count = leaves.len();
        let base = insert_at.last().ok_or_else(|| EditError::InvalidPath(insert_at.clone()))?;
        for (offset, leaf) in leaves.into_iter().enumerate() {
            self.insert_node(&insert_at.with_index(insert_at.len() - 1, base + offset), leaf)?;
        }
        let last = insert_at.with_index(insert_at.len() - 1, base + count - 1);
        let last_len = self.leaf_len(&last)?;
        self.select(Point::new(last.clone(), last_len))?;
        self.normalize_block_of(&last)
    }

    /// Default backward deletion: the selection if expanded, otherwise one
    /// grapheme back. At the start of a block the block joins the previous one.
    pub fn delete_backward(&mut self) -> Result<(), EditError> {
        if self.delete_selection()? {
            return Ok(());
        }
        let caret = self.caret().cloned().ok_or(EditError::NoSelection)?;
        let block = self.block_path(&caret.path)?;

        if tree::is_start(&self.children, &caret, &block) {
            let Some(previous) = self.adjacent_block(&block, true) else {
                return Ok(());
            };
            if self.is_void_block(&previous) {
                return self.remove_block(&previous);
            }
            let Some(before) = tree::end_point(&self.children, &previous) else {
                return Ok(());
            };
            return self.delete_range(&Range::new(before, caret));
        }

        match self.position_before(&caret, Unit::Character) {
            Some(before) => self.delete_range(&Range::new(before, caret)),
            None => Ok(()),
        }
    }

    /// Default forward deletion, mirroring [`Document::delete_backward`]
    pub fn delete_forward(&mut self) -> Result<(), EditError> {
        if self.delete_selection()? {
            return Ok(());
        }
        let caret = self.caret().cloned().ok_or(EditError::NoSelection)?;
        let block = self.block_path(&caret.path)?;

        if tree::is_end(&self.children, &caret, &block) {
            let Some(next) = self.adjacent_block(&block, false) else {
                return Ok(());
            };
            if self.is_void_block(&next) {
                return self.remove_block(&next);
            }
            let Some(after) = tree::start_point(&self.children, &next) else {
                return Ok(());
            };
            return self.delete_range(&Range::new(caret, after));
        }

        match self.position_after(&caret, Unit::Character) {
            Some(after) => self.delete_range(&Range::new(caret, after)),
            None => Ok(()),
        }
    }

    /// Merge adjacent leaves with equal marks and drop empty leaves that sit
    /// next to another leaf, in the block at `block` and in any box inside it.
    pub fn normalize_leaves(&mut self, block: &Path) -> Result<(), EditError> {
        self.normalize_container(block)?;
        let boxes: Vec<Path> = tree::children(&self.children, block)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .filter(|(_, child)| child.is_inline() && !child.is_text())
            .map(|(index, _)| block.child(index))
            .collect();
        for path in boxes.into_iter().rev() {
            self.normalize_container(&path)?;
        }
        Ok(())
    }

    fn normalize_container(&mut self, container: &Path) -> Result<(), EditError> {
        loop {
            let Some(children) = tree::children(&self.children, container) else {
                return Ok(());
            };
            let mut op = None;
            for (index, pair) in children.windows(2).enumerate() {
                let (Node::Text(first), Node::Text(second)) = (&pair[0], &pair[1]) else {
                    continue;
                };
                if first.marks == second.marks || second.text.is_empty() {
                    op = Some(Operation::MergeNode {
                        path: container.child(index + 1),
                        position: first.text.len(),
                    });
                    break;
                }
                if first.text.is_empty() {
                    op = Some(Operation::RemoveNode {
                        path: container.child(index),
                    });
                    break;
                }
            }
            match op {
                Some(op) => {
                    self.apply(op)?;
                }
                None => return Ok(()),
            }
        }
    }

    pub(crate) fn normalize_block_of(&mut self, path: &Path) -> Result<(), EditError> {
        let block = self.block_path(path)?;
        self.normalize_leaves(&block)
    }

    pub(crate) fn block_path(&self, path: &Path) -> Result<Path, EditError> {
        tree::block_above(&self.children, path)
            .map(|(block, _)| block)
            .ok_or_else(|| EditError::InvalidPath(path.clone()))
    }

    /// Text blocks overlapping `range`, in document order
    pub(crate) fn blocks_in_range(&self, range: &Range) -> Vec<Path> {
        tree::paths_in_range(&self.children, range)
            .into_iter()
            .filter(|path| tree::element(&self.children, path).is_some_and(tree::is_text_block))
            .collect()
    }

    /// The text block before or after `block` in document order
    pub(crate) fn adjacent_block(&self, block: &Path, before: bool) -> Option<Path> {
        let blocks = tree::text_blocks(&self.children);
        let index = blocks.iter().position(|candidate| candidate == block)?;
        if before {
            blocks.get(index.checked_sub(1)?).cloned()
        } else {
            blocks.get(index + 1).cloned()
        }
    }

    pub(crate) fn is_void_block(&self, path: &Path) -> bool {
        matches!(
            tree::element(&self.children, path).map(Element::element_type),
            Some(ElementType::Divider | ElementType::PageBreak)
        )
    }

    fn join_blocks(&mut self, start_block: &Path, end_block: &Path) -> Result<(), EditError> {
        if start_block.is_sibling_of(end_block) && start_block.next() == *end_block {
            return self.merge_node(end_block);
        }

        let moved: Vec<Node> = tree::children(&self.children, end_block)
            .ok_or_else(|| EditError::InvalidPath(end_block.clone()))?
            .to_vec();
        let existing = tree::children(&self.children, start_block).map_or(0, <[Node]>::len);
        let end_anchor = self.track_path(end_block.clone());
        for (offset, node) in moved.into_iter().enumerate() {
            self.insert_node(&start_block.child(existing + offset), node)?;
        }
        let end_block = self
            .release_path(end_anchor)
            .ok_or_else(|| EditError::InvalidPath(end_block.clone()))?;
        self.remove_block(&end_block)
    }

    fn highest_matches(&self, range: &Range, predicate: &impl Fn(&Element) -> bool) -> Vec<Path> {
        let mut matched: Vec<Path> = Vec::new();
        for path in tree::paths_in_range(&self.children, range) {
            if matched.iter().any(|ancestor| ancestor.is_ancestor_of(&path)) {
                continue;
            }
            if tree::element(&self.children, &path).is_some_and(predicate) {
                matched.push(path);
            }
        }
        matched
    }

    fn leaf_len(&self, path: &Path) -> Result<usize, EditError> {
        self.leaf(path)
            .map(|leaf| leaf.text.len())
            .ok_or_else(|| EditError::NotText(path.clone()))
    }

    fn leaf_slice(&self, path: &Path, from: usize, to: usize) -> Result<String, EditError> {
        let leaf = self.leaf(path).ok_or_else(|| EditError::NotText(path.clone()))?;
        leaf.text
            .get(from..to)
            .map(str::to_string)
            .ok_or_else(|| EditError::InvalidOffset(Point::new(path.clone(), to)))
    }
}

/// Highest nodes lying entirely between two leaves in document order
fn collect_covered(root: &[Node], parent: &Path, start: &Path, end: &Path, out: &mut Vec<Path>) {
    let siblings = if parent.is_empty() {
        root
    } else {
        tree::children(root, parent).unwrap_or_default()
    };
    for (index, child) in siblings.iter().enumerate() {
        let path = parent.child(index);
        if path.contains(start) || path.contains(end) {
            if !child.is_text() {
                collect_covered(root, &path, start, end, out);
            }
        } else if &path > start && &path < end {
            out.push(path);
        }
    }
}

fn is_plain_paragraph(element: &Element) -> bool {
    matches!(element.kind, ElementKind::Paragraph)
        && element.align.is_none()
        && element.children.iter().all(Node::is_text)
}

fn contains_inline_element(node: &Node) -> bool {
    node.children()
        .iter()
        .any(|child| (child.is_inline() && !child.is_text()) || contains_inline_element(child))
}
