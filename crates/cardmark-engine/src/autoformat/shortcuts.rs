//! Markdown-style shortcuts typed at the start of a block, and the
//! `:::box` / `:::` line markers.

use crate::autoformat::attrs::{BoxAttributes, is_box_end, match_box_start};
use crate::autoformat::{Handled, InputContext, InputEvent};
use crate::editing::{Document, EditError, NodeProperties, Path, Point, Range, tree};
use crate::model::node::{Element, ElementKind, ElementType, Node};

/// Structural rewrite selected by the text typed so far in a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shortcut {
    Heading(u8),
    BulletedList,
    OrderedList,
    Divider,
    CodeFence,
}

impl Shortcut {
    /// `prefix` is the block text before the caret plus the character being typed
    fn detect(prefix: &str) -> Option<Self> {
        match prefix {
            "# " => Some(Self::Heading(1)),
            "## " => Some(Self::Heading(2)),
            "### " => Some(Self::Heading(3)),
            "- " => Some(Self::BulletedList),
            "1. " => Some(Self::OrderedList),
            "---" => Some(Self::Divider),
            "```" => Some(Self::CodeFence),
            _ => None,
        }
    }
}

/// Blocks where shortcuts are live: paragraphs and headings holding plain runs
fn accepts_shortcuts(element: &Element) -> bool {
    matches!(element.element_type(), ElementType::Paragraph | ElementType::Heading)
        && element.children.iter().all(Node::is_text)
}

pub fn handle(doc: &mut Document, event: &InputEvent, _context: &InputContext) -> Result<Handled, EditError> {
    let InputEvent::InsertText(typed) = event else {
        return Ok(Handled::No);
    };
    let Some(caret) = doc.caret().cloned() else {
        return Ok(Handled::No);
    };
    let Some((block, element)) = tree::block_above(doc.children(), &caret.path) else {
        return Ok(Handled::No);
    };
    if !accepts_shortcuts(element) {
        return Ok(Handled::No);
    }

    let block_start = tree::start_point(doc.children(), &block).ok_or_else(|| EditError::InvalidPath(block.clone()))?;
    let mut prefix = tree::text_between(doc.children(), &block_start, &caret);
    prefix.push_str(typed);
    let Some(shortcut) = Shortcut::detect(&prefix) else {
        return Ok(Handled::No);
    };
    log::debug!("shortcut {shortcut:?} in block {block}");

    doc.delete_range(&Range::new(block_start, caret))?;
    let block_is_empty = doc.node(&block).is_some_and(Node::is_empty);

    match shortcut {
        Shortcut::Heading(level) => {
            doc.set_node_properties(&block, NodeProperties::kind(ElementKind::heading(level)))?;
        }
        Shortcut::BulletedList | Shortcut::OrderedList => {
            let wrapper = if shortcut == Shortcut::BulletedList {
                ElementKind::BulletedList
            } else {
                ElementKind::OrderedList
            };
            doc.set_node_properties(&block, NodeProperties::kind(ElementKind::ListItem))?;
            let caret = doc.caret().cloned().ok_or(EditError::NoSelection)?;
            doc.wrap_nodes(&Range::collapsed(caret), wrapper, |element| {
                element.element_type() == ElementType::ListItem
            })?;
        }
        Shortcut::Divider if block_is_empty => {
            doc.set_node_properties(&block, NodeProperties::kind(ElementKind::Divider))?;
            let after = block.next();
            doc.insert_node(&after, Node::empty_paragraph())?;
            doc.select(Point::new(after.child(0), 0))?;
        }
        Shortcut::Divider => {
            doc.insert_node(&block, Node::element(ElementKind::Divider, vec![Node::text("")]))?;
        }
        Shortcut::CodeFence if block_is_empty => {
            doc.set_node_properties(&block, NodeProperties::kind(ElementKind::code_block()))?;
        }
        Shortcut::CodeFence => {
            doc.insert_node(&block, Node::element(ElementKind::code_block(), vec![Node::text("")]))?;
            doc.select(Point::new(block.child(0), 0))?;
        }
    }
    Ok(Handled::Yes)
}

/// The `\n`-delimited line of `container`'s text that ends at `caret`, as
/// (line start offset, line text). `None` when more text follows the caret on
/// the same line.
fn line_before_caret(doc: &Document, container: &Path, caret: &Point) -> Option<(usize, String)> {
    let text = doc.node(container)?.text_content();
    let offset = tree::block_offset(doc.children(), container, caret)?;
    let rest = text.get(offset..)?;
    if !(rest.is_empty() || rest.starts_with('\n')) {
        return None;
    }
    let before = text.get(..offset)?;
    let line_start = before.rfind('\n').map_or(0, |index| index + 1);
    Some((line_start, before[line_start..].to_string()))
}

/// Remove the line that starts at `line_start` and ends at the caret, along
/// with the newline that precedes it.
fn delete_line(doc: &mut Document, container: &Path, line_start: usize, caret: &Point) -> Result<(), EditError> {
    let from = line_start.saturating_sub(1);
    let start = tree::point_at_block_offset(doc.children(), container, from)
        .ok_or_else(|| EditError::InvalidPath(container.clone()))?;
    doc.delete_range(&Range::new(start, caret.clone()))
}

/// `:::box{...}` and `:::` lines, committed with Enter or a soft break
pub fn handle_box_markers(
    doc: &mut Document,
    event: &InputEvent,
    _context: &InputContext,
) -> Result<Handled, EditError> {
    if !matches!(event, InputEvent::InsertBreak { .. } | InputEvent::InsertSoftBreak) {
        return Ok(Handled::No);
    }
    let Some(caret) = doc.caret().cloned() else {
        return Ok(Handled::No);
    };

    if let Some(box_path) = tree::box_above(doc.children(), &caret.path).map(|(path, _)| path) {
        return close_box(doc, &box_path, &caret);
    }

    let Some((block, element)) = tree::block_above(doc.children(), &caret.path) else {
        return Ok(Handled::No);
    };
    if !accepts_shortcuts(element) {
        return Ok(Handled::No);
    }
    let Some((line_start, line)) = line_before_caret(doc, &block, &caret) else {
        return Ok(Handled::No);
    };
    let Some(attributes) = match_box_start(&line) else {
        return Ok(Handled::No);
    };
    log::debug!("opening box {attributes:?} in block {block}");
    open_box(doc, &block, line_start, &caret, attributes)?;
    Ok(Handled::Yes)
}

fn open_box(
    doc: &mut Document,
    block: &Path,
    line_start: usize,
    caret: &Point,
    attributes: BoxAttributes,
) -> Result<(), EditError> {
    delete_line(doc, block, line_start, caret)?;

    let target = if doc.node(block).is_some_and(Node::is_empty) {
        block.clone()
    } else if line_start == 0 {
        trim_leading_newline(doc, block)?;
        doc.insert_node(block, Node::empty_paragraph())?;
        block.clone()
    } else {
        let caret = doc.caret().cloned().ok_or(EditError::NoSelection)?;
        let after = doc.split_node(&caret, true)?;
        trim_leading_newline(doc, &after)?;
        if !doc.node(&after).is_some_and(Node::is_empty) {
            doc.insert_node(&after, Node::empty_paragraph())?;
        }
        after
    };

    if doc.node(&target).and_then(Node::element_type) != Some(ElementType::Paragraph) {
        doc.set_node_properties(&target, NodeProperties::kind(ElementKind::Paragraph))?;
    }
    let boxed = Node::element(
        ElementKind::boxed(attributes.theme, attributes.radius),
        vec![Node::text("")],
    );
    doc.insert_node(&target.child(0), boxed)?;
    doc.remove_node(&target.child(1))?;
    doc.select(Point::new(target.child(0).child(0), 0))
}

/// The newline left at the start of a block once the text before it moved away
fn trim_leading_newline(doc: &mut Document, block: &Path) -> Result<(), EditError> {
    if !doc.node(block).is_some_and(|node| node.text_content().starts_with('\n')) {
        return Ok(());
    }
    let (Some(start), Some(end)) = (
        tree::point_at_block_offset(doc.children(), block, 0),
        tree::point_at_block_offset(doc.children(), block, 1),
    ) else {
        return Err(EditError::InvalidPath(block.clone()));
    };
    doc.delete_range(&Range::new(start, end))
}

fn close_box(doc: &mut Document, box_path: &Path, caret: &Point) -> Result<Handled, EditError> {
    let Some((line_start, line)) = line_before_caret(doc, box_path, caret) else {
        return Ok(Handled::No);
    };
    if !is_box_end(&line) {
        return Ok(Handled::No);
    }
    let Some((block, element)) = tree::block_above(doc.children(), box_path) else {
        return Err(EditError::InvalidPath(box_path.clone()));
    };
    // A following sibling of the same shape keeps nested containers valid
    let filler = if block.len() == 1 {
        Node::empty_paragraph()
    } else {
        Node::element(element.kind.clone(), vec![Node::text("")])
    };
    log::debug!("closing box {box_path}");
    delete_line(doc, box_path, line_start, caret)?;

    let following = block.next();
    if doc.node(&following).is_none() {
        doc.insert_node(&following, filler)?;
    }
    let start = tree::start_point(doc.children(), &following).ok_or_else(|| EditError::InvalidPath(following.clone()))?;
    doc.select(start)?;
    Ok(Handled::Yes)
}
