//! Backspace and Delete special cases around boxes, headings, code blocks and
//! list items.

use crate::autoformat::{Handled, InputContext, InputEvent};
use crate::editing::{Document, EditError, NodeProperties, Operation, Path, Point, tree};
use crate::model::node::{ElementKind, ElementType, Node};
use unicode_segmentation::UnicodeSegmentation;

pub fn handle_backward(
    doc: &mut Document,
    event: &InputEvent,
    _context: &InputContext,
) -> Result<Handled, EditError> {
    if *event != InputEvent::DeleteBackward {
        return Ok(Handled::No);
    }
    let Some(caret) = doc.caret().cloned() else {
        return Ok(Handled::No);
    };
    if caret.offset != 0 {
        return Ok(Handled::No);
    }

    if let Some(box_path) = tree::box_above(doc.children(), &caret.path).map(|(path, _)| path) {
        return backspace_in_box(doc, &box_path, &caret);
    }

    if let Some(box_path) = box_before(doc, &caret) {
        log::debug!("backspace removes box {box_path}");
        remove_box(doc, &box_path)?;
        return Ok(Handled::Yes);
    }

    let block = doc.block_path(&caret.path)?;
    if !tree::is_start(doc.children(), &caret, &block) {
        return Ok(Handled::No);
    }
    match doc.node(&block).and_then(Node::element_type) {
        Some(ElementType::Heading | ElementType::CodeBlock) => {
            doc.set_node_properties(&block, NodeProperties::kind(ElementKind::Paragraph))?;
            Ok(Handled::Yes)
        }
        Some(ElementType::ListItem) => backspace_in_list_item(doc, &block),
        _ => Ok(Handled::No),
    }
}

/// Cases for a caret at the start of a leaf inside a box
fn backspace_in_box(doc: &mut Document, box_path: &Path, caret: &Point) -> Result<Handled, EditError> {
    let parent = box_path.parent().ok_or_else(|| EditError::InvalidPath(box_path.clone()))?;

    if doc.node(box_path).is_some_and(Node::is_empty) {
        log::debug!("backspace removes empty box {box_path}");
        doc.remove_inline(box_path)?;
        let start = tree::start_point(doc.children(), &parent).ok_or_else(|| EditError::InvalidPath(parent.clone()))?;
        doc.select(start)?;
        return Ok(Handled::Yes);
    }

    if tree::is_start(doc.children(), caret, box_path) {
        log::debug!("backspace unwraps box {box_path}");
        let count = doc.node(box_path).map_or(0, |node| node.children().len());
        doc.apply(Operation::UnwrapNode {
            path: box_path.clone(),
            count,
        })?;
        doc.normalize_block_of(&parent.child(0))?;
        return Ok(Handled::Yes);
    }
    Ok(Handled::No)
}

fn backspace_in_list_item(doc: &mut Document, item: &Path) -> Result<Handled, EditError> {
    let list = item.parent().ok_or_else(|| EditError::InvalidPath(item.clone()))?;
    let siblings = doc.node(&list).map_or(0, |node| node.children().len());
    let index = item.last().unwrap_or(0);

    if siblings == 1 {
        log::debug!("backspace lifts the only item of {list}");
        doc.set_node_properties(item, NodeProperties::kind(ElementKind::Paragraph))?;
        doc.apply(Operation::UnwrapNode { path: list, count: 1 })?;
        return Ok(Handled::Yes);
    }

    if index == 0 {
        log::debug!("backspace moves the first item of {list} before the list");
        let content = doc.node(item).map(|node| node.children().to_vec()).unwrap_or_default();
        let paragraph = Node::paragraph(content);
        doc.insert_node(&list, paragraph)?;
        doc.remove_node(&list.next().child(0))?;
        let end = tree::end_point(doc.children(), &list).ok_or_else(|| EditError::InvalidPath(list.clone()))?;
        doc.select(end)?;
        return Ok(Handled::Yes);
    }

    log::debug!("backspace merges {item} into the previous item");
    doc.merge_node(item)?;
    let previous = list.child(index - 1);
    doc.normalize_leaves(&previous)?;
    Ok(Handled::Yes)
}

/// Delete at the position just before a box removes the whole box
pub fn handle_forward(doc: &mut Document, event: &InputEvent, _context: &InputContext) -> Result<Handled, EditError> {
    if *event != InputEvent::DeleteForward {
        return Ok(Handled::No);
    }
    let Some(caret) = doc.caret().cloned() else {
        return Ok(Handled::No);
    };
    if tree::box_above(doc.children(), &caret.path).is_some() {
        return Ok(Handled::No);
    }
    match box_after(doc, &caret) {
        Some(box_path) => {
            log::debug!("delete removes box {box_path}");
            remove_box(doc, &box_path)?;
            Ok(Handled::Yes)
        }
        None => Ok(Handled::No),
    }
}

fn remove_box(doc: &mut Document, box_path: &Path) -> Result<(), EditError> {
    let parent = box_path.parent().ok_or_else(|| EditError::InvalidPath(box_path.clone()))?;
    doc.remove_inline(box_path)?;
    doc.normalize_leaves(&parent)
}

/// The box holding the grapheme just before `caret`, crossing into the
/// previous block when the caret is at a block start.
fn box_before(doc: &Document, caret: &Point) -> Option<Path> {
    let (block, _) = tree::block_above(doc.children(), &caret.path)?;
    if tree::is_start(doc.children(), caret, &block) {
        let previous = doc.adjacent_block(&block, true)?;
        let last = tree::last_leaf(doc.children(), &previous)?;
        return tree::box_above(doc.children(), &last).map(|(path, _)| path);
    }
    let text = doc.node(&block)?.text_content();
    let offset = tree::block_offset(doc.children(), &block, caret)?;
    let (start, _) = text[..offset].grapheme_indices(true).next_back()?;
    box_in_span(doc, &block, start, offset)
}

/// The box holding the grapheme just after `caret`, crossing into the next
/// block when the caret is at a block end.
fn box_after(doc: &Document, caret: &Point) -> Option<Path> {
    let (block, _) = tree::block_above(doc.children(), &caret.path)?;
    if tree::is_end(doc.children(), caret, &block) {
        let next = doc.adjacent_block(&block, false)?;
        let first = tree::first_leaf(doc.children(), &next)?;
        return tree::box_above(doc.children(), &first).map(|(path, _)| path);
    }
    let text = doc.node(&block)?.text_content();
    let offset = tree::block_offset(doc.children(), &block, caret)?;
    let grapheme = text[offset..].graphemes(true).next()?;
    box_in_span(doc, &block, offset, offset + grapheme.len())
}

/// First box whose leaves overlap the block byte span `from..to`
fn box_in_span(doc: &Document, block: &Path, from: usize, to: usize) -> Option<Path> {
    let mut consumed = 0;
    for (path, text) in tree::leaves_under(doc.children(), block) {
        let (start, end) = (consumed, consumed + text.text.len());
        consumed = end;
        if start < to
            && end > from
            && let Some((box_path, _)) = tree::box_above(doc.children(), &path)
        {
            return Some(box_path);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoformat::Pipeline;
    use crate::model::node::{Marks, Text};
    use pretty_assertions::assert_eq;

    fn backspace(doc: &mut Document) {
        Pipeline::standard()
            .run(doc, &InputEvent::DeleteBackward, &InputContext::default())
            .unwrap();
    }

    fn delete(doc: &mut Document) {
        Pipeline::standard()
            .run(doc, &InputEvent::DeleteForward, &InputContext::default())
            .unwrap();
    }

    fn item(children: Vec<Node>) -> Node {
        Node::element(ElementKind::ListItem, children)
    }

    fn bulleted(items: Vec<Node>) -> Node {
        Node::element(ElementKind::BulletedList, items)
    }

    fn boxed(text: &str) -> Node {
        Node::element(ElementKind::boxed(None, None), vec![Node::text(text)])
    }

    #[test]
    fn test_backspace_in_empty_box_removes_it() {
        let mut doc = Document::new(vec![Node::boxed_paragraph(None, None, vec![Node::text("")])]);
        doc.select(Point::new([0, 0, 0], 0)).unwrap();
        backspace(&mut doc);

        assert_eq!(doc.children(), &[Node::empty_paragraph()]);
        assert_eq!(doc.caret(), Some(&Point::new([0, 0], 0)));
    }

    #[test]
    fn test_backspace_at_box_start_unwraps_it() {
        let mut doc = Document::new(vec![Node::boxed_paragraph(None, None, vec![Node::text("inside")])]);
        doc.select(Point::new([0, 0, 0], 0)).unwrap();
        backspace(&mut doc);

        assert_eq!(doc.children(), &[Node::paragraph(vec![Node::text("inside")])]);
        assert_eq!(doc.caret(), Some(&Point::new([0, 0], 0)));
    }

    #[test]
    fn test_backspace_after_box_deletes_box() {
        let mut doc = Document::new(vec![Node::paragraph(vec![
            Node::text("a"),
            boxed("b"),
            Node::text("c"),
        ])]);
        doc.select(Point::new([0, 2], 0)).unwrap();
        backspace(&mut doc);

        assert_eq!(doc.children(), &[Node::paragraph(vec![Node::text("ac")])]);
        assert_eq!(doc.caret(), Some(&Point::new([0, 0], 1)));
    }

    #[test]
    fn test_backspace_at_heading_start_makes_paragraph() {
        let mut doc = Document::new(vec![
            Node::paragraph(vec![Node::text("before")]),
            Node::element(ElementKind::heading(2), vec![Node::text("Title")]),
        ]);
        doc.select(Point::new([1, 0], 0)).unwrap();
        backspace(&mut doc);

        assert_eq!(doc.children()[1], Node::paragraph(vec![Node::text("Title")]));
        assert_eq!(doc.caret(), Some(&Point::new([1, 0], 0)));
    }

    #[test]
    fn test_backspace_at_code_block_start_makes_paragraph() {
        let mut doc = Document::new(vec![Node::element(ElementKind::code_block(), vec![Node::text("x")])]);
        doc.select(Point::new([0, 0], 0)).unwrap();
        backspace(&mut doc);

        assert_eq!(doc.children(), &[Node::paragraph(vec![Node::text("x")])]);
    }

    #[test]
    fn test_backspace_in_only_list_item_lifts_it() {
        let mut doc = Document::new(vec![bulleted(vec![item(vec![Node::text("solo")])])]);
        doc.select(Point::new([0, 0, 0], 0)).unwrap();
        backspace(&mut doc);

        assert_eq!(doc.children(), &[Node::paragraph(vec![Node::text("solo")])]);
        assert_eq!(doc.caret(), Some(&Point::new([0, 0], 0)));
    }

    #[test]
    fn test_backspace_in_first_item_keeps_marks() {
        let bold = Marks {
            bold: Some(true),
            ..Marks::default()
        };
        let mut doc = Document::new(vec![bulleted(vec![
            item(vec![Node::text("plain "), Node::Text(Text::with_marks("bold", bold.clone()))]),
            item(vec![Node::text("second")]),
        ])]);
        doc.select(Point::new([0, 0, 0], 0)).unwrap();
        backspace(&mut doc);

        assert_eq!(
            doc.children(),
            &[
                Node::paragraph(vec![Node::text("plain "), Node::Text(Text::with_marks("bold", bold))]),
                bulleted(vec![item(vec![Node::text("second")])]),
            ]
        );
        assert_eq!(doc.caret(), Some(&Point::new([0, 1], 4)));
    }

    #[test]
    fn test_backspace_in_second_item_merges_into_first() {
        let mut doc = Document::new(vec![bulleted(vec![
            item(vec![Node::text("one")]),
            item(vec![Node::text("two")]),
        ])]);
        doc.select(Point::new([0, 1, 0], 0)).unwrap();
        backspace(&mut doc);

        assert_eq!(doc.children(), &[bulleted(vec![item(vec![Node::text("onetwo")])])]);
        assert_eq!(doc.caret(), Some(&Point::new([0, 0, 0], 3)));
    }

    #[test]
    fn test_backspace_mid_text_falls_through() {
        let mut doc = Document::new(vec![Node::element(ElementKind::heading(1), vec![Node::text("ab")])]);
        doc.select(Point::new([0, 0], 1)).unwrap();
        backspace(&mut doc);

        assert_eq!(
            doc.children(),
            &[Node::element(ElementKind::heading(1), vec![Node::text("b")])]
        );
    }

    #[test]
    fn test_delete_before_box_removes_it() {
        let mut doc = Document::new(vec![Node::paragraph(vec![
            Node::text("a"),
            boxed("box"),
            Node::text("c"),
        ])]);
        doc.select(Point::new([0, 0], 1)).unwrap();
        delete(&mut doc);

        assert_eq!(doc.children(), &[Node::paragraph(vec![Node::text("ac")])]);
        assert_eq!(doc.caret(), Some(&Point::new([0, 0], 1)));
    }

    #[test]
    fn test_delete_elsewhere_is_default() {
        let mut doc = Document::new(vec![Node::paragraph(vec![Node::text("abc")])]);
        doc.select(Point::new([0, 0], 1)).unwrap();
        delete(&mut doc);

        assert_eq!(doc.plain_text(), "ac");
    }
}
