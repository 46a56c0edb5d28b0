use crate::autoformat::{Handled, InputContext, InputEvent};
use crate::editing::{Document, EditError, NodeProperties, Point, tree};
use crate::model::node::{ElementKind, ElementType, Node};

/// Enter without Shift. Inside a box it adds a line break; at the end of a
/// heading or code block it opens a paragraph after it; in the middle of one
/// the trailing half becomes a paragraph.
pub fn handle(doc: &mut Document, event: &InputEvent, context: &InputContext) -> Result<Handled, EditError> {
    if *event != (InputEvent::InsertBreak { shift: false }) {
        return Ok(Handled::No);
    }
    let Some(caret) = doc.caret().cloned() else {
        return Ok(Handled::No);
    };

    if tree::box_above(doc.children(), &caret.path).is_some() {
        doc.insert_text_at_selection("\n", context.pending_marks.as_ref())?;
        return Ok(Handled::Yes);
    }

    let block = doc.block_path(&caret.path)?;
    if !matches!(
        doc.node(&block).and_then(Node::element_type),
        Some(ElementType::Heading | ElementType::CodeBlock)
    ) {
        return Ok(Handled::No);
    }

    if tree::is_end(doc.children(), &caret, &block) {
        let after = block.next();
        doc.insert_node(&after, Node::empty_paragraph())?;
        doc.select(Point::new(after.child(0), 0))?;
    } else {
        let after = doc.split_node(&caret, true)?;
        doc.set_node_properties(&after, NodeProperties::kind(ElementKind::Paragraph))?;
    }
    Ok(Handled::Yes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoformat::Pipeline;
    use pretty_assertions::assert_eq;

    fn enter(doc: &mut Document, shift: bool) {
        Pipeline::standard()
            .run(doc, &InputEvent::InsertBreak { shift }, &InputContext::default())
            .unwrap();
    }

    fn heading(text: &str) -> Node {
        Node::element(ElementKind::heading(1), vec![Node::text(text)])
    }

    #[test]
    fn test_enter_at_heading_end_opens_paragraph() {
        let mut doc = Document::new(vec![heading("Title")]);
        doc.select(Point::new([0, 0], 5)).unwrap();
        enter(&mut doc, false);

        assert_eq!(doc.children(), &[heading("Title"), Node::empty_paragraph()]);
        assert_eq!(doc.caret(), Some(&Point::new([1, 0], 0)));
    }

    #[test]
    fn test_enter_mid_heading_splits_into_paragraph() {
        let mut doc = Document::new(vec![heading("Title")]);
        doc.select(Point::new([0, 0], 2)).unwrap();
        enter(&mut doc, false);

        assert_eq!(
            doc.children(),
            &[heading("Ti"), Node::paragraph(vec![Node::text("tle")])]
        );
        assert_eq!(doc.caret(), Some(&Point::new([1, 0], 0)));
    }

    #[test]
    fn test_enter_in_list_item_adds_item() {
        let list = |items: Vec<&str>| {
            Node::element(
                ElementKind::BulletedList,
                items
                    .into_iter()
                    .map(|text| Node::element(ElementKind::ListItem, vec![Node::text(text)]))
                    .collect(),
            )
        };
        let mut doc = Document::new(vec![list(vec!["one"])]);
        doc.select(Point::new([0, 0, 0], 3)).unwrap();
        enter(&mut doc, false);

        assert_eq!(doc.children(), &[list(vec!["one", ""])]);
        assert_eq!(doc.caret(), Some(&Point::new([0, 1, 0], 0)));
    }

    #[test]
    fn test_shift_enter_in_heading_keeps_heading() {
        let mut doc = Document::new(vec![heading("Title")]);
        doc.select(Point::new([0, 0], 5)).unwrap();
        enter(&mut doc, true);

        assert_eq!(doc.children(), &[heading("Title"), heading("")]);
    }

    #[test]
    fn test_enter_in_box_adds_line_break() {
        let mut doc = Document::new(vec![Node::boxed_paragraph(None, None, vec![Node::text("ab")])]);
        doc.select(Point::new([0, 0, 0], 1)).unwrap();
        enter(&mut doc, false);

        assert_eq!(
            doc.children(),
            &[Node::boxed_paragraph(None, None, vec![Node::text("a\nb")])]
        );
        assert_eq!(doc.caret(), Some(&Point::new([0, 0, 0], 2)));
    }
}
