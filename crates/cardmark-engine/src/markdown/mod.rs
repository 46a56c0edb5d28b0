//! Markdown conversion in both directions, including the `:::box` extension.
//!
//! Round trips keep block types, list nesting, box attributes and text. Marks
//! Markdown cannot express (underline, colours, fonts) and block alignment
//! are dropped.

pub mod parse;
pub mod serialize;

pub use parse::markdown_to_document;
pub use serialize::document_to_markdown;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{ElementKind, Marks, Node, Text};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn item(text: &str) -> Node {
        Node::element(ElementKind::ListItem, vec![Node::text(text)])
    }

    #[rstest]
    #[case::headings(vec![
        Node::element(ElementKind::heading(1), vec![Node::text("One")]),
        Node::element(ElementKind::heading(4), vec![Node::text("Four")]),
    ])]
    #[case::lists(vec![
        Node::element(ElementKind::OrderedList, vec![item("first"), item("second\nline")]),
        Node::paragraph(vec![Node::text("between")]),
        Node::element(ElementKind::BulletedList, vec![item(""), item("x")]),
    ])]
    #[case::code_and_voids(vec![
        Node::element(ElementKind::CodeBlock { language: Some("js".into()) }, vec![Node::text("a\n\n  b")]),
        Node::element(ElementKind::Divider, vec![Node::text("")]),
        Node::element(ElementKind::PageBreak, vec![Node::text("")]),
        Node::empty_paragraph(),
    ])]
    #[case::box_with_attributes(vec![
        Node::paragraph(vec![Node::text("intro")]),
        Node::boxed_paragraph(Some("light".into()), Some("12px".into()), vec![Node::text("inside\nthe box")]),
        Node::boxed_paragraph(None, None, vec![Node::text("")]),
    ])]
    #[case::awkward_text(vec![
        Node::paragraph(vec![Node::text("  leading and trailing  ")]),
        Node::paragraph(vec![Node::text("1. not a list, :::box not a box, <b>not html</b> & [no link]")]),
        Node::paragraph(vec![Node::text("---")]),
    ])]
    #[case::heading_closing_hashes(vec![
        Node::element(ElementKind::heading(1), vec![Node::text("Title #")]),
        Node::element(ElementKind::heading(3), vec![Node::text("a ##")]),
        Node::element(ElementKind::heading(2), vec![Node::text("#")]),
    ])]
    #[case::box_markers_in_code(vec![
        Node::element(ElementKind::code_block(), vec![Node::text(":::box\nx\n:::")]),
        Node::paragraph(vec![Node::text("after")]),
    ])]
    #[case::word_symbols_beside_marks(vec![
        Node::paragraph(vec![
            Node::text("a_b "),
            Node::Text(Text::with_marks("x*y", Marks { bold: Some(true), ..Marks::default() })),
            Node::text("_c"),
        ]),
    ])]
    fn test_round_trip_preserves_structure(#[case] nodes: Vec<Node>) {
        let markdown = document_to_markdown(&nodes);
        assert_eq!(markdown_to_document(&markdown), nodes, "via:\n{markdown}");
    }

    #[test]
    fn test_round_trip_keeps_box_marks() {
        let bold = Marks {
            bold: Some(true),
            ..Marks::default()
        };
        let nodes = vec![Node::boxed_paragraph(
            Some("dark".into()),
            None,
            vec![Node::text("plain "), Node::Text(Text::with_marks("strong", bold))],
        )];

        assert_eq!(markdown_to_document(&document_to_markdown(&nodes)), nodes);
    }

    #[test]
    fn test_box_markdown_example() {
        let nodes = markdown_to_document(":::box{theme=\"dark\"}\nhello\n:::");
        assert_eq!(
            nodes,
            vec![Node::boxed_paragraph(Some("dark".into()), None, vec![Node::text("hello")])]
        );

        let markdown = document_to_markdown(&nodes);
        let paragraphs: Vec<&str> = markdown.trim_end().split("\n\n").collect();
        assert_eq!(paragraphs, vec![":::box{theme=\"dark\"}", "hello", ":::"]);
    }
}
