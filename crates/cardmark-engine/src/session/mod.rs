//! Per-card editor sessions.
//!
//! An [`EditorSession`] owns the document of one card and is the only thing
//! the toolbar and keyboard talk to: it runs input through the autoformat
//! pipeline, applies toolbar commands and keeps a [`FormatSnapshot`] of the
//! formatting at the selection up to date.

pub mod keys;
pub mod registry;

pub use keys::{Key, KeyChord, KeyCommand, KeyParseError, Modifiers};
pub use registry::SessionRegistry;

use crate::autoformat::{InputContext, InputEvent, Pipeline};
use crate::editing::{Document, EditError, Movement, NodeProperties, Point, Range, tree};
use crate::model::card::CardId;
use crate::model::node::{Align, Element, ElementType, FlagMark, MarkChange, Marks, Node, StyleMark};

/// Receives a card's content after an edit changed it
pub trait ContentObserver {
    fn content_changed(&mut self, card_id: &CardId, content: &[Node]);
}

/// Formatting at the start of the selection, as shown by the toolbar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSnapshot {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub font_size: Option<String>,
    pub font_family: Option<String>,
    pub line_height: Option<String>,
    /// Type of the innermost element around the selection
    pub block_type: ElementType,
    pub align: Option<Align>,
}

impl Default for FormatSnapshot {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            color: None,
            background_color: None,
            font_size: None,
            font_family: None,
            line_height: None,
            block_type: ElementType::Paragraph,
            align: None,
        }
    }
}

impl FormatSnapshot {
    fn from_marks(marks: &Marks, element: Option<&Element>) -> Self {
        let style = |mark| marks.style(mark).map(str::to_string);
        Self {
            bold: marks.flag(FlagMark::Bold),
            italic: marks.flag(FlagMark::Italic),
            underline: marks.flag(FlagMark::Underline),
            strikethrough: marks.flag(FlagMark::Strikethrough),
            color: style(StyleMark::Color),
            background_color: style(StyleMark::BackgroundColor),
            font_size: style(StyleMark::FontSize),
            font_family: style(StyleMark::FontFamily),
            line_height: style(StyleMark::LineHeight),
            block_type: element.map_or(ElementType::Paragraph, Element::element_type),
            align: element.and_then(|element| element.align),
        }
    }

    pub fn flag(&self, mark: FlagMark) -> bool {
        match mark {
            FlagMark::Bold => self.bold,
            FlagMark::Italic => self.italic,
            FlagMark::Underline => self.underline,
            FlagMark::Strikethrough => self.strikethrough,
        }
    }

    pub fn style(&self, mark: StyleMark) -> Option<&str> {
        match mark {
            StyleMark::Color => self.color.as_deref(),
            StyleMark::BackgroundColor => self.background_color.as_deref(),
            StyleMark::FontSize => self.font_size.as_deref(),
            StyleMark::FontFamily => self.font_family.as_deref(),
            StyleMark::LineHeight => self.line_height.as_deref(),
        }
    }
}

/// Editing state of one card
#[derive(Debug)]
pub struct EditorSession {
    card_id: CardId,
    document: Document,
    pipeline: Pipeline,
    snapshot: FormatSnapshot,
    /// Marks for the next typed text when the toolbar is used with a collapsed caret
    pending_marks: Option<Marks>,
    composing: bool,
}

impl EditorSession {
    pub fn new(card_id: CardId, content: Vec<Node>) -> Self {
        Self::with_pipeline(card_id, content, Pipeline::standard())
    }

    pub fn with_pipeline(card_id: CardId, content: Vec<Node>, pipeline: Pipeline) -> Self {
        let mut session = Self {
            card_id,
            document: Document::new(content),
            pipeline,
            snapshot: FormatSnapshot::default(),
            pending_marks: None,
            composing: false,
        };
        session.refresh_snapshot();
        session
    }

    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn content(&self) -> &[Node] {
        self.document.children()
    }

    pub fn selection(&self) -> Option<&Range> {
        self.document.selection()
    }

    /// Move the selection (or drop it with `None`). Pending marks are discarded.
    pub fn set_selection(&mut self, selection: Option<Range>) -> Result<(), EditError> {
        self.document.set_selection(selection)?;
        self.pending_marks = None;
        self.refresh_snapshot();
        Ok(())
    }

    pub fn select(&mut self, point: Point) -> Result<(), EditError> {
        self.set_selection(Some(Range::collapsed(point)))
    }

    /// Select the end of the document, the usual place to start typing
    pub fn select_end(&mut self) -> Result<(), EditError> {
        let end = tree::document_end(self.document.children()).ok_or(EditError::NoSelection)?;
        self.select(end)
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Mark the start or end of an IME composition. While composing, input
    /// skips every autoformat special case.
    pub fn set_composing(&mut self, composing: bool) {
        self.composing = composing;
    }

    /// Run one input event. Returns whether the content changed.
    pub fn handle_input(&mut self, event: &InputEvent) -> Result<bool, EditError> {
        let version = self.document.version();
        let context = InputContext {
            composing: self.composing,
            pending_marks: self.pending_marks.clone(),
        };
        self.pipeline.run(&mut self.document, event, &context)?;

        let changed = self.document.version() != version;
        if changed {
            self.pending_marks = None;
        }
        self.refresh_snapshot();
        Ok(changed)
    }

    /// Run the command bound to `chord`. Returns whether the content changed;
    /// unbound chords change nothing.
    pub fn handle_key(&mut self, chord: &KeyChord) -> Result<bool, EditError> {
        let Some(command) = chord.command() else {
            return Ok(false);
        };
        match command {
            KeyCommand::ToggleMark(mark) => {
                let version = self.document.version();
                self.toggle_mark(mark)?;
                Ok(self.document.version() != version)
            }
            KeyCommand::Input(event) => self.handle_input(&event),
            KeyCommand::Move(movement) => self.move_caret(movement, false),
            KeyCommand::Extend(movement) => self.move_caret(movement, true),
        }
    }

    fn move_caret(&mut self, movement: Movement, extend: bool) -> Result<bool, EditError> {
        if extend {
            self.document.extend_selection(movement)?;
        } else {
            self.document.move_selection(movement)?;
        }
        self.pending_marks = None;
        self.refresh_snapshot();
        Ok(false)
    }

    /// Toggle a boolean mark. An expanded selection is restyled; a caret
    /// only changes the marks of the text typed next.
    pub fn toggle_mark(&mut self, mark: FlagMark) -> Result<(), EditError> {
        let value = if self.snapshot.flag(mark) { None } else { Some(true) };
        self.change_marks(MarkChange::Flag(mark, value))
    }

    /// Write a valued mark. Font sizes given as a bare number get `px`.
    pub fn set_mark(&mut self, mark: StyleMark, value: &str) -> Result<(), EditError> {
        let value = match mark {
            StyleMark::FontSize if value.parse::<f64>().is_ok() => format!("{value}px"),
            _ => value.to_string(),
        };
        self.change_marks(MarkChange::Style(mark, Some(value)))
    }

    fn change_marks(&mut self, change: MarkChange) -> Result<(), EditError> {
        let range = self.document.selection().cloned().ok_or(EditError::NoSelection)?;
        if range.is_expanded() {
            self.document.transaction(|doc| doc.set_marks(&range, &change))?;
        } else {
            let current = self
                .pending_marks
                .take()
                .or_else(|| self.document.leaf(&range.focus.path).map(|leaf| leaf.marks.clone()))
                .unwrap_or_default();
            self.pending_marks = Some(current.with(&change));
        }
        self.refresh_snapshot();
        Ok(())
    }

    /// Convert the selected blocks to `block_type`, or back to paragraphs when
    /// they already are one. Lists are unwrapped around the selection first and
    /// the converted items wrapped again when a list type is applied.
    pub fn toggle_block(&mut self, block_type: ElementType) -> Result<(), EditError> {
        if !matches!(
            block_type,
            ElementType::Paragraph
                | ElementType::Heading
                | ElementType::CodeBlock
                | ElementType::OrderedList
                | ElementType::BulletedList
        ) {
            return Err(EditError::Unsupported(format!("cannot apply {block_type} to a selection")));
        }
        let range = self.document.selection().cloned().ok_or(EditError::NoSelection)?;
        let active = self.is_block_active(&range, block_type);

        self.document.transaction(|doc| {
            doc.unwrap_nodes(&range, Element::is_list, true)?;
            let range = doc.selection().cloned().ok_or(EditError::NoSelection)?;

            let kind = if active {
                ElementType::Paragraph.default_kind()
            } else if block_type.is_list() {
                ElementType::ListItem.default_kind()
            } else {
                block_type.default_kind()
            };
            for block in doc.blocks_in_range(&range) {
                doc.set_node_properties(&block, NodeProperties::kind(kind.clone()))?;
            }

            if !active && block_type.is_list() {
                doc.wrap_nodes(&range, block_type.default_kind(), |element| {
                    element.element_type() == ElementType::ListItem
                })?;
            }
            Ok(())
        })?;
        self.refresh_snapshot();
        Ok(())
    }

    fn is_block_active(&self, range: &Range, block_type: ElementType) -> bool {
        tree::paths_in_range(self.document.children(), range)
            .iter()
            .filter_map(|path| tree::element(self.document.children(), path))
            .any(|element| element.element_type() == block_type)
    }

    /// Align every selected block. List containers are left alone; their items are aligned.
    pub fn set_align(&mut self, align: Align) -> Result<(), EditError> {
        let range = self.document.selection().cloned().ok_or(EditError::NoSelection)?;
        self.document.transaction(|doc| {
            for block in doc.blocks_in_range(&range) {
                doc.set_node_properties(&block, NodeProperties::align(Some(align)))?;
            }
            Ok(())
        })?;
        self.refresh_snapshot();
        Ok(())
    }

    pub fn format_snapshot(&self) -> &FormatSnapshot {
        &self.snapshot
    }

    /// Text covered by the selection; empty for a caret or no selection
    pub fn selected_text(&self) -> String {
        match self.document.selection() {
            Some(range) if range.is_expanded() => {
                let (start, end) = range.edges();
                tree::text_between(self.document.children(), start, end)
            }
            _ => String::new(),
        }
    }

    fn refresh_snapshot(&mut self) {
        let Some(range) = self.document.selection() else {
            self.snapshot = FormatSnapshot::default();
            return;
        };
        let start = range.start();
        let root = self.document.children();

        let marks = match &self.pending_marks {
            Some(marks) => marks.clone(),
            None => tree::leaf(root, &start.path).map(|leaf| leaf.marks.clone()).unwrap_or_default(),
        };
        let element = start
            .path
            .parent()
            .and_then(|parent| tree::above(root, &parent, |_| true))
            .map(|(_, element)| element);

        self.snapshot = FormatSnapshot::from_marks(&marks, element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{ElementKind, Text};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn session(content: Vec<Node>) -> EditorSession {
        EditorSession::new(CardId::from("card"), content)
    }

    fn bold() -> Marks {
        Marks {
            bold: Some(true),
            ..Marks::default()
        }
    }

    fn item(text: &str) -> Node {
        Node::element(ElementKind::ListItem, vec![Node::text(text)])
    }

    fn type_text(session: &mut EditorSession, text: &str) {
        for c in text.chars() {
            session.handle_input(&InputEvent::InsertText(c.to_string())).unwrap();
        }
    }

    #[test]
    fn test_typing_heading_shortcut_in_empty_paragraph() {
        let mut session = session(vec![Node::empty_paragraph()]);
        session.select(Point::new([0, 0], 0)).unwrap();
        type_text(&mut session, "# ");

        assert_eq!(
            session.content(),
            &[Node::element(ElementKind::heading(1), vec![Node::text("")])]
        );
        assert_eq!(session.format_snapshot().block_type, ElementType::Heading);
    }

    #[test]
    fn test_typing_divider_shortcut_moves_caret_to_new_paragraph() {
        let mut session = session(vec![Node::empty_paragraph()]);
        session.select(Point::new([0, 0], 0)).unwrap();
        type_text(&mut session, "---");

        assert_eq!(
            session.content(),
            &[
                Node::element(ElementKind::Divider, vec![Node::text("")]),
                Node::empty_paragraph(),
            ]
        );
        assert_eq!(session.document().caret(), Some(&Point::new([1, 0], 0)));
    }

    #[test]
    fn test_toggle_mark_on_range_and_back() {
        let mut session = session(vec![Node::paragraph(vec![Node::text("hello")])]);
        session
            .set_selection(Some(Range::new(Point::new([0, 0], 0), Point::new([0, 0], 5))))
            .unwrap();

        session.toggle_mark(FlagMark::Bold).unwrap();
        assert_eq!(
            session.content(),
            &[Node::paragraph(vec![Node::Text(Text::with_marks("hello", bold()))])]
        );
        assert!(session.format_snapshot().bold);

        session.toggle_mark(FlagMark::Bold).unwrap();
        assert_eq!(session.content(), &[Node::paragraph(vec![Node::text("hello")])]);
        assert!(!session.format_snapshot().bold);
    }

    #[test]
    fn test_toggle_mark_at_caret_applies_to_next_text() {
        let mut session = session(vec![Node::paragraph(vec![Node::text("ab")])]);
        session.select(Point::new([0, 0], 1)).unwrap();

        session.toggle_mark(FlagMark::Bold).unwrap();
        assert!(session.format_snapshot().bold);
        assert_eq!(session.content(), &[Node::paragraph(vec![Node::text("ab")])]);

        type_text(&mut session, "X");
        assert_eq!(
            session.content(),
            &[Node::paragraph(vec![
                Node::text("a"),
                Node::Text(Text::with_marks("X", bold())),
                Node::text("b"),
            ])]
        );
    }

    #[test]
    fn test_selection_change_discards_pending_marks() {
        let mut session = session(vec![Node::paragraph(vec![Node::text("ab")])]);
        session.select(Point::new([0, 0], 1)).unwrap();
        session.toggle_mark(FlagMark::Italic).unwrap();

        session.select(Point::new([0, 0], 2)).unwrap();
        assert!(!session.format_snapshot().italic);
    }

    #[rstest]
    #[case("18", "18px")]
    #[case("1.5rem", "1.5rem")]
    #[case("20px", "20px")]
    fn test_set_font_size_adds_unit(#[case] value: &str, #[case] expected: &str) {
        let mut session = session(vec![Node::paragraph(vec![Node::text("hi")])]);
        session
            .set_selection(Some(Range::new(Point::new([0, 0], 0), Point::new([0, 0], 2))))
            .unwrap();
        session.set_mark(StyleMark::FontSize, value).unwrap();

        assert_eq!(session.format_snapshot().font_size.as_deref(), Some(expected));
        assert_eq!(
            session.document().leaf(&[0, 0].into()).unwrap().marks.font_size.as_deref(),
            Some(expected)
        );
    }

    #[test]
    fn test_set_line_height_is_written_verbatim() {
        let mut session = session(vec![Node::paragraph(vec![Node::text("hi")])]);
        session
            .set_selection(Some(Range::new(Point::new([0, 0], 0), Point::new([0, 0], 2))))
            .unwrap();
        session.set_mark(StyleMark::LineHeight, "2").unwrap();

        assert_eq!(session.format_snapshot().style(StyleMark::LineHeight), Some("2"));
    }

    #[test]
    fn test_toggle_heading_defaults_to_level_two_and_back() {
        let mut session = session(vec![Node::paragraph(vec![Node::text("Title")])]);
        session.select(Point::new([0, 0], 2)).unwrap();

        session.toggle_block(ElementType::Heading).unwrap();
        assert_eq!(
            session.content(),
            &[Node::element(ElementKind::heading(2), vec![Node::text("Title")])]
        );

        session.toggle_block(ElementType::Heading).unwrap();
        assert_eq!(session.content(), &[Node::paragraph(vec![Node::text("Title")])]);
    }

    #[test]
    fn test_toggle_list_wraps_and_unwraps() {
        let mut session = session(vec![
            Node::paragraph(vec![Node::text("one")]),
            Node::paragraph(vec![Node::text("two")]),
        ]);
        session
            .set_selection(Some(Range::new(Point::new([0, 0], 0), Point::new([1, 0], 3))))
            .unwrap();

        session.toggle_block(ElementType::BulletedList).unwrap();
        assert_eq!(
            session.content(),
            &[Node::element(ElementKind::BulletedList, vec![item("one"), item("two")])]
        );

        session.toggle_block(ElementType::BulletedList).unwrap();
        assert_eq!(
            session.content(),
            &[
                Node::paragraph(vec![Node::text("one")]),
                Node::paragraph(vec![Node::text("two")]),
            ]
        );
    }

    #[test]
    fn test_toggle_list_type_switches_list() {
        let mut session = session(vec![Node::element(
            ElementKind::BulletedList,
            vec![item("one"), item("two")],
        )]);
        session.select(Point::new([0, 1, 0], 0)).unwrap();

        session.toggle_block(ElementType::OrderedList).unwrap();
        assert_eq!(
            session.content(),
            &[
                Node::element(ElementKind::BulletedList, vec![item("one")]),
                Node::element(ElementKind::OrderedList, vec![item("two")]),
            ]
        );
    }

    #[test]
    fn test_toggle_void_block_is_unsupported() {
        let mut session = session(vec![Node::paragraph(vec![Node::text("x")])]);
        session.select(Point::new([0, 0], 0)).unwrap();

        assert!(matches!(
            session.toggle_block(ElementType::Divider),
            Err(EditError::Unsupported(_))
        ));
    }

    #[test]
    fn test_set_align_skips_list_containers() {
        let mut session = session(vec![Node::element(ElementKind::OrderedList, vec![item("a")])]);
        session.select(Point::new([0, 0, 0], 0)).unwrap();
        session.set_align(Align::Center).unwrap();

        let list = session.content()[0].as_element().unwrap();
        assert_eq!(list.align, None);
        assert_eq!(list.children[0].as_element().unwrap().align, Some(Align::Center));
        assert_eq!(session.format_snapshot().align, Some(Align::Center));
        assert_eq!(session.format_snapshot().block_type, ElementType::ListItem);
    }

    #[test]
    fn test_selected_text_spans_blocks() {
        let mut session = session(vec![
            Node::paragraph(vec![Node::text("hello")]),
            Node::paragraph(vec![Node::text("world")]),
        ]);
        assert_eq!(session.selected_text(), "");

        session
            .set_selection(Some(Range::new(Point::new([1, 0], 3), Point::new([0, 0], 2))))
            .unwrap();
        assert_eq!(session.selected_text(), "llowor");
    }

    #[test]
    fn test_snapshot_reports_box() {
        let mut session = session(vec![Node::boxed_paragraph(Some("dark".into()), None, vec![Node::text("in")])]);
        session.select(Point::new([0, 0, 0], 1)).unwrap();

        assert_eq!(session.format_snapshot().block_type, ElementType::Box);
    }

    #[test]
    fn test_handle_key_reports_changes() {
        let mut session = session(vec![Node::paragraph(vec![Node::text("ab")])]);
        session.select(Point::new([0, 0], 2)).unwrap();

        assert!(session.handle_key(&"backspace".parse().unwrap()).unwrap());
        assert!(!session.handle_key(&"left".parse().unwrap()).unwrap());
        assert_eq!(session.document().caret(), Some(&Point::new([0, 0], 0)));
        assert!(!session.handle_key(&"ctrl+z".parse().unwrap()).unwrap());
        assert!(!session.handle_key(&"ctrl+b".parse().unwrap()).unwrap());
        assert!(session.format_snapshot().bold);
    }

    #[test]
    fn test_cmd_enter_inserts_newline_in_block() {
        let mut session = session(vec![Node::element(ElementKind::heading(1), vec![Node::text("ab")])]);
        session.select(Point::new([0, 0], 1)).unwrap();
        session.handle_key(&"cmd+enter".parse().unwrap()).unwrap();

        assert_eq!(
            session.content(),
            &[Node::element(ElementKind::heading(1), vec![Node::text("a\nb")])]
        );
    }

    #[test]
    fn test_composition_skips_shortcuts() {
        let mut session = session(vec![Node::empty_paragraph()]);
        session.select(Point::new([0, 0], 0)).unwrap();
        session.set_composing(true);
        type_text(&mut session, "# ");

        assert_eq!(session.content(), &[Node::paragraph(vec![Node::text("# ")])]);
    }
}
