use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Horizontal alignment of a block element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
    Justify,
}

/// Element discriminant together with the attributes that only some kinds carry.
///
/// Serialized internally tagged on `type` so the persisted JSON matches the
/// project files written by earlier versions of the editor (`code_block` is the
/// wire name, `code-block` is accepted on input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ElementKind {
    Paragraph,
    Heading {
        level: u8,
    },
    ListItem,
    OrderedList,
    BulletedList,
    Divider,
    PageBreak,
    #[serde(rename = "code_block", alias = "code-block")]
    CodeBlock {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Box {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        theme: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        radius: Option<String>,
    },
}

/// Fieldless view of [`ElementKind`], used where only the type matters
/// (toolbar commands, format snapshots, match predicates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Paragraph,
    Heading,
    ListItem,
    OrderedList,
    BulletedList,
    Divider,
    PageBreak,
    CodeBlock,
    Box,
}

impl ElementKind {
    pub fn element_type(&self) -> ElementType {
        match self {
            ElementKind::Paragraph => ElementType::Paragraph,
            ElementKind::Heading { .. } => ElementType::Heading,
            ElementKind::ListItem => ElementType::ListItem,
            ElementKind::OrderedList => ElementType::OrderedList,
            ElementKind::BulletedList => ElementType::BulletedList,
            ElementKind::Divider => ElementType::Divider,
            ElementKind::PageBreak => ElementType::PageBreak,
            ElementKind::CodeBlock { .. } => ElementType::CodeBlock,
            ElementKind::Box { .. } => ElementType::Box,
        }
    }

    pub fn heading(level: u8) -> Self {
        ElementKind::Heading {
            level: level.clamp(1, 6),
        }
    }

    pub fn code_block() -> Self {
        ElementKind::CodeBlock { language: None }
    }

    pub fn boxed(theme: Option<String>, radius: Option<String>) -> Self {
        ElementKind::Box { theme, radius }
    }
}

impl ElementType {
    /// The kind a block is converted to when this type is applied from the toolbar.
    /// Headings default to level 2, matching the toolbar's "H" button.
    pub fn default_kind(self) -> ElementKind {
        match self {
            ElementType::Paragraph => ElementKind::Paragraph,
            ElementType::Heading => ElementKind::heading(2),
            ElementType::ListItem => ElementKind::ListItem,
            ElementType::OrderedList => ElementKind::OrderedList,
            ElementType::BulletedList => ElementKind::BulletedList,
            ElementType::Divider => ElementKind::Divider,
            ElementType::PageBreak => ElementKind::PageBreak,
            ElementType::CodeBlock => ElementKind::code_block(),
            ElementType::Box => ElementKind::boxed(None, None),
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, ElementType::OrderedList | ElementType::BulletedList)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Paragraph => "paragraph",
            ElementType::Heading => "heading",
            ElementType::ListItem => "list-item",
            ElementType::OrderedList => "ordered-list",
            ElementType::BulletedList => "bulleted-list",
            ElementType::Divider => "divider",
            ElementType::PageBreak => "page-break",
            ElementType::CodeBlock => "code-block",
            ElementType::Box => "box",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "paragraph" => ElementType::Paragraph,
            "heading" => ElementType::Heading,
            "list-item" => ElementType::ListItem,
            "ordered-list" => ElementType::OrderedList,
            "bulleted-list" => ElementType::BulletedList,
            "divider" => ElementType::Divider,
            "page-break" => ElementType::PageBreak,
            "code-block" | "code_block" => ElementType::CodeBlock,
            "box" => ElementType::Box,
            other => return Err(UnknownName(other.to_string())),
        })
    }
}

/// Returned when a mark or element name coming from the UI is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name: {0}")]
pub struct UnknownName(pub String);

/// Boolean text marks, toggled on and off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagMark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

/// Valued text marks, always written unconditionally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleMark {
    Color,
    BackgroundColor,
    FontSize,
    FontFamily,
    LineHeight,
}

impl FromStr for FlagMark {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "bold" => FlagMark::Bold,
            "italic" => FlagMark::Italic,
            "underline" => FlagMark::Underline,
            "strikethrough" => FlagMark::Strikethrough,
            other => return Err(UnknownName(other.to_string())),
        })
    }
}

impl FromStr for StyleMark {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "color" => StyleMark::Color,
            "backgroundColor" => StyleMark::BackgroundColor,
            "fontSize" => StyleMark::FontSize,
            "fontFamily" => StyleMark::FontFamily,
            "lineHeight" => StyleMark::LineHeight,
            other => return Err(UnknownName(other.to_string())),
        })
    }
}

/// A single change to a leaf's mark set. `None` removes the mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkChange {
    Flag(FlagMark, Option<bool>),
    Style(StyleMark, Option<String>),
}

/// Formatting attributes of a text run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<String>,
}

impl Marks {
    /// A flag counts as active only when explicitly `true`; older files store `false`.
    pub fn flag(&self, mark: FlagMark) -> bool {
        self.flag_slot(mark) == &Some(true)
    }

    pub fn style(&self, mark: StyleMark) -> Option<&str> {
        self.style_slot(mark).as_deref()
    }

    pub fn apply(&mut self, change: &MarkChange) {
        match change {
            MarkChange::Flag(mark, value) => *self.flag_slot_mut(*mark) = *value,
            MarkChange::Style(mark, value) => *self.style_slot_mut(*mark) = value.clone(),
        }
    }

    pub fn with(mut self, change: &MarkChange) -> Self {
        self.apply(change);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Marks::default()
    }

    fn flag_slot(&self, mark: FlagMark) -> &Option<bool> {
        match mark {
            FlagMark::Bold => &self.bold,
            FlagMark::Italic => &self.italic,
            FlagMark::Underline => &self.underline,
            FlagMark::Strikethrough => &self.strikethrough,
        }
    }

    fn flag_slot_mut(&mut self, mark: FlagMark) -> &mut Option<bool> {
        match mark {
            FlagMark::Bold => &mut self.bold,
            FlagMark::Italic => &mut self.italic,
            FlagMark::Underline => &mut self.underline,
            FlagMark::Strikethrough => &mut self.strikethrough,
        }
    }

    fn style_slot(&self, mark: StyleMark) -> &Option<String> {
        match mark {
            StyleMark::Color => &self.color,
            StyleMark::BackgroundColor => &self.background_color,
            StyleMark::FontSize => &self.font_size,
            StyleMark::FontFamily => &self.font_family,
            StyleMark::LineHeight => &self.line_height,
        }
    }

    fn style_slot_mut(&mut self, mark: StyleMark) -> &mut Option<String> {
        match mark {
            StyleMark::Color => &mut self.color,
            StyleMark::BackgroundColor => &mut self.background_color,
            StyleMark::FontSize => &mut self.font_size,
            StyleMark::FontFamily => &mut self.font_family,
            StyleMark::LineHeight => &mut self.line_height,
        }
    }
}

/// Text run (leaf)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn with_marks(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }
}

/// Branch node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            align: None,
            children,
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.kind.element_type()
    }

    /// Boxes are the only inline element kind
    pub fn is_inline(&self) -> bool {
        matches!(self.kind, ElementKind::Box { .. })
    }

    pub fn is_list(&self) -> bool {
        self.element_type().is_list()
    }
}

/// Document tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(Element),
    Text(Text),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Self {
        Node::Element(Element::new(kind, children))
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::element(ElementKind::Paragraph, children)
    }

    /// A paragraph holding one empty leaf, the representation of a blank line
    pub fn empty_paragraph() -> Self {
        Node::paragraph(vec![Node::text("")])
    }

    /// The canonical box form: a paragraph whose sole child is the box
    pub fn boxed_paragraph(theme: Option<String>, radius: Option<String>, children: Vec<Node>) -> Self {
        let children = if children.is_empty() {
            vec![Node::text("")]
        } else {
            children
        };
        Node::paragraph(vec![Node::element(ElementKind::boxed(theme, radius), children)])
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(element) => &element.children,
            Node::Text(_) => &[],
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_inline(&self) -> bool {
        match self {
            Node::Text(_) => true,
            Node::Element(element) => element.is_inline(),
        }
    }

    pub fn element_type(&self) -> Option<ElementType> {
        self.as_element().map(Element::element_type)
    }

    /// Concatenated text of every leaf below this node
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Length used for merge/split positions: bytes for leaves, child count for elements
    pub fn len(&self) -> usize {
        match self {
            Node::Text(text) => text.text.len(),
            Node::Element(element) => element.children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text_content().is_empty()
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_paragraph_serializes_in_persisted_shape() {
        let node = Node::paragraph(vec![Node::Text(Text::with_marks(
            "hi",
            Marks {
                bold: Some(true),
                font_size: Some("18px".to_string()),
                ..Marks::default()
            },
        ))]);

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "paragraph",
                "children": [{ "text": "hi", "bold": true, "fontSize": "18px" }]
            })
        );
    }

    #[test]
    fn test_code_block_uses_original_wire_name() {
        let node = Node::element(
            ElementKind::CodeBlock {
                language: Some("rust".to_string()),
            },
            vec![Node::text("fn main() {}")],
        );
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "code_block");
        assert_eq!(value["language"], "rust");

        let parsed: Node = serde_json::from_value(json!({
            "type": "code-block",
            "children": [{ "text": "" }]
        }))
        .unwrap();
        assert_eq!(parsed.element_type(), Some(ElementType::CodeBlock));
    }

    #[test]
    fn test_box_ignores_is_inline_flag() {
        let parsed: Node = serde_json::from_value(json!({
            "type": "box",
            "theme": "dark",
            "isInline": true,
            "children": [{ "text": "x" }]
        }))
        .unwrap();

        let element = parsed.as_element().unwrap();
        assert_eq!(
            element.kind,
            ElementKind::Box {
                theme: Some("dark".to_string()),
                radius: None
            }
        );
        assert!(element.is_inline());
    }

    #[test]
    fn test_heading_round_trips_level_and_align() {
        let mut heading = Element::new(ElementKind::heading(3), vec![Node::text("Title")]);
        heading.align = Some(Align::Center);
        let node = Node::Element(heading);

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["level"], 3);
        assert_eq!(value["align"], "center");

        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_element_without_children_is_rejected() {
        let parsed = serde_json::from_value::<Node>(json!({ "type": "paragraph" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_flag_mark_false_is_inactive() {
        let marks = Marks {
            bold: Some(false),
            ..Marks::default()
        };
        assert!(!marks.flag(FlagMark::Bold));
        assert!(marks.with(&MarkChange::Flag(FlagMark::Bold, Some(true))).flag(FlagMark::Bold));
    }

    #[test]
    fn test_mark_names_parse() {
        assert_eq!("underline".parse::<FlagMark>().unwrap(), FlagMark::Underline);
        assert_eq!(
            "backgroundColor".parse::<StyleMark>().unwrap(),
            StyleMark::BackgroundColor
        );
        assert!("sparkle".parse::<FlagMark>().is_err());
        assert_eq!("code_block".parse::<ElementType>().unwrap(), ElementType::CodeBlock);
    }

    #[test]
    fn test_text_content_walks_inline_box() {
        let node = Node::paragraph(vec![
            Node::text("a"),
            Node::element(ElementKind::boxed(None, None), vec![Node::text("b")]),
            Node::text("c"),
        ]);
        assert_eq!(node.text_content(), "abc");
        assert_eq!(node.len(), 3);
    }
}
