use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use crate::autoformat::attrs::{BoxAttributes, is_box_end, match_box_start};
use crate::model::node::{Element, ElementKind, Marks, Node, Text};

const PAGE_BREAK: &str = "<!-- pagebreak -->";

/// Convert Markdown into document blocks.
///
/// `:::box{...}` / `:::` fenced regions become paragraph>box blocks whose text
/// runs come from converting the fenced content. Whitespace-only input yields
/// no blocks at all.
pub fn markdown_to_document(markdown: &str) -> Vec<Node> {
    let (markdown, boxes) = extract_boxes(markdown);
    let blocks = parse_blocks(&markdown);
    if boxes.is_empty() {
        return blocks;
    }
    blocks
        .into_iter()
        .map(|block| match placeholder_index(&block) {
            Some(index) if index < boxes.len() => box_block(&boxes[index]),
            _ => block,
        })
        .collect()
}

#[derive(Debug)]
struct BoxRegion {
    attributes: BoxAttributes,
    content: String,
}

fn placeholder(index: usize) -> String {
    format!("\u{F8FF}box{index}\u{F8FF}")
}

/// Index of the box whose placeholder is the only content of `block`
fn placeholder_index(block: &Node) -> Option<usize> {
    let element = block.as_element()?;
    if element.kind != ElementKind::Paragraph || !element.children.iter().all(Node::is_text) {
        return None;
    }
    let text = block.text_content();
    let inner = text.trim().strip_prefix('\u{F8FF}')?.strip_suffix('\u{F8FF}')?;
    inner.strip_prefix("box")?.parse().ok()
}

/// Open fenced code block seen while scanning raw lines
#[derive(Debug, Default)]
struct CodeFence {
    open: Option<(char, usize)>,
}

impl CodeFence {
    /// Track fence lines; true when `line` belongs to a code block
    fn update(&mut self, line: &str) -> bool {
        let indent = line.len() - line.trim_start_matches(' ').len();
        let fence = (indent < 4)
            .then(|| fence_run(&line[indent..]))
            .flatten();
        match (self.open, fence) {
            (None, Some((marker, len, _))) => {
                self.open = Some((marker, len));
                true
            }
            (Some((marker, len)), Some((found, found_len, rest)))
                if found == marker && found_len >= len && rest.trim().is_empty() =>
            {
                self.open = None;
                true
            }
            (open, _) => open.is_some(),
        }
    }
}

/// A run of three or more backticks or tildes starting `line`
fn fence_run(line: &str) -> Option<(char, usize, &str)> {
    let marker = line.chars().next().filter(|c| matches!(*c, '`' | '~'))?;
    let len = line.len() - line.trim_start_matches(marker).len();
    let rest = &line[len..];
    if len < 3 || (marker == '`' && rest.contains('`')) {
        return None;
    }
    Some((marker, len, rest))
}

/// Replace every top-level box region with a placeholder paragraph.
///
/// Regions start at a column-0 `:::box` line and end at the matching `:::`
/// line; nested regions stay inside their parent's content. Lines inside
/// fenced code are never markers. An unterminated region is left as
/// ordinary text.
fn extract_boxes(markdown: &str) -> (String, Vec<BoxRegion>) {
    let mut out = String::with_capacity(markdown.len());
    let mut boxes = Vec::new();
    let mut open: Option<(BoxAttributes, Vec<&str>)> = None;
    let mut depth = 0usize;
    let mut fence = CodeFence::default();

    for line in markdown.lines() {
        let in_code = fence.update(line);
        match open.as_mut() {
            None if in_code => {
                out.push_str(line);
                out.push('\n');
            }
            None => match match_box_start(line) {
                Some(attributes) => {
                    open = Some((attributes, vec![line]));
                    depth = 1;
                }
                None => {
                    out.push_str(line);
                    out.push('\n');
                }
            },
            Some((_, lines)) => {
                lines.push(line);
                if in_code {
                    continue;
                }
                if match_box_start(line).is_some() {
                    depth += 1;
                } else if is_box_end(line) {
                    depth -= 1;
                }
                if depth == 0 {
                    let Some((attributes, lines)) = open.take() else {
                        continue;
                    };
                    let content = lines[1..lines.len() - 1].join("\n");
                    out.push('\n');
                    out.push_str(&placeholder(boxes.len()));
                    out.push_str("\n\n");
                    boxes.push(BoxRegion { attributes, content });
                }
            }
        }
    }

    if let Some((_, lines)) = open {
        log::debug!("unterminated box region left as text");
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
    }
    (out, boxes)
}

/// Build paragraph>box from a fenced region, flattening the converted content
/// into text runs with one `\n` between blocks.
fn box_block(region: &BoxRegion) -> Node {
    let mut runs: Vec<Text> = Vec::new();
    for (index, block) in markdown_to_document(&region.content).iter().enumerate() {
        if index > 0 {
            push_run(&mut runs, "\n", &Marks::default());
        }
        collect_runs(block, &mut runs);
    }
    Node::boxed_paragraph(
        region.attributes.theme.clone(),
        region.attributes.radius.clone(),
        runs.into_iter().map(Node::Text).collect(),
    )
}

fn collect_runs(node: &Node, runs: &mut Vec<Text>) {
    match node {
        Node::Text(text) => push_run(runs, &text.text, &text.marks),
        Node::Element(element) => {
            for child in &element.children {
                collect_runs(child, runs);
            }
        }
    }
}

/// Append text, extending the last run when the marks match
fn push_run(runs: &mut Vec<Text>, text: &str, marks: &Marks) {
    if text.is_empty() {
        return;
    }
    match runs.last_mut() {
        Some(last) if &last.marks == marks => last.text.push_str(text),
        _ => runs.push(Text::with_marks(text, marks.clone())),
    }
}

#[derive(Debug, Default)]
struct MarkDepth {
    bold: usize,
    italic: usize,
    strikethrough: usize,
}

impl MarkDepth {
    fn marks(&self) -> Marks {
        let flag = |depth: usize| (depth > 0).then_some(true);
        Marks {
            bold: flag(self.bold),
            italic: flag(self.italic),
            strikethrough: flag(self.strikethrough),
            ..Marks::default()
        }
    }
}

/// Event-driven block builder. Lists are flattened: nested items join the
/// outermost list and block content inside an item is joined with `\n`.
#[derive(Debug, Default)]
struct Builder {
    blocks: Vec<Node>,
    open: Option<(ElementKind, Vec<Text>)>,
    list: Option<(ElementKind, Vec<Vec<Text>>)>,
    list_depth: usize,
    html: Option<String>,
    marks: MarkDepth,
}

impl Builder {
    fn runs(&mut self) -> Option<&mut Vec<Text>> {
        if let Some((_, items)) = self.list.as_mut() {
            return items.last_mut();
        }
        self.open.as_mut().map(|(_, runs)| runs)
    }

    fn push_text(&mut self, text: &str) {
        let marks = self.marks.marks();
        if let Some(runs) = self.runs() {
            push_run(runs, text, &marks);
        }
    }

    fn start_block(&mut self, kind: ElementKind) {
        if self.list.is_some() {
            // Block content after the first inside an item continues on a new line
            if self.runs().is_some_and(|runs| !runs.is_empty()) {
                self.push_text("\n");
            }
            return;
        }
        self.open = Some((kind, Vec::new()));
    }

    fn end_block(&mut self) {
        if let Some((kind, runs)) = self.open.take() {
            let runs = match kind {
                ElementKind::CodeBlock { .. } => trim_trailing_newline(runs),
                _ => runs,
            };
            self.blocks.push(element(kind, runs));
        }
    }

    fn push_block(&mut self, node: Node) {
        if self.list.is_none() {
            self.blocks.push(node);
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::Paragraph) => self.start_block(ElementKind::Paragraph),
            Event::Start(Tag::Heading { level, .. }) => self.start_block(ElementKind::heading(level as u8)),
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.start_block(ElementKind::CodeBlock { language });
            }
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock) => self.end_block(),

            Event::Start(Tag::List(start)) => {
                if self.list_depth == 0 {
                    let kind = if start.is_some() {
                        ElementKind::OrderedList
                    } else {
                        ElementKind::BulletedList
                    };
                    self.list = Some((kind, Vec::new()));
                }
                self.list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                self.list_depth = self.list_depth.saturating_sub(1);
                if self.list_depth == 0
                    && let Some((kind, items)) = self.list.take()
                {
                    let items = items
                        .into_iter()
                        .map(|runs| element(ElementKind::ListItem, runs))
                        .collect();
                    self.blocks.push(Node::Element(Element::new(kind, items)));
                }
            }
            Event::Start(Tag::Item) => {
                if let Some((_, items)) = self.list.as_mut() {
                    items.push(Vec::new());
                }
            }

            Event::Start(Tag::Emphasis) => self.marks.italic += 1,
            Event::End(TagEnd::Emphasis) => self.marks.italic = self.marks.italic.saturating_sub(1),
            Event::Start(Tag::Strong) => self.marks.bold += 1,
            Event::End(TagEnd::Strong) => self.marks.bold = self.marks.bold.saturating_sub(1),
            Event::Start(Tag::Strikethrough) => self.marks.strikethrough += 1,
            Event::End(TagEnd::Strikethrough) => {
                self.marks.strikethrough = self.marks.strikethrough.saturating_sub(1)
            }

            Event::Text(text) | Event::Code(text) | Event::InlineHtml(text) => self.push_text(&text),
            Event::SoftBreak | Event::HardBreak => self.push_text("\n"),
            Event::Rule => self.push_block(element(ElementKind::Divider, Vec::new())),

            Event::Start(Tag::HtmlBlock) => self.html = Some(String::new()),
            Event::Html(html) => match self.html.as_mut() {
                Some(buffer) => buffer.push_str(&html),
                None => self.push_text(&html),
            },
            Event::End(TagEnd::HtmlBlock) => {
                if let Some(html) = self.html.take() {
                    let node = html_block(html.trim());
                    self.push_block(node);
                }
            }
            _ => {}
        }
    }
}

fn html_block(html: &str) -> Node {
    match html {
        PAGE_BREAK => element(ElementKind::PageBreak, Vec::new()),
        "<br>" | "<br/>" | "<br />" => Node::empty_paragraph(),
        other => Node::paragraph(vec![Node::text(other)]),
    }
}

fn element(kind: ElementKind, runs: Vec<Text>) -> Node {
    let children = if runs.is_empty() {
        vec![Node::text("")]
    } else {
        runs.into_iter().map(Node::Text).collect()
    };
    Node::Element(Element::new(kind, children))
}

fn trim_trailing_newline(mut runs: Vec<Text>) -> Vec<Text> {
    if let Some(last) = runs.last_mut()
        && last.text.ends_with('\n')
    {
        last.text.pop();
        if last.text.is_empty() {
            runs.pop();
        }
    }
    runs
}

fn parse_blocks(markdown: &str) -> Vec<Node> {
    let mut builder = Builder::default();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH) {
        builder.handle(event);
    }
    builder.end_block();
    builder.blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn marked(text: &str, marks: Marks) -> Node {
        Node::Text(Text::with_marks(text, marks))
    }

    fn item(text: &str) -> Node {
        Node::element(ElementKind::ListItem, vec![Node::text(text)])
    }

    #[test]
    fn test_parse_headings_and_paragraphs() {
        let nodes = markdown_to_document("# One\n\n###### Six\n\nplain text");

        assert_eq!(
            nodes,
            vec![
                Node::element(ElementKind::heading(1), vec![Node::text("One")]),
                Node::element(ElementKind::heading(6), vec![Node::text("Six")]),
                Node::paragraph(vec![Node::text("plain text")]),
            ]
        );
    }

    #[test]
    fn test_parse_inline_marks() {
        let nodes = markdown_to_document("a **b _c_** ~~d~~");
        let bold = Marks {
            bold: Some(true),
            ..Marks::default()
        };
        let bold_italic = Marks {
            italic: Some(true),
            ..bold.clone()
        };
        let strike = Marks {
            strikethrough: Some(true),
            ..Marks::default()
        };

        assert_eq!(
            nodes,
            vec![Node::paragraph(vec![
                Node::text("a "),
                marked("b ", bold),
                marked("c", bold_italic),
                Node::text(" "),
                marked("d", strike),
            ])]
        );
    }

    #[test]
    fn test_parse_lists_flatten_nesting() {
        let nodes = markdown_to_document("- a\n  - b\n- c\n\n1. one\n2. two");

        assert_eq!(
            nodes,
            vec![
                Node::element(ElementKind::BulletedList, vec![item("a"), item("b"), item("c")]),
                Node::element(ElementKind::OrderedList, vec![item("one"), item("two")]),
            ]
        );
    }

    #[test]
    fn test_parse_loose_item_joins_paragraphs() {
        let nodes = markdown_to_document("- first\n\n  second\n");

        assert_eq!(
            nodes,
            vec![Node::element(ElementKind::BulletedList, vec![item("first\nsecond")])]
        );
    }

    #[test]
    fn test_parse_code_rule_and_page_break() {
        let nodes = markdown_to_document("```rust extra\nfn main() {}\n```\n\n---\n\n<!-- pagebreak -->\n\n    indented");

        assert_eq!(
            nodes,
            vec![
                Node::element(
                    ElementKind::CodeBlock {
                        language: Some("rust".into())
                    },
                    vec![Node::text("fn main() {}")]
                ),
                Node::element(ElementKind::Divider, vec![Node::text("")]),
                Node::element(ElementKind::PageBreak, vec![Node::text("")]),
                Node::element(ElementKind::code_block(), vec![Node::text("indented")]),
            ]
        );
    }

    #[test]
    fn test_parse_breaks_and_inline_code() {
        let nodes = markdown_to_document("line one\\\nline `two`\nthree [link](http://x)");

        assert_eq!(
            nodes,
            vec![Node::paragraph(vec![Node::text("line one\nline two\nthree link")])]
        );
    }

    #[test]
    fn test_parse_box_region() {
        let nodes = markdown_to_document(":::box{theme=\"dark\"}\nhello\n:::");

        assert_eq!(
            nodes,
            vec![Node::boxed_paragraph(Some("dark".into()), None, vec![Node::text("hello")])]
        );
    }

    #[test]
    fn test_parse_box_between_blocks_keeps_marks() {
        let nodes = markdown_to_document("before\n:::box\n\n**a**\n\nb\n\n:::\nafter");
        let bold = Marks {
            bold: Some(true),
            ..Marks::default()
        };

        assert_eq!(
            nodes,
            vec![
                Node::paragraph(vec![Node::text("before")]),
                Node::boxed_paragraph(None, None, vec![marked("a", bold), Node::text("\nb")]),
                Node::paragraph(vec![Node::text("after")]),
            ]
        );
    }

    #[test]
    fn test_parse_nested_box_regions() {
        let nodes = markdown_to_document(":::box{radius=\"4px\"}\nouter\n:::box\ninner\n:::\n:::");

        assert_eq!(
            nodes,
            vec![Node::boxed_paragraph(
                None,
                Some("4px".into()),
                vec![Node::text("outer\ninner")]
            )]
        );
    }

    #[test]
    fn test_box_markers_inside_code_fences_are_code() {
        let nodes = markdown_to_document("```\n:::box\nx\n:::\n```\n\n~~~~\n:::box\n~~~\n:::\n~~~~");

        assert_eq!(
            nodes,
            vec![
                Node::element(ElementKind::code_block(), vec![Node::text(":::box\nx\n:::")]),
                Node::element(ElementKind::code_block(), vec![Node::text(":::box\n~~~\n:::")]),
            ]
        );
    }

    #[test]
    fn test_unterminated_box_is_text() {
        let nodes = markdown_to_document(":::box\nhello");

        assert_eq!(nodes, vec![Node::paragraph(vec![Node::text(":::box\nhello")])]);
    }

    #[test]
    fn test_empty_input_has_no_blocks() {
        assert!(markdown_to_document("").is_empty());
        assert!(markdown_to_document("  \n\n ").is_empty());
    }
}
