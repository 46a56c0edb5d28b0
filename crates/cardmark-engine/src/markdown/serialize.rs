use crate::autoformat::attrs::BoxAttributes;
use crate::model::node::{Element, ElementKind, Marks, Node, Text};

const PAGE_BREAK: &str = "<!-- pagebreak -->";
const EMPTY_PARAGRAPH: &str = "<br>";
const HARD_BREAK: &str = "\\\n";

/// Render document blocks as Markdown, one blank line between blocks.
///
/// A paragraph holding boxes expands into `:::box{...}`, content and `:::`
/// paragraphs; text beside a box keeps its own paragraph. Adjacent lists of
/// the same kind alternate their marker so they stay separate lists.
pub fn document_to_markdown(nodes: &[Node]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    let mut previous_list: Option<(ElementKind, bool)> = None;

    for node in nodes {
        let element = match node {
            Node::Element(element) => element,
            Node::Text(text) => {
                blocks.push(inline_markdown(std::slice::from_ref(text), HARD_BREAK));
                previous_list = None;
                continue;
            }
        };

        match &element.kind {
            ElementKind::BulletedList | ElementKind::OrderedList => {
                let alternate = match &previous_list {
                    Some((kind, alternate)) if kind == &element.kind => !alternate,
                    _ => false,
                };
                blocks.push(list_markdown(element, alternate));
                previous_list = Some((element.kind.clone(), alternate));
                continue;
            }
            ElementKind::Paragraph if element.children.iter().any(is_box) => {
                box_paragraph_markdown(element, &mut blocks);
            }
            ElementKind::Box { theme, radius } => {
                push_box(theme, radius, &element.children, &mut blocks);
            }
            _ => blocks.push(block_markdown(element)),
        }
        previous_list = None;
    }

    let mut out = blocks.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn is_box(node: &Node) -> bool {
    matches!(node, Node::Element(Element { kind: ElementKind::Box { .. }, .. }))
}

fn box_paragraph_markdown(paragraph: &Element, blocks: &mut Vec<String>) {
    let mut pending: Vec<Text> = Vec::new();
    for child in &paragraph.children {
        match child {
            Node::Element(Element {
                kind: ElementKind::Box { theme, radius },
                children,
                ..
            }) => {
                flush_runs(&mut pending, blocks);
                push_box(theme, radius, children, blocks);
            }
            other => collect_leaves(other, &mut pending),
        }
    }
    flush_runs(&mut pending, blocks);
}

fn flush_runs(pending: &mut Vec<Text>, blocks: &mut Vec<String>) {
    if pending.iter().any(|text| !text.text.is_empty()) {
        blocks.push(inline_markdown(pending, HARD_BREAK));
    }
    pending.clear();
}

fn push_box(theme: &Option<String>, radius: &Option<String>, children: &[Node], blocks: &mut Vec<String>) {
    let attributes = BoxAttributes {
        theme: theme.clone(),
        radius: radius.clone(),
    };
    blocks.push(format!(":::box{}", attributes.to_marker_suffix()));
    let mut leaves = Vec::new();
    for child in children {
        collect_leaves(child, &mut leaves);
    }
    blocks.push(paragraph_markdown(&leaves));
    blocks.push(":::".to_string());
}

fn collect_leaves(node: &Node, out: &mut Vec<Text>) {
    match node {
        Node::Text(text) => out.push(text.clone()),
        Node::Element(element) => {
            for child in &element.children {
                collect_leaves(child, out);
            }
        }
    }
}

fn leaves_of(element: &Element) -> Vec<Text> {
    let mut leaves = Vec::new();
    for child in &element.children {
        collect_leaves(child, &mut leaves);
    }
    leaves
}

fn paragraph_markdown(leaves: &[Text]) -> String {
    if leaves.iter().all(|leaf| leaf.text.is_empty()) {
        EMPTY_PARAGRAPH.to_string()
    } else {
        inline_markdown(leaves, HARD_BREAK)
    }
}

fn block_markdown(element: &Element) -> String {
    match &element.kind {
        ElementKind::Heading { level } => {
            let marker = "#".repeat(usize::from((*level).clamp(1, 6)));
            // Headings are single-line, so breaks become character references
            let text = escape_closing_hashes(inline_markdown(&leaves_of(element), "&#10;"));
            if text.is_empty() {
                marker
            } else {
                format!("{marker} {text}")
            }
        }
        ElementKind::CodeBlock { language } => {
            let content = element.children.iter().map(Node::text_content).collect::<String>();
            let fence = "`".repeat(longest_backtick_run(&content).max(2) + 1);
            format!("{fence}{}\n{content}\n{fence}", language.as_deref().unwrap_or(""))
        }
        ElementKind::Divider => "---".to_string(),
        ElementKind::PageBreak => PAGE_BREAK.to_string(),
        // Paragraphs, and list items or boxes that escaped their containers
        _ => paragraph_markdown(&leaves_of(element)),
    }
}

/// A trailing `#` run after whitespace would be read as the heading's
/// closing sequence, so its first `#` is escaped.
fn escape_closing_hashes(mut text: String) -> String {
    let body = text.trim_end_matches('#');
    if body.len() == text.len() {
        return text;
    }
    if body.is_empty() || body.ends_with([' ', '\t']) {
        text.insert(body.len(), '\\');
    }
    text
}

fn list_markdown(list: &Element, alternate: bool) -> String {
    let ordered = list.kind == ElementKind::OrderedList;
    list.children
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let marker = match (ordered, alternate) {
                (false, false) => "-".to_string(),
                (false, true) => "*".to_string(),
                (true, false) => format!("{}.", index + 1),
                (true, true) => format!("{})", index + 1),
            };
            let line_break = format!("{HARD_BREAK}{}", " ".repeat(marker.len() + 1));
            let leaves = match item {
                Node::Element(element) => leaves_of(element),
                Node::Text(text) => vec![text.clone()],
            };
            let text = inline_markdown(&leaves, &line_break);
            if text.is_empty() {
                marker
            } else {
                format!("{marker} {text}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn longest_backtick_run(text: &str) -> usize {
    text.split(|c| c != '`').map(str::len).max().unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Strong,
    Emphasis(char),
    Strikethrough,
}

impl Delimiter {
    fn as_str(self) -> &'static str {
        match self {
            Delimiter::Strong => "**",
            Delimiter::Emphasis('*') => "*",
            Delimiter::Emphasis(_) => "_",
            Delimiter::Strikethrough => "~~",
        }
    }

    fn same_kind(self, other: Delimiter) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

fn wanted_delimiters(marks: &Marks) -> Vec<Delimiter> {
    let mut out = Vec::new();
    if marks.bold == Some(true) {
        out.push(Delimiter::Strong);
    }
    if marks.italic == Some(true) {
        out.push(Delimiter::Emphasis('_'));
    }
    if marks.strikethrough == Some(true) {
        out.push(Delimiter::Strikethrough);
    }
    out
}

/// Render text runs with nested emphasis delimiters.
///
/// Delimiters stay open across runs that share them. Whitespace at the edge
/// of a marked run is moved outside the delimiters so they still flank text.
/// `_` emphasis switches to `*` when it would sit inside a word. Each `\n`
/// is written as `line_break`.
fn inline_markdown(leaves: &[Text], line_break: &str) -> String {
    let leaves: Vec<&Text> = leaves.iter().filter(|leaf| !leaf.text.is_empty()).collect();
    let mut out = String::new();
    let mut open: Vec<Delimiter> = Vec::new();

    for (index, leaf) in leaves.iter().enumerate() {
        let core = leaf.text.trim_matches(' ');
        let wanted = if core.is_empty() { open.clone() } else { wanted_delimiters(&leaf.marks) };
        let leading = &leaf.text[..leaf.text.len() - leaf.text.trim_start_matches(' ').len()];
        let trailing = &leaf.text[leaf.text.trim_end_matches(' ').len()..];
        let is_last = index + 1 == leaves.len();
        let at_block_start = out.is_empty();

        let keep = open
            .iter()
            .take_while(|delimiter| wanted.iter().any(|w| w.same_kind(**delimiter)))
            .count();
        let closes_or_opens = keep < open.len() || wanted.len() > keep;
        for delimiter in open.drain(keep..).rev() {
            out.push_str(delimiter.as_str());
        }

        if core.is_empty() {
            push_escaped(&mut out, &leaf.text, line_break, at_block_start, is_last);
            continue;
        }
        if closes_or_opens {
            push_escaped(&mut out, leading, line_break, at_block_start, false);
        }
        let missing: Vec<Delimiter> = wanted
            .iter()
            .copied()
            .filter(|w| !open.iter().any(|o| o.same_kind(*w)))
            .collect();
        for delimiter in missing {
            let delimiter = match delimiter {
                Delimiter::Emphasis(_) if emphasis_is_intraword(&out, &leaves, index) => Delimiter::Emphasis('*'),
                other => other,
            };
            out.push_str(delimiter.as_str());
            open.push(delimiter);
        }
        let body = if closes_or_opens {
            core
        } else {
            leaf.text.trim_end_matches(' ')
        };
        push_escaped(&mut out, body, line_break, at_block_start && !closes_or_opens, false);

        let next_keeps_all = leaves.get(index + 1).is_some_and(|next| {
            let next_wanted = wanted_delimiters(&next.marks);
            open.iter().all(|o| next_wanted.iter().any(|w| w.same_kind(*o)))
        });
        if !trailing.is_empty() && !next_keeps_all {
            for delimiter in open.drain(..).rev() {
                out.push_str(delimiter.as_str());
            }
        }
        push_escaped(&mut out, trailing, line_break, false, is_last);
    }
    for delimiter in open.drain(..).rev() {
        out.push_str(delimiter.as_str());
    }
    out
}

/// Whether an emphasis span opening at leaf `index` touches a word character
/// on either side
fn emphasis_is_intraword(out: &str, leaves: &[&Text], index: usize) -> bool {
    let before = out.chars().next_back().is_some_and(char::is_alphanumeric);
    let after = leaves[index..]
        .iter()
        .skip_while(|leaf| leaf.marks.italic == Some(true))
        .find_map(|leaf| leaf.text.chars().next())
        .is_some_and(char::is_alphanumeric);
    before || after
}

/// Escape Markdown-significant characters. Spaces at a line edge are written
/// as entities so they survive parsing.
fn push_escaped(out: &mut String, text: &str, line_break: &str, at_block_start: bool, is_last: bool) {
    let chars: Vec<char> = text.chars().collect();
    let mut line_start = at_block_start;
    for (index, &c) in chars.iter().enumerate() {
        let next = chars.get(index + 1).copied();
        match c {
            '\n' => {
                out.push_str(line_break);
                line_start = line_break.contains('\n');
                continue;
            }
            ' ' | '\t' if line_start || next == Some('\n') || (next.is_none() && is_last) => {
                out.push_str(if c == ' ' { "&#32;" } else { "&#9;" });
                continue;
            }
            '\\' | '*' | '_' | '`' | '~' | '[' | ']' | '<' | '>' | '&' | '|' => {
                out.push('\\');
                out.push(c);
            }
            '#' | '-' | '+' | '=' | ':' if line_start => {
                out.push('\\');
                out.push(c);
            }
            '.' | ')' if line_start_is_number(out) => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        line_start = false;
    }
}

/// The current output line so far is only digits, so `.`/`)` would start an ordered list
fn line_start_is_number(out: &str) -> bool {
    let line = out.rsplit('\n').next().unwrap_or(out);
    let line = line.trim_start_matches(' ');
    !line.is_empty() && line.len() <= 9 && line.chars().all(|c| c.is_ascii_digit())
}
