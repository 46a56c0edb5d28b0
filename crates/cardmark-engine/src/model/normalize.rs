//! Structural validation for trees that arrive from outside the editor
//! (persisted project files, initial card content, converter output).
//!
//! Malformed data never fails a whole card: broken blocks are replaced by a
//! default paragraph and repairable shapes are repaired in place.

use serde_json::Value;

use crate::model::node::{Element, ElementKind, Node};

/// Load a document from untrusted JSON, coercing anything unusable.
///
/// A non-array or empty value yields a single empty paragraph. Each top-level
/// entry that does not deserialize as a node is replaced by an empty paragraph.
pub fn nodes_from_value(value: Value) -> Vec<Node> {
    let Value::Array(items) = value else {
        log::warn!("document content is not an array, substituting a default paragraph");
        return vec![Node::empty_paragraph()];
    };

    let nodes = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match serde_json::from_value::<Node>(item) {
            Ok(node) => node,
            Err(e) => {
                log::warn!("block {index} is malformed ({e}), substituting a default paragraph");
                Node::empty_paragraph()
            }
        })
        .collect();

    normalize_document(nodes)
}

/// Repair a tree so it satisfies the document invariants.
pub fn normalize_document(nodes: Vec<Node>) -> Vec<Node> {
    let mut blocks: Vec<Node> = nodes.into_iter().map(normalize_top_level).collect();
    if blocks.is_empty() {
        blocks.push(Node::empty_paragraph());
    }
    blocks
}

/// Check the invariants without repairing. Returns a description of the first violation.
pub fn check_document(nodes: &[Node]) -> Result<(), String> {
    if nodes.is_empty() {
        return Err("document has no blocks".to_string());
    }
    for (index, node) in nodes.iter().enumerate() {
        match node {
            Node::Text(_) => return Err(format!("leaf at top level index {index}")),
            Node::Element(element) => {
                if element.is_inline() {
                    return Err(format!("inline box at top level index {index}"));
                }
                check_element(element, &index.to_string())?;
            }
        }
    }
    Ok(())
}

fn check_element(element: &Element, at: &str) -> Result<(), String> {
    if element.children.is_empty() {
        return Err(format!("{} at {at} has no children", element.element_type()));
    }
    for (index, child) in element.children.iter().enumerate() {
        let child_at = format!("{at}.{index}");
        if element.is_list() {
            match child {
                Node::Element(item) if matches!(item.kind, ElementKind::ListItem) => {}
                _ => return Err(format!("non list-item child in list at {child_at}")),
            }
        } else if holds_inline_content(element) && !child.is_inline() {
            return Err(format!("block element inside {} at {child_at}", element.element_type()));
        }
        if let Node::Element(child) = child {
            check_element(child, &child_at)?;
        }
    }
    Ok(())
}

/// Every element except the two list containers holds inline content (leaves and boxes)
fn holds_inline_content(element: &Element) -> bool {
    !element.is_list()
}

fn normalize_top_level(node: Node) -> Node {
    match node {
        Node::Text(text) => Node::paragraph(vec![Node::Text(text)]),
        Node::Element(element) if element.is_inline() => {
            // Legacy top-level box: canonical form is paragraph > box
            Node::paragraph(vec![Node::Element(normalize_element(element))])
        }
        Node::Element(mut element) => {
            if matches!(element.kind, ElementKind::ListItem) {
                element.kind = ElementKind::Paragraph;
            }
            Node::Element(normalize_element(element))
        }
    }
}

fn normalize_element(mut element: Element) -> Element {
    if let ElementKind::Heading { level } = &mut element.kind {
        *level = (*level).clamp(1, 6);
    }

    let children = std::mem::take(&mut element.children);
    element.children = if element.is_list() {
        normalize_list_children(children)
    } else {
        normalize_inline_children(children)
    };

    if element.children.is_empty() {
        element.children.push(if element.is_list() {
            Node::element(ElementKind::ListItem, vec![Node::text("")])
        } else {
            Node::text("")
        });
    }
    element
}

fn normalize_list_children(children: Vec<Node>) -> Vec<Node> {
    let mut items = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Element(element) if matches!(element.kind, ElementKind::ListItem) => {
                items.push(Node::Element(normalize_element(element)));
            }
            Node::Element(element) if element.is_list() => {
                // Nested lists are flattened into the outer one
                for item in normalize_list_children(element.children) {
                    items.push(item);
                }
            }
            Node::Element(element) => {
                let inline = normalize_inline_children(vec![Node::Element(element)]);
                items.push(Node::Element(normalize_element(Element::new(
                    ElementKind::ListItem,
                    inline,
                ))));
            }
            Node::Text(text) => {
                items.push(Node::element(ElementKind::ListItem, vec![Node::Text(text)]));
            }
        }
    }
    items
}

fn normalize_inline_children(children: Vec<Node>) -> Vec<Node> {
    let mut inline = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Text(_) => inline.push(child),
            Node::Element(element) if element.is_inline() => {
                let mut boxed = normalize_element(element);
                // Boxes hold plain runs only
                boxed.children = lift_leaves(boxed.children);
                if boxed.children.is_empty() {
                    boxed.children.push(Node::text(""));
                }
                inline.push(Node::Element(boxed));
            }
            Node::Element(element) => {
                // A block where inline content belongs: lift its inline content
                inline.extend(normalize_inline_children(element.children));
            }
        }
    }
    inline
}

fn lift_leaves(children: Vec<Node>) -> Vec<Node> {
    let mut leaves = Vec::new();
    for child in children {
        match child {
            Node::Text(_) => leaves.push(child),
            Node::Element(element) => leaves.extend(lift_leaves(element.children)),
        }
    }
    leaves
}
