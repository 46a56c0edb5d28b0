// Shared by several bench targets; each one only uses part of it
#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with **bold** and _italic_ text.\n\n- Bullet point\n- Another item\n\n1. First\n2. Second\n\n:::box{theme=\"dark\",radius=\"8px\"}\nBoxed content\n:::\n\n```rust\nfn example() {}\n```\n\n---\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_paragraphs(count: usize) -> String {
    (0..count)
        .map(|i| format!("Paragraph {i} with some content to edit."))
        .collect::<Vec<_>>()
        .join("\n\n")
}
