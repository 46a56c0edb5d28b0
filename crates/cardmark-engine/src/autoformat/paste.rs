use crate::autoformat::{Handled, InputContext, InputEvent};
use crate::editing::{Document, EditError, tree};
use crate::markdown::markdown_to_document;

/// Paste clipboard text as Markdown. Anything this cannot place (an empty
/// parse, a caret inside a box, a failed insertion) is left to the literal
/// insertion fallback.
pub fn handle(doc: &mut Document, event: &InputEvent, _context: &InputContext) -> Result<Handled, EditError> {
    let InputEvent::Paste(payload) = event else {
        return Ok(Handled::No);
    };
    if doc.selection().is_none() {
        return Ok(Handled::No);
    }
    let nodes = markdown_to_document(payload);
    if nodes.is_empty() {
        log::debug!("paste parsed to nothing, inserting literally");
        return Ok(Handled::No);
    }

    doc.delete_selection()?;
    let caret = doc.caret().cloned().ok_or(EditError::NoSelection)?;
    if tree::box_above(doc.children(), &caret.path).is_some() {
        return Ok(Handled::No);
    }
    doc.insert_fragment(&caret, nodes)?;
    Ok(Handled::Yes)
}
