//! Keystroke-driven structural rewrites.
//!
//! Each input event runs through an ordered list of handlers. A handler either
//! consumes the event ([`Handled::Yes`]), declines it ([`Handled::No`]) or
//! fails; a failing handler is rolled back and the chain moves on, so a broken
//! special case degrades to plain editing. When nothing consumes the event the
//! default behaviour runs.

pub mod attrs;
pub mod backspace;
pub mod enter;
pub mod paste;
pub mod shortcuts;

use crate::editing::{Document, EditError};
use crate::model::node::Marks;

/// One user input, already decoded from whatever key or clipboard event produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    InsertText(String),
    InsertBreak { shift: bool },
    InsertSoftBreak,
    DeleteBackward,
    DeleteForward,
    Paste(String),
}

/// State that influences how an event is handled but is not part of the document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputContext {
    /// An IME composition is in progress; only default behaviour runs
    pub composing: bool,
    /// Marks chosen from the toolbar with a collapsed caret, applied to typed text
    pub pending_marks: Option<Marks>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Yes,
    No,
}

pub type Handler = fn(&mut Document, &InputEvent, &InputContext) -> Result<Handled, EditError>;

/// Ordered handler chain
#[derive(Clone)]
pub struct Pipeline {
    handlers: Vec<(&'static str, Handler)>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// The editor's handler chain: Markdown shortcuts, then the backspace,
    /// delete, Enter and paste special cases.
    pub fn standard() -> Self {
        Self::new()
            .with("shortcuts", shortcuts::handle)
            .with("box-markers", shortcuts::handle_box_markers)
            .with("backspace", backspace::handle_backward)
            .with("delete", backspace::handle_forward)
            .with("enter", enter::handle)
            .with("paste", paste::handle)
    }

    pub fn with(mut self, name: &'static str, handler: Handler) -> Self {
        self.handlers.push((name, handler));
        self
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|(name, _)| *name).collect()
    }

    /// Run `event` through the chain, falling back to [`default_behaviour`].
    pub fn run(&self, doc: &mut Document, event: &InputEvent, context: &InputContext) -> Result<(), EditError> {
        if !context.composing {
            for (name, handler) in &self.handlers {
                match doc.transaction(|doc| handler(doc, event, context)) {
                    Ok(Handled::Yes) => {
                        log::debug!("{name} handled {event:?}");
                        return Ok(());
                    }
                    Ok(Handled::No) => {}
                    Err(e) => log::debug!("{name} failed on {event:?}, falling back: {e}"),
                }
            }
        }
        doc.transaction(|doc| default_behaviour(doc, event, context))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.handler_names()).finish()
    }
}

/// What an event does when no special case applies
pub fn default_behaviour(doc: &mut Document, event: &InputEvent, context: &InputContext) -> Result<(), EditError> {
    match event {
        InputEvent::InsertText(text) => doc.insert_text_at_selection(text, context.pending_marks.as_ref()),
        InputEvent::InsertSoftBreak => doc.insert_text_at_selection("\n", context.pending_marks.as_ref()),
        InputEvent::Paste(text) => doc.insert_text_at_selection(text, None),
        InputEvent::InsertBreak { .. } => {
            doc.delete_selection()?;
            let caret = doc.caret().cloned().ok_or(EditError::NoSelection)?;
            doc.split_node(&caret, true)?;
            Ok(())
        }
        InputEvent::DeleteBackward => doc.delete_backward(),
        InputEvent::DeleteForward => doc.delete_forward(),
    }
}
