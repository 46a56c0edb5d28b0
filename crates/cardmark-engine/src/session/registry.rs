use std::collections::HashMap;

use crate::autoformat::InputEvent;
use crate::editing::EditError;
use crate::model::card::CardId;
use crate::model::node::Node;
use crate::session::keys::KeyChord;
use crate::session::{ContentObserver, EditorSession};

/// Editor sessions by card id.
///
/// Sessions are created on first use and live until their card is deleted;
/// switching cards never drops one.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<CardId, EditorSession>,
    active: Option<CardId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `card_id`, created from `content` if there is none yet.
    /// `content` is only called when a session has to be created.
    pub fn get_or_create(&mut self, card_id: &CardId, content: impl FnOnce() -> Vec<Node>) -> &mut EditorSession {
        self.sessions.entry(card_id.clone()).or_insert_with(|| {
            log::debug!("creating editor session for card {card_id}");
            EditorSession::new(card_id.clone(), content())
        })
    }

    pub fn get(&self, card_id: &CardId) -> Option<&EditorSession> {
        self.sessions.get(card_id)
    }

    pub fn get_mut(&mut self, card_id: &CardId) -> Option<&mut EditorSession> {
        self.sessions.get_mut(card_id)
    }

    pub fn contains(&self, card_id: &CardId) -> bool {
        self.sessions.contains_key(card_id)
    }

    /// Make `card_id` the card the toolbar acts on, creating its session if needed
    pub fn set_active(&mut self, card_id: &CardId, content: impl FnOnce() -> Vec<Node>) -> &mut EditorSession {
        self.active = Some(card_id.clone());
        self.get_or_create(card_id, content)
    }

    pub fn active_id(&self) -> Option<&CardId> {
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&EditorSession> {
        self.sessions.get(self.active.as_ref()?)
    }

    pub fn active_mut(&mut self) -> Option<&mut EditorSession> {
        self.sessions.get_mut(self.active.as_ref()?)
    }

    /// Drop the session of a deleted card
    pub fn remove(&mut self, card_id: &CardId) -> Option<EditorSession> {
        if self.active.as_ref() == Some(card_id) {
            self.active = None;
        }
        self.sessions.remove(card_id)
    }

    /// Drop every session whose card no longer exists, e.g. after a project import
    pub fn retain_cards(&mut self, exists: impl Fn(&CardId) -> bool) {
        self.sessions.retain(|card_id, _| exists(card_id));
        if self.active.as_ref().is_some_and(|card_id| !exists(card_id)) {
            self.active = None;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Run an input event in a card's session and report changed content to
    /// `observer`. Input for a card without a session is ignored.
    pub fn handle_input(
        &mut self,
        card_id: &CardId,
        event: &InputEvent,
        observer: &mut impl ContentObserver,
    ) -> Result<bool, EditError> {
        let Some(session) = self.sessions.get_mut(card_id) else {
            log::warn!("input for card {card_id} without an editor session");
            return Ok(false);
        };
        let changed = session.handle_input(event)?;
        if changed {
            observer.content_changed(card_id, session.content());
        }
        Ok(changed)
    }

    pub fn handle_key(
        &mut self,
        card_id: &CardId,
        chord: &KeyChord,
        observer: &mut impl ContentObserver,
    ) -> Result<bool, EditError> {
        let Some(session) = self.sessions.get_mut(card_id) else {
            log::warn!("key {chord} for card {card_id} without an editor session");
            return Ok(false);
        };
        let changed = session.handle_key(chord)?;
        if changed {
            observer.content_changed(card_id, session.content());
        }
        Ok(changed)
    }
}
