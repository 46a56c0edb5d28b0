use chrono::Utc;

use crate::model::card::{Background, Card, CardId, CardStylesPatch, CardTemplate, clamp_width};
use crate::model::node::Node;
use crate::model::normalize::normalize_document;
use crate::session::ContentObserver;

/// In-memory collection of cards with the focus the toolbar acts on.
///
/// The store always holds at least one card: it is created with one and
/// refuses to delete the last.
#[derive(Debug, Clone)]
pub struct CardStore {
    cards: Vec<Card>,
    focused: Option<CardId>,
    template: CardTemplate,
}

impl CardStore {
    pub fn new(template: CardTemplate) -> Self {
        let first = Card::new(&template, Utc::now().timestamp_millis());
        let focused = Some(first.id.clone());
        Self {
            cards: vec![first],
            focused,
            template,
        }
    }

    /// Build a store from already validated cards. Returns `None` for an empty list.
    pub fn from_cards(cards: Vec<Card>, template: CardTemplate) -> Option<Self> {
        let focused = cards.first()?.id.clone();
        Some(Self {
            cards,
            focused: Some(focused),
            template,
        })
    }

    /// Cards in insertion order
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Cards ordered by their `order` key
    pub fn sorted_cards(&self) -> Vec<&Card> {
        let mut sorted: Vec<&Card> = self.cards.iter().collect();
        sorted.sort_by_key(|card| card.order);
        sorted
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|card| &card.id == id)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.get(id).is_some()
    }

    pub fn focused(&self) -> Option<&CardId> {
        self.focused.as_ref()
    }

    pub fn focus_card(&mut self, id: &CardId) {
        if self.contains(id) {
            self.focused = Some(id.clone());
        }
    }

    fn next_order(&self) -> i64 {
        self.cards.iter().map(|card| card.order).max().unwrap_or(0) + 1
    }

    /// Append a card built from the template and focus it
    pub fn add_card(&mut self) -> CardId {
        let card = Card::new(&self.template, self.next_order());
        let id = card.id.clone();
        self.cards.push(card);
        self.focused = Some(id.clone());
        id
    }

    /// Delete a card. Deleting the only card is a no-op and returns `false`.
    ///
    /// When the focused card is deleted, focus moves to the card before it in
    /// display order (or the first remaining card).
    pub fn delete_card(&mut self, id: &CardId) -> bool {
        if self.cards.len() <= 1 || !self.contains(id) {
            return false;
        }

        if self.focused.as_ref() == Some(id) {
            let sorted = self.sorted_cards();
            let deleted_index = sorted.iter().position(|card| &card.id == id).unwrap_or(0);
            let target = if deleted_index > 0 {
                sorted.get(deleted_index - 1)
            } else {
                sorted.get(1)
            };
            self.focused = target.map(|card| card.id.clone());
        }

        self.cards.retain(|card| &card.id != id);
        true
    }

    /// Deep-copy a card under a fresh id, order and timestamps. The copy is focused.
    pub fn duplicate_card(&mut self, id: &CardId) -> Option<CardId> {
        let mut copy = self.get(id)?.clone();
        copy.id = CardId::new();
        copy.order = self.next_order();
        copy.metadata = crate::model::card::CardMetadata::now();
        let new_id = copy.id.clone();
        self.cards.push(copy);
        self.focused = Some(new_id.clone());
        Some(new_id)
    }

    /// Replace a card's document. Empty content is replaced by a default paragraph.
    pub fn update_card_content(&mut self, id: &CardId, content: Vec<Node>) -> bool {
        self.update(id, |card| card.content = normalize_document(content))
    }

    pub fn update_card_background(&mut self, id: &CardId, background: Background) -> bool {
        self.update(id, |card| card.background = background)
    }

    pub fn update_card_styles(&mut self, id: &CardId, patch: CardStylesPatch) -> bool {
        self.update(id, |card| card.styles.merge(patch))
    }

    /// Set a card's width, clamped to the draggable range
    pub fn update_card_width(&mut self, id: &CardId, width: u32) -> bool {
        self.update(id, |card| card.width = clamp_width(width))
    }

    fn update(&mut self, id: &CardId, f: impl FnOnce(&mut Card)) -> bool {
        match self.cards.iter_mut().find(|card| &card.id == id) {
            Some(card) => {
                f(card);
                card.touch();
                true
            }
            None => false,
        }
    }

    /// Swap in a complete card list (project import). Empty lists are refused.
    pub(crate) fn replace_cards(&mut self, cards: Vec<Card>) -> bool {
        let Some(first) = cards.first() else {
            return false;
        };
        self.focused = Some(first.id.clone());
        self.cards = cards;
        true
    }
}

impl Default for CardStore {
    fn default() -> Self {
        Self::new(CardTemplate::default())
    }
}

impl ContentObserver for CardStore {
    fn content_changed(&mut self, card_id: &CardId, content: &[Node]) {
        if !self.update_card_content(card_id, content.to_vec()) {
            log::warn!("content change for unknown card {card_id}");
        }
    }
}
