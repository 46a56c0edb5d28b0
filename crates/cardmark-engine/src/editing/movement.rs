use unicode_segmentation::UnicodeSegmentation;

use crate::editing::document::Document;
use crate::editing::error::EditError;
use crate::editing::location::{Path, Point, Range};
use crate::editing::tree;

/// Caret movement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// One grapheme cluster
    Character,
    /// To the next or previous Unicode word boundary
    Word,
    /// One `\n`-separated line, keeping the column where possible
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub unit: Unit,
    pub reverse: bool,
}

impl Movement {
    pub fn forward(unit: Unit) -> Self {
        Self { unit, reverse: false }
    }

    pub fn backward(unit: Unit) -> Self {
        Self { unit, reverse: true }
    }
}

impl Document {
    /// Move the caret. An expanded selection first collapses to the edge in
    /// the direction of travel; character steps stop there.
    pub fn move_selection(&mut self, movement: Movement) -> Result<(), EditError> {
        let range = self.selection.clone().ok_or(EditError::NoSelection)?;
        let (start, end) = range.edges();
        let from = if movement.reverse { start.clone() } else { end.clone() };
        if range.is_expanded() && movement.unit == Unit::Character {
            return self.select(from);
        }
        let target = self.step(&from, movement).unwrap_or(from);
        self.select(target)
    }

    /// Move only the focus, growing or shrinking the selection
    pub fn extend_selection(&mut self, movement: Movement) -> Result<(), EditError> {
        let range = self.selection.clone().ok_or(EditError::NoSelection)?;
        let focus = self.step(&range.focus, movement).unwrap_or(range.focus);
        self.set_selection(Some(Range::new(range.anchor, focus)))
    }

    pub fn position_before(&self, point: &Point, unit: Unit) -> Option<Point> {
        self.step(point, Movement::backward(unit))
    }

    pub fn position_after(&self, point: &Point, unit: Unit) -> Option<Point> {
        self.step(point, Movement::forward(unit))
    }

    fn step(&self, point: &Point, movement: Movement) -> Option<Point> {
        let (block, _) = tree::block_above(&self.children, &point.path)?;
        let text = tree::node(&self.children, &block)?.text_content();
        let offset = tree::block_offset(&self.children, &block, point)?;

        let within = match (movement.unit, movement.reverse) {
            (Unit::Character, false) => next_grapheme(&text, offset),
            (Unit::Character, true) => previous_grapheme(&text, offset),
            (Unit::Word, false) => next_word_end(&text, offset),
            (Unit::Word, true) => previous_word_start(&text, offset),
            (Unit::Line, false) => line_below(&text, offset),
            (Unit::Line, true) => line_above(&text, offset),
        };
        if let Some(target) = within {
            return tree::point_at_block_offset(&self.children, &block, target);
        }

        let neighbour = self.adjacent_block(&block, movement.reverse);
        match (neighbour, movement.reverse) {
            (Some(next), false) => {
                let target = match movement.unit {
                    Unit::Line => {
                        let next_text = tree::node(&self.children, &next)?.text_content();
                        offset_at_column(&next_text, 0, line_end(&next_text, 0), column(&text, offset))
                    }
                    _ => 0,
                };
                tree::point_at_block_offset(&self.children, &next, target)
            }
            (Some(previous), true) => {
                let previous_text = tree::node(&self.children, &previous)?.text_content();
                let target = match movement.unit {
                    Unit::Line => {
                        let start = line_start(&previous_text, previous_text.len());
                        offset_at_column(&previous_text, start, previous_text.len(), column(&text, offset))
                    }
                    _ => previous_text.len(),
                };
                tree::point_at_block_offset(&self.children, &previous, target)
            }
            (None, false) if movement.unit == Unit::Line => self.block_end(&block),
            (None, true) if movement.unit == Unit::Line => tree::start_point(&self.children, &block),
            (None, _) => None,
        }
    }

    fn block_end(&self, block: &Path) -> Option<Point> {
        tree::end_point(&self.children, block)
    }
}

fn next_grapheme(text: &str, offset: usize) -> Option<usize> {
    text.get(offset..)?
        .grapheme_indices(true)
        .next()
        .map(|(index, grapheme)| offset + index + grapheme.len())
}

fn previous_grapheme(text: &str, offset: usize) -> Option<usize> {
    text.get(..offset)?
        .grapheme_indices(true)
        .next_back()
        .map(|(index, _)| index)
}

fn is_word(segment: &str) -> bool {
    segment.chars().any(char::is_alphanumeric)
}

fn next_word_end(text: &str, offset: usize) -> Option<usize> {
    if offset >= text.len() {
        return None;
    }
    let end = text
        .split_word_bound_indices()
        .map(|(start, segment)| (start + segment.len(), segment))
        .find(|(end, segment)| *end > offset && is_word(segment))
        .map(|(end, _)| end);
    Some(end.unwrap_or(text.len()))
}

fn previous_word_start(text: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return None;
    }
    let start = text
        .split_word_bound_indices()
        .rev()
        .find(|(start, segment)| *start < offset && is_word(segment))
        .map(|(start, _)| start);
    Some(start.unwrap_or(0))
}

fn line_start(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |index| index + 1)
}

fn line_end(text: &str, offset: usize) -> usize {
    text[offset..].find('\n').map_or(text.len(), |index| offset + index)
}

fn column(text: &str, offset: usize) -> usize {
    text[line_start(text, offset)..offset].graphemes(true).count()
}

fn offset_at_column(text: &str, start: usize, end: usize, column: usize) -> usize {
    text[start..end]
        .grapheme_indices(true)
        .nth(column)
        .map_or(end, |(index, _)| start + index)
}

fn line_below(text: &str, offset: usize) -> Option<usize> {
    let end = line_end(text, offset);
    if end == text.len() {
        return None;
    }
    let next_start = end + 1;
    Some(offset_at_column(text, next_start, line_end(text, next_start), column(text, offset)))
}

fn line_above(text: &str, offset: usize) -> Option<usize> {
    let start = line_start(text, offset);
    if start == 0 {
        return None;
    }
    let previous_start = line_start(text, start - 1);
    Some(offset_at_column(text, previous_start, start - 1, column(text, offset)))
}
