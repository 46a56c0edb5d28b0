use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::model::node::{Node, Text};
use crate::model::normalize::nodes_from_value;

/// Narrowest and widest card a user can drag to, in pixels
pub const MIN_CARD_WIDTH: u32 = 300;
pub const MAX_CARD_WIDTH: u32 = 1200;

/// Opaque card identifier. New cards get a UUID v4; imported ids are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Color,
    Gradient,
    Image,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundEffects {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
}

/// Card background: a CSS color, a CSS gradient, or an image URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(rename = "type")]
    pub kind: BackgroundKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<BackgroundEffects>,
}

impl Background {
    pub fn color(value: impl Into<String>) -> Self {
        Self {
            kind: BackgroundKind::Color,
            value: value.into(),
            effects: Some(BackgroundEffects {
                opacity: Some(1.0),
                blur: Some(0.0),
                brightness: Some(100.0),
                ..BackgroundEffects::default()
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStyles {
    pub padding: String,
    pub default_font: String,
    pub default_size: String,
    pub default_color: String,
    pub line_height: f64,
}

/// Partial style update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardStylesPatch {
    pub padding: Option<String>,
    pub default_font: Option<String>,
    pub default_size: Option<String>,
    pub default_color: Option<String>,
    pub line_height: Option<f64>,
}

impl CardStyles {
    pub fn merge(&mut self, patch: CardStylesPatch) {
        if let Some(padding) = patch.padding {
            self.padding = padding;
        }
        if let Some(font) = patch.default_font {
            self.default_font = font;
        }
        if let Some(size) = patch.default_size {
            self.default_size = size;
        }
        if let Some(color) = patch.default_color {
            self.default_color = color;
        }
        if let Some(line_height) = patch.line_height {
            self.line_height = line_height;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CardMetadata {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }
}

/// Settings used when a new card is created
#[derive(Debug, Clone, PartialEq)]
pub struct CardTemplate {
    pub width: u32,
    pub background: Background,
    pub styles: CardStyles,
    pub placeholder_text: String,
}

impl Default for CardTemplate {
    fn default() -> Self {
        Self {
            width: 600,
            background: Background::color("#ffffff"),
            styles: CardStyles {
                padding: "40px".to_string(),
                default_font: "Inter, sans-serif".to_string(),
                default_size: "16px".to_string(),
                default_color: "#000000".to_string(),
                line_height: 1.5,
            },
            placeholder_text: "Start editing your card...".to_string(),
        }
    }
}

/// A card: one document plus the presentation settings it is exported with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub order: i64,
    pub background: Background,
    #[serde(deserialize_with = "deserialize_content", default = "default_content")]
    pub content: Vec<Node>,
    pub styles: CardStyles,
    pub width: u32,
    pub metadata: CardMetadata,
}

impl Card {
    pub fn new(template: &CardTemplate, order: i64) -> Self {
        Self {
            id: CardId::new(),
            order,
            background: template.background.clone(),
            content: vec![Node::paragraph(vec![Node::Text(Text::new(
                template.placeholder_text.clone(),
            ))])],
            styles: template.styles.clone(),
            width: clamp_width(template.width),
            metadata: CardMetadata::now(),
        }
    }

    pub(crate) fn touch(&mut self) {
        self.metadata.updated_at = Utc::now();
    }
}

pub fn clamp_width(width: u32) -> u32 {
    width.clamp(MIN_CARD_WIDTH, MAX_CARD_WIDTH)
}

fn default_content() -> Vec<Node> {
    vec![Node::empty_paragraph()]
}

fn deserialize_content<'de, D>(deserializer: D) -> Result<Vec<Node>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(nodes_from_value(value))
}
