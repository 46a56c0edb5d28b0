use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::card::Card;
use crate::model::card_store::CardStore;

/// Format version written into exported project files
pub const PROJECT_VERSION: &str = "1.0.0";

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("project file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("project file has no cards array")]
    MissingCards,
    #[error("card {index} is invalid: {source}")]
    InvalidCard {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("project file contains no cards")]
    Empty,
}

/// On-disk snapshot of every card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub cards: Vec<Card>,
    pub version: String,
    pub export_date: DateTime<Utc>,
}

impl ProjectFile {
    pub fn from_store(store: &CardStore) -> Self {
        Self {
            cards: store.cards().to_vec(),
            version: PROJECT_VERSION.to_string(),
            export_date: Utc::now(),
        }
    }

    /// Parse and validate a project file.
    ///
    /// `cards` must be an array of cards with at least one entry. Card content
    /// is loaded leniently, but a card missing its other fields fails the whole file.
    pub fn parse(json: &str) -> Result<Self, ProjectError> {
        let mut value: Value = serde_json::from_str(json)?;
        let Some(Value::Array(raw_cards)) = value.get_mut("cards").map(Value::take) else {
            return Err(ProjectError::MissingCards);
        };

        let cards = raw_cards
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                serde_json::from_value::<Card>(raw).map_err(|source| ProjectError::InvalidCard { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if cards.is_empty() {
            return Err(ProjectError::Empty);
        }

        let version = match value.get("version").and_then(Value::as_str) {
            Some(version) => version.to_string(),
            None => {
                log::warn!("project file has no version, assuming {PROJECT_VERSION}");
                PROJECT_VERSION.to_string()
            }
        };
        let export_date = value
            .get("exportDate")
            .and_then(Value::as_str)
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
            .map_or_else(Utc::now, |date| date.with_timezone(&Utc));

        Ok(Self {
            cards,
            version,
            export_date,
        })
    }

    /// File name offered when saving a project, e.g. `cards-project_2024-03-01.json`
    pub fn default_file_name(&self) -> String {
        format!("cards-project_{}.json", self.export_date.format("%Y-%m-%d"))
    }
}

/// Serialize every card in the store as pretty-printed project JSON
pub fn export_project(store: &CardStore) -> Result<String, ProjectError> {
    let project = ProjectFile::from_store(store);
    let json = serde_json::to_string_pretty(&project)?;
    log::info!("exported {} cards", project.cards.len());
    Ok(json)
}

/// Replace the store's cards with those in `json`. On any error the store is
/// left exactly as it was. Returns the number of cards imported.
pub fn import_project(store: &mut CardStore, json: &str) -> Result<usize, ProjectError> {
    let project = ProjectFile::parse(json)?;
    let count = project.cards.len();
    if !store.replace_cards(project.cards) {
        return Err(ProjectError::Empty);
    }
    log::info!("imported {count} cards (format {})", project.version);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::card::CardTemplate;
    use crate::model::node::Node;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_export_then_import_restores_cards() {
        let mut store = CardStore::default();
        store.add_card();
        let json = export_project(&store).unwrap();

        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], "1.0.0");
        assert!(value["exportDate"].is_string());

        let mut other = CardStore::default();
        assert_eq!(import_project(&mut other, &json).unwrap(), 2);
        assert_eq!(other.cards(), store.cards());
        assert_eq!(other.focused(), Some(&store.cards()[0].id));
    }

    #[test]
    fn test_invalid_imports_leave_store_untouched() {
        let mut store = CardStore::default();
        let before = store.cards().to_vec();

        for bad in [
            "not json",
            r#"{"cards": {}}"#,
            r#"{"version": "1.0.0"}"#,
            r#"{"cards": []}"#,
            r#"{"cards": [{"id": "x"}]}"#,
        ] {
            assert!(import_project(&mut store, bad).is_err(), "accepted {bad}");
            assert_eq!(store.cards(), before.as_slice());
        }
    }

    #[test]
    fn test_import_coerces_broken_content_only() {
        let mut card = serde_json::to_value(Card::new(&CardTemplate::default(), 1)).unwrap();
        card["content"] = json!([{ "type": "paragraph" }]);
        let json = json!({ "cards": [card], "version": "1.0.0" }).to_string();

        let mut store = CardStore::default();
        import_project(&mut store, &json).unwrap();

        assert_eq!(store.cards()[0].content, vec![Node::empty_paragraph()]);
    }

    #[test]
    fn test_default_file_name_uses_export_date() {
        let project = ProjectFile {
            cards: Vec::new(),
            version: PROJECT_VERSION.to_string(),
            export_date: DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        assert_eq!(project.default_file_name(), "cards-project_2024-03-01.json");
    }
}
