use std::fs;
use std::path::{Path, PathBuf};

use crate::markdown::document_to_markdown;
use crate::model::card::{Card, CardTemplate};
use crate::model::card_store::CardStore;
use crate::model::project::{ProjectError, ProjectFile, export_project, import_project};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid project file {path}: {source}")]
    Project {
        path: PathBuf,
        #[source]
        source: ProjectError,
    },
}

pub fn read_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

/// Write `content`, creating parent directories as needed
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::write(path, content)?)
}

/// Open a project file as a new store
pub fn load_project(path: &Path, template: CardTemplate) -> Result<CardStore, IoError> {
    let json = read_file(path)?;
    let project = ProjectFile::parse(&json).map_err(|source| IoError::Project {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("loaded {} cards from {}", project.cards.len(), path.display());
    CardStore::from_cards(project.cards, template).ok_or_else(|| IoError::Project {
        path: path.to_path_buf(),
        source: ProjectError::Empty,
    })
}

/// Replace the cards of `store` with those in the file. The store is
/// untouched when the file cannot be read or is invalid.
pub fn import_project_file(store: &mut CardStore, path: &Path) -> Result<usize, IoError> {
    let json = read_file(path)?;
    import_project(store, &json).map_err(|source| IoError::Project {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_project(store: &CardStore, path: &Path) -> Result<(), IoError> {
    let json = export_project(store).map_err(|source| IoError::Project {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, &json)?;
    log::info!("saved {} cards to {}", store.len(), path.display());
    Ok(())
}

/// Write one card's document as Markdown into `dir`, named after the card id
pub fn save_card_markdown(card: &Card, dir: &Path) -> Result<PathBuf, IoError> {
    let path = dir.join(format!("{}.md", card.id));
    write_file(&path, &document_to_markdown(&card.content))?;
    Ok(path)
}
