pub mod card;
pub mod card_store;
pub mod node;
pub mod normalize;
pub mod project;

pub use card::{
    Background, BackgroundEffects, BackgroundKind, Card, CardId, CardMetadata, CardStyles, CardStylesPatch,
    CardTemplate, MAX_CARD_WIDTH, MIN_CARD_WIDTH,
};
pub use card_store::CardStore;
pub use node::{
    Align, Element, ElementKind, ElementType, FlagMark, MarkChange, Marks, Node, StyleMark, Text, UnknownName,
};
pub use normalize::{check_document, nodes_from_value, normalize_document};
pub use project::{ProjectError, ProjectFile, PROJECT_VERSION, export_project, import_project};
