use thiserror::Error;

pub type AdResult<T> = Result<T, AdError>;

#[derive(Error, Debug)]
pub enum AdError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid item reference: {0}")]
    InvalidItemRef(String),

    #[error("Placement {placement} already displays {item}")]
    SameItem { placement: String, item: String },

    #[error("Placement type {placement_type} does not allow {item} (type {item_type})")]
    DisallowedItem {
        placement_type: String,
        item: String,
        item_type: String,
    },

    #[error("Unknown placement type: {0}")]
    UnknownPlacementType(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
