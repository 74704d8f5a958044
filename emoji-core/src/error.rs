//! Error types for document operations.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred in a persistence gateway.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested document is not in the registry.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// A document name is already taken by another document.
    #[error("Document name already in use: {0}")]
    NameInUse(String),

    /// The requested palette does not exist.
    #[error("Palette not found: {0}")]
    PaletteNotFound(String),

    /// Another palette already has these glyphs.
    #[error("Palette already exists: {0}")]
    PaletteExists(String),

    /// A palette would be left without glyphs.
    #[error("Palette would be empty: {0}")]
    EmptyPalette(String),

    /// A persistence slot identifier is reserved or otherwise unusable.
    #[error("Invalid slot: {0}")]
    InvalidSlot(String),

    /// A gateway write was rejected.
    #[error("Write rejected for slot {0}")]
    WriteRejected(String),
}
