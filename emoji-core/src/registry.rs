//! Registry of named documents.
//!
//! Maps each document to a unique display name and to the gateway slot its
//! serialized bytes live in. The index itself is stored in the reserved
//! [`REGISTRY_SLOT`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::PersistenceGateway;
use crate::{CanvasDocument, CoreError, CoreResult};

/// Slot holding the registry index.
pub const REGISTRY_SLOT: &str = "registry";

/// Base name for documents created without a name.
pub const UNTITLED: &str = "Untitled";

/// Unique identifier for a registered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new unique document ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Document identity.
    pub id: DocumentId,
    /// Display name, unique within the registry.
    pub name: String,
}

impl DocumentEntry {
    /// Gateway slot holding this document's bytes.
    #[must_use]
    pub fn slot(&self) -> String {
        format!("doc-{}", self.id)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryIndex {
    #[serde(default)]
    documents: Vec<DocumentEntry>,
}

/// Named documents stored through a [`PersistenceGateway`].
#[derive(Debug)]
pub struct DocumentRegistry<G> {
    gateway: G,
    entries: Vec<DocumentEntry>,
}

impl<G: PersistenceGateway> DocumentRegistry<G> {
    /// Load the registry index from `gateway`.
    ///
    /// A missing or malformed index yields an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway cannot be read.
    pub fn open(gateway: G) -> CoreResult<Self> {
        let entries = match gateway.read(REGISTRY_SLOT)? {
            Some(bytes) => match serde_json::from_slice::<RegistryIndex>(&bytes) {
                Ok(index) => index.documents,
                Err(e) => {
                    tracing::warn!("Ignoring malformed registry index: {e}");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        tracing::debug!(count = entries.len(), "Opened document registry");
        Ok(Self { gateway, entries })
    }

    /// The underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Register a new, empty document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NameInUse`] if `name` is taken, or a gateway error
    /// if the index cannot be saved.
    pub fn create(&mut self, name: Option<&str>) -> CoreResult<DocumentEntry> {
        let name = match name {
            Some(name) => {
                self.ensure_name_free(name, None)?;
                name.to_string()
            }
            None => self.untitled_name(),
        };
        let entry = DocumentEntry {
            id: DocumentId::new(),
            name,
        };
        self.entries.push(entry.clone());
        self.save()?;
        tracing::info!(id = %entry.id, name = %entry.name, "Created document");
        Ok(entry)
    }

    /// Rename a document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DocumentNotFound`], [`CoreError::NameInUse`], or a
    /// gateway error.
    pub fn rename(&mut self, id: DocumentId, name: &str) -> CoreResult<()> {
        self.ensure_name_free(name, Some(id))?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| CoreError::DocumentNotFound(id.to_string()))?;
        entry.name = name.to_string();
        self.save()
    }

    /// Remove a document and its stored bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DocumentNotFound`] or a gateway error.
    pub fn delete(&mut self, id: DocumentId) -> CoreResult<DocumentEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| CoreError::DocumentNotFound(id.to_string()))?;
        let entry = self.entries.remove(index);
        self.gateway.delete(&entry.slot())?;
        self.save()?;
        tracing::info!(id = %entry.id, name = %entry.name, "Deleted document");
        Ok(entry)
    }

    /// All documents, sorted by name.
    #[must_use]
    pub fn documents(&self) -> Vec<&DocumentEntry> {
        let mut docs: Vec<_> = self.entries.iter().collect();
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        docs
    }

    /// Look up a document by id.
    #[must_use]
    pub fn get(&self, id: DocumentId) -> Option<&DocumentEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Gateway slot of a registered document.
    #[must_use]
    pub fn slot(&self, id: DocumentId) -> Option<String> {
        self.get(id).map(DocumentEntry::slot)
    }

    /// Look up a document by id string or by name.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&DocumentEntry> {
        if let Ok(id) = DocumentId::parse(key) {
            if let Some(entry) = self.get(id) {
                return Some(entry);
            }
        }
        self.entries.iter().find(|e| e.name == key)
    }

    /// Load a document's contents, or an empty document if never saved.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DocumentNotFound`] or a gateway read error.
    pub fn load_document(&self, id: DocumentId) -> CoreResult<CanvasDocument> {
        let entry = self
            .get(id)
            .ok_or_else(|| CoreError::DocumentNotFound(id.to_string()))?;
        Ok(self
            .gateway
            .read(&entry.slot())?
            .map(|bytes| CanvasDocument::from_bytes_or_default(&bytes))
            .unwrap_or_default())
    }

    fn ensure_name_free(&self, name: &str, owner: Option<DocumentId>) -> CoreResult<()> {
        let taken = self
            .entries
            .iter()
            .any(|e| e.name == name && Some(e.id) != owner);
        if taken {
            return Err(CoreError::NameInUse(name.to_string()));
        }
        Ok(())
    }

    fn untitled_name(&self) -> String {
        let mut candidate = UNTITLED.to_string();
        let mut n = 1;
        while self.entries.iter().any(|e| e.name == candidate) {
            n += 1;
            candidate = format!("{UNTITLED} {n}");
        }
        candidate
    }

    fn save(&self) -> CoreResult<()> {
        let index = RegistryIndex {
            documents: self.entries.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&index)?;
        self.gateway.write(REGISTRY_SLOT, &bytes)
    }
}
