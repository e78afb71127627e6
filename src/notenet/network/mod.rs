//! # Network Layer
//!
//! Notes live on a document network this crate does not implement. The traits
//! here are the whole surface the rest of the crate uses:
//!
//! - [`DocumentNetwork`]: turns a [`Seed`] into an authenticated [`Session`]
//! - [`Session`]: keyed records per identity, document create and load
//! - [`Document`]: a handle to one loaded document, which can be updated
//!
//! ## Implementations
//!
//! - [`memory::InMemoryNetwork`]: shared in-process network with fault
//!   injection, used by tests
//! - [`fs::FileNetwork`]: documents and records as JSON files under a root
//!   directory, used by the CLI
//!
//! ```text
//! <root>/
//! ├── streams/<stream-id>.json        # metadata, current content, commit log
//! └── records/<did>/<definition>.json # keyed record per identity
//! ```
//!
//! Handles are shared (`Arc`) so the reducer can hold one without owning the
//! document: all content changes go through [`Document::update`].
//!
//! Both adapters resolve an id carrying a `?version=` suffix to the stream
//! head ([`DocId::head`]). Neither keeps addressable past versions.

use crate::error::{NotesError, Result};
use crate::model::{DocId, Seed};
use crate::schema::SchemaKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub mod fs;
pub mod memory;

/// Metadata attached to a document at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub controllers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<DocId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl DocumentMetadata {
    pub fn controlled_by(did: impl Into<String>) -> Self {
        Self {
            controllers: vec![did.into()],
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: DocId) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }
}

#[async_trait]
pub trait Document: Send + Sync + fmt::Debug {
    fn id(&self) -> &DocId;

    /// Content as of the last load or update through this handle.
    fn content(&self) -> Value;

    fn metadata(&self) -> &DocumentMetadata;

    /// Replace the document content with a new commit.
    async fn update(&self, content: Value) -> Result<()>;
}

pub type DocumentHandle = Arc<dyn Document>;

/// An authenticated connection to the network for one identity.
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    /// The identity this session writes as.
    fn did(&self) -> &str;

    /// Read the record this identity keeps under a definition.
    async fn get_record(&self, definition: &DocId) -> Result<Option<Value>>;

    /// Replace the record this identity keeps under a definition.
    async fn set_record(&self, definition: &DocId, value: Value) -> Result<()>;

    async fn create_document(
        &self,
        content: Value,
        metadata: DocumentMetadata,
    ) -> Result<DocumentHandle>;

    async fn load_document(&self, id: &DocId) -> Result<DocumentHandle>;
}

pub type SessionHandle = Arc<dyn Session>;

#[async_trait]
pub trait DocumentNetwork: Send + Sync + 'static {
    async fn create_session(&self, seed: &Seed) -> Result<SessionHandle>;
}

/// Check `content` against a schema document, when it is one we know.
pub(crate) fn enforce_schema(schema_doc: Option<&Value>, content: &Value) -> Result<()> {
    match schema_doc.and_then(SchemaKind::detect) {
        Some(kind) => kind.validate(content),
        None => Ok(()),
    }
}

/// The schema a definition document points its records at.
pub(crate) fn definition_schema(definition: &Value) -> Option<DocId> {
    definition.get("schema")?.as_str()?.parse().ok()
}

pub(crate) fn ensure_controller(metadata: &DocumentMetadata, did: &str, id: &DocId) -> Result<()> {
    if metadata.controllers.iter().any(|c| c == did) {
        Ok(())
    } else {
        Err(NotesError::Network(format!("{} is not a controller of {}", did, id)))
    }
}
