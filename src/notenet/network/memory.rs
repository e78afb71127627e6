use super::{
    definition_schema, enforce_schema, ensure_controller, Document, DocumentHandle,
    DocumentMetadata, DocumentNetwork, Session, SessionHandle,
};
use crate::error::{NotesError, Result};
use crate::model::{DocId, Seed};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Clone)]
struct Stream {
    metadata: DocumentMetadata,
    content: Value,
    commits: usize,
}

#[derive(Debug, Default)]
struct Faults {
    sessions: bool,
    creates: bool,
    record_reads: bool,
    record_writes: bool,
    updates: bool,
    loads: HashSet<DocId>,
}

/// Streams, records and load counters are keyed by stream head.
#[derive(Debug, Default)]
struct Shared {
    streams: HashMap<DocId, Stream>,
    records: HashMap<(String, DocId), Value>,
    loads: HashMap<DocId, usize>,
    record_writes: usize,
    faults: Faults,
}

impl Shared {
    fn schema_doc(&self, schema: Option<&DocId>) -> Option<&Value> {
        schema
            .and_then(|id| self.streams.get(&id.head()))
            .map(|s| &s.content)
    }
}

/// In-memory network for tests and development. Does NOT persist data.
///
/// Clones share the same documents and records, so a test can keep one handle
/// for setup and inspection while the app under test owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNetwork {
    shared: Arc<Mutex<Shared>>,
    load_gate: Arc<RwLock<()>>,
}

/// Loads stay pending while this is alive.
pub struct LoadHold(#[allow(dead_code)] OwnedRwLockWriteGuard<()>);

impl InMemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a document on the network directly, bypassing sessions.
    pub async fn seed_document(&self, id: DocId, content: Value, metadata: DocumentMetadata) {
        let mut shared = self.shared.lock().await;
        shared.streams.insert(
            id.head(),
            Stream {
                metadata,
                content,
                commits: 1,
            },
        );
    }

    pub async fn seed_record(&self, did: &str, definition: &DocId, value: Value) {
        let mut shared = self.shared.lock().await;
        shared
            .records
            .insert((did.to_string(), definition.head()), value);
    }

    pub async fn record(&self, did: &str, definition: &DocId) -> Option<Value> {
        let shared = self.shared.lock().await;
        shared
            .records
            .get(&(did.to_string(), definition.head()))
            .cloned()
    }

    pub async fn document_content(&self, id: &DocId) -> Option<Value> {
        let shared = self.shared.lock().await;
        shared.streams.get(&id.head()).map(|s| s.content.clone())
    }

    pub async fn commit_count(&self, id: &DocId) -> usize {
        let shared = self.shared.lock().await;
        shared.streams.get(&id.head()).map(|s| s.commits).unwrap_or(0)
    }

    pub async fn document_count(&self) -> usize {
        self.shared.lock().await.streams.len()
    }

    /// How many loads were requested for `id`, including failed ones.
    pub async fn load_count(&self, id: &DocId) -> usize {
        let shared = self.shared.lock().await;
        shared.loads.get(&id.head()).copied().unwrap_or(0)
    }

    pub async fn record_write_count(&self) -> usize {
        self.shared.lock().await.record_writes
    }

    pub async fn fail_sessions(&self, fail: bool) {
        self.shared.lock().await.faults.sessions = fail;
    }

    pub async fn fail_creates(&self, fail: bool) {
        self.shared.lock().await.faults.creates = fail;
    }

    pub async fn fail_record_reads(&self, fail: bool) {
        self.shared.lock().await.faults.record_reads = fail;
    }

    pub async fn fail_record_writes(&self, fail: bool) {
        self.shared.lock().await.faults.record_writes = fail;
    }

    pub async fn fail_updates(&self, fail: bool) {
        self.shared.lock().await.faults.updates = fail;
    }

    pub async fn fail_loads_of(&self, id: DocId) {
        self.shared.lock().await.faults.loads.insert(id.head());
    }

    /// Hold every load until the returned guard is dropped.
    pub async fn hold_loads(&self) -> LoadHold {
        LoadHold(self.load_gate.clone().write_owned().await)
    }
}

#[async_trait]
impl DocumentNetwork for InMemoryNetwork {
    async fn create_session(&self, seed: &Seed) -> Result<SessionHandle> {
        if self.shared.lock().await.faults.sessions {
            return Err(NotesError::Network("session refused".to_string()));
        }
        Ok(Arc::new(MemorySession {
            did: seed.did(),
            network: self.clone(),
        }))
    }
}

#[derive(Debug)]
struct MemorySession {
    did: String,
    network: InMemoryNetwork,
}

#[async_trait]
impl Session for MemorySession {
    fn did(&self) -> &str {
        &self.did
    }

    async fn get_record(&self, definition: &DocId) -> Result<Option<Value>> {
        let shared = self.network.shared.lock().await;
        if shared.faults.record_reads {
            return Err(NotesError::Network("record read refused".to_string()));
        }
        Ok(shared
            .records
            .get(&(self.did.clone(), definition.head()))
            .cloned())
    }

    async fn set_record(&self, definition: &DocId, value: Value) -> Result<()> {
        let mut shared = self.network.shared.lock().await;
        if shared.faults.record_writes {
            return Err(NotesError::Network("record write refused".to_string()));
        }
        let definition_doc = shared
            .streams
            .get(&definition.head())
            .ok_or_else(|| NotesError::DocumentNotFound(definition.to_string()))?;
        let schema = definition_schema(&definition_doc.content);
        enforce_schema(shared.schema_doc(schema.as_ref()), &value)?;

        shared
            .records
            .insert((self.did.clone(), definition.head()), value);
        shared.record_writes += 1;
        Ok(())
    }

    async fn create_document(
        &self,
        content: Value,
        metadata: DocumentMetadata,
    ) -> Result<DocumentHandle> {
        let mut shared = self.network.shared.lock().await;
        if shared.faults.creates {
            return Err(NotesError::Network("create refused".to_string()));
        }
        enforce_schema(shared.schema_doc(metadata.schema.as_ref()), &content)?;

        let id = DocId::generate();
        shared.streams.insert(
            id.clone(),
            Stream {
                metadata: metadata.clone(),
                content: content.clone(),
                commits: 1,
            },
        );
        Ok(Arc::new(MemoryDocument {
            id,
            metadata,
            content: std::sync::Mutex::new(content),
            writer: self.did.clone(),
            network: self.network.clone(),
        }))
    }

    async fn load_document(&self, id: &DocId) -> Result<DocumentHandle> {
        {
            let mut shared = self.network.shared.lock().await;
            *shared.loads.entry(id.head()).or_default() += 1;
        }
        let _pass = self.network.load_gate.read().await;

        let shared = self.network.shared.lock().await;
        if shared.faults.loads.contains(&id.head()) {
            return Err(NotesError::Network(format!("load of {} refused", id)));
        }
        let stream = shared
            .streams
            .get(&id.head())
            .ok_or_else(|| NotesError::DocumentNotFound(id.to_string()))?;
        Ok(Arc::new(MemoryDocument {
            id: id.clone(),
            metadata: stream.metadata.clone(),
            content: std::sync::Mutex::new(stream.content.clone()),
            writer: self.did.clone(),
            network: self.network.clone(),
        }))
    }
}

#[derive(Debug)]
struct MemoryDocument {
    id: DocId,
    metadata: DocumentMetadata,
    content: std::sync::Mutex<Value>,
    writer: String,
    network: InMemoryNetwork,
}

#[async_trait]
impl Document for MemoryDocument {
    fn id(&self) -> &DocId {
        &self.id
    }

    fn content(&self) -> Value {
        self.content
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    async fn update(&self, content: Value) -> Result<()> {
        ensure_controller(&self.metadata, &self.writer, &self.id)?;
        {
            let mut shared = self.network.shared.lock().await;
            if shared.faults.updates {
                return Err(NotesError::Network("update refused".to_string()));
            }
            enforce_schema(shared.schema_doc(self.metadata.schema.as_ref()), &content)?;
            let stream = shared
                .streams
                .get_mut(&self.id.head())
                .ok_or_else(|| NotesError::DocumentNotFound(self.id.to_string()))?;
            stream.content = content.clone();
            stream.commits += 1;
        }
        *self.content.lock().unwrap_or_else(|e| e.into_inner()) = content;
        Ok(())
    }
}
