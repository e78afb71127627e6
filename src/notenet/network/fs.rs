use super::{
    definition_schema, enforce_schema, ensure_controller, Document, DocumentHandle,
    DocumentMetadata, DocumentNetwork, Session, SessionHandle,
};
use crate::error::{NotesError, Result};
use crate::model::{DocId, Seed};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

const STREAMS_DIR: &str = "streams";
const RECORDS_DIR: &str = "records";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Commit {
    date: String,
    content: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StreamFile {
    metadata: DocumentMetadata,
    content: Value,
    #[serde(default)]
    log: Vec<Commit>,
}

impl StreamFile {
    fn new(metadata: DocumentMetadata, content: Value) -> Self {
        let mut stream = Self {
            metadata,
            content: Value::Null,
            log: Vec::new(),
        };
        stream.commit(content);
        stream
    }

    fn commit(&mut self, content: Value) {
        self.log.push(Commit {
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            content: content.clone(),
        });
        self.content = content;
    }
}

/// A document network kept as JSON files under one directory.
///
/// Good enough to run the CLI against without a node: every stream keeps its
/// full commit log, and records are scoped by identity.
#[derive(Debug, Clone)]
pub struct FileNetwork {
    root: PathBuf,
}

impl FileNetwork {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stream_path(&self, id: &DocId) -> PathBuf {
        self.root
            .join(STREAMS_DIR)
            .join(format!("{}.json", id.stream_id()))
    }

    fn record_path(&self, did: &str, definition: &DocId) -> PathBuf {
        let owner = did.rsplit(':').next().unwrap_or(did);
        self.root
            .join(RECORDS_DIR)
            .join(owner)
            .join(format!("{}.json", definition.stream_id()))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(NotesError::Io)?;
        }
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(
                serde_json::from_str(&content).map_err(NotesError::Serialization)?,
            )),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(NotesError::Io(e)),
        }
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).map_err(NotesError::Serialization)?;
        fs::write(path, content).await.map_err(NotesError::Io)?;
        Ok(())
    }

    async fn load_stream(&self, id: &DocId) -> Result<StreamFile> {
        self.read_json(&self.stream_path(id))
            .await?
            .ok_or_else(|| NotesError::DocumentNotFound(id.to_string()))
    }

    async fn schema_content(&self, schema: Option<&DocId>) -> Result<Option<Value>> {
        match schema {
            Some(id) => Ok(self
                .read_json::<StreamFile>(&self.stream_path(id))
                .await?
                .map(|s| s.content)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DocumentNetwork for FileNetwork {
    async fn create_session(&self, seed: &Seed) -> Result<SessionHandle> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(NotesError::Io)?;
        Ok(Arc::new(FileSession {
            did: seed.did(),
            network: self.clone(),
        }))
    }
}

#[derive(Debug)]
struct FileSession {
    did: String,
    network: FileNetwork,
}

#[async_trait]
impl Session for FileSession {
    fn did(&self) -> &str {
        &self.did
    }

    async fn get_record(&self, definition: &DocId) -> Result<Option<Value>> {
        self.network
            .read_json(&self.network.record_path(&self.did, definition))
            .await
    }

    async fn set_record(&self, definition: &DocId, value: Value) -> Result<()> {
        let definition_doc = self.network.load_stream(definition).await?;
        let schema = definition_schema(&definition_doc.content);
        let schema_doc = self.network.schema_content(schema.as_ref()).await?;
        enforce_schema(schema_doc.as_ref(), &value)?;

        self.network
            .write_json(&self.network.record_path(&self.did, definition), &value)
            .await
    }

    async fn create_document(
        &self,
        content: Value,
        metadata: DocumentMetadata,
    ) -> Result<DocumentHandle> {
        let schema_doc = self
            .network
            .schema_content(metadata.schema.as_ref())
            .await?;
        enforce_schema(schema_doc.as_ref(), &content)?;

        let id = DocId::generate();
        let stream = StreamFile::new(metadata.clone(), content.clone());
        self.network
            .write_json(&self.network.stream_path(&id), &stream)
            .await?;
        Ok(Arc::new(FileDocument {
            id,
            metadata,
            content: std::sync::Mutex::new(content),
            writer: self.did.clone(),
            network: self.network.clone(),
        }))
    }

    async fn load_document(&self, id: &DocId) -> Result<DocumentHandle> {
        let stream = self.network.load_stream(id).await?;
        Ok(Arc::new(FileDocument {
            id: id.clone(),
            metadata: stream.metadata,
            content: std::sync::Mutex::new(stream.content),
            writer: self.did.clone(),
            network: self.network.clone(),
        }))
    }
}

#[derive(Debug)]
struct FileDocument {
    id: DocId,
    metadata: DocumentMetadata,
    content: std::sync::Mutex<Value>,
    writer: String,
    network: FileNetwork,
}

#[async_trait]
impl Document for FileDocument {
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
        let schema_doc = self
            .network
            .schema_content(self.metadata.schema.as_ref())
            .await?;
        enforce_schema(schema_doc.as_ref(), &content)?;

        let path = self.network.stream_path(&self.id);
        let mut stream = self.network.load_stream(&self.id).await?;
        stream.commit(content.clone());
        self.network.write_json(&path, &stream).await?;

        *self.content.lock().unwrap_or_else(|e| e.into_inner()) = content;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SEED_LEN;
    use crate::schema::notes_list_schema;
    use serde_json::json;
    use tempfile::tempdir;

    fn seed() -> Seed {
        Seed::from_bytes([5; SEED_LEN])
    }

    #[tokio::test]
    async fn test_documents_persist_across_network_instances() {
        let dir = tempdir().unwrap();
        let id = {
            let net = FileNetwork::new(dir.path());
            let session = net.create_session(&seed()).await.unwrap();
            let doc = session
                .create_document(json!({"text": "hi"}), DocumentMetadata::controlled_by(session.did()))
                .await
                .unwrap();
            doc.id().clone()
        };

        let net = FileNetwork::new(dir.path());
        let session = net.create_session(&seed()).await.unwrap();
        let doc = session.load_document(&id).await.unwrap();
        assert_eq!(doc.content(), json!({"text": "hi"}));
    }

    #[tokio::test]
    async fn test_updates_append_to_commit_log() {
        let dir = tempdir().unwrap();
        let net = FileNetwork::new(dir.path());
        let session = net.create_session(&seed()).await.unwrap();
        let doc = session
            .create_document(json!({"v": 1}), DocumentMetadata::controlled_by(session.did()))
            .await
            .unwrap();
        doc.update(json!({"v": 2})).await.unwrap();

        let stream = net.load_stream(doc.id()).await.unwrap();
        assert_eq!(stream.log.len(), 2);
        assert_eq!(stream.content, json!({"v": 2}));
    }

    #[tokio::test]
    async fn test_versioned_id_loads_stream_head() {
        let dir = tempdir().unwrap();
        let net = FileNetwork::new(dir.path());
        let session = net.create_session(&seed()).await.unwrap();
        let doc = session
            .create_document(json!({"v": 1}), DocumentMetadata::controlled_by(session.did()))
            .await
            .unwrap();
        doc.update(json!({"v": 2})).await.unwrap();

        let versioned: DocId = format!("{}?version=1", doc.id()).parse().unwrap();
        let loaded = session.load_document(&versioned).await.unwrap();
        assert_eq!(loaded.content(), json!({"v": 2}));
        assert_eq!(loaded.id(), &versioned);

        loaded.update(json!({"v": 3})).await.unwrap();
        let stream = net.load_stream(doc.id()).await.unwrap();
        assert_eq!(stream.log.len(), 3);
        assert_eq!(stream.content, json!({"v": 3}));
    }

    #[tokio::test]
    async fn test_missing_stream_is_not_found() {
        let dir = tempdir().unwrap();
        let net = FileNetwork::new(dir.path());
        let session = net.create_session(&seed()).await.unwrap();
        let err = session.load_document(&DocId::generate()).await.unwrap_err();
        assert!(matches!(err, NotesError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_records_follow_definition_schema() {
        let dir = tempdir().unwrap();
        let net = FileNetwork::new(dir.path());
        let session = net.create_session(&seed()).await.unwrap();
        let schema = session
            .create_document(notes_list_schema().clone(), DocumentMetadata::controlled_by(session.did()))
            .await
            .unwrap();
        let definition = session
            .create_document(
                json!({"name": "notes", "schema": schema.id().to_string()}),
                DocumentMetadata::controlled_by(session.did()),
            )
            .await
            .unwrap();

        assert!(session.get_record(definition.id()).await.unwrap().is_none());

        let good = json!({"notes": [{"id": "ceramic://abc", "title": "A"}]});
        session.set_record(definition.id(), good.clone()).await.unwrap();
        assert_eq!(session.get_record(definition.id()).await.unwrap(), Some(good));

        let too_long = json!({"notes": [{"id": "ceramic://abc", "title": "t".repeat(101)}]});
        assert!(session.set_record(definition.id(), too_long).await.is_err());
    }
}
