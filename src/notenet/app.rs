//! # Notes Controller
//!
//! [`NotesApp`] is what a UI drives. Each operation applies its immediate
//! [`Action`] before returning, so the view can show "loading" or "saving"
//! right away, then spawns at most one task for the network work. Every task
//! ends by sending exactly one completion action back, which the app applies
//! when the caller polls [`NotesApp::next_event`] (or [`NotesApp::settle`]).
//!
//! ```text
//!   open_note(id) ──► NavNote(id), NoteLoadingStatus(Loading) ──► state
//!        │
//!        └─ spawn ─► session.load_document(id) ─► NoteLoaded | LoadingFailed
//!                                                        │
//!   next_event() ◄──────────── mpsc channel ◄────────────┘
//! ```
//!
//! Only the app touches [`State`]. Tasks get owned copies of what they need
//! (session, aliases, inputs) and never see the state.

use crate::config::{ModelAliases, DEFAULT_PLACEHOLDER_TEXT};
use crate::error::{NotesError, Result};
use crate::index::{prepend, read_notes, write_notes};
use crate::model::{DocId, Note, NoteItem, Seed};
use crate::network::{
    Document, DocumentHandle, DocumentMetadata, DocumentNetwork, Session, SessionHandle,
};
use crate::schema::{validate_note, validate_title};
use crate::state::{
    reduce, Action, AuthStatus, DraftStatus, NoteLoadingStatus, NoteSavingStatus, State,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

pub struct NotesApp<N: DocumentNetwork> {
    network: Arc<N>,
    aliases: Arc<ModelAliases>,
    fallback_placeholder: String,
    state: State,
    tx: UnboundedSender<Action>,
    rx: UnboundedReceiver<Action>,
    in_flight: usize,
}

impl<N: DocumentNetwork> NotesApp<N> {
    pub fn new(network: N, aliases: ModelAliases) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            network: Arc::new(network),
            aliases: Arc::new(aliases),
            fallback_placeholder: DEFAULT_PLACEHOLDER_TEXT.to_string(),
            state: State::default(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Text shown for empty notes when no placeholder tile can be loaded.
    pub fn with_placeholder_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_placeholder = text.into();
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn authenticate(&mut self, seed: Seed) {
        self.apply(Action::Auth(AuthStatus::Loading));
        let network = self.network.clone();
        let aliases = self.aliases.clone();
        let fallback = self.fallback_placeholder.clone();
        self.spawn(async move {
            match sign_in(network.as_ref(), &aliases, &seed, fallback).await {
                Ok(action) => action,
                Err(e) => {
                    tracing::warn!(error = %e, "authentication failed");
                    Action::Auth(AuthStatus::Failed)
                }
            }
        });
    }

    pub fn open_draft(&mut self) {
        self.apply(Action::NavDraft);
    }

    pub fn delete_draft(&mut self) {
        self.apply(Action::DraftDelete);
    }

    pub fn reset_nav(&mut self) {
        self.apply(Action::NavReset);
    }

    /// Publish a draft as a new note and add it to the head of the index.
    pub fn save_draft(&mut self, title: &str, text: &str) -> Result<()> {
        let session = self.session()?;
        self.apply(Action::DraftStatus(DraftStatus::Saving));

        let aliases = self.aliases.clone();
        let title = title.to_string();
        let text = text.to_string();
        self.spawn(async move {
            match store_draft(session.as_ref(), &aliases, title, text).await {
                Ok(action) => action,
                Err(e) => {
                    tracing::warn!(error = %e, "saving draft failed");
                    Action::DraftStatus(DraftStatus::Failed)
                }
            }
        });
        Ok(())
    }

    /// Show a note, loading it first if this session has not tried yet.
    pub fn open_note(&mut self, id: DocId) -> Result<()> {
        let session = self.session()?;
        self.apply(Action::NavNote(id.clone()));

        let needs_load = match self.state.notes.get(&id) {
            None => true,
            Some(entry) => entry.loading_status() == Some(NoteLoadingStatus::Init),
        };
        if !needs_load {
            return Ok(());
        }

        self.apply(Action::NoteLoadingStatus {
            id: id.clone(),
            status: NoteLoadingStatus::Loading,
        });
        self.spawn(async move {
            match session.load_document(&id).await {
                Ok(doc) => {
                    tracing::debug!(doc_id = %id, "note loaded");
                    Action::NoteLoaded { id, doc }
                }
                Err(e) => {
                    tracing::warn!(doc_id = %id, error = %e, "loading note failed");
                    Action::NoteLoadingStatus {
                        id,
                        status: NoteLoadingStatus::LoadingFailed,
                    }
                }
            }
        });
        Ok(())
    }

    /// Commit new text to a stored note. The title stays as indexed.
    pub fn save_note(&mut self, doc: DocumentHandle, text: &str) -> Result<()> {
        self.session()?;
        let id = doc.id().clone();
        self.apply(Action::NoteSavingStatus {
            id: id.clone(),
            status: NoteSavingStatus::Saving,
        });

        let text = text.to_string();
        self.spawn(async move {
            let status = match update_note(doc.as_ref(), text).await {
                Ok(()) => {
                    tracing::debug!(doc_id = %id, "note saved");
                    NoteSavingStatus::Saved
                }
                Err(e) => {
                    tracing::warn!(doc_id = %id, error = %e, "saving note failed");
                    NoteSavingStatus::SavingFailed
                }
            };
            Action::NoteSavingStatus { id, status }
        });
        Ok(())
    }

    /// Wait for the next task to finish and apply its result.
    ///
    /// Returns `false` straight away when nothing is in flight.
    pub async fn next_event(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(action) => {
                self.in_flight -= 1;
                self.apply(action);
                true
            }
            None => false,
        }
    }

    /// Apply results until no task is in flight.
    pub async fn settle(&mut self) {
        while self.next_event().await {}
    }

    fn session(&self) -> Result<SessionHandle> {
        self.state
            .auth
            .session()
            .cloned()
            .ok_or(NotesError::NotAuthenticated)
    }

    fn apply(&mut self, action: Action) {
        tracing::trace!(?action, "apply");
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Action> + Send + 'static,
    {
        self.in_flight += 1;
        tracing::debug!(in_flight = self.in_flight, "task spawned");
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let action = task.await;
            // The receiver lives as long as the app; a send error means it is gone.
            let _ = tx.send(action);
        });
    }
}

async fn sign_in<N: DocumentNetwork + ?Sized>(
    network: &N,
    aliases: &ModelAliases,
    seed: &Seed,
    fallback: String,
) -> Result<Action> {
    let session = network.create_session(seed).await?;
    tracing::debug!(did = session.did(), "session created");

    let (notes, placeholder_text) = tokio::join!(
        read_notes(session.as_ref(), aliases),
        placeholder_text(session.as_ref(), aliases, fallback),
    );
    Ok(Action::AuthSuccess {
        session,
        notes: notes?,
        placeholder_text,
    })
}

async fn placeholder_text(session: &dyn Session, aliases: &ModelAliases, fallback: String) -> String {
    let Some(tile) = &aliases.tiles.placeholder_note else {
        return fallback;
    };
    match session.load_document(tile).await {
        Ok(doc) => match doc.content().get("text").and_then(|t| t.as_str()) {
            Some(text) => text.to_string(),
            None => {
                tracing::warn!(tile = %tile, "placeholder tile has no text");
                fallback
            }
        },
        Err(e) => {
            tracing::warn!(tile = %tile, error = %e, "placeholder tile unavailable");
            fallback
        }
    }
}

async fn store_draft(
    session: &dyn Session,
    aliases: &ModelAliases,
    title: String,
    text: String,
) -> Result<Action> {
    validate_title(&title)?;
    let note = Note::now(text);
    validate_note(&note)?;
    let content = serde_json::to_value(&note)?;
    let metadata =
        DocumentMetadata::controlled_by(session.did()).with_schema(aliases.schemas.note.clone());

    let (doc, notes) = tokio::try_join!(
        session.create_document(content, metadata),
        read_notes(session, aliases),
    )?;
    let id = doc.id().clone();
    write_notes(session, aliases, prepend(notes, NoteItem::new(id.clone(), title.clone()))).await?;
    tracing::info!(doc_id = %id, "note created");

    Ok(Action::DraftSaved { id, title, doc })
}

async fn update_note(doc: &dyn Document, text: String) -> Result<()> {
    let note = Note::now(text);
    validate_note(&note)?;
    doc.update(serde_json::to_value(&note)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SEED_LEN;
    use crate::network::memory::InMemoryNetwork;
    use crate::provision::{provision, PLACEHOLDER_NOTE_TEXT};
    use crate::state::{AuthState, Navigation};
    use serde_json::json;

    fn seed() -> Seed {
        Seed::from_bytes([3; SEED_LEN])
    }

    async fn network() -> (InMemoryNetwork, ModelAliases) {
        let net = InMemoryNetwork::new();
        let aliases = provision(&net, &seed()).await.unwrap();
        (net, aliases)
    }

    /// Publish a note the way another client would and list it in the index.
    async fn publish(net: &InMemoryNetwork, aliases: &ModelAliases, title: &str, text: &str) -> DocId {
        let session = net.create_session(&seed()).await.unwrap();
        let meta = DocumentMetadata::controlled_by(session.did()).with_schema(aliases.schemas.note.clone());
        let doc = session
            .create_document(serde_json::to_value(Note::now(text)).unwrap(), meta)
            .await
            .unwrap();
        let notes = read_notes(session.as_ref(), aliases).await.unwrap();
        let item = NoteItem::new(doc.id().clone(), title);
        write_notes(session.as_ref(), aliases, prepend(notes, item))
            .await
            .unwrap();
        doc.id().clone()
    }

    async fn signed_in(net: &InMemoryNetwork, aliases: &ModelAliases) -> NotesApp<InMemoryNetwork> {
        let mut app = NotesApp::new(net.clone(), aliases.clone());
        app.authenticate(seed());
        app.settle().await;
        assert!(app.state().auth.is_authenticated());
        app
    }

    #[tokio::test]
    async fn test_authenticate_shows_loading_then_draft_for_new_identity() {
        let (net, aliases) = network().await;
        let mut app = NotesApp::new(net, aliases);

        app.authenticate(seed());
        assert!(matches!(app.state().auth, AuthState::Loading));
        assert_eq!(app.in_flight(), 1);

        app.settle().await;
        assert!(app.state().auth.is_authenticated());
        assert_eq!(app.state().nav, Navigation::Draft);
        assert_eq!(app.state().placeholder_text, PLACEHOLDER_NOTE_TEXT);
        assert_eq!(app.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_lists_index_entries_in_init() {
        let (net, aliases) = network().await;
        let older = publish(&net, &aliases, "older", "1").await;
        let newer = publish(&net, &aliases, "newer", "2").await;

        let app = signed_in(&net, &aliases).await;
        let ids: Vec<_> = app.state().notes.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, vec![newer.clone(), older]);
        assert_eq!(app.state().nav, Navigation::Default);
        assert_eq!(
            app.state().notes.get(&newer).unwrap().loading_status(),
            Some(NoteLoadingStatus::Init)
        );
        assert_eq!(net.load_count(&newer).await, 0);
    }

    #[tokio::test]
    async fn test_refused_session_fails_authentication() {
        let (net, aliases) = network().await;
        net.fail_sessions(true).await;
        let mut app = NotesApp::new(net, aliases);
        app.authenticate(seed());
        app.settle().await;
        assert!(matches!(app.state().auth, AuthState::Failed));
        assert_eq!(app.state().nav, Navigation::Default);
    }

    #[tokio::test]
    async fn test_unreadable_index_fails_authentication() {
        let (net, aliases) = network().await;
        net.fail_record_reads(true).await;
        let mut app = NotesApp::new(net, aliases);
        app.authenticate(seed());
        app.settle().await;
        assert!(matches!(app.state().auth, AuthState::Failed));
    }

    #[tokio::test]
    async fn test_missing_tile_falls_back_to_configured_text() {
        let (net, mut aliases) = network().await;
        aliases.tiles.placeholder_note = None;
        let mut app = NotesApp::new(net.clone(), aliases.clone());
        app.authenticate(seed());
        app.settle().await;
        assert_eq!(app.state().placeholder_text, DEFAULT_PLACEHOLDER_TEXT);

        let mut app = NotesApp::new(net, aliases).with_placeholder_text("Type away");
        app.authenticate(seed());
        app.settle().await;
        assert_eq!(app.state().placeholder_text, "Type away");
    }

    #[tokio::test]
    async fn test_unloadable_tile_does_not_block_authentication() {
        let (net, aliases) = network().await;
        let tile = aliases.tiles.placeholder_note.clone().unwrap();
        net.fail_loads_of(tile).await;
        let app = signed_in(&net, &aliases).await;
        assert_eq!(app.state().placeholder_text, DEFAULT_PLACEHOLDER_TEXT);
    }

    #[tokio::test]
    async fn test_session_operations_require_authentication() {
        let (net, aliases) = network().await;
        let id = publish(&net, &aliases, "t", "x").await;
        let mut app = NotesApp::new(net.clone(), aliases);

        assert!(matches!(app.save_draft("t", "x"), Err(NotesError::NotAuthenticated)));
        assert!(matches!(app.open_note(id.clone()), Err(NotesError::NotAuthenticated)));
        assert_eq!(app.in_flight(), 0);
        assert_eq!(app.state().draft_status, DraftStatus::Unsaved);
        assert_eq!(app.state().nav, Navigation::Default);
        assert_eq!(net.load_count(&id).await, 0);
    }

    #[tokio::test]
    async fn test_save_draft_creates_note_and_prepends_index() {
        let (net, aliases) = network().await;
        let existing = publish(&net, &aliases, "existing", "old").await;
        let mut app = signed_in(&net, &aliases).await;

        app.open_draft();
        app.save_draft("Groceries", "milk, eggs").unwrap();
        assert_eq!(app.state().draft_status, DraftStatus::Saving);
        app.settle().await;

        let Navigation::Note(id) = app.state().nav.clone() else {
            panic!("expected to land on the new note, got {:?}", app.state().nav);
        };
        assert_eq!(app.state().draft_status, DraftStatus::Unsaved);
        let entry = app.state().notes.get(&id).unwrap();
        assert_eq!(entry.title(), "Groceries");
        assert_eq!(entry.saving_status(), Some(NoteSavingStatus::Saved));
        assert_eq!(entry.text().as_deref(), Some("milk, eggs"));

        let session = net.create_session(&seed()).await.unwrap();
        let index = read_notes(session.as_ref(), &aliases).await.unwrap();
        assert_eq!(index[0], NoteItem::new(id, "Groceries"));
        assert_eq!(index[1].id, existing);
    }

    #[tokio::test]
    async fn test_save_draft_keeps_notes_written_by_another_session() {
        let (net, aliases) = network().await;
        let mut app = signed_in(&net, &aliases).await;
        let elsewhere = publish(&net, &aliases, "from phone", "hi").await;

        app.save_draft("from laptop", "hello").unwrap();
        app.settle().await;

        let session = net.create_session(&seed()).await.unwrap();
        let index = read_notes(session.as_ref(), &aliases).await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].title, "from laptop");
        assert_eq!(index[1].id, elsewhere);
    }

    #[tokio::test]
    async fn test_failed_create_leaves_index_untouched() {
        let (net, aliases) = network().await;
        let mut app = signed_in(&net, &aliases).await;
        app.open_draft();
        net.fail_creates(true).await;

        app.save_draft("t", "x").unwrap();
        app.settle().await;

        assert_eq!(app.state().draft_status, DraftStatus::Failed);
        assert_eq!(app.state().nav, Navigation::Draft);
        assert!(app.state().notes.is_empty());
        assert_eq!(net.record_write_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_index_write_fails_the_draft() {
        let (net, aliases) = network().await;
        let mut app = signed_in(&net, &aliases).await;
        net.fail_record_writes(true).await;

        app.save_draft("t", "x").unwrap();
        app.settle().await;
        assert_eq!(app.state().draft_status, DraftStatus::Failed);
        assert!(app.state().notes.is_empty());
    }

    #[tokio::test]
    async fn test_overlong_title_fails_without_creating_a_document() {
        let (net, aliases) = network().await;
        let mut app = signed_in(&net, &aliases).await;
        let before = net.document_count().await;

        app.save_draft(&"t".repeat(101), "x").unwrap();
        app.settle().await;
        assert_eq!(app.state().draft_status, DraftStatus::Failed);
        assert_eq!(net.document_count().await, before);
    }

    #[tokio::test]
    async fn test_delete_draft_discards_a_failed_save() {
        let (net, aliases) = network().await;
        let mut app = signed_in(&net, &aliases).await;
        net.fail_creates(true).await;
        app.save_draft("t", "x").unwrap();
        app.settle().await;

        app.delete_draft();
        assert_eq!(app.state().draft_status, DraftStatus::Unsaved);
        assert_eq!(app.state().nav, Navigation::Default);
    }

    #[tokio::test]
    async fn test_open_note_loads_once_while_in_flight() {
        let (net, aliases) = network().await;
        let id = publish(&net, &aliases, "t", "body").await;
        let mut app = signed_in(&net, &aliases).await;

        let hold = net.hold_loads().await;
        app.open_note(id.clone()).unwrap();
        assert_eq!(app.state().nav, Navigation::Note(id.clone()));
        assert_eq!(
            app.state().notes.get(&id).unwrap().loading_status(),
            Some(NoteLoadingStatus::Loading)
        );
        app.open_note(id.clone()).unwrap();
        assert_eq!(app.in_flight(), 1);

        drop(hold);
        app.settle().await;
        let entry = app.state().notes.get(&id).unwrap();
        assert_eq!(entry.saving_status(), Some(NoteSavingStatus::Loaded));
        assert_eq!(entry.title(), "t");
        assert_eq!(entry.text().as_deref(), Some("body"));

        app.reset_nav();
        app.open_note(id.clone()).unwrap();
        assert_eq!(app.in_flight(), 0);
        assert_eq!(net.load_count(&id).await, 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_retried() {
        let (net, aliases) = network().await;
        let id = publish(&net, &aliases, "t", "body").await;
        net.fail_loads_of(id.clone()).await;
        let mut app = signed_in(&net, &aliases).await;

        app.open_note(id.clone()).unwrap();
        app.settle().await;
        assert_eq!(
            app.state().notes.get(&id).unwrap().loading_status(),
            Some(NoteLoadingStatus::LoadingFailed)
        );

        app.open_note(id.clone()).unwrap();
        app.settle().await;
        assert_eq!(net.load_count(&id).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_that_fails_to_load_is_loaded_once() {
        let (net, aliases) = network().await;
        let id = DocId::generate();
        let mut app = signed_in(&net, &aliases).await;
        assert!(app.state().notes.get(&id).is_none());

        app.open_note(id.clone()).unwrap();
        assert_eq!(app.state().nav, Navigation::Note(id.clone()));
        assert_eq!(
            app.state().notes.get(&id).unwrap().loading_status(),
            Some(NoteLoadingStatus::Loading)
        );

        app.settle().await;
        let entry = app.state().notes.get(&id).unwrap();
        assert_eq!(entry.loading_status(), Some(NoteLoadingStatus::LoadingFailed));
        assert_eq!(entry.title(), "");

        app.reset_nav();
        app.open_note(id.clone()).unwrap();
        app.open_note(id.clone()).unwrap();
        assert_eq!(app.in_flight(), 0);
        app.settle().await;
        assert_eq!(net.load_count(&id).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_loads_as_untitled_entry() {
        let (net, aliases) = network().await;
        let session = net.create_session(&seed()).await.unwrap();
        let doc = session
            .create_document(json!({"date": "2020-01-01T00:00:00.000Z", "text": "stray"}), DocumentMetadata::controlled_by(session.did()))
            .await
            .unwrap();
        let mut app = signed_in(&net, &aliases).await;

        app.open_note(doc.id().clone()).unwrap();
        app.settle().await;
        let entry = app.state().notes.get(doc.id()).unwrap();
        assert_eq!(entry.title(), "");
        assert_eq!(entry.saving_status(), Some(NoteSavingStatus::Loaded));
    }

    #[tokio::test]
    async fn test_late_load_lands_on_its_own_note() {
        let (net, aliases) = network().await;
        let first = publish(&net, &aliases, "first", "1").await;
        let second = publish(&net, &aliases, "second", "2").await;
        net.fail_loads_of(second.clone()).await;
        let mut app = signed_in(&net, &aliases).await;

        let hold = net.hold_loads().await;
        app.open_note(first.clone()).unwrap();
        app.open_note(second.clone()).unwrap();
        drop(hold);
        app.settle().await;

        assert_eq!(app.state().nav, Navigation::Note(second.clone()));
        assert_eq!(
            app.state().notes.get(&first).unwrap().saving_status(),
            Some(NoteSavingStatus::Loaded)
        );
        assert_eq!(
            app.state().notes.get(&second).unwrap().loading_status(),
            Some(NoteLoadingStatus::LoadingFailed)
        );
    }

    #[tokio::test]
    async fn test_save_note_commits_new_text() {
        let (net, aliases) = network().await;
        let id = publish(&net, &aliases, "t", "before").await;
        let mut app = signed_in(&net, &aliases).await;
        app.open_note(id.clone()).unwrap();
        app.settle().await;

        let doc = app.state().notes.get(&id).unwrap().doc().cloned().unwrap();
        app.save_note(doc, "after").unwrap();
        assert_eq!(
            app.state().notes.get(&id).unwrap().saving_status(),
            Some(NoteSavingStatus::Saving)
        );
        app.settle().await;

        let entry = app.state().notes.get(&id).unwrap();
        assert_eq!(entry.saving_status(), Some(NoteSavingStatus::Saved));
        assert_eq!(entry.title(), "t");
        assert_eq!(entry.text().as_deref(), Some("after"));
        assert_eq!(net.commit_count(&id).await, 2);
    }

    #[tokio::test]
    async fn test_failed_update_can_be_saved_again() {
        let (net, aliases) = network().await;
        let id = publish(&net, &aliases, "t", "before").await;
        let mut app = signed_in(&net, &aliases).await;
        app.open_note(id.clone()).unwrap();
        app.settle().await;
        let doc = app.state().notes.get(&id).unwrap().doc().cloned().unwrap();

        net.fail_updates(true).await;
        app.save_note(doc.clone(), "after").unwrap();
        app.settle().await;
        assert_eq!(
            app.state().notes.get(&id).unwrap().saving_status(),
            Some(NoteSavingStatus::SavingFailed)
        );

        net.fail_updates(false).await;
        app.save_note(doc, "after").unwrap();
        app.settle().await;
        assert_eq!(
            app.state().notes.get(&id).unwrap().saving_status(),
            Some(NoteSavingStatus::Saved)
        );
        assert_eq!(net.document_content(&id).await.unwrap()["text"], "after");
    }
}
