//! # Note Lifecycle State
//!
//! [`State`] is everything a view needs to render: who is signed in, what is
//! on screen, and where each note is in its load/save lifecycle. [`reduce`] is
//! the only way it changes. It is pure and synchronous, and every async
//! operation in [`crate::app`] ends by feeding it exactly one [`Action`].
//!
//! ## Note entries
//!
//! ```text
//!  IndexLoaded:  Init ──► Loading ──► LoadingFailed
//!                            │
//!                            ▼ (handle returned)
//!  Stored:                Loaded ──► Saving ──► Saved
//!                                      │  ▲       │
//!                                      ▼  └───────┘
//!                                 SavingFailed
//! ```
//!
//! An entry only becomes `Stored` when the network hands back a document
//! handle, either from a load or from saving a draft. `IndexLoaded` entries
//! never hold one.
//!
//! Actions name the note they apply to. A result arriving after the user moved
//! on to another note still lands on the note it was for.

use crate::config::DEFAULT_PLACEHOLDER_TEXT;
use crate::model::{DocId, NoteItem};
use crate::network::{DocumentHandle, SessionHandle};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Pending,
    Loading,
    Failed,
}

#[derive(Debug, Clone)]
pub enum AuthState {
    Pending,
    Loading,
    Failed,
    Authenticated(SessionHandle),
}

impl AuthState {
    pub fn session(&self) -> Option<&SessionHandle> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// The unauthenticated status, if any.
    pub fn status(&self) -> Option<AuthStatus> {
        match self {
            AuthState::Pending => Some(AuthStatus::Pending),
            AuthState::Loading => Some(AuthStatus::Loading),
            AuthState::Failed => Some(AuthStatus::Failed),
            AuthState::Authenticated(_) => None,
        }
    }
}

impl From<AuthStatus> for AuthState {
    fn from(status: AuthStatus) -> Self {
        match status {
            AuthStatus::Pending => AuthState::Pending,
            AuthStatus::Loading => AuthState::Loading,
            AuthStatus::Failed => AuthState::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftStatus {
    Unsaved,
    Saving,
    Failed,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteLoadingStatus {
    Init,
    Loading,
    LoadingFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSavingStatus {
    Loaded,
    Saving,
    SavingFailed,
    Saved,
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DraftStatus::Unsaved => "unsaved",
            DraftStatus::Saving => "saving",
            DraftStatus::Failed => "failed",
            DraftStatus::Saved => "saved",
        })
    }
}

impl fmt::Display for NoteLoadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoteLoadingStatus::Init => "init",
            NoteLoadingStatus::Loading => "loading",
            NoteLoadingStatus::LoadingFailed => "loading failed",
        })
    }
}

impl fmt::Display for NoteSavingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoteSavingStatus::Loaded => "loaded",
            NoteSavingStatus::Saving => "saving",
            NoteSavingStatus::SavingFailed => "saving failed",
            NoteSavingStatus::Saved => "saved",
        })
    }
}

#[derive(Debug, Clone)]
pub enum NoteEntry {
    IndexLoaded {
        status: NoteLoadingStatus,
        title: String,
    },
    Stored {
        status: NoteSavingStatus,
        title: String,
        doc: DocumentHandle,
    },
}

impl NoteEntry {
    pub fn title(&self) -> &str {
        match self {
            NoteEntry::IndexLoaded { title, .. } | NoteEntry::Stored { title, .. } => title,
        }
    }

    pub fn doc(&self) -> Option<&DocumentHandle> {
        match self {
            NoteEntry::Stored { doc, .. } => Some(doc),
            NoteEntry::IndexLoaded { .. } => None,
        }
    }

    /// Note text, once the document is stored.
    pub fn text(&self) -> Option<String> {
        let content = self.doc()?.content();
        content.get("text")?.as_str().map(str::to_string)
    }

    pub fn loading_status(&self) -> Option<NoteLoadingStatus> {
        match self {
            NoteEntry::IndexLoaded { status, .. } => Some(*status),
            NoteEntry::Stored { .. } => None,
        }
    }

    pub fn saving_status(&self) -> Option<NoteSavingStatus> {
        match self {
            NoteEntry::Stored { status, .. } => Some(*status),
            NoteEntry::IndexLoaded { .. } => None,
        }
    }

    pub fn status_label(&self) -> String {
        match self {
            NoteEntry::IndexLoaded { status, .. } => status.to_string(),
            NoteEntry::Stored { status, .. } => status.to_string(),
        }
    }
}

/// What the view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Default,
    Draft,
    Note(DocId),
}

/// Note entries keyed by id, in index order (most recent first).
#[derive(Debug, Clone, Default)]
pub struct Notes {
    order: Vec<DocId>,
    entries: HashMap<DocId, NoteEntry>,
}

impl Notes {
    /// Fresh entries for an index just read from the network, all `Init`.
    pub fn from_index(items: Vec<NoteItem>) -> Self {
        let mut notes = Notes::default();
        for item in items {
            notes.upsert(
                item.id,
                NoteEntry::IndexLoaded {
                    status: NoteLoadingStatus::Init,
                    title: item.title,
                },
            );
        }
        notes
    }

    pub fn get(&self, id: &DocId) -> Option<&NoteEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocId, &NoteEntry)> {
        self.order
            .iter()
            .filter_map(move |id| self.entries.get(id).map(|entry| (id, entry)))
    }

    /// Replace in place, or append when the id is new.
    fn upsert(&mut self, id: DocId, entry: NoteEntry) {
        if self.entries.insert(id.clone(), entry).is_none() {
            self.order.push(id);
        }
    }

    fn insert_front(&mut self, id: DocId, entry: NoteEntry) {
        self.order.retain(|existing| existing != &id);
        self.order.insert(0, id.clone());
        self.entries.insert(id, entry);
    }

    fn get_mut(&mut self, id: &DocId) -> Option<&mut NoteEntry> {
        self.entries.get_mut(id)
    }
}

#[derive(Debug, Clone)]
pub struct State {
    pub auth: AuthState,
    pub nav: Navigation,
    pub draft_status: DraftStatus,
    pub notes: Notes,
    pub placeholder_text: String,
}

impl Default for State {
    fn default() -> Self {
        Self {
            auth: AuthState::Pending,
            nav: Navigation::Default,
            draft_status: DraftStatus::Unsaved,
            notes: Notes::default(),
            placeholder_text: DEFAULT_PLACEHOLDER_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Auth(AuthStatus),
    AuthSuccess {
        session: SessionHandle,
        notes: Vec<NoteItem>,
        placeholder_text: String,
    },
    NavReset,
    NavDraft,
    NavNote(DocId),
    DraftDelete,
    /// Only `Saving` and `Failed` are dispatched; success is `DraftSaved`.
    DraftStatus(DraftStatus),
    DraftSaved {
        id: DocId,
        title: String,
        doc: DocumentHandle,
    },
    NoteLoaded {
        id: DocId,
        doc: DocumentHandle,
    },
    NoteLoadingStatus {
        id: DocId,
        status: NoteLoadingStatus,
    },
    NoteSavingStatus {
        id: DocId,
        status: NoteSavingStatus,
    },
}

impl Action {
    fn kind(&self) -> &'static str {
        match self {
            Action::Auth(_) => "auth",
            Action::AuthSuccess { .. } => "auth success",
            Action::NavReset => "nav reset",
            Action::NavDraft => "nav draft",
            Action::NavNote(_) => "nav note",
            Action::DraftDelete => "draft delete",
            Action::DraftStatus(_) => "draft status",
            Action::DraftSaved { .. } => "draft saved",
            Action::NoteLoaded { .. } => "note loaded",
            Action::NoteLoadingStatus { .. } => "note loading status",
            Action::NoteSavingStatus { .. } => "note saving status",
        }
    }

    fn needs_session(&self) -> bool {
        !matches!(
            self,
            Action::Auth(_) | Action::AuthSuccess { .. } | Action::NavReset | Action::DraftDelete
        )
    }
}

pub fn reduce(mut state: State, action: Action) -> State {
    if action.needs_session() && !state.auth.is_authenticated() {
        tracing::warn!(action = action.kind(), "ignoring action without a session");
        return state;
    }

    match action {
        Action::Auth(status) => {
            state.auth = status.into();
            state.nav = Navigation::Default;
        }
        Action::AuthSuccess {
            session,
            notes,
            placeholder_text,
        } => {
            state.auth = AuthState::Authenticated(session);
            state.placeholder_text = placeholder_text;
            if notes.is_empty() {
                state.notes = Notes::default();
                state.draft_status = DraftStatus::Unsaved;
                state.nav = Navigation::Draft;
            } else {
                state.notes = Notes::from_index(notes);
            }
        }
        Action::NavReset => state.nav = Navigation::Default,
        Action::NavDraft => state.nav = Navigation::Draft,
        Action::NavNote(id) => state.nav = Navigation::Note(id),
        Action::DraftDelete => {
            state.draft_status = DraftStatus::Unsaved;
            state.nav = Navigation::Default;
        }
        Action::DraftStatus(status) => state.draft_status = status,
        Action::DraftSaved { id, title, doc } => {
            state.draft_status = DraftStatus::Unsaved;
            state.nav = Navigation::Note(id.clone());
            state.notes.insert_front(
                id,
                NoteEntry::Stored {
                    status: NoteSavingStatus::Saved,
                    title,
                    doc,
                },
            );
        }
        Action::NoteLoaded { id, doc } => {
            let title = state
                .notes
                .get(&id)
                .map(|entry| entry.title().to_string())
                .unwrap_or_default();
            state.notes.upsert(
                id,
                NoteEntry::Stored {
                    status: NoteSavingStatus::Loaded,
                    title,
                    doc,
                },
            );
        }
        Action::NoteLoadingStatus { id, status } => match state.notes.get_mut(&id) {
            Some(NoteEntry::IndexLoaded { status: current, .. }) => *current = status,
            Some(NoteEntry::Stored { .. }) => {
                tracing::warn!(doc_id = %id, %status, "note already stored, ignoring loading status");
            }
            None => state.notes.upsert(
                id,
                NoteEntry::IndexLoaded {
                    status,
                    title: String::new(),
                },
            ),
        },
        Action::NoteSavingStatus { id, status } => match state.notes.get_mut(&id) {
            Some(NoteEntry::Stored { status: current, .. }) => *current = status,
            _ => {
                tracing::warn!(doc_id = %id, %status, "no stored note, ignoring saving status");
            }
        },
    }
    state
}
