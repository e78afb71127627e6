//! The notes index: one keyed record per identity, stored under the `notes`
//! definition, listing `{id, title}` for every note the identity wrote.
//!
//! The record is read fresh before every write so that a note saved from
//! another session since this one authenticated is not dropped.

use crate::config::ModelAliases;
use crate::error::{NotesError, Result};
use crate::model::{NoteItem, NotesList};
use crate::network::Session;
use crate::schema::validate_notes_list;

/// Read the notes index. No record yet means no notes.
pub async fn read_notes(session: &dyn Session, aliases: &ModelAliases) -> Result<Vec<NoteItem>> {
    let definition = &aliases.definitions.notes;
    match session.get_record(definition).await? {
        Some(value) => {
            let list: NotesList =
                serde_json::from_value(value).map_err(NotesError::Serialization)?;
            Ok(list.notes)
        }
        None => Ok(Vec::new()),
    }
}

pub async fn write_notes(
    session: &dyn Session,
    aliases: &ModelAliases,
    notes: Vec<NoteItem>,
) -> Result<()> {
    let list = NotesList { notes };
    validate_notes_list(&list)?;
    let value = serde_json::to_value(&list).map_err(NotesError::Serialization)?;
    tracing::debug!(
        did = session.did(),
        definition = %aliases.definitions.notes,
        count = list.notes.len(),
        "writing notes index"
    );
    session.set_record(&aliases.definitions.notes, value).await
}

/// The index with `item` at the head, the most recent position.
pub fn prepend(mut notes: Vec<NoteItem>, item: NoteItem) -> Vec<NoteItem> {
    notes.insert(0, item);
    notes
}
