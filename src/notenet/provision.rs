//! One-time bootstrap of the documents every client relies on.
//!
//! Publishes the `Note` and `NotesList` schemas, the `notes` definition that
//! keys each identity's index record, and a `placeholderNote` tile. The ids end
//! up in a [`ModelAliases`] the app loads at startup.

use crate::config::{Definitions, ModelAliases, Schemas, Tiles};
use crate::error::{NotesError, Result};
use crate::model::{Note, Seed};
use crate::network::{DocumentMetadata, DocumentNetwork};
use crate::schema::{note_schema, notes_list_schema};
use serde_json::json;

pub const DEFINITION_NAME: &str = "notes";
pub const DEFINITION_DESCRIPTION: &str = "Simple text notes";
pub const PLACEHOLDER_NOTE_TEXT: &str = "This is a placeholder for the note contents...";

pub async fn provision<N: DocumentNetwork + ?Sized>(network: &N, seed: &Seed) -> Result<ModelAliases> {
    let session = network.create_session(seed).await?;
    let meta = DocumentMetadata::controlled_by(session.did());

    let (note, notes_list) = tokio::try_join!(
        session.create_document(note_schema().clone(), meta.clone().with_family("schema")),
        session.create_document(notes_list_schema().clone(), meta.clone().with_family("schema")),
    )?;
    tracing::info!(note = %note.id(), notes_list = %notes_list.id(), "published schemas");

    let definition = session
        .create_document(
            json!({
                "name": DEFINITION_NAME,
                "description": DEFINITION_DESCRIPTION,
                "schema": notes_list.id().to_string(),
            }),
            meta.clone().with_family("definition"),
        )
        .await?;
    tracing::info!(definition = %definition.id(), "created notes definition");

    let placeholder_content =
        serde_json::to_value(Note::now(PLACEHOLDER_NOTE_TEXT)).map_err(NotesError::Serialization)?;
    let placeholder = session
        .create_document(
            placeholder_content,
            meta.with_schema(note.id().clone()).with_family("tile"),
        )
        .await?;

    Ok(ModelAliases {
        definitions: Definitions {
            notes: definition.id().clone(),
        },
        schemas: Schemas {
            note: note.id().clone(),
            notes_list: notes_list.id().clone(),
        },
        tiles: Tiles {
            placeholder_note: Some(placeholder.id().clone()),
        },
    })
}
