//! JSON schemas published to the network, and the checks that go with them.
//!
//! The network validates document content against the schema named in the
//! document metadata. The same rules are applied locally before anything is
//! written, so an over-long title fails fast instead of after a round trip.

use crate::error::{NotesError, Result};
use crate::model::{Note, NotesList, DOC_ID_SCHEME};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

pub const NOTE_DATE_MAX: usize = 30;
pub const NOTE_TEXT_MAX: usize = 4000;
pub const NOTE_ID_MAX: usize = 150;
pub const NOTE_TITLE_MAX: usize = 100;

static NOTE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Note",
        "type": "object",
        "properties": {
            "date": {
                "type": "string",
                "format": "date-time",
                "title": "date",
                "maxLength": NOTE_DATE_MAX,
            },
            "text": {
                "type": "string",
                "title": "text",
                "maxLength": NOTE_TEXT_MAX,
            },
        },
    })
});

static NOTES_LIST_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "NotesList",
        "type": "object",
        "properties": {
            "notes": {
                "type": "array",
                "title": "notes",
                "items": {
                    "type": "object",
                    "title": "NoteItem",
                    "properties": {
                        "id": { "$ref": "#/definitions/CeramicDocId" },
                        "title": {
                            "type": "string",
                            "title": "title",
                            "maxLength": NOTE_TITLE_MAX,
                        },
                    },
                },
            },
        },
        "definitions": {
            "CeramicDocId": {
                "type": "string",
                "pattern": "^ceramic://.+(\\?version=.+)?",
                "maxLength": NOTE_ID_MAX,
            },
        },
    })
});

pub fn note_schema() -> &'static Value {
    &NOTE_SCHEMA
}

pub fn notes_list_schema() -> &'static Value {
    &NOTES_LIST_SCHEMA
}

/// The schemas this crate knows how to enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Note,
    NotesList,
}

impl SchemaKind {
    /// Recognises a published schema document by its title.
    pub fn detect(schema_doc: &Value) -> Option<Self> {
        match schema_doc.get("title").and_then(Value::as_str) {
            Some("Note") => Some(SchemaKind::Note),
            Some("NotesList") => Some(SchemaKind::NotesList),
            _ => None,
        }
    }

    pub fn validate(self, content: &Value) -> Result<()> {
        match self {
            SchemaKind::Note => {
                let note: Note = serde_json::from_value(content.clone())
                    .map_err(|e| NotesError::validation("Note", e.to_string()))?;
                validate_note(&note)
            }
            SchemaKind::NotesList => {
                let list: NotesList = serde_json::from_value(content.clone())
                    .map_err(|e| NotesError::validation("NotesList", e.to_string()))?;
                validate_notes_list(&list)
            }
        }
    }
}

pub fn validate_note(note: &Note) -> Result<()> {
    if note.date.chars().count() > NOTE_DATE_MAX {
        return Err(NotesError::validation(
            "date",
            format!("longer than {} characters", NOTE_DATE_MAX),
        ));
    }
    if chrono::DateTime::parse_from_rfc3339(&note.date).is_err() {
        return Err(NotesError::validation("date", "not a date-time"));
    }
    if note.text.chars().count() > NOTE_TEXT_MAX {
        return Err(NotesError::validation(
            "text",
            format!("longer than {} characters", NOTE_TEXT_MAX),
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<()> {
    if title.chars().count() > NOTE_TITLE_MAX {
        return Err(NotesError::validation(
            "title",
            format!("longer than {} characters", NOTE_TITLE_MAX),
        ));
    }
    Ok(())
}

pub fn validate_notes_list(list: &NotesList) -> Result<()> {
    for item in &list.notes {
        let id = item.id.as_str();
        if id.chars().count() > NOTE_ID_MAX {
            return Err(NotesError::validation(
                "id",
                format!("longer than {} characters", NOTE_ID_MAX),
            ));
        }
        if id.len() <= DOC_ID_SCHEME.len() || !id.starts_with(DOC_ID_SCHEME) {
            return Err(NotesError::validation("id", "not a document URL"));
        }
        validate_title(&item.title)?;
    }
    Ok(())
}
