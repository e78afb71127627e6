use crate::error::{NotesError, Result};
use chrono::{SecondsFormat, Utc};
use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// URL scheme every document id carries in its canonical form.
pub const DOC_ID_SCHEME: &str = "ceramic://";

pub const SEED_LEN: usize = 32;

/// The secret an identity is derived from.
///
/// Parsed from (and printed as) a base16 string of [`SEED_LEN`] bytes. `Debug`
/// never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The `did:key` identity signed for by this seed's Ed25519 key.
    pub fn did(&self) -> String {
        let key = SigningKey::from_bytes(&self.0);
        format!("did:key:{}", hex::encode(key.verifying_key().to_bytes()))
    }
}

impl FromStr for Seed {
    type Err = NotesError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| NotesError::InvalidSeed(e.to_string()))?;
        let bytes: [u8; SEED_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            NotesError::InvalidSeed(format!(
                "expected {} bytes, got {}",
                SEED_LEN,
                b.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Identifier of a document on the network, always held in URL form
/// (`ceramic://<stream>`). A bare stream id is accepted on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocId(String);

impl DocId {
    /// A fresh id, as a network assigns on document creation.
    pub fn generate() -> Self {
        Self(format!("{}{}", DOC_ID_SCHEME, Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The stream part of the URL, without scheme or `?version=` suffix.
    pub fn stream_id(&self) -> &str {
        let rest = &self.0[DOC_ID_SCHEME.len()..];
        rest.split('?').next().unwrap_or(rest)
    }

    /// The id of the stream head, with any `?version=` suffix dropped.
    pub fn head(&self) -> DocId {
        Self(format!("{}{}", DOC_ID_SCHEME, self.stream_id()))
    }
}

impl FromStr for DocId {
    type Err = NotesError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let stream = s.strip_prefix(DOC_ID_SCHEME).unwrap_or(s);
        let bare = stream.split('?').next().unwrap_or_default();
        if bare.is_empty() || stream.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(NotesError::InvalidDocId(s.to_string()));
        }
        Ok(Self(format!("{}{}", DOC_ID_SCHEME, stream)))
    }
}

impl TryFrom<String> for DocId {
    type Error = NotesError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DocId> for String {
    fn from(id: DocId) -> Self {
        id.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entry of the notes index: points at a note document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteItem {
    pub id: DocId,
    pub title: String,
}

impl NoteItem {
    pub fn new(id: DocId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// The keyed record stored under the `notes` definition, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesList {
    #[serde(default)]
    pub notes: Vec<NoteItem>,
}

/// Content of a note document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub date: String,
    pub text: String,
}

impl Note {
    /// A note stamped with the current time.
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            text: text.into(),
        }
    }
}
