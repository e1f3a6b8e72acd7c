//! Ordered set of open documents plus the active selection.
//!
//! Invariants upheld by every operation:
//!
//! * the registry always holds at least one document;
//! * the active selection always names a live document.

use thiserror::Error;

use super::document::{Document, DocumentId};

/// Display name of the document every registry starts with.
pub const MAIN_DOCUMENT_NAME: &str = "main.py";

/// Content seeded into documents created by [`DocumentRegistry::add_document`].
pub const NEW_DOCUMENT_TEMPLATE: &str = "# New file\nprint(\"Hello, World!\")";

/// Demo song seeded into the initial `main.py`.
pub const DEMO_SONG_TEMPLATE: &str = r#"# demo_song.py
# Demo song for Pyzart
# --------------------
# This is a sequential piano demo.
# It uses loops and simple chord progressions.
# Each note or chord is played one after another (no polyphony).
# Loops are used to repeat patterns efficiently.
# Chords are written as "C", "F", "G" instead of "Cmaj", etc.

piano = Piano()

# --- Intro: simple arpeggio ---
for i in range(3):
    piano.play_note("C", duration=0.5)
    piano.play_note("E", duration=0.5)
    piano.play_note("G", duration=0.5)
    piano.play_note("C", duration=1.0)

# --- Main chord progression ---
chords = ["C", "F", "G", "C"]
for chord in chords:
    piano.play_chord(chord, duration=1.0)

# --- Repeated motif ---
for i in range(2):
    piano.play_note("E", duration=0.5)
    piano.play_note("F", duration=0.5)
    piano.play_note("G", duration=1.0)

# --- Crescendo/Decrescendo effect ---
# Gradually speed up then slow down the note "C"
for i in range(1, 30):
    piano.play_note("C", duration=i/100)
for i in range(30, 1, -1):
    piano.play_note("C", duration=i/100)

# --- Closing chord ---
piano.play_chord("C", duration=2.0)
"#;

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No live document carries the given id.
    #[error("document {0} not found")]
    NotFound(DocumentId),
}

// ---------------------------------------------------------------------------
// NamingPolicy
// ---------------------------------------------------------------------------

/// How [`DocumentRegistry::add_document`] names new buffers:
/// `{prefix}{N}.{extension}` where `N` starts at `count + 1` and is bumped
/// until the name is free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    pub prefix: String,
    pub extension: String,
}

impl NamingPolicy {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    fn propose<'a>(&self, existing: impl Iterator<Item = &'a str> + Clone, count: usize) -> String {
        let mut index = count + 1;
        loop {
            let candidate = format!("{}{}.{}", self.prefix, index, self.extension);
            if !existing.clone().any(|name| name == candidate) {
                return candidate;
            }
            index += 1;
        }
    }
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::new("file", "py")
    }
}

// ---------------------------------------------------------------------------
// DocumentRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DocumentRegistry {
    documents: Vec<Document>,
    /// Index into `documents`; kept in range by every mutation.
    active: usize,
    next_id: u64,
}

impl DocumentRegistry {
    /// A registry holding the single `main.py` demo document, active.
    pub fn new() -> Self {
        Self::with_initial(MAIN_DOCUMENT_NAME, DEMO_SONG_TEMPLATE)
    }

    /// A registry whose sole, active document has the given name and content.
    pub fn with_initial(name: impl Into<String>, content: impl Into<String>) -> Self {
        let first = Document::new(DocumentId(1), name.into(), content.into());
        Self {
            documents: vec![first],
            active: 0,
            next_id: 2,
        }
    }

    /// Append a freshly named document seeded with the new-file template and
    /// make it active.
    pub fn add_document(&mut self, naming: &NamingPolicy) -> &Document {
        let name = naming.propose(
            self.documents.iter().map(Document::display_name),
            self.documents.len(),
        );
        let id = DocumentId(self.next_id);
        self.next_id += 1;

        log::debug!("documents: adding {id} as {name:?}");
        self.documents
            .push(Document::new(id, name, NEW_DOCUMENT_TEMPLATE.to_string()));
        self.active = self.documents.len() - 1;
        &self.documents[self.active]
    }

    /// Remove a document.  Closing the last remaining document, or an
    /// unknown id, is a silent no-op.  Returns whether anything was removed.
    ///
    /// When the active document is closed the first remaining document
    /// becomes active; otherwise the active document is unchanged.
    pub fn close_document(&mut self, id: DocumentId) -> bool {
        if self.documents.len() <= 1 {
            log::debug!("documents: refusing to close the last document");
            return false;
        }
        let Some(index) = self.position(id) else {
            return false;
        };

        self.documents.remove(index);
        if index == self.active {
            self.active = 0;
        } else if index < self.active {
            self.active -= 1;
        }
        log::debug!(
            "documents: closed {id}, active is now {}",
            self.documents[self.active].id()
        );
        true
    }

    /// Select the active document.  In-flight generation requests are not
    /// affected.
    pub fn set_active(&mut self, id: DocumentId) -> Result<(), RegistryError> {
        let index = self.position(id).ok_or(RegistryError::NotFound(id))?;
        self.active = index;
        Ok(())
    }

    /// Replace the content of a document.  No syntax validation happens here.
    pub fn update_content(
        &mut self,
        id: DocumentId,
        content: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let index = self.position(id).ok_or(RegistryError::NotFound(id))?;
        self.documents[index].set_content(content.into());
        Ok(())
    }

    pub fn active(&self) -> &Document {
        &self.documents[self.active]
    }

    pub fn active_id(&self) -> DocumentId {
        self.active().id()
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.iter().find(|doc| doc.id() == id)
    }

    /// Documents in display order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn position(&self, id: DocumentId) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id() == id)
    }
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
