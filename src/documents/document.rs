//! A single editable buffer (tab) and its derived properties.

use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// DocumentId
// ---------------------------------------------------------------------------

/// Stable identifier of a document.  Never reused within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub(crate) u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc-{}", self.0)
    }
}

/// Accepts both the display form `doc-3` and a bare `3`.
impl FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("doc-").unwrap_or(s.trim());
        digits.parse().map(DocumentId)
    }
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Source language of a buffer, used for highlighting by the presentation
/// layer.  This core never validates syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    /// Infer the language from a display name: `*.py` is Python, anything
    /// else is JavaScript.
    ///
    /// ```
    /// use pyzart_studio::documents::Language;
    ///
    /// assert_eq!(Language::from_file_name("main.py"), Language::Python);
    /// assert_eq!(Language::from_file_name("beat.js"), Language::JavaScript);
    /// ```
    pub fn from_file_name(name: &str) -> Self {
        if name.ends_with(".py") {
            Language::Python
        } else {
            Language::JavaScript
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
        }
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One named buffer of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    display_name: String,
    content: String,
    language: Language,
}

impl Document {
    pub(crate) fn new(id: DocumentId, display_name: String, content: String) -> Self {
        let language = Language::from_file_name(&display_name);
        Self {
            id,
            display_name,
            content,
            language,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Line and character counts shown in the editor status bar.
    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            lines: self.content.split('\n').count(),
            length: self.content.chars().count(),
        }
    }

    pub(crate) fn set_content(&mut self, content: String) {
        self.content = content;
    }
}

/// Editor status-bar figures for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    /// Number of lines; an empty buffer still has one line.
    pub lines: usize,
    /// Length in characters.
    pub length: usize,
}
