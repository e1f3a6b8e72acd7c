//! Document registry: the open buffers (tabs) and the active selection.
//!
//! ```
//! use pyzart_studio::documents::{DocumentRegistry, NamingPolicy};
//!
//! let mut registry = DocumentRegistry::new();          // main.py
//! let added = registry.add_document(&NamingPolicy::default()).id();
//! assert_eq!(registry.active_id(), added);             // file2.py
//!
//! registry.close_document(added);
//! assert_eq!(registry.active().display_name(), "main.py");
//! ```

pub mod document;
pub mod registry;

pub use document::{Document, DocumentId, DocumentStats, Language};
pub use registry::{
    DocumentRegistry, NamingPolicy, RegistryError, DEMO_SONG_TEMPLATE, MAIN_DOCUMENT_NAME,
    NEW_DOCUMENT_TEMPLATE,
};
