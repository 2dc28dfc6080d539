//! Local persistence for documents and sync metadata.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── message.json          # Metadata snapshot (what is already downloaded)
//! ├── markdown/             # One rewritten markdown file per article
//! └── temp/                 # Scratch files during image rehosting
//! ```

pub mod documents;
pub mod metadata;

pub use documents::{document_filename, sanitize_title, DocumentStore};
pub use metadata::{MetadataSnapshot, MetadataStore};
