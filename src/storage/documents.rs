//! Markdown document persistence.
//!
//! One file per article under the markdown directory, named from the
//! filesystem-sanitized title plus the numeric id. The file holds only the
//! rewritten markdown body.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::ArticleDetail;

/// Characters not allowed in filenames on common filesystems.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace forbidden filename characters with underscores.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) { '_' } else { c })
        .collect()
}

/// Filename for an article: `<sanitized-title>_<id>.md`.
pub fn document_filename(title: &str, id: u64) -> String {
    format!("{}_{}.md", sanitize_title(title), id)
}

/// Store for rewritten markdown documents.
pub struct DocumentStore {
    markdown_dir: PathBuf,
}

impl DocumentStore {
    pub fn new(markdown_dir: impl Into<PathBuf>) -> Self {
        Self {
            markdown_dir: markdown_dir.into(),
        }
    }

    pub fn markdown_dir(&self) -> &Path {
        &self.markdown_dir
    }

    /// Persist a rewritten body for the given article, returning the path.
    pub async fn save(&self, detail: &ArticleDetail, body: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.markdown_dir).await?;

        let path = self
            .markdown_dir
            .join(document_filename(&detail.summary.title, detail.summary.id));
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}
