//! Data model definitions.

pub mod article;

pub use article::{ArticleDetail, ArticleKind, ArticleMetadata, ArticleSummary};
