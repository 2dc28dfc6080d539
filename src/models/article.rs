//! Article data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content kind as reported by the remote API.
///
/// The API exposes notes under the `section` type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ArticleKind {
    Article,
    Section,
}

impl ArticleKind {
    /// URL path segment for detail requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleKind::Article => "article",
            ArticleKind::Section => "section",
        }
    }
}

/// One entry of a monthly listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleSummary {
    /// Remote-assigned unique identifier
    pub id: u64,

    /// Content kind
    #[serde(rename = "type")]
    pub kind: ArticleKind,

    /// Article title
    pub title: String,

    /// Publication timestamp
    pub created_time: DateTime<Utc>,
}

/// Full article content as returned by the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub summary: ArticleSummary,

    /// Markdown body, consumed once during rewrite and persistence
    pub body: String,
}

/// Persisted per-article metadata: everything but the body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub id: u64,

    #[serde(rename = "type")]
    pub kind: ArticleKind,

    pub title: String,

    pub created_time: DateTime<Utc>,
}

impl From<&ArticleDetail> for ArticleMetadata {
    fn from(detail: &ArticleDetail) -> Self {
        Self {
            id: detail.summary.id,
            kind: detail.summary.kind,
            title: detail.summary.title.clone(),
            created_time: detail.summary.created_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ArticleKind::Section).unwrap(),
            "\"section\""
        );
        assert_eq!(
            serde_json::from_str::<ArticleKind>("\"article\"").unwrap(),
            ArticleKind::Article
        );
    }

    #[test]
    fn summary_parses_remote_shape() {
        let json = r#"{
            "id": 42,
            "type": "section",
            "title": "k8s notes",
            "created_time": "2025-03-01T08:30:00Z"
        }"#;
        let summary: ArticleSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.id, 42);
        assert_eq!(summary.kind, ArticleKind::Section);
        assert_eq!(summary.title, "k8s notes");
    }

    #[test]
    fn metadata_drops_body() {
        let detail = ArticleDetail {
            summary: ArticleSummary {
                id: 7,
                kind: ArticleKind::Article,
                title: "title".into(),
                created_time: Utc::now(),
            },
            body: "# heading".into(),
        };
        let meta = ArticleMetadata::from(&detail);
        assert_eq!(meta.id, 7);
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("body").is_none());
    }
}
