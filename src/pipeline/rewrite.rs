//! Markdown image rehosting.
//!
//! Scans a document body for `![alt](url)` references. Each reference is
//! independently downloaded to a scratch file, uploaded to the image host,
//! and substituted in place. A failure in any step leaves that one reference
//! byte-for-byte unchanged; a single broken image never fails the document.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::services::{BlogClient, ImageHost};

/// Markdown image reference syntax.
static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("image regex is valid"));

/// Rewrites embedded image references to rehosted URLs.
///
/// Invocations are self-contained: concurrent rewrites of different
/// documents share only the client (rate limiter included) and the host.
pub struct ContentRewriter {
    client: Arc<BlogClient>,
    host: Arc<dyn ImageHost>,
    temp_dir: PathBuf,
}

impl ContentRewriter {
    pub fn new(client: Arc<BlogClient>, host: Arc<dyn ImageHost>, temp_dir: PathBuf) -> Self {
        Self {
            client,
            host,
            temp_dir,
        }
    }

    /// Rewrite every image reference in `body`, best-effort per reference.
    ///
    /// References are discovered in body order; each substitution lands at
    /// its own match span, so document order is preserved no matter how the
    /// individual rehosts turn out.
    pub async fn rewrite(&self, body: &str) -> String {
        let mut out = String::with_capacity(body.len());
        let mut tail = 0;

        for caps in IMAGE_RE.captures_iter(body) {
            let whole = caps.get(0).expect("group 0 always present");
            let alt = &caps[1];
            let url = &caps[2];

            out.push_str(&body[tail..whole.start()]);
            match self.rehost(url).await {
                Ok(new_url) => {
                    log::info!("Rehosted image {} -> {}", url, new_url);
                    out.push_str(&format!("![{alt}]({new_url})"));
                }
                Err(e) => {
                    log::warn!("Image rehost failed for {}: {}", url, e);
                    out.push_str(whole.as_str());
                }
            }
            tail = whole.end();
        }

        out.push_str(&body[tail..]);
        out
    }

    /// Download one image to scratch, upload it, and clean up.
    async fn rehost(&self, url: &str) -> Result<String> {
        let bytes = self.client.download_image(url).await?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let scratch = self.temp_dir.join(scratch_filename(url));
        tokio::fs::write(&scratch, &bytes).await?;

        let uploaded = self.host.upload(&scratch).await;

        // Scratch file goes away whether or not the upload succeeded.
        if let Err(e) = tokio::fs::remove_file(&scratch).await {
            log::warn!("Failed to remove scratch file {:?}: {}", scratch, e);
        }

        uploaded
    }
}

/// Derive a scratch filename from the URL path's basename.
///
/// A URL with no usable basename gets a timestamp-based synthetic name to
/// avoid collisions.
fn scratch_filename(image_url: &str) -> String {
    let basename = url::Url::parse(image_url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(String::from))
        })
        .filter(|name| !name.is_empty());

    basename.unwrap_or_else(|| format!("image_{}.png", Utc::now().format("%Y%m%d%H%M%S%f")))
}
