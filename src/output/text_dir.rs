//! One plain-text file per document
//!
//! Produces a directory of `<slug>.txt` files for loaders that index a
//! folder of text documents.

use crate::output::traits::{CorpusSink, ExtractedDocument, OutputResult};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

/// Writes each document's text to its own file
pub struct TextDirSink {
    dir: PathBuf,
    used: HashSet<String>,
}

impl TextDirSink {
    /// Creates the directory if needed
    pub fn create(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            used: HashSet::new(),
        })
    }

    /// Picks an unused file name for a document with this URL
    ///
    /// Tries the bare stem, then the stem with a URL digest, then the digested
    /// stem with a counter.
    fn next_path(&mut self, source_url: &str) -> PathBuf {
        let stem = file_stem(source_url);
        let digested = format!("{}-{}", stem, &url_digest(source_url)[..8]);

        let mut name = stem;
        let mut counter = 1;
        while !self.used.insert(name.clone()) {
            name = if counter == 1 {
                digested.clone()
            } else {
                format!("{}-{}", digested, counter)
            };
            counter += 1;
        }

        self.dir.join(format!("{}.txt", name))
    }
}

impl CorpusSink for TextDirSink {
    fn accept(&mut self, document: &ExtractedDocument) -> OutputResult<()> {
        let path = self.next_path(&document.source_url);
        std::fs::write(&path, document.text.as_bytes())?;
        tracing::trace!("Wrote {} to {}", document.source_url, path.display());
        Ok(())
    }
}

/// Derives a file stem from the last non-empty URL path segment
///
/// Falls back to a digest of the URL when no usable segment exists.
pub fn file_stem(source_url: &str) -> String {
    let segment = Url::parse(source_url).ok().and_then(|url| {
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
    });

    let slug: String = segment
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        url_digest(source_url)[..16].to_string()
    } else {
        slug.to_string()
    }
}

fn url_digest(source_url: &str) -> String {
    hex::encode(Sha256::digest(source_url.as_bytes()))
}
