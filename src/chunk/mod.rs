//! Chunk export for the indexing pipeline
//!
//! Splits corpus documents into overlapping windows sized for embedding.
//! Text is split on the coarsest separator that occurs (paragraphs, then
//! lines, then words, then characters) and the pieces are merged back up to
//! `chunk_size` characters, carrying up to `chunk_overlap` characters of
//! context into the next chunk.

use crate::config::ChunkingConfig;
use crate::output::read_corpus;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Separators tried in order; the empty separator splits into characters
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// One line of the chunks file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub source_url: String,
    pub chunk_index: usize,
    pub text: String,
}

/// Splits `text` into chunks of at most `chunk_size` characters
///
/// A single word longer than `chunk_size` is split into characters, so no
/// chunk exceeds the limit. Chunks are trimmed and never empty.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let splitter = Splitter {
        chunk_size: chunk_size.max(1),
        chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
    };
    splitter.split(text, &SEPARATORS)
}

struct Splitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Splitter {
    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);
        let pieces = split_on(text, separator);

        let mut chunks = Vec::new();
        let mut small: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge(&small, separator));
                small.clear();
            }

            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split(piece, finer));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge(&small, separator));
        }

        chunks
    }

    /// Greedily joins pieces into windows, keeping an overlap tail
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            let joiner = if window.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_window(&window, separator) {
                    chunks.push(chunk);
                }

                // Shrink to the overlap, and far enough that `piece` fits
                loop {
                    let joiner = if window.is_empty() { 0 } else { sep_len };
                    let oversized = total > 0 && total + len + joiner > self.chunk_size;
                    if total <= self.chunk_overlap && !oversized {
                        break;
                    }
                    let Some(front) = window.pop_front() else {
                        break;
                    };
                    let trailing = if window.is_empty() { 0 } else { sep_len };
                    total -= char_len(front) + trailing;
                }
            }

            let joiner = if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
            total += len + joiner;
        }

        if let Some(chunk) = join_window(&window, separator) {
            chunks.push(chunk);
        }

        chunks
    }
}

/// First separator present in `text`, and the separators finer than it
fn pick_separator<'a, 'b>(text: &str, separators: &'b [&'a str]) -> (&'a str, &'b [&'a str]) {
    for (i, &separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator, &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

fn split_on<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    }
}

fn join_window(window: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Reads the corpus at `corpus_path` and writes its chunks to `chunks_path`
///
/// Returns the number of chunks written.
pub fn export_chunks(
    corpus_path: &Path,
    chunks_path: &Path,
    config: &ChunkingConfig,
) -> Result<usize> {
    let documents = read_corpus(corpus_path)?;

    if let Some(parent) = chunks_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(chunks_path)?);
    let mut written = 0;

    for document in &documents {
        let chunks = split_text(&document.text, config.chunk_size, config.chunk_overlap);
        tracing::debug!("{}: {} chunks", document.source_url, chunks.len());

        for (chunk_index, text) in chunks.into_iter().enumerate() {
            let record = ChunkRecord {
                source_url: document.source_url.clone(),
                chunk_index,
                text,
            };
            serde_json::to_writer(&mut writer, &record)?;
            writer.write_all(b"\n")?;
            written += 1;
        }
    }

    writer.flush()?;
    tracing::info!(
        "Exported {} chunks from {} documents to {}",
        written,
        documents.len(),
        chunks_path.display()
    );

    Ok(written)
}
