//! JSON-lines corpus file
//!
//! One JSON object per finished document, in crawl order. This is the
//! intermediate form the indexing pipeline (and `--export-chunks`) reads.

use crate::output::traits::{CorpusSink, ExtractedDocument, OutputResult};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Writes documents as `{source_url, text, retrieved_at}` lines
pub struct JsonlSink {
    writer: BufWriter<File>,
    written: u64,
}

impl JsonlSink {
    /// Creates (or truncates) the corpus file at `path`
    pub fn create(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Number of documents written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl CorpusSink for JsonlSink {
    fn accept(&mut self, document: &ExtractedDocument) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, document)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Reads a corpus file back, skipping blank lines
pub fn read_corpus(path: &Path) -> OutputResult<Vec<ExtractedDocument>> {
    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        documents.push(serde_json::from_str(&line)?);
    }

    Ok(documents)
}
