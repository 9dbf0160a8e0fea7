//! JSON Lines corpus
//!
//! One record per line, UTF-8, appended and never rewritten.

use crate::record::ArticleRecord;
use crate::storage::traits::{CorpusResult, CorpusWriter};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Only the key needed for deduplication is read back
#[derive(Deserialize)]
struct UrlOnly {
    url: String,
}

/// A JSON Lines file holding article records
pub struct JsonlCorpus {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl JsonlCorpus {
    /// Opens a corpus at `path`; the file is created on first append
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> CorpusResult<&mut BufWriter<File>> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let mut file = OpenOptions::new()
                    .create(true)
                    .read(true)
                    .append(true)
                    .open(&self.path)?;
                terminate_last_line(&mut file)?;
                BufWriter::new(file)
            }
        };
        Ok(self.writer.insert(writer))
    }
}

/// Ends a partial last line left by an interrupted write
fn terminate_last_line(file: &mut File) -> std::io::Result<()> {
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        tracing::warn!("Corpus ends with a partial line, starting a new one");
        file.write_all(b"\n")?;
    }
    Ok(())
}

impl CorpusWriter for JsonlCorpus {
    /// Reads the URLs of every well-formed line
    ///
    /// Blank lines are ignored. Malformed lines are logged and skipped so
    /// one damaged line does not block a run.
    fn load_existing_urls(&self) -> CorpusResult<HashSet<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut urls = HashSet::new();
        // Byte lines: invalid UTF-8 only spoils its own line
        for (index, line) in BufReader::new(file).split(b'\n').enumerate() {
            let line = line?;
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<UrlOnly>(&line) {
                Ok(record) => {
                    urls.insert(record.url);
                }
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed line {} in {}: {}",
                        index + 1,
                        self.path.display(),
                        e
                    );
                }
            }
        }

        tracing::debug!("Loaded {} URLs from {}", urls.len(), self.path.display());
        Ok(urls)
    }

    fn append(&mut self, record: &ArticleRecord) -> CorpusResult<()> {
        let line = serde_json::to_string(record)?;
        let writer = self.writer()?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> CorpusResult<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for JsonlCorpus {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::error!("Failed to flush {}: {}", self.path.display(), e);
        }
    }
}
