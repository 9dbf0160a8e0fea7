//! Batch converters
//!
//! This module turns pre-harvested article dumps into corpus records:
//! - Reading JSON Lines, CSV and JSON array inputs
//! - Mapping fields through a batch profile (author, section, language)
//! - Cleaning HTML bodies
//! - Deduplicating against the corpus by URL

mod profile;
mod reader;

pub use profile::{map_record, strip_html, Verdict};
pub use reader::{read_input, InputRecords, RawRecord};

use crate::config::{resolve_path, BatchConfig};
use crate::output::ConversionReport;
use crate::storage::CorpusWriter;
use std::path::Path;

/// Converts every input of a batch into the corpus
///
/// Input paths are resolved against the config file's directory. A
/// missing or unreadable input is warned about and skipped; the batch
/// carries on with the next one.
///
/// # Arguments
///
/// * `batch` - The batch profile
/// * `config_path` - Path of the config file the batch came from
/// * `corpus` - The corpus to append to
///
/// # Returns
///
/// * `Ok(ConversionReport)` - Counts of added and skipped records
/// * `Err(HarvestError)` - The corpus could not be read or written
pub fn convert_batch(
    batch: &BatchConfig,
    config_path: &Path,
    corpus: &mut dyn CorpusWriter,
) -> crate::Result<ConversionReport> {
    let mut existing = corpus.load_existing_urls()?;
    let mut report = ConversionReport::new(&batch.name);

    tracing::info!(
        "Converting batch {}: {} input(s), {} URLs already in corpus",
        batch.name,
        batch.inputs.len(),
        existing.len()
    );

    for input in &batch.inputs {
        let path = resolve_path(config_path, input);

        let records = match read_input(&path, batch.format) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Skipping input: {}", e);
                continue;
            }
        };

        report.malformed += records.malformed;
        let mut added_here = 0u32;

        for record in &records.records {
            if batch.max_per_input.map_or(false, |max| added_here >= max) {
                break;
            }

            match map_record(record, batch, &existing) {
                Verdict::Accepted(article) => {
                    corpus.append(&article)?;
                    existing.insert(article.url);
                    added_here += 1;
                }
                Verdict::Duplicate => report.skipped_duplicate += 1,
                Verdict::Empty => report.skipped_empty += 1,
                Verdict::Bad => report.skipped_bad += 1,
            }
        }

        tracing::info!(
            "{}: {} records, {} added, {} malformed",
            path.display(),
            records.records.len(),
            added_here,
            records.malformed
        );
        report.added += added_here;
    }

    corpus.flush()?;
    Ok(report)
}
