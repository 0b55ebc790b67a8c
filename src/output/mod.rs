//! Output module for corpus reports
//!
//! This module handles:
//! - Computing statistics over the persisted corpus
//! - Writing the summary report next to the corpus

pub mod stats;

pub use stats::{compute_statistics, normalize_local_path, print_statistics, CorpusStatistics};

use crate::config::OutputConfig;
use crate::store::{save_json, Corpus};
use crate::Result;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Summary report as written to disk
#[derive(Debug, Clone, Serialize)]
pub struct CorpusSummary {
    pub generated_at: String,
    #[serde(flatten)]
    pub statistics: CorpusStatistics,
}

impl CorpusSummary {
    pub fn new(statistics: CorpusStatistics, generated_at: DateTime<Local>) -> Self {
        Self {
            generated_at: generated_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            statistics,
        }
    }
}

/// Loads the corpus, computes its statistics and writes the summary file
///
/// # Returns
///
/// * `Ok(CorpusSummary)` - The summary that was written
/// * `Err(HarvestError)` - Failed to read the corpus or write the summary
pub fn generate_summary(output: &OutputConfig) -> Result<CorpusSummary> {
    let corpus = Corpus::load(&output.projects_path())?;
    let statistics = compute_statistics(corpus.records(), &output.output_dir);
    let summary = CorpusSummary::new(statistics, Local::now());

    save_json(&output.summary_path(), &summary)?;
    tracing::info!("Summary written to {}", output.summary_path().display());

    Ok(summary)
}
