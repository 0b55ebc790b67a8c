//! Statistics over a persisted corpus
//!
//! A read-only pass: counts records and local images, finds image paths that
//! do not resolve to a file under the output root, and summarizes description
//! lengths. Corpus order is irrelevant to every figure.

use crate::store::ProjectRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Corpus statistics summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStatistics {
    pub projects: ProjectCounts,
    pub local_images: ImageStatistics,
    pub description_words: DescriptionStatistics,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectCounts {
    pub count: usize,
    /// Records with an empty description, due for re-fetch
    pub incomplete: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImageStatistics {
    pub total: usize,
    /// Number of records by how many local images they hold
    pub per_project_distribution: BTreeMap<usize, usize>,
    pub missing_count: usize,
    pub missing_images: Vec<MissingImage>,
}

/// A `Local Images` entry with no file behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingImage {
    pub title: String,
    pub path_in_json: String,
    pub resolved_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DescriptionStatistics {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub avg: f64,
    pub bucket_distribution: WordBuckets,
}

/// Description word-count histogram
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WordBuckets {
    #[serde(rename = "<10")]
    pub under_10: usize,
    #[serde(rename = "10-29")]
    pub from_10_to_29: usize,
    #[serde(rename = "30-59")]
    pub from_30_to_59: usize,
    #[serde(rename = "60-99")]
    pub from_60_to_99: usize,
    #[serde(rename = "100+")]
    pub from_100: usize,
}

impl WordBuckets {
    fn record(&mut self, words: usize) {
        let bucket = match words {
            0..=9 => &mut self.under_10,
            10..=29 => &mut self.from_10_to_29,
            30..=59 => &mut self.from_30_to_59,
            60..=99 => &mut self.from_60_to_99,
            _ => &mut self.from_100,
        };
        *bucket += 1;
    }
}

/// Normalizes a stored image path to be relative to the output root
///
/// Backslashes become slashes, and a leading `./` or a redundant leading
/// segment equal to the output root's own name is removed.
pub fn normalize_local_path(path: &str, root_name: Option<&str>) -> String {
    let mut path = path.trim().replace('\\', "/");

    if let Some(rest) = path.strip_prefix("./") {
        path = rest.to_string();
    }

    if let Some(root) = root_name.filter(|r| !r.is_empty()) {
        if let Some(rest) = path.strip_prefix(&format!("{}/", root)) {
            path = rest.to_string();
        }
    }

    path
}

/// Computes statistics for `records`, resolving image paths under `output_dir`
pub fn compute_statistics(records: &[ProjectRecord], output_dir: &Path) -> CorpusStatistics {
    let root_name = output_dir.file_name().and_then(|n| n.to_str());

    let mut stats = CorpusStatistics::default();
    stats.projects.count = records.len();

    let mut word_counts = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        if record.is_incomplete() {
            stats.projects.incomplete += 1;
        }

        let images = &mut stats.local_images;
        *images
            .per_project_distribution
            .entry(record.local_images.len())
            .or_insert(0) += 1;

        for stored in &record.local_images {
            images.total += 1;

            let resolved = output_dir.join(normalize_local_path(stored, root_name));
            if !resolved.exists() {
                let title = if record.title.is_empty() {
                    format!("index-{}", idx)
                } else {
                    record.title.clone()
                };
                images.missing_images.push(MissingImage {
                    title,
                    path_in_json: stored.clone(),
                    resolved_path: resolved.display().to_string(),
                });
            }
        }

        if !record.is_incomplete() {
            let words = record.description.split_whitespace().count();
            word_counts.push(words);
            stats.description_words.bucket_distribution.record(words);
        }
    }

    stats.local_images.missing_count = stats.local_images.missing_images.len();

    let desc = &mut stats.description_words;
    desc.count = word_counts.len();
    if !word_counts.is_empty() {
        desc.min = word_counts.iter().copied().min().unwrap_or(0);
        desc.max = word_counts.iter().copied().max().unwrap_or(0);
        let avg = word_counts.iter().sum::<usize>() as f64 / word_counts.len() as f64;
        desc.avg = (avg * 100.0).round() / 100.0;
    }

    stats
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CorpusStatistics) {
    println!("=== Corpus Statistics ===\n");

    println!("Projects:");
    println!("  Total: {}", stats.projects.count);
    println!("  Incomplete (no description): {}", stats.projects.incomplete);
    println!();

    println!("Local Images:");
    println!("  Total: {}", stats.local_images.total);
    println!("  Missing on disk: {}", stats.local_images.missing_count);
    for (count, projects) in &stats.local_images.per_project_distribution {
        println!("  {} image(s): {} project(s)", count, projects);
    }
    println!();

    if !stats.local_images.missing_images.is_empty() {
        println!("Missing Images:");
        for missing in stats.local_images.missing_images.iter().take(20) {
            println!("  - {} ({})", missing.path_in_json, missing.title);
        }
        if stats.local_images.missing_count > 20 {
            println!("  ... and {} more", stats.local_images.missing_count - 20);
        }
        println!();
    }

    let desc = &stats.description_words;
    println!("Description Words:");
    println!(
        "  Count: {}, min {}, max {}, avg {:.2}",
        desc.count, desc.min, desc.max, desc.avg
    );
    let buckets = &desc.bucket_distribution;
    println!(
        "  <10: {}  10-29: {}  30-59: {}  60-99: {}  100+: {}",
        buckets.under_10,
        buckets.from_10_to_29,
        buckets.from_30_to_59,
        buckets.from_60_to_99,
        buckets.from_100
    );
}
