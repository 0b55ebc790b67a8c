//! The project corpus and its persisted record shape

use crate::store::atomic::{load_json, save_json};
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// One catalog entry as persisted in the corpus file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(rename = "Title", default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Four-digit year sniffed from the page, or empty
    #[serde(rename = "Year", default, deserialize_with = "null_as_default")]
    pub year: String,

    #[serde(rename = "Category", default, deserialize_with = "null_as_default")]
    pub category: String,

    #[serde(rename = "Description", default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Natural key for merge and dedup
    #[serde(rename = "Project URL", default, deserialize_with = "null_as_default")]
    pub project_url: String,

    /// Remote image URLs in first-seen order
    #[serde(rename = "Images", default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,

    /// Paths relative to the output root, one per entry in `images`
    #[serde(rename = "Local Images", default, deserialize_with = "null_as_default")]
    pub local_images: Vec<String>,
}

impl ProjectRecord {
    /// A record without a description is eligible for re-fetch
    pub fn is_incomplete(&self) -> bool {
        self.description.trim().is_empty()
    }

    /// True once every remote image has a local counterpart
    pub fn is_materialized(&self) -> bool {
        self.local_images.len() == self.images.len()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Where [`Corpus::upsert`] placed a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Overwrote the existing record at this index
    Replaced(usize),
    /// Appended a new record at this index
    Appended(usize),
}

/// Ordered project records plus a URL index
///
/// Order is insertion order: existing records are overwritten in place and new
/// ones are appended.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<ProjectRecord>,
    index: HashMap<String, usize>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a corpus from records in persisted order
    ///
    /// Records with an empty URL are kept but not indexed. When a URL appears
    /// twice the later record owns the index entry.
    pub fn from_records(records: Vec<ProjectRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.project_url.is_empty())
            .map(|(i, r)| (r.project_url.clone(), i))
            .collect();

        Self { records, index }
    }

    /// Loads the corpus file; a missing file is an empty corpus
    pub fn load(path: &Path) -> Result<Self> {
        let records: Vec<ProjectRecord> = load_json(path)?;
        Ok(Self::from_records(records))
    }

    /// Writes a full snapshot atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, &self.records)
    }

    pub fn get(&self, project_url: &str) -> Option<&ProjectRecord> {
        self.index.get(project_url).map(|&i| &self.records[i])
    }

    /// Absent or incomplete URLs need fetching
    pub fn needs_fetch(&self, project_url: &str) -> bool {
        self.get(project_url).map_or(true, ProjectRecord::is_incomplete)
    }

    /// Returns the URLs from `links` that need fetching, in link order, without duplicates
    pub fn todo_list<'a, I>(&self, links: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        links
            .into_iter()
            .filter(|url| seen.insert(*url))
            .filter(|url| self.needs_fetch(url))
            .map(str::to_string)
            .collect()
    }

    /// Overwrites the record for the same URL in place, or appends it
    pub fn upsert(&mut self, record: ProjectRecord) -> Placement {
        match self.index.get(&record.project_url) {
            Some(&i) => {
                self.records[i] = record;
                Placement::Replaced(i)
            }
            None => {
                let i = self.records.len();
                self.index.insert(record.project_url.clone(), i);
                self.records.push(record);
                Placement::Appended(i)
            }
        }
    }

    pub fn records(&self) -> &[ProjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
