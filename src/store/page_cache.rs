//! Append-only cache of search page results
//!
//! Each entry maps the literal search page URL to the project links found on
//! it. Entries are never changed or removed once written, and every insert is
//! persisted immediately so a crash loses at most the page in flight.

use crate::store::atomic::{load_json, save_json};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// A persisted search page and the project links found on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPageCacheEntry {
    #[serde(rename = "Search Page URL")]
    pub page_url: String,

    #[serde(rename = "Project URLs", default)]
    pub project_urls: Vec<String>,
}

/// Search page cache backed by a JSON file
#[derive(Debug)]
pub struct SearchPageCache {
    path: PathBuf,
    entries: Vec<SearchPageCacheEntry>,
    index: HashMap<String, usize>,
}

impl SearchPageCache {
    /// Loads the cache file, starting empty if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<SearchPageCacheEntry> = load_json(path)?;

        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            index.entry(entry.page_url.clone()).or_insert(i);
        }

        Ok(Self {
            path: path.to_path_buf(),
            entries,
            index,
        })
    }

    /// Project links recorded for a search page URL
    pub fn get(&self, page_url: &str) -> Option<&[String]> {
        self.index
            .get(page_url)
            .map(|&i| self.entries[i].project_urls.as_slice())
    }

    pub fn contains(&self, page_url: &str) -> bool {
        self.index.contains_key(page_url)
    }

    /// Records a page and persists the whole cache
    ///
    /// Duplicate links are dropped keeping first-seen order. Returns `false`
    /// without touching anything if the page is already cached.
    pub fn put(&mut self, page_url: &str, project_urls: Vec<String>) -> Result<bool> {
        if self.contains(page_url) {
            return Ok(false);
        }

        let mut seen = HashSet::new();
        let project_urls: Vec<String> = project_urls
            .into_iter()
            .filter(|url| seen.insert(url.clone()))
            .collect();

        self.entries.push(SearchPageCacheEntry {
            page_url: page_url.to_string(),
            project_urls,
        });
        self.index
            .insert(page_url.to_string(), self.entries.len() - 1);

        save_json(&self.path, &self.entries)?;
        Ok(true)
    }

    pub fn entries(&self) -> &[SearchPageCacheEntry] {
        &self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search_pages.json");

        let mut cache = SearchPageCache::load(&path).unwrap();
        assert!(cache.is_empty());

        let inserted = cache
            .put(
                "https://site/search?q=1&page=1",
                vec![
                    "https://site/project/a".to_string(),
                    "https://site/project/b".to_string(),
                    "https://site/project/a".to_string(),
                ],
            )
            .unwrap();
        assert!(inserted);

        let reloaded = SearchPageCache::load(&path).unwrap();
        assert_eq!(
            reloaded.get("https://site/search?q=1&page=1").unwrap(),
            ["https://site/project/a", "https://site/project/b"]
        );
    }

    #[test]
    fn test_existing_entries_are_never_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search_pages.json");
        let mut cache = SearchPageCache::load(&path).unwrap();

        cache
            .put("https://site/search?page=1", vec!["https://site/project/a".to_string()])
            .unwrap();
        let inserted = cache
            .put("https://site/search?page=1", vec!["https://site/project/z".to_string()])
            .unwrap();

        assert!(!inserted);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("https://site/search?page=1").unwrap(),
            ["https://site/project/a"]
        );
    }

    #[test]
    fn test_reads_persisted_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search_pages.json");
        std::fs::write(
            &path,
            r#"[{"Search Page URL": "https://site/search?page=2", "Project URLs": ["https://site/project/x"]}]"#,
        )
        .unwrap();

        let cache = SearchPageCache::load(&path).unwrap();
        assert!(cache.contains("https://site/search?page=2"));
        assert!(!cache.contains("https://site/search?page=3"));
        assert_eq!(cache.entries()[0].project_urls.len(), 1);
    }
}
