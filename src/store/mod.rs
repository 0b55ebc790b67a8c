//! Storage module for the on-disk corpus
//!
//! All state lives in flat JSON files under the output directory:
//! - the project corpus (`projects.json`)
//! - the search page cache (`search_pages.json`)
//!
//! Every write goes through [`save_json`], which replaces files atomically.

mod atomic;
mod corpus;
mod page_cache;

pub use atomic::{load_json, save_json, save_json_with_hook};
pub use corpus::{Corpus, Placement, ProjectRecord};
pub use page_cache::{SearchPageCache, SearchPageCacheEntry};
