//! Crawler module for the harvest pipeline
//!
//! This module contains the crawling logic, including:
//! - Rendering search pages and collecting project links through the page cache
//! - Fetching and parsing project detail pages
//! - Downloading project images idempotently
//! - Coordinating the worker pool and corpus checkpoints

mod coordinator;
mod extractor;
mod fetcher;
mod images;
mod links;
mod renderer;

pub use coordinator::{run_harvest, Harvester, RunReport};
pub use extractor::{fetch_project, parse_project, select_images, sniff_year};
pub use fetcher::{build_http_client, fetch_html, fetch_image, FetchedImage};
pub use images::{extension_for_content_type, sanitize_name, ImageMaterializer};
pub use links::{collect_project_links, extract_project_links, search_page_url, CollectStats};
#[cfg(feature = "browser")]
pub use renderer::ChromeRenderer;
pub use renderer::{HttpRenderer, PageRenderer, SearchRenderer};
