use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub extract: ExtractConfig,
}

/// Which client renders search pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RendererKind {
    /// Headless Chrome; needed when listings are populated by client-side script
    Chrome,
    /// Plain GET of the page markup
    Http,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Search URL template without the page parameter
    pub search_url: String,

    /// Number of search pages to walk
    pub max_pages: u32,

    /// Settle time after each rendered search page (milliseconds)
    pub page_wait_ms: u64,

    /// Delay applied by each worker after finishing a project (milliseconds)
    pub detail_delay_ms: u64,

    /// Size of the detail worker pool
    pub workers: usize,

    /// Persist the corpus after this many consolidated successes
    pub checkpoint_every: usize,

    /// Run the browser without a window
    pub headless: bool,

    pub renderer: RendererKind,

    /// Wall-clock limit on rendering one search page (seconds)
    pub render_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.red-dot.org/search?solr%5Bfilter%5D%5B%5D=meta_categories%3A%2F11%2F".to_string(),
            max_pages: 10,
            page_wait_ms: 2500,
            detail_delay_ms: 800,
            workers: 8,
            checkpoint_every: 5,
            headless: false,
            renderer: RendererKind::Chrome,
            render_timeout_secs: 60,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    pub user_agent: String,

    /// Timeout for detail page fetches (seconds)
    pub page_timeout_secs: u64,

    /// Timeout for image downloads (seconds)
    pub image_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
            page_timeout_secs: 20,
            image_timeout_secs: 30,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory for the corpus, the page cache and image folders
    pub output_dir: PathBuf,

    pub projects_file: String,

    pub search_cache_file: String,

    pub summary_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data"),
            projects_file: "projects.json".to_string(),
            search_cache_file: "search_pages.json".to_string(),
            summary_file: "summary.json".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn projects_path(&self) -> PathBuf {
        self.output_dir.join(&self.projects_file)
    }

    pub fn search_cache_path(&self) -> PathBuf {
        self.output_dir.join(&self.search_cache_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(&self.summary_file)
    }
}

/// Markers that drive link and image selection on the source site
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExtractConfig {
    /// Query parameter name appended to the search URL for pagination
    pub page_param: String,

    /// Path fragment identifying project detail links on search pages
    pub project_link_marker: String,

    /// CSS selector for the project title
    pub title_selector: String,

    /// CSS selector for the breadcrumb-like category element
    pub category_selector: String,

    /// CSS selector for the description block
    pub description_selector: String,

    /// Case-insensitive text that starts the trailing "related items" section
    pub boundary_phrase: String,

    /// An image URL containing any of these is a project image
    pub image_path_markers: Vec<String>,

    /// An image URL containing all of these is a carousel image
    pub slider_markers: Vec<String>,

    /// Extension used when the image response has no known content type
    pub default_image_extension: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            page_param: "solr%5Bpage%5D".to_string(),
            project_link_marker: "/project/".to_string(),
            title_selector: "h1".to_string(),
            category_selector: ".breadcrumb".to_string(),
            description_selector: ".project-description".to_string(),
            boundary_phrase: "Others interested too".to_string(),
            image_path_markers: vec!["projects_pim".to_string()],
            slider_markers: vec!["eID=tx_solr_image".to_string(), "usage=slider".to_string()],
            default_image_extension: ".jpg".to_string(),
        }
    }
}
