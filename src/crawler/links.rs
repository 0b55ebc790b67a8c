//! Search page link collection
//!
//! Walks search pages 1..=N, reusing cached results where the exact page URL
//! has been seen before and rendering the rest. Pages that fail or yield no
//! project links are not cached, so the next run tries them again.

use crate::config::Config;
use crate::crawler::renderer::PageRenderer;
use crate::store::SearchPageCache;
use crate::Result;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

/// Counters from one collection pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub cache_hits: usize,
    pub pages_rendered: usize,
    pub pages_failed: usize,
    pub pages_empty: usize,
}

/// Builds the URL of one search page from the template
///
/// The template must not already carry the page parameter.
///
/// ```
/// use catalog_harvest::crawler::search_page_url;
///
/// let url = search_page_url("https://site/search?q=chairs", "page", 3);
/// assert_eq!(url, "https://site/search?q=chairs&page=3");
/// ```
pub fn search_page_url(search_url: &str, page_param: &str, page: u32) -> String {
    let separator = if search_url.ends_with('?') || search_url.ends_with('&') {
        ""
    } else if search_url.contains('?') {
        "&"
    } else {
        "?"
    };
    format!("{}{}{}={}", search_url, separator, page_param, page)
}

/// Extracts project detail links from rendered search page markup
///
/// Links are resolved against `page_url`, stripped of fragments, deduplicated
/// and sorted. Only http(s) links whose URL contains `marker` are kept.
pub fn extract_project_links(html: &str, page_url: &Url, marker: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let links: BTreeSet<String> = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| page_url.join(href.trim()).ok())
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|url| url.contains(marker))
        .collect();

    links.into_iter().collect()
}

/// Collects the deduplicated, sorted project links across all configured search pages
///
/// Cache writes happen as each new page is harvested; a failure to persist the
/// cache aborts collection. Render failures only drop that page's contribution.
pub async fn collect_project_links<R>(
    renderer: &R,
    cache: &mut SearchPageCache,
    config: &Config,
) -> Result<(Vec<String>, CollectStats)>
where
    R: PageRenderer,
{
    let crawler = &config.crawler;
    let extract = &config.extract;

    let mut all_links = BTreeSet::new();
    let mut stats = CollectStats::default();

    for page in 1..=crawler.max_pages {
        let page_url = search_page_url(&crawler.search_url, &extract.page_param, page);

        if let Some(cached) = cache.get(&page_url) {
            tracing::debug!("Using cached search page {}: {} links", page, cached.len());
            stats.cache_hits += 1;
            all_links.extend(cached.iter().cloned());
            continue;
        }

        tracing::info!("Rendering search page {}: {}", page, page_url);
        let html = match renderer.render(&page_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Search page {} failed, will retry next run: {}", page, e);
                stats.pages_failed += 1;
                continue;
            }
        };
        stats.pages_rendered += 1;

        let base = Url::parse(&page_url)?;
        let links = extract_project_links(&html, &base, &extract.project_link_marker);
        tracing::info!("  found {} projects on page {}", links.len(), page);

        if links.is_empty() {
            stats.pages_empty += 1;
            continue;
        }

        cache.put(&page_url, links.clone())?;
        all_links.extend(links);
    }

    Ok((all_links.into_iter().collect(), stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_page_url_separators() {
        assert_eq!(
            search_page_url("https://site/search", "p", 1),
            "https://site/search?p=1"
        );
        assert_eq!(
            search_page_url("https://site/search?f=a", "p", 2),
            "https://site/search?f=a&p=2"
        );
        assert_eq!(
            search_page_url("https://site/search?f=a&", "p", 3),
            "https://site/search?f=a&p=3"
        );
    }

    #[test]
    fn test_default_page_param_matches_catalog_format() {
        let config = Config::default();
        let url = search_page_url(&config.crawler.search_url, &config.extract.page_param, 7);
        assert!(url.ends_with("&solr%5Bpage%5D=7"));
    }

    #[test]
    fn test_extract_project_links() {
        let html = r##"
            <html><body>
                <a href="/en/project/lamp-1#gallery">Lamp</a>
                <a href="https://site.test/en/project/chair-2">Chair</a>
                <a href="/en/project/lamp-1">Lamp again</a>
                <a href="/en/about">About</a>
                <a href="mailto:info@site.test">Mail</a>
            </body></html>
        "##;
        let base = Url::parse("https://site.test/search?page=1").unwrap();

        let links = extract_project_links(html, &base, "/project/");
        assert_eq!(
            links,
            vec![
                "https://site.test/en/project/chair-2",
                "https://site.test/en/project/lamp-1",
            ]
        );
    }

    #[test]
    fn test_extract_project_links_empty_page() {
        let base = Url::parse("https://site.test/search?page=9").unwrap();
        let links = extract_project_links("<html><body>No results</body></html>", &base, "/project/");
        assert!(links.is_empty());
    }
}
