//! Project detail page extraction
//!
//! Turns a detail page into a [`ProjectRecord`] with remote image URLs. Fields
//! that are missing from the markup resolve to defaults rather than errors; an
//! empty description marks the record incomplete so a later run fetches it again.
//!
//! # Image selection
//!
//! Gallery and carousel images come before a trailing "related items" section
//! whose images use the same URL patterns. The two can only be told apart by
//! document order, so the extractor walks the tree in pre-order and stops at the
//! element holding the first text that matches the boundary phrase.

use crate::config::ExtractConfig;
use crate::crawler::fetcher::fetch_html;
use crate::store::ProjectRecord;
use crate::Result;
use regex::{Regex, RegexBuilder};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

/// First four-digit token in 1900..=2039
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(19\d{2}|20[0-3]\d)\b").expect("YEAR_RE: hardcoded regex is valid")
});

/// Fetches a detail page and extracts its record
///
/// `images` holds remote URLs; `local_images` is left empty for the materializer.
pub async fn fetch_project(
    client: &Client,
    project_url: &str,
    extract: &ExtractConfig,
    timeout: Duration,
) -> Result<ProjectRecord> {
    let html = fetch_html(client, project_url, timeout).await?;
    let base_url = Url::parse(project_url)?;
    Ok(parse_project(&html, project_url, &base_url, extract))
}

/// Extracts a record from detail page markup
pub fn parse_project(
    html: &str,
    project_url: &str,
    base_url: &Url,
    extract: &ExtractConfig,
) -> ProjectRecord {
    let document = Html::parse_document(html);

    let title = select_text(&document, &extract.title_selector, "")
        .unwrap_or_else(|| "Unknown".to_string());
    let category = select_text(&document, &extract.category_selector, " / ").unwrap_or_default();
    let description =
        select_text(&document, &extract.description_selector, "\n").unwrap_or_default();

    ProjectRecord {
        title,
        year: sniff_year(html),
        category,
        description,
        project_url: project_url.to_string(),
        images: select_images(&document, base_url, extract),
        local_images: Vec::new(),
    }
}

/// Best-effort year: the first plausible four-digit number anywhere in the raw page
///
/// This can pick up an unrelated number such as a phone extension or a price.
pub fn sniff_year(raw: &str) -> String {
    YEAR_RE
        .find(raw)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Collects gallery image URLs that appear before the boundary phrase
///
/// Candidates come from `img` (`src`, falling back to `data-src`) and `a`
/// (`href`). Results are absolute, fragment-free and deduplicated in
/// first-seen order.
pub fn select_images(document: &Html, base_url: &Url, extract: &ExtractConfig) -> Vec<String> {
    let container = ["main", "body"]
        .iter()
        .filter_map(|name| Selector::parse(name).ok())
        .find_map(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let boundary_text = RegexBuilder::new(&regex::escape(&extract.boundary_phrase))
        .case_insensitive(true)
        .build()
        .ok()
        .and_then(|matcher| {
            document
                .root_element()
                .descendants()
                .find(|node| node.value().as_text().is_some_and(|t| matcher.is_match(t)))
        });

    // Stop at the element holding the phrase, or at the text itself when that
    // element encloses the whole walk.
    let boundary = boundary_text.map(|text| match text.parent() {
        Some(parent)
            if parent.id() != container.id()
                && !container.ancestors().any(|a| a.id() == parent.id()) =>
        {
            parent.id()
        }
        _ => text.id(),
    });

    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for node in container.descendants() {
        if Some(node.id()) == boundary {
            break;
        }

        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };

        let candidate = match element.value().name() {
            "img" => non_empty_attr(element, "src").or_else(|| non_empty_attr(element, "data-src")),
            "a" => non_empty_attr(element, "href"),
            _ => None,
        };

        if let Some(url) = candidate.and_then(|raw| accept_image_url(raw, base_url, extract)) {
            if seen.insert(url.clone()) {
                images.push(url);
            }
        }
    }

    images
}

/// Resolves `raw` if it carries a project-image or carousel marker
fn accept_image_url(raw: &str, base_url: &Url, extract: &ExtractConfig) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.split('#').next().unwrap_or(raw);
    if raw.is_empty() {
        return None;
    }

    let is_project_image = extract
        .image_path_markers
        .iter()
        .any(|marker| raw.contains(marker.as_str()));
    let is_slider_image = !extract.slider_markers.is_empty()
        && extract
            .slider_markers
            .iter()
            .all(|marker| raw.contains(marker.as_str()));

    if !is_project_image && !is_slider_image {
        return None;
    }

    let mut url = base_url.join(raw).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}

fn non_empty_attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element
        .value()
        .attr(name)
        .filter(|value| !value.trim().is_empty())
}

/// Text of the first element matching `selector`, trimmed pieces joined by `separator`
///
/// `None` when nothing matches; an invalid selector behaves as no match.
fn select_text(document: &Html, selector: &str, separator: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document.select(&selector).next().map(|element| {
        element
            .text()
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(separator)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://catalog.test/en/project/lamp-123").unwrap()
    }

    fn parse(html: &str) -> ProjectRecord {
        parse_project(
            html,
            "https://catalog.test/en/project/lamp-123",
            &base_url(),
            &ExtractConfig::default(),
        )
    }

    #[test]
    fn test_boundary_excludes_related_items() {
        let html = r#"
            <html><body><main>
                <div class="gallery">
                    <img src="/fileadmin/projects_pim/lamp/1.jpg">
                    <img data-src="/fileadmin/projects_pim/lamp/2.jpg">
                </div>
                <section>
                    <h2>Others Interested Too</h2>
                    <img src="/fileadmin/projects_pim/other/9.jpg">
                </section>
            </main></body></html>
        "#;

        let record = parse(html);
        assert_eq!(
            record.images,
            vec![
                "https://catalog.test/fileadmin/projects_pim/lamp/1.jpg",
                "https://catalog.test/fileadmin/projects_pim/lamp/2.jpg",
            ]
        );
    }

    #[test]
    fn test_boundary_text_directly_in_container() {
        let html = r#"<html><body><img src="/projects_pim/1.jpg"><img src="/projects_pim/2.jpg">Others interested too<img src="/projects_pim/9.jpg"></body></html>"#;

        let record = parse(html);
        assert_eq!(
            record.images,
            vec![
                "https://catalog.test/projects_pim/1.jpg",
                "https://catalog.test/projects_pim/2.jpg",
            ]
        );
    }

    #[test]
    fn test_boundary_text_in_main_after_images() {
        let html = r#"
            <html><body><main>
                <img src="/fileadmin/projects_pim/lamp/1.jpg">
                Others interested too
                <a href="/fileadmin/projects_pim/other/9.jpg">Related</a>
            </main></body></html>
        "#;

        let record = parse(html);
        assert_eq!(
            record.images,
            vec!["https://catalog.test/fileadmin/projects_pim/lamp/1.jpg"]
        );
    }

    #[test]
    fn test_slider_links_need_all_markers() {
        let html = r##"
            <html><body>
                <a href="/index.php?eID=tx_solr_image&usage=slider&id=1#zoom">slide</a>
                <a href="/index.php?eID=tx_solr_image&usage=teaser&id=2">teaser</a>
                <a href="/en/project/other-1">not an image</a>
            </body></html>
        "##;

        let record = parse(html);
        assert_eq!(
            record.images,
            vec!["https://catalog.test/index.php?eID=tx_solr_image&usage=slider&id=1"]
        );
    }

    #[test]
    fn test_images_deduplicated_in_first_seen_order() {
        let html = r#"
            <html><body><main>
                <a href="/projects_pim/b.jpg"><img src="/projects_pim/b.jpg"></a>
                <img src="/projects_pim/a.jpg">
                <img src="https://cdn.catalog.test/projects_pim/b.jpg">
            </main></body></html>
        "#;

        let record = parse(html);
        assert_eq!(
            record.images,
            vec![
                "https://catalog.test/projects_pim/b.jpg",
                "https://catalog.test/projects_pim/a.jpg",
                "https://cdn.catalog.test/projects_pim/b.jpg",
            ]
        );
    }

    #[test]
    fn test_empty_src_falls_back_to_lazy_attribute() {
        let html = r#"<html><body><img src="" data-src="/projects_pim/lazy.png"></body></html>"#;
        let record = parse(html);
        assert_eq!(record.images, vec!["https://catalog.test/projects_pim/lazy.png"]);
    }

    #[test]
    fn test_fields_extracted() {
        let html = r#"
            <html><body>
                <nav class="breadcrumb"><a>Design</a> <span>Lighting</span></nav>
                <h1>  Aurora   Lamp </h1>
                <p>Award 2024</p>
                <div class="project-description"><p>Soft light.</p><p>Dimmable.</p></div>
            </body></html>
        "#;

        let record = parse(html);
        assert_eq!(record.title, "Aurora   Lamp");
        assert_eq!(record.category, "Design / Lighting");
        assert_eq!(record.year, "2024");
        assert_eq!(record.description, "Soft light.\nDimmable.");
        assert_eq!(record.project_url, "https://catalog.test/en/project/lamp-123");
        assert!(!record.is_incomplete());
        assert!(record.local_images.is_empty());
    }

    #[test]
    fn test_missing_fields_resolve_to_defaults() {
        let record = parse("<html><body><p>nothing here</p></body></html>");
        assert_eq!(record.title, "Unknown");
        assert_eq!(record.category, "");
        assert_eq!(record.year, "");
        assert!(record.is_incomplete());
        assert!(record.images.is_empty());
    }

    #[test]
    fn test_sniff_year_range() {
        assert_eq!(sniff_year("since 1899, est. 1900"), "1900");
        assert_eq!(sniff_year("model 2040 released 2039"), "2039");
        assert_eq!(sniff_year("id 12024 and 20245"), "");
        // heuristic: first match wins even if unrelated
        assert_eq!(sniff_year("call 1985 today, award 2023"), "1985");
    }
}
