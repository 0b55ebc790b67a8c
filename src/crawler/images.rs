//! Image materialization
//!
//! Downloads a project's images into `<output>/<sanitized title>/image_<n>.<ext>`,
//! skipping any index that already has a file on disk regardless of its
//! extension. Paths handed back are relative to the output root.

use crate::crawler::fetcher::fetch_image;
use crate::{HarvestError, Result};
use regex::Regex;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Longest folder name derived from a title, in characters
const MAX_NAME_CHARS: usize = 160;

static HOSTILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[\\/:*?"<>|\x00-\x1f]+"#).expect("HOSTILE_RE: hardcoded regex is valid")
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE: hardcoded regex is valid"));

/// Content type → file extension
const EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/png", ".png"),
    ("image/webp", ".webp"),
    ("image/gif", ".gif"),
    ("image/bmp", ".bmp"),
    ("image/tiff", ".tiff"),
    ("image/svg+xml", ".svg"),
];

/// Turns a title into a folder name that is safe on common filesystems
///
/// ```
/// use catalog_harvest::crawler::sanitize_name;
///
/// assert_eq!(sanitize_name("  Lamp: A/B   test "), "Lamp_ A_B test");
/// ```
pub fn sanitize_name(name: &str) -> String {
    let name = WHITESPACE_RE.replace_all(name.trim(), " ");
    let name = HOSTILE_RE.replace_all(&name, "_");
    let name: String = name.chars().take(MAX_NAME_CHARS).collect();
    let name = name.trim_end();

    match name {
        "" | "." | ".." => "Unknown".to_string(),
        _ => name.to_string(),
    }
}

/// Picks a file extension for a declared content type
///
/// Parameters such as `; charset=...` are ignored. Unknown or missing types
/// get `default`.
pub fn extension_for_content_type(content_type: Option<&str>, default: &str) -> String {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    EXTENSIONS
        .iter()
        .find(|(known, _)| *known == mime)
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_else(|| default.to_string())
}

/// Downloads project images into the output tree
#[derive(Debug, Clone)]
pub struct ImageMaterializer {
    client: Client,
    output_dir: PathBuf,
    timeout: Duration,
    default_extension: String,
}

impl ImageMaterializer {
    pub fn new(
        client: Client,
        output_dir: impl Into<PathBuf>,
        timeout: Duration,
        default_extension: impl Into<String>,
    ) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            timeout,
            default_extension: default_extension.into(),
        }
    }

    /// Returns one relative local path per remote image, downloading only missing ones
    ///
    /// The first failed download aborts the record. Files already written stay
    /// on disk and are picked up by the next attempt.
    ///
    /// The folder is derived from the title alone. Projects whose titles
    /// sanitize to the same name share it, so the later one reuses the earlier
    /// one's `image_<n>` files.
    pub async fn materialize(&self, title: &str, images: &[String]) -> Result<Vec<String>> {
        let folder_name = sanitize_name(title);
        let folder = self.output_dir.join(&folder_name);
        tokio::fs::create_dir_all(&folder).await?;

        let mut local_images = Vec::with_capacity(images.len());

        for (i, image_url) in images.iter().enumerate() {
            let index = i + 1;

            if let Some(existing) = find_existing(&folder, index).await? {
                tracing::debug!("Reusing {}/{} for {}", folder_name, existing, image_url);
                local_images.push(format!("{}/{}", folder_name, existing));
                continue;
            }

            let image = fetch_image(&self.client, image_url, self.timeout).await?;
            let ext =
                extension_for_content_type(image.content_type.as_deref(), &self.default_extension);
            let file_name = format!("image_{}{}", index, ext);

            write_atomically(folder.join(&file_name), image.bytes).await?;
            tracing::debug!("Saved {} -> {}/{}", image_url, folder_name, file_name);

            local_images.push(format!("{}/{}", folder_name, file_name));
        }

        Ok(local_images)
    }
}

/// Finds a file named `image_<index>.<anything>` in `folder`
///
/// When several exist the lexicographically first is used.
async fn find_existing(folder: &Path, index: usize) -> Result<Option<String>> {
    let prefix = format!("image_{}.", index);

    let mut entries = match tokio::fs::read_dir(folder).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut found: Option<String> = None;
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with(&prefix) && found.as_ref().map_or(true, |f| name < *f) {
            found = Some(name);
        }
    }

    Ok(found)
}

/// Writes through a temporary file so a crash never leaves a truncated image
/// under its final name
async fn write_atomically(path: PathBuf, bytes: Vec<u8>) -> Result<()> {
    let target = path.clone();
    let task = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(&bytes)?;
        temp.flush()?;
        temp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    });

    match task.await {
        Ok(result) => result.map_err(|source| HarvestError::Persist {
            path: target,
            source,
        }),
        Err(e) => Err(HarvestError::Persist {
            path: target,
            source: std::io::Error::new(std::io::ErrorKind::Other, e),
        }),
    }
}
