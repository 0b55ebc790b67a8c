use crate::config::types::{Config, CrawlerConfig, ExtractConfig, HttpConfig, OutputConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    validate_extract_config(&config.extract)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.search_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid search_url '{}': {}", config.search_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "search_url must use HTTP or HTTPS, got '{}'",
            url.scheme()
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > 64 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 64, got {}",
            config.workers
        )));
    }

    if config.checkpoint_every < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_every must be >= 1".to_string(),
        ));
    }

    if config.render_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "render_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.page_timeout_secs < 1 || config.image_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "HTTP timeouts must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.output_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    for (name, value) in [
        ("projects_file", &config.projects_file),
        ("search_cache_file", &config.search_cache_file),
        ("summary_file", &config.summary_file),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.projects_file == config.search_cache_file {
        return Err(ConfigError::Validation(
            "projects_file and search_cache_file must differ".to_string(),
        ));
    }

    Ok(())
}

fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.project_link_marker.is_empty() {
        return Err(ConfigError::Validation(
            "project_link_marker cannot be empty".to_string(),
        ));
    }

    for (name, selector) in [
        ("title_selector", &config.title_selector),
        ("category_selector", &config.category_selector),
        ("description_selector", &config.description_selector),
    ] {
        Selector::parse(selector).map_err(|e| {
            ConfigError::Validation(format!("Invalid {} '{}': {:?}", name, selector, e))
        })?;
    }

    if config.image_path_markers.is_empty() && config.slider_markers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one of image_path_markers or slider_markers is required".to_string(),
        ));
    }

    let ext = &config.default_image_extension;
    if !ext.starts_with('.') || ext.len() < 2 || ext.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "default_image_extension must look like '.jpg', got '{}'",
            ext
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_invalid_workers() {
        let mut config = Config::default();
        config.crawler.workers = 0;
        assert!(validate(&config).is_err());

        config.crawler.workers = 65;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_search_url() {
        let mut config = Config::default();
        config.crawler.search_url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));

        config.crawler.search_url = "ftp://example.com/search".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_checkpoint_interval() {
        let mut config = Config::default();
        config.crawler.checkpoint_every = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_same_projects_and_cache_file() {
        let mut config = Config::default();
        config.output.search_cache_file = config.output.projects_file.clone();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_default_extension_shape() {
        let mut config = Config::default();
        config.extract.default_image_extension = "jpg".to_string();
        assert!(validate(&config).is_err());

        config.extract.default_image_extension = ".webp".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_selector() {
        let mut config = Config::default();
        config.extract.description_selector = "div[[".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_requires_some_image_marker() {
        let mut config = Config::default();
        config.extract.image_path_markers.clear();
        config.extract.slider_markers.clear();
        assert!(validate(&config).is_err());
    }
}
