//! Feature sources: the filesystem and HTTP.
//!
//! Both accept any top-level GeoJSON shape and strip a UTF-8 byte order mark
//! before parsing. Absolute `http(s)://` references are always fetched over
//! HTTP, whatever the source's root.

use async_trait::async_trait;
use geojson::GeoJson;
use geonemo_core::error::{GeonemoError, Result};
use geonemo_core::models::GroupCatalog;
use geonemo_core::ports::FeatureSource;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Build the HTTP client shared by a source, bounded by `timeout` per request
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
        GeonemoError::ConfigInvalid {
            key: "fetch_timeout_s".to_string(),
            reason: format!("failed to build HTTP client: {}", e),
        }
    })
}

/// Parse GeoJSON text fetched for `reference`
///
/// An HTML body (typically an error page served with status 200) is reported
/// as a load failure rather than a parse failure.
pub fn parse_geojson(reference: &str, content: &str) -> Result<GeoJson> {
    let content = content.trim_start_matches('\u{feff}');

    if looks_like_html(content) {
        return Err(GeonemoError::load(reference, "received HTML instead of GeoJSON"));
    }

    content
        .parse::<GeoJson>()
        .map_err(|e| GeonemoError::GeoJson { reference: reference.to_string(), reason: e.to_string() })
}

fn looks_like_html(content: &str) -> bool {
    // GeoJSON never starts with markup
    content.trim_start().starts_with('<')
}

fn is_url(reference: &str) -> bool {
    let lower = reference.trim_start().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// GET `url` and return the body text
async fn fetch_text(client: &reqwest::Client, reference: &str, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| GeonemoError::load(reference, format!("request to {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(GeonemoError::load(reference, format!("HTTP {} from {}", status, url)));
    }

    response
        .text()
        .await
        .map_err(|e| GeonemoError::load(reference, format!("failed to read body from {}: {}", url, e)))
}

/// Reads files relative to a root directory
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    client: reqwest::Client,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_client(root, reqwest::Client::new())
    }

    pub fn with_client(root: impl Into<PathBuf>, client: reqwest::Client) -> Self {
        Self { root: root.into(), client }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a relative or absolute reference points at
    pub fn resolve(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl FeatureSource for FsSource {
    async fn load(&self, reference: &str) -> Result<GeoJson> {
        if is_url(reference) {
            let content = fetch_text(&self.client, reference, reference.trim()).await?;
            return parse_geojson(reference, &content);
        }

        let path = self.resolve(reference);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| GeonemoError::load(reference, format!("{}: {}", path.display(), e)))?;

        parse_geojson(reference, &content)
    }

    fn locate(&self, reference: &str) -> String {
        if is_url(reference) {
            reference.trim().to_string()
        } else {
            self.resolve(reference).display().to_string()
        }
    }
}

/// Fetches files relative to a base URL
///
/// Under a catalog the base URL already includes the catalog's directory.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self { base_url: base_url.into(), client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL a reference resolves to
    pub fn url_for(&self, reference: &str) -> String {
        let reference = reference.trim();
        if is_url(reference) {
            return reference.to_string();
        }

        let relative = reference.trim_start_matches("./").trim_start_matches('/');
        format!("{}/{}", self.base_url.trim_end_matches('/'), relative)
    }

    /// Same client, rooted at `dir` below the current base URL
    pub fn nested(&self, dir: &Path) -> Self {
        let segments: Vec<String> = dir
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                _ => None,
            })
            .collect();

        if segments.is_empty() {
            return self.clone();
        }

        let base_url = format!("{}/{}", self.base_url.trim_end_matches('/'), segments.join("/"));
        Self::with_client(base_url, self.client.clone())
    }

    /// Fetch the raw text behind a reference
    pub async fn fetch_text(&self, reference: &str) -> Result<String> {
        fetch_text(&self.client, reference, &self.url_for(reference)).await
    }
}

#[async_trait]
impl FeatureSource for HttpSource {
    async fn load(&self, reference: &str) -> Result<GeoJson> {
        let content = self.fetch_text(reference).await?;
        parse_geojson(reference, &content)
    }

    fn locate(&self, reference: &str) -> String {
        self.url_for(reference)
    }
}

/// The source a catalog's files are read from
#[derive(Debug, Clone)]
pub enum CatalogSource {
    Fs(FsSource),
    Http(HttpSource),
}

impl CatalogSource {
    /// Pick the source for a catalog location
    ///
    /// With a base URL, files (and the catalog itself) are fetched over HTTP.
    /// Either way, relative file references resolve against the catalog's
    /// directory. Every HTTP request gives up after `timeout`.
    pub fn for_catalog(
        groups_file: &Path,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = http_client(timeout)?;
        let catalog_dir = groups_file.parent().unwrap_or_else(|| Path::new(""));

        let source = match base_url {
            Some(base_url) => {
                CatalogSource::Http(HttpSource::with_client(base_url, client).nested(catalog_dir))
            }
            None => {
                let root = if catalog_dir.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    catalog_dir.to_path_buf()
                };
                CatalogSource::Fs(FsSource::with_client(root, client))
            }
        };
        Ok(source)
    }

    /// Load the group catalog from this source
    pub async fn load_catalog(&self, groups_file: &Path) -> Result<GroupCatalog> {
        match self {
            CatalogSource::Fs(_) => GroupCatalog::load(groups_file),
            CatalogSource::Http(http) => {
                let reference = groups_file.to_string_lossy();
                if groups_file.file_name().is_none() {
                    return Err(GeonemoError::load(&*reference, "not a file path"));
                }
                let url = self.catalog_location(groups_file);
                let content = fetch_text(&http.client, &reference, &url).await?;
                GroupCatalog::from_json_str(&content)
            }
        }
    }

    /// Where the catalog itself is read from
    pub fn catalog_location(&self, groups_file: &Path) -> String {
        match self {
            CatalogSource::Fs(_) => groups_file.display().to_string(),
            // Rooted at the catalog's directory already
            CatalogSource::Http(http) => match groups_file.file_name() {
                Some(name) => http.url_for(&name.to_string_lossy()),
                None => http.base_url().to_string(),
            },
        }
    }
}

#[async_trait]
impl FeatureSource for CatalogSource {
    async fn load(&self, reference: &str) -> Result<GeoJson> {
        match self {
            CatalogSource::Fs(fs) => fs.load(reference).await,
            CatalogSource::Http(http) => http.load(reference).await,
        }
    }

    fn locate(&self, reference: &str) -> String {
        match self {
            CatalogSource::Fs(fs) => fs.locate(reference),
            CatalogSource::Http(http) => http.locate(reference),
        }
    }
}
