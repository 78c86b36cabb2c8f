//! Where the catalog comes from and where install requests go.

use doohickey_catalog::Catalog;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Base URL used when neither `--base-url` nor `DOOHICKEY_BASE_URL` is set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

const USER_AGENT: &str = concat!("doohickey/", env!("CARGO_PKG_VERSION"));

/// Failures talking to a catalog source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error(transparent)]
    Catalog(#[from] doohickey_catalog::Error),

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("cannot install '{name}' from a local catalog")]
    InstallUnsupported { name: String },
}

/// A provider of catalog snapshots and install requests.
///
/// Implementations must be cheap to share across tasks; every call is an
/// independent request with no caching.
pub trait CatalogSource: Send + Sync + 'static {
    /// Fetch a fresh catalog snapshot.
    fn fetch_catalog(&self) -> impl Future<Output = Result<Catalog, SourceError>> + Send;

    /// Ask the source to install the named application. Only the status of
    /// the response matters.
    fn trigger_install(&self, name: &str) -> impl Future<Output = Result<(), SourceError>> + Send;
}

// ============================================================================
// HTTP source
// ============================================================================

/// Catalog served over HTTP: `GET {base}/apps.json` and `GET {base}/install/{name}`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Self::with_client(base_url, client)
    }

    /// Use a preconfigured client (proxy, timeouts) instead of the default one.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self, SourceError> {
        reqwest::Url::parse(base_url).map_err(|e| SourceError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn catalog_url(&self) -> String {
        format!("{}/apps.json", self.base_url)
    }

    /// The install path carries the raw application name.
    pub fn install_url(&self, name: &str) -> String {
        format!("{}/install/{}", self.base_url, name)
    }

    async fn get_ok(&self, url: String) -> Result<reqwest::Response, SourceError> {
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { url, status });
        }
        Ok(response)
    }
}

impl CatalogSource for HttpSource {
    async fn fetch_catalog(&self) -> Result<Catalog, SourceError> {
        let response = self.get_ok(self.catalog_url()).await?;
        let body = response.bytes().await?;
        Ok(Catalog::from_slice(&body)?)
    }

    async fn trigger_install(&self, name: &str) -> Result<(), SourceError> {
        self.get_ok(self.install_url(name)).await?;
        Ok(())
    }
}

// ============================================================================
// Local source
// ============================================================================

/// Catalog read from a JSON file on disk. Installing is not possible.
#[derive(Debug, Clone)]
pub struct LocalSource {
    path: PathBuf,
}

impl LocalSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for LocalSource {
    async fn fetch_catalog(&self) -> Result<Catalog, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|source| {
            doohickey_catalog::Error::Io {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        Ok(Catalog::parse(&content)?)
    }

    async fn trigger_install(&self, name: &str) -> Result<(), SourceError> {
        Err(SourceError::InstallUnsupported {
            name: name.to_string(),
        })
    }
}

// ============================================================================
// Configured source
// ============================================================================

/// The source selected on the command line. `--catalog` takes precedence
/// over `--base-url`.
#[derive(Debug, Clone)]
pub enum Source {
    Http(HttpSource),
    Local(LocalSource),
}

impl Source {
    pub fn from_args(base_url: &str, catalog: Option<&Path>) -> Result<Self, SourceError> {
        match catalog {
            Some(path) => Ok(Source::Local(LocalSource::new(path))),
            None => Ok(Source::Http(HttpSource::new(base_url)?)),
        }
    }
}

impl CatalogSource for Source {
    async fn fetch_catalog(&self) -> Result<Catalog, SourceError> {
        match self {
            Source::Http(source) => source.fetch_catalog().await,
            Source::Local(source) => source.fetch_catalog().await,
        }
    }

    async fn trigger_install(&self, name: &str) -> Result<(), SourceError> {
        match self {
            Source::Http(source) => source.trigger_install(name).await,
            Source::Local(source) => source.trigger_install(name).await,
        }
    }
}
