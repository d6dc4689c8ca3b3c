//! Configuration types for the registry client.

use std::time::Duration;

use crate::error::{RegistryError, Result};

/// Default catalog API base URL.
pub const DEFAULT_HUB_URL: &str = "https://hub.docker.com";

/// Default token-issuance base URL for the image registry.
pub const DEFAULT_AUTH_URL: &str = "https://auth.docker.io";

/// Default image registry base URL.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry-1.docker.io";

/// Default `service` parameter sent to the registry token endpoint.
pub const DEFAULT_REGISTRY_SERVICE: &str = "registry.docker.io";

/// Namespace that official images live under.
pub const OFFICIAL_NAMESPACE: &str = "library";

/// Configuration for the registry client.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Catalog API base URL (search, repositories, tags, catalog tokens).
    pub hub_url: String,

    /// Base URL of the registry token endpoint.
    pub auth_url: String,

    /// Image registry base URL (manifests).
    pub registry_url: String,

    /// `service` parameter for registry token requests.
    pub registry_service: String,

    /// Namespace prepended to official image names.
    pub official_namespace: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Cache lifetimes per operation.
    pub ttl: TtlConfig,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HubConfig {
    /// Creates a configuration pointing at the public registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockhand_registry::HubConfig;
    ///
    /// let config = HubConfig::new();
    /// assert_eq!(config.hub_url, "https://hub.docker.com");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_service: DEFAULT_REGISTRY_SERVICE.to_string(),
            official_namespace: OFFICIAL_NAMESPACE.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("dockhand-registry/{}", env!("CARGO_PKG_VERSION")),
            ttl: TtlConfig::default(),
        }
    }

    /// Sets the catalog API base URL.
    #[must_use]
    pub fn with_hub_url(mut self, url: impl Into<String>) -> Self {
        self.hub_url = trim_url(url.into());
        self
    }

    /// Sets the registry token endpoint base URL.
    #[must_use]
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = trim_url(url.into());
        self
    }

    /// Sets the image registry base URL.
    #[must_use]
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = trim_url(url.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the cache lifetimes.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: TtlConfig) -> Self {
        self.ttl = ttl;
        self
    }

    /// Checks that every base URL parses and the timeout is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("hub_url", &self.hub_url),
            ("auth_url", &self.auth_url),
            ("registry_url", &self.registry_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| RegistryError::config(format!("invalid {name} '{value}': {e}")))?;
        }
        if self.timeout.is_zero() {
            return Err(RegistryError::config("timeout must be greater than zero"));
        }
        Ok(())
    }

    /// Returns the repository path for an image name.
    ///
    /// Official images live under a fixed namespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockhand_registry::HubConfig;
    ///
    /// let config = HubConfig::new();
    /// assert_eq!(config.repository_path("nginx", true), "library/nginx");
    /// assert_eq!(config.repository_path("myuser/app", false), "myuser/app");
    /// ```
    #[must_use]
    pub fn repository_path(&self, name: &str, is_official: bool) -> String {
        if is_official && !self.official_namespace.is_empty() {
            format!("{}/{}", self.official_namespace, name)
        } else {
            name.to_string()
        }
    }

    /// Returns the pull scope for a repository path.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockhand_registry::HubConfig;
    ///
    /// assert_eq!(HubConfig::pull_scope("library/redis"), "repository:library/redis:pull");
    /// ```
    #[must_use]
    pub fn pull_scope(repository: &str) -> String {
        format!("repository:{repository}:pull")
    }
}

fn trim_url(url: String) -> String {
    match url.strip_suffix('/') {
        Some(trimmed) => trimmed.to_string(),
        None => url,
    }
}

/// Cache lifetimes for each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlConfig {
    /// Search results.
    pub search: Duration,

    /// Repository details.
    pub repository: Duration,

    /// Tag listings.
    pub tags: Duration,

    /// Single tag details.
    pub tag_details: Duration,

    /// Manifest lists and layer listings.
    pub manifest: Duration,

    /// Repository listings for a user.
    pub repositories: Duration,

    /// Registry pull-scope tokens. Kept shorter than the issued lifetime.
    pub registry_token: Duration,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            search: Duration::from_secs(10 * 60),
            repository: Duration::from_secs(60 * 60),
            tags: Duration::from_secs(30 * 60),
            tag_details: Duration::from_secs(30 * 60),
            manifest: Duration::from_secs(60 * 60),
            repositories: Duration::from_secs(120 * 60),
            registry_token: Duration::from_secs(240),
        }
    }
}
