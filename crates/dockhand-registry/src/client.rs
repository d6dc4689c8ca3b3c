//! Registry client exposing the catalog and manifest query surface.
//!
//! Every operation follows the same path: structured cache key, cache
//! lookup, optional token acquisition, one outbound request, shape check,
//! shaping, cache store.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::broker::{basic_identity, TokenBroker};
use crate::cache::{CacheConfig, CacheKey, CachedValue, Identity, ResponseCache};
use crate::config::HubConfig;
use crate::error::{RegistryError, Result};
use crate::oci::{
    is_name_component, manifest_entries, validate_repository_name, ErrorResponse,
    ManifestSummary, MediaType, Reference,
};
use crate::vault::CredentialVault;

/// Default page size for searches.
pub const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// Default page size for tag listings.
pub const DEFAULT_TAG_LIMIT: u32 = 2;

/// Default page number.
pub const DEFAULT_PAGE: u32 = 1;

/// Repository fields stripped from repository details before returning them.
pub const REDACTED_REPOSITORY_FIELDS: &[&str] = &["full_description", "media_types", "hub_user"];

/// Client for the registry's catalog API and image registry API.
///
/// Responses are cached per caller identity: a result fetched with a bearer
/// token or basic credentials is only served again to the same credentials.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    config: Arc<HubConfig>,
    http: reqwest::Client,
    cache: Arc<ResponseCache>,
    broker: TokenBroker,
    sweeper: Option<Arc<Sweeper>>,
}

/// Background sweep task, aborted when the last client clone is dropped.
#[derive(Debug)]
struct Sweeper(JoinHandle<()>);

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl RegistryClient {
    /// Creates a client with a fresh response cache.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the configuration is invalid or
    /// the HTTP client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use dockhand_registry::{
    ///     CredentialVault, HubConfig, RegistryClient, SecretCipher, SqliteCredentialStore, VaultKey,
    /// };
    ///
    /// let store = Arc::new(SqliteCredentialStore::open("dockhand.db")?);
    /// let vault = CredentialVault::new(store, SecretCipher::new(&VaultKey::from_env()?)?);
    /// let client = RegistryClient::new(HubConfig::new(), vault)?;
    /// # Ok::<(), dockhand_registry::RegistryError>(())
    /// ```
    pub fn new(config: HubConfig, vault: CredentialVault) -> Result<Self> {
        Self::with_cache(
            config,
            vault,
            Arc::new(ResponseCache::new(CacheConfig::default())),
        )
    }

    /// Creates a client that shares `cache`.
    ///
    /// When called inside a tokio runtime, a background task sweeps expired
    /// entries from `cache` every `sweep_interval` for as long as the client
    /// (or a clone of it) is alive.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Config`] if the configuration is invalid or
    /// the HTTP client cannot be built.
    pub fn with_cache(
        config: HubConfig,
        vault: CredentialVault,
        cache: Arc<ResponseCache>,
    ) -> Result<Self> {
        config.validate()?;
        let http = Self::build_http_client(&config)?;
        let config = Arc::new(config);
        let broker = TokenBroker::new(
            Arc::clone(&config),
            http.clone(),
            vault,
            Arc::clone(&cache),
        );

        let sweeper = tokio::runtime::Handle::try_current()
            .ok()
            .map(|_| Arc::new(Sweeper(cache.spawn_sweeper())));
        if sweeper.is_none() {
            tracing::debug!("No tokio runtime; expired cache entries are evicted on read only");
        }

        Ok(Self {
            config,
            http,
            cache,
            broker,
            sweeper,
        })
    }

    /// Returns true if a background sweeper is running for the cache.
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.as_ref().is_some_and(|s| !s.0.is_finished())
    }

    /// Returns the client configuration.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Returns the shared response cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Returns the token broker.
    #[must_use]
    pub const fn broker(&self) -> &TokenBroker {
        &self.broker
    }

    /// Searches repositories.
    ///
    /// `limit` and `page` default to 5 and 1.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for an empty query or zero paging values
    /// - [`RegistryError::Upstream`] if the request fails or `results` is missing
    pub async fn search(
        &self,
        query: &str,
        limit: Option<u32>,
        page: Option<u32>,
        bearer: Option<&str>,
    ) -> Result<Vec<Value>> {
        let query = require("query", query)?;
        let limit = paging("limit", limit, DEFAULT_SEARCH_LIMIT)?;
        let page = paging("page", page, DEFAULT_PAGE)?;
        let key = CacheKey::Search {
            query: query.to_string(),
            limit,
            page,
            identity: Identity::bearer(bearer),
        };
        if let Some(hit) = self.cached_array(&key) {
            return Ok(hit);
        }

        let url = format!("{}/v2/search/repositories/", self.config.hub_url);
        let request = self.http.get(&url).query(&[
            ("query", query.to_string()),
            ("page", page.to_string()),
            ("page_size", limit.to_string()),
        ]);
        let body = send_json(with_bearer(request, bearer)).await?;
        let results = results_array(&body, "search")?;

        self.store(key, Value::Array(results.clone()), self.config.ttl.search);
        Ok(results)
    }

    /// Fetches repository details with bulky and internal fields removed.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for an empty or malformed name
    /// - [`RegistryError::Upstream`] if the request fails or the body is not an object
    pub async fn repository_details(
        &self,
        name: &str,
        is_official: bool,
        bearer: Option<&str>,
    ) -> Result<Value> {
        let path = self.repository_path(name, is_official)?;
        let key = CacheKey::Repository {
            path: path.clone(),
            identity: Identity::bearer(bearer),
        };
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let url = format!("{}/v2/repositories/{path}", self.config.hub_url);
        let body = send_json(with_bearer(self.http.get(&url), bearer)).await?;
        let details = redact_repository(body)?;

        self.store(key, details.clone(), self.config.ttl.repository);
        Ok(details)
    }

    /// Lists tags of a repository.
    ///
    /// `page` and `limit` default to 1 and 2.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for a malformed name or zero paging values
    /// - [`RegistryError::Upstream`] if the request fails or `results` is missing
    pub async fn list_tags(
        &self,
        name: &str,
        is_official: bool,
        page: Option<u32>,
        limit: Option<u32>,
        bearer: Option<&str>,
    ) -> Result<Vec<Value>> {
        let path = self.repository_path(name, is_official)?;
        let page = paging("page", page, DEFAULT_PAGE)?;
        let limit = paging("limit", limit, DEFAULT_TAG_LIMIT)?;
        let key = CacheKey::Tags {
            path: path.clone(),
            page,
            limit,
            identity: Identity::bearer(bearer),
        };
        if let Some(hit) = self.cached_array(&key) {
            return Ok(hit);
        }

        let url = format!("{}/v2/repositories/{path}/tags", self.config.hub_url);
        let request = self.http.get(&url).query(&[
            ("page", page.to_string()),
            ("page_size", limit.to_string()),
        ]);
        let body = send_json(with_bearer(request, bearer)).await?;
        let results = results_array(&body, "tag listing")?;

        self.store(key, Value::Array(results.clone()), self.config.ttl.tags);
        Ok(results)
    }

    /// Fetches details of one tag.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for a malformed name or tag
    /// - [`RegistryError::Upstream`] if the request fails
    pub async fn tag_details(
        &self,
        name: &str,
        is_official: bool,
        tag: &str,
        bearer: Option<&str>,
    ) -> Result<Value> {
        let path = self.repository_path(name, is_official)?;
        let tag = Reference::tag(tag)?;
        let key = CacheKey::TagDetails {
            path: path.clone(),
            tag: tag.clone(),
            identity: Identity::bearer(bearer),
        };
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let url = format!("{}/v2/repositories/{path}/tags/{tag}", self.config.hub_url);
        let body = send_json(with_bearer(self.http.get(&url), bearer)).await?;
        if !body.is_object() {
            return Err(RegistryError::upstream(None, "tag details are not a JSON object"));
        }

        self.store(key, body.clone(), self.config.ttl.tag_details);
        Ok(body)
    }

    /// Lists the manifest entries a tag resolves to.
    ///
    /// For a multi-platform tag these are the per-platform manifests; for a
    /// single-platform tag, the layers. A pull token for the repository is
    /// obtained first, authenticated when both `username` and `pat` are given.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for a malformed name or tag, or a digest
    /// - [`RegistryError::Upstream`] if the token or manifest request fails
    pub async fn list_manifests_for_tag(
        &self,
        name: &str,
        is_official: bool,
        tag: &str,
        username: Option<&str>,
        pat: Option<&str>,
    ) -> Result<Vec<Value>> {
        let path = self.repository_path(name, is_official)?;
        let tag = Reference::tag(tag)?;
        let key = CacheKey::ManifestList {
            path: path.clone(),
            tag: tag.clone(),
            identity: basic_identity(username, pat),
        };
        self.manifest_entries(key, &path, &tag, username, pat).await
    }

    /// Lists the manifest entries (usually layers) of one digest.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for a malformed name or digest
    /// - [`RegistryError::Upstream`] if the token or manifest request fails
    pub async fn inspect_manifest_by_digest(
        &self,
        name: &str,
        is_official: bool,
        digest: &str,
        username: Option<&str>,
        pat: Option<&str>,
    ) -> Result<Vec<Value>> {
        let path = self.repository_path(name, is_official)?;
        let digest = Reference::digest(digest)?;
        let key = CacheKey::ManifestDigest {
            path: path.clone(),
            digest: digest.clone(),
            identity: basic_identity(username, pat),
        };
        self.manifest_entries(key, &path, &digest, username, pat)
            .await
    }

    /// Summarizes the manifest list of a tag (digest, platform, size, version).
    ///
    /// # Errors
    ///
    /// Same as [`RegistryClient::list_manifests_for_tag`].
    pub async fn manifest_summaries(
        &self,
        name: &str,
        is_official: bool,
        tag: &str,
        username: Option<&str>,
        pat: Option<&str>,
    ) -> Result<Vec<ManifestSummary>> {
        let entries = self
            .list_manifests_for_tag(name, is_official, tag, username, pat)
            .await?;
        Ok(ManifestSummary::summarize(&entries))
    }

    /// Lists repositories owned by `username`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] for an empty or malformed username
    /// - [`RegistryError::Upstream`] if the request fails or `results` is missing
    pub async fn all_repositories(
        &self,
        username: &str,
        bearer: Option<&str>,
    ) -> Result<Vec<Value>> {
        let username = require("username", username)?;
        if !is_name_component(username) {
            return Err(RegistryError::validation(format!("invalid username '{username}'")));
        }
        let key = CacheKey::Repositories {
            username: username.to_string(),
            identity: Identity::bearer(bearer),
        };
        if let Some(hit) = self.cached_array(&key) {
            return Ok(hit);
        }

        let url = format!("{}/v2/repositories/{username}", self.config.hub_url);
        let body = send_json(with_bearer(self.http.get(&url), bearer)).await?;
        let results = results_array(&body, "repository listing")?;

        self.store(key, Value::Array(results.clone()), self.config.ttl.repositories);
        Ok(results)
    }

    async fn manifest_entries(
        &self,
        key: CacheKey,
        path: &str,
        reference: &str,
        username: Option<&str>,
        pat: Option<&str>,
    ) -> Result<Vec<Value>> {
        if let Some(hit) = self.cached_array(&key) {
            return Ok(hit);
        }

        let token = self
            .broker
            .registry_token(&HubConfig::pull_scope(path), username, pat)
            .await?;

        let url = format!("{}/v2/{path}/manifests/{reference}", self.config.registry_url);
        let request = self
            .http
            .get(&url)
            .header(AUTHORIZATION, token.header_value())
            .header(ACCEPT, MediaType::accept_header());
        let body = send_json(request).await?;
        let entries = manifest_entries(&body)?;

        self.store(key, Value::Array(entries.clone()), self.config.ttl.manifest);
        Ok(entries)
    }

    fn repository_path(&self, name: &str, is_official: bool) -> Result<String> {
        let name = require("image name", name)?;
        validate_repository_name(name)?;
        let path = self.config.repository_path(name, is_official);
        validate_repository_name(&path)?;
        Ok(path)
    }

    fn cached(&self, key: &CacheKey) -> Option<Value> {
        match self.cache.get(key) {
            Some(CachedValue::Resource(value)) => {
                tracing::debug!(?key, "Cache hit");
                Some(value)
            }
            _ => {
                tracing::debug!(?key, "Cache miss");
                None
            }
        }
    }

    fn cached_array(&self, key: &CacheKey) -> Option<Vec<Value>> {
        match self.cached(key)? {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    fn store(&self, key: CacheKey, value: Value, ttl: Duration) {
        self.cache.set(key, CachedValue::Resource(value), ttl);
    }

    /// Builds the HTTP client with proper configuration.
    fn build_http_client(config: &HubConfig) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| RegistryError::config(format!("failed to build HTTP client: {e}")))
    }
}

fn require<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RegistryError::validation(format!("{field} must not be empty")));
    }
    Ok(value)
}

fn paging(field: &str, value: Option<u32>, default: u32) -> Result<u32> {
    match value {
        Some(0) => Err(RegistryError::validation(format!("{field} must be at least 1"))),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

fn with_bearer(request: reqwest::RequestBuilder, bearer: Option<&str>) -> reqwest::RequestBuilder {
    match bearer.map(str::trim).filter(|b| !b.is_empty()) {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

async fn send_json(request: reqwest::RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "Registry request failed");
        return Err(RegistryError::upstream(
            Some(status.as_u16()),
            ErrorResponse::describe(&body),
        ));
    }
    response.json().await.map_err(Into::into)
}

fn results_array(body: &Value, operation: &str) -> Result<Vec<Value>> {
    body.get("results")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| {
            RegistryError::upstream(None, format!("{operation} response has no results array"))
        })
}

fn redact_repository(mut body: Value) -> Result<Value> {
    let object = body
        .as_object_mut()
        .ok_or_else(|| RegistryError::upstream(None, "repository details are not a JSON object"))?;
    for field in REDACTED_REPOSITORY_FIELDS {
        object.remove(*field);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Clock, ManualClock};
    use crate::crypto::{SecretCipher, VaultKey};
    use crate::store::SqliteCredentialStore;
    use serde_json::json;

    fn vault() -> CredentialVault {
        let store = Arc::new(SqliteCredentialStore::in_memory().unwrap());
        CredentialVault::new(store, SecretCipher::new(&VaultKey::generate()).unwrap())
    }

    fn client() -> RegistryClient {
        RegistryClient::new(HubConfig::new(), vault()).unwrap()
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = client();
        assert!(client.cache().is_empty());
        assert!(client.is_sweeping());
        assert_eq!(client.config().hub_url, "https://hub.docker.com");
    }

    #[test]
    fn test_client_outside_runtime_does_not_sweep() {
        let client = client();
        assert!(!client.is_sweeping());
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_sweeps_expired_entries() {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(ResponseCache::with_clock(
            CacheConfig::default().with_sweep_interval(Duration::from_secs(60)),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let client = RegistryClient::with_cache(HubConfig::new(), vault(), cache).unwrap();

        let key = CacheKey::Repositories {
            username: "alice".to_string(),
            identity: Identity::anonymous(),
        };
        client.store(key, json!([]), Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));
        assert_eq!(client.cache().len(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert!(client.cache().is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_released_with_last_clone() {
        let client = client();
        let sweeper = Arc::downgrade(client.sweeper.as_ref().unwrap());
        let clone = client.clone();

        drop(client);
        assert!(clone.is_sweeping());
        assert!(sweeper.upgrade().is_some());

        drop(clone);
        assert!(sweeper.upgrade().is_none());
    }

    #[test]
    fn test_require_trims() {
        assert_eq!(require("query", "  redis ").unwrap(), "redis");
        assert!(require("query", "   ").is_err());
    }

    #[test]
    fn test_paging_defaults_and_rejects_zero() {
        assert_eq!(paging("limit", None, 5).unwrap(), 5);
        assert_eq!(paging("limit", Some(9), 5).unwrap(), 9);
        assert!(paging("limit", Some(0), 5).is_err());
    }

    #[test]
    fn test_results_array() {
        let body = json!({ "count": 1, "results": [{ "name": "redis" }] });
        assert_eq!(results_array(&body, "search").unwrap().len(), 1);
        assert!(results_array(&json!({ "count": 0 }), "search").is_err());
        assert!(results_array(&json!({ "results": "nope" }), "search").is_err());
    }

    #[test]
    fn test_redact_repository() {
        let body = json!({
            "name": "nginx",
            "namespace": "library",
            "full_description": "# very long readme",
            "media_types": ["application/vnd.oci.image.index.v1+json"],
            "hub_user": "library",
            "pull_count": 1
        });
        let redacted = redact_repository(body).unwrap();
        assert_eq!(
            redacted,
            json!({ "name": "nginx", "namespace": "library", "pull_count": 1 })
        );
        assert!(redact_repository(json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let client = client();
        assert!(matches!(
            client.search(" ", None, None, None).await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            client.repository_details("", true, None).await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            client
                .list_manifests_for_tag("redis", true, "sha256:abc", None, None)
                .await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            client
                .inspect_manifest_by_digest("redis", true, "latest", None, None)
                .await,
            Err(RegistryError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_path_injection_is_rejected() {
        let client = client();
        assert!(matches!(
            client.repository_details("redis/../../auth", false, None).await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            client.repository_details("redis?page=2", true, None).await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            client.tag_details("redis", true, "7.2/../../x", None).await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            client
                .list_manifests_for_tag("redis", true, "latest?x=1", None, None)
                .await,
            Err(RegistryError::Validation { .. })
        ));
        assert!(matches!(
            client.all_repositories("alice/private", None).await,
            Err(RegistryError::Validation { .. })
        ));
    }
}
