//! Bearer token acquisition for the catalog API and the image registry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::cache::{CacheKey, CachedValue, Identity, ResponseCache};
use crate::config::HubConfig;
use crate::error::{RegistryError, Result};
use crate::vault::CredentialVault;

/// Message returned for every catalog authentication failure, so callers
/// cannot discover which usernames have stored credentials.
const CREDENTIALS_REJECTED: &str =
    "no valid stored credentials for this user; save credentials first";

/// Lifetime assumed for catalog tokens when the response does not state one.
const DEFAULT_CATALOG_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

/// Authentication realm a token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Realm {
    /// Catalog API session token.
    Catalog,
    /// Image registry pull-scope token.
    RegistryPull,
}

/// Short-lived bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    /// Token value sent as `Authorization: Bearer <token>`.
    pub token: String,
    /// Realm the token is valid for.
    pub realm: Realm,
    /// Scope the token was issued for (registry tokens only).
    pub scope: Option<String>,
    /// Approximate lifetime reported by the issuer.
    pub expires_in: Duration,
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .field("realm", &self.realm)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl BearerToken {
    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchanges stored credentials for bearer tokens.
#[derive(Debug, Clone)]
pub struct TokenBroker {
    config: Arc<HubConfig>,
    http: reqwest::Client,
    vault: CredentialVault,
    cache: Arc<ResponseCache>,
}

impl TokenBroker {
    /// Creates a broker sharing `http` and `cache` with the registry client.
    #[must_use]
    pub fn new(
        config: Arc<HubConfig>,
        http: reqwest::Client,
        vault: CredentialVault,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            config,
            http,
            vault,
            cache,
        }
    }

    /// Returns the credential vault.
    #[must_use]
    pub const fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// Checks that `pat` matches the stored credentials for `username`.
    ///
    /// The username is trimmed; the token is compared exactly as given.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Validation`] if either input is blank
    /// - [`RegistryError::Authentication`] if the check is rejected
    pub async fn verify_credentials(&self, username: &str, pat: &str) -> Result<()> {
        let username = username.trim();
        if username.is_empty() || is_blank(pat) {
            return Err(RegistryError::validation(
                "username and access token are required",
            ));
        }

        if self.vault.verify(username, pat).await.is_verified() {
            Ok(())
        } else {
            Err(RegistryError::authentication(CREDENTIALS_REJECTED))
        }
    }

    /// Obtains a catalog API session token for `username`.
    ///
    /// The supplied `pat` must match the stored one; the stored secret is
    /// what gets exchanged. Tokens from this realm are not cached.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Authentication`] if the credentials are rejected
    /// - [`RegistryError::Upstream`] if the token endpoint fails
    pub async fn catalog_token(&self, username: &str, pat: &str) -> Result<BearerToken> {
        self.verify_credentials(username, pat).await?;
        let username = username.trim();

        let credential = self
            .vault
            .get(username)
            .await?
            .ok_or_else(|| RegistryError::authentication(CREDENTIALS_REJECTED))?;

        let url = format!("{}/v2/auth/token", self.config.hub_url);
        tracing::debug!(username, "Requesting catalog token");

        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "identifier": credential.username,
                "secret": credential.secret.expose_secret(),
            }))
            .send()
            .await?;

        let body = token_response(response).await?;
        let expires_in = body
            .expires_in
            .map_or(DEFAULT_CATALOG_TOKEN_LIFETIME, Duration::from_secs);
        let token = body.access_token.or(body.token).ok_or_else(|| {
            RegistryError::upstream(None, "catalog token response has no access_token")
        })?;

        Ok(BearerToken {
            token,
            realm: Realm::Catalog,
            scope: None,
            expires_in,
        })
    }

    /// Obtains a registry token for `scope`, e.g. `repository:library/redis:pull`.
    ///
    /// Sends HTTP Basic credentials when both `username` and `pat` are
    /// given, otherwise requests anonymously (public images only). The
    /// username is trimmed and the token sent as given. Tokens are cached
    /// per scope and identity for the configured registry token TTL.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Upstream`] if the token endpoint fails.
    pub async fn registry_token(
        &self,
        scope: &str,
        username: Option<&str>,
        pat: Option<&str>,
    ) -> Result<BearerToken> {
        let basic = basic_credentials(username, pat);
        let key = CacheKey::RegistryToken {
            scope: scope.to_string(),
            identity: basic_identity(username, pat),
        };
        if let Some(CachedValue::Token(token)) = self.cache.get(&key) {
            tracing::debug!(scope, "Registry token cache hit");
            return Ok(token);
        }

        let url = format!("{}/token", self.config.auth_url);
        let mut request = self.http.get(&url).query(&[
            ("service", self.config.registry_service.as_str()),
            ("scope", scope),
        ]);
        if let Some((user, secret)) = basic {
            request = request.basic_auth(user, Some(secret));
        }

        tracing::debug!(scope, authenticated = basic.is_some(), "Requesting registry token");
        let body = token_response(request.send().await?).await?;
        let token = body.token.or(body.access_token).ok_or_else(|| {
            RegistryError::upstream(None, "registry token response has no token")
        })?;

        let ttl = self.config.ttl.registry_token;
        let token = BearerToken {
            token,
            realm: Realm::RegistryPull,
            scope: Some(scope.to_string()),
            expires_in: body.expires_in.map_or(ttl, Duration::from_secs),
        };
        self.cache.set(key, CachedValue::Token(token.clone()), ttl);
        Ok(token)
    }
}

async fn token_response(response: reqwest::Response) -> Result<TokenResponse> {
    let status = response.status();
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "Token endpoint rejected request");
        return Err(RegistryError::upstream(
            Some(status.as_u16()),
            response.text().await.unwrap_or_default(),
        ));
    }
    response.json().await.map_err(Into::into)
}

/// Pairs a trimmed username with an untouched secret, when both are present.
pub(crate) fn basic_credentials<'a>(
    username: Option<&'a str>,
    secret: Option<&'a str>,
) -> Option<(&'a str, &'a str)> {
    let username = username.map(str::trim).filter(|u| !u.is_empty())?;
    let secret = secret.filter(|s| !is_blank(s))?;
    Some((username, secret))
}

/// Identity of a request made with [`basic_credentials`], anonymous when incomplete.
pub(crate) fn basic_identity(username: Option<&str>, secret: Option<&str>) -> Identity {
    basic_credentials(username, secret)
        .map_or_else(Identity::anonymous, |(user, secret)| Identity::basic(user, secret))
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_debug_is_redacted() {
        let token = BearerToken {
            token: "abc.def.ghi".to_string(),
            realm: Realm::RegistryPull,
            scope: Some("repository:library/redis:pull".to_string()),
            expires_in: Duration::from_secs(300),
        };
        let debug = format!("{token:?}");
        assert!(!debug.contains("abc.def.ghi"));
        assert!(debug.contains("RegistryPull"));
        assert_eq!(token.header_value(), "Bearer abc.def.ghi");
    }

    #[test]
    fn test_basic_credentials_trim_username_only() {
        assert_eq!(
            basic_credentials(Some(" alice "), Some(" pat with spaces ")),
            Some(("alice", " pat with spaces "))
        );
        assert_eq!(basic_credentials(Some("  "), Some("pat")), None);
        assert_eq!(basic_credentials(Some("alice"), Some("   ")), None);
        assert_eq!(basic_credentials(Some("alice"), None), None);
        assert_eq!(basic_credentials(None, Some("pat")), None);

        assert!(basic_identity(Some("alice"), None).is_anonymous());
        assert_eq!(
            basic_identity(Some(" alice "), Some("pat")),
            Identity::basic("alice", "pat")
        );
    }

    #[test]
    fn test_token_response_accepts_either_field() {
        let body: TokenResponse =
            serde_json::from_str(r#"{"token":"t","access_token":"a","expires_in":300}"#).unwrap();
        assert_eq!(body.token.as_deref(), Some("t"));
        assert_eq!(body.access_token.as_deref(), Some("a"));
        assert_eq!(body.expires_in, Some(300));

        let body: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert!(body.token.is_none());
    }
}
