//! Manifest media types, references and summaries.
//!
//! Registry responses stay as raw JSON; this module only knows enough of
//! the OCI/Docker manifest shapes to pick entries out and summarize them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, Result};

/// Annotation carrying an image's version.
pub const VERSION_ANNOTATION: &str = "org.opencontainers.image.version";

/// Longest tag the registry accepts.
pub const MAX_TAG_LEN: usize = 128;

/// Longest repository path the registry accepts.
pub const MAX_NAME_LEN: usize = 255;

/// Manifest media types accepted from the registry.
#[derive(Debug, Clone, Copy)]
pub struct MediaType;

impl MediaType {
    /// OCI image index media type.
    pub const OCI_INDEX: &'static str = "application/vnd.oci.image.index.v1+json";

    /// OCI image manifest media type.
    pub const OCI_MANIFEST: &'static str = "application/vnd.oci.image.manifest.v1+json";

    /// Docker manifest list media type.
    pub const DOCKER_MANIFEST_LIST: &'static str =
        "application/vnd.docker.distribution.manifest.list.v2+json";

    /// Docker image manifest media type.
    pub const DOCKER_MANIFEST: &'static str =
        "application/vnd.docker.distribution.manifest.v2+json";

    /// `Accept` header value covering every manifest shape, indexes first.
    #[must_use]
    pub fn accept_header() -> String {
        [
            Self::OCI_INDEX,
            Self::DOCKER_MANIFEST_LIST,
            Self::OCI_MANIFEST,
            Self::DOCKER_MANIFEST,
        ]
        .join(", ")
    }
}

/// A manifest reference: either a tag or a content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Tag name (e.g., "7.2-alpine").
    Tag(String),
    /// Content digest (e.g., "sha256:abc123...").
    Digest(String),
}

impl Reference {
    /// Parses a tag or digest.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockhand_registry::Reference;
    ///
    /// assert!(matches!(Reference::parse("latest").unwrap(), Reference::Tag(_)));
    /// assert!(matches!(
    ///     Reference::parse("sha256:0123456789abcdef").unwrap(),
    ///     Reference::Digest(_)
    /// ));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] if the input is empty, a
    /// malformed digest, or a tag outside `[A-Za-z0-9_][A-Za-z0-9._-]{0,127}`.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RegistryError::validation("tag or digest must not be empty"));
        }

        match input.split_once(':') {
            None if is_valid_tag(input) => Ok(Self::Tag(input.to_string())),
            None => Err(RegistryError::validation(format!("invalid tag '{input}'"))),
            Some((algorithm, hex)) => {
                let algorithm_ok = !algorithm.is_empty()
                    && algorithm
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c));
                let hex_ok = !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
                if algorithm_ok && hex_ok {
                    Ok(Self::Digest(input.to_string()))
                } else {
                    Err(RegistryError::validation(format!(
                        "invalid digest '{input}', expected <algorithm>:<hex>"
                    )))
                }
            }
        }
    }

    /// Parses input that must be a tag.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] if the input is not a valid tag
    /// or is digest-shaped.
    pub fn tag(input: &str) -> Result<String> {
        match Self::parse(input) {
            Ok(Self::Tag(tag)) => Ok(tag),
            Ok(Self::Digest(digest)) => Err(RegistryError::validation(format!(
                "expected a tag but got digest '{digest}'"
            ))),
            Err(_) => Err(RegistryError::validation(format!("invalid tag '{}'", input.trim()))),
        }
    }

    /// Parses input that must be a digest.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] if the input is not an `<algorithm>:<hex>` digest.
    pub fn digest(input: &str) -> Result<String> {
        match Self::parse(input)? {
            Self::Digest(digest) => Ok(digest),
            Self::Tag(tag) => Err(RegistryError::validation(format!(
                "expected a digest but got tag '{tag}'"
            ))),
        }
    }

    /// Returns the reference as it appears in a manifest URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tag(value) | Self::Digest(value) => value,
        }
    }
}

fn is_valid_tag(tag: &str) -> bool {
    let word = |c: char| c.is_ascii_alphanumeric() || c == '_';
    tag.len() <= MAX_TAG_LEN
        && tag.starts_with(word)
        && tag.chars().all(|c| word(c) || c == '.' || c == '-')
}

/// Checks a repository name such as `redis` or `bitnami/redis`.
///
/// Each `/`-separated component is lowercase alphanumeric, optionally
/// joined by a single `.`, a single or double `_`, or a run of `-`.
///
/// # Examples
///
/// ```
/// use dockhand_registry::validate_repository_name;
///
/// assert!(validate_repository_name("bitnami/redis").is_ok());
/// assert!(validate_repository_name("redis/../admin").is_err());
/// assert!(validate_repository_name("redis?page=2").is_err());
/// ```
///
/// # Errors
///
/// Returns [`RegistryError::Validation`] if the name does not match.
pub fn validate_repository_name(name: &str) -> Result<()> {
    if name.len() <= MAX_NAME_LEN && name.split('/').all(is_name_component) {
        Ok(())
    } else {
        Err(RegistryError::validation(format!("invalid repository name '{name}'")))
    }
}

/// Returns true for one path component of a repository name.
pub(crate) fn is_name_component(component: &str) -> bool {
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    component.starts_with(alnum)
        && component.ends_with(alnum)
        && component.split(alnum).all(|separator| {
            matches!(separator, "" | "." | "_" | "__") || separator.chars().all(|c| c == '-')
        })
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the entries out of a manifest response.
///
/// Prefers the `manifests` list of an index; falls back to the `layers` of
/// a single-image manifest.
///
/// # Errors
///
/// Returns [`RegistryError::Upstream`] if neither array is present.
pub fn manifest_entries(body: &Value) -> Result<Vec<Value>> {
    ["manifests", "layers"]
        .iter()
        .find_map(|field| body.get(*field).and_then(Value::as_array))
        .cloned()
        .ok_or_else(|| {
            RegistryError::upstream(None, "manifest response has neither manifests nor layers")
        })
}

/// Condensed view of one manifest list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSummary {
    /// Content digest.
    pub digest: String,
    /// CPU architecture, or `"unknown"`.
    pub architecture: String,
    /// Operating system, or `"unknown"`.
    pub os: String,
    /// Architecture variant, or empty.
    pub variant: String,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Version annotation, or `"N/A"`.
    pub version: String,
}

impl ManifestSummary {
    /// Summarizes one manifest list entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use dockhand_registry::ManifestSummary;
    /// use serde_json::json;
    ///
    /// let summary = ManifestSummary::from_entry(&json!({
    ///     "digest": "sha256:abc",
    ///     "size": 1024,
    ///     "platform": { "architecture": "amd64", "os": "linux" }
    /// }));
    /// assert_eq!(summary.variant, "");
    /// assert_eq!(summary.version, "N/A");
    /// ```
    #[must_use]
    pub fn from_entry(entry: &Value) -> Self {
        let text = |value: Option<&Value>, default: &str| {
            value
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        let platform = entry.get("platform");

        Self {
            digest: text(entry.get("digest"), ""),
            architecture: text(platform.and_then(|p| p.get("architecture")), "unknown"),
            os: text(platform.and_then(|p| p.get("os")), "unknown"),
            variant: text(platform.and_then(|p| p.get("variant")), ""),
            size: entry.get("size").and_then(Value::as_u64),
            version: text(
                entry
                    .get("annotations")
                    .and_then(|a| a.get(VERSION_ANNOTATION)),
                "N/A",
            ),
        }
    }

    /// Summarizes every entry of a manifest list.
    #[must_use]
    pub fn summarize(entries: &[Value]) -> Vec<Self> {
        entries.iter().map(Self::from_entry).collect()
    }
}

/// Error body returned by the registry API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// List of errors.
    pub errors: Vec<RegistryApiError>,
}

/// Individual error from the registry API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryApiError {
    /// Error code.
    pub code: String,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,

    /// Additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ErrorResponse {
    /// Extracts a readable message from an error body, falling back to the raw text.
    #[must_use]
    pub fn describe(body: &str) -> String {
        match serde_json::from_str::<Self>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => parsed
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; "),
            _ => body.trim().to_string(),
        }
    }
}
