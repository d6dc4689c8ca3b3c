//! Typed tool arguments.
//!
//! Field names are camelCase on the wire. `isOffical` and `pat` are accepted
//! as aliases because existing callers send them.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, ToolError};

/// Arguments of `verify_credentials`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyCredentialsArgs {
    /// Registry username.
    pub username: String,
    /// Personal access token to check against the stored one.
    pub pat: String,
}

/// Arguments of `search_images`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchImagesArgs {
    /// Free-text query.
    pub query: String,
    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Page number, starting at 1.
    #[serde(default)]
    pub page: Option<u32>,
    /// Catalog session token.
    #[serde(default, alias = "pat")]
    pub bearer: Option<String>,
}

/// Arguments of `get_image_details`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetailsArgs {
    /// Image name, e.g. `nginx` or `bitnami/redis`.
    pub image_name: String,
    /// Whether the image lives in the official namespace.
    #[serde(default, alias = "isOffical")]
    pub is_official: bool,
    /// Catalog session token.
    #[serde(default, alias = "pat")]
    pub bearer: Option<String>,
}

/// Arguments of `list_tags`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTagsArgs {
    /// Image name.
    pub image_name: String,
    /// Whether the image lives in the official namespace.
    #[serde(default, alias = "isOffical")]
    pub is_official: bool,
    /// Page size.
    #[serde(default)]
    pub limit: Option<u32>,
    /// Page number, starting at 1.
    #[serde(default)]
    pub page: Option<u32>,
    /// Catalog session token.
    #[serde(default, alias = "pat")]
    pub bearer: Option<String>,
}

/// Arguments of `get_manifest`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestArgs {
    /// Image name.
    pub image_name: String,
    /// Whether the image lives in the official namespace.
    #[serde(default, alias = "isOffical")]
    pub is_official: bool,
    /// Tag to resolve.
    pub tag: String,
    /// Registry username for the pull token.
    pub username: String,
    /// Personal access token for the pull token; anonymous when absent.
    #[serde(default)]
    pub pat: Option<String>,
}

/// Arguments of `analyze_layers`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeLayersArgs {
    /// Image name.
    pub image_name: String,
    /// Whether the image lives in the official namespace.
    #[serde(default, alias = "isOffical")]
    pub is_official: bool,
    /// Manifest digest, as returned by `get_manifest`.
    pub digest: String,
    /// Registry username for the pull token.
    pub username: String,
    /// Personal access token for the pull token; anonymous when absent.
    #[serde(default)]
    pub pat: Option<String>,
}

/// Arguments of `list_repositories`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListRepositoriesArgs {
    /// Namespace owner.
    pub username: String,
    /// Catalog session token.
    #[serde(default, alias = "pat")]
    pub bearer: Option<String>,
}

/// Deserializes `arguments` into `T`, treating `null` as an empty object.
pub(crate) fn parse<T: DeserializeOwned>(tool: &'static str, arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::invalid_arguments(tool, e.to_string()))
}
