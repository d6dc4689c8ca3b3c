//! Tool names, descriptions and input schemas.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ToolError;

/// A tool exposed to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Check a username/token pair against the vault.
    VerifyCredentials,
    /// Search repositories.
    SearchImages,
    /// Repository details.
    GetImageDetails,
    /// Tag listing.
    ListTags,
    /// Summarized manifest list of a tag.
    GetManifest,
    /// Layers of one manifest digest.
    AnalyzeLayers,
    /// Repositories owned by a user.
    ListRepositories,
}

impl Tool {
    /// Every tool, in listing order.
    pub const ALL: [Self; 7] = [
        Self::VerifyCredentials,
        Self::SearchImages,
        Self::GetImageDetails,
        Self::ListTags,
        Self::GetManifest,
        Self::AnalyzeLayers,
        Self::ListRepositories,
    ];

    /// Returns the wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::VerifyCredentials => "verify_credentials",
            Self::SearchImages => "search_images",
            Self::GetImageDetails => "get_image_details",
            Self::ListTags => "list_tags",
            Self::GetManifest => "get_manifest",
            Self::AnalyzeLayers => "analyze_layers",
            Self::ListRepositories => "list_repositories",
        }
    }

    /// Returns the human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::VerifyCredentials => {
                "Verify registry credentials against the ones saved for this user"
            }
            Self::SearchImages => "Search for images in the registry",
            Self::GetImageDetails => "Get details of a particular image",
            Self::ListTags => "List the requested number of tags for a particular image",
            Self::GetManifest => "Get the manifest list of a particular image tag",
            Self::AnalyzeLayers => {
                "Analyze image layers and sizes of a particular digest; \
                 the digest is obtained from the get_manifest tool"
            }
            Self::ListRepositories => "List the repositories owned by a user",
        }
    }

    /// Returns the JSON schema of the tool's arguments.
    #[must_use]
    pub fn input_schema(self) -> Value {
        let string = json!({ "type": "string" });
        let integer = json!({ "type": "integer", "minimum": 1 });
        let boolean = json!({ "type": "boolean", "default": false });
        let legacy_boolean = json!({
            "type": "boolean",
            "deprecated": true,
            "description": "Misspelled alias of isOfficial",
        });

        let (properties, required) = match self {
            Self::VerifyCredentials => (
                json!({ "username": string, "pat": string }),
                vec!["username", "pat"],
            ),
            Self::SearchImages => (
                json!({
                    "query": string,
                    "limit": integer,
                    "page": integer,
                    "bearer": string,
                }),
                vec!["query"],
            ),
            Self::GetImageDetails => (
                json!({
                    "imageName": string,
                    "isOfficial": boolean,
                    "isOffical": legacy_boolean,
                    "bearer": string,
                }),
                vec!["imageName"],
            ),
            Self::ListTags => (
                json!({
                    "imageName": string,
                    "isOfficial": boolean,
                    "isOffical": legacy_boolean,
                    "limit": integer,
                    "page": integer,
                    "bearer": string,
                }),
                vec!["imageName"],
            ),
            Self::GetManifest => (
                json!({
                    "imageName": string,
                    "isOfficial": boolean,
                    "isOffical": legacy_boolean,
                    "tag": string,
                    "username": string,
                    "pat": string,
                }),
                vec!["imageName", "tag", "username"],
            ),
            Self::AnalyzeLayers => (
                json!({
                    "imageName": string,
                    "isOfficial": boolean,
                    "isOffical": legacy_boolean,
                    "digest": string,
                    "username": string,
                    "pat": string,
                }),
                vec!["imageName", "digest", "username"],
            ),
            Self::ListRepositories => (
                json!({ "username": string, "bearer": string }),
                vec!["username"],
            ),
        };

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Returns the full definition.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.name() == s)
            .ok_or_else(|| ToolError::unknown_tool(s))
    }
}

/// Serializable tool definition, as listed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name.
    pub name: &'static str,
    /// Description.
    pub description: &'static str,
    /// JSON schema of the arguments.
    pub input_schema: Value,
}

/// Returns the definitions of every tool.
#[must_use]
pub fn definitions() -> Vec<ToolDefinition> {
    Tool::ALL.into_iter().map(Tool::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(tool.name().parse::<Tool>().unwrap(), tool);
        }
        assert!("docker_pull".parse::<Tool>().is_err());
    }

    #[test]
    fn test_required_fields_are_declared() {
        for definition in definitions() {
            let schema = &definition.input_schema;
            let properties = schema["properties"].as_object().unwrap();
            for required in schema["required"].as_array().unwrap() {
                let required = required.as_str().unwrap();
                assert!(
                    properties.contains_key(required),
                    "{} requires undeclared {required}",
                    definition.name
                );
            }
        }
    }

    #[test]
    fn test_is_official_is_optional_with_legacy_alias() {
        for tool in [
            Tool::GetImageDetails,
            Tool::ListTags,
            Tool::GetManifest,
            Tool::AnalyzeLayers,
        ] {
            let schema = tool.input_schema();
            let required: Vec<&str> = schema["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap())
                .collect();
            assert!(!required.contains(&"isOfficial"), "{tool}");
            assert!(!required.contains(&"isOffical"), "{tool}");
            assert_eq!(schema["properties"]["isOfficial"]["default"], false);
            assert_eq!(schema["properties"]["isOffical"]["deprecated"], true);
        }
    }

    #[test]
    fn test_definition_serializes_camel_case() {
        let value = serde_json::to_value(Tool::ListTags.definition()).unwrap();
        assert_eq!(value["name"], "list_tags");
        assert_eq!(value["inputSchema"]["type"], "object");
    }
}
