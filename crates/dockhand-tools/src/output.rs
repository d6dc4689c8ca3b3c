//! Tool results and their text rendering.

use serde::Serialize;
use serde_json::Value;

use crate::error::ToolError;

/// Text result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    /// Rendered text.
    pub text: String,
    /// Whether the call failed.
    pub is_error: bool,
}

impl ToolOutput {
    /// Creates a successful result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Renders an error as `Error: <message>`.
    #[must_use]
    pub fn error(err: &ToolError) -> Self {
        Self {
            text: format!("Error: {err}"),
            is_error: true,
        }
    }
}

/// `Found N images: {json}, {json}`.
pub(crate) fn render_images(images: &[Value]) -> String {
    let rendered: Vec<String> = images.iter().map(Value::to_string).collect();
    format!("Found {} images: {}", rendered.len(), rendered.join(", "))
}

/// `Found N tags: a, b`.
pub(crate) fn render_tags(tags: &[Value]) -> String {
    let names: Vec<&str> = tags
        .iter()
        .map(|tag| tag.get("name").and_then(Value::as_str).unwrap_or("unknown"))
        .collect();
    format!("Found {} tags: {}", names.len(), names.join(", "))
}

/// `Found N repositories: a, b`.
pub(crate) fn render_repositories(repositories: &[Value]) -> String {
    let names: Vec<&str> = repositories
        .iter()
        .map(|repo| repo.get("name").and_then(Value::as_str).unwrap_or("unknown"))
        .collect();
    format!(
        "Found {} repositories: {}",
        names.len(),
        names.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_images() {
        let images = vec![json!({ "repo_name": "redis" }), json!({ "repo_name": "nginx" })];
        assert_eq!(
            render_images(&images),
            r#"Found 2 images: {"repo_name":"redis"}, {"repo_name":"nginx"}"#
        );
        assert_eq!(render_images(&[]), "Found 0 images: ");
    }

    #[test]
    fn test_render_tags() {
        let tags = vec![json!({ "name": "latest" }), json!({ "name": "7.2" }), json!({})];
        assert_eq!(render_tags(&tags), "Found 3 tags: latest, 7.2, unknown");
    }

    #[test]
    fn test_error_output() {
        let output = ToolOutput::error(&ToolError::unknown_tool("nope"));
        assert!(output.is_error);
        assert_eq!(output.text, "Error: Unknown tool: nope");
    }
}
