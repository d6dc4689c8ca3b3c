//! Tool dispatch over the registry client.

use dockhand_registry::RegistryClient;
use serde_json::Value;

use crate::args::{
    parse, AnalyzeLayersArgs, ImageDetailsArgs, ListRepositoriesArgs, ListTagsArgs,
    ManifestArgs, SearchImagesArgs, VerifyCredentialsArgs,
};
use crate::definition::Tool;
use crate::error::Result;
use crate::output::{render_images, render_repositories, render_tags, ToolOutput};

/// Text returned when a credential check passes.
pub const CREDENTIALS_VERIFIED: &str = "Credentials verified successfully";

/// Stateless adapter turning tool calls into registry client calls.
#[derive(Debug, Clone)]
pub struct HubTools {
    client: RegistryClient,
}

impl HubTools {
    /// Wraps `client`.
    #[must_use]
    pub const fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &RegistryClient {
        &self.client
    }

    /// Invokes the tool called `name`.
    ///
    /// Never fails: unknown tools, bad arguments and registry errors are
    /// all rendered as an error output.
    pub async fn call(&self, name: &str, arguments: Value) -> ToolOutput {
        match self.try_call(name, arguments).await {
            Ok(text) => ToolOutput::text(text),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                ToolOutput::error(&e)
            }
        }
    }

    /// Invokes the tool called `name`, returning its text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ToolError`] for unknown tools, invalid arguments or
    /// failed registry operations.
    pub async fn try_call(&self, name: &str, arguments: Value) -> Result<String> {
        let tool: Tool = name.parse()?;
        tracing::debug!(%tool, "Dispatching tool call");
        let tool_name = tool.name();

        match tool {
            Tool::VerifyCredentials => {
                let args: VerifyCredentialsArgs = parse(tool_name, arguments)?;
                self.client
                    .broker()
                    .verify_credentials(&args.username, &args.pat)
                    .await?;
                Ok(CREDENTIALS_VERIFIED.to_string())
            }
            Tool::SearchImages => {
                let args: SearchImagesArgs = parse(tool_name, arguments)?;
                let images = self
                    .client
                    .search(&args.query, args.limit, args.page, args.bearer.as_deref())
                    .await?;
                Ok(render_images(&images))
            }
            Tool::GetImageDetails => {
                let args: ImageDetailsArgs = parse(tool_name, arguments)?;
                let details = self
                    .client
                    .repository_details(&args.image_name, args.is_official, args.bearer.as_deref())
                    .await?;
                Ok(details.to_string())
            }
            Tool::ListTags => {
                let args: ListTagsArgs = parse(tool_name, arguments)?;
                let tags = self
                    .client
                    .list_tags(
                        &args.image_name,
                        args.is_official,
                        args.page,
                        args.limit,
                        args.bearer.as_deref(),
                    )
                    .await?;
                Ok(render_tags(&tags))
            }
            Tool::GetManifest => {
                let args: ManifestArgs = parse(tool_name, arguments)?;
                let summaries = self
                    .client
                    .manifest_summaries(
                        &args.image_name,
                        args.is_official,
                        &args.tag,
                        Some(args.username.as_str()),
                        args.pat.as_deref(),
                    )
                    .await?;
                Ok(serde_json::to_string(&summaries)?)
            }
            Tool::AnalyzeLayers => {
                let args: AnalyzeLayersArgs = parse(tool_name, arguments)?;
                let entries = self
                    .client
                    .inspect_manifest_by_digest(
                        &args.image_name,
                        args.is_official,
                        &args.digest,
                        Some(args.username.as_str()),
                        args.pat.as_deref(),
                    )
                    .await?;
                Ok(Value::Array(entries).to_string())
            }
            Tool::ListRepositories => {
                let args: ListRepositoriesArgs = parse(tool_name, arguments)?;
                let repositories = self
                    .client
                    .all_repositories(&args.username, args.bearer.as_deref())
                    .await?;
                Ok(render_repositories(&repositories))
            }
        }
    }
}
