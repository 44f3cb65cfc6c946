//! MCP tool and resource handlers.
//!
//! Tool failures are reported in-band: the call succeeds at the JSON-RPC
//! level and the result carries `isError: true` with the message as text.
//! Only malformed arguments and unknown tools become JSON-RPC errors.

use mdx_docs_core::contract::{
    ContentType, ConversionOptions, PullRequestRequest, PullRequestResult, RepositoryHost,
    SourceDocument, TextRewriter,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::services::Services;

pub const CONVERT_DOCUMENT: &str = "convert_document_to_mdx";
pub const CREATE_PULL_REQUEST: &str = "create_github_pr_with_mdx";
pub const CONVERT_AND_CREATE_PR: &str = "convert_and_create_pr";
pub const LIST_COMPONENTS: &str = "list_docusaurus_components";

pub const CONFIG_STATUS_URI: &str = "mcp://config/status";

const PREVIEW_CHARS: usize = 500;

/// Why a `tools/call` could not be dispatched at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    UnknownTool(String),
    InvalidArguments(String),
}

/// The MCP `CallToolResult` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    fn ok(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    fn failed(prefix: &str, message: impl std::fmt::Display) -> Self {
        Self {
            text: format!("{prefix}: {message}"),
            is_error: true,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertArgs {
    content: String,
    content_type: ContentType,
    title: Option<String>,
    #[serde(default = "default_true")]
    include_docusaurus_components: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePrArgs {
    owner: String,
    repo: String,
    file_path: String,
    mdx_content: String,
    commit_message: String,
    pr_title: String,
    pr_description: Option<String>,
    branch_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConvertAndPrArgs {
    content: String,
    content_type: ContentType,
    document_title: Option<String>,
    #[serde(default = "default_true")]
    include_docusaurus_components: bool,
    owner: String,
    repo: String,
    file_path: String,
    commit_message: String,
    pr_title: String,
    pr_description: Option<String>,
    branch_name: Option<String>,
}

/// Tool descriptors for `tools/list`.
pub fn tool_definitions() -> Value {
    let content = json!({
        "type": "string",
        "description": "The document content as text or base64 encoded .docx file"
    });
    let content_type = json!({
        "type": "string",
        "enum": ["text", "docx"],
        "description": "The type of content being converted"
    });
    let include_components = json!({
        "type": "boolean",
        "default": true,
        "description": "Whether to enhance with Docusaurus components"
    });
    let string = |description: &str| json!({ "type": "string", "description": description });

    json!([
        {
            "name": CONVERT_DOCUMENT,
            "description": "Convert a document (text or .docx) to MDX format with Docusaurus components",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "content": content,
                    "contentType": content_type,
                    "title": string("Optional title for the document"),
                    "includeDocusaurusComponents": include_components,
                },
                "required": ["content", "contentType"]
            }
        },
        {
            "name": CREATE_PULL_REQUEST,
            "description": "Create a GitHub Pull Request with converted MDX content",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "owner": string("GitHub repository owner"),
                    "repo": string("GitHub repository name"),
                    "filePath": string("Path where the MDX file should be created"),
                    "mdxContent": string("The MDX content to be added"),
                    "commitMessage": string("Commit message for the changes"),
                    "prTitle": string("Pull request title"),
                    "prDescription": string("Pull request description"),
                    "branchName": string("Branch name for the PR (auto-generated if not provided)"),
                },
                "required": ["owner", "repo", "filePath", "mdxContent", "commitMessage", "prTitle"]
            }
        },
        {
            "name": CONVERT_AND_CREATE_PR,
            "description": "Convert a document to MDX and create a GitHub Pull Request in one step",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "content": content,
                    "contentType": content_type,
                    "documentTitle": string("Optional title for the document"),
                    "includeDocusaurusComponents": include_components,
                    "owner": string("GitHub repository owner"),
                    "repo": string("GitHub repository name"),
                    "filePath": string("Path where the MDX file should be created"),
                    "commitMessage": string("Commit message for the changes"),
                    "prTitle": string("Pull request title"),
                    "prDescription": string("Pull request description"),
                    "branchName": string("Branch name for the PR (auto-generated if not provided)"),
                },
                "required": ["content", "contentType", "owner", "repo", "filePath", "commitMessage", "prTitle"]
            }
        },
        {
            "name": LIST_COMPONENTS,
            "description": "List available Docusaurus components that can be used in MDX conversion",
            "inputSchema": { "type": "object", "properties": {} }
        }
    ])
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, CallError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| CallError::InvalidArguments(e.to_string()))
}

/// Run the tool `name` with `arguments`.
pub async fn call_tool<R, H>(
    services: &Services<R, H>,
    name: &str,
    arguments: Value,
) -> Result<ToolOutput, CallError>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    info!(tool = %name, "Handling tool call");
    let output = match name {
        CONVERT_DOCUMENT => convert_document(services, parse_args(arguments)?).await,
        CREATE_PULL_REQUEST => create_pull_request(services, parse_args(arguments)?).await,
        CONVERT_AND_CREATE_PR => convert_and_create_pr(services, parse_args(arguments)?).await,
        LIST_COMPONENTS => list_components(services),
        other => return Err(CallError::UnknownTool(other.to_string())),
    };
    if output.is_error {
        error!(tool = %name, message = %output.text, "Tool call failed");
    }
    Ok(output)
}

async fn convert<R, H>(
    services: &Services<R, H>,
    content: String,
    content_type: ContentType,
    options: &ConversionOptions,
) -> anyhow::Result<String>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    let converter = services.converter()?;
    let document = match content_type {
        ContentType::Text => SourceDocument::Text(content),
        ContentType::Docx => SourceDocument::from_base64_docx(&content)?,
    };
    Ok(converter.convert_to_mdx(&document, options).await?)
}

async fn publish<R, H>(
    services: &Services<R, H>,
    request: &PullRequestRequest,
) -> anyhow::Result<PullRequestResult>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    Ok(services
        .publisher()?
        .create_pull_request_with_content(request)
        .await?)
}

fn pr_summary(result: &PullRequestResult) -> String {
    format!(
        "PR URL: {}\nBranch: {}\nCommit SHA: {}",
        result.pull_request_url, result.branch_name, result.commit_sha
    )
}

async fn convert_document<R, H>(services: &Services<R, H>, args: ConvertArgs) -> ToolOutput
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    let options = ConversionOptions {
        title: args.title,
        enhance_with_components: args.include_docusaurus_components,
    };
    match convert(services, args.content, args.content_type, &options).await {
        Ok(mdx) => ToolOutput::ok(format!(
            "Document successfully converted to MDX format:\n\n{mdx}"
        )),
        Err(e) => ToolOutput::failed("Error converting document", e),
    }
}

async fn create_pull_request<R, H>(services: &Services<R, H>, args: CreatePrArgs) -> ToolOutput
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    let request = PullRequestRequest {
        owner: args.owner,
        repo: args.repo,
        file_path: args.file_path,
        content: args.mdx_content,
        commit_message: args.commit_message,
        pr_title: args.pr_title,
        pr_description: args.pr_description,
        branch_name: args.branch_name,
    };
    match publish(services, &request).await {
        Ok(result) => ToolOutput::ok(format!(
            "Pull Request created successfully!\n\n{}",
            pr_summary(&result)
        )),
        Err(e) => ToolOutput::failed("Error creating GitHub PR", e),
    }
}

async fn convert_and_create_pr<R, H>(
    services: &Services<R, H>,
    args: ConvertAndPrArgs,
) -> ToolOutput
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    let options = ConversionOptions {
        title: args.document_title,
        enhance_with_components: args.include_docusaurus_components,
    };
    let workflow = async {
        let mdx = convert(services, args.content, args.content_type, &options).await?;
        let request = PullRequestRequest {
            owner: args.owner,
            repo: args.repo,
            file_path: args.file_path,
            content: mdx.clone(),
            commit_message: args.commit_message,
            pr_title: args.pr_title,
            pr_description: args.pr_description,
            branch_name: args.branch_name,
        };
        let result = publish(services, &request).await?;
        anyhow::Ok((mdx, result))
    };
    match workflow.await {
        Ok((mdx, result)) => ToolOutput::ok(format!(
            "Document successfully converted to MDX and Pull Request created!\n\n{}\n\n--- MDX Content Preview ---\n{}",
            pr_summary(&result),
            preview(&mdx)
        )),
        Err(e) => ToolOutput::failed("Error in convert and create PR workflow", e),
    }
}

/// First 500 characters, with `...` when the content is longer.
pub fn preview(mdx: &str) -> String {
    let head: String = mdx.chars().take(PREVIEW_CHARS).collect();
    if mdx.chars().count() > PREVIEW_CHARS {
        format!("{head}...")
    } else {
        head
    }
}

fn list_components<R, H>(services: &Services<R, H>) -> ToolOutput
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    let entries: Vec<String> = services
        .components()
        .iter()
        .map(|c| format!("• **{}**: {}\n  Usage: {}", c.name, c.description, c.usage))
        .collect();
    ToolOutput::ok(format!(
        "Available Docusaurus components:\n\n{}",
        entries.join("\n\n")
    ))
}

/// Descriptors for `resources/list`.
pub fn resource_definitions() -> Value {
    json!([{
        "uri": CONFIG_STATUS_URI,
        "name": "config-status",
        "description": "Current configuration status of the MCP server",
        "mimeType": "application/json"
    }])
}

/// Contents for `resources/read`; `None` for an unknown URI.
pub fn read_resource<R, H>(services: &Services<R, H>, uri: &str) -> Option<Value>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    if uri != CONFIG_STATUS_URI {
        return None;
    }
    let mark = |configured: bool| if configured { "✓ Configured" } else { "✗ Missing" };
    let status = json!({
        "geminiApiKey": mark(services.has_rewriter()),
        "githubToken": mark(services.has_host()),
        "supportedFormats": ["text", "docx"],
        "docusaurusComponents": services.components().len(),
    });
    let text = serde_json::to_string_pretty(&status).unwrap_or_else(|_| status.to_string());
    Some(json!({
        "contents": [{
            "uri": CONFIG_STATUS_URI,
            "mimeType": "application/json",
            "text": text,
        }]
    }))
}
