use mdx_docs::mcp::handle_request;
use mdx_docs::mcp::jsonrpc::{error_codes, parse_request, JsonRpcResponse};
use mdx_docs::services::Services;
use mdx_docs_core::config::PublishDefaults;
use mdx_docs_core::contract::{MockRepositoryHost, MockTextRewriter};
use mdx_docs_core::rewrite::RewriteTask;
use serde_json::{json, Value};
use std::sync::Arc;

type TestServices = Services<MockTextRewriter, MockRepositoryHost>;

async fn send(services: &TestServices, message: Value) -> Option<JsonRpcResponse> {
    let request = parse_request(&message.to_string()).expect("valid request");
    handle_request(services, request).await
}

async fn call_tool(services: &TestServices, name: &str, arguments: Value) -> Value {
    let response = send(
        services,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        }),
    )
    .await
    .expect("tools/call gets a response");
    response.result.expect("tool result")
}

fn result_text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().expect("text content")
}

/// Rewriter that answers cleanup with `cleaned` and enhancement with `enhanced`.
fn scripted_rewriter(enhanced: String) -> MockTextRewriter {
    let mut rewriter = MockTextRewriter::new();
    rewriter
        .expect_rewrite()
        .withf(|req| matches!(req.task, RewriteTask::StructuralCleanup { .. }))
        .returning(|req| Ok(format!("cleaned: {}", req.text)));
    rewriter
        .expect_rewrite()
        .withf(|req| req.task == RewriteTask::DocumentationEnhancement)
        .returning(move |_| Ok(enhanced.clone()));
    rewriter
}

fn unconfigured() -> TestServices {
    Services::new(None, None, PublishDefaults::default())
}

#[tokio::test]
async fn lists_four_tools() {
    let services = unconfigured();
    let response = send(&services, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .await
        .unwrap();
    let tools = response.result.unwrap()["tools"].clone();
    let names: Vec<&str> = tools
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "convert_document_to_mdx",
            "create_github_pr_with_mdx",
            "convert_and_create_pr",
            "list_docusaurus_components"
        ]
    );
    assert!(tools[0]["inputSchema"]["required"]
        .as_array()
        .unwrap()
        .contains(&json!("contentType")));
}

#[tokio::test]
async fn initialize_reports_protocol_and_capabilities() {
    let services = unconfigured();
    let response = send(
        &services,
        json!({"jsonrpc": "2.0", "id": "init", "method": "initialize", "params": {}}),
    )
    .await
    .unwrap();
    assert_eq!(response.id, json!("init"));
    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert!(result["capabilities"]["tools"].is_object());
    assert_eq!(result["serverInfo"]["name"], "mdx-docs");
}

#[tokio::test]
async fn notifications_get_no_response() {
    let services = unconfigured();
    let response = send(
        &services,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert!(response.is_none());
}

#[tokio::test]
async fn config_status_resource_reflects_credentials() {
    let services: TestServices = Services::new(
        Some(Arc::new(MockTextRewriter::new())),
        None,
        PublishDefaults::default(),
    );

    let listed = send(&services, json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"}))
        .await
        .unwrap()
        .result
        .unwrap();
    assert_eq!(listed["resources"][0]["uri"], "mcp://config/status");

    let read = send(
        &services,
        json!({"jsonrpc": "2.0", "id": 2, "method": "resources/read", "params": {"uri": "mcp://config/status"}}),
    )
    .await
    .unwrap()
    .result
    .unwrap();
    let contents = &read["contents"][0];
    assert_eq!(contents["mimeType"], "application/json");
    let status: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
    assert_eq!(status["geminiApiKey"], "✓ Configured");
    assert_eq!(status["githubToken"], "✗ Missing");
    assert_eq!(status["supportedFormats"], json!(["text", "docx"]));
    assert_eq!(status["docusaurusComponents"], 10);
}

#[tokio::test]
async fn unknown_resource_is_invalid_params() {
    let services = unconfigured();
    let response = send(
        &services,
        json!({"jsonrpc": "2.0", "id": 3, "method": "resources/read", "params": {"uri": "mcp://nope"}}),
    )
    .await
    .unwrap();
    assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn converts_text_document() {
    let services: TestServices = Services::new(
        Some(Arc::new(scripted_rewriter(
            "## Overview\nThis guide walks through the installation.".to_string(),
        ))),
        None,
        PublishDefaults::default(),
    );

    let result = call_tool(
        &services,
        "convert_document_to_mdx",
        json!({"content": "install notes", "contentType": "text", "title": "Install"}),
    )
    .await;

    assert_eq!(result["isError"], false);
    assert_eq!(
        result_text(&result),
        "Document successfully converted to MDX format:\n\n---\ntitle: Install\ndescription: This guide walks through the installation.\n---\n\n## Overview\nThis guide walks through the installation."
    );
}

#[tokio::test]
async fn invalid_base64_docx_is_a_tool_error() {
    let services: TestServices = Services::new(
        Some(Arc::new(MockTextRewriter::new())),
        None,
        PublishDefaults::default(),
    );
    let result = call_tool(
        &services,
        "convert_document_to_mdx",
        json!({"content": "***not base64***", "contentType": "docx"}),
    )
    .await;

    assert_eq!(result["isError"], true);
    assert!(result_text(&result).starts_with("Error converting document: document is not valid base64"));
}

#[tokio::test]
async fn missing_token_is_reported_in_band() {
    let services = unconfigured();
    let result = call_tool(
        &services,
        "create_github_pr_with_mdx",
        json!({
            "owner": "octo", "repo": "docs", "filePath": "docs/a.mdx",
            "mdxContent": "# A", "commitMessage": "Add", "prTitle": "Add"
        }),
    )
    .await;

    assert_eq!(result["isError"], true);
    assert_eq!(
        result_text(&result),
        "Error creating GitHub PR: GITHUB_TOKEN environment variable is required"
    );
}

#[tokio::test]
async fn creates_pull_request() {
    let mut host = MockRepositoryHost::new();
    host.expect_default_branch()
        .returning(|_, _| Ok("main".to_string()));
    host.expect_branch_sha()
        .returning(|_, _, _| Ok("abc123".to_string()));
    host.expect_create_branch()
        .withf(|_, _, branch, _| branch == "docs/new-page")
        .returning(|_, _, _, _| Ok(()));
    host.expect_get_file().returning(|_, _, _, _| Ok(None));
    host.expect_put_file()
        .returning(|_| Ok("c0ffee".to_string()));
    host.expect_create_pull_request()
        .withf(|pull| pull.body == "Automated documentation update via MDX-GDocs MCP Server")
        .returning(|_| Ok("https://github.com/octo/docs/pull/1".to_string()));

    let services: TestServices = Services::new(None, Some(host), PublishDefaults::default());
    let result = call_tool(
        &services,
        "create_github_pr_with_mdx",
        json!({
            "owner": "octo", "repo": "docs", "filePath": "docs/a.mdx",
            "mdxContent": "# A", "commitMessage": "Add", "prTitle": "Add",
            "branchName": "docs/new-page"
        }),
    )
    .await;

    assert_eq!(result["isError"], false);
    assert_eq!(
        result_text(&result),
        "Pull Request created successfully!\n\nPR URL: https://github.com/octo/docs/pull/1\nBranch: docs/new-page\nCommit SHA: c0ffee"
    );
}

#[tokio::test]
async fn convert_and_create_pr_previews_first_500_chars() {
    let long_body = format!("{}\n", "word ".repeat(200));
    let mut host = MockRepositoryHost::new();
    host.expect_default_branch()
        .returning(|_, _| Ok("main".to_string()));
    host.expect_branch_sha()
        .returning(|_, _, _| Ok("abc123".to_string()));
    host.expect_create_branch().returning(|_, _, _, _| Ok(()));
    host.expect_get_file().returning(|_, _, _, _| Ok(None));
    let expected_body = long_body.clone();
    host.expect_put_file()
        .withf(move |commit| {
            use base64::Engine as _;
            base64::engine::general_purpose::STANDARD.encode(expected_body.as_bytes())
                == commit.content_base64
        })
        .returning(|_| Ok("sha1".to_string()));
    host.expect_create_pull_request()
        .returning(|_| Ok("https://github.com/octo/docs/pull/2".to_string()));

    let services: TestServices = Services::new(
        Some(Arc::new(scripted_rewriter(long_body.clone()))),
        Some(host),
        PublishDefaults::default(),
    );
    let result = call_tool(
        &services,
        "convert_and_create_pr",
        json!({
            "content": "raw", "contentType": "text",
            "owner": "octo", "repo": "docs", "filePath": "docs/a.mdx",
            "commitMessage": "Add", "prTitle": "Add", "branchName": "b"
        }),
    )
    .await;

    assert_eq!(result["isError"], false);
    let text = result_text(&result);
    assert!(text.starts_with(
        "Document successfully converted to MDX and Pull Request created!\n\nPR URL: https://github.com/octo/docs/pull/2\nBranch: b\nCommit SHA: sha1\n\n--- MDX Content Preview ---\n"
    ));
    let preview = text.split("--- MDX Content Preview ---\n").nth(1).unwrap();
    assert_eq!(preview, format!("{}...", &long_body[..500]));
}

#[tokio::test]
async fn list_components_formats_each_entry() {
    let services = unconfigured();
    let result = call_tool(&services, "list_docusaurus_components", json!({})).await;
    let text = result_text(&result);
    assert!(text.starts_with("Available Docusaurus components:\n\n• **Admonition - Note**: Highlight important information\n  Usage: :::note\nYour content here\n:::"));
    assert_eq!(text.matches("• **").count(), 10);
}

#[tokio::test]
async fn unknown_tool_and_bad_arguments_are_protocol_errors() {
    let services = unconfigured();

    let unknown = send(
        &services,
        json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "nope"}}),
    )
    .await
    .unwrap();
    assert_eq!(unknown.error.unwrap().code, error_codes::INVALID_PARAMS);

    let bad_args = send(
        &services,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
               "params": {"name": "convert_document_to_mdx", "arguments": {"contentType": "pdf"}}}),
    )
    .await
    .unwrap();
    assert_eq!(bad_args.error.unwrap().code, error_codes::INVALID_PARAMS);

    let method = send(&services, json!({"jsonrpc": "2.0", "id": 3, "method": "prompts/list"}))
        .await
        .unwrap();
    assert_eq!(method.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
}
