use mdx_docs::gemini::GeminiClient;
use mdx_docs::github::GitHubClient;
use mdx_docs::load_config::{GeminiSettings, GitHubSettings};
use mdx_docs_core::contract::{FileCommit, RepositoryHost, TextRewriter};
use mdx_docs_core::error::{HostError, RewriteError};
use mdx_docs_core::rewrite::{RewriteRequest, RewriteTask};
use serde_json::Value;
use serial_test::serial;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A request as received by the local server.
struct Captured {
    head: String,
    body: String,
}

impl Captured {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn read_request(stream: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    let end = header_end(&buf).unwrap_or(buf.len());
    Captured {
        head: String::from_utf8_lossy(&buf[..end]).to_lowercase(),
        body: String::from_utf8_lossy(&buf[(end + 4).min(buf.len())..]).into_owned(),
    }
}

/// Serve one canned `(status, body)` answer per incoming connection, in order.
async fn canned_server(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<Captured>>) {
    // Keep requests to the local listener away from any configured proxy.
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    std::env::set_var("no_proxy", "127.0.0.1,localhost");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut captured = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            captured.push(read_request(&mut stream).await);
            let response = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
        captured
    });
    (base, handle)
}

fn github(base: &str) -> GitHubClient {
    GitHubClient::from_settings(&GitHubSettings {
        token: Some("ghp_test".to_string()),
        api_base: base.to_string(),
    })
    .unwrap()
    .expect("token is set")
}

fn gemini(base: &str) -> GeminiClient {
    GeminiClient::from_settings(&GeminiSettings {
        api_key: Some("gemini-key".to_string()),
        model: "gemini-1.5-flash".to_string(),
        api_base: base.to_string(),
    })
    .expect("api key is set")
}

fn commit(sha: Option<&str>) -> FileCommit {
    FileCommit {
        owner: "octo".to_string(),
        repo: "docs".to_string(),
        path: "docs/a.mdx".to_string(),
        message: "Add page".to_string(),
        content_base64: "IyBB".to_string(),
        branch: "mdx-docs-1".to_string(),
        sha: sha.map(str::to_owned),
    }
}

#[tokio::test]
#[serial]
async fn missing_file_is_absent_not_an_error() {
    let (base, server) = canned_server(vec![(404, r#"{"message":"Not Found"}"#)]).await;

    let file = github(&base)
        .get_file("octo", "docs", "docs/a.mdx", "mdx-docs-1")
        .await
        .unwrap();
    assert!(file.is_none());

    let requests = server.await.unwrap();
    assert_eq!(
        requests[0].request_line(),
        "get /repos/octo/docs/contents/docs/a.mdx?ref=mdx-docs-1 http/1.1"
    );
    assert!(requests[0].head.contains("authorization: bearer ghp_test"));
    assert!(requests[0].head.contains("x-github-api-version: 2022-11-28"));
}

#[tokio::test]
#[serial]
async fn server_error_on_file_lookup_is_reported() {
    let (base, server) = canned_server(vec![(500, r#"{"message":"Server Error"}"#)]).await;

    let err = github(&base)
        .get_file("octo", "docs", "docs/a.mdx", "main")
        .await
        .unwrap_err();
    match err {
        HostError::Api { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Server Error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
#[serial]
async fn existing_file_yields_its_sha() {
    let (base, server) =
        canned_server(vec![(200, r#"{"name":"a.mdx","path":"docs/a.mdx","sha":"def456"}"#)]).await;

    let file = github(&base)
        .get_file("octo", "docs", "docs/a.mdx", "main")
        .await
        .unwrap()
        .expect("file exists");
    assert_eq!(file.sha, "def456");
    assert_eq!(file.path, "docs/a.mdx");
    server.await.unwrap();
}

#[tokio::test]
#[serial]
async fn update_sends_previous_sha_and_create_omits_it() {
    let (base, server) = canned_server(vec![
        (200, r#"{"commit":{"sha":"c0ffee"}}"#),
        (201, r#"{"commit":{"sha":"beef01"}}"#),
    ])
    .await;
    let client = github(&base);

    assert_eq!(client.put_file(&commit(Some("def456"))).await.unwrap(), "c0ffee");
    assert_eq!(client.put_file(&commit(None)).await.unwrap(), "beef01");

    let requests = server.await.unwrap();
    assert_eq!(
        requests[0].request_line(),
        "put /repos/octo/docs/contents/docs/a.mdx http/1.1"
    );
    let update = requests[0].json();
    assert_eq!(update["sha"], "def456");
    assert_eq!(update["content"], "IyBB");
    assert_eq!(update["branch"], "mdx-docs-1");
    assert!(requests[1].json().get("sha").is_none());
}

#[tokio::test]
#[serial]
async fn gemini_returns_generated_text() {
    let (base, server) = canned_server(vec![(
        200,
        r#"{"candidates":[{"content":{"parts":[{"text":"Rewritten "},{"text":"text"}]}}]}"#,
    )])
    .await;

    let request = RewriteRequest::new(RewriteTask::MarkdownConversion, "raw notes", None);
    let text = gemini(&base).rewrite(&request).await.unwrap();
    assert_eq!(text, "Rewritten text");

    let requests = server.await.unwrap();
    assert_eq!(
        requests[0].request_line(),
        "post /v1beta/models/gemini-1.5-flash:generatecontent http/1.1"
    );
    assert!(requests[0].head.contains("x-goog-api-key: gemini-key"));
    let prompt = requests[0].json()["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(prompt.contains("raw notes"));
}

#[tokio::test]
#[serial]
async fn gemini_error_keeps_provider_message() {
    let (base, server) = canned_server(vec![(
        403,
        r#"{"error":{"code":403,"message":"API key not valid.","status":"PERMISSION_DENIED"}}"#,
    )])
    .await;

    let request = RewriteRequest::new(RewriteTask::MarkdownConversion, "raw notes", None);
    let err = gemini(&base).rewrite(&request).await.unwrap_err();
    match err {
        RewriteError::Rejected { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "API key not valid.");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    server.await.unwrap();
}
