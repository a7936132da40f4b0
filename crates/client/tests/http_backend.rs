//! Tests of `HttpBackend` against a local stub HTTP server.
//!
//! Each stub connection reads one request, records it and answers with a
//! canned status and JSON body, then closes.

use std::sync::{Arc, Mutex};

use client::auth::INVALID_CREDENTIALS_MESSAGE;
use client::backend::{
    Authenticator, BackendError, DownloadResolver, FileSource, StatsSource, Uploader,
};
use client::{AuthOutcome, AuthSession, HttpBackend};
use protocol::{Role, UploadFile};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Local server answering successive connections with canned responses.
struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    async fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                recorded.lock().unwrap().push(request);

                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(reply.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        Self {
            base_url,
            requests,
            handle,
        }
    }

    fn backend(&self) -> HttpBackend {
        HttpBackend::new(&self.base_url)
    }

    /// The nth recorded request with header names lowercased.
    fn request(&self, index: usize) -> String {
        self.requests.lock().unwrap()[index].clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Read a request head and its body (Content-Length or chunked).
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
        let body_len = buf.len() - head_end - 4;
        let content_length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok());

        match content_length {
            Some(len) if body_len >= len => break,
            Some(_) => continue,
            None if head.contains("transfer-encoding: chunked") => {
                if buf.ends_with(b"0\r\n\r\n") {
                    break;
                }
            }
            None => break,
        }
    }

    // Lowercase header names only; keep the request line and body as sent.
    let text = String::from_utf8_lossy(&buf).into_owned();
    match text.split_once("\r\n\r\n") {
        Some((head, body)) => {
            let mut lines = head.lines();
            let request_line = lines.next().unwrap_or_default().to_string();
            let headers: Vec<String> = lines
                .map(|l| match l.split_once(':') {
                    Some((name, value)) => format!("{}:{}", name.to_ascii_lowercase(), value),
                    None => l.to_string(),
                })
                .collect();
            format!("{}\r\n{}\r\n\r\n{}", request_line, headers.join("\r\n"), body)
        }
        None => text,
    }
}

// =============================================================================
// Login and signup
// =============================================================================

#[tokio::test]
async fn test_login_success_stores_token() {
    let server = StubServer::start(vec![(
        200,
        r#"{"access_token": "tok-123", "token_type": "bearer"}"#,
    )])
    .await;
    let backend = server.backend();

    assert!(backend.login("ops@test.com", "testpass123", Role::Ops).await.unwrap());
    assert_eq!(backend.token().as_deref(), Some("tok-123"));

    let request = server.request(0);
    assert!(request.starts_with("POST /api/auth/login HTTP/1.1"));
    assert!(request.contains(r#""user_type":"ops""#));
    assert!(request.contains(r#""email":"ops@test.com""#));
}

#[tokio::test]
async fn test_login_unauthorized_is_refusal_and_clears_token() {
    let server =
        StubServer::start(vec![(401, r#"{"detail": "Invalid credentials"}"#)]).await;
    let backend = server.backend().with_token("stale");

    assert!(!backend.login("a@b.c", "wrongpass", Role::Client).await.unwrap());
    assert_eq!(backend.token(), None);
}

#[tokio::test]
async fn test_login_server_error_is_refusal() {
    let server = StubServer::start(vec![(500, r#"{"detail": "Internal error"}"#)]).await;
    let backend = server.backend().with_token("stale");

    assert!(!backend.login("a@b.c", "secret1", Role::Client).await.unwrap());
    assert_eq!(backend.token(), None);
}

#[tokio::test]
async fn test_login_server_error_shows_combined_message() {
    let server = StubServer::start(vec![(503, "")]).await;
    let auth = AuthSession::new(server.backend());

    let outcome = auth.login("a@b.c", "secret1", Role::Client).await;
    assert_eq!(outcome, AuthOutcome::Failed(INVALID_CREDENTIALS_MESSAGE.to_string()));
    assert_eq!(auth.form().feedback.error(), Some(INVALID_CREDENTIALS_MESSAGE));
    assert_eq!(auth.session(), None);
}

#[tokio::test]
async fn test_signup_client_error_carries_detail() {
    let server =
        StubServer::start(vec![(400, r#"{"detail": "Email already registered"}"#)]).await;
    let backend = server.backend();

    let result = backend.signup("a@b.c", "secret1", Role::Client).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some("Email already registered"));
    assert!(server.request(0).starts_with("POST /api/auth/signup HTTP/1.1"));
}

#[tokio::test]
async fn test_signup_accepts_empty_body() {
    let server = StubServer::start(vec![(200, "")]).await;
    let backend = server.backend();

    let result = backend.signup("a@b.c", "secret1", Role::Ops).await.unwrap();
    assert!(result.success);
    assert_eq!(result.message, None);
}

#[tokio::test]
async fn test_signup_server_error_is_error() {
    let server = StubServer::start(vec![(502, "")]).await;
    let err = server
        .backend()
        .signup("a@b.c", "secret1", Role::Ops)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 502, .. }));
}

// =============================================================================
// Files
// =============================================================================

#[tokio::test]
async fn test_upload_sends_multipart_file_with_bearer() {
    let server = StubServer::start(vec![(
        200,
        r#"{"success": true, "message": "stored", "file_id": "f9"}"#,
    )])
    .await;
    let backend = server.backend().with_token("tok-ops");

    let file = UploadFile::from_bytes("deck.pptx", b"slides".to_vec());
    backend.upload(&file).await.unwrap();

    let request = server.request(0);
    assert!(request.starts_with("POST /api/files/upload HTTP/1.1"));
    assert!(request.contains("authorization: Bearer tok-ops"));
    assert!(request.contains("content-type: multipart/form-data; boundary="));
    assert!(request.contains(r#"name="file"; filename="deck.pptx""#));
    assert!(request.contains("slides"));
}

#[tokio::test]
async fn test_upload_forbidden_for_wrong_role() {
    let server =
        StubServer::start(vec![(403, r#"{"detail": "Only ops users can upload files"}"#)])
            .await;
    let backend = server.backend().with_token("tok-client");

    let file = UploadFile::from_bytes("deck.pptx", b"slides".to_vec());
    let err = backend.upload(&file).await.unwrap_err();
    assert!(matches!(err, BackendError::Forbidden(msg) if msg.contains("ops")));
}

#[tokio::test]
async fn test_upload_rejected_body() {
    let server =
        StubServer::start(vec![(200, r#"{"success": false, "message": "Disk full"}"#)]).await;

    let file = UploadFile::from_bytes("a.docx", b"doc".to_vec());
    let err = server.backend().upload(&file).await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected(msg) if msg == "Disk full"));
}

#[tokio::test]
async fn test_list_files_envelope() {
    let server = StubServer::start(vec![(
        200,
        r#"{"success": true, "data": {"files": [
            {"id": "f1", "name": "report.docx", "size": 2048, "type": "docx",
             "uploadedBy": "ops@test.com", "uploadedAt": 1700000000}
        ]}}"#,
    )])
    .await;
    let backend = server.backend().with_token("tok-client");

    let files = backend.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, "f1");
    assert_eq!(files[0].uploaded_by, "ops@test.com");
    assert_eq!(files[0].uploaded_at, 1_700_000_000);

    let request = server.request(0);
    assert!(request.starts_with("GET /api/files/list HTTP/1.1"));
    assert!(request.contains("authorization: Bearer tok-client"));
}

#[tokio::test]
async fn test_list_files_unauthorized() {
    let server = StubServer::start(vec![(401, r#"{"detail": "Not authenticated"}"#)]).await;
    let err = server.backend().list_files().await.unwrap_err();
    assert!(matches!(err, BackendError::Unauthorized(msg) if msg == "Not authenticated"));
}

#[tokio::test]
async fn test_resolve_download_encodes_id() {
    let server = StubServer::start(vec![(
        200,
        r#"{"success": true, "data": {"download_link": "/api/secure-download/abc"}}"#,
    )])
    .await;
    let backend = server.backend().with_token("tok-client");

    let link = backend.resolve_download("a/b?c").await.unwrap();
    assert_eq!(link.download_url, "/api/secure-download/abc");
    assert!(server
        .request(0)
        .starts_with("GET /api/files/download/a%2Fb%3Fc HTTP/1.1"));
}

#[tokio::test]
async fn test_resolve_download_rejected() {
    let server =
        StubServer::start(vec![(200, r#"{"success": false, "message": "File not found"}"#)])
            .await;
    let err = server.backend().resolve_download("missing").await.unwrap_err();
    assert!(matches!(err, BackendError::Rejected(msg) if msg == "File not found"));
}

#[tokio::test]
async fn test_resolve_download_forbidden() {
    let server =
        StubServer::start(vec![(403, r#"{"detail": "Only client users can download"}"#)]).await;
    let err = server.backend().resolve_download("f1").await.unwrap_err();
    assert!(matches!(err, BackendError::Forbidden(_)));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = StubServer::start(vec![(200, "<html>gateway</html>")]).await;
    let err = server.backend().list_files().await.unwrap_err();
    assert!(matches!(err, BackendError::Decode(_)));
}

// =============================================================================
// Statistics and transport
// =============================================================================

#[tokio::test]
async fn test_live_stats_without_token() {
    let server = StubServer::start(vec![(
        200,
        r#"{"success": true, "data": {"total_files": 12, "active_users": 3}}"#,
    )])
    .await;

    let stats = server.backend().live_stats().await.unwrap();
    assert_eq!(stats.total_files, 12);
    assert_eq!(stats.active_users, 3);

    let request = server.request(0);
    assert!(request.starts_with("GET /api/stats/live HTTP/1.1"));
    assert!(!request.contains("authorization:"));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Bind then release a port so nothing is listening on it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(format!("http://{}", addr));
    let err = backend.list_files().await.unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
}
