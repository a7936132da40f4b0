//! REST adapter implementing the collaborator traits over HTTP.
//!
//! Login stores the returned bearer token; every file endpoint sends it.
//! Any non-2xx login response is a refusal (`Ok(false)`). On the other
//! endpoints `401` and `403` map to [`BackendError::Unauthorized`] and
//! [`BackendError::Forbidden`].

use std::sync::{Mutex, MutexGuard};

use protocol::messages::{
    ApiResponse, AuthRequest, DownloadLinkData, ErrorBody, FileListData, LiveStats,
    LoginResponse, UploadResponse, DOWNLOAD_PATH, LIST_PATH, LOGIN_PATH, SIGNUP_PATH,
    STATS_PATH, UPLOAD_PATH,
};
use protocol::{DownloadLink, FileItem, Role, SignupResult, UploadFile};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::backend::{
    Authenticator, BackendError, BackendResult, DownloadResolver, FileSource, StatsSource,
    Uploader,
};

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

/// HTTP client for the DocShare REST API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Mutex<Option<String>>,
}

impl HttpBackend {
    /// Create a backend rooted at `base_url` (e.g. `http://localhost:8000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Mutex::new(None),
        }
    }

    /// Start with a bearer token from a previous login.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.lock_token() = Some(token.into());
        self
    }

    /// Bearer token from the last successful login.
    pub fn token(&self) -> Option<String> {
        self.lock_token().clone()
    }

    /// Forget the bearer token.
    pub fn clear_token(&self) {
        self.lock_token().take();
    }

    fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Download-link URL with `file_id` percent-encoded as one path segment.
    fn download_url(&self, file_id: &str) -> BackendResult<Url> {
        let invalid = || BackendError::Transport(format!("invalid api url: {}", self.base_url));
        let mut url = Url::parse(&self.endpoint(DOWNLOAD_PATH)).map_err(|_| invalid())?;
        url.path_segments_mut().map_err(|_| invalid())?.push(file_id);
        Ok(url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn lock_token(&self) -> MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Join the base URL and an absolute endpoint path.
fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Map a non-success status and its body to an error.
fn status_error(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });

    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
        StatusCode::FORBIDDEN => BackendError::Forbidden(message),
        _ => BackendError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

/// Check the status and decode the JSON body.
async fn process_response<T: DeserializeOwned>(res: Response) -> BackendResult<T> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Unwrap the `data` of a successful envelope.
fn envelope_data<T>(response: ApiResponse<T>) -> BackendResult<T> {
    if !response.success {
        return Err(BackendError::Rejected(
            response.message.unwrap_or_else(|| "request failed".to_string()),
        ));
    }
    response
        .data
        .ok_or_else(|| BackendError::Decode("response is missing data".to_string()))
}

impl Authenticator for HttpBackend {
    async fn login(&self, email: &str, password: &str, role: Role) -> BackendResult<bool> {
        let request = AuthRequest {
            email: email.to_string(),
            password: password.to_string(),
            user_type: role,
        };
        let res = self
            .client
            .post(self.endpoint(LOGIN_PATH))
            .json(&request)
            .send()
            .await?;

        // Bad credentials, an unverified account and a server failure all
        // read as a refusal.
        let status = res.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "Login refused by backend");
            self.clear_token();
            return Ok(false);
        }

        let login: LoginResponse = process_response(res).await?;
        *self.lock_token() = Some(login.access_token);
        Ok(true)
    }

    async fn signup(&self, email: &str, password: &str, role: Role) -> BackendResult<SignupResult> {
        let request = AuthRequest {
            email: email.to_string(),
            password: password.to_string(),
            user_type: role,
        };
        let res = self
            .client
            .post(self.endpoint(SIGNUP_PATH))
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        if status.is_client_error() {
            let body = res.text().await?;
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail);
            return Ok(SignupResult {
                success: false,
                message: detail,
            });
        }

        let body = res.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        // Some deployments answer with an empty body.
        let message = serde_json::from_str::<SignupResult>(&body)
            .ok()
            .and_then(|r| r.message);
        Ok(SignupResult {
            success: true,
            message,
        })
    }
}

impl Uploader for HttpBackend {
    async fn upload(&self, file: &UploadFile) -> BackendResult<()> {
        // `Bytes` clones share the buffer; the contents are not copied.
        let body = Body::from(file.bytes.clone());
        let part = Part::stream_with_length(body, file.bytes.len() as u64)
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part);

        info!(file_name = %file.name, size = file.size, "Uploading file");
        let res = self
            .authorized(self.client.post(self.endpoint(UPLOAD_PATH)))
            .multipart(form)
            .send()
            .await?;

        let response: UploadResponse = process_response(res).await?;
        if !response.success {
            let reason = response
                .message
                .unwrap_or_else(|| "upload rejected".to_string());
            warn!(file_name = %file.name, reason = %reason, "Upload rejected");
            return Err(BackendError::Rejected(reason));
        }
        debug!(file_name = %file.name, file_id = ?response.file_id, "Upload stored");
        Ok(())
    }
}

impl FileSource for HttpBackend {
    async fn list_files(&self) -> BackendResult<Vec<FileItem>> {
        let res = self
            .authorized(self.client.get(self.endpoint(LIST_PATH)))
            .send()
            .await?;

        let response: ApiResponse<FileListData> = process_response(res).await?;
        let files = envelope_data(response)?.files;
        debug!(count = files.len(), "Listed files");
        Ok(files)
    }
}

impl DownloadResolver for HttpBackend {
    async fn resolve_download(&self, file_id: &str) -> BackendResult<DownloadLink> {
        let url = self.download_url(file_id)?;
        let res = self.authorized(self.client.get(url)).send().await?;

        let response: ApiResponse<DownloadLinkData> = process_response(res).await?;
        Ok(envelope_data(response)?.into())
    }
}

impl StatsSource for HttpBackend {
    async fn live_stats(&self) -> BackendResult<LiveStats> {
        let res = self.client.get(self.endpoint(STATS_PATH)).send().await?;

        let response: ApiResponse<LiveStats> = process_response(res).await?;
        envelope_data(response)
    }
}
